//! Joint-chain hierarchy operations: aiming, splitting, re-orienting.
//!
//! All orientation edits here preserve descendant world transforms by
//! temporarily detaching children, the same trick a DCC's orient-joint
//! command performs internally.

use glam::{DMat3, DQuat, DVec3};
use rigcraft_scene::{NodeId, NodeKind, SceneBackend};

use crate::error::{RigError, RigResult};

/// Up-axis convention for chain aiming: which local axis is the secondary
/// axis and which world direction it leans toward.
///
/// These mirror the orient-joint conventions the template skeleton was
/// authored against: legs `ZDown`, feet and toes `YDown`, arms and most
/// fingers `YUp`, thumbs `ZUp`, spine `XDown` (a roll-stable default for
/// vertical chains, where the secondary projection degenerates anyway).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryAxis {
    /// Local Y toward world up.
    YUp,
    /// Local Y toward world down.
    YDown,
    /// Local Z toward world up.
    ZUp,
    /// Local Z toward world down.
    ZDown,
    /// Vertical-chain default; resolves like `YDown`.
    XDown,
}

impl SecondaryAxis {
    fn world_dir(&self) -> DVec3 {
        match self {
            SecondaryAxis::YUp | SecondaryAxis::ZUp => DVec3::Y,
            SecondaryAxis::YDown | SecondaryAxis::ZDown | SecondaryAxis::XDown => DVec3::NEG_Y,
        }
    }

    fn secondary_is_z(&self) -> bool {
        matches!(self, SecondaryAxis::ZUp | SecondaryAxis::ZDown)
    }
}

/// Builds the world rotation that points local +X along `forward` with the
/// secondary axis leaning toward its world reference direction.
fn aim_rotation(forward: DVec3, secondary: SecondaryAxis) -> DQuat {
    let x = forward.normalize_or_zero();
    if x == DVec3::ZERO {
        return DQuat::IDENTITY;
    }
    let reference = secondary.world_dir();
    let mut lean = reference - x * reference.dot(x);
    if lean.length_squared() < 1e-12 {
        lean = x.any_orthonormal_vector();
    }
    let lean = lean.normalize();

    let (y, z) = if secondary.secondary_is_z() {
        let z = lean;
        let y = z.cross(x).normalize();
        (y, x.cross(y))
    } else {
        let y = lean;
        let z = x.cross(y).normalize();
        (z.cross(x), z)
    };
    DQuat::from_mat3(&DMat3::from_cols(x, y, z))
}

/// Runs `f` with the node's children temporarily detached (world
/// preserved), then re-attaches them.
pub(crate) fn with_children_detached<S, F>(scene: &mut S, node: NodeId, f: F) -> RigResult<()>
where
    S: SceneBackend,
    F: FnOnce(&mut S) -> RigResult<()>,
{
    let children = scene.children_of(node)?;
    for child in &children {
        scene.reparent(*child, None)?;
    }
    f(scene)?;
    for child in &children {
        scene.reparent(*child, Some(node))?;
    }
    Ok(())
}

/// Orients a joint so local +X points at a world position, baking the
/// result into the joint orient. Children keep their world transforms.
pub fn orient_toward<S: SceneBackend>(
    scene: &mut S,
    joint: NodeId,
    target: DVec3,
    secondary: SecondaryAxis,
) -> RigResult<()> {
    let pos = scene.world_position(joint)?;
    let rotation = aim_rotation(target - pos, secondary);
    with_children_detached(scene, joint, |scene| {
        scene.set_world_rotation(joint, rotation)?;
        scene.freeze_rotation(joint)?;
        Ok(())
    })
}

/// Aims each joint in the chain at its successor. The last joint is left
/// untouched; callers typically zero its orient against the parent.
pub fn aim_chain<S: SceneBackend>(
    scene: &mut S,
    chain: &[NodeId],
    secondary: SecondaryAxis,
) -> RigResult<()> {
    for pair in chain.windows(2) {
        let target = scene.world_position(pair[1])?;
        orient_toward(scene, pair[0], target, secondary)?;
    }
    Ok(())
}

/// Re-orients a joint to match another joint's world orientation.
pub fn match_orient<S: SceneBackend>(scene: &mut S, joint: NodeId, target: NodeId) -> RigResult<()> {
    let rotation = scene.world_rotation(target)?;
    with_children_detached(scene, joint, |scene| {
        scene.set_world_rotation(joint, rotation)?;
        scene.freeze_rotation(joint)?;
        Ok(())
    })
}

/// Adds a local Euler rotation on top of a joint's current orientation and
/// bakes it into the joint orient. Used for the mirror-behavior 180° flip.
pub fn add_orient<S: SceneBackend>(
    scene: &mut S,
    joint: NodeId,
    delta_deg: DVec3,
) -> RigResult<()> {
    with_children_detached(scene, joint, |scene| {
        let rotate = scene.local(joint)?.rotate_deg;
        scene.set_rotation_deg(joint, rotate + delta_deg)?;
        scene.freeze_rotation(joint)?;
        Ok(())
    })
}

/// Zeroes a joint's rotation and joint orient so it inherits its parent's
/// orientation. Used on chain tips and twist joints.
pub fn zero_orient<S: SceneBackend>(scene: &mut S, joint: NodeId) -> RigResult<()> {
    scene.set_rotation_deg(joint, DVec3::ZERO)?;
    scene.set_joint_orient_deg(joint, DVec3::ZERO)?;
    Ok(())
}

/// Re-parents a node keeping its world transform. Re-parenting onto the
/// current parent is a no-op.
pub fn reparent_preserving_world<S: SceneBackend>(
    scene: &mut S,
    node: NodeId,
    new_parent: Option<NodeId>,
) -> RigResult<()> {
    scene.reparent(node, new_parent)?;
    Ok(())
}

/// Finds the single end joint (joint with no joint children) under a chain
/// root. More than one end means the subtree is not a linear chain.
pub fn chain_end<S: SceneBackend>(scene: &mut S, root: NodeId) -> RigResult<NodeId> {
    let mut ends = Vec::new();
    for id in scene.descendants(root)? {
        if !matches!(scene.kind(id)?, NodeKind::Joint) {
            continue;
        }
        let has_joint_child = scene
            .children_of(id)?
            .iter()
            .any(|c| matches!(scene.kind(*c), Ok(NodeKind::Joint)));
        if !has_joint_child {
            ends.push(id);
        }
    }
    match ends.as_slice() {
        [end] => Ok(*end),
        _ => Err(RigError::AmbiguousChainEnd {
            root: scene.name(root)?,
            ends: ends.len(),
        }),
    }
}

/// Splits the two-joint chain under `root` into `span_count` equal spans.
///
/// The root is aimed at the end joint, `span_count - 1` intermediate
/// joints are created at equal offsets along the aim axis, and the end is
/// re-parented under the last of them. Returns the intermediate joints,
/// root to tip.
pub fn split_chain<S: SceneBackend>(
    scene: &mut S,
    root: NodeId,
    span_count: usize,
) -> RigResult<Vec<NodeId>> {
    if span_count < 2 {
        return Ok(Vec::new());
    }
    let end = chain_end(scene, root)?;
    scene.reparent(end, None)?;

    let end_pos = scene.world_position(end)?;
    orient_toward(scene, root, end_pos, SecondaryAxis::YUp)?;

    let root_pos = scene.world_position(root)?;
    let step = (end_pos - root_pos) / span_count as f64;

    let mut new_joints = Vec::with_capacity(span_count - 1);
    let mut prev = root;
    for i in 1..span_count {
        let name = format!("inBtwJnt{:02}", i + 1);
        let joint = scene.create_joint(&name, Some(prev), root_pos + step * i as f64)?;
        new_joints.push(joint);
        prev = joint;
    }
    scene.reparent(end, Some(prev))?;
    Ok(new_joints)
}
