//! Twist joints: extra bind joints along a limb segment that take a
//! fraction of the driver joint's roll, so skinned volume distributes the
//! twist instead of collapsing at one joint.

use rigcraft_scene::{
    AttrValue, MdOperation, NodeId, NodeKind, Plug, SceneBackend,
};

use crate::error::{RigError, RigResult};
use crate::hierarchy::{match_orient, split_chain, zero_orient};
use crate::naming::{suffix, with_suffix};

/// The driver rotation channel feeding the twist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwistAxis {
    /// The roll axis of an aimed chain.
    X,
    /// Used where the driver is not aim-oriented (the ankle).
    Y,
    /// Available for completeness.
    Z,
}

impl TwistAxis {
    fn rotate_attr(&self) -> &'static str {
        match self {
            TwistAxis::X => "rotateX",
            TwistAxis::Y => "rotateY",
            TwistAxis::Z => "rotateZ",
        }
    }
}

/// Per-joint twist fractions for `count` joints.
///
/// Rates run `1 - i/count`, so the joint at the driver takes the full roll
/// and each following joint takes less, never reaching zero. Counter
/// twisting negates every rate: the joints cancel the driver's roll
/// instead of following it (upper arm and upper leg, where the twist
/// should stay put while the shoulder or thigh rolls).
pub fn default_twist_rates(count: usize, counter_twist: bool) -> Vec<f64> {
    let delta = 1.0 / count as f64;
    (0..count)
        .map(|i| {
            let rate = 1.0 - i as f64 * delta;
            if counter_twist {
                -rate
            } else {
                rate
            }
        })
        .collect()
}

/// Inputs for one twist chain.
#[derive(Debug, Clone)]
pub struct TwistChainParams<'a> {
    /// Joint whose rotation drives the twist; the chain starts here.
    pub start: NodeId,
    /// Joint marking the far end of the twisted span.
    pub end: NodeId,
    /// One fraction per twist joint, driver side first.
    pub rates: &'a [f64],
    /// Driver rotation channel.
    pub axis: TwistAxis,
    /// Parent the twist joints under `end` instead of `start` and orient
    /// the chain from the end (forearm and shin, where the far joint is
    /// the stable anchor).
    pub parent_to_end: bool,
    /// Name stem for the produced joints, e.g. `hero_l_shoulderTwist`.
    pub name_stem: String,
    /// Staging parent for nodes while the chain is assembled.
    pub build_grp: NodeId,
}

/// Builds a twist chain and returns the twist joints, driver side first.
///
/// Each joint gets a multiply node `driver.rotate[axis] * rate` into its
/// own `rotateX`, is parented under the stable anchor, and has its joint
/// orient zeroed so it follows the anchor's orientation apart from the
/// driven roll.
pub fn build_twist_chain<S: SceneBackend>(
    scene: &mut S,
    params: &TwistChainParams<'_>,
) -> RigResult<Vec<NodeId>> {
    if params.rates.is_empty() {
        return Err(RigError::ChainTooShort {
            op: "twist chain",
            len: 0,
        });
    }

    let root_name = format!("{}01_{}", params.name_stem, suffix::BIND);
    let root = scene.duplicate_parent_only(params.start, &root_name)?;
    scene.reparent(root, Some(params.build_grp))?;

    let tmp_end_name = format!("{}End_{}", params.name_stem, suffix::BIND);
    let tmp_end = scene.duplicate_parent_only(params.end, &tmp_end_name)?;
    scene.reparent(tmp_end, Some(params.build_grp))?;

    if params.parent_to_end {
        match_orient(scene, root, tmp_end)?;
    }
    scene.reparent(tmp_end, Some(root))?;
    zero_orient(scene, tmp_end)?;

    let mut chain = vec![root];
    if params.rates.len() > 1 {
        let in_between = split_chain(scene, root, params.rates.len())?;
        for (i, joint) in in_between.iter().enumerate() {
            let name = format!("{}{:02}_{}", params.name_stem, i + 2, suffix::BIND);
            scene.rename(*joint, &name)?;
        }
        chain.extend(in_between);
    }
    scene.delete(tmp_end)?;

    let anchor = if params.parent_to_end {
        params.end
    } else {
        params.start
    };
    for (i, joint) in chain.iter().enumerate() {
        let md_name = with_suffix(&scene.name(*joint)?, suffix::NODE);
        let md = scene.create_utility(&md_name, NodeKind::MultiplyDivide(MdOperation::Multiply))?;
        scene.set_attr(md, "input2X", AttrValue::Scalar(params.rates[i]))?;
        scene.connect(
            Plug::new(params.start, params.axis.rotate_attr()),
            Plug::new(md, "input1X"),
        )?;
        scene.connect(Plug::new(md, "outputX"), Plug::new(*joint, "rotateX"))?;

        scene.reparent(*joint, Some(anchor))?;
        scene.set_joint_orient_deg(*joint, glam::DVec3::ZERO)?;
    }
    Ok(chain)
}
