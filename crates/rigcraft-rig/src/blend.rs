//! IK/FK blending onto the animation skeleton.
//!
//! Every limb drives its animation joints through blend nodes, whatever
//! drivers it has. With both chains present a 0..1 attribute fades between
//! them; with a single chain the blender is pinned to that chain's extreme
//! and no attribute is created, so the downstream wiring is identical in
//! every configuration.

use rigcraft_scene::{AttrDef, AttrValue, NodeId, NodeKind, Plug, SceneBackend};

use crate::error::{RigError, RigResult};
use crate::naming::{part_name, suffix, with_suffix};

/// Driver chains available for one limb.
#[derive(Debug, Clone)]
pub enum LimbDrivers {
    /// IK chain only; the blender is pinned to 1.
    IkOnly(Vec<NodeId>),
    /// FK chain only; the blender is pinned to 0.
    FkOnly(Vec<NodeId>),
    /// Both chains, faded by a control attribute: 0 is FK, 1 is IK.
    Both {
        /// IK driver joints, root to tip.
        ik_chain: Vec<NodeId>,
        /// FK driver joints, root to tip.
        fk_chain: Vec<NodeId>,
        /// Group holding the IK controls; visibility follows the attribute.
        ik_grp: NodeId,
        /// Group holding the FK controls; visibility follows its reverse.
        fk_grp: NodeId,
    },
}

/// Inputs for one limb's blend network.
#[derive(Debug, Clone)]
pub struct BlendParams<'a> {
    /// Driver chains.
    pub drivers: &'a LimbDrivers,
    /// Animation joints receiving the blended rotate and scale.
    pub anim_chain: &'a [NodeId],
    /// Control carrying the blend attribute (ignored for single-chain limbs).
    pub attr_ctr: NodeId,
    /// Blend attribute name, e.g. `lArmIkFk`.
    pub attr_name: String,
    /// Rig name prefix for produced node names.
    pub prefix: String,
}

enum Blender {
    Attr(NodeId, String),
    Pinned(f64),
}

/// Wires a limb's drivers onto its animation chain.
pub fn build_limb_blend<S: SceneBackend>(scene: &mut S, params: &BlendParams<'_>) -> RigResult<()> {
    match params.drivers {
        LimbDrivers::Both {
            ik_chain,
            fk_chain,
            ik_grp,
            fk_grp,
        } => {
            check_len(ik_chain.len(), params.anim_chain.len())?;
            check_len(fk_chain.len(), params.anim_chain.len())?;

            scene.add_attr(
                params.attr_ctr,
                &params.attr_name,
                AttrDef::keyable(0.0).with_range(0.0, 1.0),
            )?;
            let attr_plug = Plug::new(params.attr_ctr, params.attr_name.as_str());

            let rev = scene.create_utility(
                &part_name(&params.prefix, &params.attr_name, suffix::REVERSE),
                NodeKind::Reverse,
            )?;
            scene.connect(attr_plug.clone(), Plug::new(rev, "inputX"))?;
            scene.connect(attr_plug.clone(), Plug::new(*ik_grp, "visibility"))?;
            scene.connect(Plug::new(rev, "outputX"), Plug::new(*fk_grp, "visibility"))?;

            let blender = Blender::Attr(params.attr_ctr, params.attr_name.clone());
            for (i, anim) in params.anim_chain.iter().enumerate() {
                wire_pair(scene, Some(ik_chain[i]), Some(fk_chain[i]), *anim, &blender)?;
            }
        }
        LimbDrivers::IkOnly(chain) => {
            check_len(chain.len(), params.anim_chain.len())?;
            for (i, anim) in params.anim_chain.iter().enumerate() {
                wire_pair(scene, Some(chain[i]), None, *anim, &Blender::Pinned(1.0))?;
            }
        }
        LimbDrivers::FkOnly(chain) => {
            check_len(chain.len(), params.anim_chain.len())?;
            for (i, anim) in params.anim_chain.iter().enumerate() {
                wire_pair(scene, None, Some(chain[i]), *anim, &Blender::Pinned(0.0))?;
            }
        }
    }
    Ok(())
}

fn check_len(drivers: usize, anim: usize) -> RigResult<()> {
    if drivers != anim {
        return Err(RigError::ChainMismatch { drivers, anim });
    }
    Ok(())
}

/// One joint pair: two blend nodes, rotate and scale, onto the animation
/// joint. IK lands on color1, FK on color2, so blender 1 reads pure IK.
fn wire_pair<S: SceneBackend>(
    scene: &mut S,
    ik: Option<NodeId>,
    fk: Option<NodeId>,
    anim: NodeId,
    blender: &Blender,
) -> RigResult<()> {
    let anim_name = scene.name(anim)?;
    let stem = anim_name
        .rsplit_once('_')
        .map(|(s, _)| s)
        .unwrap_or(&anim_name);
    let rotate_bc = scene.create_utility(&with_suffix(&anim_name, suffix::BLEND), NodeKind::BlendPair)?;
    let scale_bc = scene.create_utility(&format!("{stem}Scale_{}", suffix::BLEND), NodeKind::BlendPair)?;

    for (bc, channel) in [(rotate_bc, "rotate"), (scale_bc, "scale")] {
        if let Some(ik) = ik {
            scene.connect(Plug::new(ik, channel), Plug::new(bc, "color1"))?;
        }
        if let Some(fk) = fk {
            scene.connect(Plug::new(fk, channel), Plug::new(bc, "color2"))?;
        }
        match blender {
            Blender::Attr(ctr, attr) => {
                scene.connect(Plug::new(*ctr, attr.as_str()), Plug::new(bc, "blender"))?
            }
            Blender::Pinned(v) => scene.set_attr(bc, "blender", AttrValue::Scalar(*v))?,
        }
        scene.connect(Plug::new(bc, "output"), Plug::new(anim, channel))?;
    }

    // A single-chain blend still needs sane defaults on the open side.
    if ik.is_none() {
        scene.set_attr(rotate_bc, "color1", AttrValue::Vec3(glam::DVec3::ZERO))?;
        scene.set_attr(scale_bc, "color1", AttrValue::Vec3(glam::DVec3::ONE))?;
    }
    if fk.is_none() {
        scene.set_attr(rotate_bc, "color2", AttrValue::Vec3(glam::DVec3::ZERO))?;
        scene.set_attr(scale_bc, "color2", AttrValue::Vec3(glam::DVec3::ONE))?;
    }
    Ok(())
}
