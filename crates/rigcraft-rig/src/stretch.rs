//! IK limb stretch: lets the limb extend past its rest length when the IK
//! control is pulled away, while compression leaves the joints alone.

use rigcraft_scene::{
    AttrDef, AttrValue, CondOperation, MdOperation, NodeId, NodeKind, Plug, SceneBackend,
};

use crate::error::RigResult;
use crate::math::distance;
use crate::naming::{part_name, suffix};

/// Inputs for one stretch network.
#[derive(Debug, Clone)]
pub struct StretchParams<'a> {
    /// IK control whose distance from the chain root drives the stretch.
    pub ik_ctr: NodeId,
    /// Root joint of the limb; the rest length is measured from here.
    pub chain_root: NodeId,
    /// Joints whose `scaleX` the network drives (root and mid of the limb).
    pub stretch_joints: &'a [NodeId],
    /// Control receiving the `<limb>Stretch` toggle attribute.
    pub switch_ctr: NodeId,
    /// Global control; its `scaleX` normalizes the rest length so a scaled
    /// rig does not stretch at rest.
    pub global_ctr: NodeId,
    /// Limb label, e.g. `lArm`.
    pub limb_name: String,
    /// Rig name prefix for produced node names.
    pub prefix: String,
    /// Parent for the measurement locators.
    pub misc_grp: NodeId,
}

/// Builds the stretch network and returns its group.
///
/// Wiring: a live distance between two point-constrained locators is
/// divided by `rest_length * global.scaleX`. A greater-or-equal condition
/// passes the ratio through only at or past rest length, so compression
/// reads 1. An equality condition against the 0/1 `<limb>Stretch` toggle
/// gates the whole network; its output drives each stretch joint's
/// `scaleX`.
pub fn build_stretch_limb<S: SceneBackend>(
    scene: &mut S,
    params: &StretchParams<'_>,
) -> RigResult<NodeId> {
    let limb = &params.limb_name;
    let grp = scene.create_group(
        &part_name(&params.prefix, &format!("{limb}Stretch"), suffix::GROUP),
        Some(params.misc_grp),
    )?;

    let start_loc = scene.create_locator(
        &part_name(&params.prefix, &format!("{limb}StretchStart"), suffix::LOCATOR),
        Some(grp),
    )?;
    let start_pos = scene.world_position(params.ik_ctr)?;
    scene.set_world_position(start_loc, start_pos)?;
    scene.add_constraint(
        rigcraft_scene::ConstraintKind::Point,
        params.ik_ctr,
        start_loc,
        false,
    )?;

    let end_loc = scene.create_locator(
        &part_name(&params.prefix, &format!("{limb}StretchEnd"), suffix::LOCATOR),
        Some(grp),
    )?;
    let end_pos = scene.world_position(params.chain_root)?;
    scene.set_world_position(end_loc, end_pos)?;
    scene.add_constraint(
        rigcraft_scene::ConstraintKind::Point,
        params.chain_root,
        end_loc,
        false,
    )?;

    let dist = scene.create_utility(
        &part_name(&params.prefix, limb, suffix::DISTANCE),
        NodeKind::Distance {
            start: start_loc,
            end: end_loc,
        },
    )?;
    let rest_length = distance(start_pos, end_pos);

    // ratio = distance / (global.scaleX * rest_length)
    let ratio_md = scene.create_utility(
        &part_name(&params.prefix, &format!("{limb}Stretch"), suffix::NODE),
        NodeKind::MultiplyDivide(MdOperation::Divide),
    )?;
    scene.connect(Plug::new(dist, "distance"), Plug::new(ratio_md, "input1X"))?;

    let scale_md = scene.create_utility(
        &part_name(&params.prefix, &format!("{limb}StretchScale"), suffix::NODE),
        NodeKind::MultiplyDivide(MdOperation::Multiply),
    )?;
    scene.connect(
        Plug::new(params.global_ctr, "scaleX"),
        Plug::new(scale_md, "input1X"),
    )?;
    scene.set_attr(scale_md, "input2X", AttrValue::Scalar(rest_length))?;
    scene.connect(
        Plug::new(scale_md, "outputX"),
        Plug::new(ratio_md, "input2X"),
    )?;

    // Pass the ratio through only at or past rest length.
    let trigger = scene.create_utility(
        &part_name(&params.prefix, &format!("{limb}StretchTrigger"), suffix::NODE),
        NodeKind::Condition(CondOperation::GreaterOrEqual),
    )?;
    scene.set_attr(trigger, "secondTerm", AttrValue::Scalar(1.0))?;
    scene.connect(Plug::new(ratio_md, "outputX"), Plug::new(trigger, "firstTerm"))?;
    scene.connect(
        Plug::new(ratio_md, "outputX"),
        Plug::new(trigger, "colorIfTrueX"),
    )?;

    let attr = format!("{limb}Stretch");
    scene.add_attr(
        params.switch_ctr,
        &attr,
        AttrDef::keyable(0.0).with_range(0.0, 1.0),
    )?;
    let switch = scene.create_utility(
        &part_name(&params.prefix, &format!("{limb}StretchSwitch"), suffix::NODE),
        NodeKind::Condition(CondOperation::Equal),
    )?;
    scene.set_attr(switch, "secondTerm", AttrValue::Scalar(1.0))?;
    scene.connect(
        Plug::new(params.switch_ctr, attr.as_str()),
        Plug::new(switch, "firstTerm"),
    )?;
    scene.connect(
        Plug::new(trigger, "outColorX"),
        Plug::new(switch, "colorIfTrueX"),
    )?;

    for joint in params.stretch_joints {
        scene.connect(Plug::new(switch, "outColorX"), Plug::new(*joint, "scaleX"))?;
    }
    Ok(grp)
}
