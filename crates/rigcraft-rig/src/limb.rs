//! IK and FK limb builders.
//!
//! Both builders duplicate animation joints into an isolated driver chain
//! and hang controls off it; the blend engine later fades the drivers onto
//! the animation skeleton.

use glam::DVec3;
use rigcraft_scene::{ConstraintKind, NodeId, SceneBackend};

use crate::control::{create_control, Control, ControlShape, ControlSpec, Placement};
use crate::error::RigResult;
use crate::math::pole_vector;
use crate::naming::{sided_name, suffix, with_suffix};

fn stem(name: &str) -> &str {
    name.rsplit_once('_').map(|(s, _)| s).unwrap_or(name)
}

// ============================================================================
// IK
// ============================================================================

/// Inputs for one IK limb.
#[derive(Debug, Clone)]
pub struct IkLimbParams {
    /// Animation root, mid and end joints (shoulder/elbow/wrist or
    /// thigh/knee/ankle).
    pub root: NodeId,
    /// Mid joint.
    pub mid: NodeId,
    /// End joint.
    pub end: NodeId,
    /// Limb label without the side, e.g. `arm`.
    pub limb_name: String,
    /// Side prefix, `l` or `r`.
    pub side_prefix: String,
    /// Rig name prefix.
    pub prefix: String,
    /// Constrain the handle and end joint to the IK control. The leg
    /// passes false; foot roll owns the handle there.
    pub constrain_ik_ctr: bool,
    /// Match the IK control's orientation to the end joint (arms).
    pub match_jnt_orient: bool,
    /// IK control shape and CV adjustments.
    pub ik_ctr_shape: ControlShape,
    /// CV scale for the IK control.
    pub ik_ctr_scale: DVec3,
    /// CV rotation for the IK control, degrees.
    pub ik_ctr_rotate: DVec3,
    /// Pole control CV scale.
    pub pv_ctr_scale: DVec3,
    /// Pole control CV rotation, degrees.
    pub pv_ctr_rotate: DVec3,
    /// Group receiving the IK handle.
    pub misc_grp: NodeId,
    /// Global control; the limb's control group nests under it.
    pub global_ctr: NodeId,
}

/// A built IK limb.
#[derive(Debug, Clone)]
pub struct IkLimb {
    /// Driver chain, root to end.
    pub chain: Vec<NodeId>,
    /// Group holding both control spaces, under the global control.
    pub ctrs_grp: NodeId,
    /// The IK control.
    pub end_ctr: Control,
    /// The pole control.
    pub pole_ctr: Control,
    /// The IK handle.
    pub handle: NodeId,
    /// True when the chain was straight and the pole constraint skipped.
    pub pole_degenerate: bool,
}

/// Duplicates the limb into an IK chain and builds handle plus controls.
pub fn build_ik_limb<S: SceneBackend>(scene: &mut S, params: &IkLimbParams) -> RigResult<IkLimb> {
    let root_ik = scene.duplicate_parent_only(
        params.root,
        &with_suffix(&scene.name(params.root)?, suffix::IK),
    )?;
    let mid_ik = scene.duplicate_parent_only(
        params.mid,
        &with_suffix(&scene.name(params.mid)?, suffix::IK),
    )?;
    let end_ik = scene.duplicate_parent_only(
        params.end,
        &with_suffix(&scene.name(params.end)?, suffix::IK),
    )?;

    let root_pos = scene.world_position(root_ik)?;
    let mid_pos = scene.world_position(mid_ik)?;
    let end_pos = scene.world_position(end_ik)?;

    scene.reparent(end_ik, Some(mid_ik))?;
    scene.reparent(mid_ik, Some(root_ik))?;

    let handle = scene.create_ik_handle(
        &sided_name(
            &params.prefix,
            &params.side_prefix,
            &format!("{}Ik", params.limb_name),
            suffix::IK_HANDLE,
        ),
        root_ik,
        end_ik,
    )?;
    scene.reparent(handle, Some(params.misc_grp))?;

    let (pole_pos, pole_degenerate) = pole_vector(root_pos, mid_pos, end_pos);

    let ik_stem = sided_name_stem(&params.prefix, &params.side_prefix, &params.limb_name, "Ik");
    let placement = if params.match_jnt_orient {
        Placement::MatchOriented(end_ik)
    } else {
        Placement::World(end_pos)
    };
    let end_ctr = create_control(
        scene,
        &ControlSpec::new(ik_stem, params.ik_ctr_shape)
            .with_placement(placement)
            .with_cv_scale(params.ik_ctr_scale)
            .with_cv_rotation(params.ik_ctr_rotate),
    )?;

    let pv_stem = sided_name_stem(&params.prefix, &params.side_prefix, &params.limb_name, "Pv");
    let pole_ctr = create_control(
        scene,
        &ControlSpec::new(pv_stem, ControlShape::Square)
            .with_placement(Placement::World(pole_pos))
            .with_cv_scale(params.pv_ctr_scale)
            .with_cv_rotation(params.pv_ctr_rotate),
    )?;

    scene.hide_and_lock(end_ctr.shape, &["scaleX", "scaleY", "scaleZ", "visibility"])?;
    scene.hide_and_lock(pole_ctr.shape, &["scaleX", "scaleY", "scaleZ", "visibility"])?;

    if params.constrain_ik_ctr {
        scene.add_constraint(ConstraintKind::Parent, end_ctr.shape, handle, false)?;
        scene.add_constraint(ConstraintKind::Orient, end_ctr.shape, end_ik, false)?;
    }
    if !pole_degenerate {
        scene.add_constraint(ConstraintKind::PoleVector, pole_ctr.shape, handle, false)?;
    }

    let ctrs_grp = scene.create_group(
        &sided_name(
            &params.prefix,
            &params.side_prefix,
            &format!("{}IkCtrs", params.limb_name),
            suffix::GROUP,
        ),
        Some(params.global_ctr),
    )?;
    scene.reparent(end_ctr.space, Some(ctrs_grp))?;
    scene.reparent(pole_ctr.space, Some(ctrs_grp))?;

    Ok(IkLimb {
        chain: vec![root_ik, mid_ik, end_ik],
        ctrs_grp,
        end_ctr,
        pole_ctr,
        handle,
        pole_degenerate,
    })
}

fn sided_name_stem(prefix: &str, side: &str, limb: &str, role: &str) -> String {
    format!("{prefix}_{side}_{limb}{role}")
}

// ============================================================================
// FK
// ============================================================================

/// A built FK limb.
#[derive(Debug, Clone)]
pub struct FkLimb {
    /// Driver chain, root to tip, nested.
    pub chain: Vec<NodeId>,
    /// Group holding the root control space, under the global control.
    pub ctrs_grp: NodeId,
    /// Controls, one per joint.
    pub ctrs: Vec<Control>,
}

/// Duplicates the full chain into nested FK joints with one rotate-only
/// control per joint, control spaces chained under the parent controls.
pub fn build_fk_limb<S: SceneBackend>(
    scene: &mut S,
    anim_chain: &[NodeId],
    limb_name: &str,
    side_prefix: &str,
    prefix: &str,
    ctr_scale: DVec3,
    global_ctr: NodeId,
) -> RigResult<FkLimb> {
    let mut chain = Vec::with_capacity(anim_chain.len());
    for (i, joint) in anim_chain.iter().enumerate() {
        let fk = scene
            .duplicate_parent_only(*joint, &with_suffix(&scene.name(*joint)?, suffix::FK))?;
        if i > 0 {
            scene.reparent(fk, Some(chain[i - 1]))?;
        }
        chain.push(fk);
    }

    let built = fk_controls_for_chain(scene, &chain, ctr_scale, false)?;

    let ctrs_grp = scene.create_group(
        &sided_name(
            prefix,
            side_prefix,
            &format!("{limb_name}FkCtrs"),
            suffix::GROUP,
        ),
        Some(global_ctr),
    )?;
    let root_space = built.ctrs[0].space;
    let pos = scene.world_position(root_space)?;
    scene.set_world_position(ctrs_grp, pos)?;
    scene.reparent(root_space, Some(ctrs_grp))?;

    Ok(FkLimb {
        chain,
        ctrs_grp,
        ctrs: built.ctrs,
    })
}

/// FK controls over an existing chain.
pub struct FkControls {
    /// Controls, one per joint.
    pub ctrs: Vec<Control>,
    /// Curl offset groups between space and control, when requested.
    pub offsets: Vec<NodeId>,
}

/// One rotate-only circle control per joint, orient-constrained onto it,
/// spaces nested under the previous control. With `add_offset` an extra
/// group lands between each space and control (the digit curl target).
pub fn fk_controls_for_chain<S: SceneBackend>(
    scene: &mut S,
    chain: &[NodeId],
    ctr_scale: DVec3,
    add_offset: bool,
) -> RigResult<FkControls> {
    let mut ctrs: Vec<Control> = Vec::with_capacity(chain.len());
    let mut offsets = Vec::new();

    for (i, joint) in chain.iter().enumerate() {
        let name = scene.name(*joint)?;
        let ctrl = create_control(
            scene,
            &ControlSpec::new(stem(&name), ControlShape::Circle)
                .with_placement(Placement::Match(*joint))
                .with_cv_scale(ctr_scale),
        )?;
        if add_offset {
            let offset = scene.create_group(&with_suffix(&name, suffix::OFFSET), Some(ctrl.space))?;
            scene.reparent(ctrl.shape, Some(offset))?;
            offsets.push(offset);
        }

        scene.add_constraint(ConstraintKind::Orient, ctrl.shape, *joint, true)?;
        scene.hide_and_lock(
            ctrl.shape,
            &[
                "translateX",
                "translateY",
                "translateZ",
                "scaleX",
                "scaleY",
                "scaleZ",
                "visibility",
            ],
        )?;

        if i > 0 {
            scene.reparent(ctrl.space, Some(ctrs[i - 1].shape))?;
        }
        ctrs.push(ctrl);
    }
    Ok(FkControls { ctrs, offsets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigcraft_scene::MemoryScene;

    struct Arm {
        scene: MemoryScene,
        shoulder: NodeId,
        elbow: NodeId,
        wrist: NodeId,
        misc: NodeId,
        global_ctr: NodeId,
    }

    fn arm() -> Arm {
        let mut scene = MemoryScene::new();
        let misc = scene.create_group("hero_misc_grp", None).unwrap();
        let global_ctr = scene.create_group("hero_global_ctr", None).unwrap();
        let shoulder = scene
            .create_joint("hero_l_shoulder_jnt", None, DVec3::new(20.0, 140.0, 0.0))
            .unwrap();
        let elbow = scene
            .create_joint(
                "hero_l_elbow_jnt",
                Some(shoulder),
                DVec3::new(45.0, 140.0, -4.0),
            )
            .unwrap();
        let wrist = scene
            .create_joint("hero_l_wrist_jnt", Some(elbow), DVec3::new(70.0, 140.0, 0.0))
            .unwrap();
        Arm {
            scene,
            shoulder,
            elbow,
            wrist,
            misc,
            global_ctr,
        }
    }

    fn ik_params(a: &Arm) -> IkLimbParams {
        IkLimbParams {
            root: a.shoulder,
            mid: a.elbow,
            end: a.wrist,
            limb_name: "arm".to_string(),
            side_prefix: "l".to_string(),
            prefix: "hero".to_string(),
            constrain_ik_ctr: true,
            match_jnt_orient: true,
            ik_ctr_shape: ControlShape::Square,
            ik_ctr_scale: DVec3::splat(10.0),
            ik_ctr_rotate: DVec3::ZERO,
            pv_ctr_scale: DVec3::splat(10.0),
            pv_ctr_rotate: DVec3::new(90.0, 0.0, 0.0),
            misc_grp: a.misc,
            global_ctr: a.global_ctr,
        }
    }

    #[test]
    fn ik_chain_is_isolated_and_nested() {
        let mut a = arm();
        let params = ik_params(&a);
        let limb = build_ik_limb(&mut a.scene, &params).unwrap();

        assert_eq!(limb.chain.len(), 3);
        assert_eq!(
            a.scene.parent_of(limb.chain[1]).unwrap(),
            Some(limb.chain[0])
        );
        assert_eq!(
            a.scene.parent_of(limb.chain[2]).unwrap(),
            Some(limb.chain[1])
        );
        // Duplicates sit at the source joint positions.
        assert_eq!(
            a.scene.world_position(limb.chain[2]).unwrap(),
            DVec3::new(70.0, 140.0, 0.0)
        );
        assert_eq!(a.scene.name(limb.chain[0]).unwrap(), "hero_l_shoulder_ik");
        assert!(!limb.pole_degenerate);
        assert_eq!(a.scene.parent_of(limb.handle).unwrap(), Some(a.misc));

        // The handle follows the IK control, the end joint its orientation.
        let on_handle = a.scene.constraints_on(limb.handle);
        assert!(on_handle
            .iter()
            .any(|c| c.kind == ConstraintKind::Parent && c.driver == limb.end_ctr.shape));
        assert!(on_handle
            .iter()
            .any(|c| c.kind == ConstraintKind::PoleVector && c.driver == limb.pole_ctr.shape));
    }

    #[test]
    fn unconstrained_handle_for_the_leg() {
        let mut a = arm();
        let mut params = ik_params(&a);
        params.constrain_ik_ctr = false;
        let limb = build_ik_limb(&mut a.scene, &params).unwrap();
        let on_handle = a.scene.constraints_on(limb.handle);
        assert!(!on_handle.iter().any(|c| c.kind == ConstraintKind::Parent));
    }

    #[test]
    fn locked_ik_control_scale_rejects_writes() {
        let mut a = arm();
        let params = ik_params(&a);
        let limb = build_ik_limb(&mut a.scene, &params).unwrap();
        assert!(a
            .scene
            .set_attr(
                limb.end_ctr.shape,
                "scaleX",
                rigcraft_scene::AttrValue::Scalar(2.0)
            )
            .is_err());
    }

    #[test]
    fn fk_controls_nest_under_their_parents() {
        let mut a = arm();
        let chain = [a.shoulder, a.elbow, a.wrist];
        let limb = build_fk_limb(
            &mut a.scene,
            &chain,
            "arm",
            "l",
            "hero",
            DVec3::splat(10.0),
            a.global_ctr,
        )
        .unwrap();

        assert_eq!(limb.chain.len(), 3);
        assert_eq!(a.scene.name(limb.chain[2]).unwrap(), "hero_l_wrist_fk");
        // Space of the elbow control hangs under the shoulder control.
        assert_eq!(
            a.scene.parent_of(limb.ctrs[1].space).unwrap(),
            Some(limb.ctrs[0].shape)
        );
        assert_eq!(
            a.scene.parent_of(limb.ctrs[0].space).unwrap(),
            Some(limb.ctrs_grp)
        );
        // Each FK joint is orient-constrained to its control.
        for (ctrl, fk) in limb.ctrs.iter().zip(&limb.chain) {
            assert!(a
                .scene
                .constraints_on(*fk)
                .iter()
                .any(|c| c.kind == ConstraintKind::Orient && c.driver == ctrl.shape));
        }
    }

    #[test]
    fn offset_groups_sit_between_space_and_control() {
        let mut a = arm();
        let chain = [a.shoulder, a.elbow];
        let built = fk_controls_for_chain(&mut a.scene, &chain, DVec3::splat(3.0), true).unwrap();
        assert_eq!(built.offsets.len(), 2);
        assert_eq!(
            a.scene.parent_of(built.ctrs[0].shape).unwrap(),
            Some(built.offsets[0])
        );
        assert_eq!(
            a.scene.parent_of(built.offsets[0]).unwrap(),
            Some(built.ctrs[0].space)
        );
    }
}
