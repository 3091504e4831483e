//! IK foot roll.
//!
//! A driver copy of the ankle/ball/toe chain pivots around four nested
//! locators (heel, toe, ball, ankle), each driven by an attribute on the
//! leg IK control. The leg's IK handle follows the ankle pivot, so rolling
//! the foot rolls the whole leg end.

use glam::DVec3;
use rigcraft_scene::{
    AttrDef, AttrValue, ConstraintKind, MdOperation, NodeId, NodeKind, Plug, SceneBackend,
};

use crate::error::RigResult;
use crate::naming::{sided_name, suffix, with_suffix};

/// Inputs for one foot.
#[derive(Debug, Clone)]
pub struct FootRollParams {
    /// Animation ankle joint.
    pub ankle: NodeId,
    /// Animation ball joint.
    pub ball: NodeId,
    /// Animation toe joint.
    pub toe: NodeId,
    /// Leg IK control; receives the roll attributes and the pivot stack.
    pub leg_ik_ctr: NodeId,
    /// Leg IK handle; point-constrained to the ankle pivot.
    pub leg_ik_handle: NodeId,
    /// Side prefix, `l` or `r`.
    pub side_prefix: String,
    /// Rig name prefix.
    pub prefix: String,
}

/// A built foot roll.
#[derive(Debug, Clone)]
pub struct FootRoll {
    /// Driver joints: ankle driver, ball IK, toe IK. These extend the leg
    /// IK chain for blending.
    pub drv_chain: Vec<NodeId>,
    /// Outermost pivot group (the heel), parented under the IK control.
    pub heel_grp: NodeId,
}

/// Wraps a node in a group at its own world position, under its parent.
fn space_grp<S: SceneBackend>(scene: &mut S, node: NodeId) -> RigResult<NodeId> {
    let name = with_suffix(&scene.name(node)?, suffix::SPACE);
    let parent = scene.parent_of(node)?;
    let grp = scene.create_group(&name, parent)?;
    let pos = scene.world_position(node)?;
    scene.set_world_position(grp, pos)?;
    scene.reparent(node, Some(grp))?;
    Ok(grp)
}

/// Builds the foot roll rig.
pub fn build_foot_roll<S: SceneBackend>(scene: &mut S, params: &FootRollParams) -> RigResult<FootRoll> {
    let ankle_drv = scene.duplicate_parent_only(
        params.ankle,
        &with_suffix(&scene.name(params.ankle)?, suffix::DRIVER),
    )?;
    let ball_ik = scene.duplicate_parent_only(
        params.ball,
        &with_suffix(&scene.name(params.ball)?, suffix::IK),
    )?;
    let toe_ik = scene.duplicate_parent_only(
        params.toe,
        &with_suffix(&scene.name(params.toe)?, suffix::IK),
    )?;
    scene.reparent(toe_ik, Some(ball_ik))?;
    scene.reparent(ball_ik, Some(ankle_drv))?;

    let loc = |scene: &mut S, mid: &str| {
        scene.create_locator(
            &sided_name(&params.prefix, &params.side_prefix, mid, suffix::LOCATOR),
            None,
        )
    };
    let toe_loc = loc(scene, "toeRoll")?;
    let ball_loc = loc(scene, "ballRoll")?;
    let heel_loc = loc(scene, "heelRoll")?;
    let ankle_loc = loc(scene, "ankleRoll")?;

    let toe_pos = scene.world_position(toe_ik)?;
    let ball_pos = scene.world_position(ball_ik)?;
    let ankle_pos = scene.world_position(ankle_drv)?;
    scene.set_world_position(toe_loc, toe_pos)?;
    scene.set_world_position(ball_loc, ball_pos)?;
    scene.set_world_position(ankle_loc, ankle_pos)?;
    // The heel pivot sits under the ankle, on the ground.
    scene.set_world_position(heel_loc, DVec3::new(ankle_pos.x, 0.0, ankle_pos.z))?;

    let ball_grp = space_grp(scene, ball_loc)?;
    let toe_grp = space_grp(scene, toe_loc)?;
    let heel_grp = space_grp(scene, heel_loc)?;
    let ankle_grp = space_grp(scene, ankle_loc)?;

    // Pivot stack: rolling the heel carries everything, the toe carries
    // ball and ankle, the ball carries the ankle.
    scene.reparent(ankle_grp, Some(ball_loc))?;
    scene.reparent(ball_grp, Some(toe_loc))?;
    scene.reparent(toe_grp, Some(heel_loc))?;

    for attr in ["heelRoll", "ballRoll", "toeRoll", "toeLift"] {
        scene.add_attr(params.leg_ik_ctr, attr, AttrDef::keyable(0.0))?;
    }
    scene.connect(
        Plug::new(params.leg_ik_ctr, "toeRoll"),
        Plug::new(toe_loc, "rotateZ"),
    )?;
    scene.connect(
        Plug::new(params.leg_ik_ctr, "ballRoll"),
        Plug::new(ball_loc, "rotateZ"),
    )?;
    scene.connect(
        Plug::new(params.leg_ik_ctr, "heelRoll"),
        Plug::new(heel_loc, "rotateZ"),
    )?;

    // ball.rotateZ = -(ballRoll + toeLift); the ball joint counter-rotates
    // so the toes stay planted while the heel lifts.
    let sum = scene.create_utility(
        &sided_name(&params.prefix, &params.side_prefix, "ballLift", suffix::NODE),
        NodeKind::Sum,
    )?;
    scene.connect(
        Plug::new(params.leg_ik_ctr, "ballRoll"),
        Plug::new(sum, "input1X"),
    )?;
    scene.connect(
        Plug::new(params.leg_ik_ctr, "toeLift"),
        Plug::new(sum, "input2X"),
    )?;
    let flip = scene.create_utility(
        &sided_name(&params.prefix, &params.side_prefix, "ballLiftFlip", suffix::NODE),
        NodeKind::MultiplyDivide(MdOperation::Multiply),
    )?;
    scene.set_attr(flip, "input2X", AttrValue::Scalar(-1.0))?;
    scene.connect(Plug::new(sum, "outputX"), Plug::new(flip, "input1X"))?;
    scene.connect(Plug::new(flip, "outputX"), Plug::new(ball_ik, "rotateZ"))?;

    scene.add_constraint(ConstraintKind::Orient, ball_loc, ankle_drv, true)?;
    scene.add_constraint(ConstraintKind::Point, ankle_loc, params.leg_ik_handle, true)?;

    scene.reparent(heel_grp, Some(params.leg_ik_ctr))?;

    Ok(FootRoll {
        drv_chain: vec![ankle_drv, ball_ik, toe_ik],
        heel_grp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigcraft_scene::MemoryScene;

    struct Foot {
        scene: MemoryScene,
        roll: FootRoll,
        ik_ctr: NodeId,
    }

    fn build() -> Foot {
        let mut scene = MemoryScene::new();
        let ankle = scene
            .create_joint("hero_l_ankle_jnt", None, DVec3::new(10.0, 9.0, 0.0))
            .unwrap();
        let ball = scene
            .create_joint("hero_l_ball_jnt", Some(ankle), DVec3::new(10.0, 2.0, 10.0))
            .unwrap();
        let toe = scene
            .create_joint("hero_l_footTip_jnt", Some(ball), DVec3::new(10.0, 1.0, 17.0))
            .unwrap();
        let ik_ctr = scene.create_group("hero_l_legIk_ctr", None).unwrap();
        let handle = scene.create_ik_handle("hero_l_legIk_ikh", ankle, toe).unwrap();

        let roll = build_foot_roll(
            &mut scene,
            &FootRollParams {
                ankle,
                ball,
                toe,
                leg_ik_ctr: ik_ctr,
                leg_ik_handle: handle,
                side_prefix: "l".to_string(),
                prefix: "hero".to_string(),
            },
        )
        .unwrap();
        Foot {
            scene,
            roll,
            ik_ctr,
        }
    }

    #[test]
    fn driver_chain_is_nested_and_named() {
        let f = build();
        let [ankle_drv, ball_ik, toe_ik] = f.roll.drv_chain[..] else {
            panic!("expected three driver joints");
        };
        assert_eq!(f.scene.name(ankle_drv).unwrap(), "hero_l_ankle_drv");
        assert_eq!(f.scene.name(ball_ik).unwrap(), "hero_l_ball_ik");
        assert_eq!(f.scene.parent_of(toe_ik).unwrap(), Some(ball_ik));
        assert_eq!(f.scene.parent_of(ball_ik).unwrap(), Some(ankle_drv));
    }

    #[test]
    fn heel_pivot_sits_on_the_ground_under_the_control() {
        let f = build();
        assert_eq!(f.scene.parent_of(f.roll.heel_grp).unwrap(), Some(f.ik_ctr));
        let heel_loc = f.scene.find_by_name("hero_l_heelRoll_loc").unwrap();
        let pos = f.scene.world_position(heel_loc).unwrap();
        assert_eq!(pos, DVec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn ball_counter_rotates_against_roll_and_lift() {
        let mut f = build();
        f.scene
            .set_attr(f.ik_ctr, "ballRoll", AttrValue::Scalar(25.0))
            .unwrap();
        f.scene
            .set_attr(f.ik_ctr, "toeLift", AttrValue::Scalar(10.0))
            .unwrap();
        let ball_ik = f.roll.drv_chain[1];
        assert_eq!(
            f.scene.get_attr(ball_ik, "rotateZ").unwrap().as_scalar(),
            -35.0
        );
    }

    #[test]
    fn roll_attributes_reach_their_pivots() {
        let mut f = build();
        f.scene
            .set_attr(f.ik_ctr, "toeRoll", AttrValue::Scalar(15.0))
            .unwrap();
        let toe_loc = f.scene.find_by_name("hero_l_toeRoll_loc").unwrap();
        assert_eq!(
            f.scene.get_attr(toe_loc, "rotateZ").unwrap().as_scalar(),
            15.0
        );
        // Pivot stack: heel carries toe carries ball carries ankle.
        let heel_loc = f.scene.find_by_name("hero_l_heelRoll_loc").unwrap();
        let ball_grp = f.scene.find_by_name("hero_l_ballRoll_nul").unwrap();
        let toe_grp = f.scene.find_by_name("hero_l_toeRoll_nul").unwrap();
        let ankle_grp = f.scene.find_by_name("hero_l_ankleRoll_nul").unwrap();
        assert_eq!(f.scene.parent_of(toe_grp).unwrap(), Some(heel_loc));
        assert_eq!(f.scene.parent_of(ball_grp).unwrap(), Some(toe_loc));
        let ball_loc = f.scene.find_by_name("hero_l_ballRoll_loc").unwrap();
        assert_eq!(f.scene.parent_of(ankle_grp).unwrap(), Some(ball_loc));
    }
}
