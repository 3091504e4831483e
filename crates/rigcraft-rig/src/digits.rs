//! Finger and toe controls.
//!
//! Each hand or foot gets one setting control that rides its parent joint
//! and carries a curl attribute per digit. Digit joints get rotate-only FK
//! controls with an extra offset group each; the curl attribute drives all
//! of a digit's offsets at once.

use glam::DVec3;
use rigcraft_scene::{AttrDef, ConstraintKind, NodeId, NodeKind, Plug, SceneBackend};

use crate::control::{create_control, Control, ControlShape, ControlSpec, Placement};
use crate::error::RigResult;
use crate::limb::fk_controls_for_chain;
use crate::naming::suffix;

/// Inputs for one hand or foot setting control and its digit controls.
#[derive(Debug, Clone)]
pub struct DigitSettingParams<'a> {
    /// Digit label and animation root joint, one per digit, e.g.
    /// `("index", l_index01)`.
    pub digit_roots: &'a [(String, NodeId)],
    /// Animation joint the setting control rides (wrist or ball).
    pub parent_jnt: NodeId,
    /// Control stem, e.g. `hero_l_handSetting`.
    pub name_stem: String,
    /// CV rotation for the setting shape, degrees.
    pub cv_rotate: DVec3,
    /// CV offset for the setting shape, away from the joint.
    pub cv_move: DVec3,
    /// Parent group for the setting control space.
    pub ctr_grp: NodeId,
}

/// Builds the setting control and all digit controls under it.
pub fn build_digit_controls<S: SceneBackend>(
    scene: &mut S,
    params: &DigitSettingParams<'_>,
) -> RigResult<Control> {
    let setting = create_control(
        scene,
        &ControlSpec::new(params.name_stem.as_str(), ControlShape::HandSetting)
            .with_placement(Placement::Match(params.parent_jnt))
            .with_cv_size(4.0)
            .with_cv_rotation(params.cv_rotate)
            .with_cv_offset(params.cv_move),
    )?;
    scene.reparent(setting.space, Some(params.ctr_grp))?;
    // The setting control follows its joint; its own channels are parked.
    scene.add_constraint(ConstraintKind::Parent, params.parent_jnt, setting.shape, true)?;
    scene.hide_and_lock(
        setting.shape,
        &[
            "translateX",
            "translateY",
            "translateZ",
            "rotateX",
            "rotateY",
            "rotateZ",
            "scaleX",
            "scaleY",
            "scaleZ",
            "visibility",
        ],
    )?;

    for (digit_name, root) in params.digit_roots {
        let chain = digit_chain(scene, *root)?;
        let built = fk_controls_for_chain(scene, &chain, DVec3::splat(3.0), true)?;

        let curl_attr = format!("{digit_name}Curl");
        scene.add_attr(setting.shape, &curl_attr, AttrDef::keyable(0.0))?;
        for offset in &built.offsets {
            scene.connect(
                Plug::new(setting.shape, curl_attr.as_str()),
                Plug::new(*offset, "rotateZ"),
            )?;
        }
        scene.reparent(built.ctrs[0].space, Some(setting.shape))?;
    }
    Ok(setting)
}

/// The digit joint chain from its root, excluding the unskinned tip.
fn digit_chain<S: SceneBackend>(scene: &mut S, root: NodeId) -> RigResult<Vec<NodeId>> {
    let mut chain = vec![root];
    for id in scene.descendants(root)? {
        if matches!(scene.kind(id)?, NodeKind::Joint) {
            chain.push(id);
        }
    }
    chain.pop();
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigcraft_scene::{AttrValue, MemoryScene};

    fn finger(scene: &mut MemoryScene, wrist: NodeId, name: &str, z: f64) -> NodeId {
        let root = scene
            .create_joint(
                &format!("hero_l_{name}01_jnt"),
                Some(wrist),
                DVec3::new(75.0, 140.0, z),
            )
            .unwrap();
        let mut prev = root;
        for i in 2..=4 {
            prev = scene
                .create_joint(
                    &format!("hero_l_{name}{i:02}_jnt"),
                    Some(prev),
                    DVec3::new(75.0 + 3.0 * (i - 1) as f64, 140.0, z),
                )
                .unwrap();
        }
        root
    }

    #[test]
    fn curl_drives_every_offset_of_its_digit() {
        let mut scene = MemoryScene::new();
        let ctr_grp = scene.create_group("hero_ctr_grp", None).unwrap();
        let wrist = scene
            .create_joint("hero_l_wrist_jnt", None, DVec3::new(70.0, 140.0, 0.0))
            .unwrap();
        let index = finger(&mut scene, wrist, "index", 2.0);
        let pinky = finger(&mut scene, wrist, "pinky", -2.0);

        let roots = vec![("index".to_string(), index), ("pinky".to_string(), pinky)];
        let setting = build_digit_controls(
            &mut scene,
            &DigitSettingParams {
                digit_roots: &roots,
                parent_jnt: wrist,
                name_stem: "hero_l_handSetting".to_string(),
                cv_rotate: DVec3::new(0.0, 90.0, 0.0),
                cv_move: DVec3::new(10.0, 7.0, 0.0),
                ctr_grp,
            },
        )
        .unwrap();

        scene
            .set_attr(setting.shape, "indexCurl", AttrValue::Scalar(30.0))
            .unwrap();
        // Three driven joints per finger: the tip gets no control.
        for i in 1..=3 {
            let offset = scene
                .find_by_name(&format!("hero_l_index{i:02}_offset"))
                .unwrap();
            assert_eq!(
                scene.get_attr(offset, "rotateZ").unwrap().as_scalar(),
                30.0
            );
        }
        assert!(scene.find_by_name("hero_l_index04_offset").is_none());
        // The other digit is untouched.
        let pinky_offset = scene.find_by_name("hero_l_pinky01_offset").unwrap();
        assert_eq!(
            scene.get_attr(pinky_offset, "rotateZ").unwrap().as_scalar(),
            0.0
        );
    }

    #[test]
    fn digit_spaces_nest_under_the_setting_control() {
        let mut scene = MemoryScene::new();
        let ctr_grp = scene.create_group("hero_ctr_grp", None).unwrap();
        let wrist = scene
            .create_joint("hero_l_wrist_jnt", None, DVec3::new(70.0, 140.0, 0.0))
            .unwrap();
        let index = finger(&mut scene, wrist, "index", 2.0);
        let roots = vec![("index".to_string(), index)];
        let setting = build_digit_controls(
            &mut scene,
            &DigitSettingParams {
                digit_roots: &roots,
                parent_jnt: wrist,
                name_stem: "hero_l_handSetting".to_string(),
                cv_rotate: DVec3::ZERO,
                cv_move: DVec3::ZERO,
                ctr_grp,
            },
        )
        .unwrap();

        assert_eq!(scene.parent_of(setting.space).unwrap(), Some(ctr_grp));
        let root_space = scene.find_by_name("hero_l_index01_nul").unwrap();
        assert_eq!(scene.parent_of(root_space).unwrap(), Some(setting.shape));
        // Setting control rides the wrist.
        assert!(scene
            .constraints_on(setting.shape)
            .iter()
            .any(|c| c.kind == ConstraintKind::Parent && c.driver == wrist));
    }
}
