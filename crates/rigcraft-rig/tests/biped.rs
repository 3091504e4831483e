//! End-to-end build of the default biped rig into the in-memory scene.

use glam::DVec3;
use pretty_assertions::assert_eq;
use rigcraft_rig::{AutoRigger, BuildWarning, RigError};
use rigcraft_scene::{AttrValue, ConstraintKind, MemoryScene, NodeId, NodeKind, SceneBackend};
use rigcraft_spec::RigConfig;

fn build(config: RigConfig) -> (MemoryScene, rigcraft_rig::BuildReport) {
    let rigger = AutoRigger::with_biped_template(config);
    let mut scene = MemoryScene::new();
    let report = rigger.build(&mut scene).expect("build failed");
    (scene, report)
}

fn node(scene: &MemoryScene, name: &str) -> NodeId {
    scene
        .find_by_name(name)
        .unwrap_or_else(|| panic!("missing node {name}"))
}

fn scalar(scene: &MemoryScene, id: NodeId, attr: &str) -> f64 {
    scene.get_attr(id, attr).unwrap().as_scalar()
}

#[test]
fn default_build_is_clean() {
    let (scene, report) = build(RigConfig::new("hero"));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.rig_name, "hero");
    assert!(report.joints > 100);
    assert!(report.controls > 30);
    assert!(report.constraints > 50);
    assert!(report.dataflow_nodes > 50);

    // Both skeleton layers under their groups, animation layer hidden.
    let bind_grp = node(&scene, "hero_bindSkeleton_grp");
    let anim_grp = node(&scene, "hero_animSkeleton_grp");
    let bind_root = node(&scene, "hero_c_root_bnd");
    assert_eq!(scene.parent_of(bind_root).unwrap(), Some(bind_grp));
    assert_eq!(scalar(&scene, anim_grp, "visibility"), 0.0);
    assert_eq!(scalar(&scene, bind_grp, "visibility"), 1.0);
}

#[test]
fn pelvis_sits_between_root_and_thighs() {
    let (scene, _) = build(RigConfig::new("hero"));
    let root = node(&scene, "hero_c_root_bnd");
    let pelvis = node(&scene, "hero_c_pelvis_bnd");
    assert_eq!(scene.parent_of(pelvis).unwrap(), Some(root));
    for side in ["l", "r"] {
        let thigh = node(&scene, &format!("hero_{side}_thigh_bnd"));
        assert_eq!(scene.parent_of(thigh).unwrap(), Some(pelvis));
    }
}

#[test]
fn spine_is_split_evenly_between_root_and_neck() {
    let (scene, _) = build(RigConfig::new("hero"));
    // Template root at y=100, neck base at y=150, five spine joints.
    let names = [
        "hero_c_spine01_bnd",
        "hero_c_spine02_bnd",
        "hero_c_spine03_bnd",
        "hero_c_spine04_bnd",
        "hero_c_spineEnd_bnd",
    ];
    for (i, name) in names.iter().enumerate() {
        let joint = node(&scene, name);
        let pos = scene.world_position(joint).unwrap();
        assert!(
            (pos - DVec3::new(0.0, 100.0 + 12.5 * i as f64, 0.0)).length() < 1e-6,
            "{name} at {pos}"
        );
    }
    // The template neck placeholder is consumed by the rebuild.
    assert!(scene.find_by_name("hero_c_neck_bnd").is_none());
    // The head rides the neck end.
    let head = node(&scene, "hero_c_head_bnd");
    let neck_end = node(&scene, "hero_c_neckEnd_bnd");
    assert_eq!(scene.parent_of(head).unwrap(), Some(neck_end));
}

#[test]
fn spine_joints_ride_ribbon_follicles() {
    let (scene, _) = build(RigConfig::new("hero"));
    for name in [
        "hero_c_spine01_jnt",
        "hero_c_spine03_jnt",
        "hero_c_spineEnd_jnt",
    ] {
        let joint = node(&scene, name);
        let parent = scene.parent_of(joint).unwrap().expect("parent");
        assert!(
            matches!(scene.kind(parent).unwrap(), NodeKind::Follicle { .. }),
            "{name} not on a follicle"
        );
    }
    for name in ["spineRoot", "spineMid", "spineEnd"] {
        node(&scene, &format!("hero_c_{name}_cls"));
        node(&scene, &format!("hero_c_{name}Ik_ctr"));
        node(&scene, &format!("hero_c_{name}Fk_ctr"));
    }
}

#[test]
fn blend_attribute_fades_fk_to_ik() {
    let (mut scene, _) = build(RigConfig::new("hero"));
    let global = node(&scene, "hero_global_ctr");
    for attr in ["lArmIkFk", "rArmIkFk", "lLegIkFk", "rLegIkFk"] {
        assert_eq!(scalar(&scene, global, attr), 0.0, "{attr} default");
    }

    let anim = node(&scene, "hero_l_shoulder_jnt");
    let ik = node(&scene, "hero_l_shoulder_ik");
    let fk = node(&scene, "hero_l_shoulder_fk");
    scene.set_attr(ik, "rotateZ", AttrValue::Scalar(40.0)).unwrap();
    scene.set_attr(fk, "rotateZ", AttrValue::Scalar(10.0)).unwrap();

    // 0 reads pure FK, 1 pure IK, in between is a lerp.
    assert!((scalar(&scene, anim, "rotateZ") - 10.0).abs() < 1e-9);
    scene.set_attr(global, "lArmIkFk", AttrValue::Scalar(1.0)).unwrap();
    assert!((scalar(&scene, anim, "rotateZ") - 40.0).abs() < 1e-9);
    scene.set_attr(global, "lArmIkFk", AttrValue::Scalar(0.25)).unwrap();
    assert!((scalar(&scene, anim, "rotateZ") - 17.5).abs() < 1e-9);
}

#[test]
fn blend_attribute_toggles_control_visibility() {
    let (mut scene, _) = build(RigConfig::new("hero"));
    let global = node(&scene, "hero_global_ctr");
    let ik_grp = node(&scene, "hero_l_armIkCtrs_grp");
    let fk_grp = node(&scene, "hero_l_armFkCtrs_grp");

    assert_eq!(scalar(&scene, ik_grp, "visibility"), 0.0);
    assert_eq!(scalar(&scene, fk_grp, "visibility"), 1.0);
    scene.set_attr(global, "lArmIkFk", AttrValue::Scalar(1.0)).unwrap();
    assert_eq!(scalar(&scene, ik_grp, "visibility"), 1.0);
    assert_eq!(scalar(&scene, fk_grp, "visibility"), 0.0);
}

#[test]
fn arm_stretch_follows_the_ik_control() {
    let (mut scene, _) = build(RigConfig::new("hero"));
    let global = node(&scene, "hero_global_ctr");
    let ik_ctr = node(&scene, "hero_l_armIk_ctr");
    let shoulder_ik = node(&scene, "hero_l_shoulder_ik");
    let elbow_ik = node(&scene, "hero_l_elbow_ik");

    // Rest length 50 (shoulder x=15 to wrist x=65); pulled to 75.
    scene.set_attr(global, "lArmStretch", AttrValue::Scalar(1.0)).unwrap();
    scene
        .set_world_position(ik_ctr, DVec3::new(90.0, 145.0, 0.0))
        .unwrap();
    assert!((scalar(&scene, shoulder_ik, "scaleX") - 1.5).abs() < 1e-9);
    assert!((scalar(&scene, elbow_ik, "scaleX") - 1.5).abs() < 1e-9);

    // Toggle off restores unit scale even while pulled.
    scene.set_attr(global, "lArmStretch", AttrValue::Scalar(0.0)).unwrap();
    assert!((scalar(&scene, shoulder_ik, "scaleX") - 1.0).abs() < 1e-9);
}

#[test]
fn upper_arm_twists_counter_the_shoulder_roll() {
    let (mut scene, _) = build(RigConfig::new("hero"));
    let shoulder = node(&scene, "hero_l_shoulder_bnd");
    scene.set_attr(shoulder, "rotateX", AttrValue::Scalar(30.0)).unwrap();

    let expected = [-30.0, -20.0, -10.0];
    for (i, value) in expected.iter().enumerate() {
        let twist = node(&scene, &format!("hero_l_shoulderTwist{:02}_bnd", i + 1));
        assert_eq!(scene.parent_of(twist).unwrap(), Some(shoulder));
        assert!((scalar(&scene, twist, "rotateX") - value).abs() < 1e-9);
    }
    // Forearm twists anchor to the elbow and follow the wrist instead.
    let elbow = node(&scene, "hero_l_elbow_bnd");
    let forearm = node(&scene, "hero_l_wristTwist01_bnd");
    assert_eq!(scene.parent_of(forearm).unwrap(), Some(elbow));
}

#[test]
fn foot_roll_lives_on_the_leg_ik_control() {
    let (mut scene, _) = build(RigConfig::new("hero"));
    let leg_ctr = node(&scene, "hero_l_legIk_ctr");
    for attr in ["heelRoll", "ballRoll", "toeRoll", "toeLift"] {
        assert_eq!(scalar(&scene, leg_ctr, attr), 0.0);
    }
    let heel_grp = node(&scene, "hero_l_heelRoll_nul");
    assert_eq!(scene.parent_of(heel_grp).unwrap(), Some(leg_ctr));

    // The driver chain extends the IK leg below the ankle.
    let ankle_ik = node(&scene, "hero_l_ankle_ik");
    let ankle_drv = node(&scene, "hero_l_ankle_drv");
    assert_eq!(scene.parent_of(ankle_drv).unwrap(), Some(ankle_ik));

    scene.set_attr(leg_ctr, "ballRoll", AttrValue::Scalar(20.0)).unwrap();
    let ball_ik = node(&scene, "hero_l_ball_ik");
    assert!((scalar(&scene, ball_ik, "rotateZ") + 20.0).abs() < 1e-9);
}

#[test]
fn anim_layer_drives_the_bind_layer() {
    let (scene, _) = build(RigConfig::new("hero"));
    for name in ["hero_l_wrist", "hero_c_pelvis", "hero_c_spine03"] {
        let bind = node(&scene, &format!("{name}_bnd"));
        let anim = node(&scene, &format!("{name}_jnt"));
        assert!(
            scene
                .constraints_on(bind)
                .iter()
                .any(|c| c.kind == ConstraintKind::Parent && c.driver == anim),
            "{name} not constrained"
        );
    }
    // Twist joints deform directly; they have no animation counterpart.
    let twist = node(&scene, "hero_l_shoulderTwist01_bnd");
    assert!(scene.constraints_on(twist).is_empty());
}

#[test]
fn single_finger_fallback_keeps_only_the_index() {
    let (scene, _) = build(RigConfig::new("hero").with_finger_count(1));
    node(&scene, "hero_l_index01_bnd");
    assert!(scene.find_by_name("hero_l_thumb01_bnd").is_none());
    assert!(scene.find_by_name("hero_l_middle01_bnd").is_none());

    let setting = node(&scene, "hero_l_handSetting_ctr");
    assert_eq!(scalar(&scene, setting, "indexCurl"), 0.0);
    assert!(scene.get_attr(setting, "thumbCurl").is_err());
}

#[test]
fn extra_fingers_continue_past_the_named_five() {
    let (scene, _) = build(RigConfig::new("hero").with_finger_count(7));
    node(&scene, "hero_l_extraFingerA01_bnd");
    node(&scene, "hero_r_extraFingerB04_bnd");
    let setting = node(&scene, "hero_l_handSetting_ctr");
    assert_eq!(scalar(&scene, setting, "extraFingerBCurl"), 0.0);
}

#[test]
fn toes_get_their_own_setting_control() {
    let (mut scene, _) = build(RigConfig::new("hero").with_toe_count(2));
    node(&scene, "hero_l_toeA01_bnd");
    let setting = node(&scene, "hero_l_footSetting_ctr");
    scene.set_attr(setting, "toeBCurl", AttrValue::Scalar(15.0)).unwrap();
    let offset = node(&scene, "hero_l_toeB01_offset");
    assert_eq!(scalar(&scene, offset, "rotateZ"), 15.0);

    // Without toes there is no foot setting control at all.
    let (scene, _) = build(RigConfig::new("hero"));
    assert!(scene.find_by_name("hero_l_footSetting_ctr").is_none());
}

#[test]
fn fk_only_arms_skip_stretch_with_a_warning() {
    let config = RigConfig::new("hero").with_arm_modes(false, true);
    let (scene, report) = build(config);

    let warned: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| matches!(w, BuildWarning::StretchWithoutIk { .. }))
        .collect();
    assert_eq!(warned.len(), 2);
    assert!(report.warnings.contains(&BuildWarning::StretchWithoutIk {
        limb: "lArm".to_string()
    }));

    let global = node(&scene, "hero_global_ctr");
    // No IK chain: no stretch toggle and no blend attribute either, the
    // blender is pinned to FK.
    assert!(scene.get_attr(global, "lArmStretch").is_err());
    assert!(scene.get_attr(global, "lArmIkFk").is_err());
    assert!(scene.find_by_name("hero_l_armIk_ctr").is_none());
    node(&scene, "hero_l_shoulder_fk");
}

#[test]
fn invalid_configuration_is_rejected_before_building() {
    let rigger = AutoRigger::with_biped_template(RigConfig::new("hero").with_spine_joint_count(6));
    let mut scene = MemoryScene::new();
    let err = rigger.build(&mut scene);
    assert!(matches!(err, Err(RigError::InvalidConfig(_))));
    // Nothing was created.
    assert!(scene.nodes().is_empty());
}

#[test]
fn clavicles_and_neck_follow_the_spine_top() {
    let (scene, _) = build(RigConfig::new("hero"));
    let spine_end_ctr = node(&scene, "hero_c_spineEndIk_ctr");
    for name in ["hero_l_clavicle_nul", "hero_r_clavicle_nul", "hero_c_neck01_nul"] {
        let space = node(&scene, name);
        assert_eq!(scene.parent_of(space).unwrap(), Some(spine_end_ctr), "{name}");
    }
}

#[test]
fn build_report_serializes_for_the_cli() {
    let (_, report) = build(RigConfig::new("hero").with_arm_modes(false, true));
    let value = serde_json::to_value(&report).expect("report to json");

    assert_eq!(value["rig_name"], "hero");
    assert_eq!(value["joints"], serde_json::json!(report.joints));
    assert_eq!(value["controls"], serde_json::json!(report.controls));

    // Warnings carry a machine-readable tag alongside the limb label.
    let warnings = value["warnings"].as_array().expect("warnings array");
    assert_eq!(warnings.len(), report.warnings.len());
    assert!(warnings
        .iter()
        .any(|w| w["kind"] == "stretch_without_ik" && w["limb"] == "lArm"));
}
