//! The build orchestrator: turns a validated configuration plus a placed
//! template skeleton into the complete control rig.
//!
//! The sequence is strictly ordered by data availability: the bind skeleton
//! must exist before it can be oriented, the animation skeleton is
//! duplicated from the finished bind skeleton, limb drivers duplicate
//! animation joints, and the blend networks need every driver chain in
//! place. [`AutoRigger::build`] runs the whole pipeline against any
//! [`SceneBackend`] and returns a [`BuildReport`].

use std::collections::BTreeMap;

use glam::DVec3;
use rigcraft_scene::{
    AttrValue, ConstraintKind, NodeId, NodeKind, Plug, SceneBackend,
};
use rigcraft_spec::{JointKey, RigConfig, Side, TemplateSkeleton};

use crate::blend::{build_limb_blend, BlendParams, LimbDrivers};
use crate::control::{create_control, Control, ControlShape, ControlSpec, Placement};
use crate::digits::{build_digit_controls, DigitSettingParams};
use crate::error::{BuildWarning, RigError, RigResult};
use crate::foot::{build_foot_roll, FootRoll, FootRollParams};
use crate::hierarchy::{
    add_orient, aim_chain, match_orient, orient_toward, split_chain, zero_orient, SecondaryAxis,
};
use crate::limb::{build_fk_limb, build_ik_limb, fk_controls_for_chain, FkLimb, IkLimb, IkLimbParams};
use crate::naming::{joint_name, part_name, suffix};
use crate::registry::{JointLayer, JointRegistry};
use crate::ribbon::{build_ribbon_spine, RibbonParams, RibbonSpine};
use crate::stretch::{build_stretch_limb, StretchParams};
use crate::twist::{build_twist_chain, default_twist_rates, TwistAxis, TwistChainParams};

/// Width of the spine ribbon surface.
const RIBBON_WIDTH: f64 = 10.0;
/// CV size for limb FK and IK controls.
const LIMB_CTR_SIZE: f64 = 10.0;
/// CV size for clavicle and neck controls.
const NECK_CTR_SIZE: f64 = 7.0;

/// Summary of a finished build.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildReport {
    /// Rig name the build was run with.
    pub rig_name: String,
    /// Joints created, over all layers (bind, animation, drivers, twists).
    pub joints: usize,
    /// Control curves created.
    pub controls: usize,
    /// Constraints recorded.
    pub constraints: usize,
    /// Dataflow utility nodes created.
    pub dataflow_nodes: usize,
    /// Non-fatal conditions hit during the build.
    pub warnings: Vec<BuildWarning>,
}

/// The rig builder: one configuration, one template, one build.
#[derive(Debug, Clone)]
pub struct AutoRigger {
    config: RigConfig,
    template: TemplateSkeleton,
}

impl AutoRigger {
    /// Creates a rigger from a configuration and a placed template.
    pub fn new(config: RigConfig, template: TemplateSkeleton) -> Self {
        Self { config, template }
    }

    /// Creates a rigger over the standard biped template, sized from the
    /// configuration's digit counts.
    pub fn with_biped_template(config: RigConfig) -> Self {
        let template = TemplateSkeleton::biped(config.finger_count, config.toe_count);
        Self { config, template }
    }

    /// The configuration this rigger builds from.
    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// The template skeleton this rigger builds from.
    pub fn template(&self) -> &TemplateSkeleton {
        &self.template
    }

    /// Runs the full build pipeline into the scene.
    ///
    /// Both inputs are validated before the first scene mutation; a failed
    /// build leaves a partial rig behind, so callers should discard the
    /// scene on error.
    pub fn build<S: SceneBackend>(&self, scene: &mut S) -> RigResult<BuildReport> {
        let result = self.config.validate();
        if !result.is_ok() {
            return Err(RigError::InvalidConfig(result.errors));
        }
        self.template.validate()?;

        let prefix = self.config.rig_name.clone();
        let rig_grp = scene.create_group(&part_name(&prefix, "rig", suffix::GROUP), None)?;
        let misc_grp = scene.create_group(&part_name(&prefix, "misc", suffix::GROUP), Some(rig_grp))?;
        let ctr_grp = scene.create_group(&part_name(&prefix, "ctr", suffix::GROUP), Some(rig_grp))?;
        let bind_grp = scene.create_group(
            &part_name(&prefix, "bindSkeleton", suffix::GROUP),
            Some(rig_grp),
        )?;
        let anim_grp = scene.create_group(
            &part_name(&prefix, "animSkeleton", suffix::GROUP),
            Some(rig_grp),
        )?;

        let (finger_names, toe_names) = digit_names(&self.config);
        let builder = Builder {
            scene,
            config: &self.config,
            template: &self.template,
            prefix,
            registry: JointRegistry::new(),
            warnings: Vec::new(),
            finger_names,
            toe_names,
            spine_keys: Vec::new(),
            neck_keys: Vec::new(),
            rig_grp,
            misc_grp,
            ctr_grp,
            bind_grp,
            anim_grp,
        };
        builder.run()
    }
}

/// Digit chain names per hand and foot for a configuration. Finger counts
/// of 0 and 1 fall back to a single index finger; counts past the five
/// named fingers continue with synthetic `extraFingerA..` chains. Toes are
/// always synthetic `toeA..` chains.
fn digit_names(config: &RigConfig) -> (Vec<String>, Vec<String>) {
    const NAMED: [&str; 5] = ["thumb", "index", "middle", "ring", "pinky"];
    let mut fingers: Vec<String> = if config.finger_count <= 1 {
        vec!["index".to_string()]
    } else {
        NAMED
            .iter()
            .take(config.finger_count.min(5) as usize)
            .map(|n| n.to_string())
            .collect()
    };
    for extra in 0..config.finger_count.saturating_sub(5) {
        fingers.push(format!("extraFinger{}", letter(extra)));
    }
    let toes = (0..config.toe_count).map(|i| format!("toe{}", letter(i))).collect();
    (fingers, toes)
}

fn letter(i: u32) -> char {
    (b'A' + (i % 26) as u8) as char
}

// ============================================================================
// Build state
// ============================================================================

struct Builder<'a, S: SceneBackend> {
    scene: &'a mut S,
    config: &'a RigConfig,
    template: &'a TemplateSkeleton,
    prefix: String,
    registry: JointRegistry,
    warnings: Vec<BuildWarning>,
    finger_names: Vec<String>,
    toe_names: Vec<String>,
    spine_keys: Vec<JointKey>,
    neck_keys: Vec<JointKey>,
    rig_grp: NodeId,
    misc_grp: NodeId,
    ctr_grp: NodeId,
    bind_grp: NodeId,
    anim_grp: NodeId,
}

impl<S: SceneBackend> Builder<'_, S> {
    fn bind_node(&self, key: &JointKey) -> RigResult<NodeId> {
        self.registry.node(JointLayer::Bind, key)
    }

    fn anim_node(&self, key: &JointKey) -> RigResult<NodeId> {
        self.registry.node(JointLayer::Anim, key)
    }

    fn run(mut self) -> RigResult<BuildReport> {
        self.build_bind_skeleton()?;
        self.orient_bind_skeleton()?;
        self.build_spine_and_neck()?;
        self.build_pelvis()?;
        self.build_anim_skeleton()?;

        let global = self.build_global_ctr()?;
        let cog = self.build_cog_ctr(global)?;
        let hip = self.build_hip_ctr(cog)?;
        let clavicles = [
            self.build_clavicle_ctr(Side::Left)?,
            self.build_clavicle_ctr(Side::Right)?,
        ];
        let neck_ctrs = self.build_neck_ctrs()?;
        self.build_twists()?;

        let ribbon = self.build_ribbon(cog)?;
        // The shoulder girdle and neck ride the top of the spine.
        let spine_end_ctr = ribbon.ik_ctrs[2].shape;
        for clavicle in &clavicles {
            self.scene.reparent(clavicle.space, Some(spine_end_ctr))?;
        }
        self.scene.reparent(neck_ctrs[0].space, Some(spine_end_ctr))?;

        for (i, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            self.build_side_limbs(side, global, clavicles[i])?;
        }

        self.connect_anim_to_bind()?;
        self.scene
            .add_constraint(ConstraintKind::Scale, global.shape, self.anim_grp, false)?;
        self.scene
            .add_constraint(ConstraintKind::Scale, global.shape, self.bind_grp, false)?;

        self.cleanup(cog, hip, &clavicles)?;
        self.report()
    }

    // ========================================================================
    // Skeleton layers
    // ========================================================================

    /// Creates the bind skeleton from the template, parents before children.
    fn build_bind_skeleton(&mut self) -> RigResult<()> {
        let mut children: BTreeMap<JointKey, Vec<JointKey>> = BTreeMap::new();
        for (key, joint) in &self.template.joints {
            if let Some(parent) = &joint.parent {
                children.entry(parent.clone()).or_default().push(key.clone());
            }
        }

        let mut stack: Vec<(JointKey, Option<NodeId>)> = vec![(JointKey::center("root"), None)];
        while let Some((key, parent)) = stack.pop() {
            let Some(tj) = self.template.get(&key) else {
                continue;
            };
            let node = self.scene.create_joint(
                &joint_name(&self.prefix, &key, suffix::BIND),
                parent,
                DVec3::from(tj.position),
            )?;
            self.registry.register(JointLayer::Bind, key.clone(), node);
            if let Some(kids) = children.get(&key) {
                for kid in kids {
                    stack.push((kid.clone(), Some(node)));
                }
            }
        }
        Ok(())
    }

    /// Aims every template chain and bakes the orientations into joint
    /// orients, then applies the mirror flip on the right side.
    fn orient_bind_skeleton(&mut self) -> RigResult<()> {
        let mut torso = Vec::new();
        for name in ["root", "chest", "neck", "head", "headTip"] {
            torso.push(self.bind_node(&JointKey::center(name))?);
        }
        aim_chain(self.scene, &torso, SecondaryAxis::XDown)?;
        zero_orient(self.scene, torso[4])?;

        for side in [Side::Left, Side::Right] {
            let mut flip_list: Vec<NodeId> = Vec::new();

            let mut arm = Vec::new();
            for name in ["clavicle", "shoulder", "elbow", "wrist"] {
                arm.push(self.bind_node(&JointKey::new(side, name))?);
            }
            aim_chain(self.scene, &arm, SecondaryAxis::YUp)?;
            // The wrist carries the hand orientation rather than aiming at
            // any one finger.
            match_orient(self.scene, arm[3], arm[2])?;
            flip_list.extend(&arm);

            let thigh = self.bind_node(&JointKey::new(side, "thigh"))?;
            let knee = self.bind_node(&JointKey::new(side, "knee"))?;
            let ankle = self.bind_node(&JointKey::new(side, "ankle"))?;
            let ball = self.bind_node(&JointKey::new(side, "ball"))?;
            let foot_tip = self.bind_node(&JointKey::new(side, "footTip"))?;
            aim_chain(self.scene, &[thigh, knee, ankle], SecondaryAxis::ZDown)?;
            let ball_pos = self.scene.world_position(ball)?;
            orient_toward(self.scene, ankle, ball_pos, SecondaryAxis::YDown)?;
            let tip_pos = self.scene.world_position(foot_tip)?;
            orient_toward(self.scene, ball, tip_pos, SecondaryAxis::YDown)?;
            zero_orient(self.scene, foot_tip)?;
            flip_list.extend([thigh, knee, ankle, ball, foot_tip]);

            for name in self.toe_names.clone() {
                let mut chain = Vec::new();
                for i in 1..=3 {
                    chain.push(self.bind_node(&JointKey::seq(side, name.as_str(), i))?);
                }
                aim_chain(self.scene, &chain, SecondaryAxis::YDown)?;
                zero_orient(self.scene, chain[2])?;
                flip_list.extend(&chain);
            }

            for name in self.finger_names.clone() {
                let secondary = if name == "thumb" {
                    SecondaryAxis::ZUp
                } else {
                    SecondaryAxis::YUp
                };
                let mut chain = Vec::new();
                for i in 1..=4 {
                    chain.push(self.bind_node(&JointKey::seq(side, name.as_str(), i))?);
                }
                aim_chain(self.scene, &chain, secondary)?;
                zero_orient(self.scene, chain[3])?;
                flip_list.extend(&chain);
            }

            // Flipping the right side 180 degrees around X gives mirrored
            // joints identical rotation values for mirrored poses.
            if side == Side::Right && self.config.mirror_behavior {
                for joint in flip_list {
                    add_orient(self.scene, joint, DVec3::new(0.0, 0.0, 180.0))?;
                }
            }
        }
        Ok(())
    }

    /// Rebuilds the torso from the template placeholders: an evenly split
    /// spine from root to neck base and a neck from there to the head.
    fn build_spine_and_neck(&mut self) -> RigResult<()> {
        let c_root = self.bind_node(&JointKey::center("root"))?;
        let c_neck = self.bind_node(&JointKey::center("neck"))?;
        let c_head = self.bind_node(&JointKey::center("head"))?;

        let spine_root = self.scene.duplicate_parent_only(c_root, "spineBuildRoot")?;
        let spine_end = self.scene.duplicate_parent_only(c_neck, "spineBuildEnd")?;
        let spine_keys =
            self.build_column(spine_root, spine_end, self.config.spine_joint_count, "spine")?;

        let neck_root = self.scene.duplicate_parent_only(c_neck, "neckBuildRoot")?;
        let neck_end = self.scene.duplicate_parent_only(c_head, "neckBuildEnd")?;
        let neck_keys =
            self.build_column(neck_root, neck_end, self.config.neck_joint_count, "neck")?;

        // The head rides the new neck end; the template neck placeholder
        // has served its purpose once both columns are built from it.
        let neck_end_jnt = self.bind_node(&neck_keys[neck_keys.len() - 1])?;
        self.scene.reparent(c_head, Some(neck_end_jnt))?;
        self.scene.delete(c_neck)?;
        self.registry.remove(JointLayer::Bind, &JointKey::center("neck"));

        let spine_first = self.bind_node(&spine_keys[0])?;
        let spine_last = self.bind_node(&spine_keys[spine_keys.len() - 1])?;
        let spine_upper = self.bind_node(&spine_keys[spine_keys.len() - 2])?;
        self.scene.reparent(spine_first, Some(c_root))?;
        let neck_first = self.bind_node(&neck_keys[0])?;
        self.scene.reparent(neck_first, Some(spine_last))?;
        for side in [Side::Left, Side::Right] {
            let clavicle = self.bind_node(&JointKey::new(side, "clavicle"))?;
            self.scene.reparent(clavicle, Some(spine_upper))?;
        }

        self.spine_keys = spine_keys;
        self.neck_keys = neck_keys;
        Ok(())
    }

    /// Splits a two-joint column into `count` evenly spaced joints, aims
    /// them down the column, and registers them as `c_<name>01` through
    /// `c_<name>End`.
    fn build_column(
        &mut self,
        root: NodeId,
        end: NodeId,
        count: u32,
        name: &str,
    ) -> RigResult<Vec<JointKey>> {
        if count < 3 {
            return Err(RigError::ChainTooShort {
                op: "torso column",
                len: count as usize,
            });
        }
        self.scene.reparent(root, Some(self.rig_grp))?;
        self.scene.reparent(end, Some(root))?;
        let mids = split_chain(self.scene, root, (count - 1) as usize)?;

        let mut chain = vec![root];
        chain.extend(mids);
        chain.push(end);
        for i in 0..chain.len() - 1 {
            let next = self.scene.world_position(chain[i + 1])?;
            orient_toward(self.scene, chain[i], next, SecondaryAxis::XDown)?;
        }
        zero_orient(self.scene, end)?;

        let mut keys = Vec::with_capacity(chain.len());
        for (i, node) in chain.iter().enumerate() {
            let key = if i + 1 == chain.len() {
                JointKey::center(format!("{name}End"))
            } else {
                JointKey::seq(Side::Center, name, i as u32 + 1)
            };
            self.scene
                .rename(*node, &joint_name(&self.prefix, &key, suffix::BIND))?;
            self.registry.register(JointLayer::Bind, key.clone(), *node);
            keys.push(key);
        }
        Ok(keys)
    }

    /// Inserts the pelvis between the root and the thighs.
    fn build_pelvis(&mut self) -> RigResult<()> {
        let c_root = self.bind_node(&JointKey::center("root"))?;
        let key = JointKey::center("pelvis");
        let pelvis = self
            .scene
            .duplicate_parent_only(c_root, &joint_name(&self.prefix, &key, suffix::BIND))?;
        self.scene.reparent(pelvis, Some(c_root))?;
        for side in [Side::Left, Side::Right] {
            let thigh = self.bind_node(&JointKey::new(side, "thigh"))?;
            self.scene.reparent(thigh, Some(pelvis))?;
        }
        self.registry.register(JointLayer::Bind, key, pelvis);
        Ok(())
    }

    /// Duplicates the finished bind skeleton into the animation layer and
    /// registers every joint under its bind key.
    fn build_anim_skeleton(&mut self) -> RigResult<()> {
        let bind_root = self.bind_node(&JointKey::center("root"))?;
        let anim_root = self.scene.duplicate_subtree(bind_root, "animBuildRoot")?;

        let mut bind_nodes = vec![bind_root];
        bind_nodes.extend(self.scene.descendants(bind_root)?);
        let mut anim_nodes = vec![anim_root];
        anim_nodes.extend(self.scene.descendants(anim_root)?);

        // Duplication preserves child order, so the two walks pair up.
        for (bind, anim) in bind_nodes.iter().zip(&anim_nodes) {
            let name = crate::naming::with_suffix(&self.scene.name(*bind)?, suffix::ANIM);
            self.scene.rename(*anim, &name)?;
            if let Some(key) = self.registry.key_of(JointLayer::Bind, *bind).cloned() {
                self.registry.register(JointLayer::Anim, key, *anim);
            }
        }

        self.scene.reparent(anim_root, Some(self.anim_grp))?;
        self.scene.reparent(bind_root, Some(self.bind_grp))?;
        Ok(())
    }

    // ========================================================================
    // Torso controls
    // ========================================================================

    fn build_global_ctr(&mut self) -> RigResult<Control> {
        let ctrl = create_control(
            self.scene,
            &ControlSpec::new(format!("{}_global", self.prefix), ControlShape::Circle)
                .with_parent(self.ctr_grp)
                .with_cv_size(50.0)
                .with_cv_rotation(DVec3::new(90.0, 0.0, 0.0)),
        )?;
        self.scene.hide_and_lock(ctrl.shape, &["visibility"])?;
        Ok(ctrl)
    }

    fn build_cog_ctr(&mut self, global: Control) -> RigResult<Control> {
        let root_anim = self.anim_node(&JointKey::center("root"))?;
        let ctrl = create_control(
            self.scene,
            &ControlSpec::new(format!("{}_cog", self.prefix), ControlShape::Cog)
                .with_parent(global.shape)
                .with_placement(Placement::Match(root_anim))
                .with_cv_size(50.0)
                .with_cv_rotation(DVec3::new(90.0, 0.0, 0.0))
                .with_cv_offset(DVec3::new(0.0, -5.0, 0.0)),
        )?;
        self.scene
            .add_constraint(ConstraintKind::Parent, ctrl.shape, root_anim, true)?;
        Ok(ctrl)
    }

    fn build_hip_ctr(&mut self, cog: Control) -> RigResult<Control> {
        let pelvis_anim = self.anim_node(&JointKey::center("pelvis"))?;
        let ctrl = create_control(
            self.scene,
            &ControlSpec::new(format!("{}_hip", self.prefix), ControlShape::Hip)
                .with_parent(cog.shape)
                .with_placement(Placement::Match(pelvis_anim))
                .with_cv_scale(DVec3::new(20.0, 20.0, 15.0))
                .with_cv_rotation(DVec3::new(90.0, 0.0, 0.0))
                .with_cv_offset(DVec3::new(0.0, -20.0, 0.0)),
        )?;
        self.scene
            .add_constraint(ConstraintKind::Parent, ctrl.shape, pelvis_anim, true)?;
        Ok(ctrl)
    }

    fn build_clavicle_ctr(&mut self, side: Side) -> RigResult<Control> {
        let jnt = self.anim_node(&JointKey::new(side, "clavicle"))?;
        let ctrl = create_control(
            self.scene,
            &ControlSpec::new(
                format!("{}_{}_clavicle", self.prefix, side.prefix()),
                ControlShape::Clavicle,
            )
            .with_parent(self.ctr_grp)
            .with_placement(Placement::Match(jnt))
            .with_cv_size(NECK_CTR_SIZE)
            .with_cv_offset(DVec3::new(0.0, 10.0, 0.0)),
        )?;
        if side == Side::Right {
            // Mirror the control across YZ so both sides read the same.
            self.scene.set_scale(ctrl.space, DVec3::new(-1.0, 1.0, 1.0))?;
        }
        self.scene
            .add_constraint(ConstraintKind::Parent, ctrl.shape, jnt, true)?;
        Ok(ctrl)
    }

    fn build_neck_ctrs(&mut self) -> RigResult<Vec<Control>> {
        let chain = self.registry.chain(JointLayer::Anim, &self.neck_keys)?;
        let built = fk_controls_for_chain(self.scene, &chain, DVec3::splat(NECK_CTR_SIZE), false)?;
        self.scene.reparent(built.ctrs[0].space, Some(self.ctr_grp))?;
        Ok(built.ctrs)
    }

    // ========================================================================
    // Twists and ribbon
    // ========================================================================

    fn build_twists(&mut self) -> RigResult<()> {
        for side in [Side::Left, Side::Right] {
            let s = side.prefix();
            let shoulder = self.bind_node(&JointKey::new(side, "shoulder"))?;
            let elbow = self.bind_node(&JointKey::new(side, "elbow"))?;
            let wrist = self.bind_node(&JointKey::new(side, "wrist"))?;
            let thigh = self.bind_node(&JointKey::new(side, "thigh"))?;
            let knee = self.bind_node(&JointKey::new(side, "knee"))?;
            let ankle = self.bind_node(&JointKey::new(side, "ankle"))?;

            // Upper segments counter-twist so the skinned volume holds
            // still while the limb root rolls; lower segments follow the
            // wrist or ankle roll instead.
            let segments = [
                (self.config.upper_arm_twist_count, shoulder, elbow, true, false, TwistAxis::X, "shoulderTwist"),
                (self.config.lower_arm_twist_count, wrist, elbow, false, true, TwistAxis::X, "wristTwist"),
                (self.config.upper_leg_twist_count, thigh, knee, true, false, TwistAxis::X, "thighTwist"),
                (self.config.lower_leg_twist_count, ankle, knee, false, true, TwistAxis::Y, "ankleTwist"),
            ];
            for (count, start, end, counter, parent_to_end, axis, stem) in segments {
                if count == 0 {
                    continue;
                }
                let rates = default_twist_rates(count as usize, counter);
                build_twist_chain(
                    self.scene,
                    &TwistChainParams {
                        start,
                        end,
                        rates: &rates,
                        axis,
                        parent_to_end,
                        name_stem: format!("{}_{}_{}", self.prefix, s, stem),
                        build_grp: self.rig_grp,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn build_ribbon(&mut self, cog: Control) -> RigResult<RibbonSpine> {
        let chain = self.registry.chain(JointLayer::Anim, &self.spine_keys)?;
        let params = RibbonParams {
            chain: &chain,
            prefix: self.prefix.clone(),
            width: RIBBON_WIDTH,
            misc_grp: self.misc_grp,
            global_ctr: cog.shape,
        };
        build_ribbon_spine(self.scene, &params)
    }

    // ========================================================================
    // Limbs
    // ========================================================================

    /// Builds everything hanging off one side: IK and FK limbs, the foot
    /// roll, digit controls, blends and stretch.
    fn build_side_limbs(&mut self, side: Side, global: Control, clavicle: Control) -> RigResult<()> {
        let s = side.prefix();
        let shoulder = self.anim_node(&JointKey::new(side, "shoulder"))?;
        let elbow = self.anim_node(&JointKey::new(side, "elbow"))?;
        let wrist = self.anim_node(&JointKey::new(side, "wrist"))?;
        let thigh = self.anim_node(&JointKey::new(side, "thigh"))?;
        let knee = self.anim_node(&JointKey::new(side, "knee"))?;
        let ankle = self.anim_node(&JointKey::new(side, "ankle"))?;
        let ball = self.anim_node(&JointKey::new(side, "ball"))?;
        let foot_tip = self.anim_node(&JointKey::new(side, "footTip"))?;

        let arm_ik = if self.config.ik_arm {
            let limb = build_ik_limb(
                self.scene,
                &IkLimbParams {
                    root: shoulder,
                    mid: elbow,
                    end: wrist,
                    limb_name: "arm".to_string(),
                    side_prefix: s.to_string(),
                    prefix: self.prefix.clone(),
                    constrain_ik_ctr: true,
                    match_jnt_orient: true,
                    ik_ctr_shape: ControlShape::Square,
                    ik_ctr_scale: DVec3::splat(LIMB_CTR_SIZE),
                    ik_ctr_rotate: DVec3::new(0.0, 0.0, 90.0),
                    pv_ctr_scale: DVec3::splat(LIMB_CTR_SIZE),
                    pv_ctr_rotate: DVec3::new(90.0, 0.0, 0.0),
                    misc_grp: self.misc_grp,
                    global_ctr: global.shape,
                },
            )?;
            if limb.pole_degenerate {
                self.warnings.push(BuildWarning::DegeneratePoleVector {
                    limb: format!("{s}Arm"),
                });
            }
            Some(limb)
        } else {
            None
        };

        let leg_ik: Option<(IkLimb, FootRoll)> = if self.config.ik_leg {
            let limb = build_ik_limb(
                self.scene,
                &IkLimbParams {
                    root: thigh,
                    mid: knee,
                    end: ankle,
                    limb_name: "leg".to_string(),
                    side_prefix: s.to_string(),
                    prefix: self.prefix.clone(),
                    // The foot roll owns the leg handle.
                    constrain_ik_ctr: false,
                    match_jnt_orient: false,
                    ik_ctr_shape: ControlShape::Square,
                    ik_ctr_scale: DVec3::splat(LIMB_CTR_SIZE),
                    ik_ctr_rotate: DVec3::ZERO,
                    pv_ctr_scale: DVec3::splat(LIMB_CTR_SIZE),
                    pv_ctr_rotate: DVec3::new(90.0, 0.0, 0.0),
                    misc_grp: self.misc_grp,
                    global_ctr: global.shape,
                },
            )?;
            if limb.pole_degenerate {
                self.warnings.push(BuildWarning::DegeneratePoleVector {
                    limb: format!("{s}Leg"),
                });
            }
            let foot = build_foot_roll(
                self.scene,
                &FootRollParams {
                    ankle,
                    ball,
                    toe: foot_tip,
                    leg_ik_ctr: limb.end_ctr.shape,
                    leg_ik_handle: limb.handle,
                    side_prefix: s.to_string(),
                    prefix: self.prefix.clone(),
                },
            )?;
            // The foot drivers extend the IK leg chain below the ankle.
            self.scene.reparent(foot.drv_chain[0], Some(limb.chain[2]))?;
            Some((limb, foot))
        } else {
            None
        };

        let arm_fk: Option<FkLimb> = if self.config.fk_arm {
            let limb = build_fk_limb(
                self.scene,
                &[shoulder, elbow, wrist],
                "arm",
                s,
                &self.prefix,
                DVec3::splat(LIMB_CTR_SIZE),
                global.shape,
            )?;
            // FK arms follow the clavicle.
            self.scene.reparent(limb.ctrs_grp, Some(clavicle.shape))?;
            Some(limb)
        } else {
            None
        };

        let leg_fk: Option<FkLimb> = if self.config.fk_leg {
            let limb = build_fk_limb(
                self.scene,
                &[thigh, knee, ankle, ball],
                "leg",
                s,
                &self.prefix,
                DVec3::splat(LIMB_CTR_SIZE),
                global.shape,
            )?;
            self.scene
                .add_constraint(ConstraintKind::Point, limb.chain[0], limb.ctrs_grp, false)?;
            Some(limb)
        } else {
            None
        };

        self.build_digit_settings(side, global)?;

        // Arm blend: 0 is FK, 1 is IK.
        let arm_anim = [shoulder, elbow, wrist];
        let arm_drivers = match (&arm_ik, &arm_fk) {
            (Some(ik), Some(fk)) => Some(LimbDrivers::Both {
                ik_chain: ik.chain.clone(),
                fk_chain: fk.chain.clone(),
                ik_grp: ik.ctrs_grp,
                fk_grp: fk.ctrs_grp,
            }),
            (Some(ik), None) => Some(LimbDrivers::IkOnly(ik.chain.clone())),
            (None, Some(fk)) => Some(LimbDrivers::FkOnly(fk.chain.clone())),
            (None, None) => None,
        };
        if let Some(drivers) = arm_drivers {
            build_limb_blend(
                self.scene,
                &BlendParams {
                    drivers: &drivers,
                    anim_chain: &arm_anim,
                    attr_ctr: global.shape,
                    attr_name: format!("{s}ArmIkFk"),
                    prefix: self.prefix.clone(),
                },
            )?;
        }

        // Leg blend covers four joints; the IK side continues through the
        // foot-roll drivers.
        let leg_anim = [thigh, knee, ankle, ball];
        let leg_ik_chain = leg_ik
            .as_ref()
            .map(|(limb, foot)| vec![limb.chain[0], limb.chain[1], foot.drv_chain[0], foot.drv_chain[1]]);
        let leg_drivers = match (&leg_ik, &leg_fk, leg_ik_chain) {
            (Some((limb, _)), Some(fk), Some(ik_chain)) => Some(LimbDrivers::Both {
                ik_chain,
                fk_chain: fk.chain.clone(),
                ik_grp: limb.ctrs_grp,
                fk_grp: fk.ctrs_grp,
            }),
            (Some(_), None, Some(ik_chain)) => Some(LimbDrivers::IkOnly(ik_chain)),
            (None, Some(fk), _) => Some(LimbDrivers::FkOnly(fk.chain.clone())),
            _ => None,
        };
        if let Some(drivers) = leg_drivers {
            build_limb_blend(
                self.scene,
                &BlendParams {
                    drivers: &drivers,
                    anim_chain: &leg_anim,
                    attr_ctr: global.shape,
                    attr_name: format!("{s}LegIkFk"),
                    prefix: self.prefix.clone(),
                },
            )?;
        }

        if self.config.stretch_arm {
            match &arm_ik {
                Some(limb) => {
                    build_stretch_limb(
                        self.scene,
                        &StretchParams {
                            ik_ctr: limb.end_ctr.shape,
                            chain_root: limb.chain[0],
                            stretch_joints: &limb.chain[..2],
                            switch_ctr: global.shape,
                            global_ctr: global.shape,
                            limb_name: format!("{s}Arm"),
                            prefix: self.prefix.clone(),
                            misc_grp: self.misc_grp,
                        },
                    )?;
                }
                None => self.warnings.push(BuildWarning::StretchWithoutIk {
                    limb: format!("{s}Arm"),
                }),
            }
        }
        if self.config.stretch_leg {
            match &leg_ik {
                Some((limb, _)) => {
                    build_stretch_limb(
                        self.scene,
                        &StretchParams {
                            ik_ctr: limb.end_ctr.shape,
                            chain_root: limb.chain[0],
                            stretch_joints: &limb.chain[..2],
                            switch_ctr: global.shape,
                            global_ctr: global.shape,
                            limb_name: format!("{s}Leg"),
                            prefix: self.prefix.clone(),
                            misc_grp: self.misc_grp,
                        },
                    )?;
                }
                None => self.warnings.push(BuildWarning::StretchWithoutIk {
                    limb: format!("{s}Leg"),
                }),
            }
        }
        Ok(())
    }

    fn build_digit_settings(&mut self, side: Side, global: Control) -> RigResult<()> {
        let s = side.prefix();
        let left = side == Side::Left;
        let wrist = self.anim_node(&JointKey::new(side, "wrist"))?;

        let mut finger_roots = Vec::new();
        for name in &self.finger_names {
            finger_roots.push((
                name.clone(),
                self.anim_node(&JointKey::seq(side, name.as_str(), 1))?,
            ));
        }
        let hand = build_digit_controls(
            self.scene,
            &DigitSettingParams {
                digit_roots: &finger_roots,
                parent_jnt: wrist,
                name_stem: format!("{}_{}_handSetting", self.prefix, s),
                cv_rotate: DVec3::new(0.0, if left { 90.0 } else { -90.0 }, 0.0),
                cv_move: if left {
                    DVec3::new(10.0, 7.0, 0.0)
                } else {
                    DVec3::new(-10.0, -7.0, 0.0)
                },
                ctr_grp: self.ctr_grp,
            },
        )?;
        self.scene.reparent(hand.space, Some(global.shape))?;

        if self.toe_names.is_empty() {
            return Ok(());
        }
        let ball = self.anim_node(&JointKey::new(side, "ball"))?;
        let mut toe_roots = Vec::new();
        for name in &self.toe_names {
            toe_roots.push((
                name.clone(),
                self.anim_node(&JointKey::seq(side, name.as_str(), 1))?,
            ));
        }
        let foot = build_digit_controls(
            self.scene,
            &DigitSettingParams {
                digit_roots: &toe_roots,
                parent_jnt: ball,
                name_stem: format!("{}_{}_footSetting", self.prefix, s),
                cv_rotate: DVec3::new(0.0, if left { 90.0 } else { -90.0 }, 0.0),
                cv_move: if left {
                    DVec3::new(10.0, -7.0, 0.0)
                } else {
                    DVec3::new(-10.0, 7.0, 0.0)
                },
                ctr_grp: self.ctr_grp,
            },
        )?;
        self.scene.reparent(foot.space, Some(global.shape))?;
        Ok(())
    }

    // ========================================================================
    // Final wiring
    // ========================================================================

    /// Constrains every bind joint to its animation counterpart and wires
    /// the scale channels through, so deformation follows the control rig.
    fn connect_anim_to_bind(&mut self) -> RigResult<()> {
        let keys: Vec<JointKey> = self.registry.keys(JointLayer::Bind).cloned().collect();
        for key in keys {
            let bind = self.bind_node(&key)?;
            let anim = self.anim_node(&key)?;
            self.scene
                .add_constraint(ConstraintKind::Parent, anim, bind, false)?;
            for channel in ["scaleX", "scaleY", "scaleZ"] {
                self.scene
                    .connect(Plug::new(anim, channel), Plug::new(bind, channel))?;
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, cog: Control, hip: Control, clavicles: &[Control; 2]) -> RigResult<()> {
        // The spine animation joints ride follicles now; joints that were
        // parented under them move to the skeleton group and follow the
        // spine end by constraint instead.
        for side in [Side::Left, Side::Right] {
            let clavicle = self.anim_node(&JointKey::new(side, "clavicle"))?;
            self.scene.reparent(clavicle, Some(self.anim_grp))?;
        }
        let neck_root = self.anim_node(&self.neck_keys[0].clone())?;
        self.scene.reparent(neck_root, Some(self.anim_grp))?;
        let spine_end = self.anim_node(&self.spine_keys[self.spine_keys.len() - 1].clone())?;
        self.scene
            .add_constraint(ConstraintKind::Point, spine_end, neck_root, true)?;

        for ctr in [hip, cog, clavicles[0], clavicles[1]] {
            self.scene
                .hide_and_lock(ctr.shape, &["scaleX", "scaleY", "scaleZ", "visibility"])?;
        }

        self.scene
            .set_attr(self.anim_grp, "visibility", AttrValue::Scalar(0.0))?;
        self.scene
            .set_attr(self.bind_grp, "visibility", AttrValue::Scalar(1.0))?;
        self.scene
            .set_attr(self.misc_grp, "visibility", AttrValue::Scalar(0.0))?;
        Ok(())
    }

    fn report(&self) -> RigResult<BuildReport> {
        let mut joints = 0;
        let mut controls = 0;
        let mut dataflow_nodes = 0;
        let mut constraints = 0;
        for id in self.scene.nodes() {
            constraints += self.scene.constraints_on(id).len();
            match self.scene.kind(id)? {
                NodeKind::Joint => joints += 1,
                NodeKind::Curve { .. } => controls += 1,
                NodeKind::MultiplyDivide(_)
                | NodeKind::Sum
                | NodeKind::Reverse
                | NodeKind::Condition(_)
                | NodeKind::BlendPair
                | NodeKind::Distance { .. } => dataflow_nodes += 1,
                _ => {}
            }
        }
        Ok(BuildReport {
            rig_name: self.config.rig_name.clone(),
            joints,
            controls,
            constraints,
            dataflow_nodes,
            warnings: self.warnings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_name_fallbacks() {
        let one = digit_names(&RigConfig::new("hero").with_finger_count(1));
        assert_eq!(one.0, vec!["index"]);
        let zero = digit_names(&RigConfig::new("hero").with_finger_count(0));
        assert_eq!(zero.0, vec!["index"]);

        let seven = digit_names(&RigConfig::new("hero").with_finger_count(7));
        assert_eq!(
            seven.0,
            vec!["thumb", "index", "middle", "ring", "pinky", "extraFingerA", "extraFingerB"]
        );

        let toes = digit_names(&RigConfig::new("hero").with_toe_count(3));
        assert_eq!(toes.1, vec!["toeA", "toeB", "toeC"]);
    }
}
