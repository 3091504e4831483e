//! Ribbon spine.
//!
//! The spine joints ride follicles pinned to a ribbon surface. Three soft
//! clusters deform the surface, each driven by a translate control nested
//! inside a rotate control; the rotate controls chain root to end so the
//! spine bends like FK while the clusters still translate freely.

use glam::DVec3;
use rigcraft_scene::{ConstraintKind, NodeId, SceneBackend, SURFACE_ROWS};

use crate::control::{create_control, Control, ControlShape, ControlSpec, Placement};
use crate::error::{RigError, RigResult};
use crate::math::distance;
use crate::naming::{sided_name, suffix, with_suffix};

/// Inputs for the ribbon spine.
#[derive(Debug, Clone)]
pub struct RibbonParams<'a> {
    /// Animation spine joints, root to end. Must be odd-length so a middle
    /// joint exists to center the surface on.
    pub chain: &'a [NodeId],
    /// Rig name prefix.
    pub prefix: String,
    /// Surface width across the spine.
    pub width: f64,
    /// Group receiving surface, clusters and follicles.
    pub misc_grp: NodeId,
    /// Global control; the root FK control space nests under it.
    pub global_ctr: NodeId,
}

/// A built ribbon spine.
#[derive(Debug, Clone)]
pub struct RibbonSpine {
    /// The ribbon surface.
    pub surface: NodeId,
    /// One follicle per spine joint.
    pub follicles: Vec<NodeId>,
    /// Root, mid and end clusters.
    pub clusters: Vec<NodeId>,
    /// Translate controls, one per cluster.
    pub ik_ctrs: Vec<Control>,
    /// Rotate controls, chained root to end.
    pub fk_ctrs: Vec<Control>,
}

const REGION_NAMES: [&str; 3] = ["spineRoot", "spineMid", "spineEnd"];

/// Builds the ribbon spine over an odd-length chain.
pub fn build_ribbon_spine<S: SceneBackend>(
    scene: &mut S,
    params: &RibbonParams<'_>,
) -> RigResult<RibbonSpine> {
    let len = params.chain.len();
    if len % 2 == 0 {
        return Err(RigError::EvenRibbonChain(len));
    }
    if len < 3 {
        return Err(RigError::ChainTooShort {
            op: "ribbon spine",
            len,
        });
    }

    let root_pos = scene.world_position(params.chain[0])?;
    let mid_pos = scene.world_position(params.chain[len / 2])?;
    let end_pos = scene.world_position(params.chain[len - 1])?;
    let length = distance(root_pos, end_pos);

    let surface = scene.create_ribbon_surface(
        &sided_name(&params.prefix, "c", "spineSurf", suffix::SURFACE),
        mid_pos,
        end_pos - root_pos,
        length,
        params.width,
    )?;
    scene.reparent(surface, Some(params.misc_grp))?;

    // Three contiguous CV row regions: two rows at each end, the shared
    // middle row alone.
    let regions = [0..2, 2..3, 3..SURFACE_ROWS];
    let mut clusters = Vec::with_capacity(3);
    for (name, rows) in REGION_NAMES.iter().zip(regions) {
        let cluster = scene.create_cluster(
            &sided_name(&params.prefix, "c", name, suffix::CLUSTER),
            surface,
            rows,
        )?;
        scene.reparent(cluster, Some(params.misc_grp))?;
        clusters.push(cluster);
    }

    // One follicle per joint along the length, joints re-parented onto
    // them so the surface carries the spine.
    let mut follicles = Vec::with_capacity(len);
    let u_delta = 1.0 / (len - 1) as f64;
    for (i, joint) in params.chain.iter().enumerate() {
        let name = with_suffix(&scene.name(*joint)?, suffix::FOLLICLE);
        let follicle = scene.create_follicle(&name, surface, u_delta * i as f64, 0.5)?;
        scene.reparent(follicle, Some(params.misc_grp))?;
        scene.reparent(*joint, Some(follicle))?;
        follicles.push(follicle);
    }

    let mut ik_ctrs: Vec<Control> = Vec::with_capacity(3);
    let mut fk_ctrs: Vec<Control> = Vec::with_capacity(3);
    for (i, (name, cluster)) in REGION_NAMES.iter().zip(&clusters).enumerate() {
        let pos = scene.world_position(*cluster)?;
        let ik = create_control(
            scene,
            &ControlSpec::new(
                format!("{}_c_{}Ik", params.prefix, name),
                ControlShape::Cube,
            )
            .with_placement(Placement::World(pos))
            .with_cv_scale(DVec3::new(30.0, 5.0, 10.0)),
        )?;
        let fk = create_control(
            scene,
            &ControlSpec::new(
                format!("{}_c_{}Fk", params.prefix, name),
                ControlShape::Circle,
            )
            .with_placement(Placement::Match(ik.shape))
            .with_cv_rotation(DVec3::new(0.0, 0.0, 90.0))
            .with_cv_size(25.0),
        )?;

        scene.add_constraint(ConstraintKind::Parent, ik.shape, *cluster, true)?;
        scene.add_constraint(ConstraintKind::Scale, ik.shape, *cluster, true)?;
        scene.hide_and_lock(ik.shape, &["scaleX", "scaleY", "scaleZ", "visibility"])?;
        scene.hide_and_lock(
            fk.shape,
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

        scene.reparent(ik.space, Some(fk.shape))?;
        if i > 0 {
            scene.reparent(fk.space, Some(fk_ctrs[i - 1].shape))?;
        }
        ik_ctrs.push(ik);
        fk_ctrs.push(fk);
    }
    scene.reparent(fk_ctrs[0].space, Some(params.global_ctr))?;

    Ok(RibbonSpine {
        surface,
        follicles,
        clusters,
        ik_ctrs,
        fk_ctrs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigcraft_scene::MemoryScene;

    fn spine(scene: &mut MemoryScene, count: usize) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut parent = None;
        for i in 0..count {
            let joint = scene
                .create_joint(
                    &format!("hero_c_spine{:02}_jnt", i + 1),
                    parent,
                    DVec3::new(0.0, 100.0 + 12.0 * i as f64, 0.0),
                )
                .unwrap();
            parent = Some(joint);
            chain.push(joint);
        }
        chain
    }

    fn params<'a>(chain: &'a [NodeId], misc: NodeId, global_ctr: NodeId) -> RibbonParams<'a> {
        RibbonParams {
            chain,
            prefix: "hero".to_string(),
            width: 10.0,
            misc_grp: misc,
            global_ctr,
        }
    }

    #[test]
    fn even_chains_are_rejected() {
        let mut scene = MemoryScene::new();
        let misc = scene.create_group("misc", None).unwrap();
        let global_ctr = scene.create_group("global", None).unwrap();
        let chain = spine(&mut scene, 4);
        let err = build_ribbon_spine(&mut scene, &params(&chain, misc, global_ctr));
        assert!(matches!(err, Err(RigError::EvenRibbonChain(4))));
    }

    #[test]
    fn joints_ride_follicles_spread_along_the_surface() {
        let mut scene = MemoryScene::new();
        let misc = scene.create_group("misc", None).unwrap();
        let global_ctr = scene.create_group("global", None).unwrap();
        let chain = spine(&mut scene, 5);
        let ribbon =
            build_ribbon_spine(&mut scene, &params(&chain, misc, global_ctr)).unwrap();

        assert_eq!(ribbon.follicles.len(), 5);
        for (joint, follicle) in chain.iter().zip(&ribbon.follicles) {
            assert_eq!(scene.parent_of(*joint).unwrap(), Some(*follicle));
        }
        // Follicles land on the joint positions: the surface spans the
        // chain and U runs along it.
        for (i, follicle) in ribbon.follicles.iter().enumerate() {
            let pos = scene.world_position(*follicle).unwrap();
            assert!((pos.y - (100.0 + 12.0 * i as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn three_clusters_with_nested_controls() {
        let mut scene = MemoryScene::new();
        let misc = scene.create_group("misc", None).unwrap();
        let global_ctr = scene.create_group("global", None).unwrap();
        let chain = spine(&mut scene, 5);
        let ribbon =
            build_ribbon_spine(&mut scene, &params(&chain, misc, global_ctr)).unwrap();

        assert_eq!(ribbon.clusters.len(), 3);
        for (cluster, ik) in ribbon.clusters.iter().zip(&ribbon.ik_ctrs) {
            let on_cluster = scene.constraints_on(*cluster);
            assert!(on_cluster
                .iter()
                .any(|c| c.kind == ConstraintKind::Parent && c.driver == ik.shape));
            assert!(on_cluster
                .iter()
                .any(|c| c.kind == ConstraintKind::Scale && c.driver == ik.shape));
        }
        // Translate controls nest in the rotate controls; rotate controls
        // chain root to end.
        for (ik, fk) in ribbon.ik_ctrs.iter().zip(&ribbon.fk_ctrs) {
            assert_eq!(scene.parent_of(ik.space).unwrap(), Some(fk.shape));
        }
        assert_eq!(
            scene.parent_of(ribbon.fk_ctrs[1].space).unwrap(),
            Some(ribbon.fk_ctrs[0].shape)
        );
        assert_eq!(
            scene.parent_of(ribbon.fk_ctrs[0].space).unwrap(),
            Some(global_ctr)
        );
    }
}
