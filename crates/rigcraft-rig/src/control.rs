//! Control curves and their space groups.
//!
//! A control is a curve shape nested under a zeroed "space" group. The
//! space absorbs the placement transform so the curve's own channels rest
//! at identity, which is what every constraint and blend attribute in the
//! rig assumes.

use glam::{DVec3, EulerRot, DQuat};
use rigcraft_scene::{NodeId, SceneBackend};

use crate::error::RigResult;
use crate::naming::suffix;

// ============================================================================
// Shape library
// ============================================================================

/// The curve shapes the rig draws its controls with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlShape {
    /// Unit wireframe cube, degree 1.
    Cube,
    /// Unit square in the XZ plane, degree 1.
    Square,
    /// Unit circle in the XY plane, degree 3.
    Circle,
    /// Flat arc used for clavicle controls.
    Clavicle,
    /// Four-pointed marker for digit setting controls.
    HandSetting,
    /// Circle with alternating CVs pushed outward; the COG control.
    Cog,
    /// Circle with the rear CVs pulled down; the hip swivel control.
    Hip,
}

impl ControlShape {
    /// Local-space CVs and curve degree for this shape, unit sized.
    pub fn cvs(&self) -> (Vec<DVec3>, u8) {
        match self {
            ControlShape::Cube => (cube_cvs(), 1),
            ControlShape::Square => (
                vec![
                    DVec3::new(-0.5, 0.0, -0.5),
                    DVec3::new(0.5, 0.0, -0.5),
                    DVec3::new(0.5, 0.0, 0.5),
                    DVec3::new(-0.5, 0.0, 0.5),
                    DVec3::new(-0.5, 0.0, -0.5),
                ],
                1,
            ),
            ControlShape::Circle => (circle_cvs(1.0), 3),
            ControlShape::Clavicle => (
                vec![
                    DVec3::new(0.0, 0.0, -1.0),
                    DVec3::new(0.0, 0.35, -0.5),
                    DVec3::new(0.0, 0.5, 0.0),
                    DVec3::new(0.0, 0.35, 0.5),
                    DVec3::new(0.0, 0.0, 1.0),
                ],
                3,
            ),
            ControlShape::HandSetting => (
                vec![
                    DVec3::new(0.0, 0.0, -1.0),
                    DVec3::new(0.3, 0.0, -0.3),
                    DVec3::new(1.0, 0.0, 0.0),
                    DVec3::new(0.3, 0.0, 0.3),
                    DVec3::new(0.0, 0.0, 1.0),
                    DVec3::new(-0.3, 0.0, 0.3),
                    DVec3::new(-1.0, 0.0, 0.0),
                    DVec3::new(-0.3, 0.0, -0.3),
                    DVec3::new(0.0, 0.0, -1.0),
                ],
                1,
            ),
            ControlShape::Cog => {
                let mut cvs = circle_cvs(1.0);
                for (i, cv) in cvs.iter_mut().enumerate() {
                    if i % 2 == 0 {
                        *cv *= 1.3;
                    }
                }
                (cvs, 3)
            }
            ControlShape::Hip => {
                let mut cvs = circle_cvs(1.0);
                for cv in cvs.iter_mut() {
                    if cv.y < -0.1 {
                        cv.z = -0.4;
                    }
                }
                (cvs, 3)
            }
        }
    }
}

fn circle_cvs(radius: f64) -> Vec<DVec3> {
    let n = 8;
    (0..=n)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            DVec3::new(theta.cos(), theta.sin(), 0.0) * radius
        })
        .collect()
}

fn cube_cvs() -> Vec<DVec3> {
    let h = 0.5;
    // One continuous stroke over all twelve edges.
    vec![
        DVec3::new(-h, -h, -h),
        DVec3::new(h, -h, -h),
        DVec3::new(h, -h, h),
        DVec3::new(-h, -h, h),
        DVec3::new(-h, -h, -h),
        DVec3::new(-h, h, -h),
        DVec3::new(h, h, -h),
        DVec3::new(h, -h, -h),
        DVec3::new(h, h, -h),
        DVec3::new(h, h, h),
        DVec3::new(h, -h, h),
        DVec3::new(h, h, h),
        DVec3::new(-h, h, h),
        DVec3::new(-h, -h, h),
        DVec3::new(-h, h, h),
        DVec3::new(-h, h, -h),
    ]
}

// ============================================================================
// Construction
// ============================================================================

/// Where a control's space group lands.
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    /// At a world position, world-aligned.
    World(DVec3),
    /// At a node's world position, world-aligned.
    Match(NodeId),
    /// At a node's world position and orientation.
    MatchOriented(NodeId),
}

/// Recipe for one control.
#[derive(Debug, Clone)]
pub struct ControlSpec {
    name: String,
    shape: ControlShape,
    parent: Option<NodeId>,
    placement: Placement,
    cv_scale: DVec3,
    cv_rotate_deg: DVec3,
    cv_move: DVec3,
}

impl ControlSpec {
    /// A world-origin control with unit CVs and no parent.
    pub fn new(name: impl Into<String>, shape: ControlShape) -> Self {
        Self {
            name: name.into(),
            shape,
            parent: None,
            placement: Placement::World(DVec3::ZERO),
            cv_scale: DVec3::ONE,
            cv_rotate_deg: DVec3::ZERO,
            cv_move: DVec3::ZERO,
        }
    }

    /// Parents the space group.
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Places the space group.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Scales the CVs, non-uniformly.
    pub fn with_cv_scale(mut self, scale: DVec3) -> Self {
        self.cv_scale = scale;
        self
    }

    /// Scales the CVs uniformly.
    pub fn with_cv_size(self, size: f64) -> Self {
        self.with_cv_scale(DVec3::splat(size))
    }

    /// Rotates the CVs (XYZ Euler, degrees), after scaling.
    pub fn with_cv_rotation(mut self, rotate_deg: DVec3) -> Self {
        self.cv_rotate_deg = rotate_deg;
        self
    }

    /// Offsets the CVs, after scaling and rotating.
    pub fn with_cv_offset(mut self, offset: DVec3) -> Self {
        self.cv_move = offset;
        self
    }
}

/// A built control: the zeroed curve transform and its space group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Space group holding the placement transform.
    pub space: NodeId,
    /// Curve transform, channels at identity.
    pub shape: NodeId,
}

/// Builds a control from its recipe.
pub fn create_control<S: SceneBackend>(scene: &mut S, spec: &ControlSpec) -> RigResult<Control> {
    let space = scene.create_group(&format!("{}_{}", spec.name, suffix::SPACE), spec.parent)?;
    match spec.placement {
        Placement::World(pos) => scene.set_world_position(space, pos)?,
        Placement::Match(target) => {
            let pos = scene.world_position(target)?;
            scene.set_world_position(space, pos)?;
        }
        Placement::MatchOriented(target) => {
            let pos = scene.world_position(target)?;
            let rot = scene.world_rotation(target)?;
            scene.set_world_position(space, pos)?;
            scene.set_world_rotation(space, rot)?;
        }
    }

    let (mut cvs, degree) = spec.shape.cvs();
    let rot = DQuat::from_euler(
        EulerRot::ZYX,
        spec.cv_rotate_deg.z.to_radians(),
        spec.cv_rotate_deg.y.to_radians(),
        spec.cv_rotate_deg.x.to_radians(),
    );
    for cv in cvs.iter_mut() {
        *cv = rot * (*cv * spec.cv_scale) + spec.cv_move;
    }

    let shape = scene.create_curve(
        &format!("{}_{}", spec.name, suffix::CONTROL),
        Some(space),
        cvs,
        degree,
    )?;
    Ok(Control { space, shape })
}
