//! Local transform data and Euler/matrix conversions.
//!
//! Rotations are stored as XYZ Euler angles in degrees, composed extrinsically
//! (X first, then Y, then Z). A joint additionally carries a joint-orient
//! rotation applied before its ordinary rotation, so a joint's local matrix is
//! `T * JO * R * S`.

use glam::{DMat4, DQuat, DVec3, EulerRot};

/// Converts XYZ Euler degrees to a rotation quaternion.
pub fn quat_from_euler_deg(euler_deg: DVec3) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        euler_deg.z.to_radians(),
        euler_deg.y.to_radians(),
        euler_deg.x.to_radians(),
    )
}

/// Converts a rotation quaternion back to XYZ Euler degrees.
pub fn euler_deg_from_quat(quat: DQuat) -> DVec3 {
    let (z, y, x) = quat.to_euler(EulerRot::ZYX);
    DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// The local (parent-relative) transform of a scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTransform {
    /// Translation relative to the parent.
    pub translate: DVec3,
    /// XYZ Euler rotation, degrees.
    pub rotate_deg: DVec3,
    /// Per-axis scale.
    pub scale: DVec3,
    /// Joint-orient XYZ Euler rotation, degrees. Identity for non-joints.
    pub joint_orient_deg: DVec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translate: DVec3::ZERO,
            rotate_deg: DVec3::ZERO,
            scale: DVec3::ONE,
            joint_orient_deg: DVec3::ZERO,
        }
    }
}

impl LocalTransform {
    /// A transform that only translates.
    pub fn from_translation(translate: DVec3) -> Self {
        Self {
            translate,
            ..Self::default()
        }
    }

    /// The combined local rotation: joint orient followed by rotate.
    pub fn rotation(&self) -> DQuat {
        quat_from_euler_deg(self.joint_orient_deg) * quat_from_euler_deg(self.rotate_deg)
    }

    /// The local matrix `T * JO * R * S`.
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_translation(self.translate)
            * DMat4::from_quat(self.rotation())
            * DMat4::from_scale(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn euler_round_trip() {
        let euler = DVec3::new(30.0, -45.0, 10.0);
        let back = euler_deg_from_quat(quat_from_euler_deg(euler));
        assert_vec_close(back, euler);
    }

    #[test]
    fn xyz_order_applies_x_first() {
        // Rotating 90 about X then 90 about Y sends +Z to +X.
        let quat = quat_from_euler_deg(DVec3::new(90.0, 90.0, 0.0));
        assert_vec_close(quat * DVec3::Z, DVec3::X);
    }

    #[test]
    fn joint_orient_composes_before_rotate() {
        let xf = LocalTransform {
            rotate_deg: DVec3::new(90.0, 0.0, 0.0),
            joint_orient_deg: DVec3::new(0.0, 90.0, 0.0),
            ..LocalTransform::default()
        };
        // JO sends +X to -Z; rotate is about the already-oriented X axis,
        // leaving the X direction fixed.
        assert_vec_close(xf.rotation() * DVec3::X, -DVec3::Z);
    }

    #[test]
    fn matrix_translates_origin() {
        let xf = LocalTransform::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let p = xf.matrix().transform_point3(DVec3::ZERO);
        assert_vec_close(p, DVec3::new(1.0, 2.0, 3.0));
    }
}
