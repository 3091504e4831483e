//! 3-D point helpers for limb construction.

use glam::DVec3;

/// Euclidean distance between two points.
pub fn distance(a: DVec3, b: DVec3) -> f64 {
    (b - a).length()
}

/// Computes the pole-vector position for a two-bone chain.
///
/// The start→mid vector is projected onto the start→end axis; the
/// perpendicular remainder is rescaled to the start→mid length and added
/// back onto the projected point, placing the pole in the chain's bend
/// plane at a working distance from the limb.
///
/// Returns the position and a degenerate flag. A straight chain has no
/// bend plane: the perpendicular is zero, the scale factor stays 1, and
/// the returned position is arbitrary. Callers skip the pole constraint
/// and surface a warning when the flag is set.
pub fn pole_vector(start: DVec3, mid: DVec3, end: DVec3) -> (DVec3, bool) {
    let start_to_mid = mid - start;
    let start_to_end = end - start;

    let axis_len_sq = start_to_end.length_squared();
    let projection = if axis_len_sq > 0.0 {
        start_to_end * (start_to_mid.dot(start_to_end) / axis_len_sq)
    } else {
        DVec3::ZERO
    };

    let perpendicular = start_to_mid - projection;
    let perp_len = perpendicular.length();
    let degenerate = perp_len == 0.0;
    let scale = if degenerate {
        1.0
    } else {
        start_to_mid.length() / perp_len
    };

    (start + projection + perpendicular * scale, degenerate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn pole_sits_in_the_bend_plane() {
        let start = DVec3::new(0.0, 10.0, 0.0);
        let mid = DVec3::new(5.0, 5.0, 2.0);
        let end = DVec3::new(0.0, 0.0, 0.0);
        let (pole, degenerate) = pole_vector(start, mid, end);
        assert!(!degenerate);

        // The pole offset from the projected point matches the start-to-mid
        // length and is perpendicular to the chain axis.
        let axis = (end - start).normalize();
        let projected = start + axis * (mid - start).dot(axis);
        let offset = pole - projected;
        assert!((offset.length() - (mid - start).length()).abs() < 1e-9);
        assert!(offset.dot(axis).abs() < 1e-9);
    }

    #[test]
    fn pole_is_translation_invariant() {
        let start = DVec3::new(0.0, 10.0, 0.0);
        let mid = DVec3::new(5.0, 5.0, 2.0);
        let end = DVec3::new(0.0, 0.0, 0.0);
        let shift = DVec3::new(-7.0, 3.0, 12.5);

        let (pole, _) = pole_vector(start, mid, end);
        let (shifted, _) = pole_vector(start + shift, mid + shift, end + shift);
        assert!(vec_close(shifted, pole + shift));
    }

    #[test]
    fn straight_chain_is_degenerate() {
        let (pole, degenerate) = pole_vector(
            DVec3::ZERO,
            DVec3::new(5.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
        );
        assert!(degenerate);
        // Scale factor 1 with a zero perpendicular: the mid point itself.
        assert!(vec_close(pole, DVec3::new(5.0, 0.0, 0.0)));
    }
}
