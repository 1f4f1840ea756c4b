//! Additional math helpers layered on top of `glam`.

use glam::DVec3;

/// Squared-length threshold below which a vector is treated as zero.
pub const NEAR_ZERO: f64 = 1e-9;

/// Returns a unit vector perpendicular to `v`.
///
/// Crosses with the world X axis unless `v` is mostly along X, in which case Y is used.
/// Falls back to +Z when the cross product degenerates.
pub fn any_perpendicular(v: DVec3) -> DVec3 {
    let axis = if v.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
    let perpendicular = v.cross(axis);
    if perpendicular.length() <= NEAR_ZERO {
        DVec3::Z
    } else {
        perpendicular.normalize()
    }
}

/// Clamps into `[0, 1]`.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perpendicular_is_orthogonal_and_unit() {
        for v in [DVec3::X, DVec3::Y, DVec3::Z, DVec3::new(0.3, -2.0, 5.0)] {
            let p = any_perpendicular(v);
            assert!(p.dot(v).abs() < 1e-12);
            assert!((p.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn perpendicular_of_zero_falls_back_to_z() {
        assert_eq!(any_perpendicular(DVec3::ZERO), DVec3::Z);
    }
}
