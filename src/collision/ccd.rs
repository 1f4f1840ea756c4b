use glam::DVec3;

use crate::{
    config::{DEFAULT_CCD_REFINEMENT_ITERATIONS, DEFAULT_CCD_SAMPLES},
    core::{bounds::Aabb, error::GeometryError},
};

use super::gjk::{ConvexSupport3D, Gjk3D, Translated};

/// Continuous collision queries returning a normalized time of impact in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Ccd3D {
    samples: u32,
    refinement_iterations: u32,
}

impl Default for Ccd3D {
    fn default() -> Self {
        Self {
            samples: DEFAULT_CCD_SAMPLES,
            refinement_iterations: DEFAULT_CCD_REFINEMENT_ITERATIONS,
        }
    }
}

impl Ccd3D {
    pub fn new(samples: u32, refinement_iterations: u32) -> Result<Self, GeometryError> {
        if samples < 2 {
            return Err(GeometryError::TooFewIterations {
                name: "samples",
                min: 2,
                value: samples,
            });
        }
        if refinement_iterations < 1 {
            return Err(GeometryError::TooFewIterations {
                name: "refinement_iterations",
                min: 1,
                value: refinement_iterations,
            });
        }
        Ok(Self {
            samples,
            refinement_iterations,
        })
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn refinement_iterations(&self) -> u32 {
        self.refinement_iterations
    }

    /// Slab clipping of the segment `start -> end` against `aabb`.
    pub fn segment_aabb_toi(start: DVec3, end: DVec3, aabb: &Aabb) -> Option<f64> {
        let delta = (end - start).to_array();
        let origin = start.to_array();
        let min = aabb.min().to_array();
        let max = aabb.max().to_array();
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;

        for axis in 0..3 {
            if delta[axis] == 0.0 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / delta[axis];
            let mut t0 = (min[axis] - origin[axis]) * inv;
            let mut t1 = (max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(t_enter)
    }

    /// `moving` travels by `delta` while `target` stays put.
    pub fn swept_aabb_toi(moving: &Aabb, delta: DVec3, target: &Aabb) -> Option<f64> {
        let expanded = target.expanded_by(moving.half_extents()).ok()?;
        let start = moving.center();
        Self::segment_aabb_toi(start, start + delta, &expanded)
    }

    /// Approximate time of impact for two convex shapes translating by `delta_a` and
    /// `delta_b`.
    ///
    /// Samples the sweep uniformly and bisects the first bracket that changes from
    /// separated to intersecting, returning the upper bound of the final bracket. A
    /// contact shorter than one sample interval can be stepped over, so this is an
    /// approximation rather than a conservative-advancement guarantee.
    pub fn swept_convex_toi<A, B>(
        &self,
        a: &A,
        delta_a: DVec3,
        b: &B,
        delta_b: DVec3,
    ) -> Option<f64>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        if Gjk3D::intersects(a, b) {
            return Some(0.0);
        }

        let hit_at = |t: f64| {
            Gjk3D::intersects(
                &Translated::new(a, delta_a * t),
                &Translated::new(b, delta_b * t),
            )
        };

        let last = f64::from(self.samples - 1);
        let mut previous = 0.0;
        for step in 1..self.samples {
            let t = f64::from(step) / last;
            if hit_at(t) {
                let (mut low, mut high) = (previous, t);
                for _ in 0..self.refinement_iterations {
                    let mid = (low + high) * 0.5;
                    if hit_at(mid) {
                        high = mid;
                    } else {
                        low = mid;
                    }
                }
                return Some(high);
            }
            previous = t;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::BoundingSphere;

    #[test]
    fn segment_enters_box() {
        let aabb = Aabb::new(DVec3::new(4.0, -1.0, -1.0), DVec3::new(6.0, 1.0, 1.0)).unwrap();
        let toi = Ccd3D::segment_aabb_toi(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0), &aabb);
        assert!((toi.unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn segment_outside_slab_misses() {
        let aabb = Aabb::new(DVec3::new(4.0, -1.0, -1.0), DVec3::new(6.0, 1.0, 1.0)).unwrap();
        let parallel = Ccd3D::segment_aabb_toi(
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(10.0, 2.0, 0.0),
            &aabb,
        );
        let short = Ccd3D::segment_aabb_toi(DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0), &aabb);
        assert!(parallel.is_none());
        assert!(short.is_none());
    }

    #[test]
    fn swept_box_accounts_for_extent() {
        let moving = Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(0.5)).unwrap();
        let wall = Aabb::new(DVec3::new(5.0, -2.0, -2.0), DVec3::new(5.2, 2.0, 2.0)).unwrap();
        let toi = Ccd3D::swept_aabb_toi(&moving, DVec3::new(10.0, 0.0, 0.0), &wall).unwrap();
        assert!((toi - 0.45).abs() < 1e-12);
    }

    #[test]
    fn swept_spheres_bracket_the_impact() {
        let a = BoundingSphere::new(DVec3::ZERO, 0.5).unwrap();
        let b = BoundingSphere::new(DVec3::new(10.0, 0.0, 0.0), 0.5).unwrap();
        let toi = Ccd3D::default()
            .swept_convex_toi(&a, DVec3::new(20.0, 0.0, 0.0), &b, DVec3::ZERO)
            .unwrap();
        // Surfaces touch when A has travelled 9 of 20 units; the bracket never ends early.
        assert!(toi >= 0.45 - 1e-9);
        assert!(toi < 0.46);
    }

    #[test]
    fn overlapping_shapes_hit_immediately() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE).unwrap();
        let b = Aabb::new(DVec3::splat(0.5), DVec3::splat(1.5)).unwrap();
        assert_eq!(
            Ccd3D::default().swept_convex_toi(&a, DVec3::X, &b, DVec3::ZERO),
            Some(0.0)
        );
    }

    #[test]
    fn rejects_too_few_samples() {
        assert!(Ccd3D::new(1, 24).is_err());
        assert!(Ccd3D::new(32, 0).is_err());
        assert!(Ccd3D::new(2, 1).is_ok());
    }
}
