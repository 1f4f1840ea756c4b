use glam::DVec3;

use crate::core::bounds::{Aabb, BoundingSphere};

use super::manifold::{CollisionManifold3D, ContactManifold3D, ContactPoint3D};

/// Builds single-point contact manifolds for primitive pairs.
pub struct ContactGenerator3D;

impl ContactGenerator3D {
    /// Resolves along the axis of least overlap, preferring X, then Y, then Z on ties.
    /// The normal points from `a` toward `b`; touching boxes yield a zero-depth contact.
    pub fn aabb(a: &Aabb, b: &Aabb) -> Option<ContactManifold3D> {
        if !a.intersects(b) {
            return None;
        }
        let overlap_min = a.min().max(b.min());
        let overlap_max = a.max().min(b.max());
        let overlap = overlap_max - overlap_min;
        let center_delta = b.center() - a.center();
        let mut point = (overlap_min + overlap_max) * 0.5;

        let mut axis = 0;
        for candidate in 1..3 {
            if overlap[candidate] < overlap[axis] {
                axis = candidate;
            }
        }

        let sign = if center_delta[axis] >= 0.0 { 1.0 } else { -1.0 };
        let mut normal = DVec3::ZERO;
        normal[axis] = sign;
        point[axis] = if sign > 0.0 {
            (a.max()[axis] + b.min()[axis]) * 0.5
        } else {
            (a.min()[axis] + b.max()[axis]) * 0.5
        };

        Self::single_contact(normal, overlap[axis], point)
    }

    /// Center-to-center normal; coincident centers resolve along +X.
    pub fn sphere(a: &BoundingSphere, b: &BoundingSphere) -> Option<ContactManifold3D> {
        let delta = b.center() - a.center();
        let radius_sum = a.radius() + b.radius();
        let distance_sq = delta.length_squared();
        if distance_sq > radius_sum * radius_sum {
            return None;
        }

        let mut distance = distance_sq.sqrt();
        let normal = if distance <= 1e-9 {
            distance = 0.0;
            DVec3::X
        } else {
            delta / distance
        };

        let surface_a = a.center() + normal * a.radius();
        let surface_b = b.center() - normal * b.radius();
        Self::single_contact(normal, radius_sum - distance, (surface_a + surface_b) * 0.5)
    }

    fn single_contact(normal: DVec3, depth: f64, point: DVec3) -> Option<ContactManifold3D> {
        let manifold = CollisionManifold3D::new(normal, depth.max(0.0)).ok()?;
        let contact = ContactPoint3D::new(point).ok()?;
        ContactManifold3D::new(manifold, vec![contact]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_boxes_resolve_along_x() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0)).unwrap();
        let b = Aabb::new(DVec3::new(1.5, 0.5, 0.5), DVec3::new(3.0, 1.5, 1.5)).unwrap();

        let contact = ContactGenerator3D::aabb(&a, &b).unwrap();
        assert_eq!(contact.normal(), DVec3::X);
        assert!((contact.depth() - 0.5).abs() < 1e-12);
        assert_eq!(contact.contacts()[0].position, DVec3::new(1.75, 1.0, 1.0));
    }

    #[test]
    fn normal_follows_center_delta() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0)).unwrap();
        let b = Aabb::new(DVec3::new(0.2, -0.5, 0.2), DVec3::new(1.8, 0.3, 1.8)).unwrap();
        let contact = ContactGenerator3D::aabb(&a, &b).unwrap();
        assert_eq!(contact.normal(), DVec3::NEG_Y);
        assert!((contact.depth() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn touching_boxes_report_zero_depth() {
        let floor = Aabb::new(DVec3::new(-5.0, -1.0, -5.0), DVec3::new(5.0, 0.0, 5.0)).unwrap();
        let crate_box = Aabb::new(DVec3::new(-0.5, 0.0, -0.5), DVec3::new(0.5, 1.0, 0.5)).unwrap();
        let contact = ContactGenerator3D::aabb(&floor, &crate_box).unwrap();
        assert_eq!(contact.normal(), DVec3::Y);
        assert_eq!(contact.depth(), 0.0);
    }

    #[test]
    fn spheres_share_midpoint_contact() {
        let a = BoundingSphere::new(DVec3::ZERO, 1.0).unwrap();
        let b = BoundingSphere::new(DVec3::new(0.0, 1.5, 0.0), 1.0).unwrap();
        let contact = ContactGenerator3D::sphere(&a, &b).unwrap();
        assert_eq!(contact.normal(), DVec3::Y);
        assert!((contact.depth() - 0.5).abs() < 1e-12);
        assert!((contact.contacts()[0].position - DVec3::new(0.0, 0.75, 0.0)).length() < 1e-12);

        let coincident = ContactGenerator3D::sphere(&a, &a).unwrap();
        assert_eq!(coincident.normal(), DVec3::X);
        assert!((coincident.depth() - 2.0).abs() < 1e-12);
    }
}
