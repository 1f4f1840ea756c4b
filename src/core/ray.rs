use glam::DVec3;

use super::{
    bounds::{Aabb, BoundingSphere},
    error::GeometryError,
};

/// Half-infinite ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3D {
    origin: DVec3,
    direction: DVec3,
}

impl Ray3D {
    /// Builds a ray, normalizing `direction`.
    pub fn new(origin: DVec3, direction: DVec3) -> Result<Self, GeometryError> {
        if !origin.is_finite() {
            return Err(GeometryError::NonFinite("ray origin"));
        }
        if !direction.is_finite() {
            return Err(GeometryError::NonFinite("ray direction"));
        }
        let direction = direction.try_normalize().ok_or(GeometryError::ZeroDirection)?;
        Ok(Self { origin, direction })
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn point_at(&self, distance: f64) -> DVec3 {
        self.origin + self.direction * distance
    }

    /// Entry distance into `aabb` (0 when the origin is inside), or `None` on a miss.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f64> {
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        let origin = self.origin.to_array();
        let direction = self.direction.to_array();
        let min = aabb.min().to_array();
        let max = aabb.max().to_array();

        for axis in 0..3 {
            if direction[axis].abs() < 1e-12 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let mut t1 = (min[axis] - origin[axis]) * inv;
            let mut t2 = (max[axis] - origin[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Entry distance into `sphere` (0 when the origin is inside), or `None` on a miss.
    pub fn intersect_sphere(&self, sphere: &BoundingSphere) -> Option<f64> {
        let offset = self.origin - sphere.center();
        let b = offset.dot(self.direction);
        let c = offset.length_squared() - sphere.radius() * sphere.radius();
        if c <= 0.0 {
            return Some(0.0);
        }
        if b > 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        Some(-b - discriminant.sqrt())
    }
}
