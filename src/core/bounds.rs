use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::error::GeometryError;

/// Axis-aligned bounding box with finite coordinates and `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAabb")]
pub struct Aabb {
    min: DVec3,
    max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Result<Self, GeometryError> {
        if !min.is_finite() {
            return Err(GeometryError::NonFinite("aabb min"));
        }
        if !max.is_finite() {
            return Err(GeometryError::NonFinite("aabb max"));
        }
        for (axis, (lo, hi)) in ['x', 'y', 'z']
            .into_iter()
            .zip(min.to_array().into_iter().zip(max.to_array()))
        {
            if lo > hi {
                return Err(GeometryError::InvertedBounds(axis));
            }
        }
        Ok(Self { min, max })
    }

    pub fn from_center_half_extents(
        center: DVec3,
        half_extents: DVec3,
    ) -> Result<Self, GeometryError> {
        if half_extents.min_element() < 0.0 {
            return Err(GeometryError::Negative("half extents"));
        }
        Self::new(center - half_extents, center + half_extents)
    }

    /// Tightest box around `points`; `None` for an empty slice.
    pub fn from_points(points: &[DVec3]) -> Option<Result<Self, GeometryError>> {
        let (first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self::new(min, max))
    }

    pub fn min(&self) -> DVec3 {
        self.min
    }

    pub fn max(&self) -> DVec3 {
        self.max
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> DVec3 {
        self.size() * 0.5
    }

    /// Overlap test; touching faces count as intersecting.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grows every face outward by `margin` (per axis).
    pub fn expanded_by(&self, margin: DVec3) -> Result<Aabb, GeometryError> {
        Aabb::new(self.min - margin, self.max + margin)
    }

    /// Translated copy; translation must be finite.
    pub fn translated(&self, offset: DVec3) -> Result<Aabb, GeometryError> {
        Aabb::new(self.min + offset, self.max + offset)
    }
}

#[derive(Deserialize)]
struct RawAabb {
    min: DVec3,
    max: DVec3,
}

impl TryFrom<RawAabb> for Aabb {
    type Error = GeometryError;

    fn try_from(raw: RawAabb) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

/// Sphere volume with a finite center and non-negative radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSphere")]
pub struct BoundingSphere {
    center: DVec3,
    radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Result<Self, GeometryError> {
        if !center.is_finite() {
            return Err(GeometryError::NonFinite("sphere center"));
        }
        if !radius.is_finite() {
            return Err(GeometryError::NonFinite("sphere radius"));
        }
        if radius < 0.0 {
            return Err(GeometryError::NegativeRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let radius_sum = self.radius + other.radius;
        self.center.distance_squared(other.center) <= radius_sum * radius_sum
    }

    /// Closest-point test against a box.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = self.center.clamp(aabb.min(), aabb.max());
        closest.distance_squared(self.center) <= self.radius * self.radius
    }

    pub fn bounds(&self) -> Aabb {
        let r = DVec3::splat(self.radius);
        Aabb {
            min: self.center - r,
            max: self.center + r,
        }
    }
}

#[derive(Deserialize)]
struct RawSphere {
    center: DVec3,
    radius: f64,
}

impl TryFrom<RawSphere> for BoundingSphere {
    type Error = GeometryError;

    fn try_from(raw: RawSphere) -> Result<Self, Self::Error> {
        Self::new(raw.center, raw.radius)
    }
}
