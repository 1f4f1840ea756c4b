use glam::DVec2;

use crate::core::polygon::{ConvexPolygon2D, ProjectionInterval};

use super::manifold::CollisionManifold2D;

/// Separating axis theorem for planar convex polygons.
pub struct Sat2D;

impl Sat2D {
    pub fn intersects(a: &ConvexPolygon2D, b: &ConvexPolygon2D) -> bool {
        Self::intersects_with_manifold(a, b).is_some()
    }

    /// Minimum-overlap axis among the edge normals of `a` then `b`, oriented from `a`
    /// toward `b`. The first axis reaching the minimum wins.
    pub fn intersects_with_manifold(
        a: &ConvexPolygon2D,
        b: &ConvexPolygon2D,
    ) -> Option<CollisionManifold2D> {
        let mut best_axis = DVec2::ZERO;
        let mut best_overlap = f64::INFINITY;

        for (start, end) in a.edges().chain(b.edges()) {
            let Some(axis) = edge_normal(start, end) else {
                continue;
            };
            let overlap = Self::project(a, axis).overlap_depth(&Self::project(b, axis));
            if overlap < 0.0 {
                return None;
            }
            if overlap < best_overlap {
                best_overlap = overlap;
                best_axis = axis;
            }
        }

        if !best_overlap.is_finite() {
            return None;
        }
        if best_axis.dot(b.centroid() - a.centroid()) < 0.0 {
            best_axis = -best_axis;
        }
        CollisionManifold2D::new(best_axis, best_overlap).ok()
    }

    pub fn project(polygon: &ConvexPolygon2D, axis: DVec2) -> ProjectionInterval {
        polygon.project(axis)
    }
}

fn edge_normal(start: DVec2, end: DVec2) -> Option<DVec2> {
    let edge = end - start;
    DVec2::new(edge.y, -edge.x).try_normalize()
}
