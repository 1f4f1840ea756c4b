use glam::DVec2;

use super::error::GeometryError;

const EPSILON: f64 = 1e-9;

/// Closed interval of a shape projected onto an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInterval {
    pub min: f64,
    pub max: f64,
}

impl ProjectionInterval {
    pub fn new(min: f64, max: f64) -> Self {
        debug_assert!(min <= max, "projection interval min must not exceed max");
        Self { min, max }
    }

    /// Signed overlap length; negative when the intervals are disjoint.
    pub fn overlap_depth(&self, other: &ProjectionInterval) -> f64 {
        self.max.min(other.max) - self.min.max(other.min)
    }

    pub fn overlaps(&self, other: &ProjectionInterval) -> bool {
        self.overlap_depth(other) >= 0.0
    }
}

/// Convex polygon in the plane with a consistent winding.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon2D {
    vertices: Vec<DVec2>,
}

impl ConvexPolygon2D {
    pub fn new(vertices: Vec<DVec2>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite("polygon vertex"));
        }
        let n = vertices.len();
        for i in 0..n {
            if vertices[i].distance(vertices[(i + 1) % n]) <= EPSILON {
                return Err(GeometryError::DuplicateVertex(i));
            }
        }

        // Collinear runs are tolerated; every real turn must share one sign.
        let mut winding = 0.0_f64;
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let c = vertices[(i + 2) % n];
            let turn = (b - a).perp_dot(c - b);
            if turn.abs() <= EPSILON {
                continue;
            }
            if winding == 0.0 {
                winding = turn.signum();
            } else if winding != turn.signum() {
                return Err(GeometryError::NotConvex);
            }
        }
        if winding == 0.0 {
            return Err(GeometryError::Collinear);
        }
        Ok(Self { vertices })
    }

    /// Builds a polygon from flat `x0, y0, x1, y1, ...` coordinates.
    pub fn from_coords(coords: &[f64]) -> Result<Self, GeometryError> {
        if coords.len() % 2 != 0 {
            return Err(GeometryError::TooFewVertices(coords.len() / 2));
        }
        Self::new(
            coords
                .chunks_exact(2)
                .map(|xy| DVec2::new(xy[0], xy[1]))
                .collect(),
        )
    }

    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex average.
    pub fn centroid(&self) -> DVec2 {
        self.vertices.iter().copied().sum::<DVec2>() / self.vertices.len() as f64
    }

    /// Edges as `(start, end)` in winding order, closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn project(&self, axis: DVec2) -> ProjectionInterval {
        let (min, max) = self
            .vertices
            .iter()
            .map(|v| v.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            });
        ProjectionInterval::new(min, max)
    }
}
