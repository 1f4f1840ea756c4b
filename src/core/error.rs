use thiserror::Error;

/// Invalid input to a geometry or manifold constructor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("min must not exceed max on the {0} axis")]
    InvertedBounds(char),
    #[error("radius must be >= 0, got {0}")]
    NegativeRadius(f64),
    #[error("normal must be unit length, got length {0}")]
    NonUnitNormal(f64),
    #[error("penetration depth must be >= 0, got {0}")]
    NegativeDepth(f64),
    #[error("contact manifold requires at least one contact point")]
    NoContactPoints,
    #[error("direction must be non-zero")]
    ZeroDirection,
    #[error("convex polygon requires at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon contains duplicate consecutive vertices at index {0}")]
    DuplicateVertex(usize),
    #[error("polygon must be convex with a consistent winding")]
    NotConvex,
    #[error("polygon points are collinear")]
    Collinear,
    #[error("{name} must be >= {min}, got {value}")]
    TooFewIterations {
        name: &'static str,
        min: u32,
        value: u32,
    },
    #[error("{0} must be within [0, 1]")]
    OutOfUnitRange(&'static str),
    #[error("{0} must be >= 0")]
    Negative(&'static str),
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
}

pub(crate) fn ensure_finite(value: f64, name: &'static str) -> Result<f64, GeometryError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeometryError::NonFinite(name))
    }
}
