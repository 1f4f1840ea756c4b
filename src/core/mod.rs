//! Core value types: bounding volumes, rays, planar polygons, and collision filters.

pub mod bounds;
pub mod error;
pub mod filter;
pub mod polygon;
pub mod ray;

pub use bounds::{Aabb, BoundingSphere};
pub use error::GeometryError;
pub use filter::{CollisionFilter, CollisionKind};
pub use polygon::{ConvexPolygon2D, ProjectionInterval};
pub use ray::Ray3D;
