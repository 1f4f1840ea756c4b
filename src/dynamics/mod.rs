//! Contact response: the rigid-body adapter seam, the sequential-impulse solver, and constraints.

pub mod adapter;
pub mod constraints;
pub mod solver;

pub use adapter::RigidBodyAdapter3D;
pub use constraints::{Constraint3D, ConstraintRegistry, DistanceConstraint3D};
pub use solver::{CollisionResponder3D, ContactSolver3D};
