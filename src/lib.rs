//! Hybrid Collide – rigid-body collision pipeline and dual-world physics coordinator.
//!
//! The collision side runs broad phase, pair filtering, narrow phase, ENTER/STAY/EXIT
//! classification and a warm-started sequential-impulse solver over any body storage that
//! implements [`RigidBodyAdapter3D`] and [`CollisionSource3D`]. The hybrid side steps a
//! general world and an orbital world on one timeline and hands authoritative body state
//! across linked pairs, publishing an immutable [`HybridSnapshot`] per step.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod hybrid;
pub mod utils;
pub mod world;

pub use glam::{DQuat, DVec2, DVec3};

pub use collision::{
    broadphase::{BroadPhase3D, BruteForce3D, SpatialHash3D, SweepAndPrune3D},
    cache::ManifoldCache3D,
    ccd::Ccd3D,
    contact::ContactGenerator3D,
    debug::CollisionDebugSnapshot3D,
    events::{CollisionEvent, CollisionEventType},
    gjk::Gjk3D,
    manifold::{CollisionManifold3D, ContactManifold3D, WarmStartImpulse},
    narrowphase::Sat2D,
    pair::{CollisionHandle, CollisionPair},
};
pub use config::{ConfigError, SolverSettings, WorldSettings};
pub use core::{Aabb, BoundingSphere, CollisionFilter, ConvexPolygon2D, GeometryError, Ray3D};
pub use dynamics::{
    CollisionResponder3D, Constraint3D, ContactSolver3D, DistanceConstraint3D, RigidBodyAdapter3D,
};
pub use hybrid::{
    HybridBodyLink, HybridError, HybridPhysicsCoordinator, HybridSnapshot, PhysicsError,
    PhysicsWorld, RigidBodyWorld,
};
pub use utils::allocator::{Arena, EntityId};
pub use world::{CollisionSource3D, CollisionWorld3D};

/// Coordinator whose general side is the built-in [`RigidBodyWorld`].
pub type RigidHybridCoordinator<O> = HybridPhysicsCoordinator<RigidBodyWorld, O>;
