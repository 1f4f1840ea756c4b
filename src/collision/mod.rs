//! Collision detection modules: broad-phase, filtering, narrow-phase, contact manifolds, caching, CCD, debug capture.

pub mod broadphase;
pub mod cache;
pub mod ccd;
pub mod contact;
pub mod debug;
pub mod events;
pub mod filtering;
pub mod gjk;
pub mod manifold;
pub mod narrowphase;
pub mod pair;

pub use broadphase::{BroadPhase3D, BruteForce3D, SpatialHash3D, SweepAndPrune3D, SweepAxis};
pub use cache::ManifoldCache3D;
pub use ccd::Ccd3D;
pub use contact::ContactGenerator3D;
pub use debug::{CollisionDebugSnapshot3D, DebugContact, ItemBounds};
pub use events::{CollisionEvent, CollisionEventType};
pub use filtering::{filter_pairs, FilteredCollisionPair};
pub use gjk::{ConvexHull3D, ConvexSupport3D, Gjk3D, Translated};
pub use manifold::{
    CollisionManifold2D, CollisionManifold3D, ContactManifold3D, ContactPoint3D, WarmStartImpulse,
};
pub use narrowphase::Sat2D;
pub use pair::{CollisionHandle, CollisionPair};
