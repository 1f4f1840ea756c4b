//! Two-world physics coordination: a general rigid-body world and an orbital world stepped
//! on one timeline, with one-way state handoff across linked bodies.

pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod link;
pub mod model;
pub mod rigid_world;
pub mod snapshot;
pub mod snapshot_io;
pub mod world;

pub use coordinator::HybridPhysicsCoordinator;
pub use diagnostics::{
    CapabilityPolicy, HybridCapabilityReport, HybridLinkDiagnostics, HybridStepTelemetry,
};
pub use error::{HybridError, PhysicsError, WorldRole};
pub use link::{
    ConflictPolicy, DivergenceThresholds, HybridBodyLink, HybridOwnership, LinkId,
    StateHandoffMode,
};
pub use model::{
    BodyHandle, CollisionShape, ConstraintHandle, ConstraintKind, PhysicsBodyDefinition,
    PhysicsBodyState, PhysicsBodyType, PhysicsCapabilities, PhysicsConstraintDefinition,
    ReferenceFrame, RuntimeTuning,
};
pub use rigid_world::RigidBodyWorld;
pub use snapshot::{HybridSnapshot, SnapshotReader, SnapshotRecorder};
pub use snapshot_io::SnapshotIoError;
pub use world::PhysicsWorld;
