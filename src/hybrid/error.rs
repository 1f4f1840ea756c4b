use std::fmt;

use thiserror::Error;

use crate::{config::ConfigError, core::error::GeometryError};

use super::model::{BodyHandle, ConstraintHandle};

/// Failures reported by a [`PhysicsWorld`](super::world::PhysicsWorld) backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("unknown body {0}")]
    UnknownBody(BodyHandle),
    #[error("unknown constraint {0}")]
    UnknownConstraint(ConstraintHandle),
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("invalid definition: {0}")]
    InvalidDefinition(&'static str),
    #[error("invalid runtime tuning: {0}")]
    InvalidTuning(&'static str),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("world has been closed")]
    Closed,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Which side of a hybrid coordinator an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldRole {
    General,
    Orbital,
}

impl fmt::Display for WorldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldRole::General => f.write_str("general"),
            WorldRole::Orbital => f.write_str("orbital"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HybridError {
    #[error("{handle} is not present in the {world} world")]
    UnknownBody { world: WorldRole, handle: BodyHandle },
    #[error("time step must be finite and > 0, got {0}")]
    InvalidTimestep(f64),
    #[error(
        "interpolation alpha must be within [0, 1] and extrapolation finite and >= 0, \
         got alpha {alpha}, extrapolation {extrapolation}"
    )]
    InvalidRenderMetadata { alpha: f64, extrapolation: f64 },
    #[error("{name} must be >= 0 and not NaN, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("hybrid strict capability gate failed: {0}")]
    CapabilityGate(String),
    #[error("{world} world failed: {source}")]
    Backend {
        world: WorldRole,
        #[source]
        source: PhysicsError,
    },
}

impl HybridError {
    pub(crate) fn backend(world: WorldRole) -> impl FnOnce(PhysicsError) -> Self {
        move |source| HybridError::Backend { world, source }
    }
}
