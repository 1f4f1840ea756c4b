//! Global configuration constants and serde-backed settings for the collision pipeline.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default gravity applied by `CollisionWorld3D::step`. Zero until a caller opts in.
pub const DEFAULT_GRAVITY: [f64; 3] = [0.0, 0.0, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 60.0;

/// Number of contact solver passes performed per world update.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 1;

/// Number of constraint passes performed per world step.
pub const DEFAULT_CONSTRAINT_ITERATIONS: u32 = 1;

/// Fraction of the penetration (beyond slop) removed per position correction.
pub const DEFAULT_CORRECTION_PERCENT: f64 = 0.8;

/// Penetration tolerated before position correction kicks in.
pub const DEFAULT_SLOP: f64 = 0.001;

/// Frames a manifold survives in the cache without being refreshed.
pub const DEFAULT_MANIFOLD_RETENTION_FRAMES: u64 = 2;

/// Uniform samples taken along a sweep by the convex time-of-impact search.
pub const DEFAULT_CCD_SAMPLES: u32 = 32;

/// Bisection passes refining the convex time-of-impact bracket.
pub const DEFAULT_CCD_REFINEMENT_ITERATIONS: u32 = 24;

/// Frame budget used when warning about slow world updates (milliseconds).
pub const DEFAULT_FRAME_BUDGET_MS: f64 = 16.0;

/// Magic number prefixing every hybrid snapshot stream (`HYS1`).
pub const SNAPSHOT_STREAM_MAGIC: u32 = 0x4859_5331;

/// Current hybrid snapshot stream version.
pub const SNAPSHOT_STREAM_VERSION: u32 = 1;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("correction percent must be finite and within [0, 1], got {0}")]
    CorrectionPercent(f64),
    #[error("slop must be finite and >= 0, got {0}")]
    Slop(f64),
    #[error("{name} must be >= 1")]
    Iterations { name: &'static str },
    #[error("gravity must be finite, got {0}")]
    Gravity(DVec3),
    #[error("time step must be finite and > 0, got {0}")]
    TimeStep(f64),
}

/// Tunables of the sequential-impulse contact solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub correction_percent: f64,
    pub slop: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            correction_percent: DEFAULT_CORRECTION_PERCENT,
            slop: DEFAULT_SLOP,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_correction_percent(self.correction_percent)?;
        validate_slop(self.slop)
    }
}

/// Tunables of a collision world's fixed-step loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub gravity: DVec3,
    pub solver_iterations: u32,
    pub constraint_iterations: u32,
    pub manifold_retention_frames: u64,
    pub solver: SolverSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: DVec3::from_array(DEFAULT_GRAVITY),
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            constraint_iterations: DEFAULT_CONSTRAINT_ITERATIONS,
            manifold_retention_frames: DEFAULT_MANIFOLD_RETENTION_FRAMES,
            solver: SolverSettings::default(),
        }
    }
}

impl WorldSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gravity(self.gravity)?;
        validate_iterations("solver_iterations", self.solver_iterations)?;
        validate_iterations("constraint_iterations", self.constraint_iterations)?;
        self.solver.validate()
    }
}

pub(crate) fn validate_correction_percent(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::CorrectionPercent(value))
    }
}

pub(crate) fn validate_slop(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Slop(value))
    }
}

pub(crate) fn validate_iterations(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ConfigError::Iterations { name })
    }
}

pub(crate) fn validate_gravity(value: DVec3) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Gravity(value))
    }
}

pub(crate) fn validate_time_step(dt: f64) -> Result<(), ConfigError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::TimeStep(dt))
    }
}
