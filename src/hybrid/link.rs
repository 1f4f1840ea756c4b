use std::fmt;

use serde::{Deserialize, Serialize};

use super::{error::HybridError, model::BodyHandle};

/// World whose state is authoritative for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HybridOwnership {
    General,
    Orbital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateHandoffMode {
    /// Position, orientation, both velocities, and timestamp.
    FullState,
    /// Position, linear velocity, and timestamp; the follower keeps its rotation.
    PositionVelocityOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictPolicy {
    #[default]
    Overwrite,
    RejectOnDivergence,
}

/// Owner/follower deltas above which a [`ConflictPolicy::RejectOnDivergence`] link skips handoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct DivergenceThresholds {
    pub max_position: f64,
    pub max_linear_velocity: f64,
    pub max_angular_velocity: f64,
}

impl Default for DivergenceThresholds {
    fn default() -> Self {
        Self {
            max_position: f64::INFINITY,
            max_linear_velocity: f64::INFINITY,
            max_angular_velocity: f64::INFINITY,
        }
    }
}

impl DivergenceThresholds {
    /// Only the position delta is bounded.
    pub fn position_only(max_position: f64) -> Self {
        Self {
            max_position,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), HybridError> {
        for (name, value) in [
            ("max position divergence", self.max_position),
            ("max linear velocity divergence", self.max_linear_velocity),
            ("max angular velocity divergence", self.max_angular_velocity),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(HybridError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Binds one body in the general world to one body in the orbital world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLink")]
pub struct HybridBodyLink {
    general_body: BodyHandle,
    orbital_body: BodyHandle,
    ownership: HybridOwnership,
    handoff_mode: StateHandoffMode,
    conflict_policy: ConflictPolicy,
    thresholds: DivergenceThresholds,
}

impl HybridBodyLink {
    /// Overwriting link with unbounded thresholds.
    pub fn new(
        general_body: BodyHandle,
        orbital_body: BodyHandle,
        ownership: HybridOwnership,
        handoff_mode: StateHandoffMode,
    ) -> Self {
        Self {
            general_body,
            orbital_body,
            ownership,
            handoff_mode,
            conflict_policy: ConflictPolicy::Overwrite,
            thresholds: DivergenceThresholds::default(),
        }
    }

    pub fn with_policy(
        self,
        conflict_policy: ConflictPolicy,
        thresholds: DivergenceThresholds,
    ) -> Result<Self, HybridError> {
        thresholds.validate()?;
        Ok(Self {
            conflict_policy,
            thresholds,
            ..self
        })
    }

    pub fn general_body(&self) -> BodyHandle {
        self.general_body
    }

    pub fn orbital_body(&self) -> BodyHandle {
        self.orbital_body
    }

    pub fn ownership(&self) -> HybridOwnership {
        self.ownership
    }

    pub fn handoff_mode(&self) -> StateHandoffMode {
        self.handoff_mode
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    pub fn thresholds(&self) -> DivergenceThresholds {
        self.thresholds
    }

    pub(crate) fn involves(&self, handle: BodyHandle) -> bool {
        self.general_body == handle || self.orbital_body == handle
    }
}

#[derive(Deserialize)]
struct RawThresholds {
    max_position: f64,
    max_linear_velocity: f64,
    max_angular_velocity: f64,
}

impl TryFrom<RawThresholds> for DivergenceThresholds {
    type Error = HybridError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        let thresholds = Self {
            max_position: raw.max_position,
            max_linear_velocity: raw.max_linear_velocity,
            max_angular_velocity: raw.max_angular_velocity,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }
}

#[derive(Deserialize)]
struct RawLink {
    general_body: BodyHandle,
    orbital_body: BodyHandle,
    ownership: HybridOwnership,
    handoff_mode: StateHandoffMode,
    conflict_policy: ConflictPolicy,
    thresholds: DivergenceThresholds,
}

impl TryFrom<RawLink> for HybridBodyLink {
    type Error = HybridError;

    fn try_from(raw: RawLink) -> Result<Self, Self::Error> {
        HybridBodyLink::new(raw.general_body, raw.orbital_body, raw.ownership, raw.handoff_mode)
            .with_policy(raw.conflict_policy, raw.thresholds)
    }
}

/// Coordinator-assigned link identity; ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}
