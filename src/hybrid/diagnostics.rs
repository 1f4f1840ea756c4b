use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::link::{HybridBodyLink, LinkId};

/// Per-link handoff bookkeeping as of the last step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridLinkDiagnostics {
    pub link_id: LinkId,
    pub link: HybridBodyLink,
    pub enabled: bool,
    pub rejected_count: u64,
    pub last_position_error: f64,
    pub last_linear_velocity_error: f64,
    pub last_angular_velocity_error: f64,
    /// Simulation time of the last accepted handoff, 0 if none happened yet.
    pub last_handoff_time: f64,
}

/// Stage timings and counters for one coordinator step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridStepTelemetry {
    pub simulation_time: f64,
    pub dt: f64,
    pub orbital_step: Duration,
    pub general_step: Duration,
    pub handoff: Duration,
    pub link_count: usize,
    pub handoff_count: usize,
    pub rejected_handoffs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapabilityPolicy {
    /// Record the capability check but never fail construction.
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridCapabilityReport {
    pub policy: CapabilityPolicy,
    pub general_rigid_bodies: bool,
    pub orbital_n_body: bool,
    pub passed: bool,
    pub message: String,
}
