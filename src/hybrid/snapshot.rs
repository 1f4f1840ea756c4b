use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::model::{BodyHandle, PhysicsBodyState};

/// Immutable capture of both worlds after one coordinator step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSnapshot {
    simulation_time: f64,
    interpolation_alpha: f64,
    extrapolation: f64,
    general_states: BTreeMap<BodyHandle, PhysicsBodyState>,
    orbital_states: BTreeMap<BodyHandle, PhysicsBodyState>,
}

impl HybridSnapshot {
    pub fn new(
        simulation_time: f64,
        interpolation_alpha: f64,
        extrapolation: f64,
        general_states: BTreeMap<BodyHandle, PhysicsBodyState>,
        orbital_states: BTreeMap<BodyHandle, PhysicsBodyState>,
    ) -> Self {
        Self {
            simulation_time,
            interpolation_alpha,
            extrapolation,
            general_states,
            orbital_states,
        }
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn interpolation_alpha(&self) -> f64 {
        self.interpolation_alpha
    }

    pub fn extrapolation(&self) -> f64 {
        self.extrapolation
    }

    pub fn general_states(&self) -> &BTreeMap<BodyHandle, PhysicsBodyState> {
        &self.general_states
    }

    pub fn orbital_states(&self) -> &BTreeMap<BodyHandle, PhysicsBodyState> {
        &self.orbital_states
    }

    pub fn general_state(&self, handle: BodyHandle) -> Option<&PhysicsBodyState> {
        self.general_states.get(&handle)
    }

    pub fn orbital_state(&self, handle: BodyHandle) -> Option<&PhysicsBodyState> {
        self.orbital_states.get(&handle)
    }

    /// Same states, new render metadata.
    pub(crate) fn with_render_metadata(&self, interpolation_alpha: f64, extrapolation: f64) -> Self {
        Self {
            interpolation_alpha,
            extrapolation,
            ..self.clone()
        }
    }
}

type SnapshotSlot = Arc<RwLock<Option<Arc<HybridSnapshot>>>>;

/// Cloneable read handle on the most recently published snapshot.
///
/// Readers only ever see whole snapshots; the lock is held just long enough to clone the `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    slot: SnapshotSlot,
}

impl SnapshotReader {
    pub fn latest(&self) -> Option<Arc<HybridSnapshot>> {
        self.slot.read().clone()
    }
}

/// Single-writer side of the published snapshot slot.
#[derive(Debug, Default)]
pub(crate) struct SnapshotPublisher {
    slot: SnapshotSlot,
}

impl SnapshotPublisher {
    pub(crate) fn publish(&self, snapshot: HybridSnapshot) -> Arc<HybridSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.slot.write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub(crate) fn latest(&self) -> Option<Arc<HybridSnapshot>> {
        self.slot.read().clone()
    }

    pub(crate) fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// In-memory recording of published snapshots, replayed in recording order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRecorder {
    snapshots: Vec<Arc<HybridSnapshot>>,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, snapshot: Arc<HybridSnapshot>) {
        self.snapshots.push(snapshot);
    }

    pub fn replay<F>(&self, mut visit: F)
    where
        F: FnMut(&HybridSnapshot),
    {
        for snapshot in &self.snapshots {
            visit(snapshot);
        }
    }

    /// Owned copies, ready for [`snapshot_io::write`](super::snapshot_io::write).
    pub fn to_vec(&self) -> Vec<HybridSnapshot> {
        self.snapshots.iter().map(|s| HybridSnapshot::clone(s)).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
