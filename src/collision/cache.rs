use std::collections::HashMap;

use super::{
    manifold::{ContactManifold3D, WarmStartImpulse},
    pair::{CollisionHandle, CollisionPair},
};

#[derive(Debug, Clone)]
struct CacheEntry {
    manifold: ContactManifold3D,
    last_updated_frame: u64,
    warm_start: WarmStartImpulse,
}

/// Frame-indexed store of the latest manifold and warm-start impulse per pair.
#[derive(Debug, Clone)]
pub struct ManifoldCache3D<T> {
    entries: HashMap<CollisionPair<T>, CacheEntry>,
    frame_index: u64,
}

impl<T: CollisionHandle> Default for ManifoldCache3D<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollisionHandle> ManifoldCache3D<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            frame_index: 0,
        }
    }

    /// Stores `manifold` for the current frame, keeping any warm start already cached.
    pub fn put(&mut self, pair: CollisionPair<T>, manifold: ContactManifold3D) {
        let frame = self.frame_index;
        self.entries
            .entry(pair)
            .and_modify(|entry| {
                entry.manifold = manifold.clone();
                entry.last_updated_frame = frame;
            })
            .or_insert_with(|| CacheEntry {
                manifold,
                last_updated_frame: frame,
                warm_start: WarmStartImpulse::ZERO,
            });
    }

    pub fn get(&self, pair: &CollisionPair<T>) -> Option<&ContactManifold3D> {
        self.entries.get(pair).map(|entry| &entry.manifold)
    }

    pub fn get_warm_start(&self, pair: &CollisionPair<T>) -> Option<WarmStartImpulse> {
        self.entries.get(pair).map(|entry| entry.warm_start)
    }

    /// Replaces the cached impulse; pairs without an entry are ignored.
    pub fn set_warm_start(&mut self, pair: &CollisionPair<T>, impulse: WarmStartImpulse) {
        if let Some(entry) = self.entries.get_mut(pair) {
            entry.warm_start = impulse;
        }
    }

    /// Frame in which `pair` was last stored.
    pub fn last_updated_frame(&self, pair: &CollisionPair<T>) -> Option<u64> {
        self.entries.get(pair).map(|entry| entry.last_updated_frame)
    }

    /// Advances the frame counter. Call once per world update, before pruning.
    pub fn next_frame(&mut self) {
        self.frame_index += 1;
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Drops entries older than `max_age` frames; `0` keeps only the current frame.
    pub fn prune_stale(&mut self, max_age: u64) -> usize {
        let frame = self.frame_index;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| frame - entry.last_updated_frame <= max_age);
        before - self.entries.len()
    }

    pub fn remove(&mut self, pair: &CollisionPair<T>) -> bool {
        self.entries.remove(pair).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
