use serde::{Deserialize, Serialize};

/// Whether a collider pushes back or only reports overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CollisionKind {
    #[default]
    Solid,
    Trigger,
}

/// Layer/mask collision filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub layer: u32,
    pub mask: u32,
    pub kind: CollisionKind,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            layer: 1,
            mask: u32::MAX,
            kind: CollisionKind::Solid,
        }
    }
}

impl CollisionFilter {
    pub fn new(layer: u32, mask: u32, kind: CollisionKind) -> Self {
        Self { layer, mask, kind }
    }

    pub fn solid(layer: u32, mask: u32) -> Self {
        Self::new(layer, mask, CollisionKind::Solid)
    }

    pub fn trigger(layer: u32, mask: u32) -> Self {
        Self::new(layer, mask, CollisionKind::Trigger)
    }

    /// Each side must accept the other's layer.
    pub fn can_interact(&self, other: &CollisionFilter) -> bool {
        (self.mask & other.layer) != 0 && (other.mask & self.layer) != 0
    }

    /// Only solid-vs-solid pairs receive a physical response.
    pub fn response_enabled(&self, other: &CollisionFilter) -> bool {
        self.kind == CollisionKind::Solid && other.kind == CollisionKind::Solid
    }
}
