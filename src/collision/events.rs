use super::{
    manifold::ContactManifold3D,
    pair::{CollisionHandle, CollisionPair},
};

/// Lifecycle stage of a contact between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEventType {
    Enter,
    Stay,
    Exit,
}

/// One pair's status for one world update.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent<T> {
    pub pair: CollisionPair<T>,
    pub kind: CollisionEventType,
    pub response_enabled: bool,
    /// Current manifold, or the last known one for [`CollisionEventType::Exit`].
    pub manifold: ContactManifold3D,
}

impl<T: CollisionHandle> CollisionEvent<T> {
    pub fn new(
        pair: CollisionPair<T>,
        kind: CollisionEventType,
        response_enabled: bool,
        manifold: ContactManifold3D,
    ) -> Self {
        Self {
            pair,
            kind,
            response_enabled,
            manifold,
        }
    }

    /// Whether the solver should act on this event.
    pub fn is_resolvable(&self) -> bool {
        self.response_enabled && self.kind != CollisionEventType::Exit
    }
}
