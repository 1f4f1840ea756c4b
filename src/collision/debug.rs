//! Per-frame capture of bounds and contact points for overlays and inspection.

use crate::core::bounds::Aabb;

use super::{
    events::{CollisionEvent, CollisionEventType},
    manifold::{CollisionManifold3D, ContactPoint3D},
    pair::{CollisionHandle, CollisionPair},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBounds<T> {
    pub item: T,
    pub bounds: Aabb,
}

/// One contact point of one event, flattened with the event's metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugContact<T> {
    pub pair: CollisionPair<T>,
    pub kind: CollisionEventType,
    pub response_enabled: bool,
    pub manifold: CollisionManifold3D,
    pub point: ContactPoint3D,
}

/// Bounds of every item plus every contact point reported in one update.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionDebugSnapshot3D<T> {
    items: Vec<ItemBounds<T>>,
    contacts: Vec<DebugContact<T>>,
}

impl<T: CollisionHandle> CollisionDebugSnapshot3D<T> {
    /// Items keep their input order; contacts follow event order, then point order.
    pub fn from<'a>(
        items: &[T],
        bounds: impl Fn(T) -> Aabb,
        events: impl IntoIterator<Item = &'a CollisionEvent<T>>,
    ) -> Self {
        let items = items
            .iter()
            .map(|&item| ItemBounds {
                item,
                bounds: bounds(item),
            })
            .collect();
        let contacts = events
            .into_iter()
            .flat_map(|event| {
                event.manifold.contacts().iter().map(move |&point| DebugContact {
                    pair: event.pair,
                    kind: event.kind,
                    response_enabled: event.response_enabled,
                    manifold: *event.manifold.manifold(),
                    point,
                })
            })
            .collect();
        Self { items, contacts }
    }

    pub fn items(&self) -> &[ItemBounds<T>] {
        &self.items
    }

    pub fn contacts(&self) -> &[DebugContact<T>] {
        &self.contacts
    }
}
