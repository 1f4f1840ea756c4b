use crate::{
    collision::{contact::ContactGenerator3D, manifold::ContactManifold3D, pair::CollisionHandle},
    core::{bounds::Aabb, filter::CollisionFilter},
};

/// Geometry and filtering the collision world reads for each body handle.
///
/// `Sync` so the narrow phase can fan out across threads.
pub trait CollisionSource3D<T: CollisionHandle>: Sync {
    fn bounds(&self, body: T) -> Aabb;

    /// `None` falls back to [`CollisionFilter::default`].
    fn collision_filter(&self, _body: T) -> Option<CollisionFilter> {
        None
    }

    /// Narrow phase for one candidate pair. Defaults to box-vs-box on the bounds.
    fn contact(&self, a: T, b: T) -> Option<ContactManifold3D> {
        ContactGenerator3D::aabb(&self.bounds(a), &self.bounds(b))
    }
}
