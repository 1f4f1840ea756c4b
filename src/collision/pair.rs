use std::{fmt::Debug, hash::Hash};

/// Opaque body identity accepted by the collision pipeline.
pub trait CollisionHandle: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T> CollisionHandle for T where T: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

/// Unordered pair of bodies, stored in canonical `(min, max)` order.
///
/// Equality, hashing, and ordering are independent of construction order, so the
/// derived `Ord` doubles as the deterministic key used when applying responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair<T> {
    first: T,
    second: T,
}

impl<T: CollisionHandle> CollisionPair<T> {
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> T {
        self.first
    }

    pub fn second(&self) -> T {
        self.second
    }

    pub fn contains(&self, body: T) -> bool {
        self.first == body || self.second == body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn pair_identity_ignores_order() {
        let ab = CollisionPair::new(7_u32, 3);
        let ba = CollisionPair::new(3_u32, 7);
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), 3);

        let set: HashSet<_> = [ab, ba].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
