use std::collections::HashSet;

use crate::core::filter::CollisionFilter;

use super::pair::{CollisionHandle, CollisionPair};

/// Candidate pair that passed layer/mask filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilteredCollisionPair<T> {
    pub pair: CollisionPair<T>,
    pub response_enabled: bool,
}

/// Keeps pairs whose filters can interact and tags whether a physical response applies.
/// Missing filters fall back to [`CollisionFilter::default`].
pub fn filter_pairs<T, F>(
    candidates: &HashSet<CollisionPair<T>>,
    filter_of: F,
) -> HashSet<FilteredCollisionPair<T>>
where
    T: CollisionHandle,
    F: Fn(T) -> Option<CollisionFilter>,
{
    candidates
        .iter()
        .filter_map(|pair| {
            let a = filter_of(pair.first()).unwrap_or_default();
            let b = filter_of(pair.second()).unwrap_or_default();
            a.can_interact(&b).then(|| FilteredCollisionPair {
                pair: *pair,
                response_enabled: a.response_enabled(&b),
            })
        })
        .collect()
}
