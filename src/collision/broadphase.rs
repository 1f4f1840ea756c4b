use std::collections::{HashMap, HashSet};

use crate::core::{bounds::Aabb, error::GeometryError};

use super::pair::{CollisionHandle, CollisionPair};

/// Candidate-pair finder. Implementations may report false positives but never
/// miss a pair whose bounds touch.
pub trait BroadPhase3D<T: CollisionHandle>: Send + Sync {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds: &dyn Fn(T) -> Aabb,
    ) -> HashSet<CollisionPair<T>>;
}

/// Axis swept by [`SweepAndPrune3D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepAxis {
    #[default]
    X,
    Y,
    Z,
}

impl SweepAxis {
    fn interval(self, aabb: &Aabb) -> (f64, f64) {
        match self {
            SweepAxis::X => (aabb.min().x, aabb.max().x),
            SweepAxis::Y => (aabb.min().y, aabb.max().y),
            SweepAxis::Z => (aabb.min().z, aabb.max().z),
        }
    }
}

/// Single-axis sweep and prune.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepAndPrune3D {
    axis: SweepAxis,
}

impl SweepAndPrune3D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn along(axis: SweepAxis) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> SweepAxis {
        self.axis
    }
}

impl<T: CollisionHandle> BroadPhase3D<T> for SweepAndPrune3D {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds: &dyn Fn(T) -> Aabb,
    ) -> HashSet<CollisionPair<T>> {
        let mut entries: Vec<(f64, f64, T)> = items
            .iter()
            .map(|&item| {
                let (min, max) = self.axis.interval(&bounds(item));
                (min, max, item)
            })
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.2.cmp(&b.2)));

        let mut pairs = HashSet::new();
        let mut active: Vec<(f64, T)> = Vec::new();
        for (min, max, item) in entries {
            active.retain(|(active_max, _)| *active_max >= min);
            for &(_, other) in &active {
                if other != item {
                    pairs.insert(CollisionPair::new(other, item));
                }
            }
            active.push((max, item));
        }
        pairs
    }
}

/// All-pairs reference implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce3D;

impl<T: CollisionHandle> BroadPhase3D<T> for BruteForce3D {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds: &dyn Fn(T) -> Aabb,
    ) -> HashSet<CollisionPair<T>> {
        let boxes: Vec<Aabb> = items.iter().map(|&item| bounds(item)).collect();
        let mut pairs = HashSet::new();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if items[i] != items[j] && boxes[i].intersects(&boxes[j]) {
                    pairs.insert(CollisionPair::new(items[i], items[j]));
                }
            }
        }
        pairs
    }
}

type Cell = (i64, i64, i64);

/// Uniform-grid broad phase. Every item is bucketed into each cell its bounds
/// cover, and items sharing a bucket become candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHash3D {
    cell_size: f64,
}

impl SpatialHash3D {
    pub fn new(cell_size: f64) -> Result<Self, GeometryError> {
        if !cell_size.is_finite() {
            return Err(GeometryError::NonFinite("cell size"));
        }
        if cell_size <= 0.0 {
            return Err(GeometryError::NonPositive("cell size"));
        }
        Ok(Self { cell_size })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn cell(&self, coordinate: f64) -> i64 {
        (coordinate / self.cell_size).floor() as i64
    }

    fn cell_range(&self, aabb: &Aabb) -> (Cell, Cell) {
        let (min, max) = (aabb.min(), aabb.max());
        (
            (self.cell(min.x), self.cell(min.y), self.cell(min.z)),
            (self.cell(max.x), self.cell(max.y), self.cell(max.z)),
        )
    }
}

impl<T: CollisionHandle> BroadPhase3D<T> for SpatialHash3D {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds: &dyn Fn(T) -> Aabb,
    ) -> HashSet<CollisionPair<T>> {
        let mut grid: HashMap<Cell, Vec<T>> = HashMap::new();
        for &item in items {
            let (low, high) = self.cell_range(&bounds(item));
            for x in low.0..=high.0 {
                for y in low.1..=high.1 {
                    for z in low.2..=high.2 {
                        grid.entry((x, y, z)).or_default().push(item);
                    }
                }
            }
        }

        let mut pairs = HashSet::new();
        for bucket in grid.values() {
            for (i, &first) in bucket.iter().enumerate() {
                for &second in &bucket[i + 1..] {
                    if first != second {
                        pairs.insert(CollisionPair::new(first, second));
                    }
                }
            }
        }
        pairs
    }
}
