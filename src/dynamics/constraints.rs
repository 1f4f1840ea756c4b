use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    collision::pair::CollisionHandle,
    core::error::{ensure_finite, GeometryError},
};

use super::adapter::{checked_inverse_mass, finite_vector, RigidBodyAdapter3D};

const DISTANCE_EPSILON: f64 = 1e-9;

/// Positional constraint solved against the caller's bodies once per constraint pass.
pub trait Constraint3D<T>: Send + Sync {
    fn solve(&self, bodies: &mut dyn RigidBodyAdapter3D<T>, dt: f64);
}

/// Pulls two bodies toward `target_distance`, splitting the correction by inverse mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint3D<T> {
    body_a: T,
    body_b: T,
    target_distance: f64,
    stiffness: f64,
}

impl<T: CollisionHandle> DistanceConstraint3D<T> {
    /// `stiffness` is the fraction of the error removed per pass, in `[0, 1]`.
    pub fn new(
        body_a: T,
        body_b: T,
        target_distance: f64,
        stiffness: f64,
    ) -> Result<Self, GeometryError> {
        let target_distance = ensure_finite(target_distance, "target distance")?;
        if target_distance < 0.0 {
            return Err(GeometryError::Negative("target distance"));
        }
        let stiffness = ensure_finite(stiffness, "stiffness")?;
        if !(0.0..=1.0).contains(&stiffness) {
            return Err(GeometryError::OutOfUnitRange("stiffness"));
        }
        Ok(Self {
            body_a,
            body_b,
            target_distance,
            stiffness,
        })
    }

    pub fn bodies(&self) -> (T, T) {
        (self.body_a, self.body_b)
    }

    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }
}

impl<T: CollisionHandle> Constraint3D<T> for DistanceConstraint3D<T> {
    fn solve(&self, bodies: &mut dyn RigidBodyAdapter3D<T>, _dt: f64) {
        let position_a = finite_vector(bodies.position(self.body_a), "position");
        let position_b = finite_vector(bodies.position(self.body_b), "position");
        let delta = position_b - position_a;
        let distance = delta.length();
        if distance <= DISTANCE_EPSILON {
            return;
        }

        let inv_mass_a = checked_inverse_mass(&*bodies, self.body_a);
        let inv_mass_b = checked_inverse_mass(&*bodies, self.body_b);
        let inv_mass_sum = inv_mass_a + inv_mass_b;
        if inv_mass_sum <= 0.0 {
            return;
        }

        let error = distance - self.target_distance;
        if error.abs() <= DISTANCE_EPSILON {
            return;
        }

        let correction = delta / distance * (error * self.stiffness);
        bodies.set_position(
            self.body_a,
            position_a + correction * (inv_mass_a / inv_mass_sum),
        );
        bodies.set_position(
            self.body_b,
            position_b - correction * (inv_mass_b / inv_mass_sum),
        );
    }
}

type ConstraintList<T> = Arc<Vec<Arc<dyn Constraint3D<T>>>>;

/// Copy-on-write constraint list shared between the stepping thread and registrants.
///
/// Writers clone the list and swap it in; `snapshot` hands out the current list without
/// holding the lock while constraints are solved.
pub struct ConstraintRegistry<T> {
    inner: Arc<RwLock<ConstraintList<T>>>,
}

impl<T> Clone for ConstraintRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ConstraintRegistry<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(Vec::new()))),
        }
    }
}

impl<T> std::fmt::Debug for ConstraintRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> ConstraintRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, constraint: Arc<dyn Constraint3D<T>>) {
        let mut guard = self.inner.write();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(constraint);
        *guard = Arc::new(next);
    }

    /// Removes `constraint` by identity.
    pub fn remove(&self, constraint: &Arc<dyn Constraint3D<T>>) -> bool {
        let mut guard = self.inner.write();
        let before = guard.len();
        let next: Vec<_> = guard
            .iter()
            .filter(|existing| !Arc::ptr_eq(existing, constraint))
            .cloned()
            .collect();
        let removed = next.len() != before;
        if removed {
            *guard = Arc::new(next);
        }
        removed
    }

    pub fn clear(&self) {
        *self.inner.write() = Arc::new(Vec::new());
    }

    pub fn snapshot(&self) -> ConstraintList<T> {
        Arc::clone(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    struct Points {
        positions: Vec<DVec3>,
        inverse_masses: Vec<f64>,
    }

    impl RigidBodyAdapter3D<usize> for Points {
        fn position(&self, body: usize) -> DVec3 {
            self.positions[body]
        }
        fn set_position(&mut self, body: usize, position: DVec3) {
            self.positions[body] = position;
        }
        fn velocity(&self, _body: usize) -> DVec3 {
            DVec3::ZERO
        }
        fn set_velocity(&mut self, _body: usize, _velocity: DVec3) {}
        fn inverse_mass(&self, body: usize) -> f64 {
            self.inverse_masses[body]
        }
        fn restitution(&self, _body: usize) -> f64 {
            0.0
        }
        fn friction(&self, _body: usize) -> f64 {
            0.0
        }
    }

    #[test]
    fn stiff_constraint_restores_target_distance() {
        let mut points = Points {
            positions: vec![DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)],
            inverse_masses: vec![1.0, 1.0],
        };
        let constraint = DistanceConstraint3D::new(0, 1, 2.0, 1.0).unwrap();
        constraint.solve(&mut points, 1.0 / 60.0);

        assert_eq!(points.positions[0], DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(points.positions[1], DVec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn static_anchor_does_not_move() {
        let mut points = Points {
            positions: vec![DVec3::ZERO, DVec3::new(0.0, -3.0, 0.0)],
            inverse_masses: vec![0.0, 1.0],
        };
        let constraint = DistanceConstraint3D::new(0, 1, 1.0, 0.5).unwrap();
        constraint.solve(&mut points, 1.0 / 60.0);

        assert_eq!(points.positions[0], DVec3::ZERO);
        assert!((points.positions[1].y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(DistanceConstraint3D::new(0_usize, 1, -1.0, 0.5).is_err());
        assert!(DistanceConstraint3D::new(0_usize, 1, 1.0, 1.5).is_err());
        assert!(DistanceConstraint3D::new(0_usize, 1, f64::INFINITY, 0.5).is_err());
    }

    #[test]
    fn registry_is_copy_on_write() {
        let registry: ConstraintRegistry<usize> = ConstraintRegistry::new();
        let first: Arc<dyn Constraint3D<usize>> =
            Arc::new(DistanceConstraint3D::new(0, 1, 1.0, 1.0).unwrap());
        registry.add(Arc::clone(&first));
        let before = registry.snapshot();

        registry.add(Arc::new(DistanceConstraint3D::new(1, 2, 1.0, 1.0).unwrap()));

        assert_eq!(before.len(), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(&first));
        assert!(!registry.remove(&first));
        assert_eq!(registry.len(), 1);
    }
}
