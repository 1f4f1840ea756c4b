use glam::DVec3;

use crate::{
    collision::{
        cache::ManifoldCache3D,
        events::CollisionEvent,
        manifold::{ContactManifold3D, WarmStartImpulse},
        pair::{CollisionHandle, CollisionPair},
    },
    config::{validate_correction_percent, validate_slop, ConfigError, SolverSettings},
    utils::math::{any_perpendicular, clamp01, NEAR_ZERO},
};

use super::adapter::{checked_inverse_mass, finite_scalar, finite_vector, RigidBodyAdapter3D};

const TANGENT_IMPULSE_EPSILON: f64 = 1e-12;

/// Reacts to the collision events produced by a world update.
pub trait CollisionResponder3D<T: CollisionHandle>: Send + Sync {
    fn resolve(&self, event: &CollisionEvent<T>, bodies: &mut dyn RigidBodyAdapter3D<T>);

    /// Handles one update's response-enabled events, already in canonical pair order.
    ///
    /// The default resolves each event once. Iterative responders override this to run
    /// `iterations` passes and to read/write warm-start impulses in `cache`.
    fn resolve_all(
        &self,
        events: &[CollisionEvent<T>],
        _iterations: u32,
        _cache: &mut ManifoldCache3D<T>,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) {
        for event in events {
            self.resolve(event, bodies);
        }
    }
}

/// Sequential-impulse contact solver: Baumgarte position correction followed by a
/// restitution + Coulomb friction velocity solve.
///
/// # Panics
///
/// Every solve panics when the adapter reports a non-finite position, velocity, inverse
/// mass, restitution, or friction. Corrupted body state is a caller bug and is never
/// clamped away.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactSolver3D {
    settings: SolverSettings,
}

impl ContactSolver3D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SolverSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> SolverSettings {
        self.settings
    }

    pub fn correction_percent(&self) -> f64 {
        self.settings.correction_percent
    }

    pub fn set_correction_percent(&mut self, value: f64) -> Result<(), ConfigError> {
        validate_correction_percent(value)?;
        self.settings.correction_percent = value;
        Ok(())
    }

    pub fn slop(&self) -> f64 {
        self.settings.slop
    }

    pub fn set_slop(&mut self, value: f64) -> Result<(), ConfigError> {
        validate_slop(value)?;
        self.settings.slop = value;
        Ok(())
    }

    /// One position pass followed by one velocity pass without warm starting.
    pub fn solve<T: CollisionHandle>(
        &self,
        pair: CollisionPair<T>,
        contact: &ContactManifold3D,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) {
        self.solve_position(pair, contact, bodies);
        self.solve_velocity(pair, contact, WarmStartImpulse::ZERO, bodies);
    }

    /// Pushes the bodies apart along the contact normal, weighted by inverse mass.
    ///
    /// Returns the separation applied; `0.0` when the depth is within slop or both
    /// bodies are immovable, in which case neither position is touched.
    pub fn solve_position<T: CollisionHandle>(
        &self,
        pair: CollisionPair<T>,
        contact: &ContactManifold3D,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) -> f64 {
        self.correct_position(pair, contact.normal(), contact.depth(), bodies)
    }

    /// Applies `warm_start`, then solves the normal and friction impulses.
    ///
    /// Returns the accumulated impulses to cache for the next frame.
    pub fn solve_velocity<T: CollisionHandle>(
        &self,
        pair: CollisionPair<T>,
        contact: &ContactManifold3D,
        warm_start: WarmStartImpulse,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) -> WarmStartImpulse {
        self.velocity_pass(pair, contact.normal(), warm_start, true, bodies)
    }

    fn correct_position<T: CollisionHandle>(
        &self,
        pair: CollisionPair<T>,
        normal: DVec3,
        depth: f64,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) -> f64 {
        let (a, b) = (pair.first(), pair.second());
        let inv_mass_a = checked_inverse_mass(&*bodies, a);
        let inv_mass_b = checked_inverse_mass(&*bodies, b);
        let inv_mass_sum = inv_mass_a + inv_mass_b;
        if inv_mass_sum <= 0.0 {
            return 0.0;
        }

        let separation = (depth - self.settings.slop).max(0.0) * self.settings.correction_percent;
        if separation <= 0.0 {
            return 0.0;
        }

        let correction = normal * (separation / inv_mass_sum);
        let position_a = finite_vector(bodies.position(a), "position");
        let position_b = finite_vector(bodies.position(b), "position");
        bodies.set_position(a, position_a - correction * inv_mass_a);
        bodies.set_position(b, position_b + correction * inv_mass_b);
        separation
    }

    /// `accumulated` is either a cached warm start (`apply_accumulated`) or the running
    /// total of an earlier pass in the same frame, which is already in the velocities.
    fn velocity_pass<T: CollisionHandle>(
        &self,
        pair: CollisionPair<T>,
        normal: DVec3,
        accumulated: WarmStartImpulse,
        apply_accumulated: bool,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) -> WarmStartImpulse {
        let (a, b) = (pair.first(), pair.second());
        let inv_mass_a = checked_inverse_mass(&*bodies, a);
        let inv_mass_b = checked_inverse_mass(&*bodies, b);
        let inv_mass_sum = inv_mass_a + inv_mass_b;
        if inv_mass_sum <= 0.0 {
            return WarmStartImpulse::ZERO;
        }

        let mut velocity_a = finite_vector(bodies.velocity(a), "velocity");
        let mut velocity_b = finite_vector(bodies.velocity(b), "velocity");
        let mut normal_total = accumulated.normal_impulse();
        let mut tangent_total = accumulated.tangent_impulse();

        if apply_accumulated && (normal_total != 0.0 || tangent_total != 0.0) {
            let tangent = tangent_direction(velocity_b - velocity_a, normal);
            let impulse = normal * normal_total + tangent * tangent_total;
            velocity_a -= impulse * inv_mass_a;
            velocity_b += impulse * inv_mass_b;
        }

        // A separating contact keeps its totals; later passes must not pull it back.
        let velocity_along_normal = (velocity_b - velocity_a).dot(normal);
        if velocity_along_normal > 0.0 {
            bodies.set_velocity(a, velocity_a);
            bodies.set_velocity(b, velocity_b);
            return WarmStartImpulse::from_finite(normal_total, tangent_total);
        }
        let restitution = clamp01(finite_scalar(bodies.restitution(a), "restitution"))
            .min(clamp01(finite_scalar(bodies.restitution(b), "restitution")));
        let lambda = -(1.0 + restitution) * velocity_along_normal / inv_mass_sum;
        let new_normal_total = (normal_total + lambda).max(0.0);
        let normal_delta = new_normal_total - normal_total;
        normal_total = new_normal_total;
        velocity_a -= normal * (normal_delta * inv_mass_a);
        velocity_b += normal * (normal_delta * inv_mass_b);

        let relative = velocity_b - velocity_a;
        let tangent = tangent_direction(relative, normal);
        let lambda_tangent = -relative.dot(tangent) / inv_mass_sum;
        let friction = (finite_scalar(bodies.friction(a), "friction").max(0.0)
            * finite_scalar(bodies.friction(b), "friction").max(0.0))
        .sqrt();
        let max_friction = normal_total * friction;
        let clamped = (tangent_total + lambda_tangent).clamp(-max_friction, max_friction);
        let tangent_delta = clamped - tangent_total;
        tangent_total = clamped;
        if tangent_delta.abs() > TANGENT_IMPULSE_EPSILON {
            let friction_impulse = tangent * tangent_delta;
            velocity_a -= friction_impulse * inv_mass_a;
            velocity_b += friction_impulse * inv_mass_b;
        }

        bodies.set_velocity(a, velocity_a);
        bodies.set_velocity(b, velocity_b);
        WarmStartImpulse::from_finite(normal_total, tangent_total)
    }
}

impl<T: CollisionHandle> CollisionResponder3D<T> for ContactSolver3D {
    fn resolve(&self, event: &CollisionEvent<T>, bodies: &mut dyn RigidBodyAdapter3D<T>) {
        if event.is_resolvable() {
            self.solve(event.pair, &event.manifold, bodies);
        }
    }

    /// Runs every position pass first, then the velocity passes. Pass 0 applies the
    /// cached warm start; later passes refine the running totals, and the final totals
    /// are written back to `cache`.
    fn resolve_all(
        &self,
        events: &[CollisionEvent<T>],
        iterations: u32,
        cache: &mut ManifoldCache3D<T>,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) {
        let events: Vec<&CollisionEvent<T>> =
            events.iter().filter(|event| event.is_resolvable()).collect();
        if events.is_empty() {
            return;
        }

        let mut remaining: Vec<f64> = events.iter().map(|event| event.manifold.depth()).collect();
        for _ in 0..iterations {
            for (event, depth) in events.iter().zip(remaining.iter_mut()) {
                let applied =
                    self.correct_position(event.pair, event.manifold.normal(), *depth, bodies);
                *depth = (*depth - applied).max(0.0);
            }
        }

        let mut totals: Vec<WarmStartImpulse> = events
            .iter()
            .map(|event| cache.get_warm_start(&event.pair).unwrap_or_default())
            .collect();
        for iteration in 0..iterations {
            for (event, total) in events.iter().zip(totals.iter_mut()) {
                *total = self.velocity_pass(
                    event.pair,
                    event.manifold.normal(),
                    *total,
                    iteration == 0,
                    bodies,
                );
            }
        }

        for (event, total) in events.iter().zip(totals) {
            cache.set_warm_start(&event.pair, total);
        }
    }
}

fn tangent_direction(relative_velocity: DVec3, normal: DVec3) -> DVec3 {
    let tangent = relative_velocity - normal * relative_velocity.dot(normal);
    let length = tangent.length();
    if length > NEAR_ZERO {
        tangent / length
    } else {
        any_perpendicular(normal)
    }
}
