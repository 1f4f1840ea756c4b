use glam::DVec3;

/// Read/write access to the rigid-body state the solver needs, keyed by an opaque handle.
///
/// The collision core never owns bodies. Callers keep them in whatever storage suits them
/// (an arena, an ECS, a foreign engine) and expose them through this trait.
pub trait RigidBodyAdapter3D<T> {
    fn position(&self, body: T) -> DVec3;
    fn set_position(&mut self, body: T, position: DVec3);
    fn velocity(&self, body: T) -> DVec3;
    fn set_velocity(&mut self, body: T, velocity: DVec3);
    /// `0.0` marks a static or kinematic body.
    fn inverse_mass(&self, body: T) -> f64;
    fn restitution(&self, body: T) -> f64;
    fn friction(&self, body: T) -> f64;
}

/// Reads a scalar from the adapter, panicking when the caller handed us garbage.
pub(crate) fn finite_scalar(value: f64, what: &str) -> f64 {
    assert!(value.is_finite(), "rigid body adapter returned non-finite {what}: {value}");
    value
}

pub(crate) fn finite_vector(value: DVec3, what: &str) -> DVec3 {
    assert!(value.is_finite(), "rigid body adapter returned non-finite {what}: {value}");
    value
}

/// Inverse mass clamped to `>= 0`.
pub(crate) fn checked_inverse_mass<T, A>(bodies: &A, body: T) -> f64
where
    A: RigidBodyAdapter3D<T> + ?Sized,
{
    finite_scalar(bodies.inverse_mass(body), "inverse mass").max(0.0)
}
