use super::{
    error::PhysicsError,
    model::{
        BodyHandle, ConstraintHandle, PhysicsBodyDefinition, PhysicsBodyState,
        PhysicsCapabilities, PhysicsConstraintDefinition, RuntimeTuning,
    },
};

/// Contract a physics backend exposes to the hybrid coordinator.
///
/// Implementations own their bodies outright; the coordinator only reads and writes
/// [`PhysicsBodyState`] through handles it was given at registration time.
pub trait PhysicsWorld {
    fn create_body(&mut self, definition: PhysicsBodyDefinition)
        -> Result<BodyHandle, PhysicsError>;

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError>;

    /// Live handles in ascending order.
    fn bodies(&self) -> Vec<BodyHandle>;

    fn contains_body(&self, handle: BodyHandle) -> bool {
        self.body_state(handle).is_some()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<PhysicsBodyState>;

    fn set_body_state(
        &mut self,
        handle: BodyHandle,
        state: PhysicsBodyState,
    ) -> Result<(), PhysicsError>;

    fn create_constraint(
        &mut self,
        definition: PhysicsConstraintDefinition,
    ) -> Result<ConstraintHandle, PhysicsError>;

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError>;

    fn constraints(&self) -> Vec<ConstraintHandle>;

    fn runtime_tuning(&self) -> RuntimeTuning;

    fn set_runtime_tuning(&mut self, tuning: RuntimeTuning) -> Result<(), PhysicsError>;

    /// Advances the world by `dt` seconds.
    fn step(&mut self, dt: f64) -> Result<(), PhysicsError>;

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities::EMPTY
    }

    /// Releases backend resources; later calls may fail with [`PhysicsError::Closed`].
    fn close(&mut self) {}
}
