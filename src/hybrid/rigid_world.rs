use std::{collections::BTreeMap, sync::Arc};

use glam::{DQuat, DVec3};
use log::debug;

use crate::{
    collision::{
        broadphase::SweepAndPrune3D,
        contact::ContactGenerator3D,
        events::{CollisionEvent, CollisionEventType},
        manifold::ContactManifold3D,
    },
    config::{validate_time_step, WorldSettings},
    core::bounds::{Aabb, BoundingSphere},
    dynamics::{
        adapter::RigidBodyAdapter3D,
        constraints::{Constraint3D, DistanceConstraint3D},
    },
    utils::allocator::{Arena, EntityId},
    world::{CollisionSource3D, CollisionWorld3D},
};

use super::{
    error::PhysicsError,
    model::{
        BodyHandle, CollisionShape, ConstraintHandle, ConstraintKind, PhysicsBodyDefinition,
        PhysicsBodyState, PhysicsBodyType, PhysicsCapabilities, PhysicsConstraintDefinition,
        RuntimeTuning,
    },
    world::PhysicsWorld,
};

/// Friction coefficient standing in for unbounded friction.
const UNBOUNDED_FRICTION: f64 = 1.0e6;

#[derive(Debug, Clone)]
struct BodyRecord {
    handle: BodyHandle,
    body_type: PhysicsBodyType,
    inverse_mass: f64,
    shape: CollisionShape,
    state: PhysicsBodyState,
    bounds: Aabb,
}

fn shape_bounds(shape: &CollisionShape, position: DVec3) -> Result<Aabb, PhysicsError> {
    Ok(Aabb::from_center_half_extents(
        position,
        shape.half_extents(),
    )?)
}

/// Body storage the collision world reads and the contact solver writes.
///
/// Reads index the arena directly: the collision world only ever sees ids from
/// [`BodyStore::ids`], so a missing body is a broken invariant and panics.
#[derive(Default)]
struct BodyStore {
    arena: Arena<BodyRecord>,
    restitution: f64,
    friction: f64,
}

impl BodyStore {
    fn ids(&self) -> Vec<EntityId> {
        self.arena.ids().collect()
    }

    fn sphere(&self, id: EntityId) -> Option<BoundingSphere> {
        let record = self.arena.get(id)?;
        match record.shape {
            CollisionShape::Sphere { radius } => {
                BoundingSphere::new(record.state.position, radius).ok()
            }
            _ => None,
        }
    }
}

impl CollisionSource3D<EntityId> for BodyStore {
    fn bounds(&self, body: EntityId) -> Aabb {
        self.arena[body].bounds
    }

    fn contact(&self, a: EntityId, b: EntityId) -> Option<ContactManifold3D> {
        match (self.sphere(a), self.sphere(b)) {
            (Some(sphere_a), Some(sphere_b)) => ContactGenerator3D::sphere(&sphere_a, &sphere_b),
            _ => ContactGenerator3D::aabb(&self.bounds(a), &self.bounds(b)),
        }
    }
}

impl RigidBodyAdapter3D<EntityId> for BodyStore {
    fn position(&self, body: EntityId) -> DVec3 {
        self.arena[body].state.position
    }

    fn set_position(&mut self, body: EntityId, position: DVec3) {
        if let Some(record) = self.arena.get_mut(body) {
            record.state.position = position;
            // Non-finite positions keep the last valid bounds.
            if let Ok(bounds) = shape_bounds(&record.shape, position) {
                record.bounds = bounds;
            }
        }
    }

    fn velocity(&self, body: EntityId) -> DVec3 {
        self.arena[body].state.linear_velocity
    }

    fn set_velocity(&mut self, body: EntityId, velocity: DVec3) {
        if let Some(record) = self.arena.get_mut(body) {
            record.state.linear_velocity = velocity;
        }
    }

    fn inverse_mass(&self, body: EntityId) -> f64 {
        self.arena[body].inverse_mass
    }

    fn restitution(&self, _body: EntityId) -> f64 {
        self.restitution
    }

    fn friction(&self, _body: EntityId) -> f64 {
        self.friction
    }
}

struct ConstraintRecord {
    definition: PhysicsConstraintDefinition,
    constraint: Arc<dyn Constraint3D<EntityId>>,
}

/// Discrete rigid-body backend for the hybrid coordinator, driven by [`CollisionWorld3D`].
///
/// Boxes and capsules collide through their axis-aligned bounds; sphere pairs use exact
/// sphere contacts. Ball and fixed joints become stiff distance constraints holding the
/// distance the bodies had when the joint was created.
pub struct RigidBodyWorld {
    world: CollisionWorld3D<EntityId>,
    store: BodyStore,
    handles: BTreeMap<BodyHandle, EntityId>,
    constraints: BTreeMap<ConstraintHandle, ConstraintRecord>,
    tuning: RuntimeTuning,
    next_body: u64,
    next_constraint: u64,
    time: f64,
    last_contacts: Vec<(BodyHandle, BodyHandle, CollisionEventType)>,
    closed: bool,
}

impl RigidBodyWorld {
    pub fn new() -> Result<Self, PhysicsError> {
        Self::with_settings(WorldSettings::default())
    }

    /// Solver iterations in `settings` seed the runtime tuning; the other tuning values
    /// start at their defaults.
    pub fn with_settings(settings: WorldSettings) -> Result<Self, PhysicsError> {
        let tuning = RuntimeTuning {
            solver_iterations: settings.solver_iterations,
            ..RuntimeTuning::default()
        };
        let world = CollisionWorld3D::with_settings(SweepAndPrune3D::new(), settings)?;
        let mut rigid = Self {
            world,
            store: BodyStore::default(),
            handles: BTreeMap::new(),
            constraints: BTreeMap::new(),
            tuning,
            next_body: 1,
            next_constraint: 1,
            time: 0.0,
            last_contacts: Vec::new(),
            closed: false,
        };
        rigid.set_runtime_tuning(tuning)?;
        Ok(rigid)
    }

    pub fn gravity(&self) -> DVec3 {
        self.world.gravity()
    }

    pub fn set_gravity(&mut self, gravity: DVec3) -> Result<(), PhysicsError> {
        Ok(self.world.set_gravity(gravity)?)
    }

    pub fn set_constraint_iterations(&mut self, iterations: u32) -> Result<(), PhysicsError> {
        Ok(self.world.set_constraint_iterations(iterations)?)
    }

    /// Runs the narrow phase on the rayon pool when the `parallel` feature is on.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.world.set_parallel_enabled(enabled);
    }

    pub fn collision_world(&self) -> &CollisionWorld3D<EntityId> {
        &self.world
    }

    pub fn simulation_time(&self) -> f64 {
        self.time
    }

    /// Contact events from the last step, in canonical pair order.
    pub fn last_contacts(&self) -> &[(BodyHandle, BodyHandle, CollisionEventType)] {
        &self.last_contacts
    }

    pub fn constraint_definition(
        &self,
        handle: ConstraintHandle,
    ) -> Option<PhysicsConstraintDefinition> {
        self.constraints.get(&handle).map(|record| record.definition)
    }

    fn ensure_open(&self) -> Result<(), PhysicsError> {
        if self.closed {
            Err(PhysicsError::Closed)
        } else {
            Ok(())
        }
    }

    fn entity(&self, handle: BodyHandle) -> Result<EntityId, PhysicsError> {
        self.handles
            .get(&handle)
            .copied()
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn record(&self, handle: BodyHandle) -> Option<&BodyRecord> {
        self.handles
            .get(&handle)
            .and_then(|id| self.store.arena.get(*id))
    }

    fn contact_summary(
        &self,
        event: &CollisionEvent<EntityId>,
    ) -> Option<(BodyHandle, BodyHandle, CollisionEventType)> {
        let a = self.store.arena.get(event.pair.first())?.handle;
        let b = self.store.arena.get(event.pair.second())?.handle;
        Some((a, b, event.kind))
    }

    fn integrate_free_motion(&mut self, dt: f64) {
        for id in self.store.ids() {
            let Some(record) = self.store.arena.get_mut(id) else {
                continue;
            };
            if record.body_type == PhysicsBodyType::Static {
                continue;
            }
            let omega = record.state.angular_velocity;
            let omega_mag = omega.length();
            if omega_mag > 1e-9 {
                let delta = DQuat::from_axis_angle(omega / omega_mag, omega_mag * dt);
                record.state.orientation = (delta * record.state.orientation).normalize();
            }
            if record.body_type == PhysicsBodyType::Kinematic {
                let position = record.state.position + record.state.linear_velocity * dt;
                self.store.set_position(id, position);
            }
        }
    }
}

impl PhysicsWorld for RigidBodyWorld {
    fn create_body(
        &mut self,
        definition: PhysicsBodyDefinition,
    ) -> Result<BodyHandle, PhysicsError> {
        self.ensure_open()?;
        let state = definition.initial_state();
        let shape = definition.shape();
        let bounds = shape_bounds(&shape, state.position)?;
        let inverse_mass = match definition.body_type() {
            PhysicsBodyType::Dynamic => 1.0 / definition.mass(),
            PhysicsBodyType::Static | PhysicsBodyType::Kinematic => 0.0,
        };

        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        let id = self.store.arena.insert(BodyRecord {
            handle,
            body_type: definition.body_type(),
            inverse_mass,
            shape,
            state,
            bounds,
        });
        self.handles.insert(handle, id);
        Ok(handle)
    }

    /// Also removes every constraint attached to the body.
    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let id = self.entity(handle)?;
        let attached: Vec<ConstraintHandle> = self
            .constraints
            .iter()
            .filter(|(_, record)| {
                record.definition.body_a == handle || record.definition.body_b == handle
            })
            .map(|(constraint, _)| *constraint)
            .collect();
        for constraint in attached {
            self.remove_constraint(constraint)?;
        }
        self.handles.remove(&handle);
        self.store.arena.remove(id);
        Ok(())
    }

    fn bodies(&self) -> Vec<BodyHandle> {
        self.handles.keys().copied().collect()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<PhysicsBodyState> {
        self.record(handle).map(|record| record.state)
    }

    fn set_body_state(
        &mut self,
        handle: BodyHandle,
        state: PhysicsBodyState,
    ) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        state.validate()?;
        let id = self.entity(handle)?;
        let record = self
            .store
            .arena
            .get_mut(id)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        record.bounds = shape_bounds(&record.shape, state.position)?;
        record.state = state;
        Ok(())
    }

    fn create_constraint(
        &mut self,
        definition: PhysicsConstraintDefinition,
    ) -> Result<ConstraintHandle, PhysicsError> {
        self.ensure_open()?;
        let a = self.entity(definition.body_a)?;
        let b = self.entity(definition.body_b)?;
        let constraint: Arc<dyn Constraint3D<EntityId>> = match definition.kind {
            ConstraintKind::Ball | ConstraintKind::Fixed => {
                let rest = self.store.position(a).distance(self.store.position(b));
                Arc::new(DistanceConstraint3D::new(a, b, rest, 1.0)?)
            }
            ConstraintKind::Hinge | ConstraintKind::Slider => {
                return Err(PhysicsError::Unsupported("hinge and slider joints"));
            }
        };

        self.world.add_constraint(Arc::clone(&constraint));
        let handle = ConstraintHandle(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(
            handle,
            ConstraintRecord {
                definition,
                constraint,
            },
        );
        Ok(handle)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let record = self
            .constraints
            .remove(&handle)
            .ok_or(PhysicsError::UnknownConstraint(handle))?;
        self.world.constraints().remove(&record.constraint);
        Ok(())
    }

    fn constraints(&self) -> Vec<ConstraintHandle> {
        self.constraints.keys().copied().collect()
    }

    fn runtime_tuning(&self) -> RuntimeTuning {
        self.tuning
    }

    /// Soft CFM and bounce velocity are kept for round-tripping but not used by the solver.
    fn set_runtime_tuning(&mut self, tuning: RuntimeTuning) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        tuning.validate()?;
        self.world.set_solver_iterations(tuning.solver_iterations)?;
        self.store.restitution = tuning.contact_bounce;
        self.store.friction = if tuning.contact_friction.is_finite() {
            tuning.contact_friction
        } else {
            UNBOUNDED_FRICTION
        };
        self.tuning = tuning;
        Ok(())
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        validate_time_step(dt)?;

        let items = self.store.ids();
        let events = self.world.step(&items, &mut self.store, dt)?;
        self.integrate_free_motion(dt);

        self.time += dt;
        for id in &items {
            if let Some(record) = self.store.arena.get_mut(*id) {
                record.state.timestamp = self.time;
            }
        }
        self.last_contacts = events
            .iter()
            .filter_map(|event| self.contact_summary(event))
            .collect();
        debug!(
            "rigid world t={:.6}: {} bodies, {} contact events",
            self.time,
            items.len(),
            self.last_contacts.len()
        );
        Ok(())
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities {
            rigid_bodies: true,
            n_body: false,
        }
    }

    fn close(&mut self) {
        self.world.clear_constraints();
        self.constraints.clear();
        self.handles.clear();
        self.store.arena = Arena::new();
        self.last_contacts.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_box(position: DVec3) -> PhysicsBodyDefinition {
        PhysicsBodyDefinition::new(
            PhysicsBodyType::Dynamic,
            1.0,
            CollisionShape::cuboid(DVec3::splat(0.5)).unwrap(),
            PhysicsBodyState::at(position).unwrap(),
        )
        .unwrap()
    }

    fn floor() -> PhysicsBodyDefinition {
        PhysicsBodyDefinition::new(
            PhysicsBodyType::Static,
            0.0,
            CollisionShape::cuboid(DVec3::new(10.0, 0.5, 10.0)).unwrap(),
            PhysicsBodyState::IDENTITY,
        )
        .unwrap()
    }

    #[test]
    fn bodies_fall_and_land_on_the_floor() {
        let mut world = RigidBodyWorld::new().unwrap();
        world.set_gravity(DVec3::new(0.0, -9.81, 0.0)).unwrap();
        let ground = world.create_body(floor()).unwrap();
        let falling = world.create_body(dynamic_box(DVec3::new(0.0, 3.0, 0.0))).unwrap();

        let mut resting_frames = 0;
        for frame in 0..240 {
            world.step(1.0 / 60.0).unwrap();
            let touching = world.last_contacts().iter().any(|(a, b, kind)| {
                *a == ground && *b == falling && *kind != CollisionEventType::Exit
            });
            if frame >= 180 && touching {
                resting_frames += 1;
            }
        }

        let state = world.body_state(falling).unwrap();
        assert!(state.position.y > 0.9 && state.position.y < 1.1, "y = {}", state.position.y);
        assert!(state.linear_velocity.y.abs() < 0.5);
        assert_eq!(world.body_state(ground).unwrap().position, DVec3::ZERO);
        assert!(resting_frames > 0);
        assert!((world.body_state(falling).unwrap().timestamp - 4.0).abs() < 1e-9);
    }

    #[test]
    fn kinematic_bodies_follow_their_velocity() {
        let mut world = RigidBodyWorld::new().unwrap();
        let state = PhysicsBodyState::at(DVec3::ZERO)
            .unwrap()
            .with_linear_velocity(DVec3::new(2.0, 0.0, 0.0))
            .unwrap();
        let kinematic = world
            .create_body(
                PhysicsBodyDefinition::new(
                    PhysicsBodyType::Kinematic,
                    0.0,
                    CollisionShape::sphere(0.5).unwrap(),
                    state,
                )
                .unwrap(),
            )
            .unwrap();

        world.step(0.5).unwrap();

        assert_eq!(world.body_state(kinematic).unwrap().position, DVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn ball_joint_holds_creation_distance() {
        let mut world = RigidBodyWorld::new().unwrap();
        world.set_gravity(DVec3::new(0.0, -9.81, 0.0)).unwrap();
        let anchor = world
            .create_body(
                PhysicsBodyDefinition::new(
                    PhysicsBodyType::Static,
                    0.0,
                    CollisionShape::sphere(0.1).unwrap(),
                    PhysicsBodyState::at(DVec3::new(0.0, 10.0, 0.0)).unwrap(),
                )
                .unwrap(),
            )
            .unwrap();
        let bob = world
            .create_body(
                PhysicsBodyDefinition::new(
                    PhysicsBodyType::Dynamic,
                    1.0,
                    CollisionShape::sphere(0.1).unwrap(),
                    PhysicsBodyState::at(DVec3::new(0.0, 8.0, 0.0)).unwrap(),
                )
                .unwrap(),
            )
            .unwrap();
        let joint = world
            .create_constraint(PhysicsConstraintDefinition::new(
                ConstraintKind::Ball,
                anchor,
                bob,
            ))
            .unwrap();
        assert_eq!(world.constraints(), vec![joint]);

        world.step(1.0 / 60.0).unwrap();
        world.step(1.0 / 60.0).unwrap();

        let y = world.body_state(bob).unwrap().position.y;
        assert!(y < 8.0 && y > 7.9, "y = {y}");
        assert_eq!(
            world.create_constraint(PhysicsConstraintDefinition::new(
                ConstraintKind::Hinge,
                anchor,
                bob
            )),
            Err(PhysicsError::Unsupported("hinge and slider joints"))
        );

        world.remove_body(bob).unwrap();
        assert!(world.constraints().is_empty());
        assert!(world.collision_world().constraints().is_empty());
        assert_eq!(world.remove_body(bob), Err(PhysicsError::UnknownBody(bob)));
    }

    #[test]
    fn runtime_tuning_is_validated_and_applied() {
        let mut world = RigidBodyWorld::new().unwrap();
        assert_eq!(world.runtime_tuning().solver_iterations, 1);
        let tuning = RuntimeTuning {
            solver_iterations: 8,
            contact_bounce: 0.0,
            ..RuntimeTuning::default()
        };
        world.set_runtime_tuning(tuning).unwrap();
        assert_eq!(world.collision_world().solver_iterations(), 8);
        assert_eq!(world.runtime_tuning(), tuning);

        let invalid = RuntimeTuning {
            solver_iterations: 0,
            ..RuntimeTuning::default()
        };
        assert!(world.set_runtime_tuning(invalid).is_err());
        assert_eq!(world.runtime_tuning(), tuning);
    }

    #[test]
    #[should_panic(expected = "stale or foreign entity id")]
    fn removed_bodies_are_not_read_as_phantom_colliders() {
        let mut world = RigidBodyWorld::new().unwrap();
        let body = world.create_body(dynamic_box(DVec3::new(4.0, 0.0, 0.0))).unwrap();
        let id = world.handles[&body];
        world.remove_body(body).unwrap();
        let _ = world.store.bounds(id);
    }

    #[test]
    fn closed_world_rejects_mutation() {
        let mut world = RigidBodyWorld::new().unwrap();
        let body = world.create_body(dynamic_box(DVec3::ZERO)).unwrap();
        assert!(world.capabilities().rigid_bodies);
        let corrupt = PhysicsBodyState {
            position: DVec3::new(f64::NAN, 0.0, 0.0),
            ..PhysicsBodyState::IDENTITY
        };
        assert_eq!(
            world.set_body_state(body, corrupt),
            Err(PhysicsError::NonFinite("position"))
        );

        world.close();

        assert!(world.bodies().is_empty());
        assert_eq!(world.step(0.1), Err(PhysicsError::Closed));
        assert_eq!(world.create_body(dynamic_box(DVec3::ZERO)), Err(PhysicsError::Closed));
    }
}
