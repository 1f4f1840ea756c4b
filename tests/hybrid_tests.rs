use std::collections::BTreeMap;

use approx::assert_relative_eq;
use glam::{DQuat, DVec3};
use hybrid_collide::hybrid::{
    snapshot_io, BodyHandle, CapabilityPolicy, CollisionShape, ConflictPolicy, ConstraintHandle,
    DivergenceThresholds, HybridBodyLink, HybridError, HybridOwnership, HybridPhysicsCoordinator,
    PhysicsBodyDefinition, PhysicsBodyState, PhysicsBodyType, PhysicsCapabilities,
    PhysicsConstraintDefinition, PhysicsError, PhysicsWorld, ReferenceFrame, RigidBodyWorld,
    RuntimeTuning, SnapshotRecorder, StateHandoffMode,
};

/// Point masses orbiting a fixed central body with gravitational parameter `mu`.
struct CentralBodyWorld {
    mu: f64,
    states: BTreeMap<BodyHandle, PhysicsBodyState>,
    next_handle: u64,
    tuning: RuntimeTuning,
}

impl CentralBodyWorld {
    fn new(mu: f64) -> Self {
        Self {
            mu,
            states: BTreeMap::new(),
            next_handle: 1,
            tuning: RuntimeTuning::default(),
        }
    }
}

impl PhysicsWorld for CentralBodyWorld {
    fn create_body(
        &mut self,
        definition: PhysicsBodyDefinition,
    ) -> Result<BodyHandle, PhysicsError> {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.states.insert(handle, definition.initial_state());
        Ok(handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.states
            .remove(&handle)
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn bodies(&self) -> Vec<BodyHandle> {
        self.states.keys().copied().collect()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<PhysicsBodyState> {
        self.states.get(&handle).copied()
    }

    fn set_body_state(
        &mut self,
        handle: BodyHandle,
        state: PhysicsBodyState,
    ) -> Result<(), PhysicsError> {
        state.validate()?;
        let slot = self
            .states
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        *slot = state;
        Ok(())
    }

    fn create_constraint(
        &mut self,
        _definition: PhysicsConstraintDefinition,
    ) -> Result<ConstraintHandle, PhysicsError> {
        Err(PhysicsError::Unsupported("constraints in orbital propagation"))
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError> {
        Err(PhysicsError::UnknownConstraint(handle))
    }

    fn constraints(&self) -> Vec<ConstraintHandle> {
        Vec::new()
    }

    fn runtime_tuning(&self) -> RuntimeTuning {
        self.tuning
    }

    fn set_runtime_tuning(&mut self, tuning: RuntimeTuning) -> Result<(), PhysicsError> {
        tuning.validate()?;
        self.tuning = tuning;
        Ok(())
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        for state in self.states.values_mut() {
            let r = state.position.length();
            if r > 0.0 {
                state.linear_velocity -= state.position * (self.mu / (r * r * r)) * dt;
            }
            state.position += state.linear_velocity * dt;
            state.timestamp += dt;
        }
        Ok(())
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities {
            rigid_bodies: false,
            n_body: true,
        }
    }
}

fn sphere_body(body_type: PhysicsBodyType, state: PhysicsBodyState) -> PhysicsBodyDefinition {
    PhysicsBodyDefinition::new(body_type, 1.0, CollisionShape::sphere(0.5).unwrap(), state)
        .unwrap()
}

fn state_at(position: DVec3, velocity: DVec3) -> PhysicsBodyState {
    PhysicsBodyState::at(position)
        .unwrap()
        .with_linear_velocity(velocity)
        .unwrap()
}

#[test]
fn strict_gate_accepts_rigid_and_orbital_backends() {
    let coordinator = HybridPhysicsCoordinator::with_policy(
        RigidBodyWorld::new().unwrap(),
        CentralBodyWorld::new(1.0),
        CapabilityPolicy::Strict,
    )
    .unwrap();
    assert!(coordinator.capability_report().passed);

    let swapped = HybridPhysicsCoordinator::with_policy(
        CentralBodyWorld::new(1.0),
        RigidBodyWorld::new().unwrap(),
        CapabilityPolicy::Strict,
    );
    assert!(matches!(swapped, Err(HybridError::CapabilityGate(_))));
}

#[test]
fn divergent_orbital_owner_is_rejected() {
    let mut general = RigidBodyWorld::new().unwrap();
    let mut orbital = CentralBodyWorld::new(0.0);
    let general_body = general
        .create_body(sphere_body(PhysicsBodyType::Dynamic, PhysicsBodyState::IDENTITY))
        .unwrap();
    let orbital_body = orbital
        .create_body(sphere_body(
            PhysicsBodyType::Dynamic,
            state_at(DVec3::new(1000.0, 0.0, 0.0), DVec3::ZERO),
        ))
        .unwrap();
    let mut coordinator = HybridPhysicsCoordinator::new(general, orbital);
    let link = HybridBodyLink::new(
        general_body,
        orbital_body,
        HybridOwnership::Orbital,
        StateHandoffMode::FullState,
    )
    .with_policy(
        ConflictPolicy::RejectOnDivergence,
        DivergenceThresholds::position_only(10.0),
    )
    .unwrap();
    let id = coordinator.register_link(link).unwrap();

    let snapshot = coordinator.step(1.0 / 60.0).unwrap();

    assert_eq!(coordinator.last_rejected_handoffs(), 1);
    let follower = coordinator.general().body_state(general_body).unwrap();
    assert_eq!(follower.position, DVec3::ZERO);
    assert_eq!(snapshot.general_state(general_body).unwrap().position, DVec3::ZERO);
    let diagnostics = coordinator.link_diagnostics();
    assert_eq!(diagnostics[0].link_id, id);
    assert_eq!(diagnostics[0].rejected_count, 1);
}

#[test]
fn orbital_owner_drives_kinematic_proxy() {
    let mut general = RigidBodyWorld::new().unwrap();
    let mut orbital = CentralBodyWorld::new(398_600.0);
    let proxy = general
        .create_body(sphere_body(PhysicsBodyType::Kinematic, PhysicsBodyState::IDENTITY))
        .unwrap();
    let radius = 7000.0_f64;
    let speed = (398_600.0 / radius).sqrt();
    let satellite = orbital
        .create_body(sphere_body(
            PhysicsBodyType::Dynamic,
            PhysicsBodyState {
                reference_frame: ReferenceFrame::Eme,
                ..state_at(DVec3::new(radius, 0.0, 0.0), DVec3::new(0.0, speed, 0.0))
            },
        ))
        .unwrap();
    let mut coordinator = HybridPhysicsCoordinator::new(general, orbital);
    coordinator
        .register_link(HybridBodyLink::new(
            proxy,
            satellite,
            HybridOwnership::Orbital,
            StateHandoffMode::PositionVelocityOnly,
        ))
        .unwrap();

    let mut recorder = SnapshotRecorder::new();
    for _ in 0..10 {
        recorder.record(coordinator.step(1.0).unwrap());
    }

    let owner = coordinator.orbital().body_state(satellite).unwrap();
    let proxy_state = coordinator.general().body_state(proxy).unwrap();
    assert_eq!(proxy_state.position, owner.position);
    assert_eq!(proxy_state.linear_velocity, owner.linear_velocity);
    assert_eq!(proxy_state.reference_frame, ReferenceFrame::World);
    assert_relative_eq!(owner.position.length(), radius, max_relative = 1e-3);
    assert_relative_eq!(coordinator.simulation_time(), 10.0, epsilon = 1e-9);

    let telemetry = coordinator.latest_telemetry().unwrap();
    assert_eq!(telemetry.link_count, 1);
    assert_eq!(telemetry.handoff_count, 1);
    assert_eq!(telemetry.rejected_handoffs, 0);

    let mut stream = Vec::new();
    snapshot_io::write(&mut stream, &recorder.to_vec()).unwrap();
    let replayed = snapshot_io::read(stream.as_slice()).unwrap();
    assert_eq!(replayed.len(), 10);
    assert_eq!(replayed, recorder.to_vec());
    assert_relative_eq!(replayed[9].simulation_time(), 10.0, epsilon = 1e-9);
}

#[test]
fn general_owner_full_state_keeps_follower_frame() {
    let mut general = RigidBodyWorld::new().unwrap();
    let mut orbital = CentralBodyWorld::new(0.0);
    let spinning = PhysicsBodyState {
        orientation: DQuat::from_rotation_z(0.3),
        angular_velocity: DVec3::new(0.0, 0.0, 0.5),
        ..state_at(DVec3::new(1.0, 2.0, 3.0), DVec3::new(0.5, 0.0, 0.0))
    };
    let owner = general
        .create_body(sphere_body(PhysicsBodyType::Dynamic, spinning))
        .unwrap();
    let follower = orbital
        .create_body(sphere_body(
            PhysicsBodyType::Dynamic,
            PhysicsBodyState {
                reference_frame: ReferenceFrame::Icrf,
                ..PhysicsBodyState::IDENTITY
            },
        ))
        .unwrap();
    let mut coordinator = HybridPhysicsCoordinator::new(general, orbital);
    coordinator
        .register_link(HybridBodyLink::new(
            owner,
            follower,
            HybridOwnership::General,
            StateHandoffMode::FullState,
        ))
        .unwrap();

    coordinator.step(0.5).unwrap();

    let owner_state = coordinator.general().body_state(owner).unwrap();
    let follower_state = coordinator.orbital().body_state(follower).unwrap();
    assert_eq!(follower_state.position, owner_state.position);
    assert_eq!(follower_state.orientation, owner_state.orientation);
    assert_eq!(follower_state.angular_velocity, owner_state.angular_velocity);
    assert_eq!(follower_state.timestamp, owner_state.timestamp);
    assert_eq!(follower_state.reference_frame, ReferenceFrame::Icrf);
    assert_relative_eq!(follower_state.position.x, 1.25, epsilon = 1e-9);
}

#[test]
fn removed_bodies_take_their_links_along() {
    let mut general = RigidBodyWorld::new().unwrap();
    let mut orbital = CentralBodyWorld::new(0.0);
    let a = general
        .create_body(sphere_body(PhysicsBodyType::Dynamic, PhysicsBodyState::IDENTITY))
        .unwrap();
    let b = orbital
        .create_body(sphere_body(PhysicsBodyType::Dynamic, PhysicsBodyState::IDENTITY))
        .unwrap();
    let mut coordinator = HybridPhysicsCoordinator::new(general, orbital);
    let link = HybridBodyLink::new(a, b, HybridOwnership::General, StateHandoffMode::FullState);
    coordinator.register_link(link).unwrap();
    coordinator.register_link(link).unwrap();

    assert_eq!(coordinator.remove_links_for_body(a), 2);
    coordinator.general_mut().remove_body(a).unwrap();
    assert!(matches!(
        coordinator.register_link(link),
        Err(HybridError::UnknownBody { handle, .. }) if handle == a
    ));
    coordinator.step(0.1).unwrap();
    assert_eq!(coordinator.latest_telemetry().unwrap().handoff_count, 0);
}
