use std::{collections::HashMap, sync::Arc, time::Instant};

use glam::DVec3;
use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    collision::{
        broadphase::{BroadPhase3D, SweepAndPrune3D},
        cache::ManifoldCache3D,
        debug::CollisionDebugSnapshot3D,
        events::{CollisionEvent, CollisionEventType},
        filtering::{filter_pairs, FilteredCollisionPair},
        manifold::ContactManifold3D,
        pair::{CollisionHandle, CollisionPair},
    },
    config::{
        validate_gravity, validate_iterations, validate_time_step, ConfigError, WorldSettings,
        DEFAULT_FRAME_BUDGET_MS,
    },
    dynamics::{
        adapter::{checked_inverse_mass, finite_vector, RigidBodyAdapter3D},
        constraints::{Constraint3D, ConstraintRegistry},
        solver::{CollisionResponder3D, ContactSolver3D},
    },
    utils::logging::{warn_if_frame_budget_exceeded, ScopedTimer},
};

pub mod source;

pub use source::CollisionSource3D;

#[derive(Debug, Clone)]
struct FrameCollision {
    response_enabled: bool,
    manifold: ContactManifold3D,
}

/// Orchestrates broad phase, filtering, narrow phase, event classification and response.
pub struct CollisionWorld3D<T: CollisionHandle> {
    broad_phase: Box<dyn BroadPhase3D<T>>,
    responder: Option<Box<dyn CollisionResponder3D<T>>>,
    manifold_cache: ManifoldCache3D<T>,
    previous_frame: HashMap<CollisionPair<T>, FrameCollision>,
    constraints: ConstraintRegistry<T>,
    settings: WorldSettings,
    parallel_enabled: bool,
    debug_capture: bool,
    debug_snapshot: Option<CollisionDebugSnapshot3D<T>>,
}

impl<T: CollisionHandle> Default for CollisionWorld3D<T> {
    fn default() -> Self {
        Self::new(SweepAndPrune3D::new())
    }
}

impl<T: CollisionHandle> CollisionWorld3D<T> {
    /// Detection-only world: events are reported but nothing responds to them until
    /// [`set_responder`](Self::set_responder) is called.
    pub fn new<B>(broad_phase: B) -> Self
    where
        B: BroadPhase3D<T> + 'static,
    {
        Self {
            broad_phase: Box::new(broad_phase),
            responder: None,
            manifold_cache: ManifoldCache3D::new(),
            previous_frame: HashMap::new(),
            constraints: ConstraintRegistry::new(),
            settings: WorldSettings::default(),
            parallel_enabled: false,
            debug_capture: false,
            debug_snapshot: None,
        }
    }

    /// World resolving contacts with a [`ContactSolver3D`] built from `settings.solver`.
    pub fn with_settings<B>(broad_phase: B, settings: WorldSettings) -> Result<Self, ConfigError>
    where
        B: BroadPhase3D<T> + 'static,
    {
        settings.validate()?;
        let mut world = Self::new(broad_phase);
        world.responder = Some(Box::new(ContactSolver3D::with_settings(settings.solver)?));
        world.settings = settings;
        Ok(world)
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn set_responder<R>(&mut self, responder: R)
    where
        R: CollisionResponder3D<T> + 'static,
    {
        self.responder = Some(Box::new(responder));
    }

    pub fn clear_responder(&mut self) {
        self.responder = None;
    }

    pub fn has_responder(&self) -> bool {
        self.responder.is_some()
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    /// While enabled, each [`update`](Self::update) records a [`CollisionDebugSnapshot3D`]
    /// of the bounds and contacts it saw before responding. Disabling drops the last one.
    pub fn set_debug_capture(&mut self, enabled: bool) {
        self.debug_capture = enabled;
        if !enabled {
            self.debug_snapshot = None;
        }
    }

    pub fn debug_capture(&self) -> bool {
        self.debug_capture
    }

    pub fn debug_snapshot(&self) -> Option<&CollisionDebugSnapshot3D<T>> {
        self.debug_snapshot.as_ref()
    }

    pub fn manifold_cache(&self) -> &ManifoldCache3D<T> {
        &self.manifold_cache
    }

    pub fn manifold_retention_frames(&self) -> u64 {
        self.settings.manifold_retention_frames
    }

    pub fn set_manifold_retention_frames(&mut self, frames: u64) {
        self.settings.manifold_retention_frames = frames;
    }

    pub fn solver_iterations(&self) -> u32 {
        self.settings.solver_iterations
    }

    pub fn set_solver_iterations(&mut self, iterations: u32) -> Result<(), ConfigError> {
        validate_iterations("solver_iterations", iterations)?;
        self.settings.solver_iterations = iterations;
        Ok(())
    }

    pub fn constraint_iterations(&self) -> u32 {
        self.settings.constraint_iterations
    }

    pub fn set_constraint_iterations(&mut self, iterations: u32) -> Result<(), ConfigError> {
        validate_iterations("constraint_iterations", iterations)?;
        self.settings.constraint_iterations = iterations;
        Ok(())
    }

    pub fn gravity(&self) -> DVec3 {
        self.settings.gravity
    }

    pub fn set_gravity(&mut self, gravity: DVec3) -> Result<(), ConfigError> {
        validate_gravity(gravity)?;
        self.settings.gravity = gravity;
        Ok(())
    }

    pub fn add_constraint(&self, constraint: Arc<dyn Constraint3D<T>>) {
        self.constraints.add(constraint);
    }

    pub fn clear_constraints(&self) {
        self.constraints.clear();
    }

    /// Shared handle to the constraint list; other threads may register through it.
    pub fn constraints(&self) -> ConstraintRegistry<T> {
        self.constraints.clone()
    }

    /// Runs one detection pass and dispatches the response-enabled contacts.
    ///
    /// Returns ENTER/STAY events in canonical pair order followed by EXIT events in
    /// canonical pair order. Responses are applied in canonical pair order as well, so
    /// identical inputs produce identical body states.
    pub fn update<S>(&mut self, items: &[T], bodies: &mut S) -> Vec<CollisionEvent<T>>
    where
        S: CollisionSource3D<T> + RigidBodyAdapter3D<T>,
    {
        let frame_start = Instant::now();
        self.manifold_cache.next_frame();

        let candidates = {
            let _timer = ScopedTimer::new("collision::broadphase");
            let source: &S = bodies;
            self.broad_phase
                .find_potential_pairs(items, &|body| source.bounds(body))
        };
        let mut filtered: Vec<FilteredCollisionPair<T>> =
            filter_pairs(&candidates, |body| bodies.collision_filter(body))
                .into_iter()
                .collect();
        filtered.sort_unstable();

        let contacts = {
            let _timer = ScopedTimer::new("collision::narrowphase");
            self.narrow_phase(&filtered, &*bodies)
        };

        let mut current_frame = HashMap::with_capacity(contacts.len());
        let mut events = Vec::with_capacity(contacts.len() + self.previous_frame.len());
        for (filtered_pair, manifold) in contacts {
            let pair = filtered_pair.pair;
            let kind = if self.previous_frame.contains_key(&pair) {
                CollisionEventType::Stay
            } else {
                CollisionEventType::Enter
            };
            self.manifold_cache.put(pair, manifold.clone());
            events.push(CollisionEvent::new(
                pair,
                kind,
                filtered_pair.response_enabled,
                manifold.clone(),
            ));
            current_frame.insert(
                pair,
                FrameCollision {
                    response_enabled: filtered_pair.response_enabled,
                    manifold,
                },
            );
        }

        let mut exits: Vec<CollisionEvent<T>> = self
            .previous_frame
            .iter()
            .filter(|(pair, _)| !current_frame.contains_key(*pair))
            .map(|(pair, prior)| {
                CollisionEvent::new(
                    *pair,
                    CollisionEventType::Exit,
                    prior.response_enabled,
                    prior.manifold.clone(),
                )
            })
            .collect();
        exits.sort_unstable_by(|a, b| a.pair.cmp(&b.pair));

        self.previous_frame = current_frame;
        if self.debug_capture {
            let source: &S = bodies;
            self.debug_snapshot = Some(CollisionDebugSnapshot3D::from(
                items,
                |body| source.bounds(body),
                events.iter().chain(&exits),
            ));
        }
        let pruned = self
            .manifold_cache
            .prune_stale(self.settings.manifold_retention_frames);

        if let Some(responder) = &self.responder {
            let responses: Vec<CollisionEvent<T>> = events
                .iter()
                .filter(|event| event.response_enabled)
                .cloned()
                .collect();
            if !responses.is_empty() {
                let _timer = ScopedTimer::new("collision::respond");
                responder.resolve_all(
                    &responses,
                    self.settings.solver_iterations,
                    &mut self.manifold_cache,
                    bodies,
                );
            }
        }

        debug!(
            "collision update: {} candidates, {} filtered, {} contacts, {} exits, {} pruned",
            candidates.len(),
            filtered.len(),
            events.len(),
            exits.len(),
            pruned
        );
        events.extend(exits);
        warn_if_frame_budget_exceeded(
            "collision::update",
            frame_start.elapsed(),
            DEFAULT_FRAME_BUDGET_MS,
        );
        events
    }

    /// Fixed-step loop: gravity on velocities, constraint passes, [`update`](Self::update),
    /// then position integration. Bodies with zero inverse mass are not integrated.
    pub fn step<S>(
        &mut self,
        items: &[T],
        bodies: &mut S,
        dt: f64,
    ) -> Result<Vec<CollisionEvent<T>>, ConfigError>
    where
        S: CollisionSource3D<T> + RigidBodyAdapter3D<T>,
    {
        validate_time_step(dt)?;

        {
            let _timer = ScopedTimer::new("dynamics::integrate_velocities");
            let gravity_step = self.settings.gravity * dt;
            for &body in items {
                if checked_inverse_mass(&*bodies, body) <= 0.0 {
                    continue;
                }
                let velocity = finite_vector(bodies.velocity(body), "velocity");
                bodies.set_velocity(body, velocity + gravity_step);
            }
        }

        {
            let _timer = ScopedTimer::new("dynamics::constraints");
            let constraints = self.constraints.snapshot();
            for _ in 0..self.settings.constraint_iterations {
                for constraint in constraints.iter() {
                    constraint.solve(bodies, dt);
                }
            }
        }

        let events = self.update(items, bodies);

        {
            let _timer = ScopedTimer::new("dynamics::integrate_positions");
            for &body in items {
                if checked_inverse_mass(&*bodies, body) <= 0.0 {
                    continue;
                }
                let position = finite_vector(bodies.position(body), "position");
                let velocity = finite_vector(bodies.velocity(body), "velocity");
                bodies.set_position(body, position + velocity * dt);
            }
        }

        Ok(events)
    }

    #[cfg(feature = "parallel")]
    fn narrow_phase<S>(
        &self,
        pairs: &[FilteredCollisionPair<T>],
        source: &S,
    ) -> Vec<(FilteredCollisionPair<T>, ContactManifold3D)>
    where
        S: CollisionSource3D<T>,
    {
        if !self.parallel_enabled {
            return Self::narrow_phase_sequential(pairs, source);
        }
        pairs
            .par_iter()
            .filter_map(|filtered| {
                source
                    .contact(filtered.pair.first(), filtered.pair.second())
                    .map(|manifold| (*filtered, manifold))
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn narrow_phase<S>(
        &self,
        pairs: &[FilteredCollisionPair<T>],
        source: &S,
    ) -> Vec<(FilteredCollisionPair<T>, ContactManifold3D)>
    where
        S: CollisionSource3D<T>,
    {
        Self::narrow_phase_sequential(pairs, source)
    }

    fn narrow_phase_sequential<S>(
        pairs: &[FilteredCollisionPair<T>],
        source: &S,
    ) -> Vec<(FilteredCollisionPair<T>, ContactManifold3D)>
    where
        S: CollisionSource3D<T>,
    {
        pairs
            .iter()
            .filter_map(|filtered| {
                source
                    .contact(filtered.pair.first(), filtered.pair.second())
                    .map(|manifold| (*filtered, manifold))
            })
            .collect()
    }
}
