use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};

use crate::utils::logging::ScopedTimer;

use super::{
    diagnostics::{
        CapabilityPolicy, HybridCapabilityReport, HybridLinkDiagnostics, HybridStepTelemetry,
    },
    error::{HybridError, WorldRole},
    link::{ConflictPolicy, HybridBodyLink, HybridOwnership, LinkId, StateHandoffMode},
    model::{BodyHandle, PhysicsBodyState},
    snapshot::{HybridSnapshot, SnapshotPublisher, SnapshotReader},
    world::PhysicsWorld,
};

#[derive(Debug, Clone, Copy)]
struct LinkRuntime {
    link: HybridBodyLink,
    enabled: bool,
    rejected_count: u64,
    last_position_error: f64,
    last_linear_velocity_error: f64,
    last_angular_velocity_error: f64,
    last_handoff_time: f64,
}

impl LinkRuntime {
    fn new(link: HybridBodyLink) -> Self {
        Self {
            link,
            enabled: true,
            rejected_count: 0,
            last_position_error: 0.0,
            last_linear_velocity_error: 0.0,
            last_angular_velocity_error: 0.0,
            last_handoff_time: 0.0,
        }
    }

    fn record_errors(&mut self, owner: &PhysicsBodyState, follower: &PhysicsBodyState) {
        self.last_position_error = owner.position.distance(follower.position);
        self.last_linear_velocity_error = owner.linear_velocity.distance(follower.linear_velocity);
        self.last_angular_velocity_error =
            owner.angular_velocity.distance(follower.angular_velocity);
    }

    fn diverged(&self) -> bool {
        if self.link.conflict_policy() != ConflictPolicy::RejectOnDivergence {
            return false;
        }
        let thresholds = self.link.thresholds();
        self.last_position_error > thresholds.max_position
            || self.last_linear_velocity_error > thresholds.max_linear_velocity
            || self.last_angular_velocity_error > thresholds.max_angular_velocity
    }

    fn diagnostics(&self, link_id: LinkId) -> HybridLinkDiagnostics {
        HybridLinkDiagnostics {
            link_id,
            link: self.link,
            enabled: self.enabled,
            rejected_count: self.rejected_count,
            last_position_error: self.last_position_error,
            last_linear_velocity_error: self.last_linear_velocity_error,
            last_angular_velocity_error: self.last_angular_velocity_error,
            last_handoff_time: self.last_handoff_time,
        }
    }
}

/// Steps a general-purpose world and an orbital world on one timeline and hands
/// authoritative body state across linked pairs.
///
/// Each step advances the orbital world first, then the general world, then runs handoff for
/// every enabled link in ascending [`LinkId`] order, and finally publishes a
/// [`HybridSnapshot`] of both worlds.
pub struct HybridPhysicsCoordinator<G, O> {
    general: G,
    orbital: O,
    capability_report: HybridCapabilityReport,
    next_link_id: u64,
    links: BTreeMap<LinkId, LinkRuntime>,
    publisher: SnapshotPublisher,
    latest_telemetry: Option<HybridStepTelemetry>,
    simulation_time: f64,
    last_rejected_handoffs: usize,
}

impl<G: PhysicsWorld, O: PhysicsWorld> HybridPhysicsCoordinator<G, O> {
    /// Lenient construction: the capability report is recorded but never enforced.
    pub fn new(general: G, orbital: O) -> Self {
        let capability_report = evaluate_capabilities(CapabilityPolicy::Lenient, &general, &orbital);
        Self::from_parts(general, orbital, capability_report)
    }

    pub fn with_policy(
        general: G,
        orbital: O,
        policy: CapabilityPolicy,
    ) -> Result<Self, HybridError> {
        let capability_report = evaluate_capabilities(policy, &general, &orbital);
        if policy == CapabilityPolicy::Strict && !capability_report.passed {
            return Err(HybridError::CapabilityGate(capability_report.message));
        }
        Ok(Self::from_parts(general, orbital, capability_report))
    }

    fn from_parts(general: G, orbital: O, capability_report: HybridCapabilityReport) -> Self {
        Self {
            general,
            orbital,
            capability_report,
            next_link_id: 1,
            links: BTreeMap::new(),
            publisher: SnapshotPublisher::default(),
            latest_telemetry: None,
            simulation_time: 0.0,
            last_rejected_handoffs: 0,
        }
    }

    /// Registers `link` after checking both bodies exist in their worlds.
    pub fn register_link(&mut self, link: HybridBodyLink) -> Result<LinkId, HybridError> {
        link.thresholds().validate()?;
        self.ensure_linked_bodies(&link)?;
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        self.links.insert(id, LinkRuntime::new(link));
        debug!("registered {id}: {link:?}");
        Ok(id)
    }

    pub fn remove_link(&mut self, id: LinkId) -> bool {
        self.links.remove(&id).is_some()
    }

    pub fn set_link_enabled(&mut self, id: LinkId, enabled: bool) -> bool {
        match self.links.get_mut(&id) {
            Some(runtime) => {
                runtime.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_link_enabled(&self, id: LinkId) -> bool {
        self.links.get(&id).is_some_and(|runtime| runtime.enabled)
    }

    /// Swaps the link description while keeping its enabled flag and diagnostics.
    ///
    /// Returns `Ok(false)` when `id` is unknown.
    pub fn update_link(
        &mut self,
        id: LinkId,
        replacement: HybridBodyLink,
    ) -> Result<bool, HybridError> {
        if !self.links.contains_key(&id) {
            return Ok(false);
        }
        replacement.thresholds().validate()?;
        self.ensure_linked_bodies(&replacement)?;
        if let Some(runtime) = self.links.get_mut(&id) {
            runtime.link = replacement;
        }
        Ok(true)
    }

    /// Drops every link that references `handle` on either side.
    pub fn remove_links_for_body(&mut self, handle: BodyHandle) -> usize {
        let before = self.links.len();
        self.links.retain(|_, runtime| !runtime.link.involves(handle));
        before - self.links.len()
    }

    pub fn clear_links(&mut self) {
        self.links.clear();
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &HybridBodyLink)> + '_ {
        self.links.iter().map(|(id, runtime)| (*id, &runtime.link))
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_diagnostics(&self) -> Vec<HybridLinkDiagnostics> {
        self.links
            .iter()
            .map(|(id, runtime)| runtime.diagnostics(*id))
            .collect()
    }

    pub fn latest_snapshot(&self) -> Option<Arc<HybridSnapshot>> {
        self.publisher.latest()
    }

    /// Handle for consumers on other threads.
    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    pub fn latest_telemetry(&self) -> Option<HybridStepTelemetry> {
        self.latest_telemetry
    }

    pub fn capability_report(&self) -> &HybridCapabilityReport {
        &self.capability_report
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn last_rejected_handoffs(&self) -> usize {
        self.last_rejected_handoffs
    }

    /// Steps with interpolation alpha 0 and extrapolation `dt`.
    pub fn step(&mut self, dt: f64) -> Result<Arc<HybridSnapshot>, HybridError> {
        self.step_with_render_metadata(dt, 0.0, dt)
    }

    pub fn step_with_render_metadata(
        &mut self,
        dt: f64,
        interpolation_alpha: f64,
        extrapolation: f64,
    ) -> Result<Arc<HybridSnapshot>, HybridError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(HybridError::InvalidTimestep(dt));
        }
        validate_render_metadata(interpolation_alpha, extrapolation)?;

        let timer = ScopedTimer::new("hybrid.orbital_step");
        self.orbital
            .step(dt)
            .map_err(HybridError::backend(WorldRole::Orbital))?;
        let orbital_step = timer.elapsed();
        drop(timer);

        let timer = ScopedTimer::new("hybrid.general_step");
        self.general
            .step(dt)
            .map_err(HybridError::backend(WorldRole::General))?;
        let general_step = timer.elapsed();
        drop(timer);

        // Both worlds have advanced; the clock follows them even if a handoff fails.
        self.simulation_time += dt;

        let timer = ScopedTimer::new("hybrid.handoff");
        let handoff_time = self.simulation_time;
        let mut handoff_count = 0;
        let mut rejected = 0;
        for (id, runtime) in self.links.iter_mut().filter(|(_, runtime)| runtime.enabled) {
            handoff_count += 1;
            let link = runtime.link;
            let accepted = match link.ownership() {
                HybridOwnership::General => hand_off(
                    runtime,
                    (&self.general, WorldRole::General, link.general_body()),
                    (&mut self.orbital, WorldRole::Orbital, link.orbital_body()),
                    handoff_time,
                )?,
                HybridOwnership::Orbital => hand_off(
                    runtime,
                    (&self.orbital, WorldRole::Orbital, link.orbital_body()),
                    (&mut self.general, WorldRole::General, link.general_body()),
                    handoff_time,
                )?,
            };
            if !accepted {
                rejected += 1;
                warn!(
                    "{id} handoff rejected: position error {:.6}, linear velocity error {:.6}, \
                     angular velocity error {:.6}",
                    runtime.last_position_error,
                    runtime.last_linear_velocity_error,
                    runtime.last_angular_velocity_error
                );
            }
        }
        let handoff = timer.elapsed();
        drop(timer);

        self.last_rejected_handoffs = rejected;
        let snapshot = self
            .publisher
            .publish(self.capture_snapshot(interpolation_alpha, extrapolation));
        self.latest_telemetry = Some(HybridStepTelemetry {
            simulation_time: self.simulation_time,
            dt,
            orbital_step,
            general_step,
            handoff,
            link_count: self.links.len(),
            handoff_count,
            rejected_handoffs: rejected,
        });
        debug!(
            "hybrid step t={:.6}: {} links, {} handoffs, {} rejected",
            self.simulation_time,
            self.links.len(),
            handoff_count,
            rejected
        );
        Ok(snapshot)
    }

    /// Republishes the latest snapshot with new render metadata; `None` before the first step.
    pub fn update_render_metadata(
        &mut self,
        interpolation_alpha: f64,
        extrapolation: f64,
    ) -> Result<Option<Arc<HybridSnapshot>>, HybridError> {
        validate_render_metadata(interpolation_alpha, extrapolation)?;
        Ok(self.publisher.latest().map(|current| {
            self.publisher
                .publish(current.with_render_metadata(interpolation_alpha, extrapolation))
        }))
    }

    pub fn general(&self) -> &G {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut G {
        &mut self.general
    }

    pub fn orbital(&self) -> &O {
        &self.orbital
    }

    pub fn orbital_mut(&mut self) -> &mut O {
        &mut self.orbital
    }

    /// Closes both worlds and drops every link.
    pub fn close(&mut self) {
        self.links.clear();
        self.general.close();
        self.orbital.close();
    }

    pub fn into_worlds(self) -> (G, O) {
        (self.general, self.orbital)
    }

    fn ensure_linked_bodies(&self, link: &HybridBodyLink) -> Result<(), HybridError> {
        if !self.general.contains_body(link.general_body()) {
            return Err(HybridError::UnknownBody {
                world: WorldRole::General,
                handle: link.general_body(),
            });
        }
        if !self.orbital.contains_body(link.orbital_body()) {
            return Err(HybridError::UnknownBody {
                world: WorldRole::Orbital,
                handle: link.orbital_body(),
            });
        }
        Ok(())
    }

    fn capture_snapshot(&self, interpolation_alpha: f64, extrapolation: f64) -> HybridSnapshot {
        HybridSnapshot::new(
            self.simulation_time,
            interpolation_alpha,
            extrapolation,
            collect_states(&self.general),
            collect_states(&self.orbital),
        )
    }
}

fn collect_states<W: PhysicsWorld + ?Sized>(world: &W) -> BTreeMap<BodyHandle, PhysicsBodyState> {
    world
        .bodies()
        .into_iter()
        .filter_map(|handle| world.body_state(handle).map(|state| (handle, state)))
        .collect()
}

/// Copies owner state onto the follower unless the link's policy rejects it.
///
/// Returns `Ok(false)` for a rejected handoff, leaving the follower untouched.
fn hand_off<A, B>(
    runtime: &mut LinkRuntime,
    (owner, owner_role, owner_body): (&A, WorldRole, BodyHandle),
    (follower, follower_role, follower_body): (&mut B, WorldRole, BodyHandle),
    handoff_time: f64,
) -> Result<bool, HybridError>
where
    A: PhysicsWorld + ?Sized,
    B: PhysicsWorld + ?Sized,
{
    let owner_state = owner
        .body_state(owner_body)
        .ok_or(HybridError::UnknownBody {
            world: owner_role,
            handle: owner_body,
        })?;
    let follower_state = follower
        .body_state(follower_body)
        .ok_or(HybridError::UnknownBody {
            world: follower_role,
            handle: follower_body,
        })?;

    runtime.record_errors(&owner_state, &follower_state);
    if runtime.diverged() {
        runtime.rejected_count += 1;
        return Ok(false);
    }

    let merged = merge_state(&owner_state, &follower_state, runtime.link.handoff_mode());
    follower
        .set_body_state(follower_body, merged)
        .map_err(HybridError::backend(follower_role))?;
    runtime.last_handoff_time = handoff_time;
    Ok(true)
}

fn merge_state(
    owner: &PhysicsBodyState,
    follower: &PhysicsBodyState,
    mode: StateHandoffMode,
) -> PhysicsBodyState {
    match mode {
        StateHandoffMode::FullState => PhysicsBodyState {
            reference_frame: follower.reference_frame,
            ..*owner
        },
        StateHandoffMode::PositionVelocityOnly => PhysicsBodyState {
            position: owner.position,
            linear_velocity: owner.linear_velocity,
            timestamp: owner.timestamp,
            ..*follower
        },
    }
}

fn validate_render_metadata(interpolation_alpha: f64, extrapolation: f64) -> Result<(), HybridError> {
    let alpha_ok = interpolation_alpha.is_finite() && (0.0..=1.0).contains(&interpolation_alpha);
    let extrapolation_ok = extrapolation.is_finite() && extrapolation >= 0.0;
    if alpha_ok && extrapolation_ok {
        Ok(())
    } else {
        Err(HybridError::InvalidRenderMetadata {
            alpha: interpolation_alpha,
            extrapolation,
        })
    }
}

fn evaluate_capabilities<G, O>(
    policy: CapabilityPolicy,
    general: &G,
    orbital: &O,
) -> HybridCapabilityReport
where
    G: PhysicsWorld + ?Sized,
    O: PhysicsWorld + ?Sized,
{
    let general_rigid_bodies = general.capabilities().rigid_bodies;
    let orbital_n_body = orbital.capabilities().n_body;
    let passed = general_rigid_bodies && orbital_n_body;
    let message = if passed {
        "capability gate passed"
    } else {
        "expected general world rigid-body support and orbital world n-body support"
    };
    HybridCapabilityReport {
        policy,
        general_rigid_bodies,
        orbital_n_body,
        passed,
        message: message.to_owned(),
    }
}
