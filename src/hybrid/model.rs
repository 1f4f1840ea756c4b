//! Backend-neutral body, constraint, and tuning descriptions exchanged with a [`PhysicsWorld`].
//!
//! [`PhysicsWorld`]: super::world::PhysicsWorld

use std::fmt;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use super::error::PhysicsError;

/// Opaque identity of a body inside one physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Opaque identity of a constraint inside one physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintHandle(pub u64);

impl fmt::Display for ConstraintHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// Frame a body state is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceFrame {
    #[default]
    Unspecified,
    World,
    /// International Celestial Reference Frame.
    Icrf,
    /// Earth-centred, Earth-fixed.
    Ecef,
    /// Earth mean equator and equinox.
    Eme,
}

/// Kinematic state of one body at `timestamp` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBodyState")]
pub struct PhysicsBodyState {
    pub position: DVec3,
    pub orientation: DQuat,
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub reference_frame: ReferenceFrame,
    pub timestamp: f64,
}

impl PhysicsBodyState {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        orientation: DQuat::IDENTITY,
        linear_velocity: DVec3::ZERO,
        angular_velocity: DVec3::ZERO,
        reference_frame: ReferenceFrame::World,
        timestamp: 0.0,
    };

    pub fn new(
        position: DVec3,
        orientation: DQuat,
        linear_velocity: DVec3,
        angular_velocity: DVec3,
        reference_frame: ReferenceFrame,
        timestamp: f64,
    ) -> Result<Self, PhysicsError> {
        let state = Self {
            position,
            orientation,
            linear_velocity,
            angular_velocity,
            reference_frame,
            timestamp,
        };
        state.validate()?;
        Ok(state)
    }

    /// At rest at `position`, otherwise identity.
    pub fn at(position: DVec3) -> Result<Self, PhysicsError> {
        Self::new(
            position,
            DQuat::IDENTITY,
            DVec3::ZERO,
            DVec3::ZERO,
            ReferenceFrame::World,
            0.0,
        )
    }

    pub fn with_linear_velocity(mut self, velocity: DVec3) -> Result<Self, PhysicsError> {
        self.linear_velocity = velocity;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.position.is_finite() {
            return Err(PhysicsError::NonFinite("position"));
        }
        if !self.orientation.is_finite() {
            return Err(PhysicsError::NonFinite("orientation"));
        }
        if !self.linear_velocity.is_finite() {
            return Err(PhysicsError::NonFinite("linear velocity"));
        }
        if !self.angular_velocity.is_finite() {
            return Err(PhysicsError::NonFinite("angular velocity"));
        }
        if !self.timestamp.is_finite() {
            return Err(PhysicsError::NonFinite("timestamp"));
        }
        Ok(())
    }
}

impl Default for PhysicsBodyState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Deserialize)]
struct RawBodyState {
    position: DVec3,
    orientation: DQuat,
    linear_velocity: DVec3,
    angular_velocity: DVec3,
    reference_frame: ReferenceFrame,
    timestamp: f64,
}

impl TryFrom<RawBodyState> for PhysicsBodyState {
    type Error = PhysicsError;

    fn try_from(raw: RawBodyState) -> Result<Self, Self::Error> {
        Self::new(
            raw.position,
            raw.orientation,
            raw.linear_velocity,
            raw.angular_velocity,
            raw.reference_frame,
            raw.timestamp,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicsBodyType {
    Static,
    Kinematic,
    Dynamic,
}

/// Collision geometry. Dimensions are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Box { half_extents: DVec3 },
    Sphere { radius: f64 },
    /// Y-aligned capsule.
    Capsule { radius: f64, half_height: f64 },
}

impl CollisionShape {
    pub fn cuboid(half_extents: DVec3) -> Result<Self, PhysicsError> {
        let shape = Self::Box { half_extents };
        shape.validate()?;
        Ok(shape)
    }

    pub fn sphere(radius: f64) -> Result<Self, PhysicsError> {
        let shape = Self::Sphere { radius };
        shape.validate()?;
        Ok(shape)
    }

    pub fn capsule(radius: f64, half_height: f64) -> Result<Self, PhysicsError> {
        let shape = Self::Capsule {
            radius,
            half_height,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let valid = match *self {
            Self::Box { half_extents } => half_extents.to_array().into_iter().all(positive),
            Self::Sphere { radius } => positive(radius),
            Self::Capsule {
                radius,
                half_height,
            } => positive(radius) && positive(half_height),
        };
        if valid {
            Ok(())
        } else {
            Err(PhysicsError::InvalidDefinition(
                "shape dimensions must be finite and > 0",
            ))
        }
    }

    /// Half extents of the axis-aligned box enclosing the shape at identity orientation.
    pub fn half_extents(&self) -> DVec3 {
        match *self {
            Self::Box { half_extents } => half_extents,
            Self::Sphere { radius } => DVec3::splat(radius),
            Self::Capsule {
                radius,
                half_height,
            } => DVec3::new(radius, half_height + radius, radius),
        }
    }
}

/// Everything a world needs to create a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBodyDefinition {
    body_type: PhysicsBodyType,
    mass: f64,
    shape: CollisionShape,
    initial_state: PhysicsBodyState,
}

impl PhysicsBodyDefinition {
    /// Dynamic bodies need a finite mass `> 0`; other body types ignore `mass`.
    pub fn new(
        body_type: PhysicsBodyType,
        mass: f64,
        shape: CollisionShape,
        initial_state: PhysicsBodyState,
    ) -> Result<Self, PhysicsError> {
        if body_type == PhysicsBodyType::Dynamic && !(mass.is_finite() && mass > 0.0) {
            return Err(PhysicsError::InvalidDefinition(
                "dynamic bodies need a finite mass > 0",
            ));
        }
        shape.validate()?;
        initial_state.validate()?;
        Ok(Self {
            body_type,
            mass,
            shape,
            initial_state,
        })
    }

    pub fn body_type(&self) -> PhysicsBodyType {
        self.body_type
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn shape(&self) -> CollisionShape {
        self.shape
    }

    pub fn initial_state(&self) -> PhysicsBodyState {
        self.initial_state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Ball,
    Fixed,
    Hinge,
    Slider,
}

/// Joint between two bodies of the same world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConstraintDefinition {
    pub kind: ConstraintKind,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Hinge or slider axis in world space; ignored by ball and fixed joints.
    pub axis: DVec3,
}

impl PhysicsConstraintDefinition {
    pub fn new(kind: ConstraintKind, body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            kind,
            body_a,
            body_b,
            axis: DVec3::Y,
        }
    }

    pub fn with_axis(mut self, axis: DVec3) -> Self {
        self.axis = axis;
        self
    }
}

/// Solver knobs a world exposes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeTuning {
    pub solver_iterations: u32,
    /// `f64::INFINITY` requests unbounded friction.
    pub contact_friction: f64,
    pub contact_bounce: f64,
    pub contact_soft_cfm: f64,
    pub contact_bounce_velocity: f64,
}

impl Default for RuntimeTuning {
    fn default() -> Self {
        Self {
            solver_iterations: 20,
            contact_friction: f64::INFINITY,
            contact_bounce: 0.1,
            contact_soft_cfm: 1e-5,
            contact_bounce_velocity: 0.1,
        }
    }
}

impl RuntimeTuning {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.solver_iterations < 1 {
            return Err(PhysicsError::InvalidTuning("solver iterations must be >= 1"));
        }
        if self.contact_friction.is_nan() || self.contact_friction < 0.0 {
            return Err(PhysicsError::InvalidTuning("contact friction must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.contact_bounce) {
            return Err(PhysicsError::InvalidTuning("contact bounce must be within [0, 1]"));
        }
        if !self.contact_soft_cfm.is_finite() || self.contact_soft_cfm < 0.0 {
            return Err(PhysicsError::InvalidTuning("contact soft CFM must be finite and >= 0"));
        }
        if !self.contact_bounce_velocity.is_finite() || self.contact_bounce_velocity < 0.0 {
            return Err(PhysicsError::InvalidTuning(
                "contact bounce velocity must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Feature flags a world advertises to the hybrid capability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhysicsCapabilities {
    pub rigid_bodies: bool,
    pub n_body: bool,
}

impl PhysicsCapabilities {
    pub const EMPTY: Self = Self {
        rigid_bodies: false,
        n_body: false,
    };
}
