use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::core::error::{ensure_finite, GeometryError};

const UNIT_TOLERANCE: f64 = 1e-6;

fn check_depth(depth: f64) -> Result<f64, GeometryError> {
    let depth = ensure_finite(depth, "penetration depth")?;
    if depth < 0.0 {
        return Err(GeometryError::NegativeDepth(depth));
    }
    Ok(depth)
}

fn check_unit(length: f64) -> Result<(), GeometryError> {
    if (length - 1.0).abs() > UNIT_TOLERANCE {
        return Err(GeometryError::NonUnitNormal(length));
    }
    Ok(())
}

/// Separating normal (pointing from A to B) and penetration depth in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawManifold<DVec2>")]
pub struct CollisionManifold2D {
    normal: DVec2,
    depth: f64,
}

impl CollisionManifold2D {
    pub fn new(normal: DVec2, depth: f64) -> Result<Self, GeometryError> {
        if !normal.is_finite() {
            return Err(GeometryError::NonFinite("manifold normal"));
        }
        check_unit(normal.length())?;
        Ok(Self {
            normal,
            depth: check_depth(depth)?,
        })
    }

    pub fn normal(&self) -> DVec2 {
        self.normal
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }
}

/// Separating normal (pointing from A to B) and penetration depth in space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawManifold<DVec3>")]
pub struct CollisionManifold3D {
    normal: DVec3,
    depth: f64,
}

impl CollisionManifold3D {
    pub fn new(normal: DVec3, depth: f64) -> Result<Self, GeometryError> {
        if !normal.is_finite() {
            return Err(GeometryError::NonFinite("manifold normal"));
        }
        check_unit(normal.length())?;
        Ok(Self {
            normal,
            depth: check_depth(depth)?,
        })
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }
}

/// World-space contact location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContactPoint")]
pub struct ContactPoint3D {
    pub position: DVec3,
}

impl ContactPoint3D {
    pub fn new(position: DVec3) -> Result<Self, GeometryError> {
        if !position.is_finite() {
            return Err(GeometryError::NonFinite("contact point"));
        }
        Ok(Self { position })
    }
}

/// Collision manifold plus the ordered contact points that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContactManifold")]
pub struct ContactManifold3D {
    manifold: CollisionManifold3D,
    contacts: Vec<ContactPoint3D>,
}

impl ContactManifold3D {
    pub fn new(
        manifold: CollisionManifold3D,
        contacts: Vec<ContactPoint3D>,
    ) -> Result<Self, GeometryError> {
        if contacts.is_empty() {
            return Err(GeometryError::NoContactPoints);
        }
        Ok(Self { manifold, contacts })
    }

    pub fn manifold(&self) -> &CollisionManifold3D {
        &self.manifold
    }

    pub fn normal(&self) -> DVec3 {
        self.manifold.normal()
    }

    pub fn depth(&self) -> f64 {
        self.manifold.depth()
    }

    pub fn contacts(&self) -> &[ContactPoint3D] {
        &self.contacts
    }
}

/// Accumulated impulses carried between frames for warm starting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWarmStart")]
pub struct WarmStartImpulse {
    normal_impulse: f64,
    tangent_impulse: f64,
}

impl WarmStartImpulse {
    pub const ZERO: Self = Self {
        normal_impulse: 0.0,
        tangent_impulse: 0.0,
    };

    pub fn new(normal_impulse: f64, tangent_impulse: f64) -> Result<Self, GeometryError> {
        Ok(Self {
            normal_impulse: ensure_finite(normal_impulse, "normal impulse")?,
            tangent_impulse: ensure_finite(tangent_impulse, "tangent impulse")?,
        })
    }

    /// Caller guarantees both values are finite.
    pub(crate) fn from_finite(normal_impulse: f64, tangent_impulse: f64) -> Self {
        debug_assert!(normal_impulse.is_finite() && tangent_impulse.is_finite());
        Self {
            normal_impulse,
            tangent_impulse,
        }
    }

    pub fn normal_impulse(&self) -> f64 {
        self.normal_impulse
    }

    pub fn tangent_impulse(&self) -> f64 {
        self.tangent_impulse
    }
}

impl Default for WarmStartImpulse {
    fn default() -> Self {
        Self::ZERO
    }
}

// Deserialized values go back through the checked constructors.

#[derive(Deserialize)]
struct RawManifold<V> {
    normal: V,
    depth: f64,
}

impl TryFrom<RawManifold<DVec2>> for CollisionManifold2D {
    type Error = GeometryError;

    fn try_from(raw: RawManifold<DVec2>) -> Result<Self, Self::Error> {
        Self::new(raw.normal, raw.depth)
    }
}

impl TryFrom<RawManifold<DVec3>> for CollisionManifold3D {
    type Error = GeometryError;

    fn try_from(raw: RawManifold<DVec3>) -> Result<Self, Self::Error> {
        Self::new(raw.normal, raw.depth)
    }
}

#[derive(Deserialize)]
struct RawContactPoint {
    position: DVec3,
}

impl TryFrom<RawContactPoint> for ContactPoint3D {
    type Error = GeometryError;

    fn try_from(raw: RawContactPoint) -> Result<Self, Self::Error> {
        Self::new(raw.position)
    }
}

#[derive(Deserialize)]
struct RawContactManifold {
    manifold: CollisionManifold3D,
    contacts: Vec<ContactPoint3D>,
}

impl TryFrom<RawContactManifold> for ContactManifold3D {
    type Error = GeometryError;

    fn try_from(raw: RawContactManifold) -> Result<Self, Self::Error> {
        Self::new(raw.manifold, raw.contacts)
    }
}

#[derive(Deserialize)]
struct RawWarmStart {
    normal_impulse: f64,
    tangent_impulse: f64,
}

impl TryFrom<RawWarmStart> for WarmStartImpulse {
    type Error = GeometryError;

    fn try_from(raw: RawWarmStart) -> Result<Self, Self::Error> {
        Self::new(raw.normal_impulse, raw.tangent_impulse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::Value;

    #[test]
    fn manifold_invariants_are_enforced() {
        assert!(CollisionManifold3D::new(DVec3::X, 0.5).is_ok());
        assert!(matches!(
            CollisionManifold3D::new(DVec3::new(2.0, 0.0, 0.0), 0.5),
            Err(GeometryError::NonUnitNormal(_))
        ));
        assert_eq!(
            CollisionManifold3D::new(DVec3::Y, -0.1),
            Err(GeometryError::NegativeDepth(-0.1))
        );
        assert!(CollisionManifold2D::new(DVec2::new(f64::NAN, 1.0), 0.0).is_err());
    }

    #[test]
    fn contact_manifold_needs_a_point() {
        let manifold = CollisionManifold3D::new(DVec3::Z, 0.0).unwrap();
        assert_eq!(
            ContactManifold3D::new(manifold, Vec::new()),
            Err(GeometryError::NoContactPoints)
        );
    }

    fn vector(components: [f64; 3]) -> Value {
        Value::Array(components.into_iter().map(Value::Float).collect())
    }

    fn entry(key: &str, value: Value) -> (Value, Value) {
        (Value::Text(key.to_owned()), value)
    }

    fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, String> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes).unwrap();
        ciborium::from_reader(bytes.as_slice()).map_err(|err| err.to_string())
    }

    #[test]
    fn decoding_rechecks_invariants() {
        let negative_depth = Value::Map(vec![
            entry("normal", vector([1.0, 0.0, 0.0])),
            entry("depth", Value::Float(-3.0)),
        ]);
        assert!(decode::<CollisionManifold3D>(&negative_depth).is_err());

        let long_normal = Value::Map(vec![
            entry("normal", vector([2.0, 0.0, 0.0])),
            entry("depth", Value::Float(0.5)),
        ]);
        assert!(decode::<CollisionManifold3D>(&long_normal).is_err());

        let no_points = Value::Map(vec![
            entry(
                "manifold",
                Value::Map(vec![
                    entry("normal", vector([0.0, 1.0, 0.0])),
                    entry("depth", Value::Float(0.1)),
                ]),
            ),
            entry("contacts", Value::Array(Vec::new())),
        ]);
        assert!(decode::<ContactManifold3D>(&no_points).is_err());
    }

    #[test]
    fn valid_manifolds_survive_encoding() {
        let contact = ContactManifold3D::new(
            CollisionManifold3D::new(DVec3::Y, 0.25).unwrap(),
            vec![ContactPoint3D::new(DVec3::new(1.0, 2.0, 3.0)).unwrap()],
        )
        .unwrap();
        let mut bytes = Vec::new();
        ciborium::into_writer(&contact, &mut bytes).unwrap();
        let decoded: ContactManifold3D = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, contact);
    }

    #[test]
    fn warm_start_rejects_non_finite() {
        assert!(WarmStartImpulse::new(f64::INFINITY, 0.0).is_err());
        assert_eq!(WarmStartImpulse::default(), WarmStartImpulse::ZERO);
    }
}
