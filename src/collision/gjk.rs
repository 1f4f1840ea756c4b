use glam::DVec3;

use crate::{
    core::{
        bounds::{Aabb, BoundingSphere},
        error::GeometryError,
    },
    utils::math::any_perpendicular,
};

use super::manifold::CollisionManifold3D;

/// Convex shape described by its support mapping.
pub trait ConvexSupport3D {
    /// Farthest point of the shape along `direction`.
    fn support(&self, direction: DVec3) -> DVec3;
}

impl<S: ConvexSupport3D + ?Sized> ConvexSupport3D for &S {
    fn support(&self, direction: DVec3) -> DVec3 {
        (**self).support(direction)
    }
}

impl ConvexSupport3D for Aabb {
    fn support(&self, direction: DVec3) -> DVec3 {
        let (min, max) = (self.min(), self.max());
        DVec3::new(
            if direction.x >= 0.0 { max.x } else { min.x },
            if direction.y >= 0.0 { max.y } else { min.y },
            if direction.z >= 0.0 { max.z } else { min.z },
        )
    }
}

impl ConvexSupport3D for BoundingSphere {
    fn support(&self, direction: DVec3) -> DVec3 {
        let dir = if direction.length_squared() <= EPSILON {
            DVec3::X
        } else {
            direction.normalize()
        };
        self.center() + dir * self.radius()
    }
}

/// Convex hull of a point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull3D {
    points: Vec<DVec3>,
}

impl ConvexHull3D {
    pub fn new(points: Vec<DVec3>) -> Result<Self, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::TooFewVertices(0));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite("hull point"));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }
}

impl ConvexSupport3D for ConvexHull3D {
    fn support(&self, direction: DVec3) -> DVec3 {
        let mut best = self.points[0];
        let mut best_dot = best.dot(direction);
        for &point in &self.points[1..] {
            let dot = point.dot(direction);
            if dot > best_dot {
                best_dot = dot;
                best = point;
            }
        }
        best
    }
}

/// A shape shifted by a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct Translated<S> {
    pub shape: S,
    pub offset: DVec3,
}

impl<S: ConvexSupport3D> Translated<S> {
    pub fn new(shape: S, offset: DVec3) -> Self {
        Self { shape, offset }
    }
}

impl<S: ConvexSupport3D> ConvexSupport3D for Translated<S> {
    fn support(&self, direction: DVec3) -> DVec3 {
        self.shape.support(direction) + self.offset
    }
}

const EPSILON: f64 = 1e-9;
const EPA_TOLERANCE: f64 = 1e-6;

/// Gilbert-Johnson-Keerthi intersection test with EPA penetration recovery.
pub struct Gjk3D;

impl Gjk3D {
    pub const MAX_ITERATIONS: u32 = 32;
    pub const EPA_MAX_ITERATIONS: u32 = 48;

    pub fn intersects<A, B>(a: &A, b: &B) -> bool
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        Self::run(a, b, Self::MAX_ITERATIONS).is_some()
    }

    pub fn intersects_with_iterations<A, B>(
        a: &A,
        b: &B,
        max_iterations: u32,
    ) -> Result<bool, GeometryError>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        if max_iterations < 4 {
            return Err(GeometryError::TooFewIterations {
                name: "max_iterations",
                min: 4,
                value: max_iterations,
            });
        }
        Ok(Self::run(a, b, max_iterations).is_some())
    }

    /// Penetration normal (from `a` toward `b`) and depth. Empty when the shapes do not
    /// intersect or the polytope expansion does not converge.
    pub fn intersects_with_manifold<A, B>(a: &A, b: &B) -> Option<CollisionManifold3D>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let simplex = Self::run(a, b, Self::MAX_ITERATIONS)?;
        if simplex.len() < 4 {
            return None;
        }
        Epa::penetration(a, b, simplex)
    }

    /// Returns the terminating simplex on a hit.
    fn run<A, B>(a: &A, b: &B, max_iterations: u32) -> Option<Vec<DVec3>>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let first = minkowski_support(a, b, DVec3::X);
        let mut simplex = vec![first];
        let mut direction = -first;
        if direction.length_squared() <= EPSILON {
            direction = DVec3::Y;
        }

        for _ in 0..max_iterations {
            let point = minkowski_support(a, b, direction);
            if point.dot(direction) <= 0.0 {
                return None;
            }
            // Newest point first.
            simplex.insert(0, point);
            if Self::contains_origin(&mut simplex, &mut direction) {
                return Some(simplex);
            }
        }
        None
    }

    fn contains_origin(simplex: &mut Vec<DVec3>, direction: &mut DVec3) -> bool {
        match simplex.len() {
            2 => {
                Self::line_case(simplex, direction);
                false
            }
            3 => {
                Self::triangle_case(simplex, direction);
                false
            }
            4 => Self::tetrahedron_case(simplex, direction),
            _ => false,
        }
    }

    fn line_case(simplex: &mut Vec<DVec3>, direction: &mut DVec3) {
        let a = simplex[0];
        let ab = simplex[1] - a;
        let ao = -a;
        if ab.dot(ao) > 0.0 {
            *direction = toward_origin(ab, ao);
        } else {
            simplex.truncate(1);
            *direction = ao;
        }
    }

    fn triangle_case(simplex: &mut Vec<DVec3>, direction: &mut DVec3) {
        let (a, b, c) = (simplex[0], simplex[1], simplex[2]);
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let abc = ab.cross(ac);

        if ab.cross(abc).dot(ao) > 0.0 {
            *simplex = vec![a, b];
            *direction = toward_origin(ab, ao);
        } else if abc.cross(ac).dot(ao) > 0.0 {
            *simplex = vec![a, c];
            *direction = toward_origin(ac, ao);
        } else if abc.dot(ao) > 0.0 {
            *direction = abc;
        } else {
            *simplex = vec![a, c, b];
            *direction = -abc;
        }
    }

    fn tetrahedron_case(simplex: &mut Vec<DVec3>, direction: &mut DVec3) -> bool {
        let (a, b, c, d) = (simplex[0], simplex[1], simplex[2], simplex[3]);
        let ao = -a;

        for (p, q, opposite) in [(b, c, d), (c, d, b), (d, b, c)] {
            let mut normal = (p - a).cross(q - a);
            if normal.dot(opposite - a) > 0.0 {
                normal = -normal;
            }
            if normal.dot(ao) > 0.0 {
                *simplex = vec![a, p, q];
                Self::triangle_case(simplex, direction);
                return false;
            }
        }
        true
    }
}

fn minkowski_support<A, B>(a: &A, b: &B, direction: DVec3) -> DVec3
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    a.support(direction) - b.support(-direction)
}

/// Direction perpendicular to `edge`, in the plane of `edge` and `to_origin`.
fn toward_origin(edge: DVec3, to_origin: DVec3) -> DVec3 {
    let direction = edge.cross(to_origin).cross(edge);
    if direction.length_squared() <= EPSILON {
        any_perpendicular(edge)
    } else {
        direction
    }
}

/// Expanding Polytope Algorithm for penetration depth calculation.
struct Epa;

#[derive(Debug, Clone, Copy)]
struct Face {
    a: usize,
    b: usize,
    c: usize,
    normal: DVec3,
    distance: f64,
}

impl Face {
    fn new(a: usize, b: usize, c: usize, points: &[DVec3]) -> Self {
        let (pa, pb, pc) = (points[a], points[b], points[c]);
        let raw = (pb - pa).cross(pc - pa);
        let mut normal = if raw.length_squared() <= EPSILON {
            DVec3::X
        } else {
            raw.normalize()
        };
        let mut distance = normal.dot(pa);
        let (mut b, mut c) = (b, c);
        if distance < 0.0 {
            normal = -normal;
            distance = -distance;
            std::mem::swap(&mut b, &mut c);
        }
        Self {
            a,
            b,
            c,
            normal,
            distance,
        }
    }
}

impl Epa {
    fn penetration<A, B>(a: &A, b: &B, simplex: Vec<DVec3>) -> Option<CollisionManifold3D>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let mut points = simplex;
        let mut faces = vec![
            Face::new(0, 1, 2, &points),
            Face::new(0, 3, 1, &points),
            Face::new(0, 2, 3, &points),
            Face::new(1, 3, 2, &points),
        ];

        for _ in 0..Gjk3D::EPA_MAX_ITERATIONS {
            let closest = Self::closest_face(&faces)?;
            let support = minkowski_support(a, b, closest.normal);
            let support_distance = support.dot(closest.normal);

            if support_distance - closest.distance <= EPA_TOLERANCE {
                let normal = closest.normal.try_normalize()?;
                return CollisionManifold3D::new(normal, support_distance.max(0.0)).ok();
            }

            let support_index = points.len();
            points.push(support);

            let mut boundary: Vec<(usize, usize)> = Vec::new();
            faces.retain(|face| {
                let visible = face.normal.dot(support - points[face.a]) > EPSILON;
                if visible {
                    for edge in [(face.a, face.b), (face.b, face.c), (face.c, face.a)] {
                        add_boundary_edge(&mut boundary, edge);
                    }
                }
                !visible
            });

            for (from, to) in boundary {
                faces.push(Face::new(from, to, support_index, &points));
            }
            if faces.is_empty() {
                return None;
            }
        }
        None
    }

    fn closest_face(faces: &[Face]) -> Option<Face> {
        let mut iter = faces.iter();
        let mut best = *iter.next()?;
        for face in iter {
            if face.distance < best.distance {
                best = *face;
            }
        }
        Some(best)
    }
}

/// Shared edges cancel out; what remains is the horizon.
fn add_boundary_edge(boundary: &mut Vec<(usize, usize)>, edge: (usize, usize)) {
    if let Some(index) = boundary
        .iter()
        .position(|&(from, to)| from == edge.1 && to == edge.0)
    {
        boundary.remove(index);
    } else {
        boundary.push(edge);
    }
}
