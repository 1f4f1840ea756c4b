use approx::assert_relative_eq;
use glam::DVec3;
use hybrid_collide::{
    collision::{
        broadphase::SweepAndPrune3D,
        events::CollisionEventType,
        manifold::{CollisionManifold3D, ContactManifold3D, ContactPoint3D, WarmStartImpulse},
        pair::CollisionPair,
    },
    config::{SolverSettings, WorldSettings},
    core::Aabb,
    dynamics::{ContactSolver3D, RigidBodyAdapter3D},
    world::{CollisionSource3D, CollisionWorld3D},
};

#[derive(Debug, Clone, PartialEq)]
struct Body {
    position: DVec3,
    velocity: DVec3,
    half_extents: DVec3,
    inverse_mass: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Scene {
    bodies: Vec<Body>,
    restitution: f64,
}

impl Scene {
    fn add(&mut self, position: DVec3, half_extents: DVec3, inverse_mass: f64) -> usize {
        self.bodies.push(Body {
            position,
            velocity: DVec3::ZERO,
            half_extents,
            inverse_mass,
        });
        self.bodies.len() - 1
    }

    fn ids(&self) -> Vec<usize> {
        (0..self.bodies.len()).collect()
    }
}

impl CollisionSource3D<usize> for Scene {
    fn bounds(&self, body: usize) -> Aabb {
        let body = &self.bodies[body];
        Aabb::from_center_half_extents(body.position, body.half_extents).unwrap()
    }
}

impl RigidBodyAdapter3D<usize> for Scene {
    fn position(&self, body: usize) -> DVec3 {
        self.bodies[body].position
    }
    fn set_position(&mut self, body: usize, position: DVec3) {
        self.bodies[body].position = position;
    }
    fn velocity(&self, body: usize) -> DVec3 {
        self.bodies[body].velocity
    }
    fn set_velocity(&mut self, body: usize, velocity: DVec3) {
        self.bodies[body].velocity = velocity;
    }
    fn inverse_mass(&self, body: usize) -> f64 {
        self.bodies[body].inverse_mass
    }
    fn restitution(&self, _body: usize) -> f64 {
        self.restitution
    }
    fn friction(&self, _body: usize) -> f64 {
        0.4
    }
}

fn floor_and_box(box_y: f64) -> (Scene, usize) {
    let mut scene = Scene::default();
    scene.add(DVec3::ZERO, DVec3::new(5.0, 0.5, 5.0), 0.0);
    let bx = scene.add(DVec3::new(0.0, box_y, 0.0), DVec3::splat(0.5), 1.0);
    (scene, bx)
}

fn world_with(solver: SolverSettings, solver_iterations: u32) -> CollisionWorld3D<usize> {
    let settings = WorldSettings {
        solver,
        solver_iterations,
        ..WorldSettings::default()
    };
    CollisionWorld3D::with_settings(SweepAndPrune3D::new(), settings).unwrap()
}

fn contact(normal: DVec3, depth: f64) -> ContactManifold3D {
    ContactManifold3D::new(
        CollisionManifold3D::new(normal, depth).unwrap(),
        vec![ContactPoint3D::new(DVec3::ZERO).unwrap()],
    )
    .unwrap()
}

#[test]
fn shallow_contacts_do_not_move_bodies() {
    let (mut scene, _) = floor_and_box(0.9995);
    let before = scene.clone();
    let solver = ContactSolver3D::with_settings(SolverSettings {
        correction_percent: 0.8,
        slop: 0.001,
    })
    .unwrap();

    let applied = solver.solve_position(CollisionPair::new(0, 1), &contact(DVec3::Y, 0.0005), &mut scene);

    assert_eq!(applied, 0.0);
    assert_eq!(scene, before);
}

#[test]
fn immovable_pairs_are_left_alone() {
    let mut scene = Scene::default();
    scene.add(DVec3::ZERO, DVec3::splat(0.5), 0.0);
    scene.add(DVec3::new(0.5, 0.0, 0.0), DVec3::splat(0.5), 0.0);
    scene.bodies[1].velocity = DVec3::new(-3.0, 0.0, 0.0);
    let before = scene.clone();
    let solver = ContactSolver3D::new();

    solver.solve(CollisionPair::new(0, 1), &contact(DVec3::X, 0.5), &mut scene);
    let impulse = solver.solve_velocity(
        CollisionPair::new(0, 1),
        &contact(DVec3::X, 0.5),
        WarmStartImpulse::ZERO,
        &mut scene,
    );

    assert_eq!(scene, before);
    assert_eq!(impulse, WarmStartImpulse::ZERO);
}

#[test]
fn resting_box_settles_at_contact_height() {
    let (mut scene, bx) = floor_and_box(0.9);
    let mut world = world_with(
        SolverSettings {
            correction_percent: 1.0,
            slop: 0.0,
        },
        1,
    );
    let ids = scene.ids();

    let first = world.update(&ids, &mut scene);
    assert_eq!(first[0].kind, CollisionEventType::Enter);
    for _ in 0..30 {
        let events = world.update(&ids, &mut scene);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, CollisionEventType::Stay);
    }

    assert_relative_eq!(scene.bodies[bx].position.y, 1.0, epsilon = 1e-6);
    assert_eq!(scene.bodies[bx].velocity, DVec3::ZERO);
}

/// Total vertical travel after the first frame of a box released inside the floor.
fn resting_jitter(solver_iterations: u32) -> f64 {
    let (mut scene, bx) = floor_and_box(0.9);
    let mut world = world_with(
        SolverSettings {
            correction_percent: 0.8,
            slop: 0.0,
        },
        solver_iterations,
    );
    let ids = scene.ids();

    world.update(&ids, &mut scene);
    let mut previous = scene.bodies[bx].position.y;
    let mut travel = 0.0;
    for _ in 0..20 {
        world.update(&ids, &mut scene);
        let y = scene.bodies[bx].position.y;
        travel += (y - previous).abs();
        previous = y;
    }
    travel
}

#[test]
fn more_solver_iterations_reduce_resting_jitter() {
    let coarse = resting_jitter(1);
    let fine = resting_jitter(8);

    assert!(fine < coarse, "8 iterations: {fine}, 1 iteration: {coarse}");
    assert!(fine < 1e-6);
}

#[test]
fn bouncing_box_keeps_its_rebound_with_more_iterations() {
    for solver_iterations in [1, 8] {
        let (mut scene, bx) = floor_and_box(0.95);
        scene.restitution = 0.5;
        scene.bodies[bx].velocity = DVec3::new(0.0, -2.0, 0.0);
        let mut world = world_with(SolverSettings::default(), solver_iterations);
        let ids = scene.ids();

        world.update(&ids, &mut scene);

        assert_relative_eq!(scene.bodies[bx].velocity.y, 1.0, epsilon = 1e-12);
        assert_eq!(scene.bodies[0].velocity, DVec3::ZERO);
    }
}

#[test]
fn stepped_box_rebounds_off_the_floor() {
    let (mut scene, bx) = floor_and_box(1.5);
    scene.restitution = 0.8;
    scene.bodies[bx].velocity = DVec3::new(0.0, -6.0, 0.0);
    let mut world = world_with(SolverSettings::default(), 8);
    let ids = scene.ids();

    let mut rebounded = false;
    for _ in 0..30 {
        world.step(&ids, &mut scene, 1.0 / 60.0).unwrap();
        if scene.bodies[bx].velocity.y > 0.0 {
            rebounded = true;
            break;
        }
    }

    assert!(rebounded);
    assert_relative_eq!(scene.bodies[bx].velocity.y, 4.8, epsilon = 1e-12);
}

fn run_stack(parallel: bool) -> Scene {
    let mut scene = Scene::default();
    scene.add(DVec3::ZERO, DVec3::new(10.0, 0.5, 10.0), 0.0);
    for i in 0..6 {
        let offset = f64::from(i);
        let bx = scene.add(
            DVec3::new(offset * 0.13, 1.2 + offset * 1.05, -offset * 0.07),
            DVec3::splat(0.5),
            1.0 / (1.0 + offset),
        );
        scene.bodies[bx].velocity = DVec3::new(0.3 - offset * 0.1, 0.0, offset * 0.05);
    }
    let mut world = world_with(SolverSettings::default(), 4);
    world.set_parallel_enabled(parallel);
    world.set_gravity(DVec3::new(0.0, -9.81, 0.0)).unwrap();
    world.set_constraint_iterations(2).unwrap();
    let ids = scene.ids();
    for _ in 0..180 {
        world.step(&ids, &mut scene, 1.0 / 60.0).unwrap();
    }
    scene
}

#[test]
fn identical_runs_are_bit_identical() {
    let first = run_stack(false);
    let second = run_stack(false);

    assert_same_bits(&first, &second);
    assert!(first.bodies[1].position.y < 1.2);
}

#[test]
fn parallel_narrow_phase_matches_sequential_bits() {
    let sequential = run_stack(false);
    let parallel = run_stack(true);
    let repeated = run_stack(true);

    assert_same_bits(&sequential, &parallel);
    assert_same_bits(&parallel, &repeated);
}

fn assert_same_bits(first: &Scene, second: &Scene) {
    let bits = |v: DVec3| v.to_array().map(f64::to_bits);
    for (a, b) in first.bodies.iter().zip(&second.bodies) {
        assert_eq!(bits(a.position), bits(b.position));
        assert_eq!(bits(a.velocity), bits(b.velocity));
    }
}
