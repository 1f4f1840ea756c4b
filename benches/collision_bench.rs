use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hybrid_collide::{
    collision::{
        broadphase::{BroadPhase3D, BruteForce3D, SpatialHash3D, SweepAndPrune3D},
        narrowphase::Sat2D,
    },
    core::{Aabb, ConvexPolygon2D},
    hybrid::{
        CollisionShape, PhysicsBodyDefinition, PhysicsBodyState, PhysicsBodyType, PhysicsWorld,
        RigidBodyWorld,
    },
    DVec2, DVec3,
};
use std::hint::black_box;

const DT: f64 = 1.0 / 60.0;

fn scattered_boxes(count: usize) -> Vec<Aabb> {
    (0..count)
        .map(|i| {
            let x = (i % 32) as f64 * 0.9;
            let y = (i / 32) as f64 * 0.9;
            let z = ((i * 7) % 5) as f64 * 0.3;
            Aabb::from_center_half_extents(DVec3::new(x, y, z), DVec3::splat(0.5)).unwrap()
        })
        .collect()
}

fn bench_broad_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broad_phase");
    let hash = SpatialHash3D::new(2.0).unwrap();
    for &count in &[128usize, 512, 2048] {
        let boxes = scattered_boxes(count);
        let items: Vec<usize> = (0..count).collect();
        let bounds = |i: usize| boxes[i];
        group.bench_with_input(
            BenchmarkId::new("sweep_and_prune", count),
            &count,
            |b, _| b.iter(|| SweepAndPrune3D::new().find_potential_pairs(black_box(&items), &bounds)),
        );
        group.bench_with_input(BenchmarkId::new("spatial_hash", count), &count, |b, _| {
            b.iter(|| hash.find_potential_pairs(black_box(&items), &bounds))
        });
        if count <= 512 {
            group.bench_with_input(BenchmarkId::new("brute_force", count), &count, |b, _| {
                b.iter(|| BruteForce3D.find_potential_pairs(black_box(&items), &bounds))
            });
        }
    }
    group.finish();
}

fn regular_polygon(center: DVec2, sides: usize, rotation: f64) -> ConvexPolygon2D {
    let vertices = (0..sides)
        .map(|i| {
            let angle = rotation + std::f64::consts::TAU * i as f64 / sides as f64;
            center + DVec2::new(angle.cos(), angle.sin())
        })
        .collect();
    ConvexPolygon2D::new(vertices).unwrap()
}

fn bench_sat(c: &mut Criterion) {
    let mut group = c.benchmark_group("sat_2d");
    for &sides in &[4usize, 8, 16] {
        let a = regular_polygon(DVec2::ZERO, sides, 0.0);
        let b = regular_polygon(DVec2::new(1.2, 0.4), sides, 0.3);
        group.bench_with_input(BenchmarkId::new("overlapping", sides), &sides, |bench, _| {
            bench.iter(|| Sat2D::intersects_with_manifold(black_box(&a), black_box(&b)))
        });
    }
    group.finish();
}

fn prepare_world(body_count: usize, parallel: bool) -> RigidBodyWorld {
    let mut world = RigidBodyWorld::new().unwrap();
    world.set_gravity(DVec3::new(0.0, -9.81, 0.0)).unwrap();
    world.set_parallel_enabled(parallel);
    world
        .create_body(
            PhysicsBodyDefinition::new(
                PhysicsBodyType::Static,
                0.0,
                CollisionShape::cuboid(DVec3::new(100.0, 0.5, 100.0)).unwrap(),
                PhysicsBodyState::IDENTITY,
            )
            .unwrap(),
        )
        .unwrap();
    for i in 0..body_count {
        let position = DVec3::new(
            (i % 16) as f64 * 1.1,
            1.0 + (i / 256) as f64,
            ((i / 16) % 16) as f64 * 1.1,
        );
        world
            .create_body(
                PhysicsBodyDefinition::new(
                    PhysicsBodyType::Dynamic,
                    1.0,
                    CollisionShape::sphere(0.5).unwrap(),
                    PhysicsBodyState::at(position).unwrap(),
                )
                .unwrap(),
            )
            .unwrap();
    }
    world
}

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    for &count in &[128usize, 512] {
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            let mut world = prepare_world(count, false);
            b.iter(|| world.step(black_box(DT)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &count| {
            let mut world = prepare_world(count, true);
            b.iter(|| world.step(black_box(DT)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_broad_phase, bench_sat, bench_world_step);
criterion_main!(benches);
