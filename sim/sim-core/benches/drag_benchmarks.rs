//! Benchmarks for stepping dragged bodies.
//!
//! Run with: cargo bench -p sim-core

#![allow(missing_docs, clippy::wildcard_imports, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::{Point2, Vector2};

use sim_core::{MassProperties, MouseJointDef, Pose, RigidBodyState, SimulationConfig, Stepper, World};

/// A row of boxes, each grabbed by a corner and pulled toward a point above it.
fn dragged_world(count: u32) -> World {
    let mut world = World::new(SimulationConfig::realtime());
    for i in 0..count {
        let x = f64::from(i) * 1.5;
        let body = world.add_body(
            RigidBodyState::at_rest(Pose::new(Point2::new(x, 0.0), 0.3)),
            MassProperties::box_shape(2.0, Vector2::new(0.5, 0.25)),
        );
        world
            .create_mouse_joint(
                &MouseJointDef::new(body)
                    .with_local_anchor(Point2::new(0.5, 0.25))
                    .with_target(Point2::new(x, 3.0))
                    .with_frequency(2.0, 5.0, 0.7)
                    .with_max_force(2000.0),
            )
            .unwrap();
    }
    world
}

fn bench_single_drag_step(c: &mut Criterion) {
    let mut world = dragged_world(1);
    let mut stepper = Stepper::new();

    c.bench_function("drag_step_single", |b| {
        b.iter(|| black_box(stepper.step(&mut world).unwrap()));
    });
}

fn bench_drag_step_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag_step_scaling");

    for count in [10_u32, 100, 1000] {
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = dragged_world(count);
            let mut stepper = Stepper::new();
            b.iter(|| black_box(stepper.step(&mut world).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_drag_step, bench_drag_step_scaling);
criterion_main!(benches);
