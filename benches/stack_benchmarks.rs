//! 粒子模拟性能基准测试
//!
//! 测试模块栈求值和整帧推进在不同粒子数量下的性能

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec4;
use particle_engine::config::{EmitterSettings, ParticleIdSource};
use particle_engine::math::{BlendMode, Curve};
use particle_engine::particles::{
    CurveInput, CurveSource, Emitter, HostInputs, Module, Property, SystemProperty, ValueKind,
};

fn populated_emitter(count: usize) -> Emitter {
    let mut emitter = Emitter::new(
        "bench",
        EmitterSettings {
            max_particles: count,
            duration: 1000.0,
            particle_ids: ParticleIdSource::Seeded,
            ..Default::default()
        },
    );
    let stacks = &mut emitter.stacks;
    stacks.velocity.push(Module::value(
        "launch",
        Property::random_vector(Vec4::new(-1.0, 4.0, -1.0, 0.0), Vec4::new(1.0, 6.0, 1.0, 0.0)),
    ));
    stacks.acceleration.push(Module::value(
        "gravity",
        Property::vector(Vec4::new(0.0, -9.8, 0.0, 0.0)),
    ));
    stacks.color.push(Module::value(
        "fade",
        Property::curve(
            ValueKind::Vector,
            CurveSource::scalar(
                CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, 5.0),
                Curve::linear(1.0, 0.0),
            ),
        ),
    ));
    stacks.scale.push(
        Module::value("jitter", Property::random_vector(Vec4::splat(0.8), Vec4::splat(1.2)))
            .with_blend(BlendMode::Multiply),
    );
    emitter.emit(count);
    emitter
}

fn bench_emitter_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter_tick");
    let host = HostInputs::default();

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut emitter = populated_emitter(count);
            b.iter(|| {
                emitter.tick_standalone(black_box(1.0 / 60.0), &host);
            });
        });
    }

    group.finish();
}

fn bench_spawn_churn(c: &mut Criterion) {
    let host = HostInputs::default();
    c.bench_function("spawn_churn_1000", |b| {
        let mut emitter = populated_emitter(1000);
        emitter
            .stacks
            .death_condition
            .push(Module::value("die", Property::scalar(1.0)));
        emitter
            .stacks
            .spawn_rate
            .push(Module::value("rate", Property::scalar(60_000.0)));
        b.iter(|| {
            emitter.tick_standalone(black_box(1.0 / 60.0), &host);
            black_box(emitter.stats().spawned_this_tick)
        });
    });
}

criterion_group!(benches, bench_emitter_tick, bench_spawn_churn);
criterion_main!(benches);
