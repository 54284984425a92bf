use glam::{Vec3, Vec4};
use particle_engine::config::{init_logging, SimulationConfig};
use particle_engine::math::{BlendMode, Curve, HostTransform};
use particle_engine::particles::{
    CurveInput, CurveSource, EffectTree, Emitter, EventCreatorModule, EventListenerModule,
    HostInputs, ListenerOutput, Module, PointSpriteModule, Property, SystemProperty, ValueKind,
};
use particle_engine::ParticleResult;

/// 喷泉：粒子带重力上抛，两秒后死亡；每个粒子死亡时通知子发射器爆出火花
fn build_fountain(config: &SimulationConfig) -> ParticleResult<EffectTree> {
    let mut fountain =
        Emitter::new("fountain", config.emitter.clone()).with_integration(&config.integration);
    let stacks = &mut fountain.stacks;
    stacks.spawn_rate.push(Module::value("rate", Property::scalar(30.0)));
    stacks.velocity.push(Module::value(
        "launch",
        Property::random_vector(Vec4::new(-1.0, 6.0, -1.0, 0.0), Vec4::new(1.0, 8.0, 1.0, 0.0)),
    ));
    stacks
        .acceleration
        .push(Module::value("gravity", Property::vector(Vec4::new(0.0, -9.8, 0.0, 0.0))));
    let lifetime = CurveSource::scalar(
        CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, 2.0),
        Curve::linear(0.0, 1.0),
    );
    stacks
        .death_condition
        .push(Module::value("lifetime", Property::curve(ValueKind::Scalar, lifetime)));
    stacks.color.push(Module::value("tint", Property::vector(Vec4::new(0.4, 0.6, 1.0, 1.0))));
    stacks.custom_scalar.push(Module::event_creator(
        "on_death",
        EventCreatorModule::new(
            "splash",
            Property::curve(
                ValueKind::Scalar,
                CurveSource::scalar(
                    CurveInput::new(SystemProperty::DeathCondition),
                    Curve::linear(0.0, 1.0),
                ),
            ),
        )
        .with_payload(0, Property::vector(Vec4::ONE)),
    ));
    fountain.render.push(Box::new(PointSpriteModule::new("drops")));

    let mut sparks = Emitter::new("sparks", config.emitter.clone());
    sparks.stacks.spawn_rate.push(Module::value("idle", Property::scalar(0.0)));
    sparks.stacks.spawn_rate.push(
        Module::event_listener(
            "burst",
            EventListenerModule::new("splash", ListenerOutput::Value(Property::scalar(120.0))),
        )
        .with_blend(BlendMode::Add),
    );
    sparks.render.push(Box::new(PointSpriteModule::new("sparks")));

    let mut tree = EffectTree::new();
    let root = tree.add_root(fountain);
    tree.add_child(root, sparks)?;
    tree.reset(config.emitter.emitter_seed);
    Ok(tree)
}

fn run() -> ParticleResult<()> {
    let mut config = SimulationConfig::load_or_default();
    config.apply_env_overrides();
    config.validate()?;
    init_logging(&config.logging);

    let mut tree = build_fountain(&config)?;
    let host = HostInputs::with_emitter(HostTransform::from_position(Vec3::new(0.0, 1.0, 0.0)));
    let dt = 1.0 / 60.0;

    for frame in 0..600 {
        tree.tick(dt, &host);
        if frame % 60 == 0 {
            for (id, emitter) in tree.iter() {
                let stats = emitter.stats();
                let mesh = emitter.render_mesh(&host);
                tracing::info!(
                    target: "particles",
                    "frame {:>3} {:?} '{}': active={} spawned={} released={} vertices={}",
                    frame,
                    id,
                    emitter.name,
                    stats.active,
                    stats.total_spawned,
                    stats.released_this_tick,
                    mesh.vertex_count()
                );
            }
        }
    }

    tracing::info!(
        target: "particles",
        "Finished with {} live particle(s)",
        tree.active_particles()
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Particle demo failed: {}", e);
        std::process::exit(1);
    }
}
