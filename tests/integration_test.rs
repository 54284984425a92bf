use glam::Vec4;
use particle_engine::config::{EmitterSettings, ParticleIdSource, SimulationConfig};
use particle_engine::math::{BlendMode, Curve};
use particle_engine::particles::*;

fn settings(capacity: usize, duration: f32) -> EmitterSettings {
    EmitterSettings {
        max_particles: capacity,
        duration,
        particle_ids: ParticleIdSource::Seeded,
        ..Default::default()
    }
}

fn age_curve(max_age: f32) -> CurveSource {
    CurveSource::scalar(
        CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, max_age),
        Curve::linear(0.0, 1.0),
    )
    .with_output(0.0, max_age)
}

#[test]
fn test_pool_accounting_holds_every_tick() {
    let mut emitter = Emitter::new("churn", settings(32, 100.0));
    emitter
        .stacks
        .spawn_rate
        .push(Module::value("rate", Property::scalar(90.0)));
    // 0.2 秒后死亡
    emitter.stacks.death_condition.push(Module::value(
        "lifetime",
        Property::curve(
            ValueKind::Scalar,
            CurveSource::scalar(
                CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, 0.2),
                Curve::linear(0.0, 1.0),
            ),
        ),
    ));

    let host = HostInputs::default();
    let mut saw_release = false;
    for _ in 0..120 {
        emitter.tick_standalone(1.0 / 60.0, &host);
        let pool = emitter.pool();
        assert_eq!(pool.active_count() + pool.available_count(), pool.capacity());
        saw_release |= emitter.stats().released_this_tick > 0;
    }
    assert!(saw_release);
    assert!(emitter.stats().total_spawned > 32);
}

#[test]
fn test_module_order_changes_result() {
    let build = |first: Module, second: Module| {
        let mut emitter = Emitter::new("order", settings(4, 100.0));
        emitter
            .stacks
            .custom_scalar
            .push(Module::value("base", Property::scalar(5.0)))
            .push(first)
            .push(second);
        emitter.emit(1);
        emitter.tick_standalone(0.1, &HostInputs::default());
        let slot = emitter.pool().active_indices()[0];
        emitter.channels().custom_scalar[slot]
    };
    let add = || Module::value("add", Property::scalar(2.0)).with_blend(BlendMode::Add);
    let mul = || Module::value("mul", Property::scalar(3.0)).with_blend(BlendMode::Multiply);

    assert_eq!(build(add(), mul()), 21.0);
    assert_eq!(build(mul(), add()), 17.0);
}

#[test]
fn test_sampler_by_time_holds_between_samples() {
    let mut emitter = Emitter::new("sampled", settings(4, 100.0));
    emitter.stacks.custom_vector.push(Module::sampler(
        "age",
        SamplerModule::new(
            SamplerSource::Property(Property::curve(ValueKind::Scalar, age_curve(10.0))),
            SampleCondition::ByTime {
                interval: 1.0,
                offset: 0.0,
            },
        ),
    ));
    emitter.emit(1);

    let host = HostInputs::default();
    let mut observed = Vec::new();
    for _ in 0..9 {
        emitter.tick_standalone(0.25, &host);
        let slot = emitter.pool().active_indices()[0];
        observed.push(emitter.channels().custom_vector[slot].x);
    }
    let expected = [0.25, 0.25, 0.25, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0];
    for (got, want) in observed.iter().zip(expected) {
        assert!((got - want).abs() < 1e-4, "{:?}", observed);
    }
}

#[test]
fn test_listener_limited_to_one_trigger_per_loop() {
    let mut tree = EffectTree::new();
    let root = tree.add_root(Emitter::new("root", settings(4, 1.0)));
    let mut child = Emitter::new("child", settings(4, 1.0));
    child.stacks.custom_vector.push(Module::event_listener(
        "listen",
        EventListenerModule::new("hit", ListenerOutput::Payload(0)).with_max_trigger_count(1),
    ));
    tree.add_child(root, child).unwrap();

    let hit = EventData {
        name: "hit".into(),
        origin: None,
        payload: [Vec4::ONE; 4],
    };
    assert_eq!(tree.deliver(root, &[hit.clone(), hit.clone()]), 1);
    assert_eq!(tree.deliver(root, &[hit.clone()]), 0);

    let host = HostInputs::default();
    tree.tick(0.6, &host);
    tree.tick(0.6, &host);
    assert_eq!(tree.deliver(root, &[hit]), 1);
}

#[test]
fn test_authored_position_drives_velocity() {
    let mut emitter = Emitter::new("authored", settings(4, 100.0));
    // x = 2 * age
    let source = CurveSource::scalar(
        CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, 100.0),
        Curve::linear(0.0, 1.0),
    )
    .with_output(0.0, 200.0);
    emitter.stacks.position.push(Module::value(
        "track",
        Property::curve(ValueKind::Vector, source),
    ));
    emitter.emit(1);

    let host = HostInputs::default();
    for _ in 0..100 {
        emitter.tick_standalone(0.05, &host);
    }
    let slot = emitter.pool().active_indices()[0];
    let velocity = emitter.channels().velocity[slot];
    let acceleration = emitter.channels().acceleration[slot];
    assert!((velocity.x - 2.0).abs() < 1e-2, "velocity {velocity:?}");
    assert!(acceleration.x.abs() < 1e-2, "acceleration {acceleration:?}");
}

#[test]
fn test_config_round_trip_drives_emitter() -> anyhow::Result<()> {
    let toml = r#"
        [emitter]
        max_particles = 3
        duration = 2.0
        looping = true
        emitter_seed = 7
        time_scale = 1.0
        particle_ids = "Seeded"
    "#;
    let config = SimulationConfig::from_toml_str(toml)?;
    config.validate()?;

    let mut emitter = Emitter::new("configured", config.emitter.clone());
    emitter
        .stacks
        .spawn_rate
        .push(Module::value("rate", Property::scalar(100.0)));
    emitter.tick_standalone(0.1, &HostInputs::default());
    assert_eq!(emitter.pool().active_count(), 3);
    assert!(emitter.stats().exhausted_this_tick);
    Ok(())
}

#[test]
fn test_registry_modules_plug_into_stacks() {
    let Some(ModuleInstance::Stack(module)) = create_module("ColorValue") else {
        panic!("ColorValue should build a stack module");
    };
    let mut emitter = Emitter::new("registry", settings(2, 100.0));
    emitter.stacks.color.push(module);
    emitter.emit(1);
    emitter.tick_standalone(0.1, &HostInputs::default());
    let slot = emitter.pool().active_indices()[0];
    assert_eq!(emitter.channels().color[slot], Vec4::ONE);
}
