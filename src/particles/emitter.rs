//! 发射器
//!
//! 发射器拥有一个固定容量的粒子池、所有通道数组和每个通道的模块栈，
//! 每帧按固定顺序驱动它们：
//!
//! 1. 推进时钟，跨越循环边界时重置事件计数
//! 2. 所有活跃粒子增加年龄
//! 3. 回收到达释放年龄的粒子
//! 4. 求值生成速率并累加，按累加器接纳新粒子
//! 5. 求值死亡条件和死亡时长，标记进入死亡的粒子
//! 6. 按声明顺序求值其余通道，每个通道之后执行多功能覆盖并分发事件
//! 7. 积分

use super::channel::{ChannelId, ChannelSet, ChannelShape, ParticleState};
use super::context::{
    EmitterClock, EmitterLookup, EvalContext, HostInputs, NoEmitters, ParameterSet,
};
use super::events::{EventData, EventQueue};
use super::integration::IntegrationState;
use super::module::Module;
use super::multi_function::MultiFunctionStack;
use super::pool::{ParticlePool, SlotIndex};
use super::property::Property;
use super::render::{Mesh, ParticleView, RenderStack};
use super::shared::{SharedHandle, SharedStack};
use super::stack::{ChannelStack, ScalarStack};
use super::tree::EmitterId;
use crate::config::{EmitterSettings, IntegrationConfig, ParticleIdSource};
use crate::math::RandomStream;
use glam::Vec4;

/// 每个通道一个模块栈
#[derive(Debug, Clone)]
pub struct EmitterStacks {
    pub spawn_rate: ScalarStack,
    pub death_condition: ChannelStack<f32>,
    pub death_duration: ChannelStack<f32>,
    pub custom_scalar: ChannelStack<f32>,
    pub custom_vector: ChannelStack<Vec4>,
    pub acceleration: ChannelStack<Vec4>,
    pub velocity: ChannelStack<Vec4>,
    pub position: ChannelStack<Vec4>,
    pub pivot_offset: ChannelStack<Vec4>,
    pub rotation_rate: ChannelStack<Vec4>,
    pub rotation: ChannelStack<Vec4>,
    pub scale: ChannelStack<Vec4>,
    pub color: ChannelStack<Vec4>,
}

impl Default for EmitterStacks {
    fn default() -> Self {
        Self {
            spawn_rate: ScalarStack::new(ChannelId::SpawnRate),
            death_condition: ChannelStack::new(ChannelId::DeathCondition),
            death_duration: ChannelStack::new(ChannelId::DeathDuration),
            custom_scalar: ChannelStack::new(ChannelId::CustomScalar),
            custom_vector: ChannelStack::new(ChannelId::CustomVector),
            acceleration: ChannelStack::new(ChannelId::Acceleration),
            velocity: ChannelStack::new(ChannelId::Velocity),
            position: ChannelStack::new(ChannelId::Position),
            pivot_offset: ChannelStack::new(ChannelId::PivotOffset),
            rotation_rate: ChannelStack::new(ChannelId::RotationRate),
            rotation: ChannelStack::new(ChannelId::Rotation),
            scale: ChannelStack::new(ChannelId::Scale),
            color: ChannelStack::new(ChannelId::Color),
        }
    }
}

impl EmitterStacks {
    pub fn float_stack_mut(&mut self, id: ChannelId) -> Option<&mut ChannelStack<f32>> {
        match id {
            ChannelId::DeathCondition => Some(&mut self.death_condition),
            ChannelId::DeathDuration => Some(&mut self.death_duration),
            ChannelId::CustomScalar => Some(&mut self.custom_scalar),
            _ => None,
        }
    }

    pub fn vector_stack_mut(&mut self, id: ChannelId) -> Option<&mut ChannelStack<Vec4>> {
        match id {
            ChannelId::CustomVector => Some(&mut self.custom_vector),
            ChannelId::Acceleration => Some(&mut self.acceleration),
            ChannelId::Velocity => Some(&mut self.velocity),
            ChannelId::Position => Some(&mut self.position),
            ChannelId::PivotOffset => Some(&mut self.pivot_offset),
            ChannelId::RotationRate => Some(&mut self.rotation_rate),
            ChannelId::Rotation => Some(&mut self.rotation),
            ChannelId::Scale => Some(&mut self.scale),
            ChannelId::Color => Some(&mut self.color),
            _ => None,
        }
    }

    /// 对所有栈中的所有模块执行回调
    pub fn for_each_module_mut(&mut self, f: &mut dyn FnMut(&mut Module)) {
        self.spawn_rate.modules_mut().iter_mut().for_each(&mut *f);
        for stack in [
            &mut self.death_condition,
            &mut self.death_duration,
            &mut self.custom_scalar,
        ] {
            stack.modules_mut().iter_mut().for_each(&mut *f);
        }
        for stack in [
            &mut self.custom_vector,
            &mut self.acceleration,
            &mut self.velocity,
            &mut self.position,
            &mut self.pivot_offset,
            &mut self.rotation_rate,
            &mut self.rotation,
            &mut self.scale,
            &mut self.color,
        ] {
            stack.modules_mut().iter_mut().for_each(&mut *f);
        }
    }

    fn on_pool_reset(&mut self, capacity: usize) {
        self.for_each_module_mut(&mut |m: &mut Module| m.on_pool_reset(capacity));
    }

    fn on_particle_spawned(&mut self, slot: SlotIndex) {
        self.for_each_module_mut(&mut |m: &mut Module| m.on_particle_spawned(slot));
    }

    fn on_loop_wrapped(&mut self) {
        self.for_each_module_mut(&mut |m: &mut Module| m.on_loop_wrapped());
    }

    /// 投递事件给所有栈；返回接受的监听者数量
    pub fn handle_event(&mut self, event: &EventData) -> usize {
        let mut accepted = 0;
        self.for_each_module_mut(&mut |m: &mut Module| {
            if m.handle_event(event) {
                accepted += 1;
            }
        });
        accepted
    }
}

/// 发射器统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmitterStats {
    /// 当前活跃粒子数
    pub active: usize,
    /// 本帧生成数
    pub spawned_this_tick: usize,
    /// 本帧回收数
    pub released_this_tick: usize,
    /// 总生成数
    pub total_spawned: u64,
    /// 本帧是否因池耗尽而推迟生成
    pub exhausted_this_tick: bool,
    /// 本帧发出的事件数
    pub events_this_tick: usize,
}

/// 求值期间只读的发射器状态
#[derive(Debug, Clone)]
struct EmitterCore {
    settings: EmitterSettings,
    smoothing: f32,
    id: Option<EmitterId>,
    parent: Option<EmitterId>,
    clock: EmitterClock,
    pool: ParticlePool,
    particles: ParticleState,
    channels: ChannelSet,
    shared: SharedStack,
    parameters: ParameterSet,
}

impl EmitterCore {
    fn context<'a>(
        &'a self,
        dt: f32,
        host: &'a HostInputs,
        emitters: &'a dyn EmitterLookup,
    ) -> EvalContext<'a> {
        EvalContext {
            dt,
            clock: self.clock,
            emitter_seed: self.settings.emitter_seed,
            emitter_id: self.id,
            parent_id: self.parent,
            host,
            channels: &self.channels,
            particles: &self.particles,
            shared: &self.shared,
            parameters: &self.parameters,
            emitters,
        }
    }
}

fn id_stream(settings: &EmitterSettings) -> RandomStream {
    match settings.particle_ids {
        ParticleIdSource::Entropy => RandomStream::from_entropy(),
        ParticleIdSource::Seeded => RandomStream::from_seed(settings.emitter_seed),
    }
}

/// 粒子发射器
#[derive(Debug)]
pub struct Emitter {
    pub name: String,
    pub stacks: EmitterStacks,
    pub multi_function: MultiFunctionStack,
    pub render: RenderStack,
    core: EmitterCore,
    integration: IntegrationState,
    spawn_accumulator: f32,
    id_stream: RandomStream,
    scratch_floats: Vec<f32>,
    scratch_vectors: Vec<Vec4>,
    reap_buffer: Vec<SlotIndex>,
    outbox: EventQueue,
    forwarded: Vec<EventData>,
    stats: EmitterStats,
}

impl Emitter {
    pub fn new(name: impl Into<String>, settings: EmitterSettings) -> Self {
        let capacity = settings.max_particles;
        let name = name.into();
        tracing::debug!(
            target: "particles",
            "Creating emitter '{}' (capacity {}, seed {})",
            name,
            capacity,
            settings.emitter_seed
        );
        Self {
            name,
            stacks: EmitterStacks::default(),
            multi_function: MultiFunctionStack::default(),
            render: RenderStack::default(),
            id_stream: id_stream(&settings),
            core: EmitterCore {
                smoothing: IntegrationConfig::default().acceleration_smoothing,
                id: None,
                parent: None,
                clock: EmitterClock::default(),
                pool: ParticlePool::new(capacity),
                particles: ParticleState::new(capacity),
                channels: ChannelSet::new(capacity),
                shared: SharedStack::default(),
                parameters: ParameterSet::default(),
                settings,
            },
            integration: IntegrationState::new(capacity),
            spawn_accumulator: 0.0,
            scratch_floats: Vec::with_capacity(capacity),
            scratch_vectors: Vec::with_capacity(capacity),
            reap_buffer: Vec::new(),
            outbox: EventQueue::default(),
            forwarded: Vec::new(),
            stats: EmitterStats::default(),
        }
    }

    pub fn with_integration(mut self, config: &IntegrationConfig) -> Self {
        self.core.smoothing = config.acceleration_smoothing;
        self
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.core.settings
    }

    pub fn clock(&self) -> &EmitterClock {
        &self.core.clock
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.core.pool
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.core.channels
    }

    pub fn particles(&self) -> &ParticleState {
        &self.core.particles
    }

    pub fn stats(&self) -> &EmitterStats {
        &self.stats
    }

    pub fn spawn_accumulator(&self) -> f32 {
        self.spawn_accumulator
    }

    pub fn shared(&self) -> &SharedStack {
        &self.core.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedStack {
        &mut self.core.shared
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.core.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.core.parameters
    }

    pub fn id(&self) -> Option<EmitterId> {
        self.core.id
    }

    pub fn parent(&self) -> Option<EmitterId> {
        self.core.parent
    }

    pub(crate) fn attach(&mut self, id: EmitterId, parent: Option<EmitterId>) {
        self.core.id = Some(id);
        self.core.parent = parent;
    }

    /// 重置池和所有运行状态，使用新的发射器种子
    pub fn reset(&mut self, seed: i32) {
        self.core.settings.emitter_seed = seed;
        let capacity = self.core.settings.max_particles;
        self.core.clock.reset();
        self.core.pool = ParticlePool::new(capacity);
        self.core.particles = ParticleState::new(capacity);
        self.core.channels = ChannelSet::new(capacity);
        self.integration = IntegrationState::new(capacity);
        self.spawn_accumulator = 0.0;
        self.id_stream = id_stream(&self.core.settings);
        self.outbox = EventQueue::default();
        self.forwarded.clear();
        self.stats = EmitterStats::default();
        self.stacks.on_pool_reset(capacity);
        tracing::debug!(
            target: "particles",
            "Emitter '{}' reset (capacity {}, seed {})",
            self.name,
            capacity,
            seed
        );
    }

    /// 修改池容量；所有粒子被清除
    pub fn set_capacity(&mut self, capacity: usize) {
        self.core.settings.max_particles = capacity;
        self.reset(self.core.settings.emitter_seed);
    }

    /// 没有发射器层级时的单帧推进
    pub fn tick_standalone(&mut self, dt: f32, host: &HostInputs) -> Vec<EventData> {
        self.tick(dt, host, &NoEmitters)
    }

    /// 推进一帧；返回本帧发出、需要继续在层级中分发的事件
    pub fn tick(
        &mut self,
        dt: f32,
        host: &HostInputs,
        emitters: &dyn EmitterLookup,
    ) -> Vec<EventData> {
        let dt = (dt * self.core.settings.time_scale).max(0.0);
        self.stats = EmitterStats {
            total_spawned: self.stats.total_spawned,
            ..Default::default()
        };

        let (duration, looping) = (self.core.settings.duration, self.core.settings.looping);
        if self.core.clock.advance(dt, duration, looping) {
            self.stacks.on_loop_wrapped();
            tracing::trace!(
                target: "particles",
                "Emitter '{}' entered loop {}",
                self.name,
                self.core.clock.loop_index
            );
        }

        let core = &mut self.core;
        for &i in core.pool.active_indices() {
            core.particles.age[i] += dt;
        }
        self.reap();

        let rate = self.evaluate_spawn_rate(dt, host, emitters);
        let finished = !looping && self.core.clock.time >= duration;
        if !finished {
            self.spawn_accumulator += rate.max(0.0) * dt;
        }
        self.admit_spawns();

        self.evaluate_float_channel(ChannelId::DeathCondition, dt, host, emitters);
        self.evaluate_float_channel(ChannelId::DeathDuration, dt, host, emitters);
        self.mark_dying();

        for id in ChannelId::EVALUATION_ORDER {
            match id.shape() {
                ChannelShape::FloatArray => self.evaluate_float_channel(id, dt, host, emitters),
                ChannelShape::VectorArray => self.evaluate_vector_channel(id, dt, host, emitters),
                ChannelShape::Scalar => {}
            }
        }

        let core = &mut self.core;
        self.integration
            .integrate(&mut core.channels, core.pool.active_indices(), dt, core.smoothing);

        self.stats.active = self.core.pool.active_count();
        tracing::trace!(
            target: "particles",
            "Emitter '{}' tick: active={} spawned={} released={} events={}",
            self.name,
            self.stats.active,
            self.stats.spawned_this_tick,
            self.stats.released_this_tick,
            self.stats.events_this_tick
        );
        std::mem::take(&mut self.forwarded)
    }

    /// 立即生成最多 `count` 个粒子；返回实际生成数
    pub fn emit(&mut self, count: usize) -> usize {
        let mut spawned = 0;
        while spawned < count {
            match self.core.pool.acquire() {
                Ok(index) => {
                    self.initialize_particle(index);
                    spawned += 1;
                }
                Err(err) => {
                    tracing::debug!(target: "particles.pool", "Emitter '{}': {}", self.name, err);
                    self.stats.exhausted_this_tick = true;
                    break;
                }
            }
        }
        self.stats.active = self.core.pool.active_count();
        spawned
    }

    /// 投递来自其他发射器的事件；返回接受的监听者数量
    pub fn handle_event(&mut self, event: &EventData) -> usize {
        self.stacks.handle_event(event)
    }

    /// 移除共享属性，并把所有引用它的属性改回常量模式
    pub fn remove_shared(&mut self, handle: SharedHandle) -> Option<Property> {
        let removed = self.core.shared.remove(handle)?;
        let mut rewritten = 0usize;
        let mut detach = |p: &mut Property| {
            if p.references(handle) {
                p.detach_reference();
                rewritten += 1;
            }
        };
        self.stacks
            .for_each_module_mut(&mut |m: &mut Module| m.for_each_property_mut(&mut detach));
        for module in self.multi_function.modules_mut() {
            module.for_each_property_mut(&mut detach);
        }
        tracing::debug!(
            target: "particles",
            "Emitter '{}' removed shared property '{}', {} reference(s) rewritten",
            self.name,
            removed.name,
            rewritten
        );
        Some(removed)
    }

    /// 按种子确定性地挑选一个活跃粒子
    pub fn sample_particle(&self, seed: i32) -> Option<SlotIndex> {
        let active = self.core.pool.active_indices();
        RandomStream::from_seed(seed)
            .next_index(active.len())
            .and_then(|i| active.get(i).copied())
    }

    /// 按粒子ID查找活跃粒子
    pub fn particle_by_id(&self, particle_id: i32) -> Option<SlotIndex> {
        self.core
            .pool
            .active_indices()
            .iter()
            .copied()
            .find(|&i| self.core.particles.particle_id[i] == particle_id)
    }

    /// 渲染消费者使用的只读快照
    pub fn view<'a>(&'a self, host: &'a HostInputs) -> ParticleView<'a> {
        let channels = &self.core.channels;
        ParticleView {
            active: self.core.pool.active_indices(),
            position: &channels.position,
            rotation: &channels.rotation,
            scale: &channels.scale,
            color: &channels.color,
            pivot_offset: &channels.pivot_offset,
            custom_vector: &channels.custom_vector,
            emitter: &host.emitter,
        }
    }

    /// 合成渲染栈
    pub fn render_mesh(&self, host: &HostInputs) -> Mesh {
        self.render.composite(&self.view(host))
    }

    fn reap(&mut self) {
        let core = &mut self.core;
        self.reap_buffer.clear();
        self.reap_buffer.extend(
            core.pool
                .active_indices()
                .iter()
                .copied()
                .filter(|&i| core.particles.is_expired(i)),
        );
        for &index in &self.reap_buffer {
            match core.pool.release(index) {
                Ok(()) => self.stats.released_this_tick += 1,
                Err(err) => {
                    tracing::error!(target: "particles.pool", "Emitter '{}': {}", self.name, err)
                }
            }
        }
    }

    fn admit_spawns(&mut self) {
        while self.spawn_accumulator >= 1.0 {
            match self.core.pool.acquire() {
                Ok(index) => {
                    self.spawn_accumulator -= 1.0;
                    self.initialize_particle(index);
                }
                Err(err) => {
                    tracing::debug!(
                        target: "particles.pool",
                        "Emitter '{}': {}, deferring {:.2} spawn(s)",
                        self.name,
                        err,
                        self.spawn_accumulator
                    );
                    self.stats.exhausted_this_tick = true;
                    break;
                }
            }
        }
        self.spawn_accumulator = self
            .spawn_accumulator
            .min(self.core.pool.capacity() as f32);
    }

    fn initialize_particle(&mut self, index: SlotIndex) {
        let particle_id = self.id_stream.next_i32();
        self.core.particles.spawn(index, particle_id);
        self.core.channels.clear_slot(index);
        self.integration.reset_slot(index);
        self.stacks.on_particle_spawned(index);
        self.stats.spawned_this_tick += 1;
        self.stats.total_spawned += 1;
    }

    fn mark_dying(&mut self) {
        let core = &mut self.core;
        for &i in core.pool.active_indices() {
            if core.particles.is_dying(i) || core.channels.death_condition[i] < 1.0 {
                continue;
            }
            let duration = core.channels.death_duration[i].max(0.0);
            core.particles.dying_at[i] = core.particles.age[i] + duration;
        }
    }

    fn evaluate_spawn_rate(
        &mut self,
        dt: f32,
        host: &HostInputs,
        emitters: &dyn EmitterLookup,
    ) -> f32 {
        let rate = {
            let ctx = self.core.context(dt, host, emitters);
            let mut rate = self.stacks.spawn_rate.evaluate(&ctx, &mut self.outbox);
            self.multi_function
                .apply_scalar(ChannelId::SpawnRate, &mut rate, &ctx);
            rate
        };
        self.core.channels.spawn_rate = rate;
        self.dispatch_local_events();
        rate
    }

    fn evaluate_float_channel(
        &mut self,
        id: ChannelId,
        dt: f32,
        host: &HostInputs,
        emitters: &dyn EmitterLookup,
    ) {
        let Some(stack) = self.stacks.float_stack_mut(id) else {
            return;
        };
        // 折叠进暂存数组，求值期间读取本通道得到上一帧的值
        let mut working = std::mem::take(&mut self.scratch_floats);
        working.resize(self.core.pool.capacity(), 0.0);
        {
            let ctx = self.core.context(dt, host, emitters);
            let active = self.core.pool.active_indices();
            stack.evaluate(&mut working, active, &ctx, &mut self.outbox);
            self.multi_function.apply(id, &mut working, active, &ctx);
        }
        if let Some(values) = self.core.channels.floats_mut(id) {
            std::mem::swap(values, &mut working);
        }
        self.scratch_floats = working;
        self.dispatch_local_events();
    }

    fn evaluate_vector_channel(
        &mut self,
        id: ChannelId,
        dt: f32,
        host: &HostInputs,
        emitters: &dyn EmitterLookup,
    ) {
        let Some(stack) = self.stacks.vector_stack_mut(id) else {
            return;
        };
        let mut working = std::mem::take(&mut self.scratch_vectors);
        working.resize(self.core.pool.capacity(), Vec4::ZERO);
        {
            let ctx = self.core.context(dt, host, emitters);
            let active = self.core.pool.active_indices();
            stack.evaluate(&mut working, active, &ctx, &mut self.outbox);
            self.multi_function.apply(id, &mut working, active, &ctx);
        }
        if let Some(values) = self.core.channels.vectors_mut(id) {
            std::mem::swap(values, &mut working);
        }
        self.scratch_vectors = working;
        self.dispatch_local_events();
    }

    /// 本发射器的监听者在发出事件的栈求值完成后立即收到事件
    fn dispatch_local_events(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let events: Vec<EventData> = self.outbox.drain().collect();
        for event in &events {
            let accepted = self.stacks.handle_event(event);
            tracing::trace!(
                target: "particles.events",
                "Emitter '{}' raised '{}' (origin {:?}), {} local listener(s) accepted",
                self.name,
                event.name,
                event.origin,
                accepted
            );
        }
        self.stats.events_this_tick += events.len();
        self.forwarded.extend(events);
    }
}
