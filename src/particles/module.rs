//! 栈模块
//!
//! 模块是栈中的一个条目：产出一个值（或不产出），再按混合模式和权重
//! 与栈的当前值合并。模块可以带有逐粒子状态（采样缓存、事件边沿检测），
//! 这些状态按 `容量 + 1` 分配，最后一个槽位供发射器级求值使用。

use super::context::EvalContext;
use super::events::{
    EventCreatorModule, EventData, EventListenerModule, EventQueue, ListenerOutput,
};
use super::pool::SlotIndex;
use super::property::Property;
use super::sampler::{SampleCondition, SamplerModule, SamplerSource};
use crate::math::{BlendMode, ChannelElement};
use glam::Vec4;

/// 模块类型
#[derive(Debug, Clone)]
pub enum ModuleKind {
    /// 输出一个属性值
    Value(Property),
    Sampler(SamplerModule),
    /// 只发出事件，不改变栈值
    EventCreator(EventCreatorModule),
    EventListener(EventListenerModule),
}

/// 栈模块
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub enabled: bool,
    pub weight: Property,
    pub blend_mode: BlendMode,
    pub kind: ModuleKind,
    /// 辅助状态按此容量分配，最后一个槽位供发射器级求值
    state_capacity: Option<usize>,
}

impl Module {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            weight: Property::scalar(1.0),
            blend_mode: BlendMode::Normal,
            kind,
            state_capacity: None,
        }
    }

    pub fn value(name: impl Into<String>, value: Property) -> Self {
        Self::new(name, ModuleKind::Value(value))
    }

    pub fn sampler(name: impl Into<String>, sampler: SamplerModule) -> Self {
        Self::new(name, ModuleKind::Sampler(sampler))
    }

    pub fn event_creator(name: impl Into<String>, creator: EventCreatorModule) -> Self {
        Self::new(name, ModuleKind::EventCreator(creator))
    }

    pub fn event_listener(name: impl Into<String>, listener: EventListenerModule) -> Self {
        Self::new(name, ModuleKind::EventListener(listener))
    }

    pub fn with_blend(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_weight(mut self, weight: Property) -> Self {
        self.weight = weight;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// 发射器重置：重新分配逐粒子状态并清空事件计数
    pub fn on_pool_reset(&mut self, capacity: usize) {
        self.resize_state(capacity);
        match &mut self.kind {
            ModuleKind::EventCreator(creator) => creator.reset_state(),
            ModuleKind::EventListener(listener) => listener.reset_state(),
            ModuleKind::Value(_) | ModuleKind::Sampler(_) => {}
        }
    }

    fn resize_state(&mut self, capacity: usize) {
        self.state_capacity = Some(capacity);
        let len = capacity + 1;
        match &mut self.kind {
            ModuleKind::Sampler(sampler) => sampler.resize(len),
            ModuleKind::EventCreator(creator) => creator.resize(len),
            ModuleKind::Value(_) | ModuleKind::EventListener(_) => {}
        }
    }

    /// 新粒子占用槽位时清空该槽位的状态
    pub fn on_particle_spawned(&mut self, slot: SlotIndex) {
        match &mut self.kind {
            ModuleKind::Sampler(sampler) => sampler.reset_slot(slot),
            ModuleKind::EventCreator(creator) => creator.reset_slot(slot),
            ModuleKind::Value(_) | ModuleKind::EventListener(_) => {}
        }
    }

    pub fn on_loop_wrapped(&mut self) {
        match &mut self.kind {
            ModuleKind::EventCreator(creator) => creator.on_loop_wrapped(),
            ModuleKind::EventListener(listener) => listener.on_loop_wrapped(),
            ModuleKind::Value(_) | ModuleKind::Sampler(_) => {}
        }
    }

    /// 投递事件；返回是否被接受
    pub fn handle_event(&mut self, event: &EventData) -> bool {
        match &mut self.kind {
            ModuleKind::EventListener(listener) if self.enabled => listener.handle(event),
            _ => false,
        }
    }

    /// 对属性逐一执行回调（共享引用清理用）
    pub fn for_each_property_mut(&mut self, f: &mut dyn FnMut(&mut Property)) {
        f(&mut self.weight);
        match &mut self.kind {
            ModuleKind::Value(p) => f(p),
            ModuleKind::Sampler(sampler) => {
                if let SamplerSource::Property(p) = &mut sampler.source {
                    f(p);
                }
                if let SampleCondition::ByDirectValue(p) = &mut sampler.condition {
                    f(p);
                }
            }
            ModuleKind::EventCreator(creator) => {
                f(&mut creator.condition);
                creator.payload.iter_mut().for_each(|p| f(p));
            }
            ModuleKind::EventListener(listener) => {
                if let ListenerOutput::Value(p) = &mut listener.output {
                    f(p);
                }
            }
        }
    }

    /// 池重置之后加入的模块在第一次求值时分配状态
    fn ensure_state(&mut self, capacity: usize) {
        if self.state_capacity != Some(capacity) {
            self.resize_state(capacity);
        }
    }

    fn contribution(
        &mut self,
        slot: Option<SlotIndex>,
        ctx: &EvalContext<'_>,
        events: &mut EventQueue,
    ) -> Option<Vec4> {
        let state = slot.unwrap_or(ctx.particles.capacity());
        match &mut self.kind {
            ModuleKind::Value(property) => Some(property.get_value(slot, ctx)),
            ModuleKind::Sampler(sampler) => sampler.sample(state, slot, ctx),
            ModuleKind::EventCreator(creator) => {
                creator.update(state, slot, ctx, events);
                None
            }
            ModuleKind::EventListener(listener) => listener.contribution(slot, ctx),
        }
    }

    fn finish_pass(&mut self) {
        if let ModuleKind::EventListener(listener) = &mut self.kind {
            listener.finish_pass();
        }
    }

    /// 对所有活跃粒子求值并混合进 `values`
    pub fn evaluate<T: ChannelElement>(
        &mut self,
        values: &mut [T],
        active: &[SlotIndex],
        rotation: bool,
        ctx: &EvalContext<'_>,
        events: &mut EventQueue,
    ) {
        self.ensure_state(ctx.particles.capacity());
        for &index in active {
            let slot = Some(index);
            let Some(contribution) = self.contribution(slot, ctx, events) else {
                continue;
            };
            let weight = self.weight.get_scalar(slot, ctx);
            let Some(value) = values.get_mut(index) else {
                continue;
            };
            *value = T::blend(
                *value,
                T::from_vec4(contribution),
                weight,
                self.blend_mode,
                rotation,
            );
        }
        self.finish_pass();
    }

    /// 发射器级单值求值
    pub fn evaluate_single(
        &mut self,
        value: &mut f32,
        ctx: &EvalContext<'_>,
        events: &mut EventQueue,
    ) {
        self.ensure_state(ctx.particles.capacity());
        if let Some(contribution) = self.contribution(None, ctx, events) {
            let weight = self.weight.get_scalar(None, ctx);
            *value = f32::blend(*value, contribution.x, weight, self.blend_mode, false);
        }
        self.finish_pass();
    }
}
