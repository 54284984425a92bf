//! 事件总线
//!
//! 创建者模块在条件越过 1 时发出命名事件，携带 4 个向量负载；
//! 监听者模块按名称订阅。发射器先把事件分发给自身的监听者，
//! 再由 [`super::tree::EffectTree`] 广度优先分发给同一棵树里的其他发射器。
//! 每次循环（loop time 从 1 回绕到 0）重置触发计数。

use super::context::EvalContext;
use super::pool::SlotIndex;
use super::property::Property;
use glam::Vec4;

/// 事件数据，只在当帧分发期间存在
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub name: String,
    /// 发出事件的粒子，发射器级事件为 `None`
    pub origin: Option<SlotIndex>,
    pub payload: [Vec4; 4],
}

/// 待分发事件队列
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<EventData>,
}

impl EventQueue {
    pub fn raise(
        &mut self,
        name: impl Into<String>,
        origin: Option<SlotIndex>,
        payload: [Vec4; 4],
    ) {
        self.events.push(EventData {
            name: name.into(),
            origin,
            payload,
        });
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, EventData> {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// 事件创建者模块
///
/// 逐粒子检测条件属性从 <1 越过到 >=1 的边沿。
#[derive(Debug, Clone)]
pub struct EventCreatorModule {
    pub event_name: String,
    pub condition: Property,
    pub payload: [Property; 4],
    /// 每次循环最多发出的事件数，0 表示不限
    pub max_trigger_count: u32,
    /// 两次事件之间的最小间隔（发射器时间，秒）
    pub min_delay: f32,
    trigger_count: u32,
    last_event_time: Option<f32>,
    previous: Vec<f32>,
}

impl EventCreatorModule {
    pub fn new(event_name: impl Into<String>, condition: Property) -> Self {
        Self {
            event_name: event_name.into(),
            condition,
            payload: [
                Property::vector(Vec4::ZERO),
                Property::vector(Vec4::ZERO),
                Property::vector(Vec4::ZERO),
                Property::vector(Vec4::ZERO),
            ],
            max_trigger_count: 0,
            min_delay: 0.0,
            trigger_count: 0,
            last_event_time: None,
            previous: Vec::new(),
        }
    }

    pub fn with_payload(mut self, slot: usize, property: Property) -> Self {
        if let Some(p) = self.payload.get_mut(slot) {
            *p = property;
        }
        self
    }

    pub fn with_limits(mut self, max_trigger_count: u32, min_delay: f32) -> Self {
        self.max_trigger_count = max_trigger_count;
        self.min_delay = min_delay;
        self
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub(crate) fn resize(&mut self, state_len: usize) {
        self.previous = vec![0.0; state_len];
    }

    /// 发射器重置时清空计数和上次事件时间
    pub(crate) fn reset_state(&mut self) {
        self.trigger_count = 0;
        self.last_event_time = None;
    }

    pub(crate) fn reset_slot(&mut self, state: usize) {
        if let Some(p) = self.previous.get_mut(state) {
            *p = 0.0;
        }
    }

    pub(crate) fn on_loop_wrapped(&mut self) {
        self.trigger_count = 0;
    }

    pub(crate) fn update(
        &mut self,
        state: usize,
        slot: Option<SlotIndex>,
        ctx: &EvalContext<'_>,
        events: &mut EventQueue,
    ) {
        let value = self.condition.get_scalar(slot, ctx);
        let previous = match self.previous.get_mut(state) {
            Some(p) => std::mem::replace(p, value),
            None => return,
        };
        if !(previous < 1.0 && value >= 1.0) {
            return;
        }

        if self.max_trigger_count > 0 && self.trigger_count >= self.max_trigger_count {
            tracing::debug!(
                target: "particles.events",
                "Event '{}' suppressed: trigger limit {} reached this loop",
                self.event_name,
                self.max_trigger_count
            );
            return;
        }
        if let Some(last) = self.last_event_time {
            if ctx.clock.time - last < self.min_delay {
                return;
            }
        }

        self.trigger_count += 1;
        self.last_event_time = Some(ctx.clock.time);
        let payload = [
            self.payload[0].get_value(slot, ctx),
            self.payload[1].get_value(slot, ctx),
            self.payload[2].get_value(slot, ctx),
            self.payload[3].get_value(slot, ctx),
        ];
        events.raise(self.event_name.clone(), slot, payload);
    }
}

/// 监听者的输出
#[derive(Debug, Clone)]
pub enum ListenerOutput {
    /// 输出事件负载中的某个槽位
    Payload(usize),
    /// 收到事件时输出自身属性
    Value(Property),
}

/// 事件监听者模块
#[derive(Debug, Clone)]
pub struct EventListenerModule {
    pub event_name: String,
    /// 每次循环最多接受的事件数，0 表示不限
    pub max_trigger_count: u32,
    pub output: ListenerOutput,
    /// 为 true 时持续输出最后一次事件，否则只在接受事件后的下一次求值输出
    pub hold: bool,
    trigger_count: u32,
    received: Option<EventData>,
    fresh: bool,
}

impl EventListenerModule {
    pub fn new(event_name: impl Into<String>, output: ListenerOutput) -> Self {
        Self {
            event_name: event_name.into(),
            max_trigger_count: 0,
            output,
            hold: false,
            trigger_count: 0,
            received: None,
            fresh: false,
        }
    }

    pub fn with_max_trigger_count(mut self, count: u32) -> Self {
        self.max_trigger_count = count;
        self
    }

    pub fn holding(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub fn last_event(&self) -> Option<&EventData> {
        self.received.as_ref()
    }

    /// 处理事件；返回是否被接受
    pub fn handle(&mut self, event: &EventData) -> bool {
        if event.name != self.event_name {
            return false;
        }
        if self.max_trigger_count > 0 && self.trigger_count >= self.max_trigger_count {
            tracing::debug!(
                target: "particles.events",
                "Listener for '{}' ignored event: already triggered {} time(s) this loop",
                self.event_name,
                self.trigger_count
            );
            return false;
        }
        self.trigger_count += 1;
        self.received = Some(event.clone());
        self.fresh = true;
        true
    }

    pub(crate) fn on_loop_wrapped(&mut self) {
        self.trigger_count = 0;
    }

    pub(crate) fn reset_state(&mut self) {
        self.trigger_count = 0;
        self.received = None;
        self.fresh = false;
    }

    pub(crate) fn contribution(
        &self,
        slot: Option<SlotIndex>,
        ctx: &EvalContext<'_>,
    ) -> Option<Vec4> {
        if !(self.fresh || self.hold) {
            return None;
        }
        let event = self.received.as_ref()?;
        Some(match &self.output {
            ListenerOutput::Payload(i) => event.payload.get(*i).copied().unwrap_or(Vec4::ZERO),
            ListenerOutput::Value(property) => property.get_value(slot, ctx),
        })
    }

    pub(crate) fn finish_pass(&mut self) {
        self.fresh = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::channel::{ChannelSet, ParticleState};
    use crate::particles::context::{EmitterClock, HostInputs, NoEmitters, ParameterSet};
    use crate::particles::shared::SharedStack;

    struct Fixture {
        host: HostInputs,
        channels: ChannelSet,
        particles: ParticleState,
        shared: SharedStack,
        parameters: ParameterSet,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                host: HostInputs::default(),
                channels: ChannelSet::new(1),
                particles: ParticleState::new(1),
                shared: SharedStack::default(),
                parameters: ParameterSet::default(),
            }
        }

        /// 先把条件拉低再拉到 1，返回发出的事件数
        fn pulse(&self, creator: &mut EventCreatorModule, time: f32) -> usize {
            let ctx = EvalContext {
                dt: 0.1,
                clock: EmitterClock {
                    time,
                    ..Default::default()
                },
                emitter_seed: 0,
                emitter_id: None,
                parent_id: None,
                host: &self.host,
                channels: &self.channels,
                particles: &self.particles,
                shared: &self.shared,
                parameters: &self.parameters,
                emitters: &NoEmitters,
            };
            let mut queue = EventQueue::default();
            creator.condition = Property::scalar(0.0);
            creator.update(0, None, &ctx, &mut queue);
            creator.condition = Property::scalar(1.0);
            creator.update(0, None, &ctx, &mut queue);
            queue.len()
        }
    }

    fn event(name: &str) -> EventData {
        EventData {
            name: name.to_string(),
            origin: None,
            payload: [Vec4::ONE, Vec4::splat(2.0), Vec4::ZERO, Vec4::ZERO],
        }
    }

    #[test]
    fn test_listener_filters_by_name() {
        let mut listener = EventListenerModule::new("burst", ListenerOutput::Payload(1));
        assert!(!listener.handle(&event("other")));
        assert!(listener.handle(&event("burst")));
        assert_eq!(listener.trigger_count(), 1);
        assert_eq!(listener.last_event().unwrap().payload[1], Vec4::splat(2.0));
    }

    #[test]
    fn test_listener_trigger_limit_per_loop() {
        let mut listener =
            EventListenerModule::new("burst", ListenerOutput::Payload(0)).with_max_trigger_count(1);
        assert!(listener.handle(&event("burst")));
        assert!(!listener.handle(&event("burst")));
        assert_eq!(listener.trigger_count(), 1);

        listener.on_loop_wrapped();
        assert!(listener.handle(&event("burst")));
    }

    #[test]
    fn test_creator_limits_across_loop_wrap() {
        let fixture = Fixture::new();
        let mut creator =
            EventCreatorModule::new("spark", Property::scalar(0.0)).with_limits(2, 0.5);
        creator.resize(2);

        assert_eq!(fixture.pulse(&mut creator, 0.1), 1);
        // 距上次事件不足 0.5 秒
        assert_eq!(fixture.pulse(&mut creator, 0.3), 0);
        assert_eq!(fixture.pulse(&mut creator, 0.7), 1);
        // 本循环已达上限
        assert_eq!(fixture.pulse(&mut creator, 1.5), 0);
        assert_eq!(creator.trigger_count(), 2);

        creator.on_loop_wrapped();
        assert_eq!(creator.trigger_count(), 0);
        assert_eq!(fixture.pulse(&mut creator, 2.5), 1);
    }

    #[test]
    fn test_reset_state_clears_counters() {
        let fixture = Fixture::new();
        let mut creator =
            EventCreatorModule::new("spark", Property::scalar(0.0)).with_limits(0, 1.0);
        creator.resize(2);
        assert_eq!(fixture.pulse(&mut creator, 50.0), 1);
        // 时钟回到 0 后不应被旧的事件时间压制
        creator.reset_state();
        assert_eq!(fixture.pulse(&mut creator, 0.5), 1);

        let mut listener =
            EventListenerModule::new("burst", ListenerOutput::Payload(0)).with_max_trigger_count(1);
        assert!(listener.handle(&event("burst")));
        assert!(!listener.handle(&event("burst")));
        listener.reset_state();
        assert!(listener.last_event().is_none());
        assert!(listener.handle(&event("burst")));
    }

    #[test]
    fn test_queue_drain() {
        let mut queue = EventQueue::default();
        queue.raise("a", Some(3), [Vec4::ZERO; 4]);
        queue.raise("b", None, [Vec4::ONE; 4]);
        assert_eq!(queue.len(), 2);
        let names: Vec<_> = queue.drain().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(queue.is_empty());
    }
}
