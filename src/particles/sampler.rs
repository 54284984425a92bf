//! 采样模块
//!
//! 采样模块在触发条件满足时读取一个源（属性、宿主命名对象或其他发射器的通道），
//! 缓存结果并在两次采样之间持续输出缓存值。
//! 无效采样（对象不存在、目标发射器没有活跃粒子）不参与混合。

use super::channel::ChannelId;
use super::context::EvalContext;
use super::pool::SlotIndex;
use super::property::Property;
use super::tree::EmitterId;
use crate::math::RandomStream;
use glam::Vec4;

/// 采样触发条件
#[derive(Debug, Clone)]
pub enum SampleCondition {
    /// 粒子年龄（发射器级为发射器时间）到达 offset 时采样一次
    OnCreation { offset: f32 },
    /// 从 offset 开始每隔 interval 秒采样
    ByTime { interval: f32, offset: f32 },
    /// 驱动属性从 <1 越过到 >=1 时采样
    ByDirectValue(Property),
    /// 没有碰撞系统，永不触发
    OnCollision,
}

/// 宿主对象的变换分量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectAttribute {
    #[default]
    Position,
    /// 欧拉角（度）
    Rotation,
    Scale,
}

/// 被采样的发射器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterTarget {
    Parent,
    Id(EmitterId),
}

/// 采样源
#[derive(Debug, Clone)]
pub enum SamplerSource {
    Property(Property),
    HostObject {
        name: String,
        attribute: ObjectAttribute,
    },
    /// 从目标发射器随机挑选一个活跃粒子读取通道
    Emitter {
        target: EmitterTarget,
        channel: ChannelId,
    },
}

#[derive(Debug, Clone)]
pub struct SamplerModule {
    pub source: SamplerSource,
    pub condition: SampleCondition,
    /// 粒子生成后的第一次求值总是采样
    pub sample_on_spawn: bool,
    /// 跨发射器采样时挑选粒子的种子
    pub random_seed: i32,
    last_sample_time: Vec<f32>,
    cached: Vec<Option<Vec4>>,
    previous_drive: Vec<f32>,
    warned_missing: bool,
}

impl SamplerModule {
    pub fn new(source: SamplerSource, condition: SampleCondition) -> Self {
        Self {
            source,
            condition,
            sample_on_spawn: false,
            random_seed: 0,
            last_sample_time: Vec::new(),
            cached: Vec::new(),
            previous_drive: Vec::new(),
            warned_missing: false,
        }
    }

    pub fn with_sample_on_spawn(mut self, enabled: bool) -> Self {
        self.sample_on_spawn = enabled;
        self
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.random_seed = seed;
        self
    }

    pub(crate) fn resize(&mut self, state_len: usize) {
        self.last_sample_time = vec![-1.0; state_len];
        self.cached = vec![None; state_len];
        self.previous_drive = vec![0.0; state_len];
    }

    pub(crate) fn reset_slot(&mut self, state: usize) {
        if let Some(t) = self.last_sample_time.get_mut(state) {
            *t = -1.0;
        }
        if let Some(c) = self.cached.get_mut(state) {
            *c = None;
        }
        if let Some(d) = self.previous_drive.get_mut(state) {
            *d = 0.0;
        }
    }

    /// 当前值；`None` 表示本帧不参与混合
    pub(crate) fn sample(
        &mut self,
        state: usize,
        slot: Option<SlotIndex>,
        ctx: &EvalContext<'_>,
    ) -> Option<Vec4> {
        if state >= self.cached.len() {
            return None;
        }
        let t = match slot {
            Some(_) => ctx.particles.age(slot),
            None => ctx.clock.time,
        };
        if self.should_sample(state, t, slot, ctx) {
            self.cached[state] = self.read_source(slot, ctx);
        }
        self.cached[state]
    }

    fn should_sample(
        &mut self,
        state: usize,
        t: f32,
        slot: Option<SlotIndex>,
        ctx: &EvalContext<'_>,
    ) -> bool {
        let last = self.last_sample_time[state];
        if self.sample_on_spawn && last < 0.0 {
            self.last_sample_time[state] = t;
            return true;
        }

        match &self.condition {
            SampleCondition::OnCreation { offset } => {
                if last < 0.0 && t >= *offset {
                    self.last_sample_time[state] = t;
                    true
                } else {
                    false
                }
            }
            SampleCondition::ByTime { interval, offset } => {
                if t < *offset || *interval <= 0.0 {
                    return false;
                }
                if last >= 0.0 && t - last < *interval {
                    return false;
                }
                // 对齐到采样网格，避免累计漂移
                let local = t - offset;
                self.last_sample_time[state] = offset + (local / interval).round() * interval;
                true
            }
            SampleCondition::ByDirectValue(drive) => {
                let value = drive.get_scalar(slot, ctx);
                let previous = std::mem::replace(&mut self.previous_drive[state], value);
                if previous < 1.0 && value >= 1.0 {
                    self.last_sample_time[state] = t;
                    true
                } else {
                    false
                }
            }
            SampleCondition::OnCollision => false,
        }
    }

    fn read_source(&mut self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> Option<Vec4> {
        match &self.source {
            SamplerSource::Property(property) => Some(property.get_value(slot, ctx)),
            SamplerSource::HostObject { name, attribute } => {
                let Some(object) = ctx.host.objects.get(name) else {
                    if !self.warned_missing {
                        self.warned_missing = true;
                        tracing::warn!(
                            target: "particles.sampler",
                            "Sampled host object '{}' does not exist",
                            name
                        );
                    }
                    return None;
                };
                Some(match attribute {
                    ObjectAttribute::Position => object.position.extend(0.0),
                    ObjectAttribute::Rotation => object.euler_degrees().extend(0.0),
                    ObjectAttribute::Scale => object.lossy_scale.extend(0.0),
                })
            }
            SamplerSource::Emitter { target, channel } => {
                let id = match target {
                    EmitterTarget::Parent => ctx.parent_id?,
                    EmitterTarget::Id(id) => *id,
                };
                let emitter = ctx.emitters.emitter(id)?;
                let seed = RandomStream::compose(
                    ctx.emitter_seed,
                    self.random_seed,
                    ctx.particles.particle_id(slot),
                );
                let index = emitter.sample_particle(seed)?;
                Some(emitter.channels().read(*channel, Some(index)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::HostTransform;
    use crate::particles::channel::{ChannelSet, ParticleState};
    use crate::particles::context::{EmitterClock, HostInputs, NoEmitters, ParameterSet};
    use crate::particles::property::{CurveInput, CurveSource, SystemProperty, ValueKind};
    use crate::particles::shared::SharedStack;
    use crate::math::Curve;
    use glam::Vec3;

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
                channels: ChannelSet::new(2),
                particles: ParticleState::new(2),
                shared: SharedStack::default(),
                parameters: ParameterSet::default(),
            }
        }

        fn ctx(&self, time: f32) -> EvalContext<'_> {
            EvalContext {
                dt: 0.5,
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
            }
        }
    }

    fn time_property() -> Property {
        Property::curve(
            ValueKind::Scalar,
            CurveSource::scalar(
                CurveInput::new(SystemProperty::EmitterTime).with_range(0.0, 10.0),
                Curve::linear(0.0, 10.0),
            ),
        )
    }

    #[test]
    fn test_by_time_samples_on_interval() {
        let f = Fixture::new();
        let mut sampler = SamplerModule::new(
            SamplerSource::Property(time_property()),
            SampleCondition::ByTime {
                interval: 1.0,
                offset: 0.0,
            },
        );
        sampler.resize(1);

        let mut samples = Vec::new();
        for step in 0..6 {
            let t = step as f32 * 0.5;
            let v = sampler.sample(0, None, &f.ctx(t)).unwrap();
            samples.push(v.x);
        }
        // 在 t = 0, 1, 2 采样，中间保持缓存
        let expected = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        for (got, want) in samples.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "{samples:?}");
        }
    }

    #[test]
    fn test_on_creation_samples_once() {
        let f = Fixture::new();
        let mut sampler = SamplerModule::new(
            SamplerSource::Property(time_property()),
            SampleCondition::OnCreation { offset: 0.5 },
        );
        sampler.resize(1);
        assert_eq!(sampler.sample(0, None, &f.ctx(0.0)), None);
        let first = sampler.sample(0, None, &f.ctx(0.5)).unwrap();
        let later = sampler.sample(0, None, &f.ctx(3.0)).unwrap();
        assert_eq!(first, later);
    }

    #[test]
    fn test_direct_value_edge() {
        let f = Fixture::new();
        let drive = Property::curve(
            ValueKind::Scalar,
            CurveSource::scalar(
                CurveInput::new(SystemProperty::EmitterTime).with_range(0.0, 1.0),
                Curve::linear(0.0, 1.0),
            ),
        );
        let mut sampler = SamplerModule::new(
            SamplerSource::Property(time_property()),
            SampleCondition::ByDirectValue(drive),
        );
        sampler.resize(1);
        assert_eq!(sampler.sample(0, None, &f.ctx(0.5)), None);
        let v = sampler.sample(0, None, &f.ctx(1.0)).unwrap();
        assert!((v.x - 1.0).abs() < 1e-4);
        // 保持在 1 以上不再触发
        let held = sampler.sample(0, None, &f.ctx(2.0)).unwrap();
        assert_eq!(v, held);
    }

    #[test]
    fn test_missing_host_object_is_invalid() {
        let mut f = Fixture::new();
        let mut sampler = SamplerModule::new(
            SamplerSource::HostObject {
                name: "target".into(),
                attribute: ObjectAttribute::Position,
            },
            SampleCondition::ByTime {
                interval: 0.5,
                offset: 0.0,
            },
        );
        sampler.resize(1);
        assert_eq!(sampler.sample(0, None, &f.ctx(0.0)), None);

        f.host.objects.insert(
            "target".into(),
            HostTransform::from_position(Vec3::new(1.0, 2.0, 3.0)),
        );
        let v = sampler.sample(0, None, &f.ctx(0.5)).unwrap();
        assert_eq!(v, Vec4::new(1.0, 2.0, 3.0, 0.0));
    }

    #[test]
    fn test_collision_never_fires() {
        let f = Fixture::new();
        let mut sampler = SamplerModule::new(
            SamplerSource::Property(Property::scalar(1.0)),
            SampleCondition::OnCollision,
        );
        sampler.resize(1);
        for step in 0..4 {
            assert_eq!(sampler.sample(0, None, &f.ctx(step as f32)), None);
        }
    }

    #[test]
    fn test_parent_without_hierarchy_is_invalid() {
        let f = Fixture::new();
        let mut sampler = SamplerModule::new(
            SamplerSource::Emitter {
                target: EmitterTarget::Parent,
                channel: ChannelId::Position,
            },
            SampleCondition::OnCreation { offset: 0.0 },
        );
        sampler.resize(1);
        assert_eq!(sampler.sample(0, None, &f.ctx(0.0)), None);
    }
}
