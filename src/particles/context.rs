//! 模拟上下文
//!
//! 求值所需的一切都显式传入：时间、种子、宿主变换、通道只读视图和共享属性。
//! 不存在全局可变状态，确定性只取决于传入的上下文。

use super::channel::{ChannelSet, ParticleState};
use super::emitter::Emitter;
use super::shared::SharedStack;
use super::tree::EmitterId;
use crate::math::HostTransform;
use glam::Vec4;
use std::collections::HashMap;

/// 宿主提供的外部输入
#[derive(Debug, Clone, Default)]
pub struct HostInputs {
    /// 发射器所属实体的世界变换
    pub emitter: HostTransform,
    /// 当前相机
    pub camera: HostTransform,
    /// 宿主的真实时间（秒）
    pub real_time: f64,
    /// 采样模块可引用的命名对象
    pub objects: HashMap<String, HostTransform>,
}

impl HostInputs {
    pub fn with_emitter(emitter: HostTransform) -> Self {
        Self {
            emitter,
            ..Default::default()
        }
    }
}

/// 外部参数值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Scalar(f32),
    Vector(Vec4),
    Bool(bool),
}

/// 外部参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    Scalar,
    Vector,
    Bool,
}

impl ParameterValue {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Scalar(_) => ParameterType::Scalar,
            Self::Vector(_) => ParameterType::Vector,
            Self::Bool(_) => ParameterType::Bool,
        }
    }

    pub fn as_vec4(&self) -> Vec4 {
        match *self {
            Self::Scalar(v) => Vec4::new(v, 0.0, 0.0, 0.0),
            Self::Vector(v) => v,
            Self::Bool(b) => Vec4::new(if b { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0),
        }
    }
}

/// 实体上的命名参数集合
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: HashMap<String, ParameterValue>,
}

impl ParameterSet {
    pub fn set(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<ParameterValue> {
        self.values.remove(name)
    }

    /// 按名称和类型查找；类型不符视为不存在
    pub fn get(&self, name: &str, ty: ParameterType) -> Option<ParameterValue> {
        self.values
            .get(name)
            .copied()
            .filter(|v| v.parameter_type() == ty)
    }
}

/// 发射器时钟
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EmitterClock {
    /// 发射器运行时间（秒）
    pub time: f32,
    /// 当前循环内的归一化时间 [0, 1]
    pub loop_time: f32,
    /// 已完成的循环次数
    pub loop_index: u64,
    /// 按本帧 dt 推算的帧率
    pub frame_rate: f32,
}

impl EmitterClock {
    /// 推进时钟；返回本帧是否跨越了循环边界
    pub fn advance(&mut self, dt: f32, duration: f32, looping: bool) -> bool {
        self.time += dt;
        self.frame_rate = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        let duration = duration.max(f32::EPSILON);
        if looping {
            let loop_index = (self.time / duration).floor() as u64;
            self.loop_time = (self.time / duration).fract();
            let wrapped = loop_index > self.loop_index;
            self.loop_index = loop_index;
            wrapped
        } else {
            self.loop_time = (self.time / duration).min(1.0);
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 查询其他发射器（跨发射器采样使用）
pub trait EmitterLookup {
    fn emitter(&self, id: EmitterId) -> Option<&Emitter>;
}

/// 没有其他发射器的查询实现
pub struct NoEmitters;

impl EmitterLookup for NoEmitters {
    fn emitter(&self, _id: EmitterId) -> Option<&Emitter> {
        None
    }
}

/// 模块求值上下文
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub dt: f32,
    pub clock: EmitterClock,
    pub emitter_seed: i32,
    pub emitter_id: Option<EmitterId>,
    pub parent_id: Option<EmitterId>,
    pub host: &'a HostInputs,
    /// 通道只读视图；正在求值的通道在此处保持上一帧的结果
    pub channels: &'a ChannelSet,
    pub particles: &'a ParticleState,
    pub shared: &'a SharedStack,
    pub parameters: &'a ParameterSet,
    pub emitters: &'a dyn EmitterLookup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_lookup_checks_type() {
        let mut params = ParameterSet::default();
        params.set("speed", ParameterValue::Scalar(3.0));
        assert_eq!(
            params.get("speed", ParameterType::Scalar),
            Some(ParameterValue::Scalar(3.0))
        );
        assert_eq!(params.get("speed", ParameterType::Vector), None);
        assert_eq!(params.get("missing", ParameterType::Scalar), None);
    }

    #[test]
    fn test_clock_wraps() {
        let mut clock = EmitterClock::default();
        assert!(!clock.advance(0.75, 1.0, true));
        assert!((clock.loop_time - 0.75).abs() < 1e-6);
        assert!(clock.advance(0.5, 1.0, true));
        assert_eq!(clock.loop_index, 1);
        assert!((clock.loop_time - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_clock_without_looping_saturates() {
        let mut clock = EmitterClock::default();
        assert!(!clock.advance(3.0, 2.0, false));
        assert_eq!(clock.loop_time, 1.0);
        assert_eq!(clock.loop_index, 0);
    }
}
