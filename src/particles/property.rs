//! 属性值解析
//!
//! 属性是模块的可配置值，按数据模式解析为 Vec4（浮点属性取 x 分量）：
//! 常量、随机常量、曲线、随机曲线、共享栈引用、命名外部参数。
//! 需要粒子上下文的输入在发射器级求值时解析为零。

use super::channel::ChannelId;
use super::context::{EvalContext, ParameterType};
use super::pool::SlotIndex;
use super::shared::SharedHandle;
use crate::math::{Coordinates, Curve, RandomStream};
use glam::Vec4;

/// 值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vector,
}

/// 曲线可用的系统输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemProperty {
    EmitterTime,
    LoopTime,
    ParticleTime,
    ParticleId,
    DeathCondition,
    DeathDuration,
    CustomScalar,
    CustomVector,
    SpawnRate,
    FrameRate,
    Acceleration,
    Velocity,
    Position,
    PivotOffset,
    RotationRate,
    Rotation,
    Scale,
    Color,
    EmitterPosition,
    EmitterRotation,
    EmitterScale,
    CameraPosition,
    CameraRotation,
    CameraDistance,
    RealTime,
}

impl SystemProperty {
    /// 是否依赖粒子上下文
    pub fn is_particle_specific(self) -> bool {
        !matches!(
            self,
            Self::EmitterTime
                | Self::LoopTime
                | Self::SpawnRate
                | Self::FrameRate
                | Self::EmitterPosition
                | Self::EmitterRotation
                | Self::EmitterScale
                | Self::CameraPosition
                | Self::CameraRotation
                | Self::RealTime
        )
    }

    fn channel(self) -> Option<ChannelId> {
        Some(match self {
            Self::DeathCondition => ChannelId::DeathCondition,
            Self::DeathDuration => ChannelId::DeathDuration,
            Self::CustomScalar => ChannelId::CustomScalar,
            Self::CustomVector => ChannelId::CustomVector,
            Self::SpawnRate => ChannelId::SpawnRate,
            Self::Acceleration => ChannelId::Acceleration,
            Self::Velocity => ChannelId::Velocity,
            Self::Position => ChannelId::Position,
            Self::PivotOffset => ChannelId::PivotOffset,
            Self::RotationRate => ChannelId::RotationRate,
            Self::Rotation => ChannelId::Rotation,
            Self::Scale => ChannelId::Scale,
            Self::Color => ChannelId::Color,
            _ => return None,
        })
    }

    /// 读取系统输入
    pub fn read(self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> Vec4 {
        if self.is_particle_specific() && slot.is_none() {
            return Vec4::ZERO;
        }
        if let Some(channel) = self.channel() {
            return ctx.channels.read(channel, slot);
        }
        let scalar = |v: f32| Vec4::new(v, 0.0, 0.0, 0.0);
        match self {
            Self::EmitterTime => scalar(ctx.clock.time),
            Self::LoopTime => scalar(ctx.clock.loop_time),
            Self::FrameRate => scalar(ctx.clock.frame_rate),
            Self::RealTime => scalar(ctx.host.real_time as f32),
            Self::ParticleTime => scalar(ctx.particles.age(slot)),
            Self::ParticleId => scalar(ctx.particles.particle_id(slot) as f32),
            Self::EmitterPosition => ctx.host.emitter.position.extend(0.0),
            Self::EmitterRotation => ctx.host.emitter.euler_degrees().extend(0.0),
            Self::EmitterScale => ctx.host.emitter.lossy_scale.extend(0.0),
            Self::CameraPosition => ctx.host.camera.position.extend(0.0),
            Self::CameraRotation => ctx.host.camera.euler_degrees().extend(0.0),
            Self::CameraDistance => {
                let position = ctx.channels.read(ChannelId::Position, slot).truncate();
                scalar(position.distance(ctx.host.camera.position))
            }
            _ => Vec4::ZERO,
        }
    }
}

/// 向量输入的分量选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentSelect {
    #[default]
    X,
    Y,
    Z,
    W,
    /// xyz 的长度
    Magnitude,
}

impl ComponentSelect {
    pub fn select(self, v: Vec4) -> f32 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
            Self::W => v.w,
            Self::Magnitude => v.truncate().length(),
        }
    }
}

/// 曲线输入：系统属性 → 分量 → [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct CurveInput {
    pub property: SystemProperty,
    pub component: ComponentSelect,
    pub coordinates: Option<Coordinates>,
    /// 映射到 [0, 1] 的输入区间
    pub range: (f32, f32),
}

impl CurveInput {
    pub fn new(property: SystemProperty) -> Self {
        Self {
            property,
            component: ComponentSelect::X,
            coordinates: None,
            range: (0.0, 1.0),
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = (min, max);
        self
    }

    pub fn with_component(mut self, component: ComponentSelect) -> Self {
        self.component = component;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// 归一化后的曲线输入
    pub fn normalized(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> f32 {
        let mut raw = self.property.read(slot, ctx);
        if let Some(coordinates) = &self.coordinates {
            raw = coordinates.convert(raw, &ctx.host.emitter);
        }
        let v = self.component.select(raw);
        let (min, max) = self.range;
        let span = max - min;
        if span.abs() <= f32::EPSILON {
            0.0
        } else {
            (v - min) / span
        }
    }
}

/// 曲线数据源：输入 + 每分量一条曲线 + 输出区间
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSource {
    pub input: CurveInput,
    pub curves: [Curve; 4],
    /// 曲线 [0, 1] 输出映射到的区间
    pub output: (f32, f32),
}

impl CurveSource {
    /// 单曲线（所有分量共用）
    pub fn scalar(input: CurveInput, curve: Curve) -> Self {
        Self {
            input,
            curves: [curve.clone(), curve.clone(), curve.clone(), curve],
            output: (0.0, 1.0),
        }
    }

    /// 每分量独立曲线
    pub fn vector(input: CurveInput, curves: [Curve; 4]) -> Self {
        Self {
            input,
            curves,
            output: (0.0, 1.0),
        }
    }

    pub fn with_output(mut self, min: f32, max: f32) -> Self {
        self.output = (min, max);
        self
    }

    pub fn evaluate(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> Vec4 {
        let t = self.input.normalized(slot, ctx);
        let (min, max) = self.output;
        let remap = |c: &Curve| min + c.evaluate(t) * (max - min);
        Vec4::new(
            remap(&self.curves[0]),
            remap(&self.curves[1]),
            remap(&self.curves[2]),
            remap(&self.curves[3]),
        )
    }
}

/// 随机区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomRange {
    pub min: Vec4,
    pub max: Vec4,
    /// 所有分量使用同一次抽样
    pub uniform: bool,
    /// 直接取最小或最大值，不插值
    pub use_extremes: bool,
}

impl RandomRange {
    fn pick(&self, min: Vec4, max: Vec4, draw: Vec4) -> Vec4 {
        if self.use_extremes {
            Vec4::select(draw.cmplt(Vec4::splat(0.5)), min, max)
        } else {
            min + (max - min) * draw
        }
    }
}

/// 数据模式
#[derive(Debug, Clone, PartialEq)]
pub enum DataMode {
    Constant,
    RandomConstant(RandomRange),
    Curve(CurveSource),
    RandomCurve {
        min: CurveSource,
        max: CurveSource,
        uniform: bool,
    },
    /// 委托给共享栈中的属性
    Reference(SharedHandle),
    /// 查找实体上的命名参数，找不到时使用自身常量
    Parameter(String),
}

/// 模块属性
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: ValueKind,
    pub mode: DataMode,
    /// 常量值，也是参数模式和失效引用的回退值
    pub constant: Vec4,
    pub random_seed: i32,
    pub coordinates: Option<Coordinates>,
}

impl Property {
    fn with_mode(kind: ValueKind, constant: Vec4, mode: DataMode) -> Self {
        Self {
            name: String::new(),
            kind,
            mode,
            constant,
            random_seed: 0,
            coordinates: None,
        }
    }

    pub fn scalar(value: f32) -> Self {
        Self::with_mode(
            ValueKind::Scalar,
            Vec4::new(value, 0.0, 0.0, 0.0),
            DataMode::Constant,
        )
    }

    pub fn vector(value: Vec4) -> Self {
        Self::with_mode(ValueKind::Vector, value, DataMode::Constant)
    }

    pub fn random_scalar(min: f32, max: f32) -> Self {
        Self::with_mode(
            ValueKind::Scalar,
            Vec4::new(min, 0.0, 0.0, 0.0),
            DataMode::RandomConstant(RandomRange {
                min: Vec4::splat(min),
                max: Vec4::splat(max),
                uniform: true,
                use_extremes: false,
            }),
        )
    }

    pub fn random_vector(min: Vec4, max: Vec4) -> Self {
        Self::with_mode(
            ValueKind::Vector,
            min,
            DataMode::RandomConstant(RandomRange {
                min,
                max,
                uniform: false,
                use_extremes: false,
            }),
        )
    }

    pub fn curve(kind: ValueKind, source: CurveSource) -> Self {
        Self::with_mode(kind, Vec4::ZERO, DataMode::Curve(source))
    }

    pub fn random_curve(kind: ValueKind, min: CurveSource, max: CurveSource) -> Self {
        Self::with_mode(
            kind,
            Vec4::ZERO,
            DataMode::RandomCurve {
                min,
                max,
                uniform: kind == ValueKind::Scalar,
            },
        )
    }

    pub fn reference(kind: ValueKind, handle: SharedHandle) -> Self {
        Self::with_mode(kind, Vec4::ZERO, DataMode::Reference(handle))
    }

    pub fn parameter(kind: ValueKind, name: impl Into<String>, fallback: Vec4) -> Self {
        Self::with_mode(kind, fallback, DataMode::Parameter(name.into()))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// 随机常量模式下切换“取极值”
    pub fn with_extremes(mut self, use_extremes: bool) -> Self {
        if let DataMode::RandomConstant(range) = &mut self.mode {
            range.use_extremes = use_extremes;
        }
        self
    }

    /// 随机模式下切换“所有分量共用抽样”
    pub fn with_uniform(mut self, uniform: bool) -> Self {
        match &mut self.mode {
            DataMode::RandomConstant(range) => range.uniform = uniform,
            DataMode::RandomCurve { uniform: u, .. } => *u = uniform,
            _ => {}
        }
        self
    }

    pub fn references(&self, handle: SharedHandle) -> bool {
        matches!(self.mode, DataMode::Reference(h) if h == handle)
    }

    /// 断开引用，退回常量模式
    pub fn detach_reference(&mut self) {
        if matches!(self.mode, DataMode::Reference(_)) {
            self.mode = DataMode::Constant;
        }
    }

    /// 解析属性值
    pub fn get_value(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> Vec4 {
        self.resolve(slot, ctx, 0)
    }

    /// 解析浮点值（x 分量）
    pub fn get_scalar(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>) -> f32 {
        self.get_value(slot, ctx).x
    }

    fn resolve(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>, depth: u8) -> Vec4 {
        let raw = match &self.mode {
            DataMode::Constant => self.constant,
            DataMode::RandomConstant(range) => {
                let draw = self.draw(slot, ctx, range.uniform);
                range.pick(range.min, range.max, draw)
            }
            DataMode::Curve(source) => source.evaluate(slot, ctx),
            DataMode::RandomCurve { min, max, uniform } => {
                let draw = self.draw(slot, ctx, *uniform);
                let a = min.evaluate(slot, ctx);
                let b = max.evaluate(slot, ctx);
                a + (b - a) * draw
            }
            DataMode::Reference(handle) => {
                // 引用只指向共享栈，共享属性本身不允许是引用
                return match ctx.shared.get(*handle) {
                    Some(target) if depth == 0 => target.resolve(slot, ctx, depth + 1),
                    _ => {
                        tracing::trace!(
                            target: "particles",
                            "Property '{}' has a stale shared reference",
                            self.name
                        );
                        self.constant
                    }
                };
            }
            DataMode::Parameter(name) => {
                let ty = match self.kind {
                    ValueKind::Scalar => ParameterType::Scalar,
                    ValueKind::Vector => ParameterType::Vector,
                };
                ctx.parameters
                    .get(name, ty)
                    .map_or(self.constant, |v| v.as_vec4())
            }
        };

        match &self.coordinates {
            Some(coordinates) => coordinates.convert(raw, &ctx.host.emitter),
            None => raw,
        }
    }

    fn draw(&self, slot: Option<SlotIndex>, ctx: &EvalContext<'_>, uniform: bool) -> Vec4 {
        let mut stream = RandomStream::new(
            ctx.emitter_seed,
            self.random_seed,
            ctx.particles.particle_id(slot),
        );
        if uniform || self.kind == ValueKind::Scalar {
            Vec4::splat(stream.next_f32())
        } else {
            Vec4::new(
                stream.next_f32(),
                stream.next_f32(),
                stream.next_f32(),
                stream.next_f32(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ConversionKind, Interpolation};
    use crate::particles::channel::{ChannelSet, ParticleState};
    use crate::particles::context::{
        EmitterClock, HostInputs, NoEmitters, ParameterSet, ParameterValue,
    };
    use crate::particles::shared::SharedStack;
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
            let mut particles = ParticleState::new(4);
            particles.spawn(0, 100);
            particles.spawn(1, 200);
            particles.age[1] = 0.5;
            Self {
                host: HostInputs::default(),
                channels: ChannelSet::new(4),
                particles,
                shared: SharedStack::default(),
                parameters: ParameterSet::default(),
            }
        }

        fn ctx(&self) -> EvalContext<'_> {
            EvalContext {
                dt: 0.1,
                clock: EmitterClock {
                    time: 2.0,
                    loop_time: 0.4,
                    loop_index: 0,
                    frame_rate: 10.0,
                },
                emitter_seed: 7,
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

    #[test]
    fn test_constant() {
        let f = Fixture::new();
        let p = Property::vector(Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(p.get_value(Some(0), &f.ctx()), Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(Property::scalar(3.5).get_scalar(None, &f.ctx()), 3.5);
    }

    #[test]
    fn test_random_constant_is_deterministic_per_particle() {
        let f = Fixture::new();
        let p = Property::random_vector(Vec4::ZERO, Vec4::splat(10.0)).with_seed(3);
        let ctx = f.ctx();
        let a = p.get_value(Some(0), &ctx);
        assert_eq!(a, p.get_value(Some(0), &ctx));
        assert_ne!(a, p.get_value(Some(1), &ctx));
        for c in a.to_array() {
            assert!((0.0..=10.0).contains(&c));
        }
    }

    #[test]
    fn test_random_extremes() {
        let f = Fixture::new();
        let p = Property::random_vector(Vec4::splat(-1.0), Vec4::splat(1.0))
            .with_seed(11)
            .with_extremes(true);
        let v = p.get_value(Some(0), &f.ctx());
        for c in v.to_array() {
            assert!(c == -1.0 || c == 1.0);
        }
    }

    #[test]
    fn test_uniform_random_shares_draw() {
        let f = Fixture::new();
        let p = Property::random_vector(Vec4::ZERO, Vec4::ONE).with_uniform(true);
        let v = p.get_value(Some(1), &f.ctx());
        assert_eq!(v, Vec4::splat(v.x));
    }

    #[test]
    fn test_curve_on_particle_age() {
        let f = Fixture::new();
        let source = CurveSource::scalar(
            CurveInput::new(SystemProperty::ParticleTime).with_range(0.0, 1.0),
            Curve::linear(0.0, 1.0),
        )
        .with_output(10.0, 20.0);
        let p = Property::curve(ValueKind::Scalar, source);
        let ctx = f.ctx();
        assert!((p.get_scalar(Some(1), &ctx) - 15.0).abs() < 1e-4);
        // 没有粒子上下文时输入为零
        assert!((p.get_scalar(None, &ctx) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_curve_input_component_and_conversion() {
        let mut f = Fixture::new();
        f.host.emitter.position = Vec3::new(5.0, 0.0, 0.0);
        f.channels.position[0] = Vec4::new(7.0, 1.0, 0.0, 0.0);
        let input = CurveInput::new(SystemProperty::Position)
            .with_component(ComponentSelect::X)
            .with_coordinates(Coordinates::to_emitter(ConversionKind::Position))
            .with_range(0.0, 4.0);
        let source = CurveSource::scalar(input, Curve::linear(0.0, 1.0));
        let p = Property::curve(ValueKind::Scalar, source);
        // 局部 x = 2，归一化 0.5
        assert!((p.get_scalar(Some(0), &f.ctx()) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_random_curve_between_bounds() {
        let f = Fixture::new();
        let input = CurveInput::new(SystemProperty::LoopTime);
        let min = CurveSource::scalar(input.clone(), Curve::constant(1.0));
        let max = CurveSource::scalar(input, Curve::constant(3.0));
        let p = Property::random_curve(ValueKind::Scalar, min, max).with_seed(5);
        let v = p.get_scalar(Some(0), &f.ctx());
        assert!((1.0..=3.0).contains(&v));
        assert_eq!(v, p.get_scalar(Some(0), &f.ctx()));
    }

    #[test]
    fn test_parameter_fallback() {
        let mut f = Fixture::new();
        let p = Property::parameter(ValueKind::Scalar, "intensity", Vec4::new(0.25, 0.0, 0.0, 0.0));
        assert_eq!(p.get_scalar(None, &f.ctx()), 0.25);

        f.parameters.set("intensity", ParameterValue::Vector(Vec4::ONE));
        assert_eq!(p.get_scalar(None, &f.ctx()), 0.25);

        f.parameters.set("intensity", ParameterValue::Scalar(2.0));
        assert_eq!(p.get_scalar(None, &f.ctx()), 2.0);
    }

    #[test]
    fn test_reference_delegates_and_falls_back() {
        let mut f = Fixture::new();
        let handle = f
            .shared
            .add("speed", Property::scalar(9.0))
            .unwrap();
        let mut p = Property::reference(ValueKind::Scalar, handle);
        p.constant = Vec4::new(-1.0, 0.0, 0.0, 0.0);
        assert_eq!(p.get_scalar(None, &f.ctx()), 9.0);

        f.shared.remove(handle);
        assert_eq!(p.get_scalar(None, &f.ctx()), -1.0);
    }

    #[test]
    fn test_step_curve_on_emitter_time() {
        let f = Fixture::new();
        let curve = Curve::new(Interpolation::Step)
            .with_key(0.0, 0.0)
            .with_key(0.5, 1.0);
        let source = CurveSource::scalar(
            CurveInput::new(SystemProperty::EmitterTime).with_range(0.0, 4.0),
            curve,
        );
        let p = Property::curve(ValueKind::Scalar, source);
        assert_eq!(p.get_scalar(None, &f.ctx()), 1.0);
    }
}
