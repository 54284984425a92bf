//! 模块栈粒子模拟
//!
//! - `pool` - 固定容量的粒子槽位分配
//! - `channel` - 通道标识、通道数组与粒子生命周期状态
//! - `context` - 求值上下文与宿主输入
//! - `property` - 属性值解析
//! - `shared` - 共享属性栈
//! - `module` / `stack` - 模块与模块栈
//! - `sampler` - 采样模块
//! - `events` - 事件创建者与监听者
//! - `multi_function` - 多功能覆盖
//! - `integration` - 速率与直接值的积分
//! - `emitter` - 每帧驱动
//! - `tree` - 发射器层级与事件分发
//! - `render` - 渲染栈
//! - `registry` - 模块注册表

pub mod channel;
pub mod context;
pub mod emitter;
pub mod events;
pub mod integration;
pub mod module;
pub mod multi_function;
pub mod pool;
pub mod property;
pub mod registry;
pub mod render;
pub mod sampler;
pub mod shared;
pub mod stack;
pub mod tree;


pub use channel::{ChannelId, ChannelSet, ChannelShape, ParticleState, NOT_DYING};
pub use context::{
    EmitterClock, EmitterLookup, EvalContext, HostInputs, NoEmitters, ParameterSet, ParameterType,
    ParameterValue,
};
pub use emitter::{Emitter, EmitterStacks, EmitterStats};
pub use events::{EventCreatorModule, EventData, EventListenerModule, EventQueue, ListenerOutput};
pub use integration::IntegrationState;
pub use module::{Module, ModuleKind};
pub use multi_function::{ChannelOverride, MultiFunctionModule, MultiFunctionStack};
pub use pool::{ParticlePool, SlotIndex};
pub use property::{
    ComponentSelect, CurveInput, CurveSource, DataMode, Property, RandomRange, SystemProperty,
    ValueKind,
};
pub use registry::{create_module, find_module, ModuleCategory, ModuleDescriptor, ModuleInstance};
pub use render::{Mesh, ParticleVertex, ParticleView, PointSpriteModule, RenderModule, RenderStack};
pub use sampler::{EmitterTarget, ObjectAttribute, SampleCondition, SamplerModule, SamplerSource};
pub use shared::{SharedHandle, SharedStack};
pub use stack::{ChannelStack, ScalarStack};
pub use tree::{EffectTree, EmitterId};
