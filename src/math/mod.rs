//! 数学工具模块
//!
//! - `random` - 可复现的随机数流
//! - `curve` - 一维曲线
//! - `blend` - 混合代数与通道元素类型
//! - `coordinates` - 宿主变换与坐标转换

pub mod blend;
pub mod coordinates;
pub mod curve;
pub mod random;

pub use blend::{blend_f32, blend_rotation, blend_vec4, BlendMode, ChannelElement, DIVISION_EPSILON};
pub use coordinates::{ConversionDirection, ConversionKind, Coordinates, HostTransform};
pub use curve::{Curve, CurveKey, Interpolation};
pub use random::RandomStream;
