//! 混合代数
//!
//! 模块把自身的值与栈的当前值按混合模式合并。所有模式在权重为 0 时返回栈值。
//! 浮点和 Vec4（逐分量）语义相同；旋转通道的 Normal 模式使用四元数球面插值。

use super::coordinates::{euler_degrees_to_quat, quat_to_euler_degrees};
use glam::Vec4;

/// 除法模式分母的最小绝对值
pub const DIVISION_EPSILON: f32 = 1e-6;

/// 混合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// `lerp(stack, module, w)`
    #[default]
    Normal,
    /// `stack + lerp(0, module, w)`
    Add,
    /// `stack * lerp(1, module, w)`
    Multiply,
    /// `stack - lerp(0, module, w)`
    SubtractValue,
    /// `lerp(0, module, w) - stack`
    SubtractStack,
    /// `stack / lerp(1, module, w)`
    DivideByValue,
    /// `lerp(1, module, w) / stack`
    DivideByStack,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn guard_denominator(d: f32) -> f32 {
    if d.abs() < DIVISION_EPSILON {
        if d.is_sign_negative() {
            -DIVISION_EPSILON
        } else {
            DIVISION_EPSILON
        }
    } else {
        d
    }
}

/// 浮点混合
pub fn blend_f32(stack: f32, module: f32, weight: f32, mode: BlendMode) -> f32 {
    if weight == 0.0 {
        return stack;
    }
    let w = weight.clamp(0.0, 1.0);
    match mode {
        BlendMode::Normal => lerp(stack, module, w),
        BlendMode::Add => stack + lerp(0.0, module, w),
        BlendMode::Multiply => stack * lerp(1.0, module, w),
        BlendMode::SubtractValue => stack - lerp(0.0, module, w),
        BlendMode::SubtractStack => lerp(0.0, module, w) - stack,
        BlendMode::DivideByValue => stack / guard_denominator(lerp(1.0, module, w)),
        BlendMode::DivideByStack => lerp(1.0, module, w) / guard_denominator(stack),
    }
}

/// Vec4 逐分量混合
pub fn blend_vec4(stack: Vec4, module: Vec4, weight: f32, mode: BlendMode) -> Vec4 {
    if weight == 0.0 {
        return stack;
    }
    Vec4::new(
        blend_f32(stack.x, module.x, weight, mode),
        blend_f32(stack.y, module.y, weight, mode),
        blend_f32(stack.z, module.z, weight, mode),
        blend_f32(stack.w, module.w, weight, mode),
    )
}

/// 旋转通道混合（欧拉角，度）
///
/// Normal 模式在四元数空间做球面插值，其余模式与 [`blend_vec4`] 相同。
pub fn blend_rotation(stack: Vec4, module: Vec4, weight: f32, mode: BlendMode) -> Vec4 {
    if weight == 0.0 {
        return stack;
    }
    match mode {
        BlendMode::Normal => {
            let from = euler_degrees_to_quat(stack.truncate());
            let to = euler_degrees_to_quat(module.truncate());
            let euler = quat_to_euler_degrees(from.slerp(to, weight.clamp(0.0, 1.0)));
            euler.extend(lerp(stack.w, module.w, weight.clamp(0.0, 1.0)))
        }
        _ => blend_vec4(stack, module, weight, mode),
    }
}

/// 通道元素类型
///
/// 栈对元素类型泛型化；模块统一产出 Vec4，按元素类型收窄后再混合。
pub trait ChannelElement: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    fn from_vec4(v: Vec4) -> Self;
    fn to_vec4(self) -> Vec4;
    fn blend(stack: Self, module: Self, weight: f32, mode: BlendMode, rotation: bool) -> Self;
}

impl ChannelElement for f32 {
    fn from_vec4(v: Vec4) -> Self {
        v.x
    }

    fn to_vec4(self) -> Vec4 {
        Vec4::new(self, 0.0, 0.0, 0.0)
    }

    fn blend(stack: Self, module: Self, weight: f32, mode: BlendMode, _rotation: bool) -> Self {
        blend_f32(stack, module, weight, mode)
    }
}

impl ChannelElement for Vec4 {
    fn from_vec4(v: Vec4) -> Self {
        v
    }

    fn to_vec4(self) -> Vec4 {
        self
    }

    fn blend(stack: Self, module: Self, weight: f32, mode: BlendMode, rotation: bool) -> Self {
        if rotation {
            blend_rotation(stack, module, weight, mode)
        } else {
            blend_vec4(stack, module, weight, mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [BlendMode; 7] = [
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::SubtractValue,
        BlendMode::SubtractStack,
        BlendMode::DivideByValue,
        BlendMode::DivideByStack,
    ];

    #[test]
    fn test_zero_weight_is_identity() {
        for mode in ALL_MODES {
            assert_eq!(blend_f32(5.0, 2.0, 0.0, mode), 5.0);
            let v = Vec4::new(1.0, -2.0, 3.0, 0.5);
            assert_eq!(blend_vec4(v, Vec4::splat(9.0), 0.0, mode), v);
            assert_eq!(blend_rotation(v, Vec4::splat(90.0), 0.0, mode), v);
        }
    }

    #[test]
    fn test_full_weight_modes() {
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::Normal), 2.0);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::Add), 7.0);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::Multiply), 10.0);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::SubtractValue), 3.0);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::SubtractStack), -3.0);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::DivideByValue), 2.5);
        assert_eq!(blend_f32(5.0, 2.0, 1.0, BlendMode::DivideByStack), 0.4);
    }

    #[test]
    fn test_partial_weight() {
        assert_eq!(blend_f32(4.0, 8.0, 0.5, BlendMode::Normal), 6.0);
        assert_eq!(blend_f32(4.0, 8.0, 0.5, BlendMode::Add), 8.0);
        // lerp(1, 3, 0.5) = 2
        assert_eq!(blend_f32(4.0, 3.0, 0.5, BlendMode::Multiply), 8.0);
    }

    #[test]
    fn test_division_by_zero_guarded() {
        let v = blend_f32(1.0, 0.0, 1.0, BlendMode::DivideByValue);
        assert!(v.is_finite());
        assert_eq!(v, 1.0 / DIVISION_EPSILON);

        let v = blend_f32(0.0, 2.0, 1.0, BlendMode::DivideByStack);
        assert!(v.is_finite());

        let v = blend_f32(-0.0, 2.0, 1.0, BlendMode::DivideByStack);
        assert!(v.is_finite() && v < 0.0);
    }

    #[test]
    fn test_rotation_slerp_takes_short_path() {
        let from = Vec4::new(0.0, 170.0, 0.0, 0.0);
        let to = Vec4::new(0.0, -170.0, 0.0, 0.0);
        let mid = blend_rotation(from, to, 0.5, BlendMode::Normal);
        // 最短路径穿过 180°，而不是线性插值得到的 0°
        assert!((mid.y.abs() - 180.0).abs() < 0.01, "got {:?}", mid);
        let linear = blend_vec4(from, to, 0.5, BlendMode::Normal);
        assert!(linear.y.abs() < 0.01);
    }

    #[test]
    fn test_channel_element_narrowing() {
        let v = Vec4::new(3.0, 4.0, 5.0, 6.0);
        assert_eq!(<f32 as ChannelElement>::from_vec4(v), 3.0);
        assert_eq!(<Vec4 as ChannelElement>::from_vec4(v), v);
        assert_eq!(f32::blend(1.0, 2.0, 1.0, BlendMode::Add, true), 3.0);
    }
}
