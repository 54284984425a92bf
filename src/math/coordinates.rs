//! 宿主变换与坐标转换
//!
//! 欧拉角一律以度为单位，按 Y·X·Z 顺序组合（先 Z，再 X，最后 Y）。

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

/// 由欧拉角（度）构造四元数
pub fn euler_degrees_to_quat(euler: Vec3) -> Quat {
    Quat::from_rotation_y(euler.y.to_radians())
        * Quat::from_rotation_x(euler.x.to_radians())
        * Quat::from_rotation_z(euler.z.to_radians())
}

/// 四元数转欧拉角（度），与 [`euler_degrees_to_quat`] 互逆
pub fn quat_to_euler_degrees(q: Quat) -> Vec3 {
    let m = Mat3::from_quat(q.normalize());
    // 列主序：m.col(j)[i] 即 M[i][j]
    let m12 = m.col(2).y;
    let x = (-m12).clamp(-1.0, 1.0).asin();
    let (y, z) = if m12.abs() < 0.9999 {
        (
            m.col(2).x.atan2(m.col(2).z),
            m.col(0).y.atan2(m.col(1).y),
        )
    } else {
        // 万向锁：把 Z 归零，全部转到 Y 上
        ((-m.col(0).z).atan2(m.col(0).x), 0.0)
    };
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// 宿主提供的变换（发射器、相机或命名对象）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTransform {
    pub position: Vec3,
    pub rotation: Quat,
    /// 世界空间下的近似缩放
    pub lossy_scale: Vec3,
}

impl Default for HostTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            lossy_scale: Vec3::ONE,
        }
    }
}

impl HostTransform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn euler_degrees(&self) -> Vec3 {
        quat_to_euler_degrees(self.rotation)
    }

    /// 去掉平移的 TRS 矩阵，用于速度类向量
    fn linear_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.lossy_scale, self.rotation, Vec3::ZERO)
    }
}

/// 值的语义，决定转换方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Position,
    Rotation,
    Velocity,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionDirection {
    /// 发射器局部空间 → 世界空间
    #[default]
    EmitterToWorld,
    /// 世界空间 → 发射器局部空间
    WorldToEmitter,
}

/// 坐标转换描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates {
    pub kind: ConversionKind,
    pub direction: ConversionDirection,
}

impl Coordinates {
    pub fn to_world(kind: ConversionKind) -> Self {
        Self {
            kind,
            direction: ConversionDirection::EmitterToWorld,
        }
    }

    pub fn to_emitter(kind: ConversionKind) -> Self {
        Self {
            kind,
            direction: ConversionDirection::WorldToEmitter,
        }
    }

    /// 转换 xyz 分量，w 保持不变
    pub fn convert(&self, value: Vec4, emitter: &HostTransform) -> Vec4 {
        let v = value.truncate();
        let converted = match (self.kind, self.direction) {
            (ConversionKind::Position, ConversionDirection::EmitterToWorld) => {
                emitter.position + emitter.rotation * v
            }
            (ConversionKind::Position, ConversionDirection::WorldToEmitter) => {
                emitter.rotation.inverse() * (v - emitter.position)
            }
            (ConversionKind::Rotation, ConversionDirection::EmitterToWorld) => {
                v + emitter.euler_degrees()
            }
            (ConversionKind::Rotation, ConversionDirection::WorldToEmitter) => {
                v - emitter.euler_degrees()
            }
            (ConversionKind::Velocity, ConversionDirection::EmitterToWorld) => {
                emitter.linear_matrix().transform_vector3(v)
            }
            (ConversionKind::Velocity, ConversionDirection::WorldToEmitter) => {
                emitter.linear_matrix().inverse().transform_vector3(v)
            }
            (ConversionKind::Scale, ConversionDirection::EmitterToWorld) => v * emitter.lossy_scale,
            (ConversionKind::Scale, ConversionDirection::WorldToEmitter) => {
                let s = emitter.lossy_scale;
                Vec3::new(safe_div(v.x, s.x), safe_div(v.y, s.y), safe_div(v.z, s.z))
            }
        };
        converted.extend(value.w)
    }
}

fn safe_div(v: f32, d: f32) -> f32 {
    if d.abs() < f32::EPSILON {
        0.0
    } else {
        v / d
    }
}
