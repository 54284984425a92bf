//! 通道与逐粒子状态
//!
//! 每个通道是一条属性流：发射器级的单个浮点数，或长度等于池容量的数组。

use super::pool::SlotIndex;
use glam::Vec4;

/// 通道形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelShape {
    /// 发射器级单值
    Scalar,
    /// 逐粒子浮点数
    FloatArray,
    /// 逐粒子 Vec4
    VectorArray,
}

/// 通道标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    SpawnRate,
    DeathCondition,
    DeathDuration,
    CustomScalar,
    CustomVector,
    Acceleration,
    Velocity,
    Position,
    PivotOffset,
    RotationRate,
    Rotation,
    Scale,
    Color,
}

impl ChannelId {
    /// 死亡通道之后逐粒子通道的求值顺序
    pub const EVALUATION_ORDER: [ChannelId; 10] = [
        ChannelId::CustomScalar,
        ChannelId::CustomVector,
        ChannelId::Acceleration,
        ChannelId::Velocity,
        ChannelId::Position,
        ChannelId::PivotOffset,
        ChannelId::RotationRate,
        ChannelId::Rotation,
        ChannelId::Scale,
        ChannelId::Color,
    ];

    pub fn shape(self) -> ChannelShape {
        match self {
            Self::SpawnRate => ChannelShape::Scalar,
            Self::DeathCondition | Self::DeathDuration | Self::CustomScalar => {
                ChannelShape::FloatArray
            }
            _ => ChannelShape::VectorArray,
        }
    }

    /// 旋转通道的 Normal 混合走四元数插值
    pub fn is_rotation(self) -> bool {
        matches!(self, Self::Rotation)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SpawnRate => "SpawnRate",
            Self::DeathCondition => "DeathCondition",
            Self::DeathDuration => "DeathDuration",
            Self::CustomScalar => "CustomScalar",
            Self::CustomVector => "CustomVector",
            Self::Acceleration => "Acceleration",
            Self::Velocity => "Velocity",
            Self::Position => "Position",
            Self::PivotOffset => "PivotOffset",
            Self::RotationRate => "RotationRate",
            Self::Rotation => "Rotation",
            Self::Scale => "Scale",
            Self::Color => "Color",
        }
    }
}

/// 所有通道的值
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    pub spawn_rate: f32,
    pub death_condition: Vec<f32>,
    pub death_duration: Vec<f32>,
    pub custom_scalar: Vec<f32>,
    pub custom_vector: Vec<Vec4>,
    pub acceleration: Vec<Vec4>,
    pub velocity: Vec<Vec4>,
    pub position: Vec<Vec4>,
    pub pivot_offset: Vec<Vec4>,
    pub rotation_rate: Vec<Vec4>,
    pub rotation: Vec<Vec4>,
    pub scale: Vec<Vec4>,
    pub color: Vec<Vec4>,
}

impl ChannelSet {
    pub fn new(capacity: usize) -> Self {
        let mut set = Self::default();
        set.resize(capacity);
        set
    }

    /// 重新分配所有数组并清零
    pub fn resize(&mut self, capacity: usize) {
        self.spawn_rate = 0.0;
        for id in [
            ChannelId::DeathCondition,
            ChannelId::DeathDuration,
            ChannelId::CustomScalar,
        ] {
            if let Some(values) = self.floats_mut(id) {
                *values = vec![0.0; capacity];
            }
        }
        for id in ChannelId::EVALUATION_ORDER {
            if let Some(values) = self.vectors_mut(id) {
                *values = vec![Vec4::ZERO; capacity];
            }
        }
    }

    pub fn floats(&self, id: ChannelId) -> Option<&[f32]> {
        match id {
            ChannelId::DeathCondition => Some(&self.death_condition),
            ChannelId::DeathDuration => Some(&self.death_duration),
            ChannelId::CustomScalar => Some(&self.custom_scalar),
            _ => None,
        }
    }

    pub fn floats_mut(&mut self, id: ChannelId) -> Option<&mut Vec<f32>> {
        match id {
            ChannelId::DeathCondition => Some(&mut self.death_condition),
            ChannelId::DeathDuration => Some(&mut self.death_duration),
            ChannelId::CustomScalar => Some(&mut self.custom_scalar),
            _ => None,
        }
    }

    pub fn vectors(&self, id: ChannelId) -> Option<&[Vec4]> {
        match id {
            ChannelId::CustomVector => Some(&self.custom_vector),
            ChannelId::Acceleration => Some(&self.acceleration),
            ChannelId::Velocity => Some(&self.velocity),
            ChannelId::Position => Some(&self.position),
            ChannelId::PivotOffset => Some(&self.pivot_offset),
            ChannelId::RotationRate => Some(&self.rotation_rate),
            ChannelId::Rotation => Some(&self.rotation),
            ChannelId::Scale => Some(&self.scale),
            ChannelId::Color => Some(&self.color),
            _ => None,
        }
    }

    pub fn vectors_mut(&mut self, id: ChannelId) -> Option<&mut Vec<Vec4>> {
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

    /// 清零单个槽位，新粒子不会读到旧粒子的值
    pub fn clear_slot(&mut self, index: SlotIndex) {
        for id in [
            ChannelId::DeathCondition,
            ChannelId::DeathDuration,
            ChannelId::CustomScalar,
        ] {
            if let Some(v) = self.floats_mut(id).and_then(|values| values.get_mut(index)) {
                *v = 0.0;
            }
        }
        for id in ChannelId::EVALUATION_ORDER {
            if let Some(v) = self.vectors_mut(id).and_then(|values| values.get_mut(index)) {
                *v = Vec4::ZERO;
            }
        }
    }

    /// 以 Vec4 读取通道值
    ///
    /// 逐粒子通道在没有粒子上下文时返回零。
    pub fn read(&self, id: ChannelId, slot: Option<SlotIndex>) -> Vec4 {
        match id.shape() {
            ChannelShape::Scalar => Vec4::new(self.spawn_rate, 0.0, 0.0, 0.0),
            ChannelShape::FloatArray => slot
                .and_then(|i| self.floats(id).and_then(|v| v.get(i)))
                .map_or(Vec4::ZERO, |&x| Vec4::new(x, 0.0, 0.0, 0.0)),
            ChannelShape::VectorArray => slot
                .and_then(|i| self.vectors(id).and_then(|v| v.get(i)))
                .copied()
                .unwrap_or(Vec4::ZERO),
        }
    }
}

/// 粒子死亡标记的哨兵值
pub const NOT_DYING: f32 = -1.0;

/// 逐粒子生命周期状态
#[derive(Debug, Clone, Default)]
pub struct ParticleState {
    /// 随机种子基础，每次生成重新分配
    pub particle_id: Vec<i32>,
    /// 年龄（秒）
    pub age: Vec<f32>,
    /// 到达该年龄时释放，[`NOT_DYING`] 表示未进入死亡
    pub dying_at: Vec<f32>,
}

impl ParticleState {
    pub fn new(capacity: usize) -> Self {
        Self {
            particle_id: vec![0; capacity],
            age: vec![0.0; capacity],
            dying_at: vec![NOT_DYING; capacity],
        }
    }

    /// 初始化新生成的粒子
    pub fn spawn(&mut self, index: SlotIndex, particle_id: i32) {
        self.particle_id[index] = particle_id;
        self.age[index] = 0.0;
        self.dying_at[index] = NOT_DYING;
    }

    pub fn capacity(&self) -> usize {
        self.age.len()
    }

    pub fn is_dying(&self, index: SlotIndex) -> bool {
        self.dying_at[index] >= 0.0
    }

    /// 已到达释放年龄
    pub fn is_expired(&self, index: SlotIndex) -> bool {
        self.is_dying(index) && self.age[index] >= self.dying_at[index]
    }

    pub fn particle_id(&self, slot: Option<SlotIndex>) -> i32 {
        slot.and_then(|i| self.particle_id.get(i)).copied().unwrap_or(0)
    }

    pub fn age(&self, slot: Option<SlotIndex>) -> f32 {
        slot.and_then(|i| self.age.get(i)).copied().unwrap_or(0.0)
    }
}
