//! 积分
//!
//! 速率通道（加速度、速度、旋转速率）和直接编写的通道（位置、旋转）
//! 组合而不互相覆盖：速率被积分进累加器后叠加到直接值上，
//! 直接值的变化量又被微分回速率通道。

use super::channel::ChannelSet;
use super::pool::SlotIndex;
use crate::math::coordinates::{euler_degrees_to_quat, quat_to_euler_degrees};
use glam::Vec4;

/// 逐粒子积分状态
#[derive(Debug, Clone, Default)]
pub struct IntegrationState {
    acceleration_accumulator: Vec<Vec4>,
    velocity_accumulator: Vec<Vec4>,
    rotation_rate_accumulator: Vec<Vec4>,
    old_position: Vec<Vec4>,
    old_velocity: Vec<Vec4>,
    old_acceleration: Vec<Vec4>,
    old_rotation: Vec<Vec4>,
    primed: Vec<bool>,
}

impl IntegrationState {
    pub fn new(capacity: usize) -> Self {
        let mut state = Self::default();
        state.resize(capacity);
        state
    }

    pub fn resize(&mut self, capacity: usize) {
        self.acceleration_accumulator = vec![Vec4::ZERO; capacity];
        self.velocity_accumulator = vec![Vec4::ZERO; capacity];
        self.rotation_rate_accumulator = vec![Vec4::ZERO; capacity];
        self.old_position = vec![Vec4::ZERO; capacity];
        self.old_velocity = vec![Vec4::ZERO; capacity];
        self.old_acceleration = vec![Vec4::ZERO; capacity];
        self.old_rotation = vec![Vec4::ZERO; capacity];
        self.primed = vec![false; capacity];
    }

    /// 新粒子从零累加器开始，第一帧不产生推导速率
    pub fn reset_slot(&mut self, index: SlotIndex) {
        if index >= self.primed.len() {
            return;
        }
        self.acceleration_accumulator[index] = Vec4::ZERO;
        self.velocity_accumulator[index] = Vec4::ZERO;
        self.rotation_rate_accumulator[index] = Vec4::ZERO;
        self.old_acceleration[index] = Vec4::ZERO;
        self.primed[index] = false;
    }

    /// 位置累加器（速率积分的位移）
    pub fn velocity_accumulator(&self, index: SlotIndex) -> Option<Vec4> {
        self.velocity_accumulator.get(index).copied()
    }

    /// 积分所有活跃粒子
    ///
    /// `smoothing` 是推导加速度的平滑速率，插值系数为 `clamp(smoothing * dt, 0, 1)`。
    pub fn integrate(
        &mut self,
        channels: &mut ChannelSet,
        active: &[SlotIndex],
        dt: f32,
        smoothing: f32,
    ) {
        let t = (smoothing * dt).clamp(0.0, 1.0);
        for &i in active {
            if i >= self.primed.len() {
                continue;
            }
            // 第一帧或零步长时推导速率为零
            let derive = self.primed[i] && dt > 0.0;
            if !self.primed[i] {
                self.old_position[i] = channels.position[i];
                self.old_rotation[i] = channels.rotation[i];
                self.primed[i] = true;
            }

            // 加速度 → 速度 → 位移
            let acceleration = channels.acceleration[i];
            self.acceleration_accumulator[i] += acceleration * dt;
            let mut velocity = channels.velocity[i] + self.acceleration_accumulator[i];
            self.velocity_accumulator[i] += velocity * dt;

            // 直接位置的变化量视为速度
            let direct_position = channels.position[i];
            let velocity_from_position = if derive {
                (direct_position - self.old_position[i]) / dt
            } else {
                Vec4::ZERO
            };
            self.old_position[i] = direct_position;
            channels.position[i] = direct_position + self.velocity_accumulator[i];

            // 速度变化量视为加速度，平滑后写回
            velocity += velocity_from_position;
            let acceleration_from_velocity = if derive {
                (velocity - self.old_velocity[i]) / dt
            } else {
                Vec4::ZERO
            };
            self.old_velocity[i] = velocity;
            channels.velocity[i] = velocity;

            let target = acceleration + acceleration_from_velocity;
            let smoothed = self.old_acceleration[i].lerp(target, t);
            self.old_acceleration[i] = smoothed;
            channels.acceleration[i] = smoothed;

            // 旋转：直接值与积分的旋转速率以四元数组合
            let rotation_rate = channels.rotation_rate[i];
            self.rotation_rate_accumulator[i] += rotation_rate * dt;
            let direct_rotation = channels.rotation[i];
            let rate_from_rotation = if derive {
                (direct_rotation - self.old_rotation[i]) / dt
            } else {
                Vec4::ZERO
            };
            self.old_rotation[i] = direct_rotation;

            let composed = euler_degrees_to_quat(direct_rotation.truncate())
                * euler_degrees_to_quat(self.rotation_rate_accumulator[i].truncate());
            channels.rotation[i] = quat_to_euler_degrees(composed).extend(direct_rotation.w);
            channels.rotation_rate[i] = rotation_rate + rate_from_rotation;
        }
    }
}
