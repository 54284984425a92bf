//! 可复现随机数流
//!
//! 种子由 `(发射器种子, 属性种子, 粒子ID)` 组合而成。每次取值都创建新的流，
//! 相同的三元组总是得到相同的序列。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 确定性随机数流
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
}

impl RandomStream {
    /// 由三个种子分量创建随机流
    pub fn new(emitter_seed: i32, property_seed: i32, particle_id: i32) -> Self {
        Self::from_seed(Self::compose(emitter_seed, property_seed, particle_id))
    }

    /// 由已组合好的种子创建随机流
    pub fn from_seed(seed: i32) -> Self {
        // 先扩展到 u32 再转 u64，避免负数种子的符号扩展
        Self {
            rng: StdRng::seed_from_u64(u64::from(seed as u32)),
        }
    }

    /// 由系统熵创建，不可复现
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// 组合种子：`emitter_seed + property_seed + particle_id`（环绕加法）
    pub fn compose(emitter_seed: i32, property_seed: i32, particle_id: i32) -> i32 {
        emitter_seed
            .wrapping_add(property_seed)
            .wrapping_add(particle_id)
    }

    /// 取 [0, 1) 区间的下一个值
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// 取 [0, len) 区间的下一个下标；`len` 为零时返回 `None`
    pub fn next_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    /// 取下一个整数，用于生成粒子ID
    pub fn next_i32(&mut self) -> i32 {
        self.rng.gen::<i32>()
    }
}
