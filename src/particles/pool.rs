//! 粒子池 - 固定容量的槽位分配器
//!
//! 每个空闲下标在归还之前最多被分配一次。活跃下标按分配顺序保存，
//! 一帧之内迭代顺序稳定。

use crate::core::error::{PoolError, PoolResult};

/// 粒子槽位下标，所有逐粒子数组共用
pub type SlotIndex = usize;

/// 粒子池
#[derive(Debug, Clone)]
pub struct ParticlePool {
    capacity: usize,
    /// 空闲下标栈，后进先出
    free: Vec<SlotIndex>,
    /// 活跃下标
    active: Vec<SlotIndex>,
    /// 每个槽位在 `active` 中的位置
    position: Vec<Option<usize>>,
}

impl ParticlePool {
    /// 创建粒子池，所有槽位初始为空闲
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            // 倒序压栈，让 0 号槽位最先被分配
            free: (0..capacity).rev().collect(),
            active: Vec::with_capacity(capacity),
            position: vec![None; capacity],
        }
    }

    /// 从池中获取一个空闲槽位
    pub fn acquire(&mut self) -> PoolResult<SlotIndex> {
        let index = self.free.pop().ok_or(PoolError::Exhausted {
            capacity: self.capacity,
        })?;
        self.position[index] = Some(self.active.len());
        self.active.push(index);
        Ok(index)
    }

    /// 将槽位归还到池中
    ///
    /// 归还一个已经空闲的槽位是调用方错误，返回 [`PoolError::AlreadyFree`]。
    pub fn release(&mut self, index: SlotIndex) -> PoolResult<()> {
        if index >= self.capacity {
            return Err(PoolError::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        let pos = self.position[index].ok_or(PoolError::AlreadyFree(index))?;

        self.active.swap_remove(pos);
        if let Some(&moved) = self.active.get(pos) {
            self.position[moved] = Some(pos);
        }
        self.position[index] = None;
        self.free.push(index);
        Ok(())
    }

    /// 当前活跃的槽位
    pub fn active_indices(&self) -> &[SlotIndex] {
        &self.active
    }

    pub fn is_active(&self, index: SlotIndex) -> bool {
        self.position.get(index).is_some_and(Option::is_some)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 释放所有槽位
    pub fn clear(&mut self) {
        *self = Self::new(self.capacity);
    }
}
