//! 模块栈
//!
//! 栈是模块的有序列表。求值时先把通道清零，再按顺序让每个启用的模块
//! 把自己的贡献混合进去，结果就是整个列表的左折叠，顺序有意义。

use super::channel::ChannelId;
use super::context::EvalContext;
use super::events::{EventData, EventQueue};
use super::module::Module;
use super::pool::SlotIndex;
use crate::math::ChannelElement;
use std::marker::PhantomData;

/// 栈的公共编辑操作
macro_rules! impl_stack_editing {
    (@impl [$($g:ident)?] $ty:ty) => {
        impl<$($g)?> $ty {
            pub fn channel(&self) -> ChannelId {
                self.channel
            }

            pub fn push(&mut self, module: Module) -> &mut Self {
                self.modules.push(module);
                self
            }

            pub fn insert(&mut self, index: usize, module: Module) {
                let index = index.min(self.modules.len());
                self.modules.insert(index, module);
            }

            pub fn remove(&mut self, index: usize) -> Option<Module> {
                (index < self.modules.len()).then(|| self.modules.remove(index))
            }

            /// 移动模块位置；下标越界时不做任何事
            pub fn move_module(&mut self, from: usize, to: usize) {
                if from >= self.modules.len() || to >= self.modules.len() {
                    return;
                }
                let module = self.modules.remove(from);
                self.modules.insert(to, module);
            }

            pub fn modules(&self) -> &[Module] {
                &self.modules
            }

            pub fn modules_mut(&mut self) -> &mut [Module] {
                &mut self.modules
            }

            pub fn len(&self) -> usize {
                self.modules.len()
            }

            pub fn is_empty(&self) -> bool {
                self.modules.is_empty()
            }

            pub fn on_pool_reset(&mut self, capacity: usize) {
                self.modules
                    .iter_mut()
                    .for_each(|m| m.on_pool_reset(capacity));
            }

            pub fn on_particle_spawned(&mut self, slot: SlotIndex) {
                self.modules
                    .iter_mut()
                    .for_each(|m| m.on_particle_spawned(slot));
            }

            pub fn on_loop_wrapped(&mut self) {
                self.modules.iter_mut().for_each(Module::on_loop_wrapped);
            }

            /// 投递给栈中所有监听者；返回接受的数量
            pub fn handle_event(&mut self, event: &EventData) -> usize {
                self.modules
                    .iter_mut()
                    .map(|m| m.handle_event(event))
                    .filter(|&accepted| accepted)
                    .count()
            }
        }
    };
    (<$g:ident> $ty:ty) => {
        impl_stack_editing!(@impl [$g] $ty);
    };
    ($ty:ty) => {
        impl_stack_editing!(@impl [] $ty);
    };
}

/// 发射器级单值栈
#[derive(Debug, Clone)]
pub struct ScalarStack {
    channel: ChannelId,
    modules: Vec<Module>,
}

impl ScalarStack {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            modules: Vec::new(),
        }
    }

    pub fn evaluate(&mut self, ctx: &EvalContext<'_>, events: &mut EventQueue) -> f32 {
        let mut value = 0.0;
        for module in self.modules.iter_mut().filter(|m| m.enabled) {
            module.evaluate_single(&mut value, ctx, events);
        }
        value
    }
}

impl_stack_editing!(ScalarStack);

/// 逐粒子通道栈
#[derive(Debug, Clone)]
pub struct ChannelStack<T> {
    channel: ChannelId,
    modules: Vec<Module>,
    _element: PhantomData<T>,
}

impl<T: ChannelElement> ChannelStack<T> {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            modules: Vec::new(),
            _element: PhantomData,
        }
    }

    /// 清零后按顺序折叠所有启用的模块
    pub fn evaluate(
        &mut self,
        values: &mut [T],
        active: &[SlotIndex],
        ctx: &EvalContext<'_>,
        events: &mut EventQueue,
    ) {
        values.fill(T::default());
        let rotation = self.channel.is_rotation();
        for module in self.modules.iter_mut().filter(|m| m.enabled) {
            module.evaluate(values, active, rotation, ctx, events);
        }
    }
}

impl_stack_editing!(<T> ChannelStack<T>);
