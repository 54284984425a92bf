//! 多功能栈
//!
//! 多功能模块可以同时覆盖多个通道。每个通道的主栈求值完成后，
//! 所有针对该通道的覆盖按模块顺序再混合一遍。

use super::channel::ChannelId;
use super::context::EvalContext;
use super::pool::SlotIndex;
use super::property::Property;
use crate::math::{BlendMode, ChannelElement};

/// 对单个通道的覆盖
#[derive(Debug, Clone)]
pub struct ChannelOverride {
    pub channel: ChannelId,
    pub value: Property,
    pub blend_mode: BlendMode,
}

#[derive(Debug, Clone)]
pub struct MultiFunctionModule {
    pub name: String,
    pub enabled: bool,
    pub weight: Property,
    pub overrides: Vec<ChannelOverride>,
}

impl MultiFunctionModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            weight: Property::scalar(1.0),
            overrides: Vec::new(),
        }
    }

    pub fn with_override(
        mut self,
        channel: ChannelId,
        value: Property,
        blend_mode: BlendMode,
    ) -> Self {
        self.overrides.push(ChannelOverride {
            channel,
            value,
            blend_mode,
        });
        self
    }

    pub fn with_weight(mut self, weight: Property) -> Self {
        self.weight = weight;
        self
    }

    pub fn for_each_property_mut(&mut self, f: &mut dyn FnMut(&mut Property)) {
        f(&mut self.weight);
        self.overrides.iter_mut().for_each(|o| f(&mut o.value));
    }

    fn targets(&self, channel: ChannelId) -> impl Iterator<Item = &ChannelOverride> {
        self.overrides.iter().filter(move |o| o.channel == channel)
    }
}

/// 多功能模块列表
#[derive(Debug, Clone, Default)]
pub struct MultiFunctionStack {
    modules: Vec<MultiFunctionModule>,
}

impl MultiFunctionStack {
    pub fn push(&mut self, module: MultiFunctionModule) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<MultiFunctionModule> {
        (index < self.modules.len()).then(|| self.modules.remove(index))
    }

    pub fn modules(&self) -> &[MultiFunctionModule] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut [MultiFunctionModule] {
        &mut self.modules
    }

    /// 是否有启用的模块覆盖该通道
    pub fn touches(&self, channel: ChannelId) -> bool {
        self.modules
            .iter()
            .any(|m| m.enabled && m.targets(channel).next().is_some())
    }

    /// 对逐粒子通道执行覆盖
    pub fn apply<T: ChannelElement>(
        &self,
        channel: ChannelId,
        values: &mut [T],
        active: &[SlotIndex],
        ctx: &EvalContext<'_>,
    ) {
        let rotation = channel.is_rotation();
        for module in self.modules.iter().filter(|m| m.enabled) {
            for target in module.targets(channel) {
                for &index in active {
                    let slot = Some(index);
                    let weight = module.weight.get_scalar(slot, ctx);
                    let contribution = T::from_vec4(target.value.get_value(slot, ctx));
                    if let Some(v) = values.get_mut(index) {
                        *v = T::blend(*v, contribution, weight, target.blend_mode, rotation);
                    }
                }
            }
        }
    }

    /// 对发射器级单值通道执行覆盖
    pub fn apply_scalar(&self, channel: ChannelId, value: &mut f32, ctx: &EvalContext<'_>) {
        for module in self.modules.iter().filter(|m| m.enabled) {
            for target in module.targets(channel) {
                let weight = module.weight.get_scalar(None, ctx);
                let contribution = target.value.get_scalar(None, ctx);
                *value = f32::blend(*value, contribution, weight, target.blend_mode, false);
            }
        }
    }
}
