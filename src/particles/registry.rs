//! 模块注册表
//!
//! 编辑器按类型名创建模块。所有内置模块类型登记在一张静态表中，
//! 每项带有分类和工厂函数。

use super::events::{EventCreatorModule, EventListenerModule, ListenerOutput};
use super::module::Module;
use super::multi_function::MultiFunctionModule;
use super::property::Property;
use super::render::{PointSpriteModule, RenderModule};
use super::sampler::{SampleCondition, SamplerModule, SamplerSource};
use glam::Vec4;

/// 模块分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleCategory {
    Value,
    Sampler,
    Event,
    MultiFunction,
    Render,
}

/// 工厂产物
#[derive(Debug)]
pub enum ModuleInstance {
    Stack(Module),
    MultiFunction(MultiFunctionModule),
    Render(Box<dyn RenderModule>),
}

/// 模块类型描述
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    pub type_name: &'static str,
    pub category: ModuleCategory,
    pub factory: fn() -> ModuleInstance,
}

fn scalar_value() -> ModuleInstance {
    ModuleInstance::Stack(Module::value("Scalar", Property::scalar(0.0)))
}

fn vector_value() -> ModuleInstance {
    ModuleInstance::Stack(Module::value("Vector", Property::vector(Vec4::ZERO)))
}

fn color_value() -> ModuleInstance {
    ModuleInstance::Stack(Module::value("Color", Property::vector(Vec4::ONE)))
}

fn random_scalar() -> ModuleInstance {
    ModuleInstance::Stack(Module::value("Random Scalar", Property::random_scalar(0.0, 1.0)))
}

fn random_vector() -> ModuleInstance {
    ModuleInstance::Stack(Module::value(
        "Random Vector",
        Property::random_vector(Vec4::splat(-1.0), Vec4::ONE),
    ))
}

fn property_sampler() -> ModuleInstance {
    ModuleInstance::Stack(Module::sampler(
        "Property Sampler",
        SamplerModule::new(
            SamplerSource::Property(Property::vector(Vec4::ZERO)),
            SampleCondition::ByTime {
                interval: 1.0,
                offset: 0.0,
            },
        )
        .with_sample_on_spawn(true),
    ))
}

fn event_creator() -> ModuleInstance {
    ModuleInstance::Stack(Module::event_creator(
        "Event Creator",
        EventCreatorModule::new("Event", Property::scalar(0.0)),
    ))
}

fn event_listener() -> ModuleInstance {
    ModuleInstance::Stack(Module::event_listener(
        "Event Listener",
        EventListenerModule::new("Event", ListenerOutput::Payload(0)),
    ))
}

fn multi_function() -> ModuleInstance {
    ModuleInstance::MultiFunction(MultiFunctionModule::new("Multi Function"))
}

fn point_sprite() -> ModuleInstance {
    ModuleInstance::Render(Box::new(PointSpriteModule::new("Point Sprites")))
}

/// 内置模块类型表
pub static MODULE_REGISTRY: &[ModuleDescriptor] = &[
    ModuleDescriptor {
        type_name: "ScalarValue",
        category: ModuleCategory::Value,
        factory: scalar_value,
    },
    ModuleDescriptor {
        type_name: "VectorValue",
        category: ModuleCategory::Value,
        factory: vector_value,
    },
    ModuleDescriptor {
        type_name: "ColorValue",
        category: ModuleCategory::Value,
        factory: color_value,
    },
    ModuleDescriptor {
        type_name: "RandomScalar",
        category: ModuleCategory::Value,
        factory: random_scalar,
    },
    ModuleDescriptor {
        type_name: "RandomVector",
        category: ModuleCategory::Value,
        factory: random_vector,
    },
    ModuleDescriptor {
        type_name: "PropertySampler",
        category: ModuleCategory::Sampler,
        factory: property_sampler,
    },
    ModuleDescriptor {
        type_name: "EventCreator",
        category: ModuleCategory::Event,
        factory: event_creator,
    },
    ModuleDescriptor {
        type_name: "EventListener",
        category: ModuleCategory::Event,
        factory: event_listener,
    },
    ModuleDescriptor {
        type_name: "MultiFunction",
        category: ModuleCategory::MultiFunction,
        factory: multi_function,
    },
    ModuleDescriptor {
        type_name: "PointSprite",
        category: ModuleCategory::Render,
        factory: point_sprite,
    },
];

pub fn find_module(type_name: &str) -> Option<&'static ModuleDescriptor> {
    MODULE_REGISTRY.iter().find(|d| d.type_name == type_name)
}

/// 按类型名创建模块
pub fn create_module(type_name: &str) -> Option<ModuleInstance> {
    find_module(type_name).map(|d| (d.factory)())
}

/// 某一分类下的所有模块类型
pub fn modules_in(category: ModuleCategory) -> impl Iterator<Item = &'static ModuleDescriptor> {
    MODULE_REGISTRY.iter().filter(move |d| d.category == category)
}
