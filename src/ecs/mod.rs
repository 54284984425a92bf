use crate::math::HostTransform;
use crate::particles::{EffectTree, HostInputs};
use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use std::collections::HashMap;

#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl From<&Transform> for HostTransform {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.pos,
            rotation: t.rot,
            lossy_scale: t.scale,
        }
    }
}

#[derive(Resource)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            delta_seconds: 0.0,
            elapsed_seconds: 0.0,
        }
    }
}

impl Time {
    pub fn advance(&mut self, dt: f32) {
        self.delta_seconds = dt;
        self.elapsed_seconds += dt as f64;
    }
}

/// 当前相机的世界变换
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct ActiveCamera(pub HostTransform);

/// 采样模块可按名称引用的宿主对象
#[derive(Component, Clone, Debug)]
pub struct NamedObject(pub String);

/// 实体上的粒子效果
#[derive(Component, Debug)]
pub struct ParticleEffect {
    pub tree: EffectTree,
    pub playing: bool,
    /// 额外的播放速度，叠加在各发射器的时间缩放上
    pub speed: f32,
}

impl ParticleEffect {
    pub fn new(tree: EffectTree) -> Self {
        Self {
            tree,
            playing: true,
            speed: 1.0,
        }
    }

    pub fn active_particles(&self) -> usize {
        self.tree.active_particles()
    }
}

/// 用实体变换、相机和命名对象组装宿主输入，推进每个正在播放的效果
pub fn particle_effect_update_system(
    time: Res<Time>,
    camera: Option<Res<ActiveCamera>>,
    objects: Query<(&Transform, &NamedObject)>,
    mut effects: Query<(&Transform, &mut ParticleEffect)>,
) {
    let named: HashMap<String, HostTransform> = objects
        .iter()
        .map(|(t, name)| (name.0.clone(), HostTransform::from(t)))
        .collect();
    let camera = camera.map(|c| c.0).unwrap_or_default();

    for (transform, mut effect) in effects.iter_mut() {
        if !effect.playing {
            continue;
        }
        let host = HostInputs {
            emitter: HostTransform::from(transform),
            camera,
            real_time: time.elapsed_seconds,
            objects: named.clone(),
        };
        let dt = time.delta_seconds * effect.speed;
        effect.tree.tick(dt, &host);
    }
}

/// 把效果系统加入调度
pub fn register_particle_systems(schedule: &mut Schedule) {
    schedule.add_systems(particle_effect_update_system);
}
