use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 发射器全局设置（发射器元模块）
///
/// 每个发射器持有一份，控制池容量、循环时长和随机种子。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterSettings {
    /// 粒子池容量
    pub max_particles: usize,

    /// 一次循环的时长（秒）
    pub duration: f32,

    /// 是否循环；不循环时超过时长后停止生成
    pub looping: bool,

    /// 发射器随机种子，参与所有属性随机值的种子组合
    pub emitter_seed: i32,

    /// 时间缩放
    pub time_scale: f32,

    /// 新粒子ID的来源
    #[serde(default)]
    pub particle_ids: ParticleIdSource,
}

impl_default!(EmitterSettings {
    max_particles: 1000,
    duration: 5.0,
    looping: true,
    emitter_seed: 0,
    time_scale: 1.0,
    particle_ids: ParticleIdSource::Entropy,
});

impl EmitterSettings {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_particles == 0 {
            return Err(ConfigError::ValidationError(
                "max_particles must be greater than zero".to_string(),
            ));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid emitter duration: {}",
                self.duration
            )));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid time scale: {}",
                self.time_scale
            )));
        }
        Ok(())
    }
}

/// 粒子ID来源
///
/// `Entropy` 每次生成都使用系统熵，结果不可复现；
/// `Seeded` 从池重置时传入的种子派生，整个效果可复现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleIdSource {
    #[default]
    Entropy,
    Seeded,
}
