use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 积分阶段配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// 由速度变化推导出的加速度的平滑速率（每秒）
    pub acceleration_smoothing: f32,
}

impl_default!(IntegrationConfig {
    acceleration_smoothing: 10.0,
});

impl IntegrationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.acceleration_smoothing.is_finite() && self.acceleration_smoothing >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid acceleration smoothing: {}",
                self.acceleration_smoothing
            )));
        }
        Ok(())
    }
}
