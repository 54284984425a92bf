//! 核心模块
//!
//! 包含粒子引擎的基础设施：
//! - `error` - 错误类型定义
//! - `macros` - 减少样板代码的宏

pub mod error;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    ConfigError, ConfigResult, ParticleError, ParticleResult, PoolError, PoolResult, SharedError,
    TreeError,
};
