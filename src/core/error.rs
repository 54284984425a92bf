//! 统一错误处理模块
//!
//! 提供粒子引擎范围内的错误类型定义
//!
//! ## 错误分类
//!
//! - **资源耗尽** (`PoolError::Exhausted`): 粒子池没有空闲槽位，本帧停止生成
//! - **前置条件违反** (`PoolError::AlreadyFree`): 重复释放槽位，属于调用方错误
//! - **配置错误** (`ConfigError`): 配置文件读取、解析或验证失败
//! - **层级错误** (`TreeError`): 发射器层级中引用了不存在的节点
//!
//! 以上错误都不会中断模拟帧：发射器在本地吸收它们并通过 tracing 记录。

use crate::particles::EmitterId;
use thiserror::Error;

/// 粒子引擎错误类型
#[derive(Error, Debug)]
pub enum ParticleError {
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hierarchy error: {0}")]
    Tree(#[from] TreeError),

    #[error("Shared stack error: {0}")]
    Shared(#[from] SharedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 粒子池错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Particle pool exhausted (capacity {capacity})")]
    Exhausted { capacity: usize },

    #[error("Particle slot {0} released while already free")]
    AlreadyFree(usize),

    #[error("Particle slot {index} out of range (capacity {capacity})")]
    OutOfRange { index: usize, capacity: usize },
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

/// 发射器层级错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("Unknown emitter: {0:?}")]
    UnknownEmitter(EmitterId),
}

/// 共享栈错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// 共享属性不能再引用其他属性，保证引用链无环
    #[error("Shared property '{0}' cannot be in reference mode")]
    ReferenceNotAllowed(String),
}

/// 结果类型别名
pub type ParticleResult<T> = Result<T, ParticleError>;
pub type PoolResult<T> = Result<T, PoolError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
