//! 工具模块
//!
//! 错误类型、ID 生成与日志初始化。

pub mod error;
pub mod id;
pub mod logger;

pub use error::{error_code, NavixError, Result};
pub use id::{generate_id, generate_uuid};
pub use logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
