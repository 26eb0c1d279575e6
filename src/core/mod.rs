//! 核心模块
//!
//! 导航核心的配置结构与加载逻辑。

pub mod config;

pub use config::{
    LogConfig, NavigationConfig, NavixConfig, NavixConfigBuilder, RateLimitConfig,
    SecurityConfig, ValidationConfig,
};
