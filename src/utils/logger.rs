//! 日志初始化
//!
//! 基于 `tracing-subscriber` 组装控制台与滚动文件输出，支持 pretty / JSON 两种格式。
//! 导航核心本身只通过 `tracing` 宏打点，是否以及如何输出由宿主程序调用
//! [`Logger::init`] 决定。
//!
//! ```rust,no_run
//! use navix_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! let config = LoggerConfig::builder()
//!     .level("debug")
//!     .json_format(true)
//!     .file_output("./logs")
//!     .rotation(RotationStrategy::Hourly)
//!     .build();
//! let _guard = Logger::init(config).unwrap();
//!
//! tracing::info!(route = "core.main_window", "navigation started");
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::config::LogConfig;
use crate::utils::{NavixError, Result};

/// 日志文件轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 单个文件
    Never,
    /// 每小时
    Hourly,
    /// 每天
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从配置字符串解析，无法识别时按天轮转
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认级别（`RUST_LOG` 优先）
    pub level: String,
    /// JSON 输出
    pub json_format: bool,
    /// 输出到 stdout
    pub console_output: bool,
    /// 文件输出目录
    pub file_output: Option<PathBuf>,
    /// 文件名前缀
    pub file_prefix: String,
    /// 轮转策略
    pub rotation: RotationStrategy,
    /// 额外的 EnvFilter 指令，逗号分隔，例如 `navix_core::navigation=trace`
    pub filter_directives: Option<String>,
    /// 显示 target
    pub show_target: bool,
    /// 控制台 ANSI 颜色
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: "navix".to_string(),
            rotation: RotationStrategy::Daily,
            filter_directives: None,
            show_target: true,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::default()
    }

    /// 由配置文件中的 `logging` 节生成
    pub fn from_log_config(log: &LogConfig) -> Self {
        Self {
            level: log.level.clone(),
            json_format: log.json_format,
            file_output: if log.file_output {
                log.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log.rotation),
            ..Default::default()
        }
    }
}

/// [`LoggerConfig`] 构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// JSON 输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 文件名前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 轮转策略
    pub fn rotation(mut self, rotation: RotationStrategy) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// 额外过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 控制台颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

/// 非阻塞写入器守卫
///
/// 丢弃时刷新挂起的日志，需保持到程序退出。
#[derive(Default)]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

impl LogGuard {
    /// 是否持有写入器（`try_init` 在重复初始化时返回空守卫）
    pub fn is_empty(&self) -> bool {
        self._guards.is_empty()
    }
}

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志系统入口
pub struct Logger;

impl Logger {
    /// 初始化全局订阅者
    ///
    /// # Errors
    ///
    /// 重复初始化或全局订阅者已被其他代码设置时返回 [`NavixError::InitFailed`]。
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.get().is_some() {
            return Err(NavixError::InitFailed(
                "日志系统已初始化，不能重复初始化".to_string(),
            ));
        }

        let filter = Self::create_env_filter(&config);
        let mut guard = LogGuard::default();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.console_output {
            let (writer, worker) = tracing_appender::non_blocking(io::stdout());
            guard._guards.push(worker);
            layers.push(Self::fmt_layer(&config, writer, config.ansi_colors));
        }

        if let Some(dir) = &config.file_output {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                dir,
                format!("{}.log", config.file_prefix),
            );
            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard._guards.push(worker);
            layers.push(Self::fmt_layer(&config, writer, false));
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| NavixError::InitFailed(format!("日志系统初始化失败: {e}")))?;

        let _ = LOGGER_INITIALIZED.set(());
        Ok(guard)
    }

    /// 初始化，已初始化时返回空守卫
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_default()
    }

    /// 是否已经初始化
    pub fn is_initialized() -> bool {
        LOGGER_INITIALIZED.get().is_some()
    }

    fn fmt_layer(
        config: &LoggerConfig,
        writer: tracing_appender::non_blocking::NonBlocking,
        ansi: bool,
    ) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(config.show_target)
            .with_ansi(ansi && !config.json_format);
        if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }

    fn create_env_filter(config: &LoggerConfig) -> EnvFilter {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

        match &config.filter_directives {
            Some(directives) => directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .filter_map(|d| d.parse().ok())
                .fold(filter, |f, directive| f.add_directive(directive)),
            None => filter,
        }
    }
}

/// 创建一次导航的 span，期间的日志都带上目标路由
///
/// ```rust,ignore
/// let _span = navigation_span!("core.main_window").entered();
/// ```
#[macro_export]
macro_rules! navigation_span {
    ($route:expr) => {
        tracing::info_span!("navigation", route = %$route)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_parse() {
        assert_eq!(RotationStrategy::parse("HOURLY"), RotationStrategy::Hourly);
        assert_eq!(RotationStrategy::parse("none"), RotationStrategy::Never);
        assert_eq!(RotationStrategy::parse("weekly"), RotationStrategy::Daily);
    }

    #[test]
    fn test_builder() {
        let config = LoggerConfig::builder()
            .level("debug")
            .json_format(true)
            .file_output("/tmp/navix-logs")
            .filter_directives("navix_core::navigation=trace")
            .build();

        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.file_output, Some(PathBuf::from("/tmp/navix-logs")));
    }

    #[test]
    fn test_from_log_config_respects_file_flag() {
        let log = LogConfig {
            file_output: false,
            log_dir: Some(PathBuf::from("./logs")),
            ..Default::default()
        };
        assert!(LoggerConfig::from_log_config(&log).file_output.is_none());
    }

    #[test]
    fn test_try_init_twice_does_not_fail() {
        let _first = Logger::try_init(LoggerConfig::builder().console_output(false).build());
        let second = Logger::try_init(LoggerConfig::default());
        assert!(second.is_empty());
        assert!(Logger::init(LoggerConfig::default()).is_err());
    }
}
