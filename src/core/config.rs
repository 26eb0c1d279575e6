//! 导航核心配置
//!
//! 配置文件支持 YAML 与 JSON（按扩展名区分），所有字段都有默认值，
//! 因此空文件也是合法配置。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::navigation::builtin::RateLimitScope;
use crate::security::rbac::PermissionPolicy;
use crate::utils::{NavixError, Result};
use crate::validation::rules;

/// 导航管理器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// 历史记录上限
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// 导航前执行 ValidationEngine
    #[serde(default = "default_true")]
    pub enable_validation: bool,

    /// 导航前执行 SecurityEngine
    #[serde(default = "default_true")]
    pub enable_security: bool,

    /// 参数中标识当前用户的键（RBAC 与限流使用）
    #[serde(default = "default_identity_param")]
    pub identity_param: String,
}

fn default_max_history() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_identity_param() -> String {
    "user_id".to_string()
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            enable_validation: true,
            enable_security: true,
            identity_param: default_identity_param(),
        }
    }
}

/// 校验规则配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// 加载内置规则（命名模式、保留路由、常用参数规则）
    #[serde(default)]
    pub use_default_rules: bool,

    /// 额外的路由正则
    #[serde(default)]
    pub route_patterns: Vec<String>,

    /// 额外的保留路由
    #[serde(default)]
    pub reserved_routes: Vec<String>,

    /// 按名字启用的内置参数规则（user_id、admin_level、asset_id、theme）
    #[serde(default)]
    pub parameter_rules: Vec<String>,
}

/// 安全配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// 加载内置阻止模式
    #[serde(default)]
    pub use_default_rules: bool,

    /// 额外的阻止模式
    #[serde(default)]
    pub blocked_patterns: Vec<String>,

    /// 模块白名单（空表示不限制）
    #[serde(default)]
    pub allowed_modules: Vec<String>,

    /// 导航时执行 RBAC 检查
    #[serde(default)]
    pub enable_rbac: bool,

    /// 未配置权限的路由是否对所有已知用户开放
    #[serde(default)]
    pub allow_unrestricted_routes: bool,

    /// RBAC 判定策略
    #[serde(default)]
    pub permission_policy: PermissionPolicy,
}

/// 限流拦截器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 是否安装限流拦截器
    #[serde(default)]
    pub enabled: bool,

    /// 窗口内允许的导航次数
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// 滑动窗口长度（秒）
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// 计数维度
    #[serde(default)]
    pub scope: RateLimitScope,

    /// 同时跟踪的键上限
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,
}

fn default_max_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_tracked_keys() -> usize {
    1024
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            scope: RateLimitScope::default(),
            max_tracked_keys: default_max_tracked_keys(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 导航核心总配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavixConfig {
    /// 来源文件
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 导航
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// 校验
    #[serde(default)]
    pub validation: ValidationConfig,

    /// 安全
    #[serde(default)]
    pub security: SecurityConfig,

    /// 限流
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// 框架名 → 适配器标识，由外部适配层解释
    #[serde(default)]
    pub frameworks: BTreeMap<String, String>,

    /// 日志
    #[serde(default)]
    pub logging: LogConfig,
}

impl NavixConfig {
    /// 创建构建器
    pub fn builder() -> NavixConfigBuilder {
        NavixConfigBuilder::default()
    }

    /// 从文件加载，`.json` 按 JSON 解析，其余按 YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NavixError::ConfigLoadFailed(format!("无法读取 '{}': {e}", path.display()))
        })?;

        let mut config: NavixConfig = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else if content.trim().is_empty() {
            NavixConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// 检查取值是否可用
    pub fn validate(&self) -> Result<()> {
        if self.navigation.max_history == 0 {
            return Err(invalid("navigation.max_history", "必须大于 0"));
        }
        if self.navigation.identity_param.is_empty() {
            return Err(invalid("navigation.identity_param", "不能为空"));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(invalid("rate_limit.max_requests", "必须大于 0"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(invalid("rate_limit.window_secs", "必须大于 0"));
        }
        if self.rate_limit.max_tracked_keys == 0 {
            return Err(invalid("rate_limit.max_tracked_keys", "必须大于 0"));
        }

        for name in &self.validation.parameter_rules {
            if rules::named_rule(name).is_none() {
                return Err(invalid(
                    "validation.parameter_rules",
                    &format!("未知的参数规则 '{name}'"),
                ));
            }
        }

        let patterns = self
            .validation
            .route_patterns
            .iter()
            .map(|p| ("validation.route_patterns", p))
            .chain(
                self.security
                    .blocked_patterns
                    .iter()
                    .map(|p| ("security.blocked_patterns", p)),
            );
        for (key, pattern) in patterns {
            if let Err(e) = Regex::new(pattern) {
                return Err(invalid(key, &format!("'{pattern}' 无法编译: {e}")));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> NavixError {
    NavixError::InvalidConfigValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// [`NavixConfig`] 构建器
#[derive(Debug, Default)]
pub struct NavixConfigBuilder {
    config: NavixConfig,
}

impl NavixConfigBuilder {
    /// 历史上限
    pub fn max_history(mut self, max: usize) -> Self {
        self.config.navigation.max_history = max;
        self
    }

    /// 启用或关闭导航前校验
    pub fn enable_validation(mut self, enable: bool) -> Self {
        self.config.navigation.enable_validation = enable;
        self
    }

    /// 启用或关闭导航前安全检查
    pub fn enable_security(mut self, enable: bool) -> Self {
        self.config.navigation.enable_security = enable;
        self
    }

    /// 加载内置校验与安全规则
    pub fn default_rules(mut self) -> Self {
        self.config.validation.use_default_rules = true;
        self.config.security.use_default_rules = true;
        self
    }

    /// 追加路由正则
    pub fn route_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.validation.route_patterns.push(pattern.into());
        self
    }

    /// 追加保留路由
    pub fn reserved_route(mut self, route: impl Into<String>) -> Self {
        self.config.validation.reserved_routes.push(route.into());
        self
    }

    /// 追加阻止模式
    pub fn blocked_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.security.blocked_patterns.push(pattern.into());
        self
    }

    /// 追加白名单模块
    pub fn allowed_module(mut self, module: impl Into<String>) -> Self {
        self.config.security.allowed_modules.push(module.into());
        self
    }

    /// 导航时执行 RBAC 检查
    pub fn enable_rbac(mut self, enable: bool) -> Self {
        self.config.security.enable_rbac = enable;
        self
    }

    /// RBAC 策略
    pub fn permission_policy(mut self, policy: PermissionPolicy) -> Self {
        self.config.security.permission_policy = policy;
        self
    }

    /// 未配置权限的路由对已知用户开放
    pub fn allow_unrestricted_routes(mut self, allow: bool) -> Self {
        self.config.security.allow_unrestricted_routes = allow;
        self
    }

    /// 安装限流拦截器
    pub fn rate_limit(mut self, max_requests: usize, window_secs: u64, scope: RateLimitScope) -> Self {
        self.config.rate_limit.enabled = true;
        self.config.rate_limit.max_requests = max_requests;
        self.config.rate_limit.window_secs = window_secs;
        self.config.rate_limit.scope = scope;
        self
    }

    /// 参数规则名
    pub fn parameter_rule(mut self, name: impl Into<String>) -> Self {
        self.config.validation.parameter_rules.push(name.into());
        self
    }

    /// 登记框架适配器
    pub fn framework(mut self, name: impl Into<String>, adapter: impl Into<String>) -> Self {
        self.config.frameworks.insert(name.into(), adapter.into());
        self
    }

    /// 日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 构建配置
    pub fn build(self) -> NavixConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavixConfig::default();
        assert_eq!(config.navigation.max_history, 50);
        assert_eq!(config.navigation.identity_param, "user_id");
        assert!(!config.security.allow_unrestricted_routes);
        assert_eq!(config.security.permission_policy, PermissionPolicy::Any);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = NavixConfig::builder()
            .max_history(3)
            .default_rules()
            .rate_limit(5, 10, RateLimitScope::User)
            .framework("qt", "pyside6")
            .build();

        assert_eq!(config.navigation.max_history, 3);
        assert!(config.validation.use_default_rules);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.scope, RateLimitScope::User);
        assert_eq!(config.frameworks.get("qt").map(String::as_str), Some("pyside6"));
    }

    #[test]
    fn test_validate_rejects_zero_history() {
        let config = NavixConfig::builder().max_history(0).build();
        assert!(matches!(
            config.validate(),
            Err(NavixError::InvalidConfigValue { key, .. }) if key == "navigation.max_history"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config = NavixConfig::builder().blocked_pattern("([unclosed").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_parameter_rule() {
        let config = NavixConfig::builder().parameter_rule("shoe_size").build();
        assert!(matches!(
            config.validate(),
            Err(NavixError::InvalidConfigValue { key, .. }) if key == "validation.parameter_rules"
        ));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "navigation:\n  max_history: 5\nsecurity:\n  permission_policy: all\n";
        let parsed: NavixConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.navigation.max_history, 5);
        assert!(parsed.navigation.enable_validation);
        assert_eq!(parsed.security.permission_policy, PermissionPolicy::All);
        assert_eq!(parsed.rate_limit.max_requests, 10);
    }
}
