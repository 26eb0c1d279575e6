//! Navix 错误类型定义
//!
//! 本模块定义了导航核心中使用的所有错误类型。
//!
//! `navigate_to` 内部的任何失败都会被包装成唯一的 [`NavixError::Navigation`]，
//! 原始原因保存在 `source` 字段中，可以通过 [`std::error::Error::source`]、
//! [`NavixError::cause`] 或 [`NavixError::root_cause`] 以结构化方式取回。

use std::sync::Arc;

use thiserror::Error;

/// Navix 核心错误类型
#[derive(Error, Debug)]
pub enum NavixError {
    // ==================== 路由目录错误 ====================
    /// 路由未找到
    #[error("路由未找到: '{0}'")]
    RouteNotFound(String),

    /// 路由重复注册
    #[error("路由已注册: '{route}' (已绑定到 '{existing}')")]
    RouteConflict {
        /// 冲突的路由
        route: String,
        /// 已注册描述符的标题
        existing: String,
    },

    /// 路由清单合并冲突
    #[error("路由清单冲突: '{name}' 同时定义于 '{first}' 和 '{second}'")]
    RouteSourceConflict {
        /// 冲突的路由名
        name: String,
        /// 先出现的清单
        first: String,
        /// 后出现的清单
        second: String,
    },

    // ==================== 校验与安全错误 ====================
    /// 路由校验失败（保留路由或命名规则不匹配）
    #[error("路由校验失败: '{route}' - {reason}")]
    RouteValidation {
        /// 被拒绝的路由
        route: String,
        /// 失败原因
        reason: String,
    },

    /// 参数校验失败
    #[error("参数校验失败: '{param}' 的值 {value} 未通过校验")]
    ParameterValidation {
        /// 参数名
        param: String,
        /// 参数值（JSON 文本）
        value: String,
    },

    /// 通用校验失败（安全检查器、阻止模式、模块白名单）
    #[error("校验失败: {0}")]
    Validation(String),

    /// RBAC 权限被拒绝
    #[error("权限被拒绝: 用户 '{user}' 无权访问 '{route}'")]
    PermissionDenied {
        /// 用户 ID
        user: String,
        /// 目标路由
        route: String,
    },

    /// 正则模式无效
    #[error("无效的匹配模式 '{pattern}': {reason}")]
    InvalidPattern {
        /// 原始模式
        pattern: String,
        /// 编译错误
        reason: String,
    },

    // ==================== 导航错误 ====================
    /// 拦截器明确阻止了导航
    #[error("导航被拦截器 '{interceptor}' 阻止: {reason}")]
    InterceptorBlocked {
        /// 拦截器名称
        interceptor: String,
        /// 阻止原因
        reason: String,
    },

    /// 拦截器执行时出现异常（与阻止不同）
    #[error("拦截器 '{interceptor}' 执行异常: {source}")]
    InterceptorFailed {
        /// 拦截器名称
        interceptor: String,
        /// 拦截器返回的错误；panic 时为 [`NavixError::Other`]
        #[source]
        source: Arc<NavixError>,
    },

    /// UI 工厂创建实例失败
    #[error("UI 实例创建失败: '{route}' - {reason}")]
    UiCreation {
        /// 路由
        route: String,
        /// 失败原因
        reason: String,
    },

    /// 适配层错误（原样透传）
    #[error("GUI 框架错误: {0}")]
    Framework(String),

    /// 导航失败，包装原始原因
    #[error("导航到 '{route}' 失败: {source}")]
    Navigation {
        /// 目标路由
        route: String,
        /// 原始原因（与 `navigation_failed` 事件中携带的是同一个实例）
        #[source]
        source: Arc<NavixError>,
    },

    // ==================== 事件系统错误 ====================
    /// 订阅未找到
    #[error("订阅未找到: '{0}'")]
    SubscriptionNotFound(String),

    // ==================== 配置错误 ====================
    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        /// 配置键
        key: String,
        /// 原因
        reason: String,
    },

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    // ==================== IO 和序列化错误 ====================
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Navix 操作结果类型别名
pub type Result<T> = std::result::Result<T, NavixError>;

/// 错误码常量
pub mod error_code {
    // 路由错误 (ROUTE-xxx)
    /// 路由未找到
    pub const ROUTE_NOT_FOUND: &str = "ROUTE-001";
    /// 路由冲突
    pub const ROUTE_CONFLICT: &str = "ROUTE-002";
    /// 路由清单冲突
    pub const ROUTE_SOURCE_CONFLICT: &str = "ROUTE-003";

    // 校验错误 (VALIDATION-xxx)
    /// 路由校验失败
    pub const ROUTE_VALIDATION: &str = "VALIDATION-001";
    /// 参数校验失败
    pub const PARAMETER_VALIDATION: &str = "VALIDATION-002";
    /// 通用校验失败
    pub const VALIDATION: &str = "VALIDATION-003";
    /// 模式无效
    pub const INVALID_PATTERN: &str = "VALIDATION-004";

    // 权限错误 (PERMISSION-xxx)
    /// 权限被拒绝
    pub const PERMISSION_DENIED: &str = "PERMISSION-001";

    // 导航错误 (NAVIGATION-xxx)
    /// 导航失败
    pub const NAVIGATION_FAILED: &str = "NAVIGATION-001";
    /// 被拦截器阻止
    pub const INTERCEPTOR_BLOCKED: &str = "NAVIGATION-002";
    /// 拦截器异常
    pub const INTERCEPTOR_FAILED: &str = "NAVIGATION-003";
    /// UI 创建失败
    pub const UI_CREATION_FAILED: &str = "NAVIGATION-004";

    // 适配层错误 (FRAMEWORK-xxx)
    /// 框架错误
    pub const FRAMEWORK: &str = "FRAMEWORK-001";

    // 事件错误 (EVENT-xxx)
    /// 订阅未找到
    pub const SUBSCRIPTION_NOT_FOUND: &str = "EVENT-001";

    // 配置错误 (CONFIG-xxx)
    /// 配置加载失败
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    /// 配置值无效
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    /// 未分类错误
    pub const UNKNOWN: &str = "UNKNOWN";
}

impl NavixError {
    /// 用原始原因构造导航错误
    pub fn navigation(route: impl Into<String>, cause: Arc<NavixError>) -> Self {
        NavixError::Navigation {
            route: route.into(),
            source: cause,
        }
    }

    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            NavixError::RouteNotFound(_) => error_code::ROUTE_NOT_FOUND,
            NavixError::RouteConflict { .. } => error_code::ROUTE_CONFLICT,
            NavixError::RouteSourceConflict { .. } => error_code::ROUTE_SOURCE_CONFLICT,
            NavixError::RouteValidation { .. } => error_code::ROUTE_VALIDATION,
            NavixError::ParameterValidation { .. } => error_code::PARAMETER_VALIDATION,
            NavixError::Validation(_) => error_code::VALIDATION,
            NavixError::PermissionDenied { .. } => error_code::PERMISSION_DENIED,
            NavixError::InvalidPattern { .. } => error_code::INVALID_PATTERN,
            NavixError::InterceptorBlocked { .. } => error_code::INTERCEPTOR_BLOCKED,
            NavixError::InterceptorFailed { .. } => error_code::INTERCEPTOR_FAILED,
            NavixError::UiCreation { .. } => error_code::UI_CREATION_FAILED,
            NavixError::Framework(_) => error_code::FRAMEWORK,
            NavixError::Navigation { .. } => error_code::NAVIGATION_FAILED,
            NavixError::SubscriptionNotFound(_) => error_code::SUBSCRIPTION_NOT_FOUND,
            NavixError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            NavixError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            _ => error_code::UNKNOWN,
        }
    }

    /// 直接原因（仅 `Navigation` 有）
    pub fn cause(&self) -> Option<&NavixError> {
        match self {
            NavixError::Navigation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// 沿 `Navigation` 链找到最底层的原因
    pub fn root_cause(&self) -> &NavixError {
        let mut current = self;
        while let Some(next) = current.cause() {
            current = next;
        }
        current
    }

    /// 是否为校验类失败（路由、参数、安全检查、RBAC）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NavixError::RouteValidation { .. }
                | NavixError::ParameterValidation { .. }
                | NavixError::Validation(_)
                | NavixError::PermissionDenied { .. }
        )
    }
}
