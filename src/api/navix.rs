//! Navix 门面
//!
//! 按 [`NavixConfig`] 组装路由目录、校验、安全、RBAC、事件总线、容器存储与导航管理器。
//! 各组件都可以单独构造使用；门面只负责把它们按配置连接起来。
//!
//! # 示例
//!
//! ```
//! use navix_core::api::Navix;
//! use navix_core::navigation::HeadlessHandle;
//! use navix_core::routing::{NavigationDescriptor, Params};
//! use navix_core::NavixConfig;
//!
//! let mut navix = Navix::new(NavixConfig::builder().default_rules().build()).unwrap();
//! navix
//!     .register(
//!         NavigationDescriptor::builder("core.main_window", HeadlessHandle::factory("Main"))
//!             .singleton(true)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let handle = navix.navigate_to("core.main_window", Params::new()).unwrap();
//! assert!(!handle.is_hidden());
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::container::ContainerStore;
use crate::core::config::NavixConfig;
use crate::navigation::builtin::RateLimitInterceptor;
use crate::navigation::event::Event;
use crate::navigation::event_bus::EventBus;
use crate::navigation::handle::UiHandle;
use crate::navigation::interceptor::Interceptor;
use crate::navigation::voyager::{NavigationRequest, UIVoyager};
use crate::routing::{NavigationDescriptor, Params, RouteCatalog, RouteId};
use crate::security::{RbacManager, SecurityEngine};
use crate::utils::Result;
use crate::validation::ValidationEngine;

/// 导航核心实例
pub struct Navix {
    config: NavixConfig,
    catalog: Arc<RouteCatalog>,
    containers: Arc<ContainerStore>,
    events: EventBus,
    validation: Arc<ValidationEngine>,
    security: Arc<SecurityEngine>,
    rbac: Arc<RbacManager>,
    rate_limiter: Option<Arc<RateLimitInterceptor>>,
    voyager: UIVoyager,
}

impl Navix {
    /// 按配置组装
    ///
    /// # Errors
    ///
    /// 配置取值无效或规则模式无法编译时返回错误。
    pub fn new(config: NavixConfig) -> Result<Self> {
        info!("初始化 Navix v{}", crate::VERSION);
        config.validate()?;

        let events = EventBus::new();
        let containers = Arc::new(ContainerStore::new());
        let catalog = Arc::new(RouteCatalog::with_store(containers.clone()));
        debug!("路由目录初始化完成");

        let validation = Arc::new(ValidationEngine::from_config(&config.validation)?);
        if config.navigation.enable_validation {
            catalog.attach_validator(validation.clone());
        }
        debug!(patterns = validation.route_patterns().len(), "校验引擎初始化完成");

        let rbac = Arc::new(RbacManager::from_config(&config.security).with_event_bus(events.clone()));
        let security = Arc::new(SecurityEngine::from_config(
            &config.security,
            &config.navigation.identity_param,
        )?);
        if config.security.enable_rbac {
            security.attach_rbac(rbac.clone());
        }
        debug!(rbac = config.security.enable_rbac, "安全引擎初始化完成");

        let rate_limiter = config.rate_limit.enabled.then(|| {
            let limiter = Arc::new(
                RateLimitInterceptor::new(
                    config.rate_limit.max_requests,
                    Duration::from_secs(config.rate_limit.window_secs),
                )
                .with_scope(config.rate_limit.scope)
                .with_max_tracked_keys(config.rate_limit.max_tracked_keys)
                .with_identity_param(config.navigation.identity_param.clone()),
            );
            catalog.add_interceptor(limiter.clone());
            limiter
        });

        let mut voyager = UIVoyager::new(catalog.clone(), events.clone())
            .with_max_history(config.navigation.max_history)
            .with_validation(validation.clone())
            .with_security(security.clone());
        voyager.configure_validation(
            config.navigation.enable_validation,
            config.navigation.enable_security,
        );

        info!("Navix 初始化完成");
        Ok(Self {
            config,
            catalog,
            containers,
            events,
            validation,
            security,
            rbac,
            rate_limiter,
            voyager,
        })
    }

    /// 默认配置
    pub fn with_defaults() -> Result<Self> {
        Self::new(NavixConfig::default())
    }

    // ==================== 组件 ====================

    /// 配置
    pub fn config(&self) -> &NavixConfig {
        &self.config
    }

    /// 路由目录
    pub fn catalog(&self) -> &Arc<RouteCatalog> {
        &self.catalog
    }

    /// 容器存储
    pub fn containers(&self) -> &Arc<ContainerStore> {
        &self.containers
    }

    /// 事件总线
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// 校验引擎
    pub fn validation(&self) -> &Arc<ValidationEngine> {
        &self.validation
    }

    /// 安全引擎
    pub fn security(&self) -> &Arc<SecurityEngine> {
        &self.security
    }

    /// RBAC 管理器
    pub fn rbac(&self) -> &Arc<RbacManager> {
        &self.rbac
    }

    /// 配置启用时安装的限流拦截器
    pub fn rate_limiter(&self) -> Option<&Arc<RateLimitInterceptor>> {
        self.rate_limiter.as_ref()
    }

    /// 导航管理器
    pub fn voyager(&self) -> &UIVoyager {
        &self.voyager
    }

    /// 导航管理器（可变）
    pub fn voyager_mut(&mut self) -> &mut UIVoyager {
        &mut self.voyager
    }

    /// 在导航安全检查中启用 RBAC
    pub fn enable_rbac(&self) {
        self.security.attach_rbac(self.rbac.clone());
    }

    // ==================== 常用操作 ====================

    /// 注册路由
    pub fn register(&self, descriptor: NavigationDescriptor) -> Result<Arc<NavigationDescriptor>> {
        self.catalog.register(descriptor)
    }

    /// 添加拦截器
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.catalog.add_interceptor(interceptor);
    }

    /// 订阅事件
    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> String
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe(event_type, callback)
    }

    /// 导航
    pub fn navigate_to(&mut self, route: impl Into<RouteId>, params: Params) -> Result<Arc<dyn UiHandle>> {
        self.voyager.navigate_to(route, params)
    }

    /// 执行导航请求
    pub fn navigate(&mut self, request: NavigationRequest) -> Result<Arc<dyn UiHandle>> {
        self.voyager.navigate(request)
    }

    /// 后退
    pub fn navigate_back(&mut self) -> Result<Option<Arc<dyn UiHandle>>> {
        self.voyager.navigate_back()
    }

    /// 关闭实例
    pub fn close_navigation(&mut self, route: &str, instance: Option<&str>) -> Result<bool> {
        self.voyager.close_navigation(route, instance)
    }

    /// 关闭所有实例
    pub fn shutdown(&mut self) -> Result<usize> {
        info!("关闭 Navix");
        self.voyager.clear_fleet()
    }
}

impl std::fmt::Debug for Navix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navix")
            .field("catalog", &self.catalog)
            .field("voyager", &self.voyager)
            .field("rbac", &self.rbac)
            .finish_non_exhaustive()
    }
}
