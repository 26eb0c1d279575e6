//! 导航管理器
//!
//! 每个 `(路由, 实例)` 的状态只有两种：不存在、活动。
//!
//! `navigate` 的执行顺序固定：
//!
//! 1. 发布 `before_navigate`
//! 2. ValidationEngine（先拒绝格式错误的输入，再运行有副作用的拦截器）
//! 3. 拦截器链
//! 4. SecurityEngine / RBAC
//! 5. 解析描述符，复用活动实例或调用工厂创建
//! 6. 记录活动实例与历史，发布 `after_navigate`
//!
//! 1 之后的任何失败都会发布一次 `navigation_failed`，并以 [`NavixError::Navigation`]
//! 返回，原因与事件中携带的是同一个 `Arc`。第 5 步之前失败时活动集合与历史都不会改变。
//!
//! 导航管理器按单一调度上下文设计：所有变更都需要 `&mut self`。

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::navigation::event::{lifecycle_events, Event};
use crate::navigation::event_bus::EventBus;
use crate::navigation::handle::{same_handle, UiHandle};
use crate::routing::catalog::RouteCatalog;
use crate::routing::descriptor::NavigationDescriptor;
use crate::routing::{Params, RouteId};
use crate::security::SecurityEngine;
use crate::utils::{generate_id, NavixError, Result};
use crate::validation::ValidationEngine;

/// 单例路由使用的固定实例标识
pub const DEFAULT_INSTANCE: &str = "default";

/// 默认历史上限
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// 创建 UI 时从参数中剔除的键
const SENSITIVE_PARAMS: [&str; 3] = ["user_id", "token", "session"];

// ============================================================================
// 数据结构
// ============================================================================

/// 活动实例的地址
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FleetKey {
    /// 路由
    pub route: RouteId,
    /// 实例标识
    pub instance: String,
}

impl FleetKey {
    /// 构造
    pub fn new(route: impl Into<RouteId>, instance: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            instance: instance.into(),
        }
    }

    /// 单例路由的地址
    pub fn singleton(route: impl Into<RouteId>) -> Self {
        Self::new(route, DEFAULT_INSTANCE)
    }

    /// 是否为默认实例
    pub fn is_default_instance(&self) -> bool {
        self.instance == DEFAULT_INSTANCE
    }
}

impl fmt::Display for FleetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.route, self.instance)
    }
}

/// 一条导航历史
///
/// 只保存句柄的弱引用，历史不延长 UI 对象的生命周期。
#[derive(Clone)]
pub struct NavigationEntry {
    /// 地址
    pub key: FleetKey,
    /// 端点标签
    pub endpoint: Option<String>,
    /// 导航时间
    pub timestamp: DateTime<Utc>,
    handle: Weak<dyn UiHandle>,
}

impl NavigationEntry {
    /// 句柄仍然存在时返回它
    pub fn handle(&self) -> Option<Arc<dyn UiHandle>> {
        self.handle.upgrade()
    }
}

impl fmt::Debug for NavigationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("timestamp", &self.timestamp)
            .field("live", &(self.handle.strong_count() > 0))
            .finish()
    }
}

struct ActiveNavigation {
    handle: Arc<dyn UiHandle>,
    endpoint: Option<String>,
    opened_at: DateTime<Utc>,
}

/// 导航请求
#[derive(Clone)]
pub struct NavigationRequest {
    route: RouteId,
    params: Params,
    instance_id: Option<String>,
    endpoint: Option<String>,
    parent: Option<Arc<dyn UiHandle>>,
    force_new: bool,
}

impl NavigationRequest {
    /// 导航到 `route`
    pub fn new(route: impl Into<RouteId>) -> Self {
        Self {
            route: route.into(),
            params: Params::new(),
            instance_id: None,
            endpoint: None,
            parent: None,
            force_new: false,
        }
    }

    /// 追加一个参数
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// 替换全部参数
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// 实例标识（单例路由忽略）
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// 端点标签
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// 父窗口
    pub fn parent(mut self, parent: Arc<dyn UiHandle>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 即使已有活动实例也重新创建，旧实例被关闭
    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }

    /// 目标路由
    pub fn route(&self) -> &RouteId {
        &self.route
    }
}

impl fmt::Debug for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationRequest")
            .field("route", &self.route)
            .field("params", &self.params)
            .field("instance_id", &self.instance_id)
            .field("endpoint", &self.endpoint)
            .field("has_parent", &self.parent.is_some())
            .field("force_new", &self.force_new)
            .finish()
    }
}

/// 成功导航的落点
struct Landing {
    key: FleetKey,
    handle: Arc<dyn UiHandle>,
    reused: bool,
}

// ============================================================================
// 导航管理器
// ============================================================================

/// 导航管理器
pub struct UIVoyager {
    catalog: Arc<RouteCatalog>,
    events: EventBus,
    validation: Option<Arc<ValidationEngine>>,
    security: Option<Arc<SecurityEngine>>,
    enable_validation: bool,
    enable_security: bool,
    max_history: usize,
    history: VecDeque<NavigationEntry>,
    active: BTreeMap<FleetKey, ActiveNavigation>,
}

impl UIVoyager {
    /// 创建导航管理器；默认不挂接校验与安全引擎
    pub fn new(catalog: Arc<RouteCatalog>, events: EventBus) -> Self {
        Self {
            catalog,
            events,
            validation: None,
            security: None,
            enable_validation: true,
            enable_security: true,
            max_history: DEFAULT_MAX_HISTORY,
            history: VecDeque::new(),
            active: BTreeMap::new(),
        }
    }

    /// 历史上限，至少为 1
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    /// 挂接校验引擎
    pub fn with_validation(mut self, engine: Arc<ValidationEngine>) -> Self {
        self.validation = Some(engine);
        self
    }

    /// 挂接安全引擎
    pub fn with_security(mut self, engine: Arc<SecurityEngine>) -> Self {
        self.security = Some(engine);
        self
    }

    /// 替换校验引擎
    pub fn set_validation_engine(&mut self, engine: Option<Arc<ValidationEngine>>) {
        self.validation = engine;
    }

    /// 替换安全引擎
    pub fn set_security_engine(&mut self, engine: Option<Arc<SecurityEngine>>) {
        self.security = engine;
    }

    /// 开关校验与安全检查
    pub fn configure_validation(&mut self, enable_validation: bool, enable_security: bool) {
        self.enable_validation = enable_validation;
        self.enable_security = enable_security;
        info!(enable_validation, enable_security, "更新导航检查配置");
    }

    /// 路由目录
    pub fn catalog(&self) -> &Arc<RouteCatalog> {
        &self.catalog
    }

    /// 事件总线
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// 历史上限
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    // ==================== 导航 ====================

    /// 以参数导航到路由
    pub fn navigate_to(&mut self, route: impl Into<RouteId>, params: Params) -> Result<Arc<dyn UiHandle>> {
        self.navigate(NavigationRequest::new(route).params(params))
    }

    /// 执行导航请求
    ///
    /// # Errors
    ///
    /// 任何失败都返回 [`NavixError::Navigation`]，原因可通过
    /// [`NavixError::cause`] 取回。
    pub fn navigate(&mut self, request: NavigationRequest) -> Result<Arc<dyn UiHandle>> {
        let route = request.route.clone();
        let _span = crate::navigation_span!(route).entered();
        self.publish(
            Event::builder(lifecycle_events::BEFORE_NAVIGATE)
                .route(&route)
                .params(request.params.clone())
                .build(),
        );

        match self.try_navigate(&request) {
            Ok(landing) => {
                info!(
                    route = %route,
                    key = %landing.key,
                    reused = landing.reused,
                    "导航成功"
                );
                self.publish(
                    Event::builder(lifecycle_events::AFTER_NAVIGATE)
                        .route(&route)
                        .params(request.params)
                        .key(landing.key)
                        .handle(landing.handle.clone())
                        .data(json!({ "endpoint": request.endpoint, "reused": landing.reused }))
                        .build(),
                );
                Ok(landing.handle)
            }
            Err(cause) => {
                warn!(route = %route, code = cause.error_code(), error = %cause, "导航失败");
                let cause = Arc::new(cause);
                self.publish(
                    Event::builder(lifecycle_events::NAVIGATION_FAILED)
                        .route(&route)
                        .params(request.params)
                        .error(cause.clone())
                        .build(),
                );
                Err(NavixError::navigation(route.as_str(), cause))
            }
        }
    }

    fn try_navigate(&mut self, request: &NavigationRequest) -> Result<Landing> {
        let route = &request.route;
        self.run_checks(route, &request.params)?;

        let descriptor = self.catalog.get_descriptor(route.as_str())?;
        let key = Self::resolve_key(&descriptor, request.instance_id.as_deref());

        if !request.force_new {
            if let Some(existing) = self.reusable(&key) {
                existing.raise()?;
                existing.activate_window()?;
                self.record(&key, request.endpoint.clone(), &existing);
                return Ok(Landing {
                    key,
                    handle: existing,
                    reused: true,
                });
            }
        }

        let handle = RouteCatalog::instantiate(&descriptor, &Self::creation_params(&descriptor, &request.params))?;
        if let Some(parent) = &request.parent {
            handle.set_parent(parent)?;
        }
        handle.show()?;

        let previous = self.active.insert(
            key.clone(),
            ActiveNavigation {
                handle: handle.clone(),
                endpoint: request.endpoint.clone(),
                opened_at: Utc::now(),
            },
        );
        if let Some(previous) = previous.filter(|p| !same_handle(&p.handle, &handle)) {
            debug!(key = %key, "替换旧实例");
            if let Err(e) = previous.handle.close() {
                warn!(key = %key, error = %e, "关闭旧实例失败");
            }
        }

        self.catalog.containers().attach_ui(key.route.clone(), &handle);
        self.record(&key, request.endpoint.clone(), &handle);
        Ok(Landing {
            key,
            handle,
            reused: false,
        })
    }

    /// 校验 → 拦截器 → 安全
    fn run_checks(&self, route: &RouteId, params: &Params) -> Result<()> {
        if self.enable_validation {
            if let Some(engine) = &self.validation {
                engine.validate(route, params)?;
            }
        }
        self.catalog.run_interceptors(route, params)?;
        if self.enable_security {
            if let Some(engine) = &self.security {
                engine.check(route, params)?;
            }
        }
        Ok(())
    }

    fn resolve_key(descriptor: &NavigationDescriptor, instance_id: Option<&str>) -> FleetKey {
        if descriptor.is_singleton() {
            if let Some(id) = instance_id {
                debug!(route = %descriptor.route(), instance = id, "单例路由忽略实例标识");
            }
            return FleetKey::singleton(descriptor.route());
        }
        match instance_id {
            Some(id) => FleetKey::new(descriptor.route(), id),
            None => FleetKey::new(descriptor.route(), generate_id()),
        }
    }

    /// 仍然可见的活动实例
    fn reusable(&self, key: &FleetKey) -> Option<Arc<dyn UiHandle>> {
        let active = self.active.get(key)?;
        if active.handle.is_hidden() {
            debug!(key = %key, "活动实例已隐藏，重新创建");
            return None;
        }
        Some(active.handle.clone())
    }

    /// 元数据叠加去除敏感键后的参数
    fn creation_params(descriptor: &NavigationDescriptor, params: &Params) -> Params {
        let filtered: Params = params
            .iter()
            .filter(|(k, _)| !SENSITIVE_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        descriptor.creation_params(&filtered)
    }

    fn record(&mut self, key: &FleetKey, endpoint: Option<String>, handle: &Arc<dyn UiHandle>) {
        self.history.push_back(NavigationEntry {
            key: key.clone(),
            endpoint,
            timestamp: Utc::now(),
            handle: Arc::downgrade(handle),
        });
        while self.history.len() > self.max_history {
            if let Some(evicted) = self.history.pop_front() {
                trace!(key = %evicted.key, "历史记录溢出");
            }
        }
    }

    /// 后退
    ///
    /// 弹出当前历史条目；若前一条目的实例仍处于活动状态则重新激活并返回它。
    /// 历史为空时返回 `Ok(None)`。
    pub fn navigate_back(&mut self) -> Result<Option<Arc<dyn UiHandle>>> {
        let Some(popped) = self.history.pop_back() else {
            debug!("没有可后退的历史");
            return Ok(None);
        };
        debug!(from = %popped.key, "后退");

        let Some(previous) = self.history.back() else {
            return Ok(None);
        };
        let Some(active) = self.active.get(&previous.key) else {
            debug!(key = %previous.key, "前一实例已不在活动集合中");
            return Ok(None);
        };

        let handle = active.handle.clone();
        handle.show()?;
        handle.raise()?;
        handle.activate_window()?;
        Ok(Some(handle))
    }

    // ==================== 关闭 ====================

    /// 关闭实例；`instance` 为空时关闭默认实例
    ///
    /// 实例不在活动集合中时什么也不做，返回 `Ok(false)`。
    pub fn close_navigation(&mut self, route: &str, instance: Option<&str>) -> Result<bool> {
        let key = FleetKey::new(route, instance.unwrap_or(DEFAULT_INSTANCE));
        if !self.active.contains_key(&key) {
            debug!(key = %key, "关闭未活动的实例");
            return Ok(false);
        }
        self.close_key(&key)?;
        Ok(true)
    }

    fn close_key(&mut self, key: &FleetKey) -> Result<()> {
        self.publish(
            Event::builder(lifecycle_events::BEFORE_CLOSE)
                .route(&key.route)
                .key(key.clone())
                .build(),
        );

        let Some(active) = self.active.remove(key) else {
            return Ok(());
        };
        let closed = active.handle.close();
        self.detach_if_last(&key.route);

        info!(
            key = %key,
            lifetime_ms = (Utc::now() - active.opened_at).num_milliseconds(),
            "关闭导航"
        );
        self.publish(
            Event::builder(lifecycle_events::AFTER_CLOSE)
                .route(&key.route)
                .key(key.clone())
                .handle(active.handle)
                .data(json!({ "endpoint": active.endpoint }))
                .build(),
        );
        closed
    }

    /// 关闭所有活动实例并清空历史，返回关闭的数量
    ///
    /// # Errors
    ///
    /// 所有实例都会被处理；若有句柄关闭失败，返回第一个错误。
    pub fn clear_fleet(&mut self) -> Result<usize> {
        let keys: Vec<FleetKey> = self.active.keys().cloned().collect();
        let mut first_error = None;
        for key in &keys {
            if let Err(e) = self.close_key(key) {
                warn!(key = %key, error = %e, "关闭实例失败");
                first_error.get_or_insert(e);
            }
        }
        self.history.clear();
        info!(closed = keys.len(), "清空导航");

        match first_error {
            Some(e) => Err(e),
            None => Ok(keys.len()),
        }
    }

    /// 停止跟踪实例但不关闭它
    pub fn release_instance(&mut self, route: &str, instance: Option<&str>) -> Option<Arc<dyn UiHandle>> {
        let key = FleetKey::new(route, instance.unwrap_or(DEFAULT_INSTANCE));
        let active = self.active.remove(&key)?;
        self.detach_if_last(&key.route);
        debug!(key = %key, "释放实例");
        Some(active.handle)
    }

    fn detach_if_last(&self, route: &RouteId) {
        if !self.active.keys().any(|k| &k.route == route) {
            self.catalog.containers().detach_ui(route.as_str());
        }
    }

    // ==================== 查询 ====================

    /// 最近一条仍处于活动状态的历史条目的地址
    pub fn current_key(&self) -> Option<FleetKey> {
        self.history
            .iter()
            .rev()
            .find(|entry| self.active.contains_key(&entry.key))
            .map(|entry| entry.key.clone())
    }

    /// 当前 UI
    pub fn get_current_ui(&self) -> Option<Arc<dyn UiHandle>> {
        let key = self.current_key()?;
        self.active.get(&key).map(|a| a.handle.clone())
    }

    /// 指定实例的 UI
    pub fn get_ui(&self, route: &str, instance: Option<&str>) -> Option<Arc<dyn UiHandle>> {
        let key = FleetKey::new(route, instance.unwrap_or(DEFAULT_INSTANCE));
        self.active.get(&key).map(|a| a.handle.clone())
    }

    /// 全部活动实例
    pub fn get_active_navigations(&self) -> BTreeMap<FleetKey, Arc<dyn UiHandle>> {
        self.active
            .iter()
            .map(|(k, a)| (k.clone(), a.handle.clone()))
            .collect()
    }

    /// 实例是否活动
    pub fn is_active(&self, route: &str, instance: Option<&str>) -> bool {
        self.active
            .contains_key(&FleetKey::new(route, instance.unwrap_or(DEFAULT_INSTANCE)))
    }

    /// 活动实例数
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// 历史记录，最旧的在前
    pub fn navigation_history(&self) -> impl Iterator<Item = &NavigationEntry> {
        self.history.iter()
    }

    fn publish(&self, event: Event) {
        let report = self.events.publish(&event);
        if !report.is_clean() {
            warn!(
                event_type = %event.event_type,
                failures = report.failures.len(),
                "事件订阅者执行失败"
            );
        }
    }
}

impl fmt::Debug for UIVoyager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIVoyager")
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .field("history", &self.history.len())
            .field("max_history", &self.max_history)
            .field("enable_validation", &self.enable_validation)
            .field("enable_security", &self.enable_security)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerStatus;
    use crate::navigation::handle::HeadlessHandle;
    use crate::navigation::interceptor::{FnInterceptor, InterceptDecision};
    use parking_lot::Mutex;
    use serde_json::json;

    fn voyager() -> UIVoyager {
        let catalog = Arc::new(RouteCatalog::new());
        catalog
            .register(
                NavigationDescriptor::builder("core.main", HeadlessHandle::factory("Main"))
                    .singleton(true)
                    .meta("theme", json!("dark"))
                    .build(),
            )
            .unwrap();
        catalog
            .register(NavigationDescriptor::builder("asset.viewer", HeadlessHandle::factory("Viewer")).build())
            .unwrap();
        UIVoyager::new(catalog, EventBus::new())
    }

    fn record_events(voyager: &UIVoyager) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        voyager.events().subscribe("*", move |event| {
            sink.lock().push(event.event_type.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_singleton_reuse() {
        let mut voyager = voyager();
        let first = voyager.navigate_to("core.main", Params::new()).unwrap();
        let second = voyager.navigate_to("core.main", Params::new()).unwrap();

        assert!(same_handle(&first, &second));
        assert_eq!(voyager.active_count(), 1);
        assert!(voyager.is_active("core.main", None));
        assert_eq!(voyager.navigation_history().count(), 2);
    }

    #[test]
    fn test_hidden_singleton_is_recreated() {
        let mut voyager = voyager();
        let first = voyager.navigate_to("core.main", Params::new()).unwrap();
        first.close().unwrap();

        let second = voyager.navigate_to("core.main", Params::new()).unwrap();
        assert!(!same_handle(&first, &second));
        assert_eq!(voyager.active_count(), 1);
    }

    #[test]
    fn test_multi_instance() {
        let mut voyager = voyager();
        let a = voyager
            .navigate(NavigationRequest::new("asset.viewer").instance("a"))
            .unwrap();
        let b = voyager
            .navigate(NavigationRequest::new("asset.viewer").instance("b"))
            .unwrap();
        assert!(!same_handle(&a, &b));
        assert_eq!(voyager.active_count(), 2);

        assert!(voyager.close_navigation("asset.viewer", Some("a")).unwrap());
        assert!(a.is_hidden());
        assert!(!b.is_hidden());
        assert!(voyager.is_active("asset.viewer", Some("b")));
    }

    #[test]
    fn test_generated_instance_ids() {
        let mut voyager = voyager();
        voyager.navigate_to("asset.viewer", Params::new()).unwrap();
        voyager.navigate_to("asset.viewer", Params::new()).unwrap();
        assert_eq!(voyager.active_count(), 2);
    }

    #[test]
    fn test_sensitive_params_stripped() {
        let seen = Arc::new(Mutex::new(Params::new()));
        let sink = seen.clone();
        let catalog = Arc::new(RouteCatalog::new());
        catalog
            .register(
                NavigationDescriptor::builder("core.profile", move |p: &Params| -> Result<Arc<dyn UiHandle>> {
                    *sink.lock() = p.clone();
                    Ok(Arc::new(HeadlessHandle::new("Profile", p.clone())))
                })
                .meta("theme", json!("dark"))
                .meta("token", json!("from-meta"))
                .build(),
            )
            .unwrap();
        let mut voyager = UIVoyager::new(catalog, EventBus::new());

        let params = Params::from([
            ("user_id".to_string(), json!("alice")),
            ("session".to_string(), json!("s-1")),
            ("zoom".to_string(), json!(2)),
        ]);
        voyager.navigate_to("core.profile", params).unwrap();

        let created = seen.lock().clone();
        assert!(!created.contains_key("user_id"));
        assert!(!created.contains_key("session"));
        assert_eq!(created["zoom"], json!(2));
        assert_eq!(created["theme"], json!("dark"));
        // 元数据中的同名键不受影响
        assert_eq!(created["token"], json!("from-meta"));
    }

    #[test]
    fn test_history_bound() {
        for max in [1usize, 2, 5] {
            let mut voyager = voyager().with_max_history(max);
            for i in 0..(max + 3) {
                voyager
                    .navigate(NavigationRequest::new("asset.viewer").instance(format!("i{i}")))
                    .unwrap();
            }
            let keys: Vec<String> = voyager
                .navigation_history()
                .map(|e| e.key.instance.clone())
                .collect();
            let expected: Vec<String> = (3..max + 3).map(|i| format!("i{i}")).collect();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn test_back_after_single_navigation() {
        let mut voyager = voyager();
        voyager.navigate_to("core.main", Params::new()).unwrap();
        assert!(voyager.navigate_back().unwrap().is_none());
        assert!(voyager.current_key().is_none());
        assert!(voyager.get_current_ui().is_none());
        assert!(voyager.navigate_back().unwrap().is_none());
    }

    #[test]
    fn test_back_reactivates_previous() {
        let mut voyager = voyager();
        let main = voyager.navigate_to("core.main", Params::new()).unwrap();
        voyager
            .navigate(NavigationRequest::new("asset.viewer").instance("x"))
            .unwrap();

        let back = voyager.navigate_back().unwrap().unwrap();
        assert!(same_handle(&main, &back));
        assert_eq!(voyager.current_key(), Some(FleetKey::singleton("core.main")));
    }

    #[test]
    fn test_failed_navigation_leaves_state_untouched() {
        let mut voyager = voyager();
        let events = record_events(&voyager);
        voyager.catalog().add_interceptor(Arc::new(FnInterceptor::new("deny", 1, |_, _| {
            Ok(InterceptDecision::block("maintenance"))
        })));

        let err = voyager.navigate_to("core.main", Params::new()).unwrap_err();
        assert!(matches!(
            err.cause(),
            Some(NavixError::InterceptorBlocked { reason, .. }) if reason == "maintenance"
        ));
        assert_eq!(voyager.active_count(), 0);
        assert_eq!(voyager.navigation_history().count(), 0);
        assert_eq!(
            *events.lock(),
            vec![
                lifecycle_events::BEFORE_NAVIGATE.to_string(),
                lifecycle_events::NAVIGATION_FAILED.to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_route() {
        let mut voyager = voyager();
        let err = voyager.navigate_to("core.missing", Params::new()).unwrap_err();
        assert!(matches!(err.root_cause(), NavixError::RouteNotFound(_)));
    }

    #[test]
    fn test_close_lifecycle() {
        let mut voyager = voyager();
        voyager.navigate_to("core.main", Params::new()).unwrap();
        voyager.catalog().containers().set("core.main", "draft", json!("text"));
        let events = record_events(&voyager);

        assert!(!voyager.close_navigation("asset.viewer", None).unwrap());
        assert!(events.lock().is_empty());

        assert!(voyager.close_navigation("core.main", None).unwrap());
        assert_eq!(
            *events.lock(),
            vec![
                lifecycle_events::BEFORE_CLOSE.to_string(),
                lifecycle_events::AFTER_CLOSE.to_string(),
            ]
        );
        assert_eq!(
            voyager.catalog().containers().container("core.main").unwrap().status(),
            ContainerStatus::Orphaned
        );
    }

    #[test]
    fn test_force_new_replaces() {
        let mut voyager = voyager();
        let first = voyager.navigate_to("core.main", Params::new()).unwrap();
        let second = voyager
            .navigate(NavigationRequest::new("core.main").force_new(true))
            .unwrap();
        assert!(!same_handle(&first, &second));
        assert!(first.is_hidden());
        assert_eq!(voyager.active_count(), 1);
    }

    #[test]
    fn test_clear_fleet_and_release() {
        let mut voyager = voyager();
        let main = voyager.navigate_to("core.main", Params::new()).unwrap();
        let viewer = voyager
            .navigate(NavigationRequest::new("asset.viewer").instance("keep"))
            .unwrap();

        let released = voyager.release_instance("asset.viewer", Some("keep")).unwrap();
        assert!(same_handle(&released, &viewer));
        assert!(!viewer.is_hidden());

        assert_eq!(voyager.clear_fleet().unwrap(), 1);
        assert!(main.is_hidden());
        assert_eq!(voyager.navigation_history().count(), 0);
    }

    #[test]
    fn test_configure_validation_skips_engine() {
        let mut engine = ValidationEngine::new();
        engine.add_reserved_route("core.main");
        let mut voyager = voyager().with_validation(Arc::new(engine));

        assert!(voyager.navigate_to("core.main", Params::new()).is_err());
        voyager.configure_validation(false, true);
        assert!(voyager.navigate_to("core.main", Params::new()).is_ok());
    }
}
