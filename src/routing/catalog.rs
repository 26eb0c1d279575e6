//! 路由目录
//!
//! 管理路由到导航描述符的映射，并保存拦截器链。
//! 注册成功时在同一把写锁内创建路由的数据容器，保证每个已注册路由恰好有一个容器。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::container::ContainerStore;
use crate::navigation::handle::{UiFactory, UiHandle};
use crate::navigation::interceptor::{Interceptor, InterceptorPipeline};
use crate::routing::descriptor::NavigationDescriptor;
use crate::routing::{Params, RouteId};
use crate::utils::{NavixError, Result};
use crate::validation::ValidationEngine;

// ============================================================================
// 路由表
// ============================================================================

#[derive(Default)]
struct RouteTable {
    /// 注册顺序
    order: Vec<RouteId>,
    /// 路由 → 描述符
    entries: HashMap<RouteId, Arc<NavigationDescriptor>>,
}

/// 路由目录
pub struct RouteCatalog {
    table: RwLock<RouteTable>,
    interceptors: RwLock<InterceptorPipeline>,
    containers: Arc<ContainerStore>,
    validator: RwLock<Option<Arc<ValidationEngine>>>,
}

impl RouteCatalog {
    /// 使用独立的容器存储
    pub fn new() -> Self {
        Self::with_store(Arc::new(ContainerStore::new()))
    }

    /// 与外部共享容器存储
    pub fn with_store(containers: Arc<ContainerStore>) -> Self {
        Self {
            table: RwLock::new(RouteTable::default()),
            interceptors: RwLock::new(InterceptorPipeline::new()),
            containers,
            validator: RwLock::new(None),
        }
    }

    // ==================== 注册 ====================

    /// 注册描述符
    ///
    /// # Errors
    ///
    /// 路由已注册时返回 [`NavixError::RouteConflict`]，目录保持不变。
    pub fn register(&self, descriptor: NavigationDescriptor) -> Result<Arc<NavigationDescriptor>> {
        let mut table = self.table.write();
        if let Some(existing) = table.entries.get(descriptor.route()) {
            warn!(route = %descriptor.route(), existing = existing.title(), "路由重复注册");
            return Err(NavixError::RouteConflict {
                route: descriptor.route().to_string(),
                existing: existing.title().to_string(),
            });
        }
        Ok(self.store(&mut table, descriptor))
    }

    /// 注册描述符，已存在时整体替换（保留原注册位置）
    pub fn register_override(&self, descriptor: NavigationDescriptor) -> Arc<NavigationDescriptor> {
        let mut table = self.table.write();
        if table.entries.contains_key(descriptor.route()) {
            info!(route = %descriptor.route(), "覆盖路由注册");
        }
        self.store(&mut table, descriptor)
    }

    fn store(&self, table: &mut RouteTable, descriptor: NavigationDescriptor) -> Arc<NavigationDescriptor> {
        let route = descriptor.route().clone();
        let replacing = table.entries.contains_key(&route);
        if !replacing {
            table.order.push(route.clone());
            info!(
                route = %route,
                singleton = descriptor.is_singleton(),
                title = descriptor.title(),
                "注册路由"
            );
        }

        let container = self.containers.get_or_create(route.clone());
        if replacing {
            // 覆盖注册时声明集合随描述符整体替换
            container.replace_properties(descriptor.properties().iter().cloned());
        } else if !descriptor.properties().is_empty() {
            container.declare(descriptor.properties().iter().cloned());
        }
        let descriptor = Arc::new(descriptor);
        table.entries.insert(route, descriptor.clone());
        descriptor
    }

    /// 注销路由；容器保留到显式删除
    pub fn unregister(&self, route: &str) -> Option<Arc<NavigationDescriptor>> {
        let mut table = self.table.write();
        let removed = table.entries.remove(route)?;
        table.order.retain(|r| r.as_str() != route);
        info!(route = %route, "注销路由");
        Some(removed)
    }

    // ==================== 查询 ====================

    /// 获取描述符
    ///
    /// # Errors
    ///
    /// 未注册时返回 [`NavixError::RouteNotFound`]。
    pub fn get_descriptor(&self, route: &str) -> Result<Arc<NavigationDescriptor>> {
        self.table
            .read()
            .entries
            .get(route)
            .cloned()
            .ok_or_else(|| NavixError::RouteNotFound(route.to_string()))
    }

    /// 按注册顺序列出路由
    ///
    /// 返回的是调用时刻的快照，迭代器可以克隆后重新遍历。
    pub fn list_routes(&self) -> impl Iterator<Item = RouteId> + Clone {
        self.table.read().order.clone().into_iter()
    }

    /// 是否已注册
    pub fn contains(&self, route: &str) -> bool {
        self.table.read().entries.contains_key(route)
    }

    /// 已注册路由数
    pub fn len(&self) -> usize {
        self.table.read().order.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==================== 拦截器 ====================

    /// 按优先级插入拦截器
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.write().add(interceptor);
    }

    /// 拦截器链快照
    pub fn interceptors(&self) -> InterceptorPipeline {
        self.interceptors.read().clone()
    }

    /// 在锁外执行拦截器链
    pub fn run_interceptors(&self, route: &RouteId, params: &Params) -> Result<()> {
        let pipeline = self.interceptors();
        pipeline.run(route, params)
    }

    // ==================== 校验 ====================

    /// 挂接校验引擎，直接实例化时同样执行校验
    pub fn attach_validator(&self, engine: Arc<ValidationEngine>) {
        *self.validator.write() = Some(engine);
    }

    /// 卸下校验引擎
    pub fn detach_validator(&self) -> Option<Arc<ValidationEngine>> {
        self.validator.write().take()
    }

    // ==================== 实例化 ====================

    /// 路由的 UI 工厂
    pub fn get_ui_factory(&self, route: &str) -> Result<Arc<dyn UiFactory>> {
        Ok(self.get_descriptor(route)?.factory().clone())
    }

    /// 绕过导航管理器直接创建 UI 实例
    ///
    /// 不记录历史、不发布事件；挂接了校验引擎时仍先校验。
    /// 创建参数为描述符元数据叠加 `params`。
    pub fn create_ui_instance(&self, route: &str, params: &Params) -> Result<Arc<dyn UiHandle>> {
        let validator = self.validator.read().clone();
        let descriptor = self.get_descriptor(route)?;
        if let Some(engine) = validator {
            engine.validate(descriptor.route(), params)?;
        }
        Self::instantiate(&descriptor, &descriptor.creation_params(params))
    }

    /// 调用工厂；适配层错误原样透传，其余包装为 [`NavixError::UiCreation`]
    pub(crate) fn instantiate(descriptor: &NavigationDescriptor, params: &Params) -> Result<Arc<dyn UiHandle>> {
        debug!(route = %descriptor.route(), "创建 UI 实例");
        descriptor.create(params).map_err(|e| match e {
            NavixError::Framework(_) => e,
            other => NavixError::UiCreation {
                route: descriptor.route().to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// 关联的容器存储
    pub fn containers(&self) -> &Arc<ContainerStore> {
        &self.containers
    }
}

impl Default for RouteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCatalog")
            .field("routes", &self.table.read().order)
            .field("interceptors", &self.interceptors.read().describe())
            .finish_non_exhaustive()
    }
}
