//! 路由数据容器
//!
//! 每个路由一个容器，注册路由时自动创建。存储表只在查找时短暂加锁，
//! 每个容器持有自己的互斥锁，后台线程对某个容器的写入不会与其他容器的读取争用，
//! 也不会破坏同一容器上并发的 `items` / `status_report`。

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::container::property::{PropertySpec, PropertyType, TypeMismatch};
use crate::container::reference::DataReference;
use crate::navigation::handle::UiHandle;
use crate::routing::RouteId;

/// 容器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    /// 无数据
    Empty,
    /// 有数据，尚未关联 UI
    Prepared,
    /// 有数据且 UI 存活
    Active,
    /// UI 已解除或销毁，数据仍在
    Orphaned,
}

/// 单个键的值与元数据
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    /// 值
    pub value: Value,
    /// 首次写入
    pub created_at: DateTime<Utc>,
    /// 最近写入
    pub updated_at: DateTime<Utc>,
    /// 读取次数
    pub access_count: u64,
}

#[derive(Default)]
struct ContainerState {
    entries: BTreeMap<String, ContainerEntry>,
    properties: BTreeMap<String, PropertySpec>,
    ui: Option<Weak<dyn UiHandle>>,
    had_ui: bool,
    revision: u64,
    last_modified: Option<DateTime<Utc>>,
}

impl ContainerState {
    fn touch(&mut self) {
        self.revision += 1;
        self.last_modified = Some(Utc::now());
    }

    fn write(&mut self, key: String, value: Value) {
        let now = Utc::now();
        self.entries
            .entry(key)
            .and_modify(|e| {
                e.value = value.clone();
                e.updated_at = now;
            })
            .or_insert_with(|| ContainerEntry {
                value,
                created_at: now,
                updated_at: now,
                access_count: 0,
            });
    }

    fn ui_alive(&self) -> bool {
        self.ui.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    fn status(&self) -> ContainerStatus {
        match (self.entries.is_empty(), self.ui_alive()) {
            (true, _) => ContainerStatus::Empty,
            (false, true) => ContainerStatus::Active,
            (false, false) if self.had_ui => ContainerStatus::Orphaned,
            (false, false) => ContainerStatus::Prepared,
        }
    }
}

/// 单个路由的数据容器
pub struct RouteContainer {
    route: RouteId,
    state: Mutex<ContainerState>,
}

impl RouteContainer {
    fn new(route: RouteId) -> Self {
        Self {
            route,
            state: Mutex::new(ContainerState::default()),
        }
    }

    /// 所属路由
    pub fn route(&self) -> &RouteId {
        &self.route
    }

    /// 读取，命中时累计访问次数
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        state.entries.get_mut(key).map(|e| {
            e.access_count += 1;
            e.value.clone()
        })
    }

    /// 读取，缺失时返回 `default`
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// 写入
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut state = self.state.lock();
        debug!(route = %self.route, key = %key, "容器写入");
        state.write(key, value);
        state.touch();
    }

    /// 批量写入，整体在一次加锁内完成
    pub fn update<I, K>(&self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut state = self.state.lock();
        let mut written = 0usize;
        for (k, v) in values {
            state.write(k.into(), v);
            written += 1;
        }
        if written > 0 {
            state.touch();
        }
        debug!(route = %self.route, written, "容器批量写入");
    }

    /// 清除指定键；`None` 清空整个容器。返回是否删除了内容
    pub fn clear(&self, key: Option<&str>) -> bool {
        let mut state = self.state.lock();
        let removed = match key {
            Some(k) => state.entries.remove(k).is_some(),
            None => {
                let had = !state.entries.is_empty();
                state.entries.clear();
                if !state.ui_alive() {
                    state.had_ui = false;
                }
                had
            }
        };
        if removed {
            state.touch();
            debug!(route = %self.route, key = ?key, "容器清除");
        }
        removed
    }

    /// 是否包含键
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// 全部键，按字典序
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    /// 全部键值，按键的字典序
    pub fn items(&self) -> Vec<(String, Value)> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    /// 键的完整元数据（不计入访问次数）
    pub fn entry(&self, key: &str) -> Option<ContainerEntry> {
        self.state.lock().entries.get(key).cloned()
    }

    /// 已存储键的数量
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// 是否无数据
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// 当前状态
    pub fn status(&self) -> ContainerStatus {
        self.state.lock().status()
    }

    /// 声明属性（同名覆盖）
    pub fn declare(&self, specs: impl IntoIterator<Item = PropertySpec>) {
        let mut state = self.state.lock();
        for spec in specs {
            state.properties.insert(spec.name.clone(), spec);
        }
    }

    /// 以新的声明集合替换全部已声明属性
    pub fn replace_properties(&self, specs: impl IntoIterator<Item = PropertySpec>) {
        let mut state = self.state.lock();
        state.properties = specs.into_iter().map(|spec| (spec.name.clone(), spec)).collect();
    }

    /// 已声明的属性
    pub fn properties(&self) -> Vec<PropertySpec> {
        self.state.lock().properties.values().cloned().collect()
    }

    /// 关联 UI（只保留弱引用）
    pub fn attach_ui(&self, handle: &Arc<dyn UiHandle>) {
        let mut state = self.state.lock();
        state.ui = Some(Arc::downgrade(handle));
        state.had_ui = true;
    }

    /// 解除 UI 关联
    pub fn detach_ui(&self) {
        self.state.lock().ui = None;
    }

    /// 生成状态报告
    pub fn report(&self) -> ContainerReport {
        let state = self.state.lock();
        let warnings = state
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                let spec = state.properties.get(key)?;
                (!spec.kind.matches(&entry.value)).then(|| TypeMismatch {
                    key: key.clone(),
                    expected: spec.kind,
                    found: PropertyType::name_of(&entry.value),
                })
            })
            .collect();

        ContainerReport {
            route: self.route.clone(),
            module: self.route.module().to_string(),
            key_count: state.entries.len(),
            property_count: state.properties.len(),
            status: state.status(),
            last_modified: state.last_modified,
            revision: state.revision,
            warnings,
        }
    }
}

/// 单个容器的状态报告
#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    /// 路由
    pub route: RouteId,
    /// 模块
    pub module: String,
    /// 已存储键数
    pub key_count: usize,
    /// 已声明属性数
    pub property_count: usize,
    /// 状态
    pub status: ContainerStatus,
    /// 最近修改时间
    pub last_modified: Option<DateTime<Utc>>,
    /// 修改计数
    pub revision: u64,
    /// 类型不一致警告（不影响读写）
    pub warnings: Vec<TypeMismatch>,
}

/// 全部路由容器
#[derive(Default)]
pub struct ContainerStore {
    containers: RwLock<BTreeMap<RouteId, Arc<RouteContainer>>>,
}

impl ContainerStore {
    /// 空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取容器，不存在时创建
    pub fn get_or_create(&self, route: impl Into<RouteId>) -> Arc<RouteContainer> {
        let route = route.into();
        if let Some(c) = self.containers.read().get(&route) {
            return c.clone();
        }
        let mut containers = self.containers.write();
        containers
            .entry(route)
            .or_insert_with_key(|r| {
                info!(route = %r, "创建数据容器");
                Arc::new(RouteContainer::new(r.clone()))
            })
            .clone()
    }

    /// 获取已存在的容器
    pub fn container(&self, route: &str) -> Option<Arc<RouteContainer>> {
        self.containers.read().get(route).cloned()
    }

    /// 是否存在容器
    pub fn contains(&self, route: &str) -> bool {
        self.containers.read().contains_key(route)
    }

    /// 读取
    pub fn get(&self, route: &str, key: &str) -> Option<Value> {
        self.container(route)?.get(key)
    }

    /// 读取，缺失时返回 `default`
    pub fn get_or(&self, route: &str, key: &str, default: Value) -> Value {
        self.get(route, key).unwrap_or(default)
    }

    /// 写入，必要时创建容器
    pub fn set(&self, route: impl Into<RouteId>, key: impl Into<String>, value: Value) {
        self.get_or_create(route).set(key, value);
    }

    /// 批量写入，必要时创建容器
    pub fn update<I, K>(&self, route: impl Into<RouteId>, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.get_or_create(route).update(values);
    }

    /// 清除指定键或整个容器，只影响该路由
    pub fn clear(&self, route: &str, key: Option<&str>) -> bool {
        self.container(route).is_some_and(|c| c.clear(key))
    }

    /// 全部键值
    pub fn items(&self, route: &str) -> Vec<(String, Value)> {
        self.container(route).map(|c| c.items()).unwrap_or_default()
    }

    /// 声明属性
    pub fn declare_properties(
        &self,
        route: impl Into<RouteId>,
        specs: impl IntoIterator<Item = PropertySpec>,
    ) {
        self.get_or_create(route).declare(specs);
    }

    /// 关联 UI
    pub fn attach_ui(&self, route: impl Into<RouteId>, handle: &Arc<dyn UiHandle>) {
        self.get_or_create(route).attach_ui(handle);
    }

    /// 解除 UI 关联
    pub fn detach_ui(&self, route: &str) {
        if let Some(c) = self.container(route) {
            c.detach_ui();
        }
    }

    /// 全部容器的状态报告
    pub fn status_report(&self) -> BTreeMap<RouteId, ContainerReport> {
        self.snapshot()
            .into_iter()
            .map(|c| (c.route.clone(), c.report()))
            .collect()
    }

    /// 全部路由
    pub fn list_all_routes(&self) -> Vec<RouteId> {
        self.containers.read().keys().cloned().collect()
    }

    /// 按模块分组的路由
    pub fn list_all_modules(&self) -> BTreeMap<String, Vec<RouteId>> {
        let mut modules: BTreeMap<String, Vec<RouteId>> = BTreeMap::new();
        for route in self.containers.read().keys() {
            modules
                .entry(route.module().to_string())
                .or_default()
                .push(route.clone());
        }
        modules
    }

    /// 模块 → 路由 → 键值
    pub fn list_all_containers(&self) -> BTreeMap<String, BTreeMap<RouteId, Vec<(String, Value)>>> {
        let mut all: BTreeMap<String, BTreeMap<RouteId, Vec<(String, Value)>>> = BTreeMap::new();
        for c in self.snapshot() {
            all.entry(c.route.module().to_string())
                .or_default()
                .insert(c.route.clone(), c.items());
        }
        all
    }

    /// 清空所有孤立容器的数据，返回被清理的路由
    pub fn cleanup_orphaned(&self) -> Vec<RouteId> {
        let cleaned: Vec<RouteId> = self
            .snapshot()
            .into_iter()
            .filter(|c| c.status() == ContainerStatus::Orphaned)
            .map(|c| {
                c.clear(None);
                c.route.clone()
            })
            .collect();
        if !cleaned.is_empty() {
            info!(count = cleaned.len(), "清理孤立容器");
        }
        cleaned
    }

    /// 销毁容器
    pub fn remove(&self, route: &str) -> bool {
        let removed = self.containers.write().remove(route).is_some();
        if removed {
            info!(route = %route, "销毁数据容器");
        }
        removed
    }

    /// 容器数量
    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    /// 是否没有容器
    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }

    /// 创建指向 `(route, key)` 的非拥有引用
    pub fn reference<T>(self: &Arc<Self>, route: impl Into<RouteId>, key: impl Into<String>) -> DataReference<T> {
        DataReference::new(self, route.into(), key.into())
    }

    fn snapshot(&self) -> Vec<Arc<RouteContainer>> {
        self.containers.read().values().cloned().collect()
    }
}
