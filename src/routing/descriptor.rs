//! 导航描述符
//!
//! 描述符在注册时一次性构建，之后不可变；重新注册时整体替换。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::container::PropertySpec;
use crate::navigation::handle::{UiFactory, UiHandle};
use crate::routing::{Params, RouteId};
use crate::utils::Result;

/// 路由到 UI 工厂的绑定
pub struct NavigationDescriptor {
    route: RouteId,
    factory: Arc<dyn UiFactory>,
    singleton: bool,
    title: String,
    meta: Params,
    properties: Vec<PropertySpec>,
    registered_at: DateTime<Utc>,
}

impl NavigationDescriptor {
    /// 构建器；默认多实例、惰性创建，标题为路由本身
    pub fn builder(route: impl Into<RouteId>, factory: impl UiFactory + 'static) -> NavigationDescriptorBuilder {
        NavigationDescriptorBuilder::new(route.into(), Arc::new(factory))
    }

    /// 路由
    pub fn route(&self) -> &RouteId {
        &self.route
    }

    /// UI 工厂
    pub fn factory(&self) -> &Arc<dyn UiFactory> {
        &self.factory
    }

    /// 是否单例
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// 标题
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 元数据
    pub fn meta(&self) -> &Params {
        &self.meta
    }

    /// 声明的容器属性
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// 构建时间
    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// 元数据叠加参数（参数优先）
    pub fn creation_params(&self, params: &Params) -> Params {
        let mut merged = self.meta.clone();
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// 用给定参数调用工厂
    pub fn create(&self, params: &Params) -> Result<Arc<dyn UiHandle>> {
        self.factory.create(params)
    }
}

impl fmt::Debug for NavigationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationDescriptor")
            .field("route", &self.route)
            .field("singleton", &self.singleton)
            .field("title", &self.title)
            .field("meta", &self.meta)
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

/// [`NavigationDescriptor`] 构建器
pub struct NavigationDescriptorBuilder {
    route: RouteId,
    factory: Arc<dyn UiFactory>,
    singleton: bool,
    title: Option<String>,
    meta: Params,
    properties: Vec<PropertySpec>,
}

impl NavigationDescriptorBuilder {
    fn new(route: RouteId, factory: Arc<dyn UiFactory>) -> Self {
        Self {
            route,
            factory,
            singleton: false,
            title: None,
            meta: Params::new(),
            properties: Vec::new(),
        }
    }

    /// 单例路由
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// 标题
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 追加一项元数据
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// 声明一个容器属性
    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    /// 完成构建
    pub fn build(self) -> NavigationDescriptor {
        NavigationDescriptor {
            title: self.title.unwrap_or_else(|| self.route.to_string()),
            route: self.route,
            factory: self.factory,
            singleton: self.singleton,
            meta: self.meta,
            properties: self.properties,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::PropertyType;
    use crate::navigation::handle::HeadlessHandle;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let d = NavigationDescriptor::builder("core.main", HeadlessHandle::factory("Main")).build();
        assert_eq!(d.title(), "core.main");
        assert!(!d.is_singleton());
        assert!(d.meta().is_empty());
    }

    #[test]
    fn test_creation_params_prefer_caller() {
        let d = NavigationDescriptor::builder("asset.viewer", HeadlessHandle::factory("Viewer"))
            .singleton(true)
            .title("Asset Viewer")
            .meta("theme", json!("dark"))
            .meta("zoom", json!(1.0))
            .property(PropertySpec::new("zoom", PropertyType::Float))
            .build();

        let params = Params::from([("theme".to_string(), json!("light"))]);
        let merged = d.creation_params(&params);
        assert_eq!(merged["theme"], json!("light"));
        assert_eq!(merged["zoom"], json!(1.0));
        assert_eq!(d.properties().len(), 1);
    }
}
