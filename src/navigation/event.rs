//! 导航事件
//!
//! 生命周期事件与自定义事件共用同一个 [`Event`] 结构。
//! 失败事件携带的 `error` 与 `navigate_to` 返回的错误链共享同一个原因实例。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::navigation::handle::UiHandle;
use crate::navigation::voyager::FleetKey;
use crate::routing::{Params, RouteId};
use crate::utils::{generate_uuid, NavixError};

/// 保留的生命周期事件名
pub mod lifecycle_events {
    /// 导航开始，校验之前
    pub const BEFORE_NAVIGATE: &str = "before_navigate";
    /// 导航成功
    pub const AFTER_NAVIGATE: &str = "after_navigate";
    /// 导航失败
    pub const NAVIGATION_FAILED: &str = "navigation_failed";
    /// 关闭之前
    pub const BEFORE_CLOSE: &str = "before_close";
    /// 关闭之后
    pub const AFTER_CLOSE: &str = "after_close";

    /// 全部生命周期事件
    pub const ALL: [&str; 5] = [
        BEFORE_NAVIGATE,
        AFTER_NAVIGATE,
        NAVIGATION_FAILED,
        BEFORE_CLOSE,
        AFTER_CLOSE,
    ];

    /// 是否为保留事件名
    pub fn is_lifecycle(event_type: &str) -> bool {
        ALL.contains(&event_type)
    }
}

/// 事件
#[derive(Clone)]
pub struct Event {
    /// 事件唯一标识
    pub event_id: String,

    /// 事件类型（生命周期事件名或自定义名，如 `rbac.role_assigned`）
    pub event_type: String,

    /// 相关路由
    pub route: Option<RouteId>,

    /// 导航参数
    pub params: Params,

    /// 相关实例
    pub key: Option<FleetKey>,

    /// 失败原因
    pub error: Option<Arc<NavixError>>,

    /// 相关 UI 句柄
    pub handle: Option<Arc<dyn UiHandle>>,

    /// 附加数据
    pub data: Value,

    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// 只带类型与数据的事件
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self::builder(event_type).data(data).build()
    }

    /// 构建器
    pub fn builder(event_type: impl Into<String>) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// 是否为生命周期事件
    pub fn is_lifecycle(&self) -> bool {
        lifecycle_events::is_lifecycle(&self.event_type)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_id", &self.event_id)
            .field("event_type", &self.event_type)
            .field("route", &self.route)
            .field("params", &self.params)
            .field("key", &self.key)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .field("has_handle", &self.handle.is_some())
            .field("data", &self.data)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// 事件构建器
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// 新建
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event: Event {
                event_id: generate_uuid(),
                event_type: event_type.into(),
                route: None,
                params: Params::new(),
                key: None,
                error: None,
                handle: None,
                data: Value::Null,
                timestamp: Utc::now(),
            },
        }
    }

    /// 目标路由
    pub fn route(mut self, route: impl Into<RouteId>) -> Self {
        self.event.route = Some(route.into());
        self
    }

    /// 导航参数
    pub fn params(mut self, params: Params) -> Self {
        self.event.params = params;
        self
    }

    /// 实例地址
    pub fn key(mut self, key: FleetKey) -> Self {
        self.event.key = Some(key);
        self
    }

    /// 失败原因
    pub fn error(mut self, error: Arc<NavixError>) -> Self {
        self.event.error = Some(error);
        self
    }

    /// 相关 UI 句柄
    pub fn handle(mut self, handle: Arc<dyn UiHandle>) -> Self {
        self.event.handle = Some(handle);
        self
    }

    /// 附加数据
    pub fn data(mut self, data: Value) -> Self {
        self.event.data = data;
        self
    }

    /// 构建事件
    pub fn build(self) -> Event {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = Event::builder(lifecycle_events::AFTER_NAVIGATE)
            .route("core.main_window")
            .data(json!({"reused": false}))
            .build();

        assert_eq!(event.event_type, "after_navigate");
        assert_eq!(event.route.as_ref().map(RouteId::as_str), Some("core.main_window"));
        assert!(event.is_lifecycle());
        assert_eq!(event.event_id.len(), 36);
    }

    #[test]
    fn test_custom_event_is_not_lifecycle() {
        let event = Event::new("rbac.role_assigned", json!({"user": "alice"}));
        assert!(!event.is_lifecycle());
        assert!(event.route.is_none());
    }

    #[test]
    fn test_debug_hides_handle() {
        let event = Event::new("custom", Value::Null);
        let text = format!("{event:?}");
        assert!(text.contains("has_handle: false"));
    }
}
