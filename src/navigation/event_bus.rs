//! 同步事件总线
//!
//! - 在发布者的调用上下文中同步分发，`publish` 返回时所有订阅者都已执行
//! - 按订阅注册顺序调用
//! - 单个订阅者返回错误或 panic 不影响其余订阅者，失败在分发结束后通过
//!   [`PublishReport`] 统一报告并记录日志
//! - 事件类型支持 `*` 与 `prefix.*` 通配
//!
//! ```
//! use navix_core::navigation::{Event, EventBus};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe("user.*", |event| {
//!     assert_eq!(event.event_type, "user.login");
//!     Ok(())
//! });
//!
//! let report = bus.publish(&Event::new("user.login", json!({"user_id": "123"})));
//! assert_eq!(report.delivered, 1);
//! bus.unsubscribe(&id).unwrap();
//! ```

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::navigation::event::Event;
use crate::utils::{generate_id, NavixError, Result};

/// 事件回调
pub type EventCallback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// 未指定订阅者时使用的订阅者 ID
const ANONYMOUS_SUBSCRIBER: &str = "anonymous";

#[derive(Clone)]
struct SubscriptionEntry {
    subscription_id: String,
    subscriber_id: String,
    pattern: String,
    callback: EventCallback,
    subscribed_at: DateTime<Utc>,
}

impl SubscriptionEntry {
    fn matches(&self, event_type: &str) -> bool {
        matches_pattern(&self.pattern, event_type)
    }
}

/// 事件类型通配匹配
pub fn matches_pattern(pattern: &str, event_type: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix(".*") {
        Some(prefix) => event_type.len() > prefix.len() + 1
            && event_type.starts_with(prefix)
            && event_type.as_bytes()[prefix.len()] == b'.',
        None => pattern == event_type,
    }
}

/// 订阅信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// 订阅 ID
    pub subscription_id: String,
    /// 订阅的事件类型或通配模式
    pub pattern: String,
    /// 订阅时间
    pub subscribed_at: DateTime<Utc>,
}

/// 单个订阅者的失败
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    /// 订阅 ID
    pub subscription_id: String,
    /// 订阅者 ID
    pub subscriber_id: String,
    /// 错误信息
    pub message: String,
    /// 是否由 panic 引起
    pub panicked: bool,
}

/// 一次发布的结果
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// 匹配并被调用的订阅者数量
    pub delivered: usize,
    /// 失败列表，按调用顺序
    pub failures: Vec<DispatchFailure>,
}

impl PublishReport {
    /// 所有订阅者都成功
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 有失败时转为错误，便于调用方用 `?` 上抛
    pub fn into_result(self) -> Result<usize> {
        match self.failures.first() {
            None => Ok(self.delivered),
            Some(first) => Err(NavixError::Other(anyhow::anyhow!(
                "{} 个订阅者处理失败，首个: [{}] {}",
                self.failures.len(),
                first.subscription_id,
                first.message
            ))),
        }
    }
}

/// 分发统计
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 发布次数
    pub total_published: u64,
    /// 回调调用次数
    pub total_dispatched: u64,
    /// 成功次数
    pub successful: u64,
    /// 失败次数（含 panic）
    pub failed: u64,
    /// 最后一次分发时间
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

/// 事件总线
///
/// 克隆得到的是同一条总线的共享引用。
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<RwLock<Vec<SubscriptionEntry>>>,
    stats: Arc<Mutex<DispatchStats>>,
}

impl EventBus {
    /// 创建空总线
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅，返回订阅 ID
    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> String
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_as(ANONYMOUS_SUBSCRIBER, event_type, callback)
    }

    /// 以指定订阅者身份订阅，之后可用 [`EventBus::unsubscribe_all`] 整体取消
    pub fn subscribe_as<F>(
        &self,
        subscriber_id: impl Into<String>,
        event_type: impl Into<String>,
        callback: F,
    ) -> String
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let entry = SubscriptionEntry {
            subscription_id: generate_id(),
            subscriber_id: subscriber_id.into(),
            pattern: event_type.into(),
            callback: Arc::new(callback),
            subscribed_at: Utc::now(),
        };
        let subscription_id = entry.subscription_id.clone();

        info!(
            subscription_id = %subscription_id,
            subscriber_id = %entry.subscriber_id,
            event_type = %entry.pattern,
            "事件订阅成功"
        );
        self.subscriptions.write().push(entry);
        subscription_id
    }

    /// 取消订阅
    ///
    /// # Errors
    ///
    /// 订阅不存在时返回 [`NavixError::SubscriptionNotFound`]。
    pub fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let mut subs = self.subscriptions.write();
        let pos = subs
            .iter()
            .position(|s| s.subscription_id == subscription_id)
            .ok_or_else(|| NavixError::SubscriptionNotFound(subscription_id.to_string()))?;
        let removed = subs.remove(pos);

        info!(
            subscription_id = %subscription_id,
            event_type = %removed.pattern,
            "取消订阅成功"
        );
        Ok(())
    }

    /// 取消某个订阅者的全部订阅，返回数量
    pub fn unsubscribe_all(&self, subscriber_id: &str) -> usize {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.subscriber_id != subscriber_id);
        let removed = before - subs.len();

        info!(subscriber_id = %subscriber_id, removed, "取消订阅者的全部订阅");
        removed
    }

    /// 会收到该事件类型的订阅数量
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.matches(event_type))
            .count()
    }

    /// 某个订阅者的全部订阅，按订阅顺序
    pub fn subscriptions_of(&self, subscriber_id: &str) -> Vec<SubscriptionInfo> {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .map(|s| SubscriptionInfo {
                subscription_id: s.subscription_id.clone(),
                pattern: s.pattern.clone(),
                subscribed_at: s.subscribed_at,
            })
            .collect()
    }

    /// 订阅总数
    pub fn total_subscriptions(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// 发布事件
    ///
    /// 订阅列表在分发前复制一份，回调中订阅或取消订阅只影响之后的发布。
    pub fn publish(&self, event: &Event) -> PublishReport {
        let matching: Vec<SubscriptionEntry> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.matches(&event.event_type))
            .cloned()
            .collect();

        trace!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            subscribers = matching.len(),
            "发布事件"
        );

        let mut report = PublishReport::default();
        for sub in &matching {
            report.delivered += 1;
            if let Some(failure) = Self::invoke(sub, event) {
                warn!(
                    subscription_id = %failure.subscription_id,
                    subscriber_id = %failure.subscriber_id,
                    event_type = %event.event_type,
                    panicked = failure.panicked,
                    error = %failure.message,
                    "事件处理失败"
                );
                report.failures.push(failure);
            }
        }

        {
            let mut stats = self.stats.lock();
            stats.total_published += 1;
            stats.total_dispatched += report.delivered as u64;
            stats.failed += report.failures.len() as u64;
            stats.successful += (report.delivered - report.failures.len()) as u64;
            if report.delivered > 0 {
                stats.last_dispatch_at = Some(Utc::now());
            }
        }

        if report.delivered == 0 {
            debug!(event_type = %event.event_type, "没有匹配的订阅者");
        }
        report
    }

    /// 发布只带数据的自定义事件
    pub fn emit(&self, event_type: impl Into<String>, data: serde_json::Value) -> PublishReport {
        self.publish(&Event::new(event_type, data))
    }

    /// 统计快照
    pub fn stats(&self) -> DispatchStats {
        self.stats.lock().clone()
    }

    fn invoke(sub: &SubscriptionEntry, event: &Event) -> Option<DispatchFailure> {
        let callback = sub.callback.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));

        let (message, panicked) = match outcome {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => (format!("{e:#}"), false),
            Err(payload) => (panic_message(payload.as_ref()), true),
        };
        Some(DispatchFailure {
            subscription_id: sub.subscription_id.clone(),
            subscriber_id: sub.subscriber_id.clone(),
            message,
            panicked,
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
