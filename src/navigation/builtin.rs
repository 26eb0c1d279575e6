//! 内置拦截器
//!
//! | 拦截器 | 默认优先级 | 行为 |
//! |--------|-----------|------|
//! | [`PerformanceInterceptor`] | 90 | 统计每个路由的导航尝试 |
//! | [`LoggingInterceptor`] | 100 | 记录每次导航尝试 |
//! | [`RateLimitInterceptor`] | 150 | 滑动窗口限流 |
//! | [`SecurityInterceptor`] | 200 | 阻止列表中的路由；按用户权限集检查 `access_<module>_<page>` |
//!
//! 默认顺序下日志与性能统计先于限流和安全检查执行，被阻止的尝试同样留有记录。

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::navigation::interceptor::{InterceptDecision, Interceptor};
use crate::routing::{param_text, Params, RouteId};
use crate::utils::Result;

const DEFAULT_IDENTITY_PARAM: &str = "user_id";

// ============================================================================
// 日志拦截器
// ============================================================================

/// 一条导航尝试记录
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 路由
    pub route: RouteId,
    /// 参数
    pub params: Params,
    /// 时间
    pub at: DateTime<Utc>,
}

/// 记录每次导航尝试，总是放行
pub struct LoggingInterceptor {
    priority: i32,
    capacity: usize,
    records: Mutex<VecDeque<AttemptRecord>>,
}

impl LoggingInterceptor {
    /// 默认优先级 100，保留最近 256 条
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// 指定保留条数
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            priority: 100,
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// 覆盖优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 已记录的尝试，旧的在前
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records.lock().iter().cloned().collect()
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(&self, route: &RouteId, params: &Params) -> Result<InterceptDecision> {
        info!(route = %route, params = ?params, "导航尝试");

        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(AttemptRecord {
            route: route.clone(),
            params: params.clone(),
            at: Utc::now(),
        });
        Ok(InterceptDecision::Allow)
    }
}

// ============================================================================
// 性能拦截器
// ============================================================================

/// 单个路由的尝试统计
#[derive(Debug, Clone, Copy)]
pub struct RouteTiming {
    /// 尝试次数
    pub attempts: u64,
    /// 首次尝试
    pub first_attempt: Instant,
    /// 最近一次尝试
    pub last_attempt: Instant,
}

impl RouteTiming {
    /// 相邻两次尝试的平均间隔
    pub fn mean_interval(&self) -> Option<Duration> {
        if self.attempts < 2 {
            return None;
        }
        let span = self.last_attempt.duration_since(self.first_attempt);
        let gaps = u32::try_from(self.attempts - 1).unwrap_or(u32::MAX);
        Some(span / gaps)
    }
}

/// 统计每个路由的导航尝试，总是放行
pub struct PerformanceInterceptor {
    priority: i32,
    timings: Mutex<HashMap<RouteId, RouteTiming>>,
}

impl PerformanceInterceptor {
    /// 默认优先级 90
    pub fn new() -> Self {
        Self {
            priority: 90,
            timings: Mutex::new(HashMap::new()),
        }
    }

    /// 覆盖优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 某路由的统计
    pub fn timing(&self, route: &str) -> Option<RouteTiming> {
        self.timings.lock().get(route).copied()
    }

    /// 全部统计
    pub fn snapshot(&self) -> HashMap<RouteId, RouteTiming> {
        self.timings.lock().clone()
    }
}

impl Default for PerformanceInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for PerformanceInterceptor {
    fn name(&self) -> &str {
        "performance"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(&self, route: &RouteId, _params: &Params) -> Result<InterceptDecision> {
        let now = Instant::now();
        let mut timings = self.timings.lock();
        let timing = timings.entry(route.clone()).or_insert(RouteTiming {
            attempts: 0,
            first_attempt: now,
            last_attempt: now,
        });
        timing.attempts += 1;
        timing.last_attempt = now;
        debug!(route = %route, attempts = timing.attempts, "性能统计");
        Ok(InterceptDecision::Allow)
    }
}

// ============================================================================
// 安全拦截器
// ============================================================================

/// 按阻止列表与用户权限集放行
///
/// 只有登记过权限集的用户才做权限检查；访问 `a.b` 需要 `access_a_b`。
pub struct SecurityInterceptor {
    priority: i32,
    identity_param: String,
    blocked: RwLock<HashSet<RouteId>>,
    user_permissions: RwLock<HashMap<String, HashSet<String>>>,
}

impl SecurityInterceptor {
    /// 默认优先级 200
    pub fn new() -> Self {
        Self {
            priority: 200,
            identity_param: DEFAULT_IDENTITY_PARAM.to_string(),
            blocked: RwLock::new(HashSet::new()),
            user_permissions: RwLock::new(HashMap::new()),
        }
    }

    /// 覆盖优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 用户标识参数名
    pub fn with_identity_param(mut self, param: impl Into<String>) -> Self {
        self.identity_param = param.into();
        self
    }

    /// 阻止路由
    pub fn block_route(&self, route: impl Into<RouteId>) {
        self.blocked.write().insert(route.into());
    }

    /// 解除阻止
    pub fn unblock_route(&self, route: &str) -> bool {
        self.blocked.write().remove(route)
    }

    /// 设置用户权限集（替换）
    pub fn set_user_permissions<I, S>(&self, user: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_permissions
            .write()
            .insert(user.into(), permissions.into_iter().map(Into::into).collect());
    }

    /// 访问路由需要的权限名
    pub fn required_permission(route: &RouteId) -> String {
        format!("access_{}", route.flattened())
    }
}

impl Default for SecurityInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for SecurityInterceptor {
    fn name(&self) -> &str {
        "security"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(&self, route: &RouteId, params: &Params) -> Result<InterceptDecision> {
        if self.blocked.read().contains(route) {
            warn!(route = %route, "路由在阻止列表中");
            return Ok(InterceptDecision::block(format!("路由 '{route}' 已被阻止")));
        }

        let Some(user) = param_text(params, &self.identity_param) else {
            return Ok(InterceptDecision::Allow);
        };
        let users = self.user_permissions.read();
        if let Some(perms) = users.get(&user) {
            let required = Self::required_permission(route);
            if !perms.contains(&required) {
                warn!(route = %route, user = %user, required = %required, "用户缺少访问权限");
                return Ok(InterceptDecision::block(format!(
                    "用户 '{user}' 缺少权限 '{required}'"
                )));
            }
        }
        Ok(InterceptDecision::Allow)
    }
}

// ============================================================================
// 限流拦截器
// ============================================================================

/// 限流计数维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// 每个路由
    #[default]
    Route,
    /// 每个用户（未提供用户时归入匿名）
    User,
    /// 每个 (路由, 用户)
    RouteAndUser,
}

/// 滑动窗口限流
///
/// 每次调用都会先清除所有键上过期的时间点，空键随之删除；
/// 跟踪的键数量由 LRU 限制，超出时淘汰最久未访问的键。
pub struct RateLimitInterceptor {
    priority: i32,
    max_requests: usize,
    window: Duration,
    scope: RateLimitScope,
    identity_param: String,
    windows: Mutex<LruCache<String, VecDeque<Instant>>>,
}

impl RateLimitInterceptor {
    /// 窗口内最多 `max_requests` 次，默认优先级 150，按路由计数
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            priority: 150,
            max_requests: max_requests.max(1),
            window,
            scope: RateLimitScope::Route,
            identity_param: DEFAULT_IDENTITY_PARAM.to_string(),
            windows: Mutex::new(LruCache::new(NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN))),
        }
    }

    /// 计数维度
    pub fn with_scope(mut self, scope: RateLimitScope) -> Self {
        self.scope = scope;
        self
    }

    /// 跟踪的键上限
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        let cap = NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN);
        self.windows.get_mut().resize(cap);
        self
    }

    /// 覆盖优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 用户标识参数名
    pub fn with_identity_param(mut self, param: impl Into<String>) -> Self {
        self.identity_param = param.into();
        self
    }

    /// 当前跟踪的键数量
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    fn key_for(&self, route: &RouteId, params: &Params) -> String {
        let user = || param_text(params, &self.identity_param).unwrap_or_else(|| "<anonymous>".to_string());
        match self.scope {
            RateLimitScope::Route => route.to_string(),
            RateLimitScope::User => user(),
            RateLimitScope::RouteAndUser => format!("{route}|{}", user()),
        }
    }

    /// 在指定时刻检查一次导航
    pub fn check_at(&self, route: &RouteId, params: &Params, now: Instant) -> InterceptDecision {
        let key = self.key_for(route, params);
        let mut windows = self.windows.lock();

        let mut emptied = Vec::new();
        for (k, stamps) in windows.iter_mut() {
            while stamps
                .front()
                .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
            {
                stamps.pop_front();
            }
            if stamps.is_empty() {
                emptied.push(k.clone());
            }
        }
        for k in emptied {
            windows.pop(&k);
        }

        if let Some(stamps) = windows.get_mut(&key) {
            if stamps.len() >= self.max_requests {
                warn!(key = %key, limit = self.max_requests, "超出限流预算");
                return InterceptDecision::block(format!(
                    "'{key}' 在 {:?} 内超过 {} 次导航",
                    self.window, self.max_requests
                ));
            }
            stamps.push_back(now);
        } else {
            windows.put(key, VecDeque::from([now]));
        }
        InterceptDecision::Allow
    }
}

impl Interceptor for RateLimitInterceptor {
    fn name(&self) -> &str {
        "rate_limit"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(&self, route: &RouteId, params: &Params) -> Result<InterceptDecision> {
        Ok(self.check_at(route, params, Instant::now()))
    }
}
