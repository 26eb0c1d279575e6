//! 拦截器管线
//!
//! 拦截器按优先级升序执行（数值小的先执行），相同优先级保持注册顺序。
//! 第一个返回 [`InterceptDecision::Block`] 的拦截器立即终止管线；
//! 拦截器返回错误或 panic 视为异常，与阻止区分开来报告。

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::navigation::event_bus::panic_message;
use crate::routing::{Params, RouteId};
use crate::utils::{NavixError, Result};

/// 未指定时的优先级
pub const DEFAULT_PRIORITY: i32 = 50;

/// 拦截结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// 放行
    Allow,
    /// 阻止
    Block {
        /// 原因
        reason: String,
    },
}

impl InterceptDecision {
    /// 构造阻止结果
    pub fn block(reason: impl Into<String>) -> Self {
        InterceptDecision::Block {
            reason: reason.into(),
        }
    }

    /// 是否放行
    pub fn is_allowed(&self) -> bool {
        matches!(self, InterceptDecision::Allow)
    }
}

/// 导航拦截器
pub trait Interceptor: Send + Sync {
    /// 名称，出现在日志与错误中
    fn name(&self) -> &str;

    /// 优先级，数值小的先执行
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// 检查一次导航
    fn intercept(&self, route: &RouteId, params: &Params) -> Result<InterceptDecision>;
}

/// 由闭包构成的拦截器
pub struct FnInterceptor<F> {
    name: String,
    priority: i32,
    f: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(&RouteId, &Params) -> Result<InterceptDecision> + Send + Sync,
{
    /// 新建
    pub fn new(name: impl Into<String>, priority: i32, f: F) -> Self {
        Self {
            name: name.into(),
            priority,
            f,
        }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&RouteId, &Params) -> Result<InterceptDecision> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(&self, route: &RouteId, params: &Params) -> Result<InterceptDecision> {
        (self.f)(route, params)
    }
}

/// 有序拦截器链
///
/// 插入时即保持有序，执行前无需再排序。
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    chain: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    /// 空管线
    pub fn new() -> Self {
        Self::default()
    }

    /// 按优先级插入，排在所有优先级不大于它的拦截器之后
    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        let priority = interceptor.priority();
        let pos = self.chain.partition_point(|i| i.priority() <= priority);
        info!(
            interceptor = interceptor.name(),
            priority,
            position = pos,
            "注册拦截器"
        );
        self.chain.insert(pos, interceptor);
    }

    /// 拦截器数量
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// 按执行顺序列出 `(名称, 优先级)`
    pub fn describe(&self) -> Vec<(String, i32)> {
        self.chain
            .iter()
            .map(|i| (i.name().to_string(), i.priority()))
            .collect()
    }

    /// 依次执行
    ///
    /// # Errors
    ///
    /// - 被阻止时返回 [`NavixError::InterceptorBlocked`]
    /// - 拦截器返回错误或 panic 时返回 [`NavixError::InterceptorFailed`]
    pub fn run(&self, route: &RouteId, params: &Params) -> Result<()> {
        for interceptor in &self.chain {
            let name = interceptor.name();
            trace!(route = %route, interceptor = name, "执行拦截器");

            let outcome = catch_unwind(AssertUnwindSafe(|| interceptor.intercept(route, params)));
            match outcome {
                Ok(Ok(InterceptDecision::Allow)) => {}
                Ok(Ok(InterceptDecision::Block { reason })) => {
                    info!(route = %route, interceptor = name, reason = %reason, "导航被拦截");
                    return Err(NavixError::InterceptorBlocked {
                        interceptor: name.to_string(),
                        reason,
                    });
                }
                Ok(Err(e)) => {
                    warn!(route = %route, interceptor = name, error = %e, "拦截器执行异常");
                    return Err(NavixError::InterceptorFailed {
                        interceptor: name.to_string(),
                        source: Arc::new(e),
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(route = %route, interceptor = name, panic = %message, "拦截器 panic");
                    return Err(NavixError::InterceptorFailed {
                        interceptor: name.to_string(),
                        source: Arc::new(NavixError::Other(anyhow::anyhow!("拦截器 panic: {message}"))),
                    });
                }
            }
        }
        Ok(())
    }
}
