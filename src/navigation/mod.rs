//! 导航
//!
//! 事件总线、拦截器链、UI 句柄能力以及导航管理器 [`UIVoyager`]。

pub mod builtin;
pub mod event;
pub mod event_bus;
pub mod handle;
pub mod interceptor;
pub mod voyager;

pub use builtin::{
    LoggingInterceptor, PerformanceInterceptor, RateLimitInterceptor, RateLimitScope,
    SecurityInterceptor,
};
pub use event::{lifecycle_events, Event, EventBuilder};
pub use event_bus::{DispatchFailure, DispatchStats, EventBus, PublishReport, SubscriptionInfo};
pub use handle::{same_handle, HeadlessHandle, UiFactory, UiHandle};
pub use interceptor::{FnInterceptor, InterceptDecision, Interceptor, InterceptorPipeline};
pub use voyager::{FleetKey, NavigationEntry, NavigationRequest, UIVoyager};
