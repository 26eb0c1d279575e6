//! # Navix Core - 导航核心
//!
//! 面向多窗口桌面应用的导航核心，与具体 GUI 框架无关：
//!
//! - **路由目录**: 路由标识到描述符（UI 工厂、单例标志、元数据）的注册表
//! - **拦截器管线**: 按优先级执行的导航前置检查，可阻止导航
//! - **校验与安全**: 路由命名规则、保留路由、参数规则、阻止模式、模块白名单与 RBAC
//! - **事件总线**: 同步分发的导航生命周期事件，支持通配符订阅
//! - **数据容器**: 每个路由一份的键值存储，随 UI 实例附着与分离
//! - **导航管理器**: 实例复用、多实例、历史记录、后退与关闭
//!
//! ## 快速开始
//!
//! ```rust
//! use navix_core::navigation::{HeadlessHandle, NavigationRequest};
//! use navix_core::routing::{NavigationDescriptor, Params};
//! use navix_core::{Navix, NavixConfig};
//!
//! let mut navix = Navix::new(NavixConfig::default()).unwrap();
//! navix
//!     .register(NavigationDescriptor::builder("asset.viewer", HeadlessHandle::factory("Viewer")).build())
//!     .unwrap();
//!
//! navix
//!     .navigate(NavigationRequest::new("asset.viewer").instance("a-1"))
//!     .unwrap();
//! assert!(navix.voyager().is_active("asset.viewer", Some("a-1")));
//! ```
//!
//! ## 模块结构
//!
//! - `routing` - 路由标识、描述符、路由目录与路由清单
//! - `navigation` - 事件、拦截器、UI 句柄与 [`UIVoyager`]
//! - `validation` - 路由与参数校验
//! - `security` - 安全检查与 RBAC
//! - `container` - 路由数据容器
//! - `core` - 配置
//! - `api` - [`Navix`] 门面与进程级默认实例
//! - `utils` - 错误类型、ID 生成与日志

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod container;
pub mod core;
pub mod navigation;
pub mod routing;
pub mod security;
pub mod utils;
pub mod validation;

// 重导出常用类型
pub use api::{global, Navix};

pub use routing::{NavigationDescriptor, Params, RouteCatalog, RouteId, RouteManifest};

pub use navigation::{
    lifecycle_events, Event, EventBus, FleetKey, InterceptDecision, Interceptor,
    NavigationRequest, UIVoyager, UiFactory, UiHandle,
};

pub use container::{ContainerStore, DataReference, PropertySpec, PropertyType, RouteContainer};

pub use security::{PermissionPolicy, RbacManager, SecurityEngine};
pub use validation::ValidationEngine;

pub use utils::{error_code, generate_id, generate_uuid, NavixError, Result};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use core::config::{NavixConfig, NavixConfigBuilder};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
