//! 数据容器
//!
//! 按路由划分的键值存储，用于多个 UI 之间共享数据。

pub mod property;
pub mod reference;
pub mod store;

pub use property::{PropertySpec, PropertyType, TypeMismatch};
pub use reference::DataReference;
pub use store::{ContainerEntry, ContainerReport, ContainerStatus, ContainerStore, RouteContainer};
