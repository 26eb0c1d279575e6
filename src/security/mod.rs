//! 安全检查与 RBAC

pub mod engine;
pub mod rbac;

pub use engine::{PermissionChecker, SecurityEngine};
pub use rbac::{rbac_events, PermissionPolicy, RbacManager};
