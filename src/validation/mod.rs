//! 路由与参数校验

pub mod engine;
pub mod rules;

pub use engine::ValidationEngine;
pub use rules::ParamRule;
