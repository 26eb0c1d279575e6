//! API 模块
//!
//! - `navix`: [`Navix`] 门面，按配置组装所有组件
//! - `global`: 进程级默认实例

pub mod global;
pub mod navix;

pub use navix::Navix;
