//! 进程级默认实例
//!
//! 需要在多处共享同一个 [`Navix`] 又不方便逐层传递时使用。
//! 访问经由一把互斥锁串行化，[`with`] 的闭包里不能再次调用本模块的函数，否则会死锁。
//!
//! ```
//! use navix_core::api::global;
//! use navix_core::NavixConfig;
//!
//! global::init(NavixConfig::default()).unwrap();
//! let routes = global::with(|navix| navix.catalog().len()).unwrap();
//! assert_eq!(routes, 0);
//! global::teardown().unwrap();
//! ```

use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::info;

use crate::api::navix::Navix;
use crate::core::config::NavixConfig;
use crate::utils::{NavixError, Result};

static GLOBAL: OnceLock<Mutex<Option<Navix>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Navix>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// 初始化默认实例
///
/// # Errors
///
/// 已经初始化过时返回 [`NavixError::InitFailed`]；配置无效时返回构建错误。
pub fn init(config: NavixConfig) -> Result<()> {
    let mut guard = slot().lock();
    if guard.is_some() {
        return Err(NavixError::InitFailed("默认实例已初始化".to_string()));
    }
    *guard = Some(Navix::new(config)?);
    info!("默认 Navix 实例已初始化");
    Ok(())
}

/// 是否已初始化
pub fn is_initialized() -> bool {
    slot().lock().is_some()
}

/// 在持锁状态下访问默认实例
///
/// # Errors
///
/// 尚未初始化时返回 [`NavixError::InitFailed`]。
pub fn with<R>(f: impl FnOnce(&mut Navix) -> R) -> Result<R> {
    let mut guard = slot().lock();
    let navix = guard
        .as_mut()
        .ok_or_else(|| NavixError::InitFailed("默认实例尚未初始化".to_string()))?;
    Ok(f(navix))
}

/// 关闭所有实例并销毁默认实例，返回之前是否存在
///
/// 关闭实例失败时仍会销毁，错误随后返回。
pub fn teardown() -> Result<bool> {
    let Some(mut navix) = slot().lock().take() else {
        return Ok(false);
    };
    navix.shutdown()?;
    info!("默认 Navix 实例已销毁");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 默认实例是进程级状态，所有断言放在同一个测试里
    #[test]
    fn test_global_lifecycle() {
        let _ = teardown();
        assert!(!is_initialized());
        assert!(matches!(with(|_| ()), Err(NavixError::InitFailed(_))));

        init(NavixConfig::default()).unwrap();
        assert!(is_initialized());
        assert!(matches!(
            init(NavixConfig::default()),
            Err(NavixError::InitFailed(_))
        ));
        assert_eq!(with(|navix| navix.voyager().active_count()).unwrap(), 0);

        assert!(teardown().unwrap());
        assert!(!teardown().unwrap());
        assert!(!is_initialized());
    }
}
