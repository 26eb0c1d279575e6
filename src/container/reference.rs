//! 跨容器数据引用
//!
//! [`DataReference`] 只保存查找路径 `(route, key)` 和指向存储的弱引用，
//! 每次读取都重新经过 `ContainerStore::get` 并反序列化，从不缓存值。

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::container::store::ContainerStore;
use crate::routing::RouteId;
use crate::utils::{NavixError, Result};

/// 指向某个容器键的非拥有引用
pub struct DataReference<T> {
    store: Weak<ContainerStore>,
    route: RouteId,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DataReference<T> {
    pub(crate) fn new(store: &Arc<ContainerStore>, route: RouteId, key: String) -> Self {
        Self {
            store: Arc::downgrade(store),
            route,
            key,
            _marker: PhantomData,
        }
    }

    /// 路由
    pub fn route(&self) -> &RouteId {
        &self.route
    }

    /// 键
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 存储是否仍然存在
    pub fn is_live(&self) -> bool {
        self.store.strong_count() > 0
    }

    fn store(&self) -> Result<Arc<ContainerStore>> {
        self.store.upgrade().ok_or_else(|| {
            NavixError::Other(anyhow::anyhow!(
                "数据引用 {}/{} 指向的容器存储已释放",
                self.route,
                self.key
            ))
        })
    }
}

impl<T: DeserializeOwned> DataReference<T> {
    /// 读取当前值；存储已释放或键不存在时返回 `None`
    ///
    /// # Errors
    ///
    /// 存储的值无法反序列化为 `T` 时返回 [`NavixError::Json`]。
    pub fn get(&self) -> Result<Option<T>> {
        let Some(store) = self.store.upgrade() else {
            return Ok(None);
        };
        match store.get(self.route.as_str(), &self.key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl<T: Serialize> DataReference<T> {
    /// 写入目标容器
    pub fn set(&self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store()?.set(self.route.clone(), self.key.clone(), value);
        Ok(())
    }
}

impl<T> Clone for DataReference<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            route: self.route.clone(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DataReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReference")
            .field("route", &self.route)
            .field("key", &self.key)
            .field("live", &self.is_live())
            .finish()
    }
}
