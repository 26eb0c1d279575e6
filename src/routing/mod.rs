//! 路由目录
//!
//! 路由标识、导航描述符、路由目录以及路由清单加载。

pub mod catalog;
pub mod descriptor;
pub mod source;

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use catalog::RouteCatalog;
pub use descriptor::{NavigationDescriptor, NavigationDescriptorBuilder};
pub use source::RouteManifest;

/// 导航参数
///
/// 使用有序映射，参数校验按键的字典序进行，失败位置确定。
pub type Params = BTreeMap<String, Value>;

/// 以字符串形式读取参数；字符串原样返回，数字与布尔转为文本，其余视为缺失
pub fn param_text(params: &Params, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 路由标识
///
/// 约定为点分字符串 `module.page`，按字符串全序比较。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    /// 构造
    pub fn new(route: impl Into<String>) -> Self {
        Self(route.into())
    }

    /// 字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所属模块（第一个点之前的部分，没有点时为整个路由）
    pub fn module(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// 点号替换为下划线，例如 `admin.panel` → `admin_panel`
    pub fn flattened(&self) -> String {
        self.0.replace('.', "_")
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RouteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&RouteId> for RouteId {
    fn from(r: &RouteId) -> Self {
        r.clone()
    }
}

impl AsRef<str> for RouteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RouteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
