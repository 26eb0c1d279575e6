//! 路由清单
//!
//! 清单是 `名称 → 路由标识` 的映射，可以来自 JSON 或 YAML 文件：
//!
//! ```yaml
//! MAIN_WINDOW: core.main_window
//! SETTINGS: core.settings
//! ```
//!
//! 多个模块各自提供清单，启动时用 [`RouteManifest::merge`] 合并，
//! 同名条目出现在两个清单中视为冲突。

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::routing::RouteId;
use crate::utils::{NavixError, Result};

/// 路由清单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteManifest {
    name: String,
    entries: BTreeMap<String, RouteId>,
}

impl RouteManifest {
    /// 空清单
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// 解析 JSON 文本
    pub fn from_json_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let entries: BTreeMap<String, RouteId> = serde_json::from_str(content)?;
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    /// 解析 YAML 文本；空文本得到空清单
    pub fn from_yaml_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let entries: BTreeMap<String, RouteId> = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str(content)?
        };
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    /// 从 JSON 文件加载，清单名取文件名（不含扩展名）
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = Self::from_json_str(source_name(path), &read(path)?)?;
        debug!(path = %path.display(), routes = manifest.len(), "加载 JSON 路由清单");
        Ok(manifest)
    }

    /// 从 YAML 文件加载
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = Self::from_yaml_str(source_name(path), &read(path)?)?;
        debug!(path = %path.display(), routes = manifest.len(), "加载 YAML 路由清单");
        Ok(manifest)
    }

    /// 按扩展名选择格式
    ///
    /// # Errors
    ///
    /// 扩展名不是 `json`、`yaml`、`yml` 时返回 [`NavixError::ConfigLoadFailed`]。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            Some("yaml" | "yml") => Self::from_yaml_file(path),
            _ => Err(NavixError::ConfigLoadFailed(format!(
                "不支持的路由清单格式: '{}'",
                path.display()
            ))),
        }
    }

    /// 合并多个清单
    ///
    /// # Errors
    ///
    /// 同一名称出现在两个清单中时返回 [`NavixError::RouteSourceConflict`]。
    pub fn merge(name: impl Into<String>, manifests: impl IntoIterator<Item = RouteManifest>) -> Result<Self> {
        let mut merged = Self::new(name);
        let mut sources: BTreeMap<String, String> = BTreeMap::new();
        let mut count = 0;

        for manifest in manifests {
            count += 1;
            for (entry, route) in manifest.entries {
                if let Some(first) = sources.get(&entry) {
                    return Err(NavixError::RouteSourceConflict {
                        name: entry,
                        first: first.clone(),
                        second: manifest.name,
                    });
                }
                sources.insert(entry.clone(), manifest.name.clone());
                merged.entries.insert(entry, route);
            }
        }

        info!(
            manifest = %merged.name,
            routes = merged.len(),
            sources = count,
            "合并路由清单"
        );
        Ok(merged)
    }

    /// 清单名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 加入一个条目，返回被替换的旧值
    pub fn insert(&mut self, name: impl Into<String>, route: impl Into<RouteId>) -> Option<RouteId> {
        self.entries.insert(name.into(), route.into())
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&RouteId> {
        self.entries.get(name)
    }

    /// 按名称顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 全部路由标识
    pub fn routes(&self) -> impl Iterator<Item = &RouteId> {
        self.entries.values()
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        NavixError::ConfigLoadFailed(format!("无法读取 '{}': {e}", path.display()))
    })
}

fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
