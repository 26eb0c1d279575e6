//! 导航安全检查
//!
//! 检查顺序固定：阻止模式 → 模块白名单 → 自定义检查器 → RBAC。
//! 自定义检查器与 RBAC 同时存在时两者都必须通过。
//!
//! RBAC 只在参数中带有身份键时按用户判定；不带身份的导航只能进入
//! 没有配置权限要求的路由。

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::core::config::SecurityConfig;
use crate::routing::{param_text, Params, RouteId};
use crate::security::rbac::RbacManager;
use crate::utils::{NavixError, Result};
use crate::validation::engine::CompiledPattern;
use crate::validation::rules;

/// 自定义权限检查器，参数为 `(路由, 全部参数, 选中的参数子集)`
pub type PermissionChecker = Arc<dyn Fn(&RouteId, &Params, &Params) -> bool + Send + Sync>;

/// 匿名导航在拒绝信息中使用的用户名
const ANONYMOUS_USER: &str = "<anonymous>";

#[derive(Clone)]
struct CheckerSlot {
    checker: PermissionChecker,
    param_names: Vec<String>,
}

#[derive(Default)]
struct SecurityRules {
    blocked: Vec<CompiledPattern>,
    allowed_modules: BTreeSet<String>,
    checker: Option<CheckerSlot>,
    rbac: Option<Arc<RbacManager>>,
}

/// 安全引擎
///
/// 规则放在读写锁后面，可以在共享之后继续调整。
pub struct SecurityEngine {
    rules: RwLock<SecurityRules>,
    identity_param: String,
}

impl SecurityEngine {
    /// 不含任何规则，所有检查直接通过
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(SecurityRules::default()),
            identity_param: "user_id".to_string(),
        }
    }

    /// 含默认阻止模式的引擎
    pub fn with_defaults() -> Result<Self> {
        let engine = Self::new();
        for pattern in rules::BLOCKED_PATTERNS {
            engine.add_blocked_pattern(pattern)?;
        }
        Ok(engine)
    }

    /// 从配置构建；RBAC 需另行挂接
    pub fn from_config(config: &SecurityConfig, identity_param: &str) -> Result<Self> {
        let engine = if config.use_default_rules {
            Self::with_defaults()?
        } else {
            Self::new()
        };
        for pattern in &config.blocked_patterns {
            engine.add_blocked_pattern(pattern)?;
        }
        engine.set_allowed_modules(config.allowed_modules.iter().cloned());
        Ok(engine.with_identity_param(identity_param))
    }

    /// 身份参数名
    pub fn with_identity_param(mut self, param: impl Into<String>) -> Self {
        self.identity_param = param.into();
        self
    }

    /// 身份参数名
    pub fn identity_param(&self) -> &str {
        &self.identity_param
    }

    /// 追加阻止模式
    pub fn add_blocked_pattern(&self, pattern: &str) -> Result<()> {
        let compiled = CompiledPattern::new(pattern)?;
        self.rules.write().blocked.push(compiled);
        Ok(())
    }

    /// 扩充模块白名单
    pub fn set_allowed_modules<I, S>(&self, modules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .write()
            .allowed_modules
            .extend(modules.into_iter().map(Into::into));
    }

    /// 安装自定义检查器；`param_names` 决定传给检查器的参数子集
    pub fn set_permission_checker<F, I, S>(&self, checker: F, param_names: I)
    where
        F: Fn(&RouteId, &Params, &Params) -> bool + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.write().checker = Some(CheckerSlot {
            checker: Arc::new(checker),
            param_names: param_names.into_iter().map(Into::into).collect(),
        });
    }

    /// 移除自定义检查器
    pub fn clear_permission_checker(&self) {
        self.rules.write().checker = None;
    }

    /// 挂接 RBAC
    pub fn attach_rbac(&self, rbac: Arc<RbacManager>) {
        self.rules.write().rbac = Some(rbac);
    }

    /// 已挂接的 RBAC
    pub fn rbac(&self) -> Option<Arc<RbacManager>> {
        self.rules.read().rbac.clone()
    }

    /// 阻止模式原文
    pub fn blocked_patterns(&self) -> Vec<String> {
        self.rules.read().blocked.iter().map(|p| p.source.clone()).collect()
    }

    /// 只检查阻止模式与模块白名单
    ///
    /// # Errors
    ///
    /// 命中阻止模式或模块不在白名单时返回 [`NavixError::Validation`]。
    pub fn check_route(&self, route: &RouteId) -> Result<()> {
        let rules = self.rules.read();
        Self::check_static(&rules, route)
    }

    /// 完整安全检查
    ///
    /// # Errors
    ///
    /// - 阻止模式、白名单、自定义检查器失败返回 [`NavixError::Validation`]
    /// - RBAC 拒绝返回 [`NavixError::PermissionDenied`]
    pub fn check(&self, route: &RouteId, params: &Params) -> Result<()> {
        // 在锁外调用检查器与 RBAC
        let (checker, rbac) = {
            let rules = self.rules.read();
            Self::check_static(&rules, route)?;
            (rules.checker.clone(), rules.rbac.clone())
        };

        if let Some(slot) = checker {
            let selected: Params = slot
                .param_names
                .iter()
                .filter_map(|name| params.get(name).map(|v| (name.clone(), v.clone())))
                .collect();
            if !(slot.checker)(route, params, &selected) {
                warn!(route = %route, "自定义权限检查未通过");
                return Err(NavixError::Validation(format!(
                    "路由 '{route}' 未通过权限检查"
                )));
            }
        }

        if let Some(rbac) = rbac {
            match param_text(params, &self.identity_param) {
                Some(user) => {
                    if !rbac.is_allowed(&user, route.as_str()) {
                        warn!(route = %route, user = %user, "RBAC 拒绝访问");
                        return Err(NavixError::PermissionDenied {
                            user,
                            route: route.to_string(),
                        });
                    }
                }
                None if !rbac.allows_anonymous(route.as_str()) => {
                    warn!(route = %route, "RBAC 拒绝匿名访问");
                    return Err(NavixError::PermissionDenied {
                        user: ANONYMOUS_USER.to_string(),
                        route: route.to_string(),
                    });
                }
                None => {}
            }
        }

        debug!(route = %route, "安全检查通过");
        Ok(())
    }

    fn check_static(rules: &SecurityRules, route: &RouteId) -> Result<()> {
        if let Some(pattern) = rules.blocked.iter().find(|p| p.matches(route.as_str())) {
            warn!(route = %route, pattern = %pattern.source, "命中阻止模式");
            return Err(NavixError::Validation(format!(
                "路由 '{route}' 被安全策略阻止"
            )));
        }
        if !rules.allowed_modules.is_empty() && !rules.allowed_modules.contains(route.module()) {
            warn!(route = %route, module = route.module(), "模块不在白名单中");
            return Err(NavixError::Validation(format!(
                "模块 '{}' 不在白名单中",
                route.module()
            )));
        }
        Ok(())
    }
}

impl Default for SecurityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecurityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules = self.rules.read();
        f.debug_struct("SecurityEngine")
            .field("identity_param", &self.identity_param)
            .field("blocked", &rules.blocked.len())
            .field("allowed_modules", &rules.allowed_modules)
            .field("has_checker", &rules.checker.is_some())
            .field("has_rbac", &rules.rbac.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: &str) -> Params {
        Params::from([("user_id".to_string(), json!(id))])
    }

    #[test]
    fn test_open_without_rules() {
        let engine = SecurityEngine::new();
        assert!(engine.check(&"any.thing".into(), &Params::new()).is_ok());
    }

    #[test]
    fn test_default_blocked_patterns() {
        let engine = SecurityEngine::with_defaults().unwrap();
        assert!(engine.check_route(&"core.dangerous_reset".into()).is_err());
        assert!(engine.check_route(&"system.admin.users".into()).is_err());
        assert!(engine.check_route(&"core.main".into()).is_ok());
    }

    #[test]
    fn test_module_whitelist() {
        let engine = SecurityEngine::new();
        engine.set_allowed_modules(["core", "asset"]);
        assert!(engine.check_route(&"asset.viewer".into()).is_ok());
        let err = engine.check_route(&"plugin.viewer".into()).unwrap_err();
        assert!(matches!(err, NavixError::Validation(_)));
    }

    #[test]
    fn test_checker_receives_selected_params() {
        let engine = SecurityEngine::new();
        engine.set_permission_checker(
            |_route, _all, selected| selected.len() == 1 && selected.contains_key("token"),
            ["token"],
        );

        let mut params = user("alice");
        assert!(engine.check(&"core.main".into(), &params).is_err());
        params.insert("token".to_string(), json!("t-1"));
        assert!(engine.check(&"core.main".into(), &params).is_ok());
    }

    #[test]
    fn test_checker_and_rbac_both_required() {
        let rbac = Arc::new(RbacManager::new());
        rbac.add_role("admin", ["manage"]);
        rbac.set_route_permissions("admin.panel", ["manage"]);
        rbac.assign_role("root", "admin").unwrap();

        let engine = SecurityEngine::new();
        engine.attach_rbac(rbac);
        engine.set_permission_checker(|_, _, _| true, Vec::<String>::new());

        assert!(engine.check(&"admin.panel".into(), &user("root")).is_ok());
        let err = engine.check(&"admin.panel".into(), &user("guest")).unwrap_err();
        assert!(matches!(err, NavixError::PermissionDenied { ref user, .. } if user == "guest"));
    }

    #[test]
    fn test_anonymous_navigation() {
        let rbac = Arc::new(RbacManager::new());
        rbac.set_route_permissions("admin.panel", ["manage"]);
        let engine = SecurityEngine::new();
        engine.attach_rbac(rbac);

        // 未配置权限的路由同样拒绝匿名访问
        assert!(matches!(
            engine.check(&"core.about".into(), &Params::new()),
            Err(NavixError::PermissionDenied { .. })
        ));
        assert!(matches!(
            engine.check(&"admin.panel".into(), &Params::new()),
            Err(NavixError::PermissionDenied { .. })
        ));

        let open = SecurityEngine::new();
        open.attach_rbac(Arc::new(RbacManager::new().allow_unrestricted_routes(true)));
        assert!(open.check(&"core.about".into(), &Params::new()).is_ok());
    }
}
