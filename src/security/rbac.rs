//! 基于角色的访问控制
//!
//! - 角色 → 权限集合，角色可以继承父角色（允许环，按已访问集合截断）
//! - 用户 → 单个角色，重新分配即替换
//! - 路由 → 所需权限集合
//!
//! 判定失败即拒绝：未知用户、未知角色一律拒绝；未配置权限的路由只有在
//! `allow_unrestricted_routes` 打开时才放行，未提供身份的访问同样适用。
//!
//! 挂接 [`EventBus`] 后，每次变更都会在锁释放后发布 `rbac.*` 自定义事件。

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::config::SecurityConfig;
use crate::navigation::event_bus::EventBus;
use crate::routing::RouteId;
use crate::utils::{NavixError, Result};

/// RBAC 事件名
pub mod rbac_events {
    /// 新增或扩充角色
    pub const ROLE_ADDED: &str = "rbac.role_added";
    /// 删除角色
    pub const ROLE_REMOVED: &str = "rbac.role_removed";
    /// 角色权限被替换
    pub const ROLE_PERMISSIONS_UPDATED: &str = "rbac.role_permissions_updated";
    /// 用户被分配角色
    pub const USER_ROLE_ASSIGNED: &str = "rbac.user_role_assigned";
    /// 用户角色被撤销
    pub const USER_ROLE_REVOKED: &str = "rbac.user_role_revoked";
    /// 路由权限被替换
    pub const ROUTE_PERMISSIONS_UPDATED: &str = "rbac.route_permissions_updated";
    /// 全部清空
    pub const CLEARED: &str = "rbac.cleared";
}

/// 路由所需权限的判定策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// 拥有任意一个所需权限即可
    #[default]
    Any,
    /// 必须拥有全部所需权限
    All,
}

impl PermissionPolicy {
    fn grants(self, granted: &BTreeSet<String>, required: &BTreeSet<String>) -> bool {
        match self {
            PermissionPolicy::Any => required.iter().any(|p| granted.contains(p)),
            PermissionPolicy::All => required.is_subset(granted),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Role {
    permissions: BTreeSet<String>,
    parents: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct RbacState {
    roles: BTreeMap<String, Role>,
    users: BTreeMap<String, String>,
    routes: BTreeMap<RouteId, BTreeSet<String>>,
}

impl RbacState {
    fn collect_permissions(&self, role: &str, recursive: bool) -> Option<BTreeSet<String>> {
        let root = self.roles.get(role)?;
        if !recursive {
            return Some(root.permissions.clone());
        }

        let mut permissions = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![role];
        while let Some(name) = pending.pop() {
            if !visited.insert(name) {
                continue;
            }
            // 父角色缺失时忽略
            if let Some(r) = self.roles.get(name) {
                permissions.extend(r.permissions.iter().cloned());
                pending.extend(r.parents.iter().map(String::as_str));
            }
        }
        Some(permissions)
    }
}

/// RBAC 管理器
pub struct RbacManager {
    state: RwLock<RbacState>,
    policy: PermissionPolicy,
    allow_unrestricted_routes: bool,
    events: Option<EventBus>,
}

impl RbacManager {
    /// 默认策略 `Any`，未配置权限的路由拒绝
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RbacState::default()),
            policy: PermissionPolicy::default(),
            allow_unrestricted_routes: false,
            events: None,
        }
    }

    /// 按安全配置构建
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new()
            .with_policy(config.permission_policy)
            .allow_unrestricted_routes(config.allow_unrestricted_routes)
    }

    /// 设置判定策略
    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 未配置权限的路由是否开放（已知用户与匿名访问）
    pub fn allow_unrestricted_routes(mut self, allow: bool) -> Self {
        self.allow_unrestricted_routes = allow;
        self
    }

    /// 挂接事件总线
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// 判定策略
    pub fn policy(&self) -> PermissionPolicy {
        self.policy
    }

    // ==================== 角色 ====================

    /// 新增角色；已存在时追加权限与父角色
    pub fn add_role<I, S>(&self, role: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_role_with_parents(role, permissions, Vec::<String>::new());
    }

    /// 新增带父角色的角色
    pub fn add_role_with_parents<I, S, P, Q>(&self, role: impl Into<String>, permissions: I, parents: P)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        let role = role.into();
        {
            let mut state = self.state.write();
            let entry = state.roles.entry(role.clone()).or_default();
            entry.permissions.extend(permissions.into_iter().map(Into::into));
            entry.parents.extend(parents.into_iter().map(Into::into));
        }
        info!(role = %role, "添加角色");
        self.notify(rbac_events::ROLE_ADDED, json!({ "role": role }));
    }

    /// 删除角色；持有该角色的用户随之失去角色
    pub fn remove_role(&self, role: &str) -> bool {
        let revoked: Vec<String> = {
            let mut state = self.state.write();
            if state.roles.remove(role).is_none() {
                return false;
            }
            let users: Vec<String> = state
                .users
                .iter()
                .filter(|(_, r)| r.as_str() == role)
                .map(|(u, _)| u.clone())
                .collect();
            for user in &users {
                state.users.remove(user);
            }
            users
        };
        info!(role = %role, revoked_users = revoked.len(), "删除角色");
        self.notify(
            rbac_events::ROLE_REMOVED,
            json!({ "role": role, "revoked_users": revoked }),
        );
        true
    }

    /// 替换角色的权限（不存在时创建）
    pub fn set_role_permissions<I, S>(&self, role: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let role = role.into();
        self.state.write().roles.entry(role.clone()).or_default().permissions =
            permissions.into_iter().map(Into::into).collect();
        debug!(role = %role, "更新角色权限");
        self.notify(rbac_events::ROLE_PERMISSIONS_UPDATED, json!({ "role": role }));
    }

    /// 角色权限；`recursive` 为真时包含全部祖先角色的权限
    pub fn get_role_permissions(&self, role: &str, recursive: bool) -> Option<BTreeSet<String>> {
        self.state.read().collect_permissions(role, recursive)
    }

    /// 角色名列表
    pub fn list_roles(&self) -> Vec<String> {
        self.state.read().roles.keys().cloned().collect()
    }

    /// 批量替换角色权限
    pub fn batch_set_role_permissions<I, R, P, S>(&self, roles: I)
    where
        I: IntoIterator<Item = (R, P)>,
        R: Into<String>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (role, permissions) in roles {
            self.set_role_permissions(role, permissions);
        }
    }

    // ==================== 用户 ====================

    /// 为用户分配角色，替换原有角色
    ///
    /// # Errors
    ///
    /// 角色不存在时返回 [`NavixError::Validation`]。
    pub fn assign_role(&self, user: impl Into<String>, role: &str) -> Result<()> {
        let user = user.into();
        let previous = {
            let mut state = self.state.write();
            if !state.roles.contains_key(role) {
                return Err(NavixError::Validation(format!("角色 '{role}' 不存在")));
            }
            state.users.insert(user.clone(), role.to_string())
        };
        info!(user = %user, role = %role, previous = ?previous, "分配角色");
        self.notify(
            rbac_events::USER_ROLE_ASSIGNED,
            json!({ "user_id": user, "role": role, "previous": previous }),
        );
        Ok(())
    }

    /// 撤销用户的角色，返回被撤销的角色
    pub fn revoke_role(&self, user: &str) -> Option<String> {
        let role = self.state.write().users.remove(user)?;
        info!(user = %user, role = %role, "撤销角色");
        self.notify(
            rbac_events::USER_ROLE_REVOKED,
            json!({ "user_id": user, "role": role }),
        );
        Some(role)
    }

    /// 用户当前角色
    pub fn get_user_role(&self, user: &str) -> Option<String> {
        self.state.read().users.get(user).cloned()
    }

    /// 用户的全部有效权限（含继承）
    pub fn get_user_permissions(&self, user: &str) -> BTreeSet<String> {
        let state = self.state.read();
        state
            .users
            .get(user)
            .and_then(|role| state.collect_permissions(role, true))
            .unwrap_or_default()
    }

    /// 已分配角色的用户
    pub fn list_users(&self) -> Vec<String> {
        self.state.read().users.keys().cloned().collect()
    }

    /// 批量分配角色，遇到不存在的角色时停止
    pub fn batch_assign_roles<I, U, R>(&self, assignments: I) -> Result<()>
    where
        I: IntoIterator<Item = (U, R)>,
        U: Into<String>,
        R: AsRef<str>,
    {
        for (user, role) in assignments {
            self.assign_role(user, role.as_ref())?;
        }
        Ok(())
    }

    // ==================== 路由 ====================

    /// 替换路由所需权限；空集合等同于未配置
    pub fn set_route_permissions<I, S>(&self, route: impl Into<RouteId>, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let route = route.into();
        let permissions: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
        {
            let mut state = self.state.write();
            if permissions.is_empty() {
                state.routes.remove(&route);
            } else {
                state.routes.insert(route.clone(), permissions);
            }
        }
        debug!(route = %route, "更新路由权限");
        self.notify(
            rbac_events::ROUTE_PERMISSIONS_UPDATED,
            json!({ "route": route }),
        );
    }

    /// 路由所需权限
    pub fn get_route_permissions(&self, route: &str) -> BTreeSet<String> {
        self.state.read().routes.get(route).cloned().unwrap_or_default()
    }

    /// 路由是否配置了权限要求
    pub fn is_restricted(&self, route: &str) -> bool {
        self.state.read().routes.contains_key(route)
    }

    /// 未提供身份时能否访问路由
    ///
    /// 只有未配置权限的路由，且 `allow_unrestricted_routes` 打开时才放行，
    /// 与已知用户访问未配置路由的判定一致。
    pub fn allows_anonymous(&self, route: &str) -> bool {
        self.allow_unrestricted_routes && !self.is_restricted(route)
    }

    /// 批量替换路由权限
    pub fn batch_set_route_permissions<I, R, P, S>(&self, routes: I)
    where
        I: IntoIterator<Item = (R, P)>,
        R: Into<RouteId>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (route, permissions) in routes {
            self.set_route_permissions(route, permissions);
        }
    }

    // ==================== 查询 ====================

    /// 用户能否访问路由
    pub fn is_allowed(&self, user: &str, route: &str) -> bool {
        let state = self.state.read();
        self.decide(&state, user, route)
    }

    /// 能访问路由的用户
    pub fn who_can_access(&self, route: &str) -> Vec<String> {
        let state = self.state.read();
        state
            .users
            .keys()
            .filter(|user| self.decide(&state, user, route))
            .cloned()
            .collect()
    }

    /// 用户可访问的已配置路由
    pub fn routes_for_user(&self, user: &str) -> Vec<RouteId> {
        let state = self.state.read();
        state
            .routes
            .keys()
            .filter(|route| self.decide(&state, user, route.as_str()))
            .cloned()
            .collect()
    }

    /// 清空角色、用户与路由权限
    pub fn clear(&self) {
        *self.state.write() = RbacState::default();
        info!("清空 RBAC 数据");
        self.notify(rbac_events::CLEARED, Value::Null);
    }

    fn decide(&self, state: &RbacState, user: &str, route: &str) -> bool {
        let Some(role) = state.users.get(user) else {
            debug!(user = %user, route = %route, "未知用户");
            return false;
        };
        let Some(granted) = state.collect_permissions(role, true) else {
            warn!(user = %user, role = %role, "用户的角色不存在");
            return false;
        };
        match state.routes.get(route) {
            Some(required) => self.policy.grants(&granted, required),
            None => self.allow_unrestricted_routes,
        }
    }

    fn notify(&self, event_type: &str, data: Value) {
        if let Some(bus) = &self.events {
            let report = bus.emit(event_type, data);
            if !report.is_clean() {
                warn!(event_type, failures = report.failures.len(), "RBAC 事件订阅者执行失败");
            }
        }
    }
}

impl Default for RbacManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RbacManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RbacManager")
            .field("policy", &self.policy)
            .field("allow_unrestricted_routes", &self.allow_unrestricted_routes)
            .field("roles", &state.roles.len())
            .field("users", &state.users.len())
            .field("routes", &state.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn manager() -> RbacManager {
        let rbac = RbacManager::new();
        rbac.add_role("viewer", ["view_assets"]);
        rbac.add_role_with_parents("editor", ["edit_assets"], ["viewer"]);
        rbac.set_route_permissions("asset.viewer", ["view_assets"]);
        rbac.set_route_permissions("asset.editor", ["edit_assets"]);
        rbac
    }

    #[test]
    fn test_inherited_permissions() {
        let rbac = manager();
        rbac.assign_role("alice", "editor").unwrap();

        assert!(rbac.is_allowed("alice", "asset.viewer"));
        assert!(rbac.is_allowed("alice", "asset.editor"));
        assert_eq!(
            rbac.get_role_permissions("editor", false).unwrap(),
            BTreeSet::from(["edit_assets".to_string()])
        );
        assert_eq!(rbac.get_user_permissions("alice").len(), 2);
    }

    #[test]
    fn test_reassignment_takes_effect_immediately() {
        let rbac = manager();
        rbac.assign_role("bob", "editor").unwrap();
        assert!(rbac.is_allowed("bob", "asset.editor"));

        rbac.assign_role("bob", "viewer").unwrap();
        assert!(!rbac.is_allowed("bob", "asset.editor"));
        assert_eq!(rbac.get_user_role("bob").as_deref(), Some("viewer"));
    }

    #[test]
    fn test_fails_closed() {
        let rbac = manager();
        assert!(!rbac.is_allowed("nobody", "asset.viewer"));

        rbac.assign_role("carol", "viewer").unwrap();
        assert!(!rbac.is_allowed("carol", "core.settings"));

        rbac.remove_role("viewer");
        assert!(!rbac.is_allowed("carol", "asset.viewer"));
        assert!(rbac.get_user_role("carol").is_none());

        assert!(rbac.assign_role("dave", "ghost").is_err());
    }

    #[test]
    fn test_unrestricted_routes_flag() {
        let rbac = RbacManager::new().allow_unrestricted_routes(true);
        rbac.add_role("guest", Vec::<String>::new());
        rbac.assign_role("eve", "guest").unwrap();
        assert!(rbac.is_allowed("eve", "core.about"));
        assert!(!rbac.is_allowed("stranger", "core.about"));
    }

    #[test]
    fn test_anonymous_follows_unrestricted_flag() {
        let closed = RbacManager::new();
        closed.set_route_permissions("admin.panel", ["manage"]);
        assert!(!closed.allows_anonymous("core.about"));
        assert!(!closed.allows_anonymous("admin.panel"));

        let open = RbacManager::new().allow_unrestricted_routes(true);
        open.set_route_permissions("admin.panel", ["manage"]);
        assert!(open.allows_anonymous("core.about"));
        assert!(!open.allows_anonymous("admin.panel"));
    }

    #[test]
    fn test_all_policy() {
        let rbac = RbacManager::new().with_policy(PermissionPolicy::All);
        rbac.add_role("half", ["a"]);
        rbac.add_role("full", ["a", "b"]);
        rbac.set_route_permissions("x.y", ["a", "b"]);
        rbac.assign_role("u1", "half").unwrap();
        rbac.assign_role("u2", "full").unwrap();

        assert!(!rbac.is_allowed("u1", "x.y"));
        assert_eq!(rbac.who_can_access("x.y"), vec!["u2".to_string()]);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let rbac = RbacManager::new();
        rbac.add_role_with_parents("a", ["pa"], ["b"]);
        rbac.add_role_with_parents("b", ["pb"], ["a"]);
        assert_eq!(rbac.get_role_permissions("a", true).unwrap().len(), 2);
    }

    #[test]
    fn test_routes_for_user_and_batch() {
        let rbac = manager();
        rbac.batch_assign_roles([("u1", "viewer"), ("u2", "editor")]).unwrap();
        assert_eq!(rbac.routes_for_user("u1"), vec![RouteId::from("asset.viewer")]);
        assert_eq!(rbac.routes_for_user("u2").len(), 2);

        rbac.clear();
        assert!(rbac.list_roles().is_empty());
        assert!(rbac.list_users().is_empty());
    }

    #[test]
    fn test_change_events() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe("rbac.*", move |event| {
            sink.lock().push(event.event_type.clone());
            Ok(())
        });

        let rbac = RbacManager::new().with_event_bus(bus);
        rbac.add_role("viewer", ["view"]);
        rbac.assign_role("alice", "viewer").unwrap();
        rbac.revoke_role("alice");

        assert_eq!(
            *seen.lock(),
            vec![
                rbac_events::ROLE_ADDED.to_string(),
                rbac_events::USER_ROLE_ASSIGNED.to_string(),
                rbac_events::USER_ROLE_REVOKED.to_string(),
            ]
        );
    }
}
