//! 路由与参数校验
//!
//! - 路由先检查保留集合，再检查命名模式；未配置任何模式时所有路由都通过
//! - 模式从路由开头匹配（与 `^` 锚定等价），是否要求完整匹配由模式自己的 `$` 决定
//! - 参数按键的字典序逐个检查，报告第一个失败的参数
//!
//! 规则只能追加；需要删除规则时重新构建一个引擎。

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::ValidationConfig;
use crate::routing::{Params, RouteId};
use crate::utils::{NavixError, Result};
use crate::validation::rules::{self, ParamRule};

/// 编译后的模式，保留原文用于展示
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) source: String,
    pub(crate) regex: Regex,
}

impl CompiledPattern {
    /// 编译为从开头匹配的正则
    pub(crate) fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|e| NavixError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub(crate) fn matches(&self, route: &str) -> bool {
        self.regex.is_match(route)
    }
}

/// 校验引擎
#[derive(Clone, Default)]
pub struct ValidationEngine {
    route_patterns: Vec<CompiledPattern>,
    reserved: BTreeSet<RouteId>,
    param_rules: BTreeMap<String, ParamRule>,
}

impl ValidationEngine {
    /// 不含任何规则的开放引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 含默认命名模式、保留路由与常用参数规则的引擎
    pub fn with_defaults() -> Result<Self> {
        let mut engine = Self::new();
        engine.add_route_pattern(rules::NAMING_PATTERN)?;
        for route in rules::RESERVED_ROUTES {
            engine.add_reserved_route(route);
        }
        for (name, rule) in rules::common_rules() {
            engine.add_parameter_rule_arc(name, rule);
        }
        Ok(engine)
    }

    /// 从配置构建
    ///
    /// # Errors
    ///
    /// 模式无法编译或参数规则名未知时返回错误。
    pub fn from_config(config: &ValidationConfig) -> Result<Self> {
        let mut engine = if config.use_default_rules {
            Self::with_defaults()?
        } else {
            Self::new()
        };
        for pattern in &config.route_patterns {
            engine.add_route_pattern(pattern)?;
        }
        for route in &config.reserved_routes {
            engine.add_reserved_route(route.as_str());
        }
        for name in &config.parameter_rules {
            let rule = rules::named_rule(name).ok_or_else(|| NavixError::InvalidConfigValue {
                key: "validation.parameter_rules".to_string(),
                reason: format!("未知的参数规则 '{name}'"),
            })?;
            engine.add_parameter_rule_arc(name.clone(), rule);
        }
        Ok(engine)
    }

    /// 追加路由模式
    pub fn add_route_pattern(&mut self, pattern: &str) -> Result<()> {
        self.route_patterns.push(CompiledPattern::new(pattern)?);
        Ok(())
    }

    /// 追加保留路由
    pub fn add_reserved_route(&mut self, route: impl Into<RouteId>) {
        self.reserved.insert(route.into());
    }

    /// 设置参数规则（同名替换）
    pub fn add_parameter_rule<F>(&mut self, param: impl Into<String>, rule: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.add_parameter_rule_arc(param, std::sync::Arc::new(rule));
    }

    /// 设置已包装的参数规则
    pub fn add_parameter_rule_arc(&mut self, param: impl Into<String>, rule: ParamRule) {
        self.param_rules.insert(param.into(), rule);
    }

    /// 校验路由
    ///
    /// # Errors
    ///
    /// 保留路由或不匹配任何模式时返回 [`NavixError::RouteValidation`]。
    pub fn validate_route(&self, route: &RouteId) -> Result<()> {
        if self.reserved.contains(route) {
            warn!(route = %route, "保留路由");
            return Err(NavixError::RouteValidation {
                route: route.to_string(),
                reason: "系统保留路由".to_string(),
            });
        }
        if !self.route_patterns.is_empty()
            && !self.route_patterns.iter().any(|p| p.matches(route.as_str()))
        {
            warn!(route = %route, "路由不符合命名规则");
            return Err(NavixError::RouteValidation {
                route: route.to_string(),
                reason: "不符合命名规则".to_string(),
            });
        }
        Ok(())
    }

    /// 校验参数
    ///
    /// # Errors
    ///
    /// 第一个未通过规则的参数返回 [`NavixError::ParameterValidation`]。
    pub fn validate_params(&self, params: &Params) -> Result<()> {
        for (name, value) in params {
            let Some(rule) = self.param_rules.get(name) else {
                continue;
            };
            if !rule(value) {
                warn!(param = %name, value = %value, "参数校验失败");
                return Err(NavixError::ParameterValidation {
                    param: name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 先校验路由再校验参数
    pub fn validate(&self, route: &RouteId, params: &Params) -> Result<()> {
        self.validate_route(route)?;
        self.validate_params(params)?;
        debug!(route = %route, "校验通过");
        Ok(())
    }

    /// 路由模式原文
    pub fn route_patterns(&self) -> Vec<&str> {
        self.route_patterns.iter().map(|p| p.source.as_str()).collect()
    }

    /// 保留路由
    pub fn reserved_routes(&self) -> impl Iterator<Item = &RouteId> {
        self.reserved.iter()
    }

    /// 有规则的参数名
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.param_rules.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("route_patterns", &self.route_patterns())
            .field("reserved", &self.reserved)
            .field("param_rules", &self.param_rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_by_default() {
        let engine = ValidationEngine::new();
        assert!(engine.validate_route(&"Anything-Goes".into()).is_ok());
        assert!(engine.validate_params(&Params::from([("x".to_string(), json!(1))])).is_ok());
    }

    #[test]
    fn test_reserved_checked_before_patterns() {
        let mut engine = ValidationEngine::new();
        engine.add_route_pattern(".*").unwrap();
        engine.add_reserved_route("system.error");

        let err = engine.validate_route(&"system.error".into()).unwrap_err();
        assert!(matches!(err, NavixError::RouteValidation { ref reason, .. } if reason.contains("保留")));
    }

    #[test]
    fn test_default_naming_pattern() {
        let engine = ValidationEngine::with_defaults().unwrap();
        assert!(engine.validate_route(&"core.main_window".into()).is_ok());
        assert!(engine.validate_route(&"Core.Main".into()).is_err());
        assert!(engine.validate_route(&"core.main.extra".into()).is_err());
        assert!(engine.validate_route(&"system.loading".into()).is_err());
    }

    #[test]
    fn test_any_pattern_suffices() {
        let mut engine = ValidationEngine::new();
        engine.add_route_pattern(r"[a-z]+\.[a-z]+$").unwrap();
        engine.add_route_pattern(r"legacy_").unwrap();
        assert!(engine.validate_route(&"legacy_window".into()).is_ok());
        assert!(engine.validate_route(&"x_legacy_window".into()).is_err());
    }

    #[test]
    fn test_first_failing_param_in_key_order() {
        let mut engine = ValidationEngine::new();
        engine.add_parameter_rule("b_level", |v| v.as_i64().is_some_and(|n| n < 5));
        engine.add_parameter_rule("a_name", |v| v.is_string());

        let params = Params::from([
            ("b_level".to_string(), json!(9)),
            ("a_name".to_string(), json!(3)),
        ]);
        let err = engine.validate_params(&params).unwrap_err();
        assert!(matches!(err, NavixError::ParameterValidation { ref param, .. } if param == "a_name"));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut engine = ValidationEngine::new();
        assert!(matches!(
            engine.add_route_pattern("(unclosed"),
            Err(NavixError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_from_config_named_rules() {
        let config = ValidationConfig {
            parameter_rules: vec!["admin_level".to_string()],
            ..Default::default()
        };
        let engine = ValidationEngine::from_config(&config).unwrap();
        let params = Params::from([("admin_level".to_string(), json!(42))]);
        assert!(engine.validate_params(&params).is_err());

        let bad = ValidationConfig {
            parameter_rules: vec!["favourite_colour".to_string()],
            ..Default::default()
        };
        assert!(ValidationEngine::from_config(&bad).is_err());
    }
}
