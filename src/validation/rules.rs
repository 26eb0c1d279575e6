//! 内置校验规则
//!
//! 常用参数规则可以通过名字在配置文件中启用（`validation.parameter_rules`）。

use std::sync::Arc;

use serde_json::Value;

/// 参数校验谓词
pub type ParamRule = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// 默认路由命名规则：`module.page`，仅小写字母与下划线
pub const NAMING_PATTERN: &str = r"^[a-z_]+\.[a-z_]+$";

/// 默认保留路由
pub const RESERVED_ROUTES: [&str; 3] = ["system.error", "system.loading", "system.unauthorized"];

/// 默认安全阻止模式
pub const BLOCKED_PATTERNS: [&str; 3] = [r".*\.dangerous_.*", r"system\.admin\..*", r".*\.debug_.*"];

/// 可按名字启用的参数规则
pub const NAMED_RULES: [&str; 4] = ["user_id", "admin_level", "asset_id", "theme"];

/// 非空字符串
pub fn non_empty_string() -> ParamRule {
    Arc::new(|v: &Value| v.as_str().is_some_and(|s| !s.is_empty()))
}

/// 闭区间内的整数
pub fn integer_in_range(min: i64, max: i64) -> ParamRule {
    Arc::new(move |v: &Value| v.as_i64().is_some_and(|n| (min..=max).contains(&n)))
}

/// 非负整数或纯数字字符串
pub fn numeric_id() -> ParamRule {
    Arc::new(|v: &Value| match v {
        Value::Number(n) => n.is_u64(),
        Value::String(s) => !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    })
}

/// 取值在给定集合中的字符串
pub fn one_of(allowed: &[&str]) -> ParamRule {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    Arc::new(move |v: &Value| v.as_str().is_some_and(|s| allowed.iter().any(|a| a == s)))
}

/// 按名字查找内置参数规则
pub fn named_rule(name: &str) -> Option<ParamRule> {
    match name {
        "user_id" => Some(non_empty_string()),
        "admin_level" => Some(integer_in_range(0, 10)),
        "asset_id" => Some(numeric_id()),
        "theme" => Some(one_of(&["light", "dark", "auto"])),
        _ => None,
    }
}

/// 全部常用参数规则
pub fn common_rules() -> Vec<(&'static str, ParamRule)> {
    NAMED_RULES
        .iter()
        .filter_map(|name| named_rule(name).map(|rule| (*name, rule)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_level_range() {
        let rule = integer_in_range(0, 10);
        assert!(rule(&json!(0)));
        assert!(rule(&json!(10)));
        assert!(!rule(&json!(11)));
        assert!(!rule(&json!("5")));
    }

    #[test]
    fn test_numeric_id() {
        let rule = numeric_id();
        assert!(rule(&json!(42)));
        assert!(rule(&json!("0042")));
        assert!(!rule(&json!(-1)));
        assert!(!rule(&json!("12a")));
        assert!(!rule(&json!("")));
    }

    #[test]
    fn test_named_rules_are_complete() {
        assert_eq!(common_rules().len(), NAMED_RULES.len());
        assert!(named_rule("unknown").is_none());
        assert!(named_rule("theme").unwrap()(&json!("dark")));
        assert!(!named_rule("user_id").unwrap()(&json!("")));
    }
}
