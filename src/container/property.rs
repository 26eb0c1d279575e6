//! 容器属性声明
//!
//! 属性声明只用于文档与自省：读写不做类型转换，
//! 类型不一致只在状态报告中以警告形式出现。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 属性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// 字符串
    String,
    /// 整数
    Integer,
    /// 浮点数（整数也接受）
    Float,
    /// 布尔
    Boolean,
    /// 数组
    List,
    /// 对象
    Map,
    /// 任意
    Any,
}

impl PropertyType {
    /// 值是否符合该类型
    pub fn matches(self, value: &Value) -> bool {
        match self {
            PropertyType::Any => true,
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.is_i64() || value.is_u64(),
            PropertyType::Float => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::List => value.is_array(),
            PropertyType::Map => value.is_object(),
        }
    }

    /// 值的 JSON 类型名
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "map",
        }
    }
}

/// 单个属性声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// 键名
    pub name: String,
    /// 类型
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// 默认值
    #[serde(default)]
    pub default: Value,
    /// 说明
    #[serde(default)]
    pub description: String,
}

impl PropertySpec {
    /// 新建，默认值为 null
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Value::Null,
            description: String::new(),
        }
    }

    /// 默认值
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    /// 说明
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }
}

/// 状态报告中的类型不一致警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
    /// 键名
    pub key: String,
    /// 声明类型
    pub expected: PropertyType,
    /// 实际类型
    pub found: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_matching() {
        assert!(PropertyType::Integer.matches(&json!(3)));
        assert!(!PropertyType::Integer.matches(&json!(3.5)));
        assert!(PropertyType::Float.matches(&json!(3)));
        assert!(PropertyType::Map.matches(&json!({"a": 1})));
        assert!(!PropertyType::String.matches(&Value::Null));
        assert!(PropertyType::Any.matches(&Value::Null));
    }

    #[test]
    fn test_spec_deserialize() {
        let spec: PropertySpec =
            serde_json::from_value(json!({"name": "zoom", "type": "float", "default": 1.0}))
                .unwrap();
        assert_eq!(spec.kind, PropertyType::Float);
        assert_eq!(PropertyType::name_of(&spec.default), "float");
    }
}
