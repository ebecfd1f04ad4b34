use crate::RucurlError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 一次执行使用的变量集合
///
/// 值可以是字符串、数字、布尔、null、对象或数组，保持插入顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    variables: Map<String, Value>,
}

impl VariableSet {
    /// 创建新的空变量集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入变量
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// 获取变量值
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// 用另一个集合覆盖当前集合中的同名变量
    pub fn extend(&mut self, other: &VariableSet) {
        for (key, value) in &other.variables {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    /// 以 `self` 为底层，叠加 `top` 后返回新的集合
    pub fn layered(&self, top: &VariableSet) -> VariableSet {
        let mut merged = self.clone();
        merged.extend(top);
        merged
    }

    /// 变量数量
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.variables.clone())
    }
}

impl From<Map<String, Value>> for VariableSet {
    fn from(variables: Map<String, Value>) -> Self {
        Self { variables }
    }
}

impl TryFrom<Value> for VariableSet {
    type Error = RucurlError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(RucurlError::TemplateError(format!(
                "变量必须是 JSON 对象，实际为 {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 变量批次
///
/// JSON 对象表示单组变量（单次或重复执行），JSON 数组表示逐行执行。
/// 数组中的每一项在执行时才转换为 [`VariableSet`]，非对象项只影响所在的那一行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableBatch {
    Rows(Vec<Value>),
    Single(VariableSet),
}

impl Default for VariableBatch {
    fn default() -> Self {
        VariableBatch::Single(VariableSet::new())
    }
}

/// 环境配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Environment {
    /// 变量映射
    #[serde(flatten)]
    pub variables: HashMap<String, String>,
}

/// 运行参数
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// 结果文件目录
    pub results_dir: Option<String>,

    /// 单次执行超时（秒）
    pub timeout_secs: Option<u64>,

    /// POSIX 下执行脚本的解释器
    pub shell: Option<String>,
}

/// 完整的配置文件 (rucurl.toml)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VariableConfig {
    #[serde(default)]
    pub settings: Settings,

    /// 所有环境配置
    #[serde(default)]
    pub environments: HashMap<String, Environment>,
}

impl VariableConfig {
    /// 获取指定环境的变量
    pub fn get_environment(&self, env_name: &str) -> Option<&Environment> {
        self.environments.get(env_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variable_set_basic() {
        let mut vars = VariableSet::new();
        assert!(vars.is_empty());

        vars.insert("id", 42);
        vars.insert("name", "tom");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("id"), Some(&json!(42)));
        assert_eq!(vars.get("missing"), None);
    }

    #[test]
    fn test_layered_top_wins() {
        let mut base = VariableSet::new();
        base.insert("host", "localhost");
        base.insert("token", "base");

        let mut top = VariableSet::new();
        top.insert("token", "row");

        let merged = base.layered(&top);
        assert_eq!(merged.get("host"), Some(&json!("localhost")));
        assert_eq!(merged.get("token"), Some(&json!("row")));
    }

    #[test]
    fn test_try_from_non_object() {
        let err = VariableSet::try_from(json!(42)).unwrap_err();
        assert!(err.to_string().contains("number"));
        assert!(VariableSet::try_from(json!({"a": 1})).is_ok());
    }

    #[test]
    fn test_batch_deserialize_shape() {
        let single: VariableBatch = serde_json::from_value(json!({"a": 1})).unwrap();
        assert!(matches!(single, VariableBatch::Single(_)));

        let rows: VariableBatch = serde_json::from_value(json!([{"a": 1}, {"a": 2}])).unwrap();
        match rows {
            VariableBatch::Rows(items) => assert_eq!(items.len(), 2),
            _ => panic!("Expected rows"),
        }

        assert!(serde_json::from_value::<VariableBatch>(json!("text")).is_err());
    }

    #[test]
    fn test_variable_config_parse() {
        let toml_str = r#"
[settings]
results_dir = "out"
timeout_secs = 15

[environments.dev]
base_url = "http://localhost:8080"
api_key = "dev-key"

[environments.prod]
base_url = "https://api.example.com"
api_key = "${PROD_KEY}"
"#;

        let config: VariableConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.settings.results_dir.as_deref(), Some("out"));
        assert_eq!(config.settings.timeout_secs, Some(15));
        assert!(config.settings.shell.is_none());

        let dev = config.get_environment("dev").unwrap();
        assert_eq!(
            dev.variables.get("base_url"),
            Some(&"http://localhost:8080".to_string())
        );
    }
}
