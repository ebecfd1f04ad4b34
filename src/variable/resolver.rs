use crate::variable::dialect::ShellDialect;
use crate::variable::types::VariableSet;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

/// 模板变量替换器
pub struct TemplateResolver;

impl TemplateResolver {
    /// 替换命令模板中的所有 {{variable}} 占位符
    ///
    /// 未定义的变量保持原样；对象和数组先序列化为紧凑 JSON，再按模板方言加引号；
    /// 标量直接转成文本，不做任何转义。
    pub fn resolve(template: &str, variables: &VariableSet) -> String {
        static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = VAR_REGEX.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap());

        let dialect = ShellDialect::classify(template);

        re.replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => Self::render(value, dialect),
            None => caps[0].to_string(),
        })
        .to_string()
    }

    fn render(value: &Value, dialect: ShellDialect) -> String {
        match value {
            Value::Object(_) | Value::Array(_) => dialect.quote_structured(&value.to_string()),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// 解析并替换系统环境变量 ${VAR}
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}
