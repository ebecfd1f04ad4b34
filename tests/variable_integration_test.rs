use rucurl::parser::parse_command;
use rucurl::variable::{ConfigLoader, ShellDialect, TemplateResolver, VariableConfig, VariableSet};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn vars(value: serde_json::Value) -> VariableSet {
    VariableSet::try_from(value).unwrap()
}

/// 测试从实际配置文件加载环境和运行参数
#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rucurl.toml");

    let config_content = r#"
[settings]
results_dir = "out/results"
timeout_secs = 10
shell = "/bin/sh"

[environments.dev]
base_url = "http://localhost:3000"
api_key = "dev-key-123"

[environments.prod]
base_url = "https://api.example.com"
api_key = "${PROD_API_KEY}"
"#;

    fs::write(&config_path, config_content).unwrap();

    let config = ConfigLoader::load_from_path(&config_path).unwrap();
    assert!(config.environments.contains_key("dev"));
    assert!(config.environments.contains_key("prod"));
    assert_eq!(config.settings.results_dir.as_deref(), Some("out/results"));
    assert_eq!(config.settings.timeout_secs, Some(10));
    assert_eq!(config.settings.shell.as_deref(), Some("/bin/sh"));
}

/// 环境 < 行变量 < CLI 覆盖
#[test]
fn test_layer_priority() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rucurl.toml");
    fs::write(
        &config_path,
        r#"
[environments.dev]
base_url = "http://localhost:3000"
api_key = "config-key"
user = "config-user"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_path(&config_path).unwrap();
    let cli_vars = vec![("api_key".to_string(), "cli-key".to_string())];
    let (base, overrides) = ConfigLoader::build_layers(&config, Some("dev"), &cli_vars).unwrap();

    let row = vars(json!({"user": "row-user", "api_key": "row-key"}));
    let merged = base.layered(&row).layered(&overrides);

    let command = TemplateResolver::resolve(
        "curl {{base_url}}/me -H 'X-Key: {{api_key}}' -H 'X-User: {{user}}'",
        &merged,
    );
    assert_eq!(
        command,
        "curl http://localhost:3000/me -H 'X-Key: cli-key' -H 'X-User: row-user'"
    );
}

/// 配置中的 ${VAR} 从进程环境变量解析
#[test]
fn test_environment_variable_resolution() {
    unsafe {
        std::env::set_var("RUCURL_IT_API_KEY", "environment-value");
    }

    let config: VariableConfig = toml::from_str(
        r#"
[environments.dev]
api_key = "${RUCURL_IT_API_KEY}"
"#,
    )
    .unwrap();
    let (base, _) = ConfigLoader::build_layers(&config, Some("dev"), &[]).unwrap();
    assert_eq!(TemplateResolver::resolve("{{api_key}}", &base), "environment-value");

    unsafe {
        std::env::remove_var("RUCURL_IT_API_KEY");
    }
}

/// 未知占位符原样保留
#[test]
fn test_unknown_placeholders_unchanged() {
    let templates = [
        "curl http://h/{{missing}}",
        "curl {{a}}{{b}} -d '{{c}}'",
        "curl ^\"http://h/{{x}}^\"",
    ];
    let v = vars(json!({"unrelated": 1}));
    for template in templates {
        assert_eq!(TemplateResolver::resolve(template, &v), template);
    }
}

/// 结构化值按方言加引号，解析后能还原出原 JSON
#[test]
fn test_structured_value_round_trip_through_parser() {
    let body = json!({"name": "Tom", "tags": ["a", "b"]});
    let v = vars(json!({"body": body}));

    let bash = "curl 'http://h/api' \\\n  -H 'Content-Type: application/json' \\\n  --data-raw {{body}}";
    assert_eq!(ShellDialect::classify(bash), ShellDialect::LineContinuation);
    let resolved = TemplateResolver::resolve(bash, &v);
    let request = parse_command(&resolved);
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "http://h/api");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&request.body).unwrap(), body);

    let cmd = "curl ^\"http://h/api^\" ^\n  -H ^\"Content-Type: application/json^\" ^\n  --data-raw {{body}}";
    assert_eq!(ShellDialect::classify(cmd), ShellDialect::Caret);
    let resolved = TemplateResolver::resolve(cmd, &v);
    assert!(resolved.ends_with(r#"--data-raw ^"{\"name\":\"Tom\",\"tags\":[\"a\",\"b\"]}^""#));
    assert_eq!(
        parse_command(&resolved).headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
}

/// 请求解析
#[test]
fn test_parse_full_command() {
    let request = parse_command(
        "curl -X POST 'http://h/x?a=1&b=' -H 'Content-Type: application/json' -d '{\"k\":1}'",
    );
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "http://h/x?a=1&b=");
    assert_eq!(
        request.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(request.body, r#"{"k":1}"#);
    assert_eq!(request.params.get("a").map(String::as_str), Some("1"));
    assert_eq!(request.params.get("b").map(String::as_str), Some(""));
    assert_eq!(request.params.len(), 2);
}

#[test]
fn test_cli_variable_parsing() {
    assert_eq!(
        ConfigLoader::parse_cli_var("token=a=b"),
        Some(("token".to_string(), "a=b".to_string()))
    );
    assert_eq!(ConfigLoader::parse_cli_var("token"), None);
}
