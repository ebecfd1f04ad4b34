use crate::variable::resolver::TemplateResolver;
use crate::variable::types::{VariableConfig, VariableSet};
use crate::{Result, RucurlError};
use std::fs;
use std::path::Path;

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "rucurl.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<VariableConfig> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| RucurlError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| RucurlError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/rucurl/
    pub fn find_and_load() -> Option<VariableConfig> {
        if let Some(config) = Self::try_load_from_current_dir() {
            return Some(config);
        }

        Self::try_load_from_user_dir()
    }

    /// 尝试从当前目录及其父目录加载
    fn try_load_from_current_dir() -> Option<VariableConfig> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Self::load_or_warn(&config_path);
            }

            // 尝试父目录
            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Option<VariableConfig> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("rucurl").join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_or_warn(&config_path)
        } else {
            None
        }
    }

    fn load_or_warn(path: &Path) -> Option<VariableConfig> {
        match Self::load_from_path(path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                None
            }
        }
    }

    /// 构建基础变量层
    /// env_name: 环境名称（如 "dev", "prod"）
    /// cli_vars: CLI 传入的变量覆盖（--var key=value）
    ///
    /// 返回 (环境变量层, CLI 覆盖层)，执行时按 环境 < 行变量 < CLI 的优先级合并
    pub fn build_layers(
        config: &VariableConfig,
        env_name: Option<&str>,
        cli_vars: &[(String, String)],
    ) -> Result<(VariableSet, VariableSet)> {
        let mut base = VariableSet::new();

        if let Some(name) = env_name {
            let env = config
                .get_environment(name)
                .ok_or_else(|| RucurlError::ConfigError(format!("Unknown environment: {}", name)))?;
            for (key, value) in &env.variables {
                // 解析系统环境变量 ${VAR}
                base.insert(key.clone(), TemplateResolver::resolve_env_vars(value));
            }
        }

        let mut overrides = VariableSet::new();
        for (key, value) in cli_vars {
            overrides.insert(key.clone(), value.clone());
        }

        Ok((base, overrides))
    }

    /// 解析 CLI 变量参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path() {
        let config_content = r#"
[settings]
timeout_secs = 5

[environments.dev]
base_url = "http://localhost:8080"
api_key = "dev-key"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = ConfigLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.environments.len(), 1);
        assert_eq!(config.settings.timeout_secs, Some(5));
        assert!(config.get_environment("dev").is_some());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[settings\nbroken").unwrap();
        temp_file.flush().unwrap();

        let err = ConfigLoader::load_from_path(temp_file.path()).unwrap_err();
        assert!(matches!(err, RucurlError::ConfigError(_)));
    }

    #[test]
    fn test_build_layers() {
        let config: VariableConfig = toml::from_str(
            r#"
[environments.dev]
base_url = "http://localhost:8080"
token = "dev-token"
"#,
        )
        .unwrap();

        let cli_vars = vec![("token".to_string(), "custom-token".to_string())];
        let (base, overrides) = ConfigLoader::build_layers(&config, Some("dev"), &cli_vars).unwrap();
        assert_eq!(base.get("base_url"), Some(&json!("http://localhost:8080")));
        assert_eq!(base.get("token"), Some(&json!("dev-token")));
        assert_eq!(overrides.get("token"), Some(&json!("custom-token")));

        let mut row = VariableSet::new();
        row.insert("token", "row-token");
        row.insert("id", 3);
        let merged = base.layered(&row).layered(&overrides);
        assert_eq!(merged.get("token"), Some(&json!("custom-token")));
        assert_eq!(merged.get("id"), Some(&json!(3)));
    }

    #[test]
    fn test_build_layers_unknown_env() {
        let config = VariableConfig::default();
        assert!(ConfigLoader::build_layers(&config, Some("staging"), &[]).is_err());
        assert!(ConfigLoader::build_layers(&config, None, &[]).is_ok());
    }

    #[test]
    fn test_parse_cli_var() {
        assert_eq!(
            ConfigLoader::parse_cli_var("key=value"),
            Some(("key".to_string(), "value".to_string()))
        );

        assert_eq!(
            ConfigLoader::parse_cli_var("url=https://example.com?a=b"),
            Some(("url".to_string(), "https://example.com?a=b".to_string()))
        );

        assert_eq!(ConfigLoader::parse_cli_var("invalid"), None);
    }
}
