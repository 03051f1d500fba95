use mcp_share::EmqxConfig;
use serde::Deserialize;
use std::{fs, path::Path};

/// EMQX Deployment API 凭证配置
///
/// `app_id` / `app_secret` 可用环境变量覆盖，环境变量优先于配置文件。
#[derive(Debug, Clone, Deserialize)]
pub struct EmqxSettings {
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub emqx: EmqxSettings,
}

impl AppConfig {
    /// 从配置文件加载，路径由 MCP_SERVER_CONFIG 环境变量指定
    ///
    /// 必填项缺失时在启动阶段直接失败，不会推迟到第一次调用。
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("MCP_SERVER_CONFIG")
            .unwrap_or_else(|_| "mcp-server/config.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("读取配置文件 {} 失败: {}", path.display(), e))?;
        let mut config: AppConfig =
            toml::from_str(&content).map_err(|e| anyhow::anyhow!("配置文件格式错误: {}", e))?;

        // 环境变量优先于配置文件（与 EMQX 部署约定保持一致的变量名）
        if let Ok(app_id) = std::env::var("EMQX_DEPLOYMENT_API_KEY_APP_ID") {
            config.emqx.app_id = app_id;
        }
        if let Ok(app_secret) = std::env::var("EMQX_API_APP_SECRET") {
            config.emqx.app_secret = app_secret;
        }

        if config.emqx.api_endpoint.is_empty()
            || config.emqx.app_id.is_empty()
            || config.emqx.app_secret.is_empty()
        {
            anyhow::bail!("EMQX 配置缺失：api_endpoint、app_id、app_secret 均为必填项");
        }

        Ok(config)
    }
}

impl EmqxSettings {
    /// 转换成发布网关的客户端配置
    pub fn into_client_config(self) -> EmqxConfig {
        let mut config = EmqxConfig::new(self.api_endpoint, self.app_id, self.app_secret);
        config.timeout_secs = self.timeout;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const FULL_CONFIG: &str = r#"
[emqx]
api_endpoint = "https://deployment.emqx.com/api/v5"
app_id = "file-app-id"
app_secret = "file-app-secret"
timeout = 30
"#;

    #[test]
    #[serial]
    fn loads_full_config_from_file() {
        let file = write_config(FULL_CONFIG);
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.emqx.api_endpoint, "https://deployment.emqx.com/api/v5");
        assert_eq!(config.emqx.app_id, "file-app-id");
        assert_eq!(config.emqx.timeout, 30);
    }

    #[test]
    #[serial]
    fn timeout_defaults_to_sixty_seconds() {
        let file = write_config(
            r#"
[emqx]
api_endpoint = "https://deployment.emqx.com/api/v5"
app_id = "id"
app_secret = "secret"
"#,
        );
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.emqx.timeout, 60);
    }

    #[test]
    #[serial]
    fn environment_overrides_file_credentials() {
        let file = write_config(FULL_CONFIG);
        temp_env::with_vars(
            [
                ("EMQX_DEPLOYMENT_API_KEY_APP_ID", Some("env-app-id")),
                ("EMQX_API_APP_SECRET", Some("env-app-secret")),
            ],
            || {
                let config = AppConfig::load_from(file.path()).unwrap();
                assert_eq!(config.emqx.app_id, "env-app-id");
                assert_eq!(config.emqx.app_secret, "env-app-secret");
                // api_endpoint 仍然来自文件
                assert_eq!(config.emqx.api_endpoint, "https://deployment.emqx.com/api/v5");
            },
        );
    }

    #[test]
    #[serial]
    fn missing_credentials_fail_at_load_time() {
        let file = write_config(
            r#"
[emqx]
api_endpoint = "https://deployment.emqx.com/api/v5"
"#,
        );
        temp_env::with_vars(
            [
                ("EMQX_DEPLOYMENT_API_KEY_APP_ID", None::<&str>),
                ("EMQX_API_APP_SECRET", None::<&str>),
            ],
            || {
                assert!(AppConfig::load_from(file.path()).is_err());
            },
        );
    }

    #[test]
    #[serial]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load_from(Path::new("/nonexistent/config.toml")).is_err());
    }
}
