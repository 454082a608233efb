use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Result, WizError};

pub const CLIENT_ID_KEY: &str = "wiz.clientId";
pub const CLIENT_SECRET_KEY: &str = "wiz.clientSecret";
pub const AUTH_URL_KEY: &str = "wiz.authUrl";
pub const API_ENDPOINT_URL_KEY: &str = "wiz.apiEndpointUrl";

#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub wiz: WizSettings,
    pub server: ServerSettings,
    pub client: ClientSettings,
    pub pagination: PaginationSettings,
    pub logging: LoggingSettings,
    pub request_timeout_secs: Option<u64>,
}

/// The `wiz` section. Accepts both snake_case and the camelCase keys used by
/// app-config files.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WizSettings {
    pub enabled: bool,
    #[serde(alias = "dashboardLink")]
    pub dashboard_link: Option<String>,
    #[serde(alias = "clientId")]
    pub client_id: Option<String>,
    #[serde(alias = "clientSecret")]
    pub client_secret: Option<String>,
    #[serde(alias = "authUrl")]
    pub auth_url: Option<String>,
    #[serde(alias = "apiEndpointUrl")]
    pub api_endpoint_url: Option<String>,
}

impl Default for WizSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dashboard_link: None,
            client_id: None,
            client_secret: None,
            auth_url: None,
            api_endpoint_url: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7007,
            base_path: "/api/wiz".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of a running proxy, including its base path.
    pub base_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7007/api/wiz".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PaginationSettings {
    /// Upper bound on pages fetched by the full-pagination operations.
    pub max_pages: usize,
    pub issues_page_size: u32,
    pub resources_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            max_pages: 50,
            issues_page_size: 20,
            resources_page_size: 500,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// The four values needed to talk to Wiz, all present.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub api_endpoint_url: String,
}

impl Config {
    /// Load from the default config location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).map_err(|e| WizError::ConfigRead {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;

            toml::from_str(&contents).map_err(|e| WizError::ConfigParse {
                path: config_path.to_path_buf(),
                source: e,
            })?
        } else {
            Config::default()
        };

        Ok(config.with_env_overrides())
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "wiz")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(WizError::NoConfigDir)
    }

    /// Environment variables take precedence over the config file.
    fn with_env_overrides(mut self) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = env("WIZ_CLIENT_ID") {
            self.wiz.client_id = Some(v);
        }
        if let Some(v) = env("WIZ_CLIENT_SECRET") {
            self.wiz.client_secret = Some(v);
        }
        if let Some(v) = env("WIZ_AUTH_URL") {
            self.wiz.auth_url = Some(v);
        }
        if let Some(v) = env("WIZ_API_ENDPOINT_URL") {
            self.wiz.api_endpoint_url = Some(v);
        }
        if let Some(v) = env("WIZ_BACKEND_URL") {
            self.client.base_url = v;
        }
        self
    }

    /// Collect the required Wiz settings, failing on the first absent one.
    pub fn credentials(&self) -> Result<Credentials> {
        fn required(value: &Option<String>, key: &'static str) -> Result<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or_else(|| WizError::missing_config(key))
        }

        Ok(Credentials {
            client_id: required(&self.wiz.client_id, CLIENT_ID_KEY)?,
            client_secret: required(&self.wiz.client_secret, CLIENT_SECRET_KEY)?,
            auth_url: required(&self.wiz.auth_url, AUTH_URL_KEY)?,
            api_endpoint_url: required(&self.wiz.api_endpoint_url, API_ENDPOINT_URL_KEY)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WizErrorType;

    #[test]
    fn test_parses_camel_case_keys() {
        let config: Config = toml::from_str(
            r#"
            [wiz]
            clientId = "id"
            clientSecret = "secret"
            authUrl = "https://auth.example.com/oauth/token"
            apiEndpointUrl = "https://api.example.com/graphql"
            dashboardLink = "https://app.wiz.io"
            "#,
        )
        .unwrap();

        let creds = config.credentials().unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.api_endpoint_url, "https://api.example.com/graphql");
        assert_eq!(config.wiz.dashboard_link.as_deref(), Some("https://app.wiz.io"));
        assert!(config.wiz.enabled);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.base_path, "/api/wiz");
        assert_eq!(config.pagination.max_pages, 50);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_key_is_named() {
        let mut config = Config::default();
        config.wiz.client_id = Some("id".into());
        config.wiz.client_secret = Some("   ".into());

        let err = config.credentials().unwrap_err();
        assert_eq!(err.kind(), WizErrorType::MissingConfig);
        assert!(err.to_string().contains(CLIENT_SECRET_KEY));
    }
}
