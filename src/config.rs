use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::auth::{AuthenticationConfig, AuthorizationConfig};

/// Configuration for the authgate server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub authorization: AuthorizationConfig,

    #[serde(default)]
    pub authentication: AuthenticationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Path prefix every route is mounted under, e.g. `/wiki`
    pub base_path: String,

    /// Externally visible origin, used for federated callback URLs
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6067,
            base_path: String::new(),
            base_url: "http://localhost:6067".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub title: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            title: "authgate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub timeout_seconds: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "authgate_session".to_string(),
            cookie_secure: false,
            timeout_seconds: 3600,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the TOML file at `path` (if present), overlaid by
    /// `AUTHGATE_*` environment variables
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("AUTHGATE_").split("__"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Structural checks; per-method requirements are checked when the
    /// verifiers are registered
    pub fn validate(&self) -> anyhow::Result<()> {
        let base_path = &self.server.base_path;
        if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
            anyhow::bail!(
                "server.base_path must start with '/' and not end with '/', got '{}'",
                base_path
            );
        }

        url::Url::parse(&self.server.base_url)
            .map_err(|e| anyhow::anyhow!("server.base_url is not a valid URL: {}", e))?;

        if self.session.cookie_name.is_empty() {
            anyhow::bail!("session.cookie_name must not be empty");
        }
        if self.session.timeout_seconds <= 0 {
            anyhow::bail!("session.timeout_seconds must be positive");
        }

        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Origin plus base path that federated callback routes hang off
    pub fn callback_base(&self) -> String {
        format!(
            "{}{}",
            self.server.base_url.trim_end_matches('/'),
            self.server.base_path
        )
    }

    /// Path scope of the session cookie
    pub fn cookie_path(&self) -> String {
        format!("{}/", self.server.base_path)
    }
}
