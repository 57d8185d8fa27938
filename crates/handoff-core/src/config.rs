//! Configuration management for Handoff
//!
//! Handles loading the bot configuration from a TOML file with
//! environment variable overrides for credentials and listen address.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat platform settings
    #[serde(default)]
    pub lark: LarkConfig,
    /// Webhook listener settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Lark/Feishu application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LarkConfig {
    /// App ID issued by the platform
    pub app_id: String,
    /// App secret (prefer the HANDOFF_APP_SECRET env var)
    pub app_secret: String,
    /// Open-platform base URL (Feishu vs Lark suite)
    pub base_url: String,
    /// How receive ids are interpreted when sending messages
    pub receive_id_type: String,
    /// Users allowed to start tasks (open ids)
    pub allowed_users: Vec<String>,
}

impl Default for LarkConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: "https://open.feishu.cn".to_string(),
            receive_id_type: "open_id".to_string(),
            allowed_users: Vec::new(),
        }
    }
}

/// Webhook listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over file values so deployments can
    /// keep secrets out of the config file.
    ///
    /// - `HANDOFF_APP_ID` / `HANDOFF_APP_SECRET`
    /// - `HANDOFF_BASE_URL`
    /// - `HANDOFF_ALLOWED_USERS` (comma separated)
    /// - `HANDOFF_WEBHOOK_HOST` / `HANDOFF_WEBHOOK_PORT`
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HANDOFF_APP_ID") {
            self.lark.app_id = v;
        }
        if let Ok(v) = std::env::var("HANDOFF_APP_SECRET") {
            self.lark.app_secret = v;
        }
        if let Ok(v) = std::env::var("HANDOFF_BASE_URL") {
            self.lark.base_url = v;
        }
        if let Ok(v) = std::env::var("HANDOFF_ALLOWED_USERS") {
            self.lark.allowed_users = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("HANDOFF_WEBHOOK_HOST") {
            self.webhook.host = v;
        }
        if let Some(port) = std::env::var("HANDOFF_WEBHOOK_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            self.webhook.port = port;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lark.app_id.is_empty() {
            return Err(Error::Config("lark.app_id is required".to_string()));
        }
        if self.lark.app_secret.is_empty() {
            return Err(Error::Config("lark.app_secret is required".to_string()));
        }
        Ok(())
    }

    /// Whether this user may start tasks.
    pub fn is_user_allowed(&self, user_id: &str) -> bool {
        self.lark.allowed_users.iter().any(|u| u == user_id)
    }

    /// Listen address in `host:port` form.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.webhook.host, self.webhook.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.lark.receive_id_type, "open_id");
        assert_eq!(config.webhook.port, 8080);
        assert!(config.lark.allowed_users.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [lark]
            app_id = "cli_abc"
            app_secret = "shh"
            allowed_users = ["ou_alice", "ou_bob"]

            [webhook]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.lark.app_id, "cli_abc");
        assert_eq!(config.webhook.port, 9000);
        assert!(config.is_user_allowed("ou_alice"));
        assert!(!config.is_user_allowed("ou_eve"));
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_load_missing_credentials_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handoff.toml");
        std::fs::write(&path, "[webhook]\nport = 1234\n").unwrap();
        // No app_id/app_secret in file or env for this path.
        if std::env::var("HANDOFF_APP_ID").is_err() {
            assert!(Config::load(&path).is_err());
        }
    }
}
