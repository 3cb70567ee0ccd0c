//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::authn::credentials::Credentials;
use crate::errors::BridgeError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::sync::RefreshMode;

/// Bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Cloud account configuration
    #[serde(default)]
    pub cloud: CloudSettings,

    /// Refresh token from the last successful login
    #[serde(default)]
    pub refresh_token: String,

    /// How lock states are refreshed
    #[serde(default)]
    pub refresh_mode: RefreshMode,

    /// Enable polling worker
    #[serde(default = "default_true")]
    pub enable_poller: bool,

    /// Polling interval in seconds
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Webhook path segment, derived from the client credentials when absent
    #[serde(default)]
    pub webhook_id: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_polling_interval() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            cloud: CloudSettings::default(),
            refresh_token: String::new(),
            refresh_mode: RefreshMode::Polling,
            enable_poller: true,
            polling_interval_secs: 30,
            server: ServerSettings::default(),
            webhook_id: None,
        }
    }
}

impl Settings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.cloud.server_url.clone(),
            self.cloud.client_id.clone(),
            self.cloud.client_secret.clone(),
            self.cloud.username.clone(),
        )
    }

    /// Check that the cloud account is configured
    pub fn validate(&self) -> Result<(), BridgeError> {
        let missing: Vec<&str> = [
            ("cloud.server_url", &self.cloud.server_url),
            ("cloud.client_id", &self.cloud.client_id),
            ("cloud.client_secret", &self.cloud.client_secret),
            ("cloud.username", &self.cloud.username),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(BridgeError::ConfigError(format!(
                "missing settings: {}",
                missing.join(", ")
            )));
        }

        if self.polling_interval_secs == 0 {
            return Err(BridgeError::ConfigError(
                "polling_interval_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Cloud account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSettings {
    /// Regional API server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub username: String,
}

fn default_server_url() -> String {
    "https://euapi.ttlock.com".to_string()
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8123
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Load settings, falling back to defaults when the file does not exist
pub async fn load_settings(file: &File) -> Result<Settings, BridgeError> {
    if !file.exists().await {
        return Ok(Settings::default());
    }
    file.read_json().await
}

/// Save settings; the file holds secrets so it is kept owner-only
pub async fn save_settings(file: &File, settings: &Settings) -> Result<(), BridgeError> {
    file.write_json(settings).await?;
    file.set_permissions_600().await
}

/// Replace the stored refresh token, keeping every other setting
pub async fn save_refresh_token(file: &File, refresh_token: &str) -> Result<(), BridgeError> {
    let mut settings = load_settings(file).await?;
    settings.refresh_token = refresh_token.to_string();
    save_settings(file, &settings).await?;
    info!("Stored new refresh token in {}", file.path().display());
    Ok(())
}
