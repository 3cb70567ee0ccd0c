//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::sync::webhook::default_webhook_id;
use crate::sync::RefreshMode;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout
    pub layout: StorageLayout,

    /// How lock states are refreshed
    pub refresh_mode: RefreshMode,

    /// Enable polling worker
    pub enable_poller: bool,

    /// Poller worker options
    pub poller: poller::Options,

    /// Enable local HTTP server
    pub enable_socket_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Webhook path segment, set only in webhook mode
    pub webhook_id: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            refresh_mode: RefreshMode::default(),
            enable_poller: true,
            poller: poller::Options::default(),
            enable_socket_server: true,
            server: ServerOptions::default(),
            webhook_id: None,
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        let webhook_id = match settings.refresh_mode {
            RefreshMode::WebhookLogs => Some(
                settings
                    .webhook_id
                    .clone()
                    .unwrap_or_else(|| default_webhook_id(&settings.credentials())),
            ),
            _ => None,
        };

        Self {
            layout,
            refresh_mode: settings.refresh_mode,
            enable_poller: settings.enable_poller,
            poller: poller::Options {
                interval: Duration::from_secs(settings.polling_interval_secs),
            },
            enable_socket_server: settings.server.enabled,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            webhook_id,
            ..Default::default()
        }
    }
}

/// Lifecycle options for the bridge
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8123,
        }
    }
}
