//! Application state management

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::authn::login::resume;
use crate::errors::BridgeError;
use crate::http::client::ApiClient;
use crate::storage::settings::Settings;
use crate::sync::syncer::LockSyncer;
use crate::sync::RefreshMode;

/// Main application state
pub struct AppState {
    /// Authenticated cloud client
    pub client: Arc<ApiClient>,

    /// Lock syncer
    pub syncer: Arc<LockSyncer>,
}

impl AppState {
    /// Build the client, resume the session and load the first snapshot
    pub async fn init(
        settings: &Settings,
        refresh_mode: RefreshMode,
        token_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Self, BridgeError> {
        info!("Initializing application state...");

        let client = ApiClient::new(settings.credentials())?;
        Self::init_with_client(client, settings, refresh_mode, token_tx).await
    }

    pub async fn init_with_client(
        client: ApiClient,
        settings: &Settings,
        refresh_mode: RefreshMode,
        token_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Self, BridgeError> {
        client
            .on_refresh_token(move |token| {
                // A closed channel only means we are shutting down
                let _ = token_tx.send(token.to_string());
            })
            .await;

        resume(&client, &settings.refresh_token).await?;

        let client = Arc::new(client);
        let syncer = Arc::new(LockSyncer::new(client.clone(), refresh_mode));
        syncer.initial_sync().await?;

        info!("Tracking {} locks", syncer.lock_ids().await.len());

        Ok(Self {
            client,
            syncer,
        })
    }
}
