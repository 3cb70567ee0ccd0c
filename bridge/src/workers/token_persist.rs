//! Refresh token persistence worker
//!
//! The token store observer only pushes new refresh tokens into a channel;
//! this worker drains it and writes each token to the settings file.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::filesys::file::File;
use crate::storage::settings::save_refresh_token;

/// Channel feeding the worker, created before the client is authenticated
pub fn channel() -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
    mpsc::unbounded_channel()
}

/// Run the worker until the channel closes or the shutdown signal fires
pub async fn run(
    settings_file: &File,
    mut tokens: mpsc::UnboundedReceiver<String>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Token persistence worker starting...");

    loop {
        let token = tokio::select! {
            _ = &mut shutdown_signal => {
                // Flush anything queued before the signal
                while let Ok(token) = tokens.try_recv() {
                    persist(settings_file, &token).await;
                }
                info!("Token persistence worker shutting down...");
                return;
            }
            token = tokens.recv() => match token {
                Some(token) => token,
                None => {
                    info!("Token channel closed, token persistence worker exiting...");
                    return;
                }
            },
        };

        persist(settings_file, &token).await;
    }
}

async fn persist(settings_file: &File, token: &str) {
    if let Err(e) = save_refresh_token(settings_file, token).await {
        // The in-memory token is still valid; the next rotation retries the write
        error!("Failed to persist refresh token: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::settings::load_settings;

    #[tokio::test]
    async fn test_persists_latest_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::new(dir.path().join("settings.json"));
        let (tx, rx) = channel();

        tx.send("r1".to_string()).unwrap();
        tx.send("r2".to_string()).unwrap();
        drop(tx);

        run(&file, rx, Box::pin(std::future::pending())).await;

        let settings = load_settings(&file).await.unwrap();
        assert_eq!(settings.refresh_token, "r2");
    }
}
