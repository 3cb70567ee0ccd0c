//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::BridgeError;
use crate::filesys::file::File;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::storage::settings::Settings;
use crate::workers::{poller, token_persist};

/// Run the bridge until the shutdown signal fires
pub async fn run(
    settings: Settings,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BridgeError> {
    info!("Initializing lockbridge...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let _app_state = match init(&settings, &options, &shutdown_tx, &mut shutdown_manager).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to start lockbridge: {}", e);
            shutdown_manager.shutdown().await?;
            return Err(e);
        }
    };

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    settings: &Settings,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, BridgeError> {
    let settings_file = Arc::new(options.layout.settings_file());

    // The persistence worker must be draining before the first authentication
    let (token_tx, token_rx) = token_persist::channel();
    init_token_persist_worker(
        settings_file.clone(),
        token_rx,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )?;

    let app_state = Arc::new(
        AppState::init(settings, options.refresh_mode, token_tx).await?,
    );

    if options.enable_poller {
        init_poller_worker(
            options.poller.clone(),
            app_state.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )?;
    }

    if options.enable_socket_server {
        init_socket_server(options, app_state.clone(), shutdown_manager, shutdown_tx.subscribe())
            .await?;
    }

    Ok(app_state)
}

fn init_token_persist_worker(
    settings_file: Arc<File>,
    token_rx: tokio::sync::mpsc::UnboundedReceiver<String>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BridgeError> {
    info!("Initializing token persistence worker...");

    let handle = tokio::spawn(async move {
        token_persist::run(
            settings_file.as_ref(),
            token_rx,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_token_persist_worker_handle(handle)
}

fn init_poller_worker(
    options: poller::Options,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BridgeError> {
    info!("Initializing poller worker...");

    let syncer = app_state.syncer.clone();

    let handle = tokio::spawn(async move {
        poller::run(
            &options,
            syncer.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_poller_worker_handle(handle)
}

async fn init_socket_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BridgeError> {
    info!("Initializing local HTTP server...");

    if options.webhook_id.is_some() {
        info!("Webhook endpoint enabled at /webhook/<webhook_id>");
    }

    let server_state = ServerState::new(app_state.syncer.clone(), options.webhook_id.clone());

    let handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    socket_server_handle: Option<JoinHandle<Result<(), BridgeError>>>,
    poller_worker_handle: Option<JoinHandle<()>>,
    token_persist_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            socket_server_handle: None,
            poller_worker_handle: None,
            token_persist_worker_handle: None,
        }
    }

    fn with_token_persist_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), BridgeError> {
        if self.token_persist_worker_handle.is_some() {
            return Err(BridgeError::ShutdownError("token_persist_handle already set".to_string()));
        }
        self.token_persist_worker_handle = Some(handle);
        Ok(())
    }

    fn with_poller_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), BridgeError> {
        if self.poller_worker_handle.is_some() {
            return Err(BridgeError::ShutdownError("poller_handle already set".to_string()));
        }
        self.poller_worker_handle = Some(handle);
        Ok(())
    }

    fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), BridgeError>>,
    ) -> Result<(), BridgeError> {
        if self.socket_server_handle.is_some() {
            return Err(BridgeError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), BridgeError> {
        let _ = self.shutdown_tx.send(());

        let max_delay = self.lifecycle_options.max_shutdown_delay;
        let result = tokio::time::timeout(max_delay, self.shutdown_impl()).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                error!("Shutdown timed out after {:?}, aborting workers...", max_delay);
                self.abort_all();
                Err(BridgeError::ShutdownError("shutdown timed out".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), BridgeError> {
        info!("Shutting down lockbridge...");

        // 1. Poller worker
        if let Some(handle) = self.poller_worker_handle.take() {
            handle.await.map_err(|e| BridgeError::ShutdownError(e.to_string()))?;
        }

        // 2. Socket server
        if let Some(handle) = self.socket_server_handle.take() {
            handle.await.map_err(|e| BridgeError::ShutdownError(e.to_string()))??;
        }

        // 3. Token persistence last, so a rotation during shutdown is still written
        if let Some(handle) = self.token_persist_worker_handle.take() {
            handle.await.map_err(|e| BridgeError::ShutdownError(e.to_string()))?;
        }

        info!("Shutdown complete");
        Ok(())
    }

    fn abort_all(&mut self) {
        for handle in [
            self.poller_worker_handle.take(),
            self.token_persist_worker_handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
        if let Some(handle) = self.socket_server_handle.take() {
            handle.abort();
        }
    }
}
