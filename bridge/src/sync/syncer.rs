//! Lock syncer
//!
//! Owns the snapshot of locks and their derived states, and refreshes it
//! through the API client according to the configured [`RefreshMode`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use ttlock_models::{LockState, LockSummary};

use crate::errors::BridgeError;
use crate::http::client::ApiClient;
use crate::records::{reconcile_for_lock, Reconciliation};
use crate::sync::webhook::WebhookPayload;
use crate::sync::{LockView, RefreshMode};

/// Sync bookkeeping
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub last_attempted_sync_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub err_streak: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Snapshot {
    locks: HashMap<i64, LockSummary>,
    states: HashMap<i64, Reconciliation>,
}

/// Lock syncer
pub struct LockSyncer {
    client: Arc<ApiClient>,
    mode: RefreshMode,
    snapshot: RwLock<Snapshot>,
    state: RwLock<SyncState>,
}

impl LockSyncer {
    pub fn new(client: Arc<ApiClient>, mode: RefreshMode) -> Self {
        Self {
            client,
            mode,
            snapshot: RwLock::new(Snapshot::default()),
            state: RwLock::new(SyncState::default()),
        }
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Replace the lock list wholesale. Returns the number of locks kept.
    pub async fn refresh_locks(&self) -> Result<usize, BridgeError> {
        let locks = self.client.list_locks().await?;

        let locks: HashMap<i64, LockSummary> = locks
            .into_iter()
            .filter(|lock| {
                let valid = is_valid_lock(lock);
                if !valid {
                    warn!("Dropping invalid lock entry {}", lock.lock_id);
                }
                valid
            })
            .map(|lock| (lock.lock_id, lock))
            .collect();

        let mut snapshot = self.snapshot.write().await;
        snapshot.states.retain(|lock_id, _| locks.contains_key(lock_id));
        snapshot.locks = locks;

        debug!("Lock list refreshed: {} locks", snapshot.locks.len());
        Ok(snapshot.locks.len())
    }

    /// Refresh one lock's state according to the refresh mode
    pub async fn update_lock_state(&self, lock_id: i64) -> Result<Reconciliation, BridgeError> {
        let reconciliation = match self.mode {
            RefreshMode::Polling => {
                let open_state = self.client.query_open_state(lock_id).await?;
                Reconciliation::new(open_state.lock_state(), "")
            }
            RefreshMode::PollingLogs => {
                let records = self.client.list_lock_records(lock_id).await?;
                reconcile_for_lock(lock_id, &records)
            }
            RefreshMode::WebhookLogs => return Ok(self.state_of(lock_id).await.unwrap_or_default()),
        };

        debug!("Lock {} is {:?}", lock_id, reconciliation.state);
        self.snapshot
            .write()
            .await
            .states
            .insert(lock_id, reconciliation.clone());

        Ok(reconciliation)
    }

    /// Full pass: lock list, then every lock's state when the mode polls.
    /// A failure on one lock does not stop the others, but auth failures abort.
    pub async fn trigger_sync(&self) -> Result<(), BridgeError> {
        self.state.write().await.last_attempted_sync_at = Some(Utc::now());
        let result = self.sync_impl().await;
        self.record_outcome(result).await
    }

    /// Startup pass: only the lock listing and auth failures are fatal.
    /// Locks whose state cannot be read yet are left to the poller.
    pub async fn initial_sync(&self) -> Result<(), BridgeError> {
        self.state.write().await.last_attempted_sync_at = Some(Utc::now());
        if let Err(e) = self.refresh_locks().await {
            return self.record_outcome(Err(e)).await;
        }

        let result = self.update_lock_states().await;
        match self.record_outcome(result).await {
            Err(e) if !e.is_auth_failure() => {
                warn!("Some lock states are not available yet: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    async fn record_outcome(&self, result: Result<(), BridgeError>) -> Result<(), BridgeError> {
        let mut state = self.state.write().await;
        match &result {
            Ok(()) => {
                state.last_synced_at = Some(Utc::now());
                state.err_streak = 0;
                state.last_error = None;
                info!("Sync completed successfully");
            }
            Err(e) => {
                state.err_streak += 1;
                state.last_error = Some(e.to_string());
                error!("Sync failed (attempt {}): {}", state.err_streak, e);
            }
        }
        result
    }

    async fn sync_impl(&self) -> Result<(), BridgeError> {
        self.refresh_locks().await?;
        self.update_lock_states().await
    }

    async fn update_lock_states(&self) -> Result<(), BridgeError> {
        if !self.mode.polls_state() {
            return Ok(());
        }

        let mut first_error = None;
        for lock_id in self.lock_ids().await {
            if let Err(e) = self.update_lock_state(lock_id).await {
                if e.is_auth_failure() {
                    return Err(e);
                }
                warn!("Failed to update lock {}: {}", lock_id, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply a webhook callback. Payloads without a lock or unlock decision
    /// leave the known state untouched.
    pub async fn apply_webhook(&self, payload: &WebhookPayload) -> Reconciliation {
        let reconciliation = payload.reconcile();

        let mut snapshot = self.snapshot.write().await;
        if !snapshot.locks.contains_key(&payload.lock_id) {
            warn!("Webhook for unknown lock {}", payload.lock_id);
        }

        if reconciliation.state != LockState::Unknown {
            info!(
                "Webhook set lock {} to {:?}",
                payload.lock_id, reconciliation.state
            );
            snapshot.states.insert(payload.lock_id, reconciliation.clone());
        } else {
            debug!("Webhook for lock {} carried no state change", payload.lock_id);
        }

        reconciliation
    }

    pub async fn lock(&self, lock_id: i64) -> Result<Value, BridgeError> {
        self.ensure_known(lock_id).await?;
        self.client.lock(lock_id).await
    }

    pub async fn unlock(&self, lock_id: i64) -> Result<Value, BridgeError> {
        self.ensure_known(lock_id).await?;
        self.client.unlock(lock_id).await
    }

    async fn ensure_known(&self, lock_id: i64) -> Result<(), BridgeError> {
        if self.snapshot.read().await.locks.contains_key(&lock_id) {
            Ok(())
        } else {
            Err(BridgeError::NotFound(format!("lock {}", lock_id)))
        }
    }

    pub async fn lock_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.snapshot.read().await.locks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn state_of(&self, lock_id: i64) -> Option<Reconciliation> {
        self.snapshot.read().await.states.get(&lock_id).cloned()
    }

    /// Every known lock, ordered by id
    pub async fn views(&self) -> Vec<LockView> {
        let snapshot = self.snapshot.read().await;
        let mut views: Vec<LockView> = snapshot
            .locks
            .values()
            .map(|lock| LockView::new(lock, snapshot.states.get(&lock.lock_id)))
            .collect();
        views.sort_by_key(|view| view.lock_id);
        views
    }

    pub async fn view(&self, lock_id: i64) -> Option<LockView> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .locks
            .get(&lock_id)
            .map(|lock| LockView::new(lock, snapshot.states.get(&lock_id)))
    }

    pub async fn get_state(&self) -> SyncState {
        self.state.read().await.clone()
    }
}

fn is_valid_lock(lock: &LockSummary) -> bool {
    lock.lock_id > 0
}
