//! Lock state synchronization

pub mod syncer;
pub mod webhook;

use serde::{Deserialize, Serialize};
use ttlock_models::{LockState, LockSummary};

use crate::records::Reconciliation;

/// How lock states are kept up to date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Ask the cloud for each lock's open state
    #[default]
    Polling,
    /// Derive each lock's state from its latest access records
    PollingLogs,
    /// Only webhook callbacks update the state
    WebhookLogs,
}

impl RefreshMode {
    /// Whether the poller should fetch per-lock state
    pub fn polls_state(&self) -> bool {
        matches!(self, RefreshMode::Polling | RefreshMode::PollingLogs)
    }
}

impl std::str::FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "polling" => Ok(RefreshMode::Polling),
            "polling_logs" => Ok(RefreshMode::PollingLogs),
            "webhook_logs" => Ok(RefreshMode::WebhookLogs),
            _ => Err(format!("Invalid refresh mode: {}", s)),
        }
    }
}

/// Presentation of one lock for the local API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockView {
    pub lock_id: i64,
    pub name: String,
    pub device_name: String,
    pub mac: String,
    pub battery: i64,
    pub state: LockState,
    pub is_locked: Option<bool>,
    pub changed_by: Option<String>,
    pub lock_unique_id: String,
    pub battery_unique_id: String,
}

impl LockView {
    pub fn new(summary: &LockSummary, reconciliation: Option<&Reconciliation>) -> Self {
        let state = reconciliation.map(|r| r.state).unwrap_or_default();
        let changed_by = reconciliation
            .map(|r| r.changed_by.clone())
            .filter(|actor| !actor.is_empty());

        Self {
            lock_id: summary.lock_id,
            name: summary.lock_alias.clone(),
            device_name: summary.lock_name.clone(),
            mac: summary.lock_mac.clone(),
            battery: summary.electric_quantity,
            state,
            is_locked: is_locked(state),
            changed_by,
            lock_unique_id: format!("{}_lock", summary.lock_id),
            battery_unique_id: format!("{}_battery", summary.lock_id),
        }
    }
}

/// `None` while the state is unknown
pub fn is_locked(state: LockState) -> Option<bool> {
    match state {
        LockState::Locked => Some(true),
        LockState::Unlocked => Some(false),
        LockState::Unknown => None,
    }
}
