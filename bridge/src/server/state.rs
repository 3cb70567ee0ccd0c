//! Server state

use std::sync::Arc;

use crate::sync::syncer::LockSyncer;

/// Server state shared across handlers
pub struct ServerState {
    pub syncer: Arc<LockSyncer>,

    /// Accepted webhook path segment; `None` disables the webhook route
    pub webhook_id: Option<String>,
}

impl ServerState {
    pub fn new(syncer: Arc<LockSyncer>, webhook_id: Option<String>) -> Self {
        Self { syncer, webhook_id }
    }
}
