//! Scripted in-memory transport
//!
//! Replays queued responses in order and records every request it receives.
//! Used by the test suites to drive the client without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BridgeError;
use crate::http::transport::{ApiRequest, Transport};

type Reply = Result<Value, BridgeError>;

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<ApiRequest>,
}

/// Cloneable handle, all clones share one script
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body as the next reply
    pub fn reply(&self, body: Value) -> &Self {
        self.push(Ok(body))
    }

    /// Queue an error as the next reply
    pub fn fail(&self, err: BridgeError) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, reply: Reply) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script.replies.push_back(reply);
        }
        self
    }

    /// Every request sent so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }

    /// Paths of every request sent so far
    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.script.lock().map(|script| script.replies.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, BridgeError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| BridgeError::Internal(e.to_string()))?;

        script.requests.push(request.clone());
        script.replies.pop_front().unwrap_or_else(|| {
            Err(BridgeError::Internal(format!(
                "no scripted reply for {} {}",
                request.verb, request.path
            )))
        })
    }
}
