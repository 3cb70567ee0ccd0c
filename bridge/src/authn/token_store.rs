//! In-memory access/refresh token pair

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

/// Observer called with every new refresh token
pub type RefreshTokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Snapshot of the tokens held by a client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Holds the current tokens of one client and notifies a single observer when
/// the refresh token changes. Tokens are only ever replaced, never cleared.
#[derive(Default)]
pub struct TokenStore {
    state: RwLock<TokenState>,
    on_refresh_token: RwLock<Option<RefreshTokenCallback>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the refresh token observer, replacing any previous one
    pub async fn on_refresh_token<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut slot = self.on_refresh_token.write().await;
        *slot = Some(Arc::new(callback));
    }

    /// Replace whichever tokens are present
    pub async fn set_tokens(&self, access_token: Option<String>, refresh_token: Option<String>) {
        let changed_refresh = {
            let mut state = self.state.write().await;

            if let Some(access) = access_token {
                state.access_token = Some(access);
            }

            match refresh_token {
                Some(refresh) if state.refresh_token.as_deref() != Some(refresh.as_str()) => {
                    state.refresh_token = Some(refresh.clone());
                    Some(refresh)
                }
                _ => None,
            }
        };

        // Observer runs outside the state lock so it may read the store
        if let Some(refresh) = changed_refresh {
            debug!("Refresh token changed, notifying observer");
            let callback = self.on_refresh_token.read().await.clone();
            if let Some(callback) = callback {
                callback(&refresh);
            }
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    pub async fn snapshot(&self) -> TokenState {
        self.state.read().await.clone()
    }
}
