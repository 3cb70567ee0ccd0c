//! Authenticated API client
//!
//! Every authenticated call carries `clientId` and `accessToken`. When the
//! vendor answers with errcode 10003 the client mints a new access token from
//! the stored refresh token and replays the original call exactly once.

use std::fmt;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use ttlock_models::{TokenResponse, TOKEN_INVALID_ERRCODE};

use crate::authn::credentials::Credentials;
use crate::authn::token_store::TokenStore;
use crate::errors::BridgeError;
use crate::http::transport::{ApiRequest, Encoding, Params, ReqwestTransport, Transport, Verb};
use crate::utils::md5_hex;

const TOKEN_PATH: &str = "/oauth2/token";

/// OAuth grant used by [`ApiClient::authenticate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantType::Password => f.write_str("password"),
            GrantType::RefreshToken => f.write_str("refresh_token"),
        }
    }
}

/// Client for the TTLock open platform
pub struct ApiClient {
    credentials: Credentials,
    transport: Box<dyn Transport>,
    tokens: TokenStore,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a client talking to `credentials.server_url` over HTTPS
    pub fn new(credentials: Credentials) -> Result<Self, BridgeError> {
        let transport = ReqwestTransport::new(&credentials.server_url)?;
        Ok(Self::with_transport(credentials, transport))
    }

    pub fn with_transport(credentials: Credentials, transport: impl Transport + 'static) -> Self {
        Self {
            credentials,
            transport: Box::new(transport),
            tokens: TokenStore::new(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Register the observer notified of every new refresh token
    pub async fn on_refresh_token<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.tokens.on_refresh_token(callback).await;
    }

    /// Obtain tokens with a password or a refresh token.
    ///
    /// Business errors are not raised here: the decoded body is returned as is
    /// and the caller checks it for `access_token` or `errcode`.
    pub async fn authenticate(&self, secret: &str, grant: GrantType) -> Result<Value, BridgeError> {
        let mut params = Params::new();
        params.insert("clientId".into(), self.credentials.client_id.clone().into());
        params.insert(
            "clientSecret".into(),
            self.credentials.client_secret().to_string().into(),
        );
        params.insert("username".into(), self.credentials.username().to_string().into());

        match grant {
            GrantType::Password => {
                params.insert("password".into(), md5_hex(secret.as_bytes()).into());
            }
            GrantType::RefreshToken => {
                params.insert("grant_type".into(), "refresh_token".into());
                params.insert("refresh_token".into(), secret.to_string().into());
            }
        }

        let request = ApiRequest::new(Verb::Post, TOKEN_PATH, params).with_encoding(Encoding::Form);
        let body = self.transport.send(&request).await?;

        let tokens = TokenResponse::from_body(&body);
        if tokens.access_token.is_some() {
            info!("Authenticated with {} grant", grant);
        } else {
            warn!(
                "Authentication with {} grant returned no access token (errcode {:?})",
                grant,
                errcode(&body)
            );
        }
        self.tokens.set_tokens(tokens.access_token, tokens.refresh_token).await;

        Ok(body)
    }

    /// Perform a call with the current credentials, refreshing them once on
    /// an expired-token reply.
    pub async fn authenticated_call(
        &self,
        verb: Verb,
        path: &str,
        params: Params,
    ) -> Result<Value, BridgeError> {
        let stale = self.tokens.access_token().await;
        let response = self.send_with_token(verb, path, &params, stale.as_deref()).await?;

        if errcode(&response) != Some(TOKEN_INVALID_ERRCODE) {
            return Ok(response);
        }

        warn!("Access token rejected on {} {}, refreshing", verb, path);
        let fresh = self.refresh_access_token(stale.as_deref()).await?;

        debug!("Retrying {} {} with refreshed token", verb, path);
        self.send_with_token(verb, path, &params, Some(&fresh)).await
    }

    async fn send_with_token(
        &self,
        verb: Verb,
        path: &str,
        params: &Params,
        access_token: Option<&str>,
    ) -> Result<Value, BridgeError> {
        let mut params = params.clone();
        params.insert("clientId".into(), self.credentials.client_id.clone().into());
        if let Some(token) = access_token {
            params.insert("accessToken".into(), token.to_string().into());
        }

        self.transport.send(&ApiRequest::new(verb, path, params)).await
    }

    /// Mint a new access token, or pick up the one a concurrent caller just
    /// minted while we waited for the refresh lock.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, BridgeError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.tokens.access_token().await {
            if stale != Some(current.as_str()) {
                debug!("Access token already refreshed by another call");
                return Ok(current);
            }
        }

        let refresh_token = self.tokens.refresh_token().await.ok_or_else(|| {
            BridgeError::AuthRefreshFailed("no refresh token available".to_string())
        })?;

        let body = self.authenticate(&refresh_token, GrantType::RefreshToken).await?;
        match body.get("access_token").and_then(Value::as_str) {
            Some(token) => Ok(token.to_string()),
            None => Err(BridgeError::AuthRefreshFailed(format!(
                "refresh grant rejected (errcode {:?})",
                errcode(&body)
            ))),
        }
    }
}

/// Application error code embedded in a response body, if any
pub fn errcode(body: &Value) -> Option<i64> {
    body.get("errcode").and_then(Value::as_i64)
}
