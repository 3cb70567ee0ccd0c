//! Credential validation for first-time setup and daemon startup

use tracing::{error, info};

use crate::errors::BridgeError;
use crate::http::client::{errcode, ApiClient, GrantType};

/// Log in with the account password and return the refresh token to store
pub async fn login(client: &ApiClient, password: &str) -> Result<String, BridgeError> {
    let body = client.authenticate(password, GrantType::Password).await?;

    match body.get("refresh_token").and_then(|v| v.as_str()) {
        Some(token) => Ok(token.to_string()),
        None => {
            error!("Password login rejected (errcode {:?})", errcode(&body));
            Err(BridgeError::AuthError(rejection_message(&body)))
        }
    }
}

/// Resume a session from a stored refresh token
pub async fn resume(client: &ApiClient, refresh_token: &str) -> Result<(), BridgeError> {
    if refresh_token.is_empty() {
        return Err(BridgeError::AuthError(
            "No refresh token stored, run with --login first".to_string(),
        ));
    }

    let body = client.authenticate(refresh_token, GrantType::RefreshToken).await?;
    if body.get("access_token").is_none() {
        error!("Stored refresh token rejected (errcode {:?})", errcode(&body));
        return Err(BridgeError::AuthError("Invalid credentials".to_string()));
    }

    info!("Session resumed from stored refresh token");
    Ok(())
}

fn rejection_message(body: &serde_json::Value) -> String {
    body.get("errmsg")
        .and_then(|v| v.as_str())
        .unwrap_or("Invalid credentials")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authn::credentials::Credentials;
    use crate::http::scripted::ScriptedTransport;
    use serde_json::json;

    fn client(transport: &ScriptedTransport) -> ApiClient {
        let creds = Credentials::new("https://euapi.ttlock.com", "cid", "csecret", "alice");
        ApiClient::with_transport(creds, transport.clone())
    }

    #[tokio::test]
    async fn test_login_returns_refresh_token() {
        let transport = ScriptedTransport::new();
        transport.reply(json!({"access_token": "a1", "refresh_token": "r1"}));

        let token = login(&client(&transport), "pw").await.unwrap();
        assert_eq!(token, "r1");
    }

    #[tokio::test]
    async fn test_login_rejection_is_an_error() {
        let transport = ScriptedTransport::new();
        transport.reply(json!({"errcode": 10007, "errmsg": "invalid account or invalid password"}));

        let err = login(&client(&transport), "bad").await.unwrap_err();
        match err {
            BridgeError::AuthError(message) => assert!(message.contains("invalid password")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resume_requires_access_token() {
        let transport = ScriptedTransport::new();
        transport.reply(json!({"errcode": 10004}));

        let err = resume(&client(&transport), "r-old").await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_resume_without_token_skips_network() {
        let transport = ScriptedTransport::new();

        assert!(resume(&client(&transport), "").await.is_err());
        assert!(transport.requests().is_empty());
    }
}
