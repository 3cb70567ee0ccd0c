//! Cloud account credentials

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Credentials of one TTLock open-platform application and user
pub struct Credentials {
    /// Base URL of the regional API server
    pub server_url: String,

    /// Open-platform application id
    pub client_id: String,

    client_secret: SecretString,
    username: String,
}

impl Credentials {
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            username: username.into(),
        }
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

// Only the non-sensitive fields are printable
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_url", &self.server_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("https://euapi.ttlock.com/", "cid", "hunter2", "alice@example.com");
        let printed = format!("{:?}", creds);

        assert!(printed.contains("cid"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("alice@example.com"));
        assert_eq!(creds.server_url, "https://euapi.ttlock.com");
        assert_eq!(creds.client_secret(), "hunter2");
    }
}
