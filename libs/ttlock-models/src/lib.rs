//! TTLock cloud API models
//!
//! Plain serde types for the payloads exchanged with the vendor API. No
//! behavior lives here apart from the integer mapping of [`LockState`].

use serde::{Deserialize, Serialize};

/// Application error code the vendor uses for an expired or invalid access token
pub const TOKEN_INVALID_ERRCODE: i64 = 10003;

/// One historical access-log entry reported for a lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub lock_id: i64,
    pub record_type: i64,
    /// Epoch milliseconds
    pub lock_date: i64,
    #[serde(default)]
    pub username: String,
    pub success: i64,
}

/// Metadata snapshot of one lock, as returned by the lock listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSummary {
    pub lock_id: i64,
    #[serde(default)]
    pub lock_mac: String,
    #[serde(default)]
    pub lock_name: String,
    #[serde(default)]
    pub lock_alias: String,
    /// Battery level, 0-100
    #[serde(default)]
    pub electric_quantity: i64,

    /// Fields we do not model are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response of the open-state query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenState {
    pub state: i64,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OpenState {
    pub fn lock_state(&self) -> LockState {
        LockState::from_code(self.state)
    }
}

/// Paged list envelope used by the listing endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub page_no: Option<i64>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// Body of a successful `/oauth2/token` call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Read each field on its own, so one mistyped field does not hide the tokens
    pub fn from_body(body: &serde_json::Value) -> Self {
        let text = |key: &str| body.get(key).and_then(serde_json::Value::as_str).map(str::to_string);
        let number = |key: &str| body.get(key).and_then(serde_json::Value::as_i64);

        Self {
            access_token: text("access_token"),
            refresh_token: text("refresh_token"),
            uid: number("uid"),
            expires_in: number("expires_in"),
        }
    }
}

/// `{errcode, errmsg}` pair the API embeds in any response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

/// Physical state of a lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LockState {
    Locked,
    Unlocked,
    #[default]
    Unknown,
}

impl LockState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LockState::Locked,
            1 => LockState::Unlocked,
            _ => LockState::Unknown,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            LockState::Locked => 0,
            LockState::Unlocked => 1,
            LockState::Unknown => 2,
        }
    }
}

impl Serialize for LockState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for LockState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = i64::deserialize(deserializer)?;
        Ok(LockState::from_code(code))
    }
}
