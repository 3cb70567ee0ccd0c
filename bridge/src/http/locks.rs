//! Lock API operations

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use ttlock_models::{ApiStatus, LockRecord, LockSummary, OpenState, PagedList};

use crate::errors::BridgeError;
use crate::http::client::ApiClient;
use crate::http::transport::{Params, Verb};
use crate::records::decode_records;
use crate::utils::now_millis;

const LOCK_LIST_PAGE_SIZE: i64 = 1000;
const RECORD_LIST_PAGE_SIZE: i64 = 100;

impl ApiClient {
    /// All locks of the account (first page only). Entries that do not decode
    /// are dropped.
    pub async fn list_locks(&self) -> Result<Vec<LockSummary>, BridgeError> {
        let mut params = stamped();
        params.insert("pageNo".into(), 1.into());
        params.insert("pageSize".into(), LOCK_LIST_PAGE_SIZE.into());

        let body = self.authenticated_call(Verb::Get, "/v3/lock/list", params).await?;
        let page: PagedList<Value> = decode(body)?;
        let locks = decode_locks(&page.list);
        debug!("Listed {} locks", locks.len());
        Ok(locks)
    }

    /// Current open state as reported by the gateway or WiFi lock
    pub async fn query_open_state(&self, lock_id: i64) -> Result<OpenState, BridgeError> {
        let params = stamped_for_lock(lock_id);
        let body = self
            .authenticated_call(Verb::Get, "/v3/lock/queryOpenState", params)
            .await?;
        decode(body)
    }

    /// Latest access records of a lock (first page only). Malformed records
    /// are skipped.
    pub async fn list_lock_records(&self, lock_id: i64) -> Result<Vec<LockRecord>, BridgeError> {
        let mut params = stamped_for_lock(lock_id);
        params.insert("pageNo".into(), 1.into());
        params.insert("pageSize".into(), RECORD_LIST_PAGE_SIZE.into());

        let body = self
            .authenticated_call(Verb::Get, "/v3/lockRecord/list", params)
            .await?;
        let page: PagedList<Value> = decode(body)?;
        Ok(decode_records(&page.list))
    }

    /// Lock remotely via gateway or WiFi lock
    pub async fn lock(&self, lock_id: i64) -> Result<Value, BridgeError> {
        info!("Locking lock {}", lock_id);
        let body = self
            .authenticated_call(Verb::Post, "/v3/lock/lock", stamped_for_lock(lock_id))
            .await?;
        check_status(&body)?;
        Ok(body)
    }

    /// Unlock remotely via gateway or WiFi lock
    pub async fn unlock(&self, lock_id: i64) -> Result<Value, BridgeError> {
        info!("Unlocking lock {}", lock_id);
        let body = self
            .authenticated_call(Verb::Post, "/v3/lock/unlock", stamped_for_lock(lock_id))
            .await?;
        check_status(&body)?;
        Ok(body)
    }
}

fn stamped() -> Params {
    let mut params = Params::new();
    params.insert("date".into(), now_millis().into());
    params
}

fn stamped_for_lock(lock_id: i64) -> Params {
    let mut params = stamped();
    params.insert("lockId".into(), lock_id.into());
    params
}

fn decode_locks(values: &[Value]) -> Vec<LockSummary> {
    values
        .iter()
        .filter_map(|value| match LockSummary::deserialize(value) {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!("Dropping malformed lock entry: {}", e);
                None
            }
        })
        .collect()
}

/// Raise the embedded application error, if any
pub fn check_status(body: &Value) -> Result<(), BridgeError> {
    let status = ApiStatus::deserialize(body).unwrap_or_default();
    match status.errcode {
        Some(code) if code != 0 => Err(BridgeError::Api {
            code,
            message: status.errmsg.unwrap_or_else(|| "TTLock error".to_string()),
        }),
        _ => Ok(()),
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, BridgeError> {
    check_status(&body)?;
    Ok(serde_json::from_value(body)?)
}
