//! Lock state reconciliation from access records
//!
//! The vendor does not guarantee any ordering of the records it returns, and
//! the list is full of entries that say nothing about the bolt (door sensor,
//! tamper alerts, failed attempts). The latest successful record that is a
//! lock or unlock decides the state.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ttlock_models::{LockRecord, LockState};

use crate::records::classify::{classify, RecordAction};

/// Derived lock state and the actor who caused it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub state: LockState,
    /// Empty when the state is unknown
    pub changed_by: String,
}

impl Reconciliation {
    pub fn new(state: LockState, changed_by: impl Into<String>) -> Self {
        Self {
            state,
            changed_by: changed_by.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Reconcile records that are already known to belong to a single lock
pub fn reconcile<'a, I>(records: I) -> Reconciliation
where
    I: IntoIterator<Item = &'a LockRecord>,
{
    let mut successful: Vec<&LockRecord> = records.into_iter().filter(|r| r.success == 1).collect();

    // sort_by is stable, equal timestamps keep their input order
    successful.sort_by(|a, b| b.lock_date.cmp(&a.lock_date));

    for record in successful {
        match classify(record.record_type) {
            RecordAction::Unlock => return Reconciliation::new(LockState::Unlocked, &record.username),
            RecordAction::Lock => return Reconciliation::new(LockState::Locked, &record.username),
            RecordAction::Other => continue,
        }
    }

    Reconciliation::unknown()
}

/// Reconcile only the records of `lock_id`
pub fn reconcile_for_lock<'a, I>(lock_id: i64, records: I) -> Reconciliation
where
    I: IntoIterator<Item = &'a LockRecord>,
{
    reconcile(records.into_iter().filter(|r| r.lock_id == lock_id))
}

/// Reconcile raw JSON records, skipping entries that do not decode
pub fn reconcile_values(values: &[serde_json::Value]) -> Reconciliation {
    let records = decode_records(values);
    reconcile(&records)
}

/// Reconcile raw JSON records of `lock_id`, skipping entries that do not decode
pub fn reconcile_values_for_lock(lock_id: i64, values: &[serde_json::Value]) -> Reconciliation {
    let records = decode_records(values);
    reconcile_for_lock(lock_id, &records)
}

/// Decode raw JSON records, skipping entries that do not decode
pub fn decode_records(values: &[serde_json::Value]) -> Vec<LockRecord> {
    values
        .iter()
        .filter_map(|value| match LockRecord::deserialize(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping malformed lock record: {}", e);
                None
            }
        })
        .collect()
}
