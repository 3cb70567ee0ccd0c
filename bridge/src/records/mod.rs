//! Lock record taxonomy and state reconciliation

pub mod classify;
pub mod reconcile;

pub use classify::{classify, describe, RecordAction};
pub use reconcile::{
    decode_records, reconcile, reconcile_for_lock, reconcile_values, reconcile_values_for_lock, Reconciliation,
};
