//! lockbridge library
//!
//! TTLock cloud client with transparent token refresh, and lock state
//! reconciliation from access records.

pub mod app;
pub mod authn;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod records;
pub mod server;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod workers;

pub use ttlock_models as models;
