//! TTLock cloud API client

pub mod client;
pub mod locks;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod transport;
