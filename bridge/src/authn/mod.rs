//! Authentication: credentials, token storage and the login flow

pub mod credentials;
pub mod login;
pub mod token_store;
