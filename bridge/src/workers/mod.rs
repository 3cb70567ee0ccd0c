//! Background workers

pub mod poller;
pub mod token_persist;
