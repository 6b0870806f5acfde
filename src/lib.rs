mod coerce;
pub mod config;
pub mod controller;
mod error;
pub mod logging;
pub mod page;
pub mod protocol;
pub mod store;
pub mod web;

pub use coerce::{parse_int, value_to_int};
pub use config::BridgeConfig;
pub use controller::{BridgeEvent, CloseOutcome, EventForwarder, SyncController, SyncOptions, SyncState};
pub use error::BridgeError;
