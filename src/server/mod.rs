// src/server/mod.rs

//! Backing server process and browser reload channel.

pub mod bridge;
pub mod reload;

pub use bridge::{BridgeEvent, BridgeState, DevServerBridge, SERVER_PORT_ENV};
pub use reload::{ReloadHub, is_disconnect};
