//! Presence Bridge library.
//!
//! Exposes a presence sensor to BLE peers through the proximity GATT service:
//! one notifiable Detection characteristic and three writable configuration
//! characteristics (Range, Sensitivity, Timeout).

pub mod bridge;
pub mod config;
pub mod detection;
pub mod error;
pub mod lifecycle;
pub mod profile;
pub mod sensor;

pub use bridge::PresenceBridge;
pub use error::{BridgeError, Result};
