//! Proximity GATT profile: parameter table, store, validation and the
//! service binding that answers peer requests.

#[cfg(test)]
pub mod mock;
pub mod parameter;
pub mod server;
pub mod service;
pub mod store;
pub mod subscriptions;
pub mod validator;

pub use parameter::Parameter;
pub use server::{AttributeServer, LoggingAttributeServer};
pub use service::{AttributeRef, ProximityService, SERVICE_UUID};
pub use store::ParameterStore;
