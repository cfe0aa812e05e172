//! Presence sensor driver interface.
//!
//! The driver (radar front end, signal processing) lives outside this crate.
//! The bridge only sees the narrow control surface below plus the detection
//! callback it registers through [`PresenceSensor::init`].

pub mod control;
#[cfg(test)]
pub mod mock;
pub mod simulated;

pub use control::SensorControl;
pub use simulated::SimulatedSensor;

use crate::detection::DetectionHandoff;
use crate::error::SensorError;
use std::sync::Arc;

/// Callback invoked with the raw detection byte once the driver has
/// processed a pending event.
pub type DetectionCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Control surface of a presence sensor driver.
///
/// Implementations use interior mutability: the trait is shared between the
/// protocol stack context and the detection worker.
///
/// # Event flow
/// 1. The driver raises the `handoff` from its own context when data is ready.
/// 2. The worker wakes and calls [`PresenceSensor::process_pending_event`].
/// 3. The driver computes the detection value and calls `on_detection` from
///    the worker's context.
pub trait PresenceSensor: Send + Sync + 'static {
    /// Register the handoff to raise and the callback to report through.
    fn init(&self, handoff: DetectionHandoff, on_detection: DetectionCallback);

    fn start(&self) -> Result<(), SensorError>;

    fn stop(&self) -> Result<(), SensorError>;

    fn set_range(&self, range: u16) -> Result<(), SensorError>;

    fn set_sensitivity(&self, sensitivity: u8) -> Result<(), SensorError>;

    /// Presence hold time in milliseconds.
    fn set_timeout(&self, timeout_ms: u16) -> Result<(), SensorError>;

    fn get_range(&self) -> u16;

    fn get_sensitivity(&self) -> u8;

    fn get_timeout(&self) -> u16;

    /// Process the event announced through the handoff.
    ///
    /// Called from the worker task only.
    fn process_pending_event(&self);
}
