//! Software presence sensor for development and testing.
//!
//! Behaves like a driver: it accepts configuration, raises the handoff from
//! its own timer task and reports the latest presence value when the worker
//! asks it to process the pending event.

use super::{DetectionCallback, PresenceSensor};
use crate::detection::DetectionHandoff;
use crate::error::SensorError;
use crate::profile::Parameter;
use log::{debug, info};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// Simulated presence sensor.
pub struct SimulatedSensor {
    running: AtomicBool,
    range: AtomicU16,
    sensitivity: AtomicU8,
    timeout: AtomicU16,
    /// Latest raw presence value, overwritten by every new reading.
    presence: AtomicU8,
    handoff: RwLock<Option<DetectionHandoff>>,
    on_detection: RwLock<Option<DetectionCallback>>,
}

impl SimulatedSensor {
    pub fn new(range: u16, sensitivity: u8, timeout_ms: u16) -> Self {
        Self {
            running: AtomicBool::new(false),
            range: AtomicU16::new(range),
            sensitivity: AtomicU8::new(sensitivity),
            timeout: AtomicU16::new(timeout_ms),
            presence: AtomicU8::new(0),
            handoff: RwLock::new(None),
            on_detection: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Record a reading and wake the worker. Ignored while stopped.
    pub fn inject(&self, presence: u8) {
        if !self.is_running() {
            return;
        }
        self.presence.store(presence, Ordering::SeqCst);
        if let Some(handoff) = self.handoff.read().as_ref() {
            handoff.raise();
        }
    }
}

impl PresenceSensor for SimulatedSensor {
    fn init(&self, handoff: DetectionHandoff, on_detection: DetectionCallback) {
        *self.handoff.write() = Some(handoff);
        *self.on_detection.write() = Some(on_detection);
    }

    fn start(&self) -> Result<(), SensorError> {
        if self.on_detection.read().is_none() {
            return Err(SensorError::NotInitialized);
        }
        self.running.store(true, Ordering::SeqCst);
        info!(
            "[Sim] sensor running (range {} cm, sensitivity {}, timeout {} ms)",
            self.get_range(),
            self.get_sensitivity(),
            self.get_timeout()
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        self.running.store(false, Ordering::SeqCst);
        info!("[Sim] sensor idle");
        Ok(())
    }

    fn set_range(&self, range: u16) -> Result<(), SensorError> {
        if self.is_running() {
            return Err(SensorError::Rejected {
                parameter: Parameter::Range,
                value: range,
            });
        }
        self.range.store(range, Ordering::SeqCst);
        Ok(())
    }

    fn set_sensitivity(&self, sensitivity: u8) -> Result<(), SensorError> {
        if self.is_running() {
            return Err(SensorError::Rejected {
                parameter: Parameter::Sensitivity,
                value: u16::from(sensitivity),
            });
        }
        self.sensitivity.store(sensitivity, Ordering::SeqCst);
        Ok(())
    }

    fn set_timeout(&self, timeout_ms: u16) -> Result<(), SensorError> {
        self.timeout.store(timeout_ms, Ordering::SeqCst);
        Ok(())
    }

    fn get_range(&self) -> u16 {
        self.range.load(Ordering::SeqCst)
    }

    fn get_sensitivity(&self) -> u8 {
        self.sensitivity.load(Ordering::SeqCst)
    }

    fn get_timeout(&self) -> u16 {
        self.timeout.load(Ordering::SeqCst)
    }

    fn process_pending_event(&self) {
        let presence = self.presence.load(Ordering::SeqCst);
        let callback = self.on_detection.read().clone();
        if let Some(callback) = callback {
            callback(presence);
        }
    }
}

/// Spawn a task that feeds random presence readings into the sensor.
///
/// Readings are taken every `period`; presence flips with a probability that
/// grows with the configured sensitivity. Returns a handle to abort the task.
pub fn run_presence_simulation(sensor: Arc<SimulatedSensor>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        let mut presence = 0u8;
        loop {
            interval.tick().await;
            if !sensor.is_running() {
                continue;
            }
            let flip_chance = (f64::from(sensor.get_sensitivity()) / 8.0).min(1.0);
            if rand::thread_rng().gen_bool(flip_chance) {
                presence ^= 1;
            }
            debug!("[Sim] reading presence = {}", presence);
            sensor.inject(presence);
        }
    })
}
