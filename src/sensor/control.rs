//! Sensor control facade.
//!
//! Turns parameter changes into driver calls. Range and Sensitivity need a
//! full stop/set/start cycle because the driver's internal state depends on
//! them; Timeout only changes the hold duration and is pushed directly.
//!
//! Every driver call is made from the worker task. The stack context only
//! reads the lock-free status ([`SensorControl::is_running`],
//! [`SensorControl::fault`]).

use super::{DetectionCallback, PresenceSensor};
use crate::detection::DetectionHandoff;
use crate::error::SensorError;
use crate::profile::Parameter;
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Serializes driver access and publishes the sensor's status.
///
/// Tracks whether the sensor is running so a reconfiguration never restarts
/// a sensor that the connection lifecycle has stopped.
pub struct SensorControl {
    sensor: Arc<dyn PresenceSensor>,
    /// Held for the whole of a driver call sequence.
    driver: Mutex<()>,
    running: AtomicBool,
    /// Last driver failure, cleared by the next successful start.
    fault: Mutex<Option<SensorError>>,
    on_detection: RwLock<Option<DetectionCallback>>,
}

impl SensorControl {
    pub fn new(sensor: Arc<dyn PresenceSensor>) -> Self {
        Self {
            sensor,
            driver: Mutex::new(()),
            running: AtomicBool::new(false),
            fault: Mutex::new(None),
            on_detection: RwLock::new(None),
        }
    }

    pub fn init(&self, handoff: DetectionHandoff, on_detection: DetectionCallback) {
        *self.on_detection.write() = Some(on_detection.clone());
        self.sensor.init(handoff, on_detection);
    }

    /// Whether the sensor was last left running. Never blocks.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Last driver failure, if the sensor has not started cleanly since.
    pub fn fault(&self) -> Option<SensorError> {
        self.fault.lock().clone()
    }

    fn record(&self, result: Result<(), SensorError>) -> Result<(), SensorError> {
        if let Err(e) = &result {
            *self.fault.lock() = Some(e.clone());
        }
        result
    }

    pub fn start(&self) -> Result<(), SensorError> {
        let _driver = self.driver.lock();
        if self.is_running() {
            return Ok(());
        }
        self.record(self.sensor.start())?;
        self.running.store(true, Ordering::SeqCst);
        *self.fault.lock() = None;
        info!("[Sensor] started");
        Ok(())
    }

    pub fn stop(&self) -> Result<(), SensorError> {
        let _driver = self.driver.lock();
        if !self.is_running() {
            return Ok(());
        }
        // Treat the sensor as stopped even if the driver complains.
        self.running.store(false, Ordering::SeqCst);
        self.record(self.sensor.stop())?;
        info!("[Sensor] stopped");
        Ok(())
    }

    /// Push a stored parameter value to the driver.
    ///
    /// On failure the sensor is left stopped.
    pub fn apply(&self, id: Parameter, value: u16) -> Result<(), SensorError> {
        let _driver = self.driver.lock();
        let result = self.apply_locked(id, value);
        self.record(result)
    }

    fn apply_locked(&self, id: Parameter, value: u16) -> Result<(), SensorError> {
        match id {
            Parameter::Range | Parameter::Sensitivity => {
                let restart = self.is_running();
                if restart {
                    self.running.store(false, Ordering::SeqCst);
                    self.sensor.stop()?;
                }

                match id {
                    Parameter::Range => self.sensor.set_range(value)?,
                    _ => {
                        let sensitivity = u8::try_from(value).map_err(|_| {
                            SensorError::Rejected {
                                parameter: id,
                                value,
                            }
                        })?;
                        self.sensor.set_sensitivity(sensitivity)?
                    }
                }

                if restart {
                    self.sensor.start()?;
                    self.running.store(true, Ordering::SeqCst);
                }
                debug!("[Sensor] {:?} = {} applied (restart: {})", id, value, restart);
                Ok(())
            }
            Parameter::Timeout => {
                self.sensor.set_timeout(value)?;
                debug!("[Sensor] Timeout = {} applied", value);
                Ok(())
            }
            // Derived output, never pushed to the driver.
            Parameter::Detection => Ok(()),
        }
    }

    /// Apply and log instead of returning the failure.
    pub fn apply_logged(&self, id: Parameter, value: u16) {
        if let Err(e) = self.apply(id, value) {
            error!("[Sensor] Failed to apply {:?} = {}: {}", id, value, e);
        }
    }

    /// Current driver-side value of a configurable parameter.
    pub fn read_back(&self, id: Parameter) -> Option<u16> {
        match id {
            Parameter::Range => Some(self.sensor.get_range()),
            Parameter::Sensitivity => Some(u16::from(self.sensor.get_sensitivity())),
            Parameter::Timeout => Some(self.sensor.get_timeout()),
            Parameter::Detection => None,
        }
    }

    pub fn process_pending_event(&self) {
        self.sensor.process_pending_event();
    }

    /// Deliver a detection value through the registered callback, as if the
    /// driver had reported it.
    pub fn report_detection(&self, raw: u8) {
        let callback = self.on_detection.read().clone();
        match callback {
            Some(callback) => callback(raw),
            None => debug!("[Sensor] detection {} dropped, not initialized", raw),
        }
    }
}
