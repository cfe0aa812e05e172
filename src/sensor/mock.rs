//! Recording sensor driver for tests.

use super::{DetectionCallback, PresenceSensor};
use crate::detection::DetectionHandoff;
use crate::error::SensorError;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Call {
    Start,
    Stop,
    SetRange(u16),
    SetSensitivity(u8),
    SetTimeout(u16),
    Process,
}

/// Driver double that records every control call.
pub struct RecordingSensor {
    calls: Mutex<Vec<Call>>,
    fail_start: AtomicBool,
    reconfigure_delay_ms: AtomicU64,
    range: AtomicU16,
    sensitivity: AtomicU8,
    timeout: AtomicU16,
    pending: AtomicU8,
    handoff: RwLock<Option<DetectionHandoff>>,
    on_detection: RwLock<Option<DetectionCallback>>,
}

impl RecordingSensor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_start: AtomicBool::new(false),
            reconfigure_delay_ms: AtomicU64::new(0),
            range: AtomicU16::new(150),
            sensitivity: AtomicU8::new(3),
            timeout: AtomicU16::new(10_000),
            pending: AtomicU8::new(0),
            handoff: RwLock::new(None),
            on_detection: RwLock::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Calls other than event processing.
    pub fn control_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| *c != Call::Process)
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make range and sensitivity changes block like a slow front end.
    pub fn delay_reconfiguration(&self, delay: Duration) {
        self.reconfigure_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn reconfigure_pause(&self) {
        let ms = self.reconfigure_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.on_detection.read().is_some()
    }

    /// Report a detection from the driver's own context.
    pub fn emit(&self, raw: u8) {
        self.pending.store(raw, Ordering::SeqCst);
        if let Some(handoff) = self.handoff.read().as_ref() {
            handoff.raise();
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl PresenceSensor for RecordingSensor {
    fn init(&self, handoff: DetectionHandoff, on_detection: DetectionCallback) {
        *self.handoff.write() = Some(handoff);
        *self.on_detection.write() = Some(on_detection);
    }

    fn start(&self) -> Result<(), SensorError> {
        self.record(Call::Start);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(SensorError::StartFailed("injected failure".into()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        self.record(Call::Stop);
        Ok(())
    }

    fn set_range(&self, range: u16) -> Result<(), SensorError> {
        self.record(Call::SetRange(range));
        self.reconfigure_pause();
        self.range.store(range, Ordering::SeqCst);
        Ok(())
    }

    fn set_sensitivity(&self, sensitivity: u8) -> Result<(), SensorError> {
        self.record(Call::SetSensitivity(sensitivity));
        self.reconfigure_pause();
        self.sensitivity.store(sensitivity, Ordering::SeqCst);
        Ok(())
    }

    fn set_timeout(&self, timeout_ms: u16) -> Result<(), SensorError> {
        self.record(Call::SetTimeout(timeout_ms));
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
        self.record(Call::Process);
        let raw = self.pending.load(Ordering::SeqCst);
        if let Some(callback) = self.on_detection.read().as_ref() {
            callback(raw);
        }
    }
}
