//! Single-slot handoff from the sensor's native context to the worker task.
//!
//! The sensor driver raises the handoff from whatever context it reports
//! from (interrupt, driver thread, timer). Raising is non-blocking and never
//! touches protocol state. The worker task is the only waiter.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Signal type backing a [`DetectionHandoff`].
pub type HandoffSignal = Signal<CriticalSectionRawMutex, ()>;

/// Wakes the detection worker when the sensor has a pending event.
///
/// The underlying signal holds at most one pending wake-up: several raises
/// before the worker runs collapse into one, and the worker then processes
/// whatever the driver holds as its latest value.
///
/// # Usage
/// ```ignore
/// static HANDOFF: HandoffSignal = HandoffSignal::new();
/// let handoff = DetectionHandoff::new(&HANDOFF);
///
/// // Sensor context:
/// handoff.raise();
///
/// // Worker task:
/// handoff.wait().await;
/// ```
#[derive(Clone, Copy)]
pub struct DetectionHandoff {
    signal: &'static HandoffSignal,
}

impl DetectionHandoff {
    pub fn new(signal: &'static HandoffSignal) -> Self {
        Self { signal }
    }

    /// Mark an event as pending. Safe to call from any context.
    pub fn raise(&self) {
        self.signal.signal(());
    }

    /// Block until an event is pending, consuming it.
    pub async fn wait(&self) {
        self.signal.wait().await
    }

    /// Consume a pending event without waiting.
    pub fn try_take(&self) -> bool {
        self.signal.try_take().is_some()
    }

    /// Whether an event is pending and not yet consumed.
    pub fn is_pending(&self) -> bool {
        self.signal.signaled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handoff() -> DetectionHandoff {
        DetectionHandoff::new(Box::leak(Box::new(HandoffSignal::new())))
    }

    #[test]
    fn test_raises_coalesce() {
        let handoff = handoff();
        assert!(!handoff.is_pending());

        handoff.raise();
        handoff.raise();
        handoff.raise();
        assert!(handoff.is_pending());

        tokio_test::block_on(handoff.wait());
        assert!(!handoff.is_pending());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_raise() {
        let handoff = handoff();
        let waiter = tokio::spawn(async move { handoff.wait().await });

        tokio::task::yield_now().await;
        handoff.raise();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
    }
}
