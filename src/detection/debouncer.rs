//! Detection debouncing.
//!
//! Only a change from the last published value produces a notification.
//! The last published value starts at 0 ("absent"), so the first real
//! detection after boot is always reported.

use crate::profile::{Parameter, ParameterStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// A detection value to broadcast to subscribed peers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Notification {
    pub value: u8,
}

impl Notification {
    pub fn payload(&self) -> [u8; 1] {
        [self.value]
    }

    pub fn is_present(&self) -> bool {
        self.value != 0
    }
}

/// Tracks the last published detection value and mirrors it into the store.
pub struct DetectionDebouncer {
    store: Arc<ParameterStore>,
    last_published: AtomicU8,
}

impl DetectionDebouncer {
    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self {
            store,
            last_published: AtomicU8::new(0),
        }
    }

    /// Feed a raw observation; returns the notification to send, if any.
    ///
    /// On change the store's Detection value is updated before returning.
    pub fn observe(&self, raw: u8) -> Option<Notification> {
        let previous = self.last_published.swap(raw, Ordering::SeqCst);
        if previous == raw {
            return None;
        }
        // Detection accepts the full u8 range, so this cannot be rejected.
        let _ = self.store.set(Parameter::Detection, u16::from(raw));
        Some(Notification { value: raw })
    }
}
