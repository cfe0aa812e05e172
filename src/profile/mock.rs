//! Recording stack binding for tests.

use super::server::{AttributeServer, ServiceDefinition};
use super::subscriptions::ConnHandle;
use crate::error::StackError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentNotification {
    pub conn: ConnHandle,
    pub handle: u16,
    pub value: Vec<u8>,
}

pub struct RecordingServer {
    first_handle: u16,
    sent: Mutex<Vec<SentNotification>>,
    exhausted: AtomicBool,
}

impl RecordingServer {
    pub fn new(first_handle: u16) -> Self {
        Self {
            first_handle,
            sent: Mutex::new(Vec::new()),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    /// Make every notification fail as if no buffer were available.
    pub fn exhaust(&self, exhausted: bool) {
        self.exhausted.store(exhausted, Ordering::SeqCst);
    }
}

impl AttributeServer for RecordingServer {
    fn register_service(&self, _service: &ServiceDefinition) -> Result<u16, StackError> {
        Ok(self.first_handle)
    }

    fn notify(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> Result<(), StackError> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(StackError::ResourceExhaustion);
        }
        self.sent.lock().push(SentNotification {
            conn,
            handle,
            value: value.to_vec(),
        });
        Ok(())
    }
}
