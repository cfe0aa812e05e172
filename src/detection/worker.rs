//! Dedicated worker task for sensor I/O.
//!
//! Consumes detection wake-ups from the handoff and commands queued by the
//! stack context. Everything that may block on the driver happens here,
//! never in the stack context, and every detection value reaches the
//! debouncer from this task only.

use super::DetectionHandoff;
use crate::profile::Parameter;
use crate::sensor::SensorControl;
use embassy_futures::select::{Either, select};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work queued for the sensor by the stack context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorCommand {
    /// Start sensing; failures are recorded in [`SensorControl::fault`].
    Start,
    Stop,
    /// Push a newly stored parameter value to the driver.
    Apply(Parameter, u16),
    /// Detection value pushed by the application instead of the driver.
    Detection(u8),
}

/// Sending half used by the protocol binding.
pub type CommandSender = mpsc::UnboundedSender<SensorCommand>;

#[derive(Debug, Eq, PartialEq)]
enum WorkerEvent {
    Detection,
    Command(SensorCommand),
    Closed,
}

/// Consumer side of the event marshaler.
pub struct SensorWorker {
    handoff: DetectionHandoff,
    commands: mpsc::UnboundedReceiver<SensorCommand>,
    control: Arc<SensorControl>,
}

impl SensorWorker {
    /// Create a worker and the sender feeding its command queue.
    pub fn new(handoff: DetectionHandoff, control: Arc<SensorControl>) -> (Self, CommandSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            handoff,
            commands: rx,
            control,
        };
        (worker, tx)
    }

    async fn next_event(&mut self) -> WorkerEvent {
        match select(self.handoff.wait(), self.commands.recv()).await {
            Either::First(()) => WorkerEvent::Detection,
            Either::Second(Some(command)) => WorkerEvent::Command(command),
            Either::Second(None) => WorkerEvent::Closed,
        }
    }

    fn handle(&self, event: &WorkerEvent) {
        match event {
            WorkerEvent::Detection => {
                debug!("[Detection] processing pending sensor event");
                self.control.process_pending_event();
            }
            WorkerEvent::Command(SensorCommand::Start) => {
                if let Err(e) = self.control.start() {
                    error!("[Sensor] failed to start: {}", e);
                }
            }
            WorkerEvent::Command(SensorCommand::Stop) => {
                if let Err(e) = self.control.stop() {
                    error!("[Sensor] failed to stop: {}", e);
                }
            }
            WorkerEvent::Command(SensorCommand::Apply(id, value)) => {
                self.control.apply_logged(*id, *value);
            }
            WorkerEvent::Command(SensorCommand::Detection(raw)) => {
                self.control.report_detection(*raw);
            }
            WorkerEvent::Closed => {}
        }
    }

    /// Wait for and handle one event. Returns `false` once the command
    /// queue has closed.
    pub async fn step(&mut self) -> bool {
        let event = self.next_event().await;
        self.handle(&event);
        event != WorkerEvent::Closed
    }

    /// Handle everything already queued without waiting.
    ///
    /// Commands are drained first, then a pending detection if any.
    /// Returns the number of events handled.
    pub fn process_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.handle(&WorkerEvent::Command(command));
            handled += 1;
        }
        if self.handoff.try_take() {
            self.handle(&WorkerEvent::Detection);
            handled += 1;
        }
        handled
    }

    pub async fn run(mut self) {
        info!("[Detection] worker started");
        while self.step().await {}
        info!("[Detection] command queue closed, worker exiting");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
