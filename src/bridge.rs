//! Assembles the presence bridge from a driver and a stack binding.
//!
//! ```text
//! peer ──read/write──▶ ProximityService ──SensorCommand──▶ SensorWorker ──▶ PresenceSensor
//!  ▲                         │                                 ▲                 │
//!  └──────notify─────────────┘◀── on_detection ────────────────┴─── handoff ◀────┘
//! ```

use crate::config::Config;
use crate::detection::{DetectionHandoff, HandoffSignal, SensorWorker};
use crate::error::Result;
use crate::profile::{AttributeServer, ParameterStore, ProximityService};
use crate::sensor::{PresenceSensor, SensorControl};
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct PresenceBridge {
    service: Arc<ProximityService>,
    worker: Option<SensorWorker>,
}

impl PresenceBridge {
    /// Wire the service, the worker and the driver together and register
    /// the service with the stack.
    ///
    /// `signal` is the handoff the driver raises; it must outlive the bridge.
    pub fn build(
        config: &Config,
        sensor: Arc<dyn PresenceSensor>,
        server: Arc<dyn AttributeServer>,
        signal: &'static HandoffSignal,
    ) -> Result<Self> {
        let handoff = DetectionHandoff::new(signal);
        let control = Arc::new(SensorControl::new(sensor));
        let (worker, commands) = SensorWorker::new(handoff, control.clone());

        let service = ProximityService::new(
            server,
            control,
            commands,
            Arc::new(ParameterStore::new()),
            config.link.max_peers,
        );
        service.start(handoff)?;
        info!(
            "[Bridge] ready, accepting up to {} peer(s)",
            config.link.max_peers
        );

        Ok(Self {
            service,
            worker: Some(worker),
        })
    }

    pub fn service(&self) -> &Arc<ProximityService> {
        &self.service
    }

    /// Start the worker task. Returns `None` if already spawned.
    pub fn spawn_worker(&mut self) -> Option<JoinHandle<()>> {
        self.worker.take().map(SensorWorker::spawn)
    }

    /// Worker for callers that drive it themselves.
    pub fn take_worker(&mut self) -> Option<SensorWorker> {
        self.worker.take()
    }
}
