//! Connection lifecycle handler.
//!
//! Runs the sensor while at least one peer link is up. Transitions are
//! edge-triggered on the active link count; repeated events in the target
//! state do nothing. Start and stop are queued for the worker task, so a
//! connection event never waits on the driver.

use crate::detection::{CommandSender, SensorCommand};
use crate::error::SensorError;
use crate::sensor::SensorControl;
use log::{error, info, warn};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkState {
    /// No peers, sensor stopped.
    Idle,
    /// At least one peer, sensor requested to run.
    Active,
}

/// Result of a connection event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    Started,
    Stopped,
    Unchanged,
}

pub struct ConnectionLifecycle {
    commands: CommandSender,
    /// Read for status only; driver calls happen on the worker.
    control: Arc<SensorControl>,
    state: LinkState,
    active_links: usize,
}

impl ConnectionLifecycle {
    pub fn new(commands: CommandSender, control: Arc<SensorControl>) -> Self {
        Self {
            commands,
            control,
            state: LinkState::Idle,
            active_links: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn active_links(&self) -> usize {
        self.active_links
    }

    fn request(&self, command: SensorCommand) -> Result<(), SensorError> {
        self.commands.send(command).map_err(|_| {
            error!("[Lifecycle] sensor worker gone, {:?} not queued", command);
            SensorError::WorkerGone
        })
    }

    /// A peer connected.
    ///
    /// A start that the worker reported as failed is surfaced here: the
    /// fault is returned and the start is queued again. The link count
    /// reflects the new peer either way.
    pub fn on_connect(&mut self) -> Result<Transition, SensorError> {
        self.active_links += 1;
        if self.state == LinkState::Idle {
            self.request(SensorCommand::Start)?;
            self.state = LinkState::Active;
            info!(
                "[Lifecycle] first peer connected, starting sensor ({} link(s))",
                self.active_links
            );
            return Ok(Transition::Started);
        }

        if let Some(fault) = self.control.fault()
            && !self.control.is_running()
        {
            warn!("[Lifecycle] sensor not running ({}), retrying start", fault);
            self.request(SensorCommand::Start)?;
            return Err(fault);
        }
        Ok(Transition::Unchanged)
    }

    /// A peer disconnected; `remaining` is the stack's count of links still up.
    pub fn on_disconnect(&mut self, remaining: usize) -> Result<Transition, SensorError> {
        self.active_links = remaining;
        if remaining > 0 || self.state == LinkState::Idle {
            return Ok(Transition::Unchanged);
        }

        self.state = LinkState::Idle;
        info!("[Lifecycle] last peer disconnected, stopping sensor");
        self.request(SensorCommand::Stop)?;
        Ok(Transition::Stopped)
    }
}
