//! Proximity service: the protocol-facing side of the bridge.
//!
//! Runs in the stack context. Reads and writes are answered from the
//! parameter store without blocking; accepted writes, sensor start/stop and
//! pushed detection values are queued for the worker task, which talks to
//! the sensor. Detection changes are debounced and notified from the worker.

use super::server::{AttributeKind, AttributeServer, AttributeType, ServiceDefinition};
use super::subscriptions::{CCC_NOTIFY, ConnHandle, SubscriptionTable};
use super::validator::validate_write;
use super::{Parameter, ParameterStore};
use crate::detection::{CommandSender, DetectionDebouncer, DetectionHandoff, SensorCommand};
use crate::error::{AttError, BridgeError, SensorError, StackError};
use crate::lifecycle::{ConnectionLifecycle, Transition};
use crate::sensor::SensorControl;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Proximity service UUID.
pub const SERVICE_UUID: u16 = 0x20F1;

/// Attribute addressed by a peer request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttributeRef {
    pub handle: u16,
    pub attr_type: AttributeType,
}

impl AttributeRef {
    pub fn new(handle: u16, uuid: u16) -> Self {
        Self {
            handle,
            attr_type: AttributeType::Uuid16(uuid),
        }
    }
}

pub struct ProximityService {
    definition: ServiceDefinition,
    base_handle: RwLock<Option<u16>>,
    store: Arc<ParameterStore>,
    debouncer: DetectionDebouncer,
    subscriptions: Mutex<SubscriptionTable>,
    lifecycle: Mutex<ConnectionLifecycle>,
    control: Arc<SensorControl>,
    commands: CommandSender,
    server: Arc<dyn AttributeServer>,
    max_links: usize,
}

impl ProximityService {
    pub fn new(
        server: Arc<dyn AttributeServer>,
        control: Arc<SensorControl>,
        commands: CommandSender,
        store: Arc<ParameterStore>,
        max_links: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            definition: ServiceDefinition::new(SERVICE_UUID, &Parameter::ALL),
            base_handle: RwLock::new(None),
            debouncer: DetectionDebouncer::new(store.clone()),
            store,
            subscriptions: Mutex::new(SubscriptionTable::new()),
            lifecycle: Mutex::new(ConnectionLifecycle::new(commands.clone(), control.clone())),
            control,
            commands,
            server,
            max_links,
        })
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    /// Register the attribute table with the stack.
    pub fn add_service(&self) -> Result<(), StackError> {
        let mut base = self.base_handle.write();
        if base.is_some() {
            return Err(StackError::AlreadyRegistered);
        }
        let first = self.server.register_service(&self.definition)?;
        if self.definition.last_handle(first).is_none() {
            return Err(StackError::RegistrationFailed(format!(
                "stack assigned 0x{:04X}, table does not fit",
                first
            )));
        }
        *base = Some(first);
        Ok(())
    }

    /// Register the service, seed the store from the driver and wire the
    /// detection callback.
    pub fn start(self: &Arc<Self>, handoff: DetectionHandoff) -> Result<(), BridgeError> {
        self.add_service()?;

        for id in [Parameter::Range, Parameter::Sensitivity, Parameter::Timeout] {
            let Some(value) = self.control.read_back(id) else {
                continue;
            };
            if let Err(e) = self.store.set(id, value) {
                warn!(
                    "[GATT] driver reports {}; keeping {}",
                    e,
                    self.store.get(id)
                );
            }
        }
        let _ = self.store.set(Parameter::Detection, 0);

        // Weak so the driver's copy of the callback does not keep us alive.
        let service = Arc::downgrade(self);
        self.control.init(
            handoff,
            Arc::new(move |raw| {
                if let Some(service) = service.upgrade() {
                    service.on_detection(raw);
                }
            }),
        );

        info!(
            "[GATT] proximity service ready (range {}, sensitivity {}, timeout {} ms)",
            self.store.get(Parameter::Range),
            self.store.get(Parameter::Sensitivity),
            self.store.get(Parameter::Timeout)
        );
        Ok(())
    }

    /// Assigned handle of an attribute, once registered.
    pub fn handle_of(&self, kind: AttributeKind) -> Option<u16> {
        let base = (*self.base_handle.read())?;
        ServiceDefinition::handle(base, self.definition.offset_of(kind)?)
    }

    fn resolve(&self, attr: &AttributeRef) -> Result<(u16, AttributeKind), AttError> {
        let AttributeType::Uuid16(uuid) = attr.attr_type else {
            return Err(AttError::InvalidHandle);
        };
        let base = (*self.base_handle.read()).ok_or(AttError::AttrNotFound)?;
        let entry = attr
            .handle
            .checked_sub(base)
            .and_then(|offset| self.definition.entry(offset))
            .ok_or(AttError::AttrNotFound)?;
        if entry.kind.attribute_type() != uuid {
            return Err(AttError::AttrNotFound);
        }
        Ok((base, entry.kind))
    }

    pub fn read_attribute(
        &self,
        conn: ConnHandle,
        attr: &AttributeRef,
        offset: u16,
    ) -> Result<Vec<u8>, AttError> {
        // No attribute in this service is long.
        if offset > 0 {
            return Err(AttError::AttrNotLong);
        }

        let (base, kind) = self.resolve(attr)?;
        let value = match kind {
            AttributeKind::Value(id) => self.store.raw(id),
            AttributeKind::ClientConfig(_) => {
                self.subscriptions.lock().get(conn).to_le_bytes().to_vec()
            }
            AttributeKind::UserDescription(id) => id.spec().description.as_bytes().to_vec(),
            AttributeKind::ServiceDeclaration => SERVICE_UUID.to_le_bytes().to_vec(),
            AttributeKind::CharacteristicDeclaration(id) => self
                .definition
                .declaration_value(base, id)
                .ok_or(AttError::AttrNotFound)?,
        };
        Ok(value)
    }

    pub fn write_attribute(
        &self,
        conn: ConnHandle,
        attr: &AttributeRef,
        value: &[u8],
        offset: u16,
    ) -> Result<(), AttError> {
        match self.resolve(attr)?.1 {
            AttributeKind::Value(id) => self.write_value(id, value, offset),
            AttributeKind::ClientConfig(id) => self.write_client_config(conn, id, value, offset),
            _ => Err(AttError::WriteNotPermitted),
        }
    }

    fn write_value(&self, id: Parameter, payload: &[u8], offset: u16) -> Result<(), AttError> {
        let value = match validate_write(id, payload, offset) {
            Ok(value) => value,
            Err(AttError::OutOfRange) => {
                let (min, max) = id.spec().range.unwrap_or((0, id.wire_max()));
                warn!(
                    "[GATT] {:?} write {:02X?} out of range [{}, {}], keeping {}",
                    id,
                    payload,
                    min,
                    max,
                    self.store.get(id)
                );
                return Err(AttError::OutOfRange);
            }
            Err(e) => {
                warn!("[GATT] {:?} write {:02X?} rejected: {}", id, payload, e);
                return Err(e);
            }
        };

        self.store.set(id, value)?;
        info!("[GATT] {:?} = {}", id, value);

        if self.commands.send(SensorCommand::Apply(id, value)).is_err() {
            error!("[GATT] sensor worker gone, {:?} not applied", id);
        }
        Ok(())
    }

    fn write_client_config(
        &self,
        conn: ConnHandle,
        id: Parameter,
        payload: &[u8],
        offset: u16,
    ) -> Result<(), AttError> {
        if offset != 0 {
            return Err(AttError::AttrNotLong);
        }
        let [lo, hi] = *payload else {
            return Err(AttError::InvalidValueSize);
        };
        let ccc = u16::from_le_bytes([lo, hi]);
        if ccc & !CCC_NOTIFY != 0 {
            return Err(AttError::CccImproperlyConfigured);
        }
        if !self.subscriptions.lock().set(conn, ccc) {
            warn!("[GATT] CCC write from untracked conn {}", conn);
            return Err(AttError::UnlikelyError);
        }
        info!(
            "[GATT] conn {} {} {:?} notifications",
            conn,
            if ccc & CCC_NOTIFY != 0 { "enabled" } else { "disabled" },
            id
        );
        Ok(())
    }

    /// A peer link came up.
    ///
    /// A sensor start failure reported by the worker is returned but the
    /// link stays usable. Never waits on the driver.
    pub fn on_connect(&self, conn: ConnHandle) -> Result<Transition, BridgeError> {
        {
            let mut subscriptions = self.subscriptions.lock();
            if subscriptions.contains(conn) {
                debug!("[GATT] conn {} already connected", conn);
                return Ok(Transition::Unchanged);
            }
            if subscriptions.len() >= self.max_links || !subscriptions.connect(conn) {
                warn!("[GATT] conn {} refused, {} links active", conn, subscriptions.len());
                return Err(StackError::TooManyLinks(self.max_links).into());
            }
        }
        info!("[GATT] conn {} connected", conn);
        Ok(self.lifecycle.lock().on_connect()?)
    }

    /// A peer link went down; `remaining` is the stack's active link count.
    pub fn on_disconnect(
        &self,
        conn: ConnHandle,
        remaining: usize,
    ) -> Result<Transition, BridgeError> {
        self.subscriptions.lock().disconnect(conn);
        info!("[GATT] conn {} disconnected ({} remaining)", conn, remaining);
        Ok(self.lifecycle.lock().on_disconnect(remaining)?)
    }

    pub fn is_anyone_subscribed(&self) -> bool {
        self.subscriptions.lock().any_subscribed()
    }

    /// Send `value` for a notifiable characteristic to every subscriber.
    ///
    /// Returns how many notifications the stack accepted. Failed sends are
    /// dropped; the next change notifies again.
    pub fn notify(&self, id: Parameter, value: &[u8]) -> usize {
        if !id.spec().is_notifiable() {
            return 0;
        }
        let Some(handle) = self.handle_of(AttributeKind::Value(id)) else {
            return 0;
        };

        let subscribers = self.subscriptions.lock().subscribers();
        let mut sent = 0;
        for conn in subscribers {
            match self.server.notify(conn, handle, value) {
                Ok(()) => sent += 1,
                Err(e) => warn!("[GATT] notification to conn {} dropped: {}", conn, e),
            }
        }
        sent
    }

    /// Detection callback target, called from the worker task only.
    pub fn on_detection(&self, raw: u8) {
        let Some(notification) = self.debouncer.observe(raw) else {
            debug!("[Detection] unchanged ({})", raw);
            return;
        };
        info!(
            "[Detection] presence {} (raw {})",
            if notification.is_present() { "detected" } else { "cleared" },
            raw
        );
        if !self.is_anyone_subscribed() {
            return;
        }
        self.notify(Parameter::Detection, &notification.payload());
    }

    /// Push a detection value from application code.
    ///
    /// Queued behind pending worker events and debounced like values the
    /// sensor reports.
    pub fn detection_update(&self, raw: u8) {
        if self.commands.send(SensorCommand::Detection(raw)).is_err() {
            error!("[Detection] sensor worker gone, update {} dropped", raw);
        }
    }

    /// Last failure the worker saw from the driver, if not since recovered.
    pub fn sensor_fault(&self) -> Option<SensorError> {
        self.control.fault()
    }

    pub fn link_state(&self) -> crate::lifecycle::LinkState {
        self.lifecycle.lock().state()
    }
}
