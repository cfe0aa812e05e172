//! Contract between the proximity service and a GATT stack binding.
//!
//! The stack owns radio, link and handle management. It registers the
//! attribute table described by [`ServiceDefinition`], routes reads and
//! writes of those handles to the service, and delivers notifications.

use super::Parameter;
use super::parameter::props;
use super::subscriptions::ConnHandle;
use crate::error::StackError;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use uuid::Uuid;

pub const PRIMARY_SERVICE_UUID: u16 = 0x2800;
pub const CHARACTERISTIC_UUID: u16 = 0x2803;
pub const USER_DESCRIPTION_UUID: u16 = 0x2901;
pub const CLIENT_CONFIG_UUID: u16 = 0x2902;

/// Bluetooth base UUID, used to widen 16-bit UUIDs.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Attribute type as carried by the stack: 16-bit or full 128-bit UUID.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeType {
    Uuid16(u16),
    Uuid128(Uuid),
}

impl AttributeType {
    /// Full 128-bit form of this type.
    pub fn to_uuid(self) -> Uuid {
        match self {
            Self::Uuid16(short) => Uuid::from_u128(BASE_UUID | (u128::from(short) << 96)),
            Self::Uuid128(uuid) => uuid,
        }
    }
}

/// What an attribute in the service table represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    ServiceDeclaration,
    CharacteristicDeclaration(Parameter),
    Value(Parameter),
    ClientConfig(Parameter),
    UserDescription(Parameter),
}

impl AttributeKind {
    pub fn attribute_type(self) -> u16 {
        match self {
            Self::ServiceDeclaration => PRIMARY_SERVICE_UUID,
            Self::CharacteristicDeclaration(_) => CHARACTERISTIC_UUID,
            Self::Value(p) => p.uuid(),
            Self::ClientConfig(_) => CLIENT_CONFIG_UUID,
            Self::UserDescription(_) => USER_DESCRIPTION_UUID,
        }
    }
}

/// One row of the attribute table. Handles are offsets from the service's
/// first handle until the stack assigns real ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttributeEntry {
    pub offset: u16,
    pub kind: AttributeKind,
}

/// Attribute table for one primary service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceDefinition {
    pub uuid: u16,
    pub attributes: Vec<AttributeEntry>,
}

impl ServiceDefinition {
    /// Build the table: service declaration, then per characteristic its
    /// declaration, value, CCC (notifiable only) and user description.
    pub fn new(uuid: u16, characteristics: &[Parameter]) -> Self {
        let mut kinds = vec![AttributeKind::ServiceDeclaration];
        for &p in characteristics {
            kinds.push(AttributeKind::CharacteristicDeclaration(p));
            kinds.push(AttributeKind::Value(p));
            if p.spec().is_notifiable() {
                kinds.push(AttributeKind::ClientConfig(p));
            }
            kinds.push(AttributeKind::UserDescription(p));
        }

        let attributes = kinds
            .into_iter()
            .zip(0u16..)
            .map(|(kind, offset)| AttributeEntry { offset, kind })
            .collect();
        Self { uuid, attributes }
    }

    pub fn offset_of(&self, kind: AttributeKind) -> Option<u16> {
        self.attributes
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.offset)
    }

    pub fn entry(&self, offset: u16) -> Option<&AttributeEntry> {
        self.attributes.iter().find(|e| e.offset == offset)
    }

    /// Handle of the attribute at `offset` when the table starts at `base`.
    pub fn handle(base: u16, offset: u16) -> Option<u16> {
        base.checked_add(offset)
    }

    /// Last handle the table occupies, or `None` if it would run past 0xFFFF.
    pub fn last_handle(&self, base: u16) -> Option<u16> {
        let span = u16::try_from(self.attributes.len().saturating_sub(1)).ok()?;
        Self::handle(base, span)
    }

    /// Value of a characteristic declaration attribute:
    /// properties, value handle (LE), characteristic UUID (LE).
    pub fn declaration_value(&self, base: u16, p: Parameter) -> Option<Vec<u8>> {
        let value_handle = Self::handle(base, self.offset_of(AttributeKind::Value(p))?)?;
        let mut out = vec![p.spec().properties];
        out.extend_from_slice(&value_handle.to_le_bytes());
        out.extend_from_slice(&p.uuid().to_le_bytes());
        Some(out)
    }
}

/// Stack binding used by the proximity service.
pub trait AttributeServer: Send + Sync + 'static {
    /// Register the table; returns the handle assigned to its first attribute.
    fn register_service(&self, service: &ServiceDefinition) -> Result<u16, StackError>;

    /// Send a notification of `value` on `handle` to one connection.
    fn notify(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> Result<(), StackError>;
}

/// Stack stand-in that assigns handles and logs notifications.
///
/// Used by the bridge binary when no radio stack is attached.
pub struct LoggingAttributeServer {
    first_handle: u16,
    registered: AtomicBool,
    notifications: AtomicU16,
}

impl LoggingAttributeServer {
    pub fn new(first_handle: u16) -> Self {
        Self {
            first_handle,
            registered: AtomicBool::new(false),
            notifications: AtomicU16::new(0),
        }
    }

    pub fn notifications_sent(&self) -> u16 {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl AttributeServer for LoggingAttributeServer {
    fn register_service(&self, service: &ServiceDefinition) -> Result<u16, StackError> {
        let Some(last) = service.last_handle(self.first_handle) else {
            return Err(StackError::RegistrationFailed(format!(
                "{} attributes do not fit after handle 0x{:04X}",
                service.attributes.len(),
                self.first_handle
            )));
        };
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(StackError::AlreadyRegistered);
        }
        info!(
            "[GATT] registered service 0x{:04X} ({} attributes, handles 0x{:04X}..=0x{:04X})",
            service.uuid,
            service.attributes.len(),
            self.first_handle,
            last
        );
        for entry in &service.attributes {
            let properties = match entry.kind {
                AttributeKind::CharacteristicDeclaration(p) => p.spec().properties,
                _ => 0,
            };
            debug!(
                "[GATT]   0x{:04X} type {} {:?}{}",
                // In range: checked against `last` above.
                self.first_handle.wrapping_add(entry.offset),
                AttributeType::Uuid16(entry.kind.attribute_type()).to_uuid(),
                entry.kind,
                if properties & props::NOTIFY != 0 { " [notify]" } else { "" }
            );
        }
        Ok(self.first_handle)
    }

    fn notify(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> Result<(), StackError> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        info!(
            "[GATT] notify conn {} handle 0x{:04X} value {:02X?}",
            conn, handle, value
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proximity() -> ServiceDefinition {
        ServiceDefinition::new(0x20F1, &Parameter::ALL)
    }

    #[test]
    fn test_table_layout() {
        let def = proximity();
        // 1 service + 4 * (decl, value, description) + 1 CCC
        assert_eq!(def.attributes.len(), 14);
        assert_eq!(def.offset_of(AttributeKind::Value(Parameter::Detection)), Some(2));
        assert_eq!(
            def.offset_of(AttributeKind::ClientConfig(Parameter::Detection)),
            Some(3)
        );
        assert_eq!(def.offset_of(AttributeKind::ClientConfig(Parameter::Range)), None);
        assert_eq!(def.offset_of(AttributeKind::Value(Parameter::Timeout)), Some(12));
    }

    #[test]
    fn test_declaration_value() {
        let def = proximity();
        let decl = def.declaration_value(0x0010, Parameter::Range);
        // Range value sits at offset 6.
        assert_eq!(decl, Some(vec![0x0E, 0x16, 0x00, 0xB1, 0x2B]));
    }

    #[test]
    fn test_handles_near_top_of_space() {
        let def = proximity();
        assert_eq!(def.last_handle(0xFFF2), Some(0xFFFF));
        assert_eq!(def.last_handle(0xFFF3), None);
        // Range value at offset 6 overflows from 0xFFFA.
        assert_eq!(def.declaration_value(0xFFFA, Parameter::Range), None);
        assert!(def.declaration_value(0xFFF2, Parameter::Range).is_some());
    }

    #[test]
    fn test_logging_server_rejects_overflowing_table() {
        let server = LoggingAttributeServer::new(0xFFF8);
        assert!(matches!(
            server.register_service(&proximity()),
            Err(StackError::RegistrationFailed(_))
        ));
        // A failed registration does not count as registered.
        let server = LoggingAttributeServer::new(0x0001);
        assert_eq!(server.register_service(&proximity()), Ok(0x0001));
    }

    #[test]
    fn test_uuid_widening() {
        let wide = AttributeType::Uuid16(0x2BAD).to_uuid();
        assert_eq!(
            wide.to_string(),
            "00002bad-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(AttributeType::Uuid128(wide).to_uuid(), wide);
    }

    #[test]
    fn test_logging_server_registers_once() {
        let server = LoggingAttributeServer::new(0x0020);
        assert_eq!(server.register_service(&proximity()), Ok(0x0020));
        assert_eq!(
            server.register_service(&proximity()),
            Err(StackError::AlreadyRegistered)
        );
        server.notify(1, 0x0022, &[1]).unwrap();
        assert_eq!(server.notifications_sent(), 1);
    }
}
