//! Characteristic table for the proximity service.
//!
//! Each [`Parameter`] variant carries its UUID, wire width, semantic range
//! and permissions, so the read and write paths share one description
//! instead of switching on UUIDs in two places.

use strum::FromRepr;

/// GATT characteristic property bits.
pub mod props {
    pub const READ: u8 = 0x02;
    pub const WRITE_NO_RSP: u8 = 0x04;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
}

/// One of the four values exposed by the proximity service.
///
/// The discriminant is the profile parameter id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[repr(u8)]
pub enum Parameter {
    /// Presence detected by the sensor (read + notify).
    Detection = 0,
    /// Detection range in centimetres.
    Range = 1,
    /// Detection sensitivity level.
    Sensitivity = 2,
    /// Presence hold time in milliseconds.
    Timeout = 3,
}

/// Static description of a characteristic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParameterSpec {
    pub uuid: u16,
    /// Native wire width in bytes (1 or 2).
    pub width: usize,
    /// Inclusive semantic range, `None` when any value of the wire width is valid.
    pub range: Option<(u16, u16)>,
    /// Characteristic property bits (see [`props`]).
    pub properties: u8,
    /// User description descriptor text.
    pub description: &'static str,
}

impl ParameterSpec {
    pub fn is_writable(&self) -> bool {
        self.properties & (props::WRITE | props::WRITE_NO_RSP) != 0
    }

    pub fn is_notifiable(&self) -> bool {
        self.properties & props::NOTIFY != 0
    }
}

const RW: u8 = props::READ | props::WRITE | props::WRITE_NO_RSP;

const DETECTION: ParameterSpec = ParameterSpec {
    uuid: 0x2BAD,
    width: 1,
    range: None,
    properties: props::READ | props::NOTIFY,
    description: "Detection",
};

const RANGE: ParameterSpec = ParameterSpec {
    uuid: 0x2BB1,
    width: 2,
    range: Some((20, 200)),
    properties: RW,
    description: "Range",
};

const SENSITIVITY: ParameterSpec = ParameterSpec {
    uuid: 0x2BB2,
    width: 1,
    range: Some((1, 6)),
    properties: RW,
    description: "Sensitivity",
};

const TIMEOUT: ParameterSpec = ParameterSpec {
    uuid: 0x2BB3,
    width: 2,
    range: None,
    properties: RW,
    description: "Timeout",
};

impl Parameter {
    /// All parameters in table order.
    pub const ALL: [Parameter; 4] = [
        Parameter::Detection,
        Parameter::Range,
        Parameter::Sensitivity,
        Parameter::Timeout,
    ];

    pub const fn spec(self) -> &'static ParameterSpec {
        match self {
            Parameter::Detection => &DETECTION,
            Parameter::Range => &RANGE,
            Parameter::Sensitivity => &SENSITIVITY,
            Parameter::Timeout => &TIMEOUT,
        }
    }

    pub const fn uuid(self) -> u16 {
        self.spec().uuid
    }

    pub const fn width(self) -> usize {
        self.spec().width
    }

    /// Largest value representable in the wire width.
    pub const fn wire_max(self) -> u16 {
        match self.width() {
            1 => u8::MAX as u16,
            _ => u16::MAX,
        }
    }

    /// Encode a value at the characteristic's native width (little endian).
    pub fn encode(self, value: u16) -> Vec<u8> {
        let bytes = value.to_le_bytes();
        bytes[..self.width()].to_vec()
    }
}
