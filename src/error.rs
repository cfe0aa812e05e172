use crate::profile::Parameter;
use thiserror::Error as ThisError;

/// Protocol-level rejection returned to the peer.
///
/// Each variant maps onto an ATT error code (see [`AttError::code`]).
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttError {
    #[error("Invalid attribute handle")]
    InvalidHandle,

    #[error("Attribute cannot be written")]
    WriteNotPermitted,

    #[error("Attribute not found")]
    AttrNotFound,

    #[error("Attribute is not long; offset must be zero")]
    AttrNotLong,

    #[error("Invalid attribute value size")]
    InvalidValueSize,

    #[error("Request from a connection the service does not track")]
    UnlikelyError,

    #[error("Client characteristic configuration improperly configured")]
    CccImproperlyConfigured,

    #[error("Value out of range")]
    OutOfRange,
}

impl AttError {
    /// ATT error code sent on the wire.
    pub fn code(self) -> u8 {
        match self {
            AttError::InvalidHandle => 0x01,
            AttError::WriteNotPermitted => 0x03,
            AttError::AttrNotFound => 0x0A,
            AttError::AttrNotLong => 0x0B,
            AttError::InvalidValueSize => 0x0D,
            AttError::UnlikelyError => 0x0E,
            AttError::CccImproperlyConfigured => 0xFD,
            AttError::OutOfRange => 0xFF,
        }
    }
}

/// A value outside a parameter's semantic range.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{parameter:?} value {value} is out of range [{min}, {max}]")]
pub struct OutOfRange {
    pub parameter: Parameter,
    pub value: u16,
    pub min: u16,
    pub max: u16,
}

impl From<OutOfRange> for AttError {
    fn from(_: OutOfRange) -> Self {
        AttError::OutOfRange
    }
}

/// The sensor driver refused a control call.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Sensor driver not initialized")]
    NotInitialized,

    #[error("Sensor failed to start: {0}")]
    StartFailed(String),

    #[error("Sensor worker is not running")]
    WorkerGone,

    #[error("Sensor rejected {parameter:?} = {value}")]
    Rejected { parameter: Parameter, value: u16 },
}

/// Status reported by the protocol stack adapter.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("Service registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Service already registered")]
    AlreadyRegistered,

    #[error("No buffer available for notification")]
    ResourceExhaustion,

    #[error("Link limit of {0} peers reached")]
    TooManyLinks(usize),
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Att(#[from] AttError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
