//! Authoritative copy of the proximity service values.
//!
//! Shared between the stack context (peer reads and writes) and the worker
//! task (detection updates). Every value is a single atomic word, so readers
//! racing a writer see either the old or the new value, never a torn one.

use super::Parameter;
use crate::error::OutOfRange;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

pub const DEFAULT_RANGE: u16 = 150;
pub const DEFAULT_SENSITIVITY: u16 = 3;
pub const DEFAULT_TIMEOUT_MS: u16 = 10_000;
pub const DEFAULT_DETECTION: u16 = 0;

/// Thread-safe parameter store.
///
/// Implements version tracking like the sensors it mirrors: the version is
/// incremented each time a stored value actually changes.
pub struct ParameterStore {
    values: [AtomicU16; 4],
    version: AtomicU32,
}

impl ParameterStore {
    /// Create a store holding the boot defaults.
    pub fn new() -> Self {
        Self {
            values: [
                AtomicU16::new(DEFAULT_DETECTION),
                AtomicU16::new(DEFAULT_RANGE),
                AtomicU16::new(DEFAULT_SENSITIVITY),
                AtomicU16::new(DEFAULT_TIMEOUT_MS),
            ],
            version: AtomicU32::new(0),
        }
    }

    fn slot(&self, id: Parameter) -> &AtomicU16 {
        &self.values[id as usize]
    }

    pub fn get(&self, id: Parameter) -> u16 {
        self.slot(id).load(Ordering::SeqCst)
    }

    /// Store a value after checking it against the parameter's range.
    ///
    /// Ranged parameters enforce `[min, max]`; the others accept anything
    /// that fits their wire width. A rejected value leaves the store untouched.
    pub fn set(&self, id: Parameter, value: u16) -> Result<(), OutOfRange> {
        let (min, max) = id.spec().range.unwrap_or((0, id.wire_max()));
        if value < min || value > max {
            return Err(OutOfRange {
                parameter: id,
                value,
                min,
                max,
            });
        }

        let old = self.slot(id).swap(value, Ordering::SeqCst);
        if old != value {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Current value encoded at the characteristic's native width.
    pub fn raw(&self, id: Parameter) -> Vec<u8> {
        id.encode(self.get(id))
    }

    /// Change counter across all parameters.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = ParameterStore::new();
        assert_eq!(store.get(Parameter::Range), 150);
        assert_eq!(store.get(Parameter::Sensitivity), 3);
        assert_eq!(store.get(Parameter::Timeout), 10_000);
        assert_eq!(store.get(Parameter::Detection), 0);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_sensitivity_round_trip() {
        let store = ParameterStore::new();
        store.set(Parameter::Sensitivity, 4).unwrap();
        assert_eq!(store.get(Parameter::Sensitivity), 4);

        let err = store.set(Parameter::Sensitivity, 7).unwrap_err();
        assert_eq!(err.min, 1);
        assert_eq!(err.max, 6);
        assert_eq!(store.get(Parameter::Sensitivity), 4);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let store = ParameterStore::new();
        assert!(store.set(Parameter::Range, 20).is_ok());
        assert!(store.set(Parameter::Range, 200).is_ok());
        assert!(store.set(Parameter::Range, 19).is_err());
        assert!(store.set(Parameter::Range, 201).is_err());
        assert_eq!(store.get(Parameter::Range), 200);
    }

    #[test]
    fn test_unranged_parameters_limited_by_width() {
        let store = ParameterStore::new();
        assert!(store.set(Parameter::Timeout, u16::MAX).is_ok());
        assert!(store.set(Parameter::Timeout, 0).is_ok());
        assert!(store.set(Parameter::Detection, 255).is_ok());
        assert!(store.set(Parameter::Detection, 256).is_err());
    }

    #[test]
    fn test_version_only_moves_on_change() {
        let store = ParameterStore::new();
        store.set(Parameter::Range, 150).unwrap();
        assert_eq!(store.version(), 0);
        store.set(Parameter::Range, 100).unwrap();
        assert_eq!(store.version(), 1);
        let _ = store.set(Parameter::Range, 250);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_raw_encoding() {
        let store = ParameterStore::new();
        assert_eq!(store.raw(Parameter::Timeout), 10_000u16.to_le_bytes().to_vec());
        assert_eq!(store.raw(Parameter::Sensitivity), vec![3]);
    }
}
