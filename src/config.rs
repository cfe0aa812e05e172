use crate::error::Result;
use crate::profile::Parameter;
use crate::profile::store::{DEFAULT_RANGE, DEFAULT_SENSITIVITY, DEFAULT_TIMEOUT_MS};
use crate::profile::subscriptions::MAX_LINKS;
use crate::profile::validator::check_range;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            // Real environment wins over the file.
            if std::env::var(key).is_err() {
                // SAFETY: called from main before the runtime spawns any threads.
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub sensor: SensorConfig,
    pub link: LinkConfig,
    pub simulation: SimulationConfig,
}

/// Initial sensor parameters, pushed into the simulated driver at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub range: u16,
    pub sensitivity: u8,
    pub timeout_ms: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Simultaneous peer links accepted by the service.
    pub max_peers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Interval between simulated presence readings.
    pub period_ms: u64,
    /// Drive a scripted demo peer against the service.
    pub demo_peer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig {
                range: DEFAULT_RANGE,
                sensitivity: DEFAULT_SENSITIVITY as u8,
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            link: LinkConfig { max_peers: 4 },
            simulation: SimulationConfig {
                period_ms: 5000,
                demo_peer: true,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("[Config] ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config.sanitized()
    }

    /// Load a JSON config file, then let the environment override it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.apply_env();
        Ok(config.sanitized())
    }

    fn apply_env(&mut self) {
        if let Some(range) = env_parse("PRESENCE_RANGE") {
            self.sensor.range = range;
        }
        if let Some(sensitivity) = env_parse("PRESENCE_SENSITIVITY") {
            self.sensor.sensitivity = sensitivity;
        }
        if let Some(timeout) = env_parse("PRESENCE_TIMEOUT_MS") {
            self.sensor.timeout_ms = timeout;
        }
        if let Some(max_peers) = env_parse("PRESENCE_MAX_PEERS") {
            self.link.max_peers = max_peers;
        }
        if let Some(period) = env_parse("PRESENCE_SIM_PERIOD_MS") {
            self.simulation.period_ms = period;
        }
        if let Some(demo) = env_parse("PRESENCE_DEMO_PEER") {
            self.simulation.demo_peer = demo;
        }
    }

    /// Replace values the service would never accept with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if check_range(Parameter::Range, self.sensor.range).is_err() {
            warn!(
                "[Config] range {} out of bounds, using {}",
                self.sensor.range, defaults.sensor.range
            );
            self.sensor.range = defaults.sensor.range;
        }
        if check_range(Parameter::Sensitivity, u16::from(self.sensor.sensitivity)).is_err() {
            warn!(
                "[Config] sensitivity {} out of bounds, using {}",
                self.sensor.sensitivity, defaults.sensor.sensitivity
            );
            self.sensor.sensitivity = defaults.sensor.sensitivity;
        }
        if self.link.max_peers == 0 || self.link.max_peers > MAX_LINKS {
            warn!(
                "[Config] max peers {} not in 1..={}, using {}",
                self.link.max_peers, MAX_LINKS, defaults.link.max_peers
            );
            self.link.max_peers = defaults.link.max_peers;
        }
        if self.simulation.period_ms == 0 {
            warn!(
                "[Config] simulation period must be non-zero, using {} ms",
                defaults.simulation.period_ms
            );
            self.simulation.period_ms = defaults.simulation.period_ms;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_boot_values() {
        let config = Config::default();
        assert_eq!(config.sensor.range, 150);
        assert_eq!(config.sensor.sensitivity, 3);
        assert_eq!(config.sensor.timeout_ms, 10_000);
        assert_eq!(config.link.max_peers, 4);
        assert_eq!(config, Config::default().sanitized());
    }

    #[test]
    fn test_sanitize_clamps_to_defaults() {
        let mut config = Config::default();
        config.sensor.range = 5;
        config.sensor.sensitivity = 9;
        config.sensor.timeout_ms = 0;
        config.link.max_peers = 0;
        config.simulation.period_ms = 0;

        let config = config.sanitized();
        assert_eq!(config.sensor.range, 150);
        assert_eq!(config.sensor.sensitivity, 3);
        // Any timeout is valid.
        assert_eq!(config.sensor.timeout_ms, 0);
        assert_eq!(config.link.max_peers, 4);
        assert_eq!(config.simulation.period_ms, 5000);
    }

    #[test]
    fn test_serde_roundtrip_keeps_sections() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"sensor\""));
        assert!(json.contains("\"max_peers\":4"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn test_load_rejects_missing_file() {
        let err = Config::load(Path::new("/nonexistent/presence.json")).unwrap_err();
        assert!(matches!(err, crate::error::BridgeError::IoError(_)));
    }
}
