//! Controller configuration parameters
//!
//! All tunable parameters for the irrigation control loop.
//! Values come from defaults, an optional JSON file, then a small set of
//! environment overrides.  The result is validated once and is read-only
//! for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`ControllerConfig::port`].
pub const ENV_PORT: &str = "IRRIGATION_PORT";
/// Environment variable overriding [`ControllerConfig::baud_rate`].
pub const ENV_BAUD: &str = "IRRIGATION_BAUD";
/// Environment variable overriding [`ControllerConfig::model_path`].
pub const ENV_MODEL: &str = "IRRIGATION_MODEL";

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Transport ---
    /// Serial device of the sensor board (e.g. `/dev/ttyACM0`, `COM3`)
    pub port: String,
    /// Serial baud rate
    pub baud_rate: u32,

    // --- Model ---
    /// Trained model artifact (JSON)
    pub model_path: PathBuf,

    // --- Pump ---
    /// Calibrated pump delivery (mL per second)
    pub flow_rate_ml_per_s: f64,
    /// Predictions below this volume (mL) produce no command
    pub min_water_ml: f64,
    /// Per-cycle safety cap (mL)
    pub max_water_ml: f64,

    // --- Timing ---
    /// Delay between cycles (seconds)
    pub cycle_delay_secs: u32,
    /// Bounded wait for one telemetry line (milliseconds)
    pub read_timeout_ms: u32,
    /// Wait after opening the port before the first read (milliseconds)
    pub settle_delay_ms: u32,
    /// Granularity at which blocking waits observe shutdown (milliseconds)
    pub poll_slice_ms: u32,
    /// Session statistics report interval (seconds, 0 = only at shutdown)
    pub telemetry_interval_secs: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Transport
            port: "/dev/ttyACM0".into(),
            baud_rate: 9600,

            // Model
            model_path: PathBuf::from("irrigation_model.json"),

            // Pump
            flow_rate_ml_per_s: 6.67,
            min_water_ml: 10.0,
            max_water_ml: 500.0,

            // Timing
            cycle_delay_secs: 5,
            read_timeout_ms: 2000,
            settle_delay_ms: 2000, // board resets when the port opens
            poll_slice_ms: 100,
            telemetry_interval_secs: 60,
        }
    }
}

impl ControllerConfig {
    /// Build the process configuration: defaults, then `path` (if any),
    /// then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let cfg = Self::from_file(p)?;
                info!("Config loaded from {}", p.display());
                cfg
            }
            None => {
                info!("No config file given, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.  Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Apply the `IRRIGATION_*` overrides.  `lookup` returns the value of
    /// an environment variable, if set.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port;
        }
        if let Some(raw) = lookup(ENV_BAUD) {
            self.baud_rate = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: ENV_BAUD,
                    value: raw.clone(),
                })?;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model_path = PathBuf::from(model);
        }
        Ok(())
    }

    /// Reject values that would make the loop unsafe or meaningless.
    /// Nothing is clamped here; a bad value stops startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationFailed("baud_rate must be > 0"));
        }
        if !(self.flow_rate_ml_per_s.is_finite() && self.flow_rate_ml_per_s > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "flow_rate_ml_per_s must be finite and > 0",
            ));
        }
        if !(self.min_water_ml.is_finite() && self.min_water_ml >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "min_water_ml must be finite and >= 0",
            ));
        }
        if !self.max_water_ml.is_finite() || self.max_water_ml < self.min_water_ml {
            return Err(ConfigError::ValidationFailed(
                "max_water_ml must be finite and >= min_water_ml",
            ));
        }
        // Any dose that clears the minimum must run the pump for >= 1 s.
        if self.min_water_ml < self.flow_rate_ml_per_s {
            return Err(ConfigError::ValidationFailed(
                "min_water_ml must be >= flow_rate_ml_per_s",
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("read_timeout_ms must be > 0"));
        }
        if self.poll_slice_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_slice_ms must be > 0"));
        }
        Ok(())
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.cycle_delay_secs))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.read_timeout_ms))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.settle_delay_ms))
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_slice_ms))
    }

    /// `None` when periodic telemetry is disabled.
    pub fn telemetry_interval(&self) -> Option<Duration> {
        (self.telemetry_interval_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.telemetry_interval_secs)))
    }
}
