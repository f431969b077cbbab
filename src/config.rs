//! Configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/frelon.toml` (optional, base configuration)
//! 2. Environment variables prefixed with `FRELON_`, nested with `__`
//!
//! Every field has a default, so an absent file yields a usable simulator
//! configuration.
//!
//! # Example
//! ```no_run
//! use frelon_ccd::config::FrelonConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // FRELON_LOGGING__LEVEL=debug overrides [logging] level
//! let config = FrelonConfig::load()?;
//! config.validate()?;
//! println!("Device: {}", config.device.name);
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CcdError, CcdResult};
use crate::hardware::mock::MockSensor;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/frelon.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrelonConfig {
    /// `[device]` section
    #[serde(default)]
    pub device: DeviceConfig,
    /// `[logging]` section
    #[serde(default)]
    pub logging: LoggingConfig,
    /// `[simulator]` section
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Device identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name used in logs
    #[serde(default = "default_device_name")]
    pub name: String,
    /// Espia acquisition board number
    #[serde(default)]
    pub espia_dev_nb: u32,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// pretty, compact or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Simulated camera used when no hardware engine is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sensor columns
    #[serde(default = "default_sensor_size")]
    pub sensor_width: u32,
    /// Sensor rows
    #[serde(default = "default_sensor_size")]
    pub sensor_height: u32,
    /// ADC depth, 14 or 16
    #[serde(default = "default_adc_bits")]
    pub adc_bits: u8,
    /// Model name reported by the camera
    #[serde(default = "default_model")]
    pub model: String,
    /// Beam-monitor values
    #[serde(default = "default_beam_params")]
    pub beam_params: Vec<f64>,
}

fn default_device_name() -> String {
    "frelon".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_sensor_size() -> u32 {
    2048
}

fn default_adc_bits() -> u8 {
    16
}

fn default_model() -> String {
    "Frelon 2k16".to_string()
}

fn default_beam_params() -> Vec<f64> {
    vec![0.0; 20]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            espia_dev_nb: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sensor_width: default_sensor_size(),
            sensor_height: default_sensor_size(),
            adc_bits: default_adc_bits(),
            model: default_model(),
            beam_params: default_beam_params(),
        }
    }
}

impl SimulatorConfig {
    /// Sensor description for [`MockEngine::with_sensor`](crate::hardware::MockEngine::with_sensor).
    pub fn sensor(&self) -> MockSensor {
        MockSensor {
            width: self.sensor_width,
            height: self.sensor_height,
            adc_bits: self.adc_bits,
            model: self.model.clone(),
            beam_params: self.beam_params.clone(),
        }
    }
}

impl FrelonConfig {
    /// Load configuration from `config/frelon.toml` and environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FRELON_").split("__"))
            .extract()
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> CcdResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(CcdError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(CcdError::Configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        if self.simulator.sensor_width == 0 || self.simulator.sensor_height == 0 {
            return Err(CcdError::Configuration(format!(
                "Invalid sensor size {}x{}",
                self.simulator.sensor_width, self.simulator.sensor_height
            )));
        }

        if !matches!(self.simulator.adc_bits, 14 | 16) {
            return Err(CcdError::Configuration(format!(
                "Invalid ADC depth {}. Must be 14 or 16",
                self.simulator.adc_bits
            )));
        }

        Ok(())
    }
}
