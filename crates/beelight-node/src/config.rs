//! Node configuration
//!
//! Defaults reproduce the firmware's compiled-in settings. A JSON file named
//! by `BEELIGHT_CONFIG` may override any of them, and a few timing knobs can
//! be overridden from the environment.

use sensor_pipeline::DischargeCurve;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zigbee_core::{BasicInfo, LIGHT_SENSOR_ENDPOINT};

/// Environment variable naming the JSON configuration file
pub const CONFIG_PATH_ENV: &str = "BEELIGHT_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parameters of the simulated drivers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Mean illuminance
    pub base_lux: i32,
    /// Amplitude of the slow illuminance swing
    pub lux_amplitude: i32,
    /// Samples per full illuminance swing
    pub lux_period_samples: u32,
    /// Uniform noise added to each illuminance sample
    pub lux_noise: i32,
    /// Every n-th readiness check reports not ready, 0 disables
    pub not_ready_every: u32,
    /// Battery voltage at start-up
    pub battery_start_mv: i32,
    /// Voltage lost per battery sample
    pub battery_drain_mv: f64,
    /// Probability that an ADC conversion fails
    pub adc_failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            base_lux: 300,
            lux_amplitude: 250,
            lux_period_samples: 360,
            lux_noise: 15,
            not_ready_every: 0,
            battery_start_mv: 3150,
            battery_drain_mv: 0.05,
            adc_failure_rate: 0.02,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub tick_interval_ms: u64,
    pub tick_initial_delay_ms: u64,
    pub battery_period_ms: u64,
    pub light_publish_timeout_ms: u64,
    pub battery_publish_timeout_ms: u64,
    pub channel_capacity: usize,
    pub track_light_extrema: bool,
    pub endpoint: u8,
    pub basic: BasicInfo,
    pub discharge_curve: DischargeCurve,
    pub simulation: SimulationConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10_000,
            tick_initial_delay_ms: 10_000,
            battery_period_ms: 1_000,
            light_publish_timeout_ms: 250,
            battery_publish_timeout_ms: 250,
            channel_capacity: 8,
            track_light_extrema: true,
            endpoint: LIGHT_SENSOR_ENDPOINT,
            basic: BasicInfo::default(),
            discharge_curve: DischargeCurve::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from `BEELIGHT_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = parse_env(&lookup, "BEELIGHT_TICK_INTERVAL_MS")? {
            self.tick_interval_ms = value;
        }
        if let Some(value) = parse_env(&lookup, "BEELIGHT_BATTERY_PERIOD_MS")? {
            self.battery_period_ms = value;
        }
        if let Some(value) = parse_env(&lookup, "BEELIGHT_ENDPOINT")? {
            self.endpoint = value;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if self.battery_period_ms == 0 {
            return Err(ConfigError::Invalid("battery_period_ms must be > 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be > 0".into()));
        }
        if !(1..=240).contains(&self.endpoint) {
            return Err(ConfigError::Invalid(format!(
                "endpoint {} outside 1..=240",
                self.endpoint
            )));
        }
        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.adc_failure_rate) {
            return Err(ConfigError::Invalid(
                "simulation.adc_failure_rate must be within 0..=1".into(),
            ));
        }
        if sim.lux_period_samples == 0 {
            return Err(ConfigError::Invalid(
                "simulation.lux_period_samples must be > 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn tick_initial_delay(&self) -> Duration {
        Duration::from_millis(self.tick_initial_delay_ms)
    }

    #[must_use]
    pub fn battery_period(&self) -> Duration {
        Duration::from_millis(self.battery_period_ms)
    }

    #[must_use]
    pub fn light_publish_timeout(&self) -> Duration {
        Duration::from_millis(self.light_publish_timeout_ms)
    }

    #[must_use]
    pub fn battery_publish_timeout(&self) -> Duration {
        Duration::from_millis(self.battery_publish_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_pipeline::{battery, ticker, CurvePoint};

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.tick_interval(), ticker::DEFAULT_TICK_INTERVAL);
        assert_eq!(config.tick_initial_delay(), ticker::DEFAULT_INITIAL_DELAY);
        assert_eq!(config.battery_period(), battery::DEFAULT_SAMPLE_PERIOD);
        assert_eq!(config.endpoint, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: NodeConfig = serde_json::from_str(
            r#"{
                "tick_interval_ms": 5000,
                "basic": { "location": "Hallway" },
                "discharge_curve": [
                    { "pptt": 10000, "millivolts": 3000 },
                    { "pptt": 0, "millivolts": 2000 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.tick_interval_ms, 5000);
        assert_eq!(config.battery_period_ms, 1000);
        assert_eq!(config.basic.location, "Hallway");
        assert_eq!(config.basic.manufacturer, "Kampi");
        assert_eq!(
            config.discharge_curve.points(),
            &[CurvePoint::new(10_000, 3000), CurvePoint::new(0, 2000)]
        );
    }

    #[test]
    fn test_invalid_curve_rejected() {
        let result = serde_json::from_str::<NodeConfig>(r#"{ "discharge_curve": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config
            .apply_env(|name| match name {
                "BEELIGHT_TICK_INTERVAL_MS" => Some("2500".to_string()),
                "BEELIGHT_ENDPOINT" => Some(" 12 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.tick_interval_ms, 2500);
        assert_eq!(config.endpoint, 12);
        assert_eq!(config.battery_period_ms, 1000);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = NodeConfig::default();
        let result = config.apply_env(|name| {
            (name == "BEELIGHT_BATTERY_PERIOD_MS").then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv {
                name: "BEELIGHT_BATTERY_PERIOD_MS",
                ..
            })
        ));
    }

    #[test]
    fn test_validation() {
        let config = NodeConfig {
            channel_capacity: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = NodeConfig {
            endpoint: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = NodeConfig::from_file(Path::new("/nonexistent/beelight.json")).unwrap();
        assert_eq!(config, NodeConfig::default());
    }
}
