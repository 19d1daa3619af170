// SPDX-License-Identifier: GPL-3.0-only

//! User configuration for the input core.
//!
//! The configuration is read from a JSON document. Every field is optional and
//! falls back to the constants in [`crate::app_settings`], so an empty object
//! `{}` is a valid configuration.
//!
//! ```json
//! {
//!     "input_method": "timer",
//!     "dwell_ms": 800,
//!     "ramble": { "algorithm": "angle", "require_button": false }
//! }
//! ```

use crate::app_settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// The active input method of a keyboard session.
///
/// Exactly one method is active at a time. The method selects both the
/// transition table used by the key state machine and the way raw pointer
/// events are turned into key events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    /// Discrete pointer clicks (mouse).
    #[default]
    Button,
    /// Dwell activation: the focused key fires after staying focused long enough.
    Timer,
    /// Touch screen: keys fire when the finger is lifted.
    Touch,
    /// Continuous gesture: corners in the pointer path select keys.
    Ramble,
}

impl fmt::Display for InputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputMethod::Button => "button",
            InputMethod::Timer => "timer",
            InputMethod::Touch => "touch",
            InputMethod::Ramble => "ramble",
        };
        f.write_str(name)
    }
}

/// Gesture detection algorithm used in ramble mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RambleAlgorithm {
    /// Sharp direction changes in the path select the key under the corner.
    #[default]
    Angle,
    /// Staying over the same key for the hold duration selects it.
    Time,
    /// Travelling far enough over one key, measured in key sizes, selects it.
    Distance,
}

/// Ramble gesture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RambleConfig {
    /// Detection algorithm.
    pub algorithm: RambleAlgorithm,
    /// When `true`, a gesture only runs while the pointer button is held.
    /// When `false`, every pointer motion is part of the gesture.
    pub require_button: bool,
    /// Maximum number of points kept in the path.
    pub max_points: usize,
    /// Minimum distance between angle-bearing points, in view pixels.
    pub min_angle_distance: f64,
    /// Angular velocity threshold in radians.
    pub turn_threshold: f64,
    /// Hold duration for [`RambleAlgorithm::Time`], in milliseconds.
    pub hold_ms: u64,
    /// Path length on a key, in key sizes, for [`RambleAlgorithm::Distance`].
    pub distance_threshold: f64,
    /// Path length required after the key was already selected.
    pub repeat_threshold: f64,
}

impl Default for RambleConfig {
    fn default() -> Self {
        Self {
            algorithm: RambleAlgorithm::default(),
            require_button: true,
            max_points: app_settings::RAMBLE_MAX_POINTS,
            min_angle_distance: app_settings::RAMBLE_MIN_ANGLE_DISTANCE,
            turn_threshold: app_settings::RAMBLE_TURN_THRESHOLD,
            hold_ms: app_settings::RAMBLE_HOLD_MS,
            distance_threshold: app_settings::RAMBLE_DISTANCE_THRESHOLD,
            repeat_threshold: app_settings::RAMBLE_REPEAT_THRESHOLD,
        }
    }
}

impl RambleConfig {
    /// Hold duration as a [`Duration`].
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

/// Configuration of a keyboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input method active when the session starts.
    pub input_method: InputMethod,
    /// Dwell duration before auto-activation, in milliseconds.
    pub dwell_ms: u64,
    /// Poll interval of the hardware keyboard replay queue, in milliseconds.
    pub sync_poll_ms: u64,
    /// Ramble gesture settings.
    pub ramble: RambleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_method: InputMethod::default(),
            dwell_ms: app_settings::DEFAULT_DWELL_MS,
            sync_poll_ms: app_settings::SYNC_POLL_INTERVAL_MS,
            ramble: RambleConfig::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.display().to_string(),
        })?;
        let config = Self::from_json_str(&contents)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Dwell duration as a [`Duration`].
    pub fn dwell_duration(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    /// Poll interval of the hardware keyboard replay queue.
    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync_poll_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dwell_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "dwell_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sync_poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sync_poll_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ramble.max_points < 2 {
            return Err(ConfigError::Invalid {
                field: "ramble.max_points",
                reason: "a path needs at least two points".to_string(),
            });
        }
        if !(self.ramble.min_angle_distance.is_finite() && self.ramble.min_angle_distance > 0.0) {
            return Err(ConfigError::Invalid {
                field: "ramble.min_angle_distance",
                reason: "must be a positive distance".to_string(),
            });
        }
        if !(0.0..=std::f64::consts::PI).contains(&self.ramble.turn_threshold) {
            return Err(ConfigError::Invalid {
                field: "ramble.turn_threshold",
                reason: "must lie within [0, pi]".to_string(),
            });
        }
        for (field, value) in [
            ("ramble.distance_threshold", self.ramble.distance_threshold),
            ("ramble.repeat_threshold", self.ramble.repeat_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive number of key sizes".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io {
        /// The underlying I/O error
        source: std::io::Error,
        /// Path of the file being read
        path: String,
    },
    /// The configuration is not valid JSON or has the wrong shape.
    Json(serde_json::Error),
    /// A field holds a value outside its accepted range.
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { source, path } => {
                write!(f, "failed to read configuration '{}': {}", path, source)
            }
            ConfigError::Json(source) => write!(
                f,
                "invalid configuration at line {}: {}",
                source.line(),
                source
            ),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid configuration value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json(source) => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(source: serde_json::Error) -> Self {
        ConfigError::Json(source)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// An empty object yields the defaults from app_settings.
    #[test]
    fn test_empty_object_uses_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input_method, InputMethod::Button);
        assert_eq!(config.dwell_ms, app_settings::DEFAULT_DWELL_MS);
        assert_eq!(config.ramble.max_points, app_settings::RAMBLE_MAX_POINTS);
    }

    /// Partial documents override only the fields they name.
    #[test]
    fn test_partial_override() {
        let json = r#"{ "input_method": "ramble", "ramble": { "algorithm": "time", "hold_ms": 250 } }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.input_method, InputMethod::Ramble);
        assert_eq!(config.ramble.algorithm, RambleAlgorithm::Time);
        assert_eq!(config.ramble.hold_duration(), Duration::from_millis(250));
        assert!(config.ramble.require_button, "Unnamed field keeps its default");
    }

    /// Out-of-range values are rejected with the field name.
    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_json_str(r#"{ "dwell_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "dwell_ms", .. }));

        let err = Config::from_json_str(r#"{ "ramble": { "turn_threshold": 4.0 } }"#).unwrap_err();
        assert!(err.to_string().contains("ramble.turn_threshold"));

        let err = Config::from_json_str(r#"{ "ramble": { "repeat_threshold": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ramble.repeat_threshold", .. }));
    }

    /// A zero poll interval would make the replay ticker spin, so it is refused.
    #[test]
    fn test_zero_sync_poll_rejected() {
        let err = Config::from_json_str(r#"{ "sync_poll_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "sync_poll_ms", .. }));
        assert!(Config::from_json_str(r#"{ "sync_poll_ms": 1 }"#).is_ok());
    }

    #[test]
    fn test_distance_algorithm() {
        let json = r#"{ "ramble": { "algorithm": "distance", "distance_threshold": 1.0 } }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.ramble.algorithm, RambleAlgorithm::Distance);
        assert_eq!(config.ramble.distance_threshold, 1.0);
        assert_eq!(config.ramble.repeat_threshold, app_settings::RAMBLE_REPEAT_THRESHOLD);
    }

    /// Unknown input methods are a JSON error, not a silent default.
    #[test]
    fn test_unknown_input_method() {
        let err = Config::from_json_str(r#"{ "input_method": "telepathy" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    /// Loading from a file on disk.
    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "input_method": "touch", "sync_poll_ms": 40 }}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.input_method, InputMethod::Touch);
        assert_eq!(config.sync_poll_interval(), Duration::from_millis(40));
    }

    /// A missing file reports the path.
    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
