//! Configuration types for StrataDB lineage garbage collection.
//!
//! Config structs validate their values at construction time via fallible
//! builders and serialize with human-readable durations, so the embedding
//! engine can splice them into its own config tree; a JSON schema is
//! derived for its tooling. Post-deserialization validation is available
//! via the `validate()` method on each struct.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// `json_schema!` and `json_internal!` expansions. Allow `disallowed_methods`
// at the module level since config types are declarative structs with minimal
// procedural code.
#![allow(clippy::disallowed_methods)]

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Lineage garbage collection configuration.
///
/// # Validation Rules
///
/// - `coordinator_interval` must be >= 1s
/// - `local_interval` must be >= 1s
/// - `report_warn_after` must be >= `coordinator_interval`
/// - `max_walk_depth` must be > 0
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use stratadb_lineage_types::config::GcConfig;
/// let config = GcConfig::builder()
///     .coordinator_interval(Duration::from_secs(30))
///     .max_walk_depth(1024)
///     .build()
///     .expect("valid gc config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GcConfig {
    /// Interval between authoritative collection cycles.
    ///
    /// The coordinator also wakes early when a replica report or contract
    /// update arrives, so this is an upper bound on cycle spacing.
    /// Must be >= 1s.
    #[serde(default = "default_coordinator_interval")]
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub coordinator_interval: Duration,
    /// Interval between per-replica local collection cycles.
    ///
    /// Must be >= 1s.
    #[serde(default = "default_local_interval")]
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub local_interval: Duration,
    /// Age past which a replica report is logged as stale.
    ///
    /// Stale reports are still honored; collection defers their regions
    /// rather than guessing. Must be >= `coordinator_interval`.
    #[serde(default = "default_report_warn_after")]
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub report_warn_after: Duration,
    /// Maximum ancestor-walk rounds per sub-region before resolution is
    /// abandoned for the cycle.
    ///
    /// Bounds work on corrupt or adversarial lineage. Must be > 0.
    #[serde(default = "default_max_walk_depth")]
    pub max_walk_depth: usize,
}

#[bon::bon]
impl GcConfig {
    /// Creates a new garbage collection configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `coordinator_interval` < 1s
    /// - `local_interval` < 1s
    /// - `report_warn_after` < `coordinator_interval`
    /// - `max_walk_depth` is 0
    #[builder]
    pub fn new(
        #[builder(default = default_coordinator_interval())] coordinator_interval: Duration,
        #[builder(default = default_local_interval())] local_interval: Duration,
        #[builder(default = default_report_warn_after())] report_warn_after: Duration,
        #[builder(default = default_max_walk_depth())] max_walk_depth: usize,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { coordinator_interval, local_interval, report_warn_after, max_walk_depth };
        config.validate()?;
        Ok(config)
    }
}

impl GcConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator_interval < Duration::from_secs(1) {
            return Err(ConfigError::Validation {
                message: format!(
                    "coordinator_interval must be >= 1s, got {:?}",
                    self.coordinator_interval
                ),
            });
        }
        if self.local_interval < Duration::from_secs(1) {
            return Err(ConfigError::Validation {
                message: format!("local_interval must be >= 1s, got {:?}", self.local_interval),
            });
        }
        if self.report_warn_after < self.coordinator_interval {
            return Err(ConfigError::Validation {
                message: format!(
                    "report_warn_after ({:?}) must be >= coordinator_interval ({:?})",
                    self.report_warn_after, self.coordinator_interval
                ),
            });
        }
        if self.max_walk_depth == 0 {
            return Err(ConfigError::Validation {
                message: "max_walk_depth must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            coordinator_interval: default_coordinator_interval(),
            local_interval: default_local_interval(),
            report_warn_after: default_report_warn_after(),
            max_walk_depth: default_max_walk_depth(),
        }
    }
}

fn default_coordinator_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_local_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_report_warn_after() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_walk_depth() -> usize {
    4096
}

/// Duration serialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
