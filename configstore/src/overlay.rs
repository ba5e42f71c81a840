//! The built-in overlay dataset loaded at startup.

use serde::Deserialize;
use shared::{CountryCode, Mode};
use std::path::PathBuf;
use std::time::Duration;

fn default_location_fresh_duration() -> Duration {
    Duration::from_secs(600)
}

/// The platform operator's built-in defaults, deserialized from YAML.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OverlayConfig {
    pub country_codes: Vec<CountryCode>,
    pub mode: Mode,
    pub range_file_path: Option<PathBuf>,
    #[serde(with = "humantime_secs", default = "default_location_fresh_duration")]
    pub location_fresh_duration: Duration,
}

impl OverlayConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigFileError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&contents)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("I/O error reading overlay config: {0}")]
    Io(#[from] std::io::Error),
    #[error("overlay config is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serializes a `Duration` as whole seconds — overlay configs are
/// hand-written YAML, so plain integers read better than a duration
/// string grammar.
mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
