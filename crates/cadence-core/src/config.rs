// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serializable configuration for the core primitives.

use crate::barrier::DelayMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// An error produced while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The input could not be parsed.
    Parse(String),
    /// The input parsed but holds an unusable value.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Failed to parse configuration: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Configuration for a [`DelayedBarrier`](crate::barrier::DelayedBarrier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    /// Number of parties per generation.
    pub parties: usize,
    /// Base delay in milliseconds handed to the delay policy.
    pub base_delay_ms: u64,
    /// Which built-in delay policy to use.
    pub mode: DelayMode,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            parties: 2,
            base_delay_ms: 0,
            mode: DelayMode::Linear,
        }
    }
}

impl BarrierConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can build a barrier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parties == 0 {
            return Err(ConfigError::Invalid(
                "barrier `parties` must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The base delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = BarrierConfig::from_json_str(r#"{ "parties": 4 }"#).unwrap();
        assert_eq!(config.parties, 4);
        assert_eq!(config.base_delay(), Duration::ZERO);
        assert_eq!(config.mode, DelayMode::Linear);
    }

    #[test]
    fn full_document_parses() {
        let config = BarrierConfig::from_json_str(
            r#"{ "parties": 10, "base_delay_ms": 15, "mode": "uniform" }"#,
        )
        .unwrap();
        assert_eq!(
            config,
            BarrierConfig {
                parties: 10,
                base_delay_ms: 15,
                mode: DelayMode::Uniform,
            }
        );
    }

    #[test]
    fn zero_parties_is_invalid() {
        let err = BarrierConfig::from_json_str(r#"{ "parties": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = BarrierConfig::from_json_str("{ parties: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
