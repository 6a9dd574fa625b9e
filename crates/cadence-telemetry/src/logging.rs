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

//! `env_logger` setup driven by [`LoggingConfig`].

use anyhow::{Context, Result};
use cadence_core::ConfigError;
use env_logger::{Builder, Env};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logger configuration.
///
/// `RUST_LOG`, when set, takes precedence over `default_filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set, e.g. `"info"` or `"cadence_core=debug"`.
    pub default_filter: String,
    /// Per-module level overrides, e.g. `{ "cadence_infra": "warn" }`.
    pub module_filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            module_filters: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.level_overrides()?;
        Ok(config)
    }

    fn level_overrides(&self) -> Result<Vec<(&str, log::LevelFilter)>, ConfigError> {
        self.module_filters
            .iter()
            .map(|(module, level)| {
                level
                    .parse::<log::LevelFilter>()
                    .map(|level| (module.as_str(), level))
                    .map_err(|_| {
                        ConfigError::Invalid(format!("unknown log level '{level}' for '{module}'"))
                    })
            })
            .collect()
    }
}

/// Installs the global logger.
///
/// Fails if the configuration holds an unknown level or if a logger is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(&config.default_filter));
    for (module, level) in config.level_overrides()? {
        builder.filter_module(module, level);
    }
    builder
        .try_init()
        .context("a global logger is already installed")?;
    log::debug!("Logging initialized with default filter '{}'.", config.default_filter);
    Ok(())
}
