//! Runtime configuration
//!
//! Loaded from TOML; every section and key is optional.
//!
//! ```toml
//! [profile]
//! age = 40
//!
//! [advisory]
//! debounce_ms = 800
//! overall_delay_ms = 800
//! category_delay_ms = 600
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::advisory::LocalAdvisor;
use crate::error::ComputeError;
use crate::seed::SEED_AGE;
use crate::types::MIN_AGE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub profile: ProfileConfig,
    pub advisory: AdvisoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Chronological age used when no snapshot provides one
    pub age: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { age: SEED_AGE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub debounce_ms: u64,
    pub overall_delay_ms: u64,
    pub category_delay_ms: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            overall_delay_ms: 800,
            category_delay_ms: 600,
        }
    }
}

impl AdvisoryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Local advisor with the configured latencies
    pub fn local_advisor(&self) -> LocalAdvisor {
        LocalAdvisor::with_delays(
            Duration::from_millis(self.overall_delay_ms),
            Duration::from_millis(self.category_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ComputeError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.profile.age < MIN_AGE {
            return Err(ComputeError::ConfigError(format!(
                "profile.age must be at least {MIN_AGE}, got {}",
                self.profile.age
            )));
        }
        if self.advisory.debounce_ms == 0 {
            return Err(ComputeError::ConfigError(
                "advisory.debounce_ms must be positive".to_string(),
            ));
        }
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ComputeError::ConfigError(format!(
                "unknown logging.level: {other}"
            ))),
        }
    }
}
