//! Scheduler configuration
//!
//! Loaded from TOML or YAML, or built from one of the presets:
//!
//! ```toml
//! name = "robot"
//! period_ms = 20
//! fault_update_period_ms = 20
//! catch_panics = true
//! warn_on_overrun = true
//! log_filter = "info,cadence_core=debug"
//! snapshot_period_ms = 1000
//! ```

use crate::error::{CadenceError, CadenceResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_name() -> String {
    "cadence".to_string()
}

fn default_period_ms() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Settings shared by the scheduler and the control loop driving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name used in logs and snapshots
    #[serde(default = "default_name")]
    pub name: String,

    /// Fixed period of the main scheduler pass
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Period of the fault log update callback
    #[serde(default = "default_period_ms")]
    pub fault_update_period_ms: u64,

    /// Convert panics raised by commands and callbacks into faults
    #[serde(default = "default_true")]
    pub catch_panics: bool,

    /// Warn when one pass takes longer than the period
    #[serde(default = "default_true")]
    pub warn_on_overrun: bool,

    /// Default `tracing` filter for binaries, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Period of the telemetry snapshot callback, disabled when unset
    #[serde(default)]
    pub snapshot_period_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SchedulerConfig {
    /// 50 Hz control loop with fault capture and overrun warnings
    pub fn standard() -> Self {
        Self {
            name: default_name(),
            period_ms: default_period_ms(),
            fault_update_period_ms: default_period_ms(),
            catch_panics: true,
            warn_on_overrun: true,
            log_filter: default_log_filter(),
            snapshot_period_ms: None,
        }
    }

    /// Stepped execution for tests and simulation: no wall-clock warnings
    pub fn deterministic() -> Self {
        Self {
            name: "deterministic".to_string(),
            warn_on_overrun: false,
            ..Self::standard()
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn fault_update_period(&self) -> Duration {
        Duration::from_millis(self.fault_update_period_ms)
    }

    pub fn snapshot_period(&self) -> Option<Duration> {
        self.snapshot_period_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> CadenceResult<()> {
        if self.period_ms == 0 {
            return Err(CadenceError::config("period_ms must be greater than zero"));
        }
        if self.fault_update_period_ms == 0 {
            return Err(CadenceError::config(
                "fault_update_period_ms must be greater than zero",
            ));
        }
        if self.snapshot_period_ms == Some(0) {
            return Err(CadenceError::config(
                "snapshot_period_ms must be greater than zero when set",
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> CadenceResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> CadenceResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> CadenceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(CadenceError::config(format!(
                "unsupported config format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let standard = SchedulerConfig::standard();
        assert_eq!(standard.period(), Duration::from_millis(20));
        assert!(standard.warn_on_overrun);
        assert!(standard.validate().is_ok());

        let deterministic = SchedulerConfig::deterministic();
        assert!(!deterministic.warn_on_overrun);
        assert_eq!(deterministic.period_ms, standard.period_ms);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SchedulerConfig::from_toml_str("period_ms = 10\n").unwrap();
        assert_eq!(config.period_ms, 10);
        assert_eq!(config.fault_update_period_ms, 20);
        assert!(config.catch_panics);
        assert_eq!(config.snapshot_period(), None);
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let err = SchedulerConfig::from_toml_str("period_ms = 0").unwrap_err();
        assert!(matches!(err, CadenceError::Config(_)));
    }

    #[test]
    fn test_yaml() {
        let config =
            SchedulerConfig::from_yaml_str("name: bot\nsnapshot_period_ms: 500\n").unwrap();
        assert_eq!(config.name, "bot");
        assert_eq!(config.snapshot_period(), Some(Duration::from_millis(500)));
    }
}
