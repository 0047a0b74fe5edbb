//! Application configuration.
//!
//! Loaded from a TOML file; every section has serde defaults so a
//! missing file still boots a working local instance.

use serde::{Deserialize, Serialize};
use std::path::Path;

use ordergate_coordinator::CoordinatorConfig;
use ordergate_core::RiskLimits;
use ordergate_exec::{BreakerConfig, PipelineConfig, SimulatorConfig};
use ordergate_gateway::AuthConfig;
use ordergate_journal::{ExporterConfig, JournalConfig};

use crate::error::{AppError, AppResult};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway bind address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub journal: JournalConfig,
    /// Optional JSON Lines audit export; absent means memory-only.
    #[serde(default)]
    pub export: Option<ExporterConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            auth: AuthConfig::default(),
            risk: RiskLimits::default(),
            journal: JournalConfig::default(),
            export: None,
            pipeline: PipelineConfig::default(),
            breaker: BreakerConfig::default(),
            simulator: SimulatorConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: explicit path, `ORDERGATE_CONFIG`, or the
    /// default location; defaults apply when no file exists.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("ORDERGATE_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert!(config.export.is_none());
    }

    #[test]
    fn test_partial_section_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:9000"

            [breaker]
            failure_threshold = 2

            [risk]
            max_position_size = "250000"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.breaker.failure_threshold, 2);
        assert_eq!(config.breaker.open_duration_ms, 60_000);
        assert_eq!(
            config.risk.max_position_size,
            "250000".parse::<rust_decimal::Decimal>().unwrap()
        );
    }
}
