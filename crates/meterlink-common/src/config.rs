//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Shared primitives and utilities for the emitter runtime."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_submit_url() -> String {
    "http://localhost:3000/devices/data".to_owned()
}

fn default_verify_url() -> String {
    "http://localhost:3000/register_devices/device_info".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_cadence() -> Duration {
    Duration::from_millis(3000)
}

fn default_window_capacity() -> usize {
    10
}

fn default_jitter_factor() -> f64 {
    0.02
}

fn default_token_path() -> PathBuf {
    PathBuf::from("target/session/token")
}

fn default_token_env() -> String {
    "METERLINK_TOKEN".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9899))
}

/// Primary configuration object for the Meterlink emitter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub emission: EmissionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "METERLINK_CONFIG";

    /// Load configuration from disk, respecting the `METERLINK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.collector.validate()?;
        self.emission.validate()?;
        if self.session.token_env.trim().is_empty() {
            return Err(anyhow!("session.token_env must not be empty"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote collector endpoints and transport limits.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_submit_url")]
    pub submit_url: String,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    #[serde(default = "default_request_timeout", rename = "request_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            submit_url: default_submit_url(),
            verify_url: default_verify_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.submit_url)
            .with_context(|| format!("collector.submit_url '{}' is not a URL", self.submit_url))?;
        Url::parse(&self.verify_url)
            .with_context(|| format!("collector.verify_url '{}' is not a URL", self.verify_url))?;
        if self.request_timeout.is_zero() {
            return Err(anyhow!("collector.request_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Tick cadence, window bound and generator tuning.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionConfig {
    #[serde(default = "default_cadence", rename = "cadence_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub cadence: Duration,
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            window_capacity: default_window_capacity(),
            jitter_factor: default_jitter_factor(),
            random_seed: None,
        }
    }
}

impl EmissionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cadence.is_zero() {
            return Err(anyhow!("emission.cadence_ms must be positive"));
        }
        if self.window_capacity == 0 {
            return Err(anyhow!("emission.window_capacity must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.jitter_factor) {
            return Err(anyhow!(
                "emission.jitter_factor must lie in [0, 1), got {}",
                self.jitter_factor
            ));
        }
        Ok(())
    }
}

/// Where the bearer credential lives between `login` and `run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_observed_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.emission.cadence, Duration::from_millis(3000));
        assert_eq!(config.emission.window_capacity, 10);
        assert!((config.emission.jitter_factor - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.collector.submit_url, "http://localhost:3000/devices/data");
        assert_eq!(config.session.token_env, "METERLINK_TOKEN");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn millisecond_fields_are_parsed() {
        let config: AppConfig = r#"
            [collector]
            request_timeout_ms = 250

            [emission]
            cadence_ms = 50
            window_capacity = 3
            random_seed = 7
        "#
        .parse()
        .unwrap();
        assert_eq!(config.collector.request_timeout, Duration::from_millis(250));
        assert_eq!(config.emission.cadence, Duration::from_millis(50));
        assert_eq!(config.emission.window_capacity, 3);
        assert_eq!(config.emission.random_seed, Some(7));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = "[emission]\nwindow_capacity = 0"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("window_capacity"));
    }

    #[test]
    fn zero_cadence_is_rejected() {
        assert!("[emission]\ncadence_ms = 0".parse::<AppConfig>().is_err());
    }

    #[test]
    fn jitter_outside_unit_interval_is_rejected() {
        assert!("[emission]\njitter_factor = 1.5"
            .parse::<AppConfig>()
            .is_err());
        assert!("[emission]\njitter_factor = -0.1"
            .parse::<AppConfig>()
            .is_err());
    }

    #[test]
    fn malformed_collector_url_is_rejected() {
        let err = "[collector]\nsubmit_url = \"not a url\""
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("submit_url"));
    }
}
