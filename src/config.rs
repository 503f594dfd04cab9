//! Service configuration.
//!
//! The config is an explicitly constructed value loaded once by the
//! composition root and passed into each component; environment variables
//! override file-provided secrets.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level service configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Data directory holding tracking state, reports, raw evidence, outbox.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub breach: BreachConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Collection scanner subprocess settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Scanner command line (e.g. "python3 /opt/spiderfoot/sf.py"). When
    /// unset, collection is skipped and the pipeline runs on other sources.
    #[serde(default)]
    pub command: Option<String>,
    /// Module names passed to the scanner with `-m`.
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default = "default_scanner_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: None,
            modules: Vec::new(),
            timeout_secs: default_scanner_timeout_secs(),
        }
    }
}

/// Breach-directory HTTP client settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BreachConfig {
    #[serde(default = "default_breach_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_breach_timeout_secs")]
    pub timeout_secs: u64,
    /// Backoff before the single rate-limit retry.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for BreachConfig {
    fn default() -> Self {
        Self {
            api_base: default_breach_api_base(),
            api_key: None,
            timeout_secs: default_breach_timeout_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// Dispatch settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default = "default_sender")]
    pub sender: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
        }
    }
}

fn default_scanner_timeout_secs() -> u64 {
    600
}

fn default_breach_api_base() -> String {
    "https://haveibeenpwned.com/api/v3".to_string()
}

fn default_breach_timeout_secs() -> u64 {
    10
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn default_sender() -> String {
    "noreply@mapard.example".to_string()
}

/// Load the service config, falling back to defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => ServiceConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut ServiceConfig) {
    if let Ok(key) = env::var("MAPARD_BREACH_API_KEY") {
        if !key.trim().is_empty() {
            config.breach.api_key = Some(key);
        }
    }
    if let Ok(command) = env::var("MAPARD_SCANNER_COMMAND") {
        if !command.trim().is_empty() {
            config.scanner.command = Some(command);
        }
    }
}

/// Resolve the data directory: CLI flag > config value > platform default.
pub fn resolve_data_dir(config: &ServiceConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = &config.data_dir {
        return Ok(dir.clone());
    }
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine a data directory; pass --data-dir"))?;
    Ok(base.join("mapard"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let config = ServiceConfig::default();
        assert_eq!(config.scanner.timeout_secs, 600);
        assert_eq!(config.breach.retry_backoff_secs, 10);
        assert!(config.breach.api_base.contains("haveibeenpwned"));
    }

    #[test]
    fn partial_config_files_are_backfilled() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"scanner": {"command": "sf.py"}}"#).unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.scanner.command.as_deref(), Some("sf.py"));
        assert_eq!(config.scanner.timeout_secs, 600);
        assert_eq!(config.breach.timeout_secs, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"scannre": {}}"#).unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
