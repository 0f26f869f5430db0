use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::net::DEFAULT_PORT;
use crate::store::{DEFAULT_CHUNK_CAPACITY, DEFAULT_MAX_CHUNKS};

/// Default reporting interval, rearmed after every wake.
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub listen: ListenConfig,
    pub store: StoreConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub chunk_capacity: usize,
    pub max_chunks: usize, // hard memory bound, samples past it are dropped
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub interval_secs: u64,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

impl Default for ListenConfig {
    fn default() -> Self {
        ListenConfig { port: DEFAULT_PORT }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            format: ReportFormat::Text,
        }
    }
}

impl ProbeConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ProbeConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.chunk_capacity == 0 {
            bail!("store.chunk_capacity must be at least 1");
        }
        if self.store.max_chunks == 0 {
            bail!("store.max_chunks must be at least 1");
        }
        if self.report.interval_secs == 0 {
            bail!("report.interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.listen.port, 5000);
        assert_eq!(config.store.chunk_capacity, 8191);
        assert_eq!(config.store.max_chunks, 4097);
        assert_eq!(config.report_interval(), Duration::from_secs(10));
        assert_eq!(config.report.format, ReportFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"listen": {{"port": 6000}}, "report": {{"format": "json"}}}}"#
        )
        .unwrap();

        let config = ProbeConfig::load(file.path()).unwrap();
        assert_eq!(config.listen.port, 6000);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.interval_secs, 10);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProbeConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(ProbeConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = ProbeConfig::default();
        config.store.chunk_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = ProbeConfig::default();
        config.store.max_chunks = 0;
        assert!(config.validate().is_err());

        let mut config = ProbeConfig::default();
        config.report.interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
