use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "switchboard.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session_expiration_secs: i64,
    /// 0 disables the background sweep; expiry is still enforced on access.
    pub sweep_interval_secs: u64,
    pub tool_timeout_ms: u64,
    pub handler_fuel: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_catalog: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_bases: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_expiration_secs: 3600,
            sweep_interval_secs: 0,
            tool_timeout_ms: 5000,
            handler_fuel: 50_000,
            tool_catalog: None,
            knowledge_bases: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_expiration_secs <= 0 {
            bail!("session_expiration_secs must be positive");
        }
        self.session_expiration()?;
        if self.tool_timeout_ms == 0 {
            bail!("tool_timeout_ms must be positive");
        }
        if self.handler_fuel == 0 {
            bail!("handler_fuel must be positive");
        }
        if self.log_filter.trim().is_empty() {
            bail!("log_filter cannot be empty");
        }
        Ok(())
    }

    pub fn session_expiration(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.session_expiration_secs).with_context(|| {
            format!(
                "session_expiration_secs is out of range: {}",
                self.session_expiration_secs
            )
        })
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("switchboard.toml");
        std::fs::write(
            &path,
            "session_expiration_secs = 60\ntool_catalog = \"tools.yaml\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.session_expiration().unwrap(),
            chrono::Duration::seconds(60)
        );
        assert_eq!(config.tool_catalog, Some(PathBuf::from("tools.yaml")));
        assert_eq!(config.tool_timeout(), Duration::from_millis(5000));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("switchboard.toml");
        let config = Config {
            sweep_interval_secs: 30,
            knowledge_bases: Some(PathBuf::from("kbs.yaml")),
            ..Config::default()
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.sweep_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("switchboard.toml");
        std::fs::write(&path, "session_expiration_secs = \"soon\"").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_expiration() {
        let config = Config {
            session_expiration_secs: i64::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(config.session_expiration().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            session_expiration_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            tool_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
