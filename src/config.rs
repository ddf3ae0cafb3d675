//! Configuration loading and management
//!
//! Handles parsing of `kogura.toml` in the data directory and locating the
//! data directory itself.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::parse_utc_offset;

/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "kogura.toml";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "KOGURA_DATA_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Grouping configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Interpretation service configuration
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

/// Grouping-related configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Fixed offset used to decide which day a task falls on
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_utc_offset() -> String {
    "+09:00".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

impl ScheduleConfig {
    pub fn zone(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Interpretation service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Chat-completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl InterpreterConfig {
    fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "interpreter.endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "interpreter.model cannot be empty".to_string(),
            ));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "interpreter.api_key_env cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "interpreter.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `kogura.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults when
    /// no config file exists. An invalid file is an error.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        crate::storage::write_atomic(path, content.as_bytes())
    }

    /// The grouping zone
    pub fn zone(&self) -> Result<FixedOffset> {
        self.schedule.zone()
    }

    fn validate(&self) -> Result<()> {
        self.schedule.zone()?;
        self.interpreter.validate()?;
        Ok(())
    }
}

/// Resolve the data directory: explicit flag, then `KOGURA_DATA_DIR`, then
/// the platform data directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(raw) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(raw));
    }
    ProjectDirs::from("", "", "kogura")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| Error::DataDir(PathBuf::from("<unknown home>")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.schedule.utc_offset, "+09:00");
        assert_eq!(cfg.zone().expect("zone").local_minus_utc(), 9 * 3600);
        assert_eq!(
            cfg.interpreter.endpoint,
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(cfg.interpreter.model, "deepseek-chat");
        assert_eq!(cfg.interpreter.api_key_env, "DEEPSEEK_API_KEY");
        assert_eq!(cfg.interpreter.timeout_secs, 30);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[schedule]
utc_offset = "-05:00"

[interpreter]
endpoint = "http://127.0.0.1:9000/v1/chat/completions"
model = "local-model"
api_key_env = "LOCAL_KEY"
timeout_secs = 5
"#;
        fs::write(&path, content).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.zone().expect("zone").local_minus_utc(), -5 * 3600);
        assert_eq!(cfg.interpreter.model, "local-model");
        assert_eq!(cfg.interpreter.api_key_env, "LOCAL_KEY");
        assert_eq!(cfg.interpreter.timeout_secs, 5);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), "[interpreter]\nmodel = \"m\"\n")
            .expect("write config");

        let cfg = Config::load_or_default(dir.path()).expect("load config");
        assert_eq!(cfg.interpreter.model, "m");
        assert_eq!(cfg.interpreter.timeout_secs, 30);
        assert_eq!(cfg.schedule, ScheduleConfig::default());
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);

        fs::write(&path, "[schedule]\nutc_offset = \"Asia/Tokyo\"\n").expect("write");
        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, "[interpreter]\ntimeout_secs = 0\n").expect("write");
        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, "[interpreter]\nendpoint = \"ftp://x\"\n").expect("write");
        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, "not = [valid").expect("write");
        assert!(matches!(Config::load(&path), Err(Error::TomlParse(_))));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.schedule.utc_offset = "+05:30".to_string();
        cfg.save(&path).expect("save");
        assert_eq!(Config::load(&path).expect("load"), cfg);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            resolve_data_dir(Some(dir.path())).expect("data dir"),
            dir.path()
        );
    }
}
