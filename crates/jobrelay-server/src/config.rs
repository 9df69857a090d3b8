use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use jobrelay_executor::ExecutorConfig;

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "JOBRELAY_STATE_DIR";

/// Top-level configuration for jobrelay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobrelayConfig {
    /// Address the REST service binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Write jobs and prompt profiles to `state_file` after every change.
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// State file name, relative to the state directory.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Log output format: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Provider settings.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_persist() -> bool {
    true
}

fn default_state_file() -> String {
    "state.json".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for JobrelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            persist: default_persist(),
            state_file: default_state_file(),
            log_format: default_log_format(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl JobrelayConfig {
    /// Default state directory: `$JOBRELAY_STATE_DIR` or `~/.jobrelay/`.
    pub fn default_state_dir() -> PathBuf {
        match std::env::var(STATE_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".jobrelay"),
        }
    }

    /// Where persisted jobs live, or `None` when persistence is off.
    pub fn state_path(&self, state_dir: &Path) -> Option<PathBuf> {
        self.persist.then(|| state_dir.join(&self.state_file))
    }

    /// Config file path within the state directory.
    pub fn config_path(state_dir: &Path) -> PathBuf {
        state_dir.join("config.toml")
    }

    /// Load config from disk. Returns default if not found.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = Self::config_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load config from disk and apply environment overrides.
    pub fn load_with_env(state_dir: &Path) -> Result<Self> {
        let mut config = Self::load(state_dir)?;
        config.executor = config.executor.with_env_overrides();
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = Self::config_path(state_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
