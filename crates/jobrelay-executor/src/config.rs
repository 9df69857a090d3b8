use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that supplies the provider credential.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Sentinel credential meaning "not configured".
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Connection and request settings for [`crate::ClaudeApiExecutor`].
#[derive(Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Provider credential. Usually supplied through [`API_KEY_ENV`].
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Base URL of the provider, without the `/v1/messages` suffix.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Output token budget sent with every request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Whole-request timeout. `None` leaves the transport default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra attempts after a transient failure. Zero disables retries.
    #[serde(default)]
    pub max_retries: u32,

    /// Artificial delay before a simulated job completes.
    #[serde(default = "default_simulation_delay_ms")]
    pub simulation_delay_ms: u64,
}

fn default_api_key() -> String {
    API_KEY_PLACEHOLDER.to_string()
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_simulation_delay_ms() -> u64 {
    2000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_secs: None,
            max_retries: 0,
            simulation_delay_ms: default_simulation_delay_ms(),
        }
    }
}

impl fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("simulation_delay_ms", &self.simulation_delay_ms)
            .finish()
    }
}

impl ExecutorConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Take the credential from [`API_KEY_ENV`] when it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
        self
    }

    /// True iff a credential other than the placeholder is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != API_KEY_PLACEHOLDER
    }

    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn simulation_delay(&self) -> Duration {
        Duration::from_millis(self.simulation_delay_ms)
    }
}

/// Mask a credential for display, keeping a short prefix.
pub fn redact(key: &str) -> String {
    if key.is_empty() || key == API_KEY_PLACEHOLDER {
        return key.to_string();
    }
    let prefix: String = key.chars().take(6).collect();
    format!("{prefix}…")
}
