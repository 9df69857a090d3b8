use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use jobrelay_types::{JobRecord, NamedPromptProfile};

use crate::config::JobrelayConfig;

/// Jobs and prompt profiles as written to the state file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    #[serde(default)]
    pub jobs: HashMap<Uuid, JobRecord>,
    #[serde(default)]
    pub prompts: HashMap<Uuid, NamedPromptProfile>,
}

impl PersistedState {
    /// Fail every job still marked running. A previous process died while
    /// those executions were in flight, so no result will ever arrive.
    pub fn recover_interrupted(&mut self) -> usize {
        let mut recovered = 0;
        for record in self.jobs.values_mut() {
            if record.fail_if_interrupted() {
                tracing::warn!(job_id = %record.id(), "marking interrupted job as failed");
                recovered += 1;
            }
        }
        recovered
    }
}

/// JSON snapshot store for the job service.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the location `config` names, or `None` when persistence is off.
    pub fn from_config(config: &JobrelayConfig, state_dir: &Path) -> Option<Self> {
        config.state_path(state_dir).map(Self::new)
    }

    /// Read the snapshot, recovering jobs a previous process left running.
    /// A missing file is an empty state.
    pub fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut state: PersistedState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        if state.recover_interrupted() > 0 {
            self.save(&state)?;
        }
        Ok(state)
    }

    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let tmp_path = self.tmp_path();
        let content = serde_json::to_vec_pretty(state).context("Failed to serialize state")?;
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// [`FileStore::save`] on the blocking pool, for use from request handlers.
    pub async fn save_in_background(&self, state: PersistedState) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save(&state))
            .await
            .context("State writer task failed")?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
