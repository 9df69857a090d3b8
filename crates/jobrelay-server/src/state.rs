use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use jobrelay_executor::JobExecutor;
use jobrelay_types::{
    ExecutionResult, Job, JobEvent, JobRecord, JobRelayError, NamedPromptProfile, PromptProfile,
    Result,
};

use crate::store::{FileStore, PersistedState};

/// Shared application state for the REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn JobExecutor>,
    pub jobs: Arc<DashMap<Uuid, JobRecord>>,
    pub prompts: Arc<DashMap<Uuid, NamedPromptProfile>>,
    /// Held across the whole write so snapshots land on disk in order.
    store: Option<Arc<Mutex<FileStore>>>,
}

impl AppState {
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            executor,
            jobs: Arc::new(DashMap::new()),
            prompts: Arc::new(DashMap::new()),
            store: None,
        }
    }

    /// Load previously persisted jobs and profiles and keep saving to `store`.
    pub fn with_store(mut self, store: FileStore) -> anyhow::Result<Self> {
        let persisted = store.load()?;
        tracing::info!(
            path = %store.path().display(),
            jobs = persisted.jobs.len(),
            prompts = persisted.prompts.len(),
            "loaded persisted state"
        );
        for (id, record) in persisted.jobs {
            self.jobs.insert(id, record);
        }
        for (id, profile) in persisted.prompts {
            self.prompts.insert(id, profile);
        }
        self.store = Some(Arc::new(Mutex::new(store)));
        Ok(self)
    }

    pub fn job(&self, id: Uuid) -> Result<JobRecord> {
        self.jobs
            .get(&id)
            .map(|r| r.clone())
            .ok_or(JobRelayError::JobNotFound(id))
    }

    pub fn prompt_profile(&self, id: Uuid) -> Result<PromptProfile> {
        self.prompts
            .get(&id)
            .map(|p| p.profile())
            .ok_or(JobRelayError::PromptProfileNotFound(id))
    }

    /// Move a job to `Running` and hand back what the executor needs.
    pub fn start_job(&self, id: Uuid) -> Result<Job> {
        let mut record = self
            .jobs
            .get_mut(&id)
            .ok_or(JobRelayError::JobNotFound(id))?;
        record.apply_event(JobEvent::Start)?;
        Ok(record.job.clone())
    }

    /// Store the outcome of a running job.
    pub fn finish_job(&self, id: Uuid, result: ExecutionResult) -> Result<JobRecord> {
        let mut record = self
            .jobs
            .get_mut(&id)
            .ok_or(JobRelayError::JobNotFound(id))?;
        record.finish(result)?;
        Ok(record.clone())
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            jobs: self
                .jobs
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect(),
            prompts: self
                .prompts
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect(),
        }
    }

    /// Write the current state to disk, if a store is attached.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let store = store.lock().await;
        if let Err(e) = store.save_in_background(self.snapshot()).await {
            tracing::error!("Failed to persist state: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobrelay_types::{JobStatus, TokenUsage};

    struct EchoExecutor;

    #[async_trait]
    impl JobExecutor for EchoExecutor {
        async fn execute(&self, job: &Job, _profile: Option<&PromptProfile>) -> ExecutionResult {
            ExecutionResult::success(job.input_prompt.clone(), TokenUsage::new(1, 1))
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn simulate_job(&self, job: &Job) -> ExecutionResult {
            self.execute(job, None).await
        }

        fn name(&self) -> &str {
            "EchoExecutor"
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(EchoExecutor))
    }

    #[test]
    fn test_lookups_report_missing_ids() {
        let state = state();
        let id = Uuid::new_v4();
        assert!(matches!(state.job(id), Err(JobRelayError::JobNotFound(i)) if i == id));
        assert!(matches!(state.start_job(id), Err(JobRelayError::JobNotFound(_))));
        assert!(matches!(
            state.prompt_profile(id),
            Err(JobRelayError::PromptProfileNotFound(i)) if i == id
        ));
    }

    #[test]
    fn test_start_and_finish_job() {
        let state = state();
        let record = JobRecord::new(Job::new("debug", "fix"));
        let id = record.id();
        state.jobs.insert(id, record);

        let job = state.start_job(id).unwrap();
        assert_eq!(job.input_prompt, "fix");
        assert!(matches!(
            state.start_job(id),
            Err(JobRelayError::InvalidStatusTransition { .. })
        ));

        let finished = state
            .finish_job(id, ExecutionResult::failure("boom"))
            .unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(state.job(id).unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_persist_writes_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = state().with_store(FileStore::new(&path)).unwrap();

        let profile = NamedPromptProfile::new("terse", "Be brief.");
        state.prompts.insert(profile.id, profile.clone());
        state.persist().await;

        let reloaded = FileStore::new(&path).load().unwrap();
        assert_eq!(reloaded.prompts[&profile.id], profile);
    }
}
