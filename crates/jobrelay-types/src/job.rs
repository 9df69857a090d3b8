use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ExecutorError, JobRelayError};

/// Kind of coding work a job asks for.
///
/// Serialized as a plain lowercase string. Any string outside the known set is
/// kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    Debug,
    Refactor,
    Feature,
    Other(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::Debug => "debug",
            JobType::Refactor => "refactor",
            JobType::Feature => "feature",
            JobType::Other(s) => s,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<String> for JobType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "debug" => JobType::Debug,
            "refactor" => JobType::Refactor,
            "feature" => JobType::Feature,
            _ => JobType::Other(s),
        }
    }
}

impl From<&str> for JobType {
    fn from(s: &str) -> Self {
        JobType::from(s.to_string())
    }
}

impl From<JobType> for String {
    fn from(t: JobType) -> Self {
        match t {
            JobType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context carried inside `Job::context_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_code: Option<String>,
}

/// A coding job to hand to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub input_prompt: String,
    /// Serialized JSON for a [`ContextData`]. Kept as raw text so that a
    /// malformed payload surfaces at execution time rather than at intake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<String>,
}

impl Job {
    pub fn new(job_type: impl Into<JobType>, input_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            input_prompt: input_prompt.into(),
            context_data: None,
        }
    }

    /// Attach already-serialized context data.
    pub fn with_raw_context(mut self, raw: impl Into<String>) -> Self {
        self.context_data = Some(raw.into());
        self
    }

    /// Serialize and attach structured context data.
    pub fn with_context(mut self, context: &ContextData) -> Self {
        // ContextData only holds strings, serialization cannot fail.
        self.context_data = serde_json::to_string(context).ok();
        self
    }

    /// Check the fields every execution requires.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.job_type.is_empty() {
            return Err(ExecutorError::InvalidJob("job type is empty".to_string()));
        }
        if self.input_prompt.trim().is_empty() {
            return Err(ExecutorError::InvalidJob("input prompt is empty".to_string()));
        }
        Ok(())
    }

    /// Deserialize `context_data`. An absent payload yields an empty context.
    pub fn context(&self) -> Result<ContextData, ExecutorError> {
        match &self.context_data {
            None => Ok(ContextData::default()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                ExecutorError::RequestBuild(format!("context_data is not valid: {e}"))
            }),
        }
    }
}

/// Caller-supplied override of the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptProfile {
    pub system_prompt: String,
}

impl PromptProfile {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }
}

/// A prompt profile kept by the service so callers can refer to it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPromptProfile {
    pub id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
}

impl NamedPromptProfile {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> PromptProfile {
        PromptProfile::new(self.system_prompt.clone())
    }
}

/// Lifecycle of a stored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Events that drive job status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEvent {
    Start,
    Succeed,
    Fail,
}

impl JobStatus {
    /// Attempt a status transition given an event.
    pub fn transition(self, event: JobEvent) -> crate::error::Result<JobStatus> {
        match (self, event) {
            // Finished jobs may be run again.
            (JobStatus::Pending | JobStatus::Completed | JobStatus::Failed, JobEvent::Start) => {
                Ok(JobStatus::Running)
            }
            (JobStatus::Running, JobEvent::Succeed) => Ok(JobStatus::Completed),
            (JobStatus::Running, JobEvent::Fail) => Ok(JobStatus::Failed),
            (status, event) => Err(JobRelayError::InvalidStatusTransition { from: status, event }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A job together with its bookkeeping, as held by the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job: Job,
    /// Opaque label supplied by the caller, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<crate::ExecutionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        let now = Utc::now();
        Self {
            job,
            project: None,
            status: JobStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = project;
        self
    }

    pub fn id(&self) -> Uuid {
        self.job.id
    }

    /// Apply a status transition event.
    pub fn apply_event(&mut self, event: JobEvent) -> crate::error::Result<()> {
        self.status = self.status.transition(event)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the outcome of an execution and move to the matching terminal status.
    pub fn finish(&mut self, result: crate::ExecutionResult) -> crate::error::Result<()> {
        let event = if result.is_success() {
            JobEvent::Succeed
        } else {
            JobEvent::Fail
        };
        self.apply_event(event)?;
        self.result = Some(result);
        Ok(())
    }

    /// Fail a record left in `Running` by a process that went away mid-execution.
    /// Returns whether anything changed.
    pub fn fail_if_interrupted(&mut self) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Failed;
        self.result = Some(crate::ExecutionResult::failure(INTERRUPTED_ERROR));
        self.updated_at = Utc::now();
        true
    }
}

/// Failure recorded for jobs whose execution never reported back.
pub const INTERRUPTED_ERROR: &str = "Execution was interrupted before it completed";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutionResult, TokenUsage};

    #[test]
    fn test_job_type_roundtrip_known_and_other() {
        assert_eq!(JobType::from("debug"), JobType::Debug);
        assert_eq!(JobType::from("docs"), JobType::Other("docs".to_string()));

        let json = serde_json::to_string(&JobType::Refactor).unwrap();
        assert_eq!(json, "\"refactor\"");
        let parsed: JobType = serde_json::from_str("\"migration\"").unwrap();
        assert_eq!(parsed.as_str(), "migration");
    }

    #[test]
    fn test_job_serializes_type_field() {
        let job = Job::new("feature", "add a button");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["type"], "feature");
        assert!(value.get("context_data").is_none());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(Job::new("", "prompt").validate().is_err());
        assert!(Job::new("debug", "   ").validate().is_err());
        assert!(Job::new("debug", "fix it").validate().is_ok());
    }

    #[test]
    fn test_context_absent_is_empty() {
        let job = Job::new("debug", "fix it");
        assert_eq!(job.context().unwrap(), ContextData::default());
    }

    #[test]
    fn test_context_malformed_is_request_build_error() {
        let job = Job::new("debug", "fix it").with_raw_context("{not json");
        match job.context() {
            Err(ExecutorError::RequestBuild(msg)) => assert!(msg.contains("context_data")),
            other => panic!("expected RequestBuild, got {other:?}"),
        }
    }

    #[test]
    fn test_context_roundtrip_through_job() {
        let ctx = ContextData {
            files: Some(vec!["a.ts".into(), "b.ts".into()]),
            current_code: Some("x=1".into()),
        };
        let job = Job::new("refactor", "tidy").with_context(&ctx);
        assert_eq!(job.context().unwrap(), ctx);
    }

    #[test]
    fn test_status_lifecycle() {
        let status = JobStatus::Pending.transition(JobEvent::Start).unwrap();
        assert_eq!(status, JobStatus::Running);
        let status = status.transition(JobEvent::Succeed).unwrap();
        assert_eq!(status, JobStatus::Completed);
        assert!(status.is_terminal());
        let status = status.transition(JobEvent::Start).unwrap();
        assert_eq!(status, JobStatus::Running);
    }

    #[test]
    fn test_status_rejects_double_start() {
        let result = JobStatus::Running.transition(JobEvent::Start);
        assert!(result.is_err());
        assert!(JobStatus::Pending.transition(JobEvent::Succeed).is_err());
    }

    #[test]
    fn test_record_finish_sets_status_from_result() {
        let mut record = JobRecord::new(Job::new("debug", "fix"));
        record.apply_event(JobEvent::Start).unwrap();
        record
            .finish(ExecutionResult::success("done", TokenUsage::new(1, 2)))
            .unwrap();
        assert_eq!(record.status, JobStatus::Completed);

        record.apply_event(JobEvent::Start).unwrap();
        record.finish(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.result.unwrap().error(), Some("boom"));
    }

    #[test]
    fn test_interrupted_record_can_be_rerun() {
        let mut record = JobRecord::new(Job::new("debug", "fix"));
        assert!(!record.fail_if_interrupted());
        assert_eq!(record.status, JobStatus::Pending);

        record.apply_event(JobEvent::Start).unwrap();
        assert!(record.fail_if_interrupted());
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(
            record.result.as_ref().and_then(|r| r.error()),
            Some(INTERRUPTED_ERROR)
        );
        assert!(record.apply_event(JobEvent::Start).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn prop_job_type_string_is_preserved(s in "[a-z_-]{0,16}") {
            let t = JobType::from(s.clone());
            proptest::prop_assert_eq!(String::from(t), s);
        }
    }
}
