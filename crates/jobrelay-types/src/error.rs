use thiserror::Error;

use crate::job::{JobEvent, JobStatus};

/// Everything that can go wrong inside a single job execution.
///
/// These never escape the executor: they are folded into
/// `ExecutionResult::Failure` at the boundary.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    #[error("Request to provider failed: {0}")]
    Transport(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Failed to parse provider response: {0}")]
    ResponseParse(String),
}

impl ExecutorError {
    /// Whether a retry could plausibly change the outcome.
    pub fn is_transient(&self) -> bool {
        match self {
            ExecutorError::Transport(_) => true,
            ExecutorError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum JobRelayError {
    #[error("Status transition error: cannot transition from {from:?} via {event:?}")]
    InvalidStatusTransition { from: JobStatus, event: JobEvent },

    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Prompt profile not found: {0}")]
    PromptProfileNotFound(uuid::Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, JobRelayError>;
