pub mod claude;
pub mod config;
pub mod prompt;
pub mod simulate;

use async_trait::async_trait;

use jobrelay_types::{ExecutionResult, Job, PromptProfile};

/// Trait for job executors.
///
/// Every method returns a plain [`ExecutionResult`]; implementations must fold
/// their own failures into `ExecutionResult::Failure` instead of panicking or
/// returning errors.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Send a job to the provider and normalize the outcome.
    async fn execute(&self, job: &Job, profile: Option<&PromptProfile>) -> ExecutionResult;

    /// Whether a usable credential is present.
    fn is_configured(&self) -> bool;

    /// Offline stand-in for `execute`, used when no credential is configured.
    async fn simulate_job(&self, job: &Job) -> ExecutionResult;

    /// Execute against the provider when configured, simulate otherwise.
    async fn run(&self, job: &Job, profile: Option<&PromptProfile>) -> ExecutionResult {
        if self.is_configured() {
            self.execute(job, profile).await
        } else {
            tracing::info!(job_id = %job.id, "no API credential configured, simulating job");
            self.simulate_job(job).await
        }
    }

    /// Name of this executor.
    fn name(&self) -> &str;
}

pub use claude::ClaudeApiExecutor;
pub use config::{ExecutorConfig, API_KEY_ENV, API_KEY_PLACEHOLDER};
pub use prompt::{build_prompt, system_prompt_for, DEFAULT_SYSTEM_PROMPT};
