use std::time::Duration;

use jobrelay_types::{ExecutionResult, Job, TokenUsage};

/// Placeholder usage reported by simulated runs.
pub const SIMULATED_USAGE: TokenUsage = TokenUsage {
    input_tokens: 100,
    output_tokens: 50,
};

/// Wait `delay`, then return a canned success that echoes the job.
///
/// Never touches the network.
pub async fn simulate_job(job: &Job, delay: Duration) -> ExecutionResult {
    tokio::time::sleep(delay).await;

    let output = format!(
        "[simulated] {} job completed.\n\nPrompt: {}\n\n\
         Set ANTHROPIC_API_KEY to run jobs against the live API.",
        job.job_type, job.input_prompt
    );

    ExecutionResult::success(output, SIMULATED_USAGE)
}
