use anyhow::{Context, Result, bail};

use jobrelay_executor::{ClaudeApiExecutor, ExecutorConfig, JobExecutor};
use jobrelay_server::JobrelayConfig;
use jobrelay_types::{ContextData, ExecutionResult, Job, PromptProfile};

use crate::RunArgs;

/// Handle the `run` command.
pub async fn handle(args: RunArgs, config: &JobrelayConfig) -> Result<()> {
    let job = build_job(&args)?;
    let profile = args.system_prompt.clone().map(PromptProfile::new);
    let executor = ClaudeApiExecutor::new(executor_config(&args, config))?;

    if !args.simulate && !executor.is_configured() {
        eprintln!(
            "{} is not set, simulating the job.",
            jobrelay_executor::API_KEY_ENV
        );
    }

    let result = if args.simulate {
        executor.simulate_job(&job).await
    } else {
        executor.run(&job, profile.as_ref()).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if let ExecutionResult::Failure { error } = result {
        bail!("Job {} failed: {error}", job.id);
    }
    Ok(())
}

fn executor_config(args: &RunArgs, config: &JobrelayConfig) -> ExecutorConfig {
    match &args.model {
        Some(model) => config.executor.clone().with_model(model.as_str()),
        None => config.executor.clone(),
    }
}

/// Turn command-line arguments into a job.
pub fn build_job(args: &RunArgs) -> Result<Job> {
    let job = Job::new(args.job_type.as_str(), args.prompt.as_str());

    if let Some(raw) = &args.context {
        return Ok(job.with_raw_context(raw.as_str()));
    }

    let current_code = match &args.code_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    if args.files.is_empty() && current_code.is_none() {
        return Ok(job);
    }

    let context = ContextData {
        files: (!args.files.is_empty()).then(|| args.files.clone()),
        current_code,
    };
    Ok(job.with_context(&context))
}

fn print_result(result: &ExecutionResult) {
    match result {
        ExecutionResult::Success { output, usage } => {
            println!("{output}");
            eprintln!();
            eprintln!(
                "tokens: {} in / {} out",
                usage.input_tokens, usage.output_tokens
            );
        }
        ExecutionResult::Failure { error } => {
            eprintln!("Job failed: {error}");
        }
    }
}
