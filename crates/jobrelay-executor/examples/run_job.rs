use jobrelay_executor::{ClaudeApiExecutor, ExecutorConfig, JobExecutor};
use jobrelay_types::{ContextData, Job};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== jobrelay: Run Job Example ===\n");

    let job = Job::new("refactor", "Replace the var declarations with const/let.").with_context(
        &ContextData {
            files: Some(vec!["src/cart.js".into(), "src/checkout.js".into()]),
            current_code: Some("var total = 0;\nvar items = [];".into()),
        },
    );
    println!("Created job: {} (type: {})", job.id, job.job_type);

    let executor = ClaudeApiExecutor::new(ExecutorConfig::default().with_env_overrides())?;
    if executor.is_configured() {
        println!("Credential found, calling the provider...\n");
    } else {
        println!("No credential configured, simulating...\n");
    }

    let result = executor.run(&job, None).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
