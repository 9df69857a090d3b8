use anyhow::Result;

use jobrelay_server::JobrelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let state_dir = JobrelayConfig::default_state_dir();
    let config = JobrelayConfig::load_with_env(&state_dir)?;
    jobrelay_server::init_tracing(config.json_logs(), "info");
    jobrelay_server::serve(config, &state_dir).await
}
