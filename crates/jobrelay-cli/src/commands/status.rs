use jobrelay_executor::API_KEY_ENV;
use jobrelay_server::JobrelayConfig;

/// Handle the `status` command.
pub fn handle(config: &JobrelayConfig) {
    let executor = &config.executor;
    if executor.is_configured() {
        println!("Provider credential: configured");
    } else {
        println!("Provider credential: not configured (set {API_KEY_ENV}); jobs will be simulated");
    }
    println!("  endpoint: {}", executor.messages_url());
    println!("  model:    {}", executor.model);
}
