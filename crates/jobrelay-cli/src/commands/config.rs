use anyhow::Result;
use std::path::Path;

use jobrelay_executor::config::redact;
use jobrelay_server::JobrelayConfig;

use crate::ConfigAction;

/// Handle config subcommands.
pub fn handle(action: ConfigAction, state_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = JobrelayConfig::config_path(state_dir);
            if path.exists() {
                println!("Config already exists at: {}", path.display());
                println!("Use `jobrelay config show` to view it.");
                return Ok(());
            }

            let config = JobrelayConfig::default();
            config.save(state_dir)?;
            println!("Created default config at: {}", path.display());
            println!();
            print_config(&config);
        }

        ConfigAction::Show => {
            let config = JobrelayConfig::load_with_env(state_dir)?;
            print_config(&config);
        }
    }
    Ok(())
}

fn print_config(config: &JobrelayConfig) {
    let executor = &config.executor;
    println!("Configuration:");
    println!("  listen_addr:          {}", config.listen_addr);
    println!("  persist:              {}", config.persist);
    println!("  log_format:           {}", config.log_format);
    println!("  api_key:              {}", redact(&executor.api_key));
    println!("  api_base:             {}", executor.api_base);
    println!("  model:                {}", executor.model);
    println!("  max_tokens:           {}", executor.max_tokens);
    println!("  api_version:          {}", executor.api_version);
    match executor.timeout_secs {
        Some(secs) => println!("  timeout_secs:         {secs}"),
        None => println!("  timeout_secs:         (transport default)"),
    }
    println!("  max_retries:          {}", executor.max_retries);
    println!("  simulation_delay_ms:  {}", executor.simulation_delay_ms);
}
