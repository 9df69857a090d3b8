mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use jobrelay_server::JobrelayConfig;

#[derive(Parser)]
#[command(name = "jobrelay", about = "Relay coding jobs to the Anthropic Messages API")]
pub struct Cli {
    /// State directory holding config.toml and state.json
    #[arg(long, global = true, env = "JOBRELAY_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single job and print the result
    Run(RunArgs),
    /// Serve the REST API
    Serve {
        /// Override the listen address from config
        #[arg(long)]
        listen: Option<String>,
    },
    /// Show whether a provider credential is configured
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Job type (debug, refactor, feature, ...)
    #[arg(long = "type")]
    pub job_type: String,
    /// Instructions for the model
    #[arg(long)]
    pub prompt: String,
    /// File the job concerns (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,
    /// Path whose contents are sent as the current code
    #[arg(long)]
    pub code_file: Option<PathBuf>,
    /// Raw context_data JSON, overriding --file and --code-file
    #[arg(long, conflicts_with_all = ["files", "code_file"])]
    pub context: Option<String>,
    /// Replace the default system prompt
    #[arg(long)]
    pub system_prompt: Option<String>,
    /// Model to use instead of the configured one
    #[arg(long)]
    pub model: Option<String>,
    /// Simulate even if a credential is configured
    #[arg(long)]
    pub simulate: bool,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default config file
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(JobrelayConfig::default_state_dir);

    match cli.command {
        Commands::Run(args) => {
            let config = JobrelayConfig::load_with_env(&state_dir)?;
            jobrelay_server::init_tracing(config.json_logs(), "warn");
            commands::run::handle(args, &config).await
        }
        Commands::Serve { listen } => {
            let mut config = JobrelayConfig::load_with_env(&state_dir)?;
            if let Some(addr) = listen {
                config.listen_addr = addr;
            }
            jobrelay_server::init_tracing(config.json_logs(), "info");
            jobrelay_server::serve(config, &state_dir).await
        }
        Commands::Status => {
            let config = JobrelayConfig::load_with_env(&state_dir)?;
            commands::status::handle(&config);
            Ok(())
        }
        Commands::Config { action } => commands::config::handle(action, &state_dir),
    }
}
