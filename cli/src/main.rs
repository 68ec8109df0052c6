use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::{config, event, gate, health, profile};
use util::{DEFAULT_API_URL, load_config};

#[derive(Parser)]
#[command(
    name = "signalfold",
    version,
    about = "Signalfold CLI — engagement scoring and readiness checks for pricing estimates"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "SIGNALFOLD_API_URL")]
    api_url: Option<String>,

    /// Estimate id to act on (most commands need one)
    #[arg(long, env = "SIGNALFOLD_ESTIMATE_ID")]
    estimate_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Send or validate engagement events
    Event {
        #[command(subcommand)]
        command: event::EventCommands,
    },
    /// Inspect engagement profiles
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },
    /// Check gate decisions for an estimate
    Gate {
        #[command(subcommand)]
        command: gate::GateCommands,
    },
    /// Manage stored CLI defaults
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let stored = load_config();
    let api_url = cli
        .api_url
        .or(stored.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let estimate_id = cli.estimate_id.or(stored.estimate_id);

    let code = match cli.command {
        Commands::Health => health::run(&api_url).await,
        Commands::Event { command } => event::run(&api_url, estimate_id, command).await,
        Commands::Profile { command } => profile::run(&api_url, estimate_id, command).await,
        Commands::Gate { command } => gate::run(&api_url, estimate_id, command).await,
        Commands::Config { command } => config::run(command).await,
    };

    std::process::exit(code);
}
