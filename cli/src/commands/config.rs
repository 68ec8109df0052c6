use clap::Subcommand;
use serde_json::json;

use crate::util::{config_path, exit_error, load_config, save_config};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the stored defaults and where they live
    Show,
    /// Persist default values so flags can be omitted
    Set {
        /// Default API base URL
        #[arg(long)]
        api_url: Option<String>,
        /// Default estimate id for event/profile/gate commands
        #[arg(long)]
        estimate_id: Option<String>,
    },
}

pub async fn run(command: ConfigCommands) -> i32 {
    match command {
        ConfigCommands::Show => {
            let config = load_config();
            let output = json!({
                "config_path": config_path().to_string_lossy(),
                "api_url": config.api_url,
                "estimate_id": config.estimate_id,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            0
        }
        ConfigCommands::Set {
            api_url,
            estimate_id,
        } => {
            if api_url.is_none() && estimate_id.is_none() {
                exit_error(
                    "Nothing to set",
                    Some("Pass --api-url and/or --estimate-id"),
                );
            }
            let mut config = load_config();
            if api_url.is_some() {
                config.api_url = api_url;
            }
            if estimate_id.is_some() {
                config.estimate_id = estimate_id;
            }
            if let Err(e) = save_config(&config) {
                eprintln!("Failed to save config: {e}");
                return 4;
            }
            let output = json!({
                "status": "saved",
                "config_path": config_path().to_string_lossy(),
                "api_url": config.api_url,
                "estimate_id": config.estimate_id,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            0
        }
    }
}
