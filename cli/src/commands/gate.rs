use clap::Subcommand;

use crate::util::{api_request, require_estimate_id};

#[derive(Subcommand)]
pub enum GateCommands {
    /// Check whether an estimate may proceed to a high-commitment action
    Check {
        /// Action to check (see GET /v1/system/config for the catalog)
        #[arg(long, default_value = "request_site_visit")]
        action: String,
    },
}

pub async fn run(api_url: &str, estimate_id: Option<String>, command: GateCommands) -> i32 {
    match command {
        GateCommands::Check { action } => {
            let estimate_id = require_estimate_id(estimate_id);
            api_request(
                api_url,
                reqwest::Method::GET,
                &format!("/v1/gate/{estimate_id}/{action}"),
                None,
                &[],
            )
            .await
        }
    }
}
