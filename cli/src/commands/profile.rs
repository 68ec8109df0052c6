use clap::Subcommand;

use crate::util::{api_request, require_estimate_id};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Get the engagement view for one estimate
    Get,
    /// List engagement views, most recently active first
    List {
        /// Maximum profiles per page (default 50, max 200)
        #[arg(long)]
        limit: Option<u32>,
        /// Pagination cursor from a previous response
        #[arg(long)]
        cursor: Option<String>,
    },
}

pub async fn run(api_url: &str, estimate_id: Option<String>, command: ProfileCommands) -> i32 {
    match command {
        ProfileCommands::Get => {
            let estimate_id = require_estimate_id(estimate_id);
            api_request(
                api_url,
                reqwest::Method::GET,
                &format!("/v1/profiles/{estimate_id}"),
                None,
                &[],
            )
            .await
        }
        ProfileCommands::List { limit, cursor } => {
            let mut query = Vec::new();
            if let Some(l) = limit {
                query.push(("limit".to_string(), l.to_string()));
            }
            if let Some(c) = cursor {
                query.push(("cursor".to_string(), c));
            }
            api_request(api_url, reqwest::Method::GET, "/v1/profiles", None, &query).await
        }
    }
}
