use clap::Subcommand;
use serde_json::json;

use crate::util::{
    best_effort_send, exit_error, raw_api_request, read_json_from_file, require_estimate_id,
};

#[derive(Subcommand)]
pub enum EventCommands {
    /// Send one engagement event, best effort (always exits 0)
    Send {
        /// Event kind (e.g. "estimate_completed", "scroll_depth")
        #[arg(long)]
        kind: String,
        /// Kind-specific payload as JSON (e.g. '{"percent": 80}')
        #[arg(long)]
        payload: Option<String>,
        /// When the interaction happened (RFC3339). Defaults to server time.
        #[arg(long)]
        occurred_at: Option<String>,
    },
    /// Send multiple events from a file, best effort (always exits 0)
    Batch {
        /// JSON file with an events array (use '-' for stdin)
        #[arg(long)]
        file: String,
    },
    /// Dry-run an event against the validation endpoint (strict)
    Validate {
        /// Event kind to check
        #[arg(long)]
        kind: String,
        /// Kind-specific payload as JSON
        #[arg(long)]
        payload: Option<String>,
        /// When the interaction happened (RFC3339)
        #[arg(long)]
        occurred_at: Option<String>,
    },
}

pub async fn run(api_url: &str, estimate_id: Option<String>, command: EventCommands) -> i32 {
    match command {
        EventCommands::Send {
            kind,
            payload,
            occurred_at,
        } => {
            let estimate_id = require_estimate_id(estimate_id);
            let body = event_body(&estimate_id, &kind, payload.as_deref(), occurred_at.as_deref());
            best_effort_send(api_url, "/v1/events", body).await
        }
        EventCommands::Batch { file } => batch(api_url, &file).await,
        EventCommands::Validate {
            kind,
            payload,
            occurred_at,
        } => {
            let estimate_id = require_estimate_id(estimate_id);
            let body = event_body(&estimate_id, &kind, payload.as_deref(), occurred_at.as_deref());
            validate(api_url, body).await
        }
    }
}

/// Build the raw-event body, catching locally what the best-effort
/// surface would otherwise swallow silently: malformed payload JSON and
/// unparseable timestamps are usage errors, not engagement signals.
fn event_body(
    estimate_id: &str,
    kind: &str,
    payload: Option<&str>,
    occurred_at: Option<&str>,
) -> serde_json::Value {
    let mut body = json!({
        "estimate_id": estimate_id,
        "kind": kind
    });

    if let Some(p) = payload {
        let value: serde_json::Value = match serde_json::from_str(p) {
            Ok(v) => v,
            Err(e) => exit_error(
                &format!("Invalid JSON in --payload: {e}"),
                Some("Provide valid JSON, e.g. --payload '{\"percent\": 80}'"),
            ),
        };
        body["payload"] = value;
    }

    if let Some(ts) = occurred_at {
        if chrono::DateTime::parse_from_rfc3339(ts).is_err() {
            exit_error(
                &format!("Invalid --occurred-at timestamp: {ts}"),
                Some("Provide RFC3339, e.g. 2026-08-22T14:30:00Z"),
            );
        }
        body["occurred_at"] = json!(ts);
    }

    body
}

async fn batch(api_url: &str, file: &str) -> i32 {
    let parsed = match read_json_from_file(file) {
        Ok(v) => v,
        Err(e) => exit_error(&e, Some("Provide a JSON file with {\"events\": [...]}")),
    };

    // Accept a bare array as shorthand for the request envelope.
    let body = if parsed.is_array() {
        json!({ "events": parsed })
    } else {
        parsed
    };

    best_effort_send(api_url, "/v1/events/batch", body).await
}

async fn validate(api_url: &str, body: serde_json::Value) -> i32 {
    let (status, resp_body) =
        match raw_api_request(api_url, reqwest::Method::POST, "/v1/events/validate", Some(body))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err = json!({
                    "error": "connection_error",
                    "message": e,
                    "docs_hint": "Is the API server running? Check SIGNALFOLD_API_URL."
                });
                eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
                return 3;
            }
        };

    // Unlike send, this surface is strict: an invalid event exits
    // nonzero so scripts can assert on their instrumentation.
    let formatted = serde_json::to_string_pretty(&resp_body).unwrap();
    match status {
        200..=299 => {
            if resp_body["valid"] == json!(true) {
                println!("{formatted}");
                0
            } else {
                eprintln!("{formatted}");
                1
            }
        }
        400..=499 => {
            eprintln!("{formatted}");
            1
        }
        _ => {
            eprintln!("{formatted}");
            2
        }
    }
}
