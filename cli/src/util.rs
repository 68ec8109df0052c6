use serde::{Deserialize, Serialize};
use serde_json::json;

/// Defaults persisted by `signalfold config set`.
///
/// Lowest-priority source in flag → env → config-file resolution.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_id: Option<String>,
}

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Print a usage error and exit 4. For problems the CLI can see before
/// any request goes out: bad flags, unreadable files, invalid JSON.
pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
    std::process::exit(4);
}

pub fn config_path() -> std::path::PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("signalfold");
    config_dir.join("config.json")
}

pub fn load_config() -> CliConfig {
    let path = config_path();
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default()
}

pub fn save_config(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// Unwrap the estimate id after flag → env → config-file resolution.
/// Exits 4 when nothing provided one.
pub fn require_estimate_id(estimate_id: Option<String>) -> String {
    estimate_id.unwrap_or_else(|| {
        exit_error(
            "estimate_id is required for this command",
            Some(
                "Pass --estimate-id, set SIGNALFOLD_ESTIMATE_ID, or run `signalfold config set --estimate-id <id>`",
            ),
        )
    })
}

/// Execute an API request, print the response, return the exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    query: &[(String, String)],
) -> i32 {
    let url = match reqwest::Url::parse(&format!("{api_url}{path}")) {
        Ok(mut u) => {
            if !query.is_empty() {
                let mut q = u.query_pairs_mut();
                for (k, v) in query {
                    q.append_pair(k, v);
                }
            }
            u
        }
        Err(e) => {
            let err = json!({
                "error": "cli_error",
                "message": format!("Invalid URL: {api_url}{path}: {e}")
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            return 4;
        }
    };

    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check SIGNALFOLD_API_URL."
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            return 3;
        }
    };

    let status = resp.status().as_u16();
    let exit_code = match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    };

    let resp_body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = serde_json::to_string_pretty(&resp_body).unwrap();
    if exit_code == 0 {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    exit_code
}

/// Execute an API request and hand back the response without printing.
/// For commands that judge the body, like the validation dry-run.
pub async fn raw_api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<(u16, serde_json::Value), String> {
    let url = reqwest::Url::parse(&format!("{api_url}{path}"))
        .map_err(|e| format!("Invalid URL: {e}"))?;

    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = req.send().await.map_err(|e| format!("{e}"))?;
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp
        .json()
        .await
        .unwrap_or(json!({"error": "non-json response"}));

    Ok((status, body))
}

/// Best-effort dispatch for event emission: the one place the
/// swallow-all-errors policy lives.
///
/// Engagement tracking must never fail the flow that emitted it, and
/// the CLI honors the same contract: transport trouble and non-success
/// responses become a warning on stderr, and the exit code is 0 either
/// way. Scripts wiring events into their own flows never need a guard
/// around this.
pub async fn best_effort_send(api_url: &str, path: &str, body: serde_json::Value) -> i32 {
    match raw_api_request(api_url, reqwest::Method::POST, path, Some(body)).await {
        Ok((status, resp_body)) if (200..300).contains(&status) => {
            println!("{}", serde_json::to_string_pretty(&resp_body).unwrap());
        }
        Ok((status, resp_body)) => {
            let warning = json!({
                "warning": "event_not_delivered",
                "message": format!("Server answered HTTP {status}"),
                "response": resp_body,
                "docs_hint": "Engagement tracking is best effort; the flow that emitted this event is unaffected."
            });
            eprintln!("{}", serde_json::to_string_pretty(&warning).unwrap());
        }
        Err(e) => {
            let warning = json!({
                "warning": "event_not_delivered",
                "message": e,
                "docs_hint": "Engagement tracking is best effort; the flow that emitted this event is unaffected."
            });
            eprintln!("{}", serde_json::to_string_pretty(&warning).unwrap());
        }
    }
    0
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<serde_json::Value, String> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("Failed to read stdin: {e}"))?
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}
