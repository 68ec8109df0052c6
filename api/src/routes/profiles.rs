use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use signalfold_core::engine::ProfileSnapshot;
use signalfold_core::error::ApiError;
use signalfold_core::store::{ListCursor, PaginatedResponse};

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/profiles", get(list_profiles))
        .route("/v1/profiles/{estimate_id}", get(get_profile))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Page size (default 50, max 200)
    pub limit: Option<usize>,
    /// Opaque cursor from a previous response
    pub cursor: Option<String>,
}

/// Get the engagement view for one estimate
///
/// Returns the raw aggregates plus the derived indicators and tier.
/// An estimate nobody has emitted events for yet is a legitimate state,
/// so unknown ids return the least-engaged view with a null profile
/// rather than a 404.
#[utoipa::path(
    get,
    path = "/v1/profiles/{estimate_id}",
    params(
        ("estimate_id" = String, Path, description = "Pricing estimate identifier")
    ),
    responses(
        (status = 200, description = "Engagement view, possibly the least-engaged default", body = ProfileSnapshot)
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(estimate_id): Path<String>,
) -> Json<ProfileSnapshot> {
    Json(state.engine.snapshot(&estimate_id).await)
}

/// List engagement views for the lead dashboard
///
/// Pages through profiles, most recently active first. Each row carries
/// the same derived indicators and tier the end-user gate computes, from
/// the same rules.
#[utoipa::path(
    get,
    path = "/v1/profiles",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of engagement views", body = PaginatedResponse<ProfileSnapshot>),
        (status = 400, description = "Invalid cursor or limit", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<ProfileSnapshot>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let cursor = query.cursor.as_deref().map(decode_cursor).transpose()?;

    let page = state.engine.list(cursor, limit).await;
    let next_cursor = page.next_cursor.as_ref().map(encode_cursor);

    Ok(Json(PaginatedResponse {
        data: page.profiles.into_iter().map(ProfileSnapshot::of).collect(),
        has_more: next_cursor.is_some(),
        next_cursor,
    }))
}

fn encode_cursor(cursor: &ListCursor) -> String {
    use base64::Engine;
    let raw = format!("{}\0{}", cursor.last_updated_at.to_rfc3339(), cursor.estimate_id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

fn decode_cursor(cursor: &str) -> Result<ListCursor, AppError> {
    use base64::Engine;
    let invalid = |message: &str| AppError::Validation {
        message: message.to_string(),
        field: Some("cursor".to_string()),
        received: Some(serde_json::Value::String(cursor.to_string())),
        docs_hint: Some("Use the next_cursor value from a previous response".to_string()),
    };

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| invalid("Invalid cursor format"))?;
    let text = String::from_utf8(bytes).map_err(|_| invalid("Invalid cursor encoding"))?;

    let (timestamp, estimate_id) = text
        .split_once('\0')
        .ok_or_else(|| invalid("Invalid cursor structure"))?;
    let last_updated_at = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|_| invalid("Invalid cursor timestamp"))?
        .with_timezone(&Utc);

    Ok(ListCursor {
        last_updated_at,
        estimate_id: estimate_id.to_string(),
    })
}
