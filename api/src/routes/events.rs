use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use signalfold_core::error::ApiError;
use signalfold_core::events::{EventAck, RawEvent, RawEventBatch, ValidationReport, validate};

use crate::extract::AppJson;
use crate::state::AppState;

/// Largest accepted batch. Events past the cap are dropped and logged,
/// not rejected; the ack stays success-shaped either way.
pub const MAX_BATCH_EVENTS: usize = 100;

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/v1/events", post(ingest_event))
        .route("/v1/events/batch", post(ingest_events_batch))
}

pub fn validate_router() -> Router<AppState> {
    Router::new().route("/v1/events/validate", post(validate_event))
}

/// Submit one engagement event
///
/// Always acknowledges with 202. Malformed bodies, unknown kinds, bad
/// payloads, and storage trouble are logged and swallowed — the flow
/// that emitted the event must never observe a failure here. Use the
/// dry-run endpoint to see what ingestion actually does with an event.
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = RawEvent,
    responses(
        (status = 202, description = "Event acknowledged, whatever became of it", body = EventAck)
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<EventAck>) {
    let received = match serde_json::from_slice::<RawEvent>(&body) {
        Ok(raw) => {
            state.engine.ingest(raw).await;
            1
        }
        Err(err) => {
            tracing::warn!(error = %err, "unreadable event body dropped");
            0
        }
    };

    (StatusCode::ACCEPTED, Json(EventAck::of(received)))
}

/// Submit multiple engagement events in one call
///
/// Same contract as the single-event endpoint: each event is judged on
/// its own, nothing in the batch can fail the request, and the ack is
/// always 202. Batches over the cap are truncated, not rejected.
#[utoipa::path(
    post,
    path = "/v1/events/batch",
    request_body = RawEventBatch,
    responses(
        (status = 202, description = "Batch acknowledged, whatever became of each event", body = EventAck)
    ),
    tag = "events"
)]
pub async fn ingest_events_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<EventAck>) {
    let mut events = match serde_json::from_slice::<RawEventBatch>(&body) {
        Ok(batch) => batch.events,
        Err(err) => {
            tracing::warn!(error = %err, "unreadable event batch dropped");
            Vec::new()
        }
    };

    if events.len() > MAX_BATCH_EVENTS {
        tracing::warn!(
            cap = MAX_BATCH_EVENTS,
            dropped = events.len() - MAX_BATCH_EVENTS,
            "event batch over cap, extra events dropped"
        );
        events.truncate(MAX_BATCH_EVENTS);
    }

    let received = events.len();
    let outcomes = state.engine.ingest_batch(events).await;
    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    tracing::debug!(received, accepted, "event batch folded");

    (StatusCode::ACCEPTED, Json(EventAck::of(received)))
}

/// Dry-run validation for an event
///
/// Runs the exact checks ingestion runs, with the outcome made visible.
/// Useful while wiring up a new emitting surface; production emitters
/// fire and forget against POST /v1/events instead.
#[utoipa::path(
    post,
    path = "/v1/events/validate",
    request_body = RawEvent,
    responses(
        (status = 200, description = "What ingestion would do with this event", body = ValidationReport),
        (status = 400, description = "Request body is not an event object at all", body = ApiError)
    ),
    tag = "events"
)]
pub async fn validate_event(AppJson(raw): AppJson<RawEvent>) -> Json<ValidationReport> {
    Json(ValidationReport::from_result(validate(raw, Utc::now())))
}
