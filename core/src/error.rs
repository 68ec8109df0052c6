use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::events::{FUTURE_TOLERANCE_SECS, KNOWN_KINDS, MAX_ESTIMATE_ID_LEN};

/// Structured error response returned on every non-2xx reply.
/// Every error contains enough information for the caller to understand
/// what went wrong and how to fix it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "not_found")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Why a raw event failed validation.
///
/// A rejection is terminal for that event and invisible to the emitting
/// surface: ingestion logs the reason and moves on. The variants stay
/// precise anyway, because the same type backs the dry-run validation
/// endpoint where the caller does want the full story.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("estimate_id must be a non-empty string")]
    EmptyEstimateId,
    #[error("estimate_id is {len} bytes, max is {MAX_ESTIMATE_ID_LEN}")]
    EstimateIdTooLong { len: usize },
    #[error("unknown event kind `{kind}`")]
    UnknownKind {
        kind: String,
        suggestion: Option<String>,
    },
    #[error("occurred_at is {ahead_secs}s ahead of server time")]
    TimestampInFuture { ahead_secs: i64 },
    #[error("invalid `{kind}` payload: {detail}")]
    InvalidPayload { kind: &'static str, detail: String },
}

impl RejectReason {
    /// Stable machine code, for logs and the dry-run validation response.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::EmptyEstimateId => "empty_estimate_id",
            RejectReason::EstimateIdTooLong { .. } => "estimate_id_too_long",
            RejectReason::UnknownKind { .. } => "unknown_kind",
            RejectReason::TimestampInFuture { .. } => "timestamp_in_future",
            RejectReason::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// Which request field the rejection is about, when that is clear-cut.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RejectReason::EmptyEstimateId | RejectReason::EstimateIdTooLong { .. } => {
                Some("estimate_id")
            }
            RejectReason::UnknownKind { .. } => Some("kind"),
            RejectReason::TimestampInFuture { .. } => Some("occurred_at"),
            RejectReason::InvalidPayload { .. } => Some("payload"),
        }
    }

    /// Hint about correct usage, in the same spirit as [`ApiError::docs_hint`].
    pub fn docs_hint(&self) -> Option<String> {
        match self {
            RejectReason::EmptyEstimateId => Some(
                "Every event must name the pricing estimate it belongs to.".to_string(),
            ),
            RejectReason::EstimateIdTooLong { .. } => None,
            RejectReason::UnknownKind { suggestion, .. } => {
                let catalog = KNOWN_KINDS.join(", ");
                Some(match suggestion {
                    Some(s) => format!("Did you mean `{s}`? Known kinds: {catalog}"),
                    None => format!("Known kinds: {catalog}"),
                })
            }
            RejectReason::TimestampInFuture { .. } => Some(format!(
                "occurred_at may be at most {FUTURE_TOLERANCE_SECS}s ahead of server time; check the client clock."
            )),
            RejectReason::InvalidPayload { .. } => Some(
                "See GET /v1/system/config for the payload each kind expects.".to_string(),
            ),
        }
    }
}

/// Failure from the profile store backend.
///
/// The engine treats every store failure the same way: log it, then
/// degrade (ingestion still acks, reads fall back to the least-engaged
/// view). The variants exist so hosts embedding their own backend can
/// report what actually happened.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend rejected or lost the write
    #[error("store write failed: {0}")]
    WriteFailed(String),
    /// Backend could not serve the read
    #[error("store read failed: {0}")]
    ReadFailed(String),
    /// Backend is unreachable or shutting down
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
