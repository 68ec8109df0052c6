use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::RejectReason;

/// Longest accepted estimate identifier, in bytes.
pub const MAX_ESTIMATE_ID_LEN: usize = 128;

/// How far ahead of server time an event may claim to have occurred.
/// Absorbs client clock skew without accepting events from the future.
pub const FUTURE_TOLERANCE_SECS: i64 = 300;

/// Minimum similarity before an unknown kind earns a "did you mean" hint.
const SUGGESTION_MIN_SIMILARITY: f64 = 0.84;

/// Wire names of every known event kind, in catalog order.
pub const KNOWN_KINDS: [&str; 10] = [
    "estimate_completed",
    "comparison_viewed",
    "financing_viewed",
    "results_page_loaded",
    "results_page_time",
    "saved",
    "shared",
    "tier_selected",
    "scroll_depth",
    "next_steps_viewed",
];

/// An engagement event as submitted by a UI surface, before validation.
///
/// `kind` is a free string at this point; validation maps it into the
/// closed [`EventKind`] set or rejects it. Events carry no client-side
/// identifiers — duplicate and out-of-order delivery are expected and
/// absorbed by the fold strategies, not by deduplication keys.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RawEvent {
    /// Identifier of the pricing estimate this event belongs to
    pub estimate_id: String,
    /// Candidate event kind (e.g. "scroll_depth", "estimate_completed")
    pub kind: String,
    /// When the interaction happened, as reported by the client.
    /// Defaults to server time when absent.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Kind-specific payload. Ignored for kinds that define none.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl RawEvent {
    /// Build a payload-less raw event. Mostly a test and CLI convenience.
    pub fn new(estimate_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            estimate_id: estimate_id.into(),
            kind: kind.into(),
            occurred_at: None,
            payload: None,
        }
    }
}

/// A validated engagement event. Immutable fact: never mutated or deleted,
/// only folded into the profile for its estimate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EngagementEvent {
    /// Identifier of the pricing estimate this event belongs to
    pub estimate_id: String,
    /// When the interaction happened
    pub occurred_at: DateTime<Utc>,
    /// Validated kind with its typed payload
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The closed set of engagement event kinds, each carrying its typed
/// payload. Unknown kinds are rejected at validation, never coerced,
/// so the catalog stays closed and auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    /// The user completed the estimate flow and saw a pricing range
    EstimateCompleted,
    /// The tier comparison content was opened
    ComparisonViewed,
    /// The financing content was opened
    FinancingViewed,
    /// The results page finished loading
    ResultsPageLoaded { load_time_ms: u64 },
    /// Periodic cumulative time-on-results report (a total, not a delta)
    ResultsPageTime { seconds: u64 },
    /// The user saved the estimate
    Saved,
    /// The user shared the estimate
    Shared,
    /// The user selected a pricing tier
    TierSelected { tier_id: String },
    /// Deepest scroll position reached on the results page
    ScrollDepth { percent: f64 },
    /// The next-steps content was opened
    NextStepsViewed,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::EstimateCompleted => "estimate_completed",
            EventKind::ComparisonViewed => "comparison_viewed",
            EventKind::FinancingViewed => "financing_viewed",
            EventKind::ResultsPageLoaded { .. } => "results_page_loaded",
            EventKind::ResultsPageTime { .. } => "results_page_time",
            EventKind::Saved => "saved",
            EventKind::Shared => "shared",
            EventKind::TierSelected { .. } => "tier_selected",
            EventKind::ScrollDepth { .. } => "scroll_depth",
            EventKind::NextStepsViewed => "next_steps_viewed",
        }
    }
}

/// Request to submit multiple events in one call.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RawEventBatch {
    pub events: Vec<RawEvent>,
}

/// Acknowledgement for event submission.
///
/// Always success-shaped. Whether each event survived validation and
/// folding is invisible here; engagement tracking is advisory and must
/// never break the flow that emitted it.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventAck {
    /// Always "accepted"
    pub status: String,
    /// How many events were taken off the request
    pub received: usize,
}

impl EventAck {
    pub fn of(received: usize) -> Self {
        Self {
            status: "accepted".to_string(),
            received,
        }
    }
}

/// What ingestion would do with an event, from the dry-run surface.
/// Unlike ingestion itself, this tells the caller the full story.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    /// The event as ingestion would fold it (valid only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EngagementEvent>,
    /// Why the event would be dropped (invalid only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ValidationReason>,
}

/// Rejection detail inside a [`ValidationReport`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationReason {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ValidationReport {
    pub fn from_result(result: Result<EngagementEvent, RejectReason>) -> Self {
        match result {
            Ok(event) => Self {
                valid: true,
                event: Some(event),
                reason: None,
            },
            Err(reason) => Self {
                valid: false,
                event: None,
                reason: Some(ValidationReason {
                    code: reason.code().to_string(),
                    message: reason.to_string(),
                    field: reason.field().map(str::to_string),
                    docs_hint: reason.docs_hint(),
                }),
            },
        }
    }
}

/// Validate a raw event into an [`EngagementEvent`], or explain why not.
///
/// Pure: `now` is passed in so callers (and tests) control the clock.
/// Rejections never propagate to the emitting surface; callers log the
/// [`RejectReason`] and drop the event.
pub fn validate(raw: RawEvent, now: DateTime<Utc>) -> Result<EngagementEvent, RejectReason> {
    let estimate_id = raw.estimate_id.trim();
    if estimate_id.is_empty() {
        return Err(RejectReason::EmptyEstimateId);
    }
    if estimate_id.len() > MAX_ESTIMATE_ID_LEN {
        return Err(RejectReason::EstimateIdTooLong {
            len: estimate_id.len(),
        });
    }

    let occurred_at = raw.occurred_at.unwrap_or(now);
    let ahead_secs = occurred_at.signed_duration_since(now).num_seconds();
    if ahead_secs > FUTURE_TOLERANCE_SECS {
        return Err(RejectReason::TimestampInFuture { ahead_secs });
    }

    let kind = parse_kind(&raw.kind, raw.payload.as_ref())?;

    Ok(EngagementEvent {
        estimate_id: estimate_id.to_string(),
        occurred_at,
        kind,
    })
}

/// Map a wire kind string plus its payload into the closed enum.
///
/// Kinds that define no payload ignore whatever was sent with them; a
/// stray debug field must not cost us the engagement signal itself.
fn parse_kind(
    kind: &str,
    payload: Option<&serde_json::Value>,
) -> Result<EventKind, RejectReason> {
    match kind {
        "estimate_completed" => Ok(EventKind::EstimateCompleted),
        "comparison_viewed" => Ok(EventKind::ComparisonViewed),
        "financing_viewed" => Ok(EventKind::FinancingViewed),
        "saved" => Ok(EventKind::Saved),
        "shared" => Ok(EventKind::Shared),
        "next_steps_viewed" => Ok(EventKind::NextStepsViewed),
        "results_page_loaded" => Ok(EventKind::ResultsPageLoaded {
            load_time_ms: require_u64("results_page_loaded", payload, "load_time_ms")?,
        }),
        "results_page_time" => Ok(EventKind::ResultsPageTime {
            seconds: require_u64("results_page_time", payload, "seconds")?,
        }),
        "tier_selected" => Ok(EventKind::TierSelected {
            tier_id: require_string("tier_selected", payload, "tier_id")?,
        }),
        "scroll_depth" => Ok(EventKind::ScrollDepth {
            percent: require_percent("scroll_depth", payload, "percent")?,
        }),
        other => Err(RejectReason::UnknownKind {
            kind: other.to_string(),
            suggestion: suggest_kind(other),
        }),
    }
}

/// Closest known kind for a typo, if any is close enough to be helpful.
fn suggest_kind(unknown: &str) -> Option<String> {
    KNOWN_KINDS
        .iter()
        .map(|candidate| (*candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_MIN_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string())
}

fn payload_field<'a>(
    kind: &'static str,
    payload: Option<&'a serde_json::Value>,
    field: &'static str,
) -> Result<&'a serde_json::Value, RejectReason> {
    payload
        .and_then(|p| p.get(field))
        .ok_or_else(|| RejectReason::InvalidPayload {
            kind,
            detail: format!("missing required field `{field}`"),
        })
}

fn require_u64(
    kind: &'static str,
    payload: Option<&serde_json::Value>,
    field: &'static str,
) -> Result<u64, RejectReason> {
    let value = payload_field(kind, payload, field)?;
    value.as_u64().ok_or_else(|| RejectReason::InvalidPayload {
        kind,
        detail: format!("`{field}` must be a non-negative integer, got {value}"),
    })
}

fn require_string(
    kind: &'static str,
    payload: Option<&serde_json::Value>,
    field: &'static str,
) -> Result<String, RejectReason> {
    let value = payload_field(kind, payload, field)?;
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(RejectReason::InvalidPayload {
            kind,
            detail: format!("`{field}` must not be empty"),
        }),
        None => Err(RejectReason::InvalidPayload {
            kind,
            detail: format!("`{field}` must be a string, got {value}"),
        }),
    }
}

fn require_percent(
    kind: &'static str,
    payload: Option<&serde_json::Value>,
    field: &'static str,
) -> Result<f64, RejectReason> {
    let value = payload_field(kind, payload, field)?;
    let percent = value.as_f64().ok_or_else(|| RejectReason::InvalidPayload {
        kind,
        detail: format!("`{field}` must be a number, got {value}"),
    })?;
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(RejectReason::InvalidPayload {
            kind,
            detail: format!("`{field}` must be in [0, 100], got {percent}"),
        });
    }
    Ok(percent)
}
