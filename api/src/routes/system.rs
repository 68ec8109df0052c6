use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use signalfold_core::events::{FUTURE_TOLERANCE_SECS, KNOWN_KINDS, MAX_ESTIMATE_ID_LEN};
use signalfold_core::gate::{GATE_MIN_INDICATORS, HINT_COMPARISON_SECTION, KNOWN_ACTIONS};
use signalfold_core::indicators::{HIGH_INTENT_MIN_SECONDS, QualityIndicator};
use signalfold_core::readiness::{
    PLANNING_MIN_SECONDS, READY_MIN_SECONDS, READY_MIN_TOGGLES, ReadinessTier,
};

use crate::routes::events::MAX_BATCH_EVENTS;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/system/config", get(get_system_config))
}

/// Payload each event kind expects, keyed to [`KNOWN_KINDS`] order.
/// Kinds that define no payload ignore anything sent with them.
const EVENT_KIND_PAYLOADS: [(&str, &str); 10] = [
    ("estimate_completed", "none"),
    ("comparison_viewed", "none"),
    ("financing_viewed", "none"),
    ("results_page_loaded", "{ load_time_ms: non-negative integer }"),
    ("results_page_time", "{ seconds: non-negative integer, cumulative total }"),
    ("saved", "none"),
    ("shared", "none"),
    ("tier_selected", "{ tier_id: non-empty string }"),
    ("scroll_depth", "{ percent: number in [0, 100] }"),
    ("next_steps_viewed", "none"),
];

/// One entry in the event-kind catalog.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EventKindConfig {
    pub kind: String,
    /// Shape of the payload this kind requires, or "none"
    pub payload: String,
}

/// One entry in the indicator or tier catalog.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LabelConfig {
    pub code: String,
    pub label: String,
}

/// The threshold constants behind indicators, tiers, and the gate.
/// Compile-time values, surfaced read-only so dashboards can explain
/// a classification without hardcoding their own copy.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ThresholdConfig {
    /// Results-page seconds before a completed estimate is high intent
    pub high_intent_min_seconds: u64,
    /// Results-page seconds required for the middle tier
    pub actively_planning_min_seconds: u64,
    /// Results-page seconds required for the top tier
    pub ready_min_seconds: u64,
    /// Tier toggles that substitute for opening next steps (top tier)
    pub ready_min_tier_toggles: u32,
    /// Indicators that pass the gate regardless of tier
    pub gate_min_indicators: usize,
}

/// Request shape limits enforced by validation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LimitConfig {
    pub max_estimate_id_bytes: usize,
    pub max_batch_events: usize,
    /// How far ahead of server time occurred_at may claim to be
    pub future_tolerance_seconds: i64,
}

/// Response for GET /v1/system/config
#[derive(Serialize, utoipa::ToSchema)]
pub struct SystemConfigResponse {
    /// Closed event-kind catalog with the payload each kind expects
    pub event_kinds: Vec<EventKindConfig>,
    /// Indicator vocabulary, in derivation order
    pub indicators: Vec<LabelConfig>,
    /// Readiness tiers, least to most engaged
    pub tiers: Vec<LabelConfig>,
    /// Actions the gate knows how to judge
    pub gate_actions: Vec<String>,
    /// UI section blocked gate decisions point toward
    pub gate_hint_section: String,
    pub thresholds: ThresholdConfig,
    pub limits: LimitConfig,
    pub version: String,
}

/// Get deployment-static engine configuration
///
/// Returns the event-kind catalog, the indicator and tier vocabularies,
/// gate actions, and every threshold constant. Identical for all callers
/// and changes only on deployment, so consumers should cache it per
/// session.
#[utoipa::path(
    get,
    path = "/v1/system/config",
    responses(
        (status = 200, description = "Engine configuration", body = SystemConfigResponse)
    ),
    tag = "system"
)]
pub async fn get_system_config() -> Json<SystemConfigResponse> {
    Json(SystemConfigResponse {
        event_kinds: EVENT_KIND_PAYLOADS
            .iter()
            .map(|(kind, payload)| EventKindConfig {
                kind: kind.to_string(),
                payload: payload.to_string(),
            })
            .collect(),
        indicators: QualityIndicator::ALL
            .iter()
            .map(|indicator| LabelConfig {
                code: indicator.as_str().to_string(),
                label: indicator.label().to_string(),
            })
            .collect(),
        tiers: [
            ReadinessTier::ExploringOptions,
            ReadinessTier::ActivelyPlanning,
            ReadinessTier::ReadyForSiteVisit,
        ]
        .iter()
        .map(|tier| LabelConfig {
            code: tier.as_str().to_string(),
            label: tier.label().to_string(),
        })
        .collect(),
        gate_actions: KNOWN_ACTIONS.iter().map(|a| a.to_string()).collect(),
        gate_hint_section: HINT_COMPARISON_SECTION.to_string(),
        thresholds: ThresholdConfig {
            high_intent_min_seconds: HIGH_INTENT_MIN_SECONDS,
            actively_planning_min_seconds: PLANNING_MIN_SECONDS,
            ready_min_seconds: READY_MIN_SECONDS,
            ready_min_tier_toggles: READY_MIN_TOGGLES,
            gate_min_indicators: GATE_MIN_INDICATORS,
        },
        limits: LimitConfig {
            max_estimate_id_bytes: MAX_ESTIMATE_ID_LEN,
            max_batch_events: MAX_BATCH_EVENTS,
            future_tolerance_seconds: FUTURE_TOLERANCE_SECS,
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use signalfold_core::events::KNOWN_KINDS;

    use super::{EVENT_KIND_PAYLOADS, get_system_config, router};
    use crate::state::AppState;

    #[test]
    fn payload_catalog_covers_exactly_the_known_kinds_in_order() {
        let catalog: Vec<&str> = EVENT_KIND_PAYLOADS.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(catalog, KNOWN_KINDS.to_vec());
    }

    #[tokio::test]
    async fn config_lists_the_full_vocabulary() {
        let config = get_system_config().await.0;
        assert_eq!(config.event_kinds.len(), KNOWN_KINDS.len());
        assert_eq!(config.indicators.len(), 4);
        assert_eq!(config.tiers.len(), 3);
        assert_eq!(config.gate_actions, vec!["request_site_visit"]);

        // Tier order is load-bearing for consumers rendering progressions.
        let tier_codes: Vec<&str> = config.tiers.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(
            tier_codes,
            vec!["exploring_options", "actively_planning", "ready_for_site_visit"]
        );
    }

    #[tokio::test]
    async fn config_route_answers_ok() {
        let app: Router = Router::new().merge(router()).with_state(AppState::in_memory());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/system/config")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
