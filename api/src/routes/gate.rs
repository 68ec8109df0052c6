use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use signalfold_core::engine::TierView;
use signalfold_core::error::ApiError;
use signalfold_core::gate::{GateAction, GateDecision, KNOWN_ACTIONS};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/gate/{estimate_id}/{action}", get(check_gate))
}

/// One gate evaluation, plus the tier that informed it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GateCheckResponse {
    pub estimate_id: String,
    pub action: String,
    pub decision: GateDecision,
    /// Readiness tier at the moment of evaluation
    pub tier: TierView,
}

/// Check whether an estimate may proceed to a high-commitment action
///
/// Pure and safe to call speculatively: the decision is computed fresh
/// from the profile on every call and never cached, so it tracks the
/// session as events keep arriving. A blocked decision is a nudge, not
/// access control — it names a UI section to steer the user toward, and
/// the caller stays free to offer a manual override.
#[utoipa::path(
    get,
    path = "/v1/gate/{estimate_id}/{action}",
    params(
        ("estimate_id" = String, Path, description = "Pricing estimate identifier"),
        ("action" = String, Path, description = "High-commitment action (e.g. 'request_site_visit')")
    ),
    responses(
        (status = 200, description = "Gate decision for this action, right now", body = GateCheckResponse),
        (status = 400, description = "Unknown action name", body = ApiError)
    ),
    tag = "gate"
)]
pub async fn check_gate(
    State(state): State<AppState>,
    Path((estimate_id, action)): Path<(String, String)>,
) -> Result<Json<GateCheckResponse>, AppError> {
    // Unknown actions are caller integration bugs, not user flows, so
    // this is the one place on the gate surface that errors loudly.
    let gate_action = GateAction::parse(&action).ok_or_else(|| AppError::Validation {
        message: format!("Unknown gate action `{action}`"),
        field: Some("action".to_string()),
        received: Some(serde_json::Value::String(action.clone())),
        docs_hint: Some(format!("Known actions: {}", KNOWN_ACTIONS.join(", "))),
    })?;

    let decision = state.engine.gate(&estimate_id, gate_action).await;
    let tier = state.engine.tier(&estimate_id).await;

    Ok(Json(GateCheckResponse {
        estimate_id,
        action: gate_action.as_str().to_string(),
        decision,
        tier: TierView::from(tier),
    }))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::extract::{Path, State};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use signalfold_core::events::RawEvent;

    use super::{check_gate, router};
    use crate::error::AppError;
    use crate::state::AppState;

    async fn seed(state: &AppState, kind: &str, payload: Option<serde_json::Value>) {
        let raw = RawEvent {
            estimate_id: "est-1".to_string(),
            kind: kind.to_string(),
            occurred_at: None,
            payload,
        };
        assert!(state.engine.ingest(raw).await.is_accepted());
    }

    async fn check(state: AppState, action: &str) -> Result<super::GateCheckResponse, AppError> {
        check_gate(State(state), Path(("est-1".to_string(), action.to_string())))
            .await
            .map(|json| json.0)
    }

    #[tokio::test]
    async fn unengaged_estimate_is_blocked_with_a_hint() {
        let response = check(AppState::in_memory(), "request_site_visit")
            .await
            .expect("known action should evaluate");
        assert!(!response.decision.allowed);
        assert!(response.decision.reason_if_blocked.is_some());
        assert_eq!(
            response.decision.hint_target_section.as_deref(),
            Some("tier_comparison")
        );
        assert_eq!(response.tier.code, "exploring_options");
    }

    #[tokio::test]
    async fn planning_estimate_passes_the_gate() {
        let state = AppState::in_memory();
        seed(&state, "estimate_completed", None).await;
        seed(&state, "comparison_viewed", None).await;
        seed(&state, "results_page_time", Some(json!({ "seconds": 45 }))).await;

        let response = check(state, "request_site_visit")
            .await
            .expect("known action should evaluate");
        assert!(response.decision.allowed);
        assert!(response.decision.reason_if_blocked.is_none());
        assert_eq!(response.tier.code, "actively_planning");
    }

    #[tokio::test]
    async fn unknown_action_is_a_validation_error_with_the_catalog() {
        let err = check(AppState::in_memory(), "order_now")
            .await
            .expect_err("unknown action should be rejected");
        match err {
            AppError::Validation {
                field, docs_hint, ..
            } => {
                assert_eq!(field.as_deref(), Some("action"));
                assert!(
                    docs_hint
                        .expect("docs_hint expected")
                        .contains("request_site_visit")
                );
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_action_maps_to_400_over_http() {
        let app = Router::new().merge(router()).with_state(AppState::in_memory());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/gate/est-1/order_now")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn known_action_answers_200_even_for_unknown_estimates() {
        let app = Router::new().merge(router()).with_state(AppState::in_memory());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/gate/est-nobody/request_site_visit")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
