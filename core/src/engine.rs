use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::{RejectReason, StoreError};
use crate::events::{RawEvent, validate};
use crate::gate::{GateAction, GateDecision, evaluate};
use crate::indicators::{QualityIndicator, derive_indicators};
use crate::profile::EngagementProfile;
use crate::readiness::{ReadinessTier, classify};
use crate::store::{ListCursor, ProfilePage, ProfileStore};

/// What happened to one ingested event.
///
/// Informational only. The ingestion surface acks regardless; tests,
/// logs, and the dry-run endpoint are the consumers that look inside.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Validated and folded into its estimate's profile
    Accepted,
    /// Failed validation; logged and dropped
    Rejected(RejectReason),
    /// Validated but the store could not fold it; logged and dropped
    Failed(StoreError),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted)
    }
}

/// Machine code plus dashboard label for one quality indicator.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IndicatorView {
    pub code: String,
    pub label: String,
}

impl From<QualityIndicator> for IndicatorView {
    fn from(indicator: QualityIndicator) -> Self {
        Self {
            code: indicator.as_str().to_string(),
            label: indicator.label().to_string(),
        }
    }
}

/// Machine code plus dashboard label for a readiness tier.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TierView {
    pub code: String,
    pub label: String,
}

impl From<ReadinessTier> for TierView {
    fn from(tier: ReadinessTier) -> Self {
        Self {
            code: tier.as_str().to_string(),
            label: tier.label().to_string(),
        }
    }
}

/// Metadata about the snapshot computation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotMeta {
    /// When the derivation ran
    pub computed_at: DateTime<Utc>,
    /// Seconds between the newest folded event and the request, or null
    /// when no events arrived yet
    pub seconds_since_last_event: Option<i64>,
}

impl SnapshotMeta {
    /// Build snapshot metadata from the profile and request time.
    pub fn from_profile(profile: Option<&EngagementProfile>, now: DateTime<Utc>) -> Self {
        Self {
            computed_at: now,
            seconds_since_last_event: profile.map(|p| {
                now.signed_duration_since(p.last_updated_at)
                    .num_seconds()
                    .max(0)
            }),
        }
    }
}

/// Everything both consumers render for one estimate: raw aggregates
/// plus the derived labels, computed by the same rules either way.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileSnapshot {
    pub estimate_id: String,
    /// Raw aggregates; null when no events arrived yet
    pub profile: Option<EngagementProfile>,
    /// Derived indicators, catalog order
    pub indicators: Vec<IndicatorView>,
    /// Derived readiness tier
    pub tier: TierView,
    pub meta: SnapshotMeta,
}

impl ProfileSnapshot {
    /// Snapshot of a profile that definitely exists, e.g. a dashboard
    /// list row.
    pub fn of(profile: EngagementProfile) -> Self {
        let estimate_id = profile.estimate_id.clone();
        Self::for_estimate(&estimate_id, Some(profile))
    }

    /// Build the derived view against the current clock.
    pub fn for_estimate(estimate_id: &str, profile: Option<EngagementProfile>) -> Self {
        Self::at(estimate_id, profile, Utc::now())
    }

    /// Build the derived view. A missing profile serves least-engaged
    /// defaults; an estimate with no events yet is a legitimate state,
    /// not an error. `now` is passed in so tests control the clock.
    pub fn at(
        estimate_id: &str,
        profile: Option<EngagementProfile>,
        now: DateTime<Utc>,
    ) -> Self {
        let indicators = profile.as_ref().map(derive_indicators).unwrap_or_default();
        let tier = profile
            .as_ref()
            .map(classify)
            .unwrap_or(ReadinessTier::ExploringOptions);
        Self {
            estimate_id: estimate_id.to_string(),
            indicators: indicators.into_iter().map(IndicatorView::from).collect(),
            tier: TierView::from(tier),
            meta: SnapshotMeta::from_profile(profile.as_ref(), now),
            profile,
        }
    }
}

/// Validation in front, the injected store behind, pure derivation on
/// the way out.
///
/// Every method follows the advisory-tracking posture: ingestion
/// failures are logged and swallowed, read failures degrade to the
/// least-engaged view. Nothing in this type can fail the host.
#[derive(Clone)]
pub struct EngagementEngine {
    store: Arc<dyn ProfileStore>,
}

impl EngagementEngine {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Run one raw event through validation and the fold.
    ///
    /// Infallible from the caller's point of view. Rejections and store
    /// failures land in the log and in the returned outcome, never on
    /// the emitting surface.
    pub async fn ingest(&self, raw: RawEvent) -> IngestOutcome {
        let now = Utc::now();
        let event = match validate(raw, now) {
            Ok(event) => event,
            Err(reason) => {
                warn!(code = reason.code(), error = %reason, "event rejected");
                return IngestOutcome::Rejected(reason);
            }
        };

        match self.store.apply(&event).await {
            Ok(()) => IngestOutcome::Accepted,
            Err(err) => {
                warn!(
                    estimate_id = %event.estimate_id,
                    kind = event.kind.name(),
                    error = %err,
                    "event dropped, store could not fold it"
                );
                IngestOutcome::Failed(err)
            }
        }
    }

    /// Ingest a batch, one outcome per event. A bad event never fails
    /// the batch; each is judged on its own.
    pub async fn ingest_batch(&self, raws: Vec<RawEvent>) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(raws.len());
        for raw in raws {
            outcomes.push(self.ingest(raw).await);
        }
        outcomes
    }

    /// Raw profile for an estimate. Unknown ids and store failures both
    /// read as `None`.
    pub async fn profile(&self, estimate_id: &str) -> Option<EngagementProfile> {
        match self.store.get(estimate_id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    estimate_id,
                    error = %err,
                    "profile read failed, serving least-engaged view"
                );
                None
            }
        }
    }

    /// Derived indicators. Empty for unknown estimates.
    pub async fn indicators(&self, estimate_id: &str) -> Vec<QualityIndicator> {
        self.profile(estimate_id)
            .await
            .map(|profile| derive_indicators(&profile))
            .unwrap_or_default()
    }

    /// Derived tier. `ExploringOptions` for unknown estimates.
    pub async fn tier(&self, estimate_id: &str) -> ReadinessTier {
        match self.profile(estimate_id).await {
            Some(profile) => classify(&profile),
            None => ReadinessTier::ExploringOptions,
        }
    }

    /// The full derived view for one estimate, in one read.
    pub async fn snapshot(&self, estimate_id: &str) -> ProfileSnapshot {
        let profile = self.profile(estimate_id).await;
        ProfileSnapshot::for_estimate(estimate_id, profile)
    }

    /// Gate check for a high-commitment action.
    ///
    /// A degraded or missing read evaluates like a brand-new profile
    /// and produces the nudge, not an error.
    pub async fn gate(&self, estimate_id: &str, action: GateAction) -> GateDecision {
        let profile = self
            .profile(estimate_id)
            .await
            .unwrap_or_else(|| EngagementProfile::new(estimate_id, Utc::now()));
        evaluate(&profile, action)
    }

    /// Page through profiles for the dashboard, newest activity first.
    /// Serves an empty page if the store cannot answer.
    pub async fn list(&self, cursor: Option<ListCursor>, limit: usize) -> ProfilePage {
        match self.store.list(cursor, limit).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "profile list failed, serving empty page");
                ProfilePage {
                    profiles: Vec::new(),
                    next_cursor: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::{EngagementEngine, IngestOutcome};
    use crate::error::StoreError;
    use crate::events::{EngagementEvent, RawEvent};
    use crate::gate::GateAction;
    use crate::indicators::QualityIndicator;
    use crate::profile::EngagementProfile;
    use crate::readiness::ReadinessTier;
    use crate::store::{ListCursor, MemoryProfileStore, ProfilePage, ProfileStore};

    fn engine() -> EngagementEngine {
        EngagementEngine::new(Arc::new(MemoryProfileStore::new()))
    }

    fn raw(kind: &str, payload: Option<serde_json::Value>) -> RawEvent {
        RawEvent {
            estimate_id: "est-1001".to_string(),
            kind: kind.to_string(),
            occurred_at: None,
            payload,
        }
    }

    /// Store double for the degraded-backend path.
    struct FailingStore;

    #[async_trait]
    impl ProfileStore for FailingStore {
        async fn apply(&self, _event: &EngagementEvent) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("backend offline".to_string()))
        }

        async fn get(&self, _estimate_id: &str) -> Result<Option<EngagementProfile>, StoreError> {
            Err(StoreError::ReadFailed("backend offline".to_string()))
        }

        async fn list(
            &self,
            _cursor: Option<ListCursor>,
            _limit: usize,
        ) -> Result<ProfilePage, StoreError> {
            Err(StoreError::ReadFailed("backend offline".to_string()))
        }

        async fn delete(&self, _estimate_id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("backend offline".to_string()))
        }
    }

    #[tokio::test]
    async fn accepted_events_reach_the_profile() {
        let engine = engine();
        let outcome = engine
            .ingest(raw("scroll_depth", Some(json!({ "percent": 80 }))))
            .await;
        assert!(outcome.is_accepted());

        let profile = engine.profile("est-1001").await.unwrap();
        assert_eq!(profile.max_scroll_depth_percent, 80.0);
    }

    #[tokio::test]
    async fn rejected_events_never_touch_the_profile() {
        let engine = engine();
        let outcome = engine.ingest(raw("page_viewed", None)).await;
        assert!(matches!(outcome, IngestOutcome::Rejected(_)));
        assert!(engine.profile("est-1001").await.is_none());
    }

    #[tokio::test]
    async fn store_failure_is_swallowed_into_an_outcome() {
        let engine = EngagementEngine::new(Arc::new(FailingStore));
        let outcome = engine.ingest(raw("saved", None)).await;
        assert!(matches!(outcome, IngestOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn degraded_reads_serve_the_least_engaged_view() {
        let engine = EngagementEngine::new(Arc::new(FailingStore));
        assert!(engine.profile("est-1001").await.is_none());
        assert!(engine.indicators("est-1001").await.is_empty());
        assert_eq!(engine.tier("est-1001").await, ReadinessTier::ExploringOptions);
        assert!(
            !engine
                .gate("est-1001", GateAction::RequestSiteVisit)
                .await
                .allowed
        );

        let page = engine.list(None, 50).await;
        assert!(page.profiles.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn unknown_estimate_snapshot_is_the_null_view() {
        let engine = engine();
        let snapshot = engine.snapshot("est-unknown").await;
        assert_eq!(snapshot.estimate_id, "est-unknown");
        assert!(snapshot.profile.is_none());
        assert!(snapshot.indicators.is_empty());
        assert_eq!(snapshot.tier.code, "exploring_options");
        assert!(snapshot.meta.seconds_since_last_event.is_none());
    }

    #[test]
    fn snapshot_meta_measures_the_gap_to_the_newest_event() {
        let now = chrono::Utc::now();
        let profile = EngagementProfile::new("est-1001", now - chrono::Duration::seconds(45));

        let snapshot = super::ProfileSnapshot::at("est-1001", Some(profile), now);
        assert_eq!(snapshot.meta.computed_at, now);
        assert_eq!(snapshot.meta.seconds_since_last_event, Some(45));
    }

    #[test]
    fn snapshot_meta_caps_negative_gaps_at_zero() {
        // Tolerated client clock skew can put the newest event slightly
        // ahead of the request time.
        let now = chrono::Utc::now();
        let profile = EngagementProfile::new("est-1001", now + chrono::Duration::seconds(30));

        let snapshot = super::ProfileSnapshot::at("est-1001", Some(profile), now);
        assert_eq!(snapshot.meta.seconds_since_last_event, Some(0));
    }

    #[tokio::test]
    async fn engaged_session_reaches_the_top_tier() {
        let engine = engine();
        engine.ingest(raw("estimate_completed", None)).await;
        engine
            .ingest(raw("results_page_time", Some(json!({ "seconds": 95 }))))
            .await;
        engine.ingest(raw("next_steps_viewed", None)).await;

        assert_eq!(
            engine.tier("est-1001").await,
            ReadinessTier::ReadyForSiteVisit
        );
        assert!(
            engine
                .indicators("est-1001")
                .await
                .contains(&QualityIndicator::HighIntent)
        );
        assert!(
            engine
                .gate("est-1001", GateAction::RequestSiteVisit)
                .await
                .allowed
        );
    }

    #[tokio::test]
    async fn quick_completion_alone_stays_exploring_and_gets_nudged() {
        let engine = engine();
        engine.ingest(raw("estimate_completed", None)).await;
        engine
            .ingest(raw("results_page_time", Some(json!({ "seconds": 10 }))))
            .await;

        assert_eq!(
            engine.tier("est-1001").await,
            ReadinessTier::ExploringOptions
        );
        let decision = engine.gate("est-1001", GateAction::RequestSiteVisit).await;
        assert!(!decision.allowed);
        assert_eq!(decision.hint_target_section.as_deref(), Some("tier_comparison"));
    }

    #[tokio::test]
    async fn two_indicators_open_the_gate_without_completion() {
        let engine = engine();
        engine.ingest(raw("comparison_viewed", None)).await;
        engine.ingest(raw("financing_viewed", None)).await;
        engine
            .ingest(raw("results_page_time", Some(json!({ "seconds": 5 }))))
            .await;

        let indicators = engine.indicators("est-1001").await;
        assert!(indicators.contains(&QualityIndicator::ReviewedOptions));
        assert!(indicators.contains(&QualityIndicator::ViewedFinancing));
        assert_eq!(
            engine.tier("est-1001").await,
            ReadinessTier::ExploringOptions
        );
        assert!(
            engine
                .gate("est-1001", GateAction::RequestSiteVisit)
                .await
                .allowed
        );
    }

    #[tokio::test]
    async fn batch_judges_each_event_on_its_own() {
        let engine = engine();
        let outcomes = engine
            .ingest_batch(vec![
                raw("saved", None),
                raw("not_a_kind", None),
                raw("shared", None),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_accepted());
        assert!(matches!(outcomes[1], IngestOutcome::Rejected(_)));
        assert!(outcomes[2].is_accepted());

        let profile = engine.profile("est-1001").await.unwrap();
        assert!(profile.saved);
        assert!(profile.shared);
    }
}
