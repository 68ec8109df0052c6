use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::events::{EngagementEvent, EventKind};

/// The per-estimate read model every derived signal is computed from.
///
/// One profile per estimate identifier, owned exclusively by the fold:
/// every other component reads it and nothing else writes it. Nothing
/// derived (indicators, tier, gate) is ever stored here; those are
/// recomputed from these raw aggregates on every read, so threshold
/// changes reclassify existing data without migration.
///
/// Events arrive duplicated and out of order. Each field uses a fold
/// strategy that absorbs that:
/// - max-fold gauges (`results_page_seconds`, `max_scroll_depth_percent`)
/// - set-once booleans (`estimate_completed`, `viewed_*`, `saved`, ...)
/// - saturating counters (`tier_toggle_count`, `results_page_loads`),
///   informational only, never compared against gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EngagementProfile {
    /// Identifier of the pricing estimate this profile belongs to
    pub estimate_id: String,
    /// Highest cumulative time-on-results report seen, in seconds
    pub results_page_seconds: u64,
    /// Deepest scroll position reached on the results page
    pub max_scroll_depth_percent: f64,
    /// The user completed the estimate flow
    pub estimate_completed: bool,
    /// The tier comparison content was opened at least once
    pub viewed_comparison: bool,
    /// The financing content was opened at least once
    pub viewed_financing: bool,
    /// The next-steps content was opened at least once
    pub viewed_next_steps: bool,
    /// The estimate was saved at least once
    pub saved: bool,
    /// The estimate was shared at least once
    pub shared: bool,
    /// A pricing tier was selected at least once
    pub selected_tier: bool,
    /// How many tier selections were seen. Duplicates may overcount;
    /// tolerated because this never feeds a gating threshold.
    pub tier_toggle_count: u32,
    /// How many results-page loads were seen. Informational only.
    pub results_page_loads: u32,
    /// occurred_at of the first event that created this profile
    pub created_at: DateTime<Utc>,
    /// Latest occurred_at folded in so far
    pub last_updated_at: DateTime<Utc>,
}

impl EngagementProfile {
    /// Fresh profile with zeroed aggregates, created by the first event
    /// seen for an estimate.
    pub fn new(estimate_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            estimate_id: estimate_id.into(),
            results_page_seconds: 0,
            max_scroll_depth_percent: 0.0,
            estimate_completed: false,
            viewed_comparison: false,
            viewed_financing: false,
            viewed_next_steps: false,
            saved: false,
            shared: false,
            selected_tier: false,
            tier_toggle_count: 0,
            results_page_loads: 0,
            created_at,
            last_updated_at: created_at,
        }
    }

    /// Fold one validated event into the running aggregates.
    ///
    /// Must stay order-independent and duplicate-tolerant for every
    /// field the indicators, classifier, or gate read. Counters are the
    /// one sanctioned exception and stay display-only.
    pub fn fold(&mut self, event: &EngagementEvent) {
        match &event.kind {
            EventKind::EstimateCompleted => self.estimate_completed = true,
            EventKind::ComparisonViewed => self.viewed_comparison = true,
            EventKind::FinancingViewed => self.viewed_financing = true,
            EventKind::NextStepsViewed => self.viewed_next_steps = true,
            EventKind::Saved => self.saved = true,
            EventKind::Shared => self.shared = true,
            EventKind::ResultsPageTime { seconds } => {
                // Clients report cumulative totals, not deltas, so a
                // retried or stale report can only ever be <= the max.
                self.results_page_seconds = self.results_page_seconds.max(*seconds);
            }
            EventKind::ScrollDepth { percent } => {
                self.max_scroll_depth_percent = self.max_scroll_depth_percent.max(*percent);
            }
            EventKind::TierSelected { .. } => {
                self.selected_tier = true;
                self.tier_toggle_count = self.tier_toggle_count.saturating_add(1);
            }
            EventKind::ResultsPageLoaded { .. } => {
                self.results_page_loads = self.results_page_loads.saturating_add(1);
            }
        }
        self.last_updated_at = self.last_updated_at.max(event.occurred_at);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::EngagementProfile;
    use crate::events::{EngagementEvent, EventKind};

    fn event_at(kind: EventKind, occurred_at: DateTime<Utc>) -> EngagementEvent {
        EngagementEvent {
            estimate_id: "est-1001".to_string(),
            occurred_at,
            kind,
        }
    }

    fn event(kind: EventKind) -> EngagementEvent {
        event_at(kind, Utc::now())
    }

    #[test]
    fn new_profile_starts_zeroed() {
        let now = Utc::now();
        let profile = EngagementProfile::new("est-1001", now);
        assert_eq!(profile.results_page_seconds, 0);
        assert_eq!(profile.max_scroll_depth_percent, 0.0);
        assert!(!profile.estimate_completed);
        assert_eq!(profile.tier_toggle_count, 0);
        assert_eq!(profile.created_at, now);
        assert_eq!(profile.last_updated_at, now);
    }

    #[test]
    fn scroll_depth_folds_by_max_regardless_of_order() {
        let now = Utc::now();
        let mut in_order = EngagementProfile::new("est-1001", now);
        in_order.fold(&event(EventKind::ScrollDepth { percent: 60.0 }));
        in_order.fold(&event(EventKind::ScrollDepth { percent: 80.0 }));

        let mut reversed = EngagementProfile::new("est-1001", now);
        reversed.fold(&event(EventKind::ScrollDepth { percent: 80.0 }));
        reversed.fold(&event(EventKind::ScrollDepth { percent: 60.0 }));

        assert_eq!(in_order.max_scroll_depth_percent, 80.0);
        assert_eq!(reversed.max_scroll_depth_percent, 80.0);
    }

    #[test]
    fn duplicate_scroll_depth_changes_nothing() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        let depth = event(EventKind::ScrollDepth { percent: 80.0 });
        profile.fold(&depth);
        let once = profile.clone();
        profile.fold(&depth);
        assert_eq!(profile, once);
    }

    #[test]
    fn results_page_time_never_decreases() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        profile.fold(&event(EventKind::ResultsPageTime { seconds: 95 }));
        profile.fold(&event(EventKind::ResultsPageTime { seconds: 40 }));
        assert_eq!(profile.results_page_seconds, 95);
    }

    #[test]
    fn saved_is_set_once_under_replay() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        profile.fold(&event(EventKind::Saved));
        profile.fold(&event(EventKind::Saved));
        assert!(profile.saved);
        assert!(!profile.shared);
    }

    #[test]
    fn tier_selected_sets_flag_and_counts_toggles() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        profile.fold(&event(EventKind::TierSelected {
            tier_id: "good".to_string(),
        }));
        profile.fold(&event(EventKind::TierSelected {
            tier_id: "better".to_string(),
        }));
        assert!(profile.selected_tier);
        assert_eq!(profile.tier_toggle_count, 2);
    }

    #[test]
    fn results_page_loaded_only_bumps_the_load_counter() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        profile.fold(&event(EventKind::ResultsPageLoaded { load_time_ms: 420 }));
        assert_eq!(profile.results_page_loads, 1);
        assert_eq!(profile.results_page_seconds, 0);
        assert!(!profile.estimate_completed);
    }

    #[test]
    fn last_updated_at_is_the_max_occurred_at_seen() {
        let now = Utc::now();
        let mut profile = EngagementProfile::new("est-1001", now);
        let late = now + Duration::seconds(120);
        profile.fold(&event_at(EventKind::Saved, late));
        profile.fold(&event_at(EventKind::Shared, now - Duration::seconds(60)));
        assert_eq!(profile.last_updated_at, late);
    }
}
