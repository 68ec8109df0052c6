use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::profile::EngagementProfile;

/// Results-page seconds required for the top tier.
pub const READY_MIN_SECONDS: u64 = 90;

/// Tier toggles that substitute for opening the next-steps content.
pub const READY_MIN_TOGGLES: u32 = 2;

/// Results-page seconds required for the middle tier.
pub const PLANNING_MIN_SECONDS: u64 = 30;

/// The three-level ordered readiness classification.
///
/// Derived on read, never stored. `Ord` follows engagement depth, so
/// gate checks can compare tiers directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessTier {
    ExploringOptions,
    ActivelyPlanning,
    ReadyForSiteVisit,
}

impl ReadinessTier {
    /// Wire code for APIs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessTier::ExploringOptions => "exploring_options",
            ReadinessTier::ActivelyPlanning => "actively_planning",
            ReadinessTier::ReadyForSiteVisit => "ready_for_site_visit",
        }
    }

    /// Human-readable label as shown on the lead dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            ReadinessTier::ExploringOptions => "Exploring options",
            ReadinessTier::ActivelyPlanning => "Actively planning",
            ReadinessTier::ReadyForSiteVisit => "Ready for on-site evaluation",
        }
    }
}

/// Classify a profile into exactly one tier.
///
/// The checks run top-down and the first satisfied tier wins. That
/// ordering is load-bearing: moving a rule changes observable
/// classification. Total by construction, so a brand-new all-default
/// profile lands on `ExploringOptions` rather than erroring.
pub fn classify(profile: &EngagementProfile) -> ReadinessTier {
    if ready_for_site_visit(profile) {
        ReadinessTier::ReadyForSiteVisit
    } else if actively_planning(profile) {
        ReadinessTier::ActivelyPlanning
    } else {
        ReadinessTier::ExploringOptions
    }
}

/// Completed the estimate, dug into next steps (or toggled tiers
/// repeatedly), and spent substantial time on the results.
pub fn ready_for_site_visit(profile: &EngagementProfile) -> bool {
    profile.estimate_completed
        && (profile.viewed_next_steps || profile.tier_toggle_count >= READY_MIN_TOGGLES)
        && profile.results_page_seconds >= READY_MIN_SECONDS
}

/// Completed the estimate and started weighing options.
pub fn actively_planning(profile: &EngagementProfile) -> bool {
    profile.estimate_completed
        && (profile.viewed_comparison || profile.viewed_financing)
        && profile.results_page_seconds >= PLANNING_MIN_SECONDS
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{PLANNING_MIN_SECONDS, READY_MIN_SECONDS, ReadinessTier, classify};
    use crate::indicators::derive_indicators;
    use crate::profile::EngagementProfile;

    fn profile() -> EngagementProfile {
        EngagementProfile::new("est-1001", Utc::now())
    }

    #[test]
    fn tiers_order_by_engagement_depth() {
        assert!(ReadinessTier::ExploringOptions < ReadinessTier::ActivelyPlanning);
        assert!(ReadinessTier::ActivelyPlanning < ReadinessTier::ReadyForSiteVisit);
    }

    #[test]
    fn brand_new_profile_is_exploring_options() {
        assert_eq!(classify(&profile()), ReadinessTier::ExploringOptions);
    }

    #[test]
    fn completed_with_next_steps_and_long_dwell_is_ready() {
        let mut p = profile();
        p.estimate_completed = true;
        p.viewed_next_steps = true;
        p.results_page_seconds = 95;
        assert_eq!(classify(&p), ReadinessTier::ReadyForSiteVisit);
    }

    #[test]
    fn repeated_tier_toggles_substitute_for_next_steps() {
        let mut p = profile();
        p.estimate_completed = true;
        p.selected_tier = true;
        p.tier_toggle_count = 2;
        p.results_page_seconds = READY_MIN_SECONDS;
        assert_eq!(classify(&p), ReadinessTier::ReadyForSiteVisit);
    }

    #[test]
    fn short_dwell_drops_out_of_the_top_tier() {
        let mut p = profile();
        p.estimate_completed = true;
        p.viewed_next_steps = true;
        p.results_page_seconds = READY_MIN_SECONDS - 1;
        // No comparison or financing view either, so the middle tier
        // does not catch it.
        assert_eq!(classify(&p), ReadinessTier::ExploringOptions);
    }

    #[test]
    fn comparison_plus_dwell_reaches_actively_planning() {
        let mut p = profile();
        p.estimate_completed = true;
        p.viewed_comparison = true;
        p.results_page_seconds = PLANNING_MIN_SECONDS;
        assert_eq!(classify(&p), ReadinessTier::ActivelyPlanning);

        p.results_page_seconds = PLANNING_MIN_SECONDS - 1;
        assert_eq!(classify(&p), ReadinessTier::ExploringOptions);
    }

    #[test]
    fn without_completion_no_upper_tier_is_reachable() {
        let mut p = profile();
        p.viewed_comparison = true;
        p.viewed_financing = true;
        p.viewed_next_steps = true;
        p.selected_tier = true;
        p.tier_toggle_count = 5;
        p.results_page_seconds = 500;
        assert_eq!(classify(&p), ReadinessTier::ExploringOptions);
    }

    #[test]
    fn first_matching_tier_wins_when_both_rules_hold() {
        let mut p = profile();
        p.estimate_completed = true;
        p.viewed_next_steps = true;
        p.viewed_comparison = true;
        p.results_page_seconds = 120;
        assert_eq!(classify(&p), ReadinessTier::ReadyForSiteVisit);
    }

    #[test]
    fn incidental_counters_do_not_move_the_tier() {
        let mut lean = profile();
        lean.estimate_completed = true;
        lean.viewed_next_steps = true;
        lean.viewed_comparison = true;
        lean.results_page_seconds = 95;
        lean.selected_tier = true;
        lean.tier_toggle_count = 2;

        let mut busy = lean.clone();
        busy.tier_toggle_count = 9;
        busy.results_page_loads = 40;
        busy.max_scroll_depth_percent = 100.0;

        assert_eq!(derive_indicators(&lean), derive_indicators(&busy));
        assert_eq!(classify(&lean), classify(&busy));
    }

    #[test]
    fn labels_and_codes_are_stable() {
        assert_eq!(ReadinessTier::ReadyForSiteVisit.as_str(), "ready_for_site_visit");
        assert_eq!(
            ReadinessTier::ReadyForSiteVisit.label(),
            "Ready for on-site evaluation"
        );
        assert_eq!(ReadinessTier::ExploringOptions.label(), "Exploring options");
    }
}
