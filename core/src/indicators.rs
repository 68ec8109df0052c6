use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::profile::EngagementProfile;

/// Seconds on the results page before a completed estimate counts as
/// high intent.
pub const HIGH_INTENT_MIN_SECONDS: u64 = 60;

/// The fixed vocabulary of derived engagement labels.
///
/// Indicators are recomputed from the profile on every read and never
/// stored, so tuning a threshold reclassifies existing estimates with
/// no migration. Both consumers (the end-user gate and the lead
/// dashboard) call the same rules and therefore always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityIndicator {
    HighIntent,
    ReviewedOptions,
    ViewedFinancing,
    SavedOrShared,
}

impl QualityIndicator {
    /// Every indicator, in display order. [`derive_indicators`] emits
    /// its subset in exactly this order.
    pub const ALL: [QualityIndicator; 4] = [
        QualityIndicator::HighIntent,
        QualityIndicator::ReviewedOptions,
        QualityIndicator::ViewedFinancing,
        QualityIndicator::SavedOrShared,
    ];

    /// Wire code for APIs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityIndicator::HighIntent => "high_intent",
            QualityIndicator::ReviewedOptions => "reviewed_options",
            QualityIndicator::ViewedFinancing => "viewed_financing",
            QualityIndicator::SavedOrShared => "saved_or_shared",
        }
    }

    /// Human-readable label as shown on the lead dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            QualityIndicator::HighIntent => "High intent",
            QualityIndicator::ReviewedOptions => "Reviewed options",
            QualityIndicator::ViewedFinancing => "Viewed financing",
            QualityIndicator::SavedOrShared => "Saved/shared estimate",
        }
    }

    /// Whether this indicator's rule holds for the profile.
    pub fn applies_to(&self, profile: &EngagementProfile) -> bool {
        match self {
            QualityIndicator::HighIntent => high_intent(profile),
            QualityIndicator::ReviewedOptions => reviewed_options(profile),
            QualityIndicator::ViewedFinancing => viewed_financing(profile),
            QualityIndicator::SavedOrShared => saved_or_shared(profile),
        }
    }
}

/// Completed the estimate flow and spent real time on the results.
pub fn high_intent(profile: &EngagementProfile) -> bool {
    profile.estimate_completed && profile.results_page_seconds >= HIGH_INTENT_MIN_SECONDS
}

/// Opened the comparison content, or selected a tier at least once.
pub fn reviewed_options(profile: &EngagementProfile) -> bool {
    profile.viewed_comparison || profile.selected_tier
}

/// Opened the financing content.
pub fn viewed_financing(profile: &EngagementProfile) -> bool {
    profile.viewed_financing
}

/// Saved or shared the estimate.
pub fn saved_or_shared(profile: &EngagementProfile) -> bool {
    profile.saved || profile.shared
}

/// Derive the indicator list for a profile.
///
/// Order-stable (catalog order) and duplicate-free by construction.
/// The rules are independent and additive: a profile may satisfy zero
/// to all four.
pub fn derive_indicators(profile: &EngagementProfile) -> Vec<QualityIndicator> {
    QualityIndicator::ALL
        .into_iter()
        .filter(|indicator| indicator.applies_to(profile))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{HIGH_INTENT_MIN_SECONDS, QualityIndicator, derive_indicators};
    use crate::profile::EngagementProfile;

    fn profile() -> EngagementProfile {
        EngagementProfile::new("est-1001", Utc::now())
    }

    #[test]
    fn fresh_profile_earns_no_indicators() {
        assert!(derive_indicators(&profile()).is_empty());
    }

    #[test]
    fn high_intent_needs_completion_and_enough_time() {
        let mut p = profile();
        p.results_page_seconds = HIGH_INTENT_MIN_SECONDS;
        assert!(!derive_indicators(&p).contains(&QualityIndicator::HighIntent));

        p.estimate_completed = true;
        p.results_page_seconds = HIGH_INTENT_MIN_SECONDS - 1;
        assert!(!derive_indicators(&p).contains(&QualityIndicator::HighIntent));

        p.results_page_seconds = HIGH_INTENT_MIN_SECONDS;
        assert!(derive_indicators(&p).contains(&QualityIndicator::HighIntent));
    }

    #[test]
    fn reviewed_options_via_comparison_or_tier_selection() {
        let mut via_comparison = profile();
        via_comparison.viewed_comparison = true;
        assert!(derive_indicators(&via_comparison).contains(&QualityIndicator::ReviewedOptions));

        let mut via_tier = profile();
        via_tier.selected_tier = true;
        via_tier.tier_toggle_count = 1;
        assert!(derive_indicators(&via_tier).contains(&QualityIndicator::ReviewedOptions));
    }

    #[test]
    fn saved_or_shared_from_either_flag() {
        let mut saved = profile();
        saved.saved = true;
        assert!(derive_indicators(&saved).contains(&QualityIndicator::SavedOrShared));

        let mut shared = profile();
        shared.shared = true;
        assert!(derive_indicators(&shared).contains(&QualityIndicator::SavedOrShared));
    }

    #[test]
    fn full_house_comes_back_in_catalog_order() {
        let mut p = profile();
        p.estimate_completed = true;
        p.results_page_seconds = 120;
        p.viewed_comparison = true;
        p.viewed_financing = true;
        p.saved = true;
        assert_eq!(derive_indicators(&p), QualityIndicator::ALL.to_vec());
    }

    #[test]
    fn labels_and_codes_are_stable() {
        assert_eq!(QualityIndicator::HighIntent.as_str(), "high_intent");
        assert_eq!(QualityIndicator::SavedOrShared.label(), "Saved/shared estimate");
    }
}
