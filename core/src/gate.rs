use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::indicators::derive_indicators;
use crate::profile::EngagementProfile;
use crate::readiness::{ReadinessTier, classify};

/// Indicator count that passes the gate regardless of tier.
pub const GATE_MIN_INDICATORS: usize = 2;

/// UI section a blocked caller is pointed toward.
pub const HINT_COMPARISON_SECTION: &str = "tier_comparison";

/// Wire names of every action the gate knows how to judge.
pub const KNOWN_ACTIONS: [&str; 1] = ["request_site_visit"];

/// Shown when the gate nudges instead of proceeding. Non-blaming and
/// non-technical; the consuming UI renders it next to the comparison
/// content it scrolls to.
const SITE_VISIT_NUDGE: &str =
    "Take a quick look at how the tiers compare first. It helps us make an on-site evaluation worth your time.";

/// High-commitment actions guarded by the gate. A closed set, like the
/// event kinds: unknown names are rejected at the edge, not coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    /// Request a professional on-site evaluation
    RequestSiteVisit,
}

impl GateAction {
    /// Wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::RequestSiteVisit => "request_site_visit",
        }
    }

    /// Parse a wire name into an action.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "request_site_visit" => Some(GateAction::RequestSiteVisit),
            _ => None,
        }
    }
}

/// Outcome of one gate evaluation. Computed fresh every time and never
/// cached; the profile can change between checks within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GateDecision {
    /// Whether the caller may proceed to the action right now
    pub allowed: bool,
    /// Why not, phrased for the end user (blocked only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_if_blocked: Option<String>,
    /// UI section to scroll to and expand (blocked only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_target_section: Option<String>,
}

impl GateDecision {
    fn proceed() -> Self {
        Self {
            allowed: true,
            reason_if_blocked: None,
            hint_target_section: None,
        }
    }

    fn nudge(reason: &str, section: &str) -> Self {
        Self {
            allowed: false,
            reason_if_blocked: Some(reason.to_string()),
            hint_target_section: Some(section.to_string()),
        }
    }
}

/// Decide whether a caller may proceed to `action` right now.
///
/// Pure and safe to call speculatively. The gate is a soft nudge, not
/// access control: a blocked decision always points at content that
/// raises engagement, and the UI keeps a manual override path, so there
/// is never a dead end.
pub fn evaluate(profile: &EngagementProfile, action: GateAction) -> GateDecision {
    match action {
        GateAction::RequestSiteVisit => request_site_visit_decision(profile),
    }
}

fn request_site_visit_decision(profile: &EngagementProfile) -> GateDecision {
    let tier_allows = classify(profile) >= ReadinessTier::ActivelyPlanning;
    let indicators_allow = derive_indicators(profile).len() >= GATE_MIN_INDICATORS;

    // An OR with no precedence: whichever condition is looser passes.
    if tier_allows || indicators_allow {
        GateDecision::proceed()
    } else {
        GateDecision::nudge(SITE_VISIT_NUDGE, HINT_COMPARISON_SECTION)
    }
}
