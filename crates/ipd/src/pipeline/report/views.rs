use super::super::aggregate::{MonthlyActivity, PeakActivity};
use super::super::domain::Month;
use super::super::filter::FilterParams;
use super::super::recommend;
use super::super::scoring::{RiskTier, ScoredDistrict};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub total_enrolments: u64,
    pub total_demo_updates: u64,
    pub total_bio_updates: u64,
    /// Busiest day across the unfiltered enrolment data.
    pub peak_activity: PeakActivity,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateActivityEntry {
    pub rank: usize,
    pub state: String,
    pub total_enrolments: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeCompositionEntry {
    pub age_group: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskTierCount {
    /// `None` counts districts whose gap score is undefined.
    pub risk_tier: Option<RiskTier>,
    pub risk_label: &'static str,
    pub districts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotspotView {
    pub rank: usize,
    pub state: String,
    pub district: String,
    pub observed_enrolments: u64,
    pub expected_enrolments: f64,
    pub visibility_gap_score: Option<f64>,
    pub update_intensity_ratio: Option<f64>,
    pub biometric_intensity_ratio: Option<f64>,
    pub risk_tier: Option<RiskTier>,
    pub risk_label: &'static str,
}

impl HotspotView {
    pub fn from_scored(rank: usize, district: &ScoredDistrict) -> Self {
        Self {
            rank,
            state: district.state.clone(),
            district: district.district.clone(),
            observed_enrolments: district.observed_enrolments,
            expected_enrolments: district.expected_enrolments,
            visibility_gap_score: district.visibility_gap_score,
            update_intensity_ratio: district.update_intensity_ratio,
            biometric_intensity_ratio: district.biometric_intensity_ratio,
            risk_tier: district.risk_tier,
            risk_label: district.risk_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPlanEntry {
    pub rank: usize,
    pub state: String,
    pub district: String,
    pub visibility_gap_score: Option<f64>,
    pub update_intensity_ratio: Option<f64>,
    pub biometric_intensity_ratio: Option<f64>,
    pub risk_tier: Option<RiskTier>,
    pub risk_label: &'static str,
    pub actions: Vec<&'static str>,
    pub recommended_action: String,
}

impl ActionPlanEntry {
    pub fn from_scored(rank: usize, district: &ScoredDistrict) -> Self {
        let actions = recommend::recommend(district);
        let recommended_action = recommend::recommend_joined(district);
        Self {
            rank,
            state: district.state.clone(),
            district: district.district.clone(),
            visibility_gap_score: district.visibility_gap_score,
            update_intensity_ratio: district.update_intensity_ratio,
            biometric_intensity_ratio: district.biometric_intensity_ratio,
            risk_tier: district.risk_tier,
            risk_label: district.risk_label(),
            actions,
            recommended_action,
        }
    }
}

/// Selector values available for the month and state filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub months: Vec<Month>,
    pub states: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub filters: FilterParams,
    pub kpis: KpiSummary,
    pub top_states: Vec<StateActivityEntry>,
    pub age_composition: Vec<AgeCompositionEntry>,
    pub monthly_trend: Vec<MonthlyActivity>,
    pub risk_distribution: Vec<RiskTierCount>,
    pub hotspots: Vec<HotspotView>,
    pub action_plan: Vec<ActionPlanEntry>,
}
