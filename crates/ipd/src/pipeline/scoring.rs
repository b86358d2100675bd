use super::aggregate::DistrictAggregate;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const VGS_FLOOR: f64 = -1.0;
pub const VGS_CEILING: f64 = 5.0;

/// Upper bound (inclusive) of the Low tier.
pub const LOW_RISK_MAX: f64 = 0.10;
/// Upper bound (inclusive) of the Medium tier.
pub const MEDIUM_RISK_MAX: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(visibility_gap_score: f64) -> Self {
        if visibility_gap_score <= LOW_RISK_MAX {
            Self::Low
        } else if visibility_gap_score <= MEDIUM_RISK_MAX {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Label shown for a district whose gap score is undefined.
pub const UNDEFINED_RISK_LABEL: &str = "Undefined";

pub fn risk_label(tier: Option<RiskTier>) -> &'static str {
    tier.map_or(UNDEFINED_RISK_LABEL, RiskTier::label)
}

/// District aggregate with its visibility gap score, update intensity (MPI),
/// biometric intensity (BSI) and risk tier. `None` ratios are undefined:
/// MPI/BSI when the district has no enrolments, VGS (and so the tier) when
/// its state has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDistrict {
    pub state: String,
    pub district: String,
    pub observed_enrolments: u64,
    pub expected_enrolments: f64,
    pub demo_updates: u64,
    pub bio_updates: u64,
    pub state_total_enrolments: u64,
    pub num_districts_in_state: usize,
    pub visibility_gap_score: Option<f64>,
    pub update_intensity_ratio: Option<f64>,
    pub biometric_intensity_ratio: Option<f64>,
    pub risk_tier: Option<RiskTier>,
}

impl ScoredDistrict {
    pub fn risk_label(&self) -> &'static str {
        risk_label(self.risk_tier)
    }
}

/// `1 - observed / expected`, clamped to `[VGS_FLOOR, VGS_CEILING]`.
/// Undefined when the expected value is zero, i.e. the state recorded no
/// enrolments at all.
pub fn visibility_gap_score(observed: u64, expected: f64) -> Option<f64> {
    if expected.is_nan() || expected <= 0.0 {
        return None;
    }
    Some((1.0 - observed as f64 / expected).clamp(VGS_FLOOR, VGS_CEILING))
}

/// `numerator / observed`, undefined when there were no enrolments.
pub fn intensity_ratio(numerator: u64, observed: u64) -> Option<f64> {
    (observed > 0).then(|| numerator as f64 / observed as f64)
}

pub fn score_district(district: &DistrictAggregate) -> ScoredDistrict {
    let expected = district.expected_enrolments().unwrap_or(0.0);
    let vgs = visibility_gap_score(district.observed_enrolments, expected);

    ScoredDistrict {
        state: district.state.clone(),
        district: district.district.clone(),
        observed_enrolments: district.observed_enrolments,
        expected_enrolments: expected,
        demo_updates: district.demo_updates,
        bio_updates: district.bio_updates,
        state_total_enrolments: district.state_total_enrolments,
        num_districts_in_state: district.num_districts_in_state,
        visibility_gap_score: vgs,
        update_intensity_ratio: intensity_ratio(district.demo_updates, district.observed_enrolments),
        biometric_intensity_ratio: intensity_ratio(district.bio_updates, district.observed_enrolments),
        risk_tier: vgs.map(RiskTier::from_score),
    }
}

/// Scores every aggregate, preserving input order.
pub fn score(districts: &[DistrictAggregate]) -> Vec<ScoredDistrict> {
    districts.iter().map(score_district).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotMetric {
    #[default]
    Vgs,
    Mpi,
    Bsi,
}

impl HotspotMetric {
    pub fn value(self, district: &ScoredDistrict) -> Option<f64> {
        match self {
            Self::Vgs => district.visibility_gap_score,
            Self::Mpi => district.update_intensity_ratio,
            Self::Bsi => district.biometric_intensity_ratio,
        }
    }
}

impl fmt::Display for HotspotMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vgs => "vgs",
            Self::Mpi => "mpi",
            Self::Bsi => "bsi",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hotspot metric '{0}' (expected vgs, mpi or bsi)")]
pub struct UnknownMetric(pub String);

impl FromStr for HotspotMetric {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vgs" | "visibility_gap_score" => Ok(Self::Vgs),
            "mpi" | "update_intensity_ratio" => Ok(Self::Mpi),
            "bsi" | "biometric_intensity_ratio" => Ok(Self::Bsi),
            _ => Err(UnknownMetric(value.to_string())),
        }
    }
}

/// Descending order by `metric`; undefined values sort after every defined one.
fn descending(metric: HotspotMetric, a: &ScoredDistrict, b: &ScoredDistrict) -> Ordering {
    match (metric.value(a), metric.value(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable descending ranking by `metric`.
pub fn rank_by(districts: &[ScoredDistrict], metric: HotspotMetric) -> Vec<ScoredDistrict> {
    let mut ranked = districts.to_vec();
    ranked.sort_by(|a, b| descending(metric, a, b));
    ranked
}

/// The `limit` districts with the largest visibility gap.
pub fn top_hotspots(districts: &[ScoredDistrict], limit: usize) -> Vec<ScoredDistrict> {
    let mut ranked = rank_by(districts, HotspotMetric::Vgs);
    ranked.truncate(limit);
    ranked
}
