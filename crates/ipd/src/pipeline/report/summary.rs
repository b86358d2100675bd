use super::super::aggregate;
use super::super::domain::{DatasetKind, NormalizedTable};
use super::super::filter::{self, FilterParams};
use super::super::loader::{BatchSource, DatasetLoader};
use super::super::scoring::{self, HotspotMetric, RiskTier, ScoredDistrict};
use super::super::PipelineError;
use super::views::{
    ActionPlanEntry, AgeCompositionEntry, DashboardReport, FilterOptions, HotspotView, KpiSummary,
    RiskTierCount, StateActivityEntry,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_states: usize,
    pub hotspots: usize,
    pub action_plan: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_states: 15,
            hotspots: 20,
            action_plan: 25,
        }
    }
}

/// The three loaded base tables. Shared read-only between requests.
#[derive(Debug, Clone)]
pub struct DatasetTables {
    pub enrolment: Arc<NormalizedTable>,
    pub demographic: Arc<NormalizedTable>,
    pub biometric: Arc<NormalizedTable>,
}

/// Request-local filtered views of [`DatasetTables`].
#[derive(Debug, Clone)]
pub struct FilteredTables {
    pub enrolment: NormalizedTable,
    pub demographic: NormalizedTable,
    pub biometric: NormalizedTable,
}

impl DatasetTables {
    /// Loads all three kinds; a missing kind aborts the whole load.
    pub fn load<S: BatchSource>(loader: &DatasetLoader<S>) -> Result<Self, PipelineError> {
        Ok(Self {
            enrolment: loader.load(DatasetKind::Enrolment)?,
            demographic: loader.load(DatasetKind::DemographicUpdate)?,
            biometric: loader.load(DatasetKind::BiometricUpdate)?,
        })
    }

    pub fn filtered(&self, params: &FilterParams) -> FilteredTables {
        FilteredTables {
            enrolment: filter::apply(&self.enrolment, params),
            demographic: filter::apply(&self.demographic, params),
            biometric: filter::apply(&self.biometric, params),
        }
    }

    /// Months and states offered as filters, taken from the enrolment table.
    pub fn options(&self) -> FilterOptions {
        FilterOptions {
            months: self.enrolment.months(),
            states: self.enrolment.states(),
        }
    }

    /// Scores every district visible under `params`, in (state, district) order.
    pub fn score(&self, params: &FilterParams) -> Vec<ScoredDistrict> {
        self.filtered(params).score()
    }
}

impl FilteredTables {
    pub fn score(&self) -> Vec<ScoredDistrict> {
        let districts = aggregate::by_district(&self.enrolment, &self.demographic, &self.biometric);
        scoring::score(&districts)
    }
}

impl DashboardReport {
    pub fn build(tables: &DatasetTables, params: &FilterParams, options: ReportOptions) -> Self {
        let filtered = tables.filtered(params);
        let scored = filtered.score();
        let ranked = scoring::rank_by(&scored, HotspotMetric::Vgs);

        debug!(
            filters = ?params,
            enrolment_rows = filtered.enrolment.len(),
            districts = scored.len(),
            "building dashboard report"
        );

        let kpis = KpiSummary {
            total_enrolments: filtered.enrolment.total(),
            total_demo_updates: filtered.demographic.total(),
            total_bio_updates: filtered.biometric.total(),
            peak_activity: aggregate::peak_activity_date(&tables.enrolment),
        };

        let hotspots = ranked
            .iter()
            .take(options.hotspots)
            .enumerate()
            .map(|(index, district)| HotspotView::from_scored(index + 1, district))
            .collect();

        let action_plan = ranked
            .iter()
            .take(options.action_plan)
            .enumerate()
            .map(|(index, district)| ActionPlanEntry::from_scored(index + 1, district))
            .collect();

        Self {
            filters: params.clone(),
            kpis,
            top_states: top_states(&filtered.enrolment, options.top_states),
            age_composition: age_composition(&filtered.enrolment),
            monthly_trend: aggregate::monthly_trend(
                &tables.enrolment,
                &tables.demographic,
                &tables.biometric,
            ),
            risk_distribution: risk_distribution(&scored),
            hotspots,
            action_plan,
        }
    }
}

fn top_states(enrolment: &NormalizedTable, limit: usize) -> Vec<StateActivityEntry> {
    let mut states = aggregate::by_state(enrolment);
    states.sort_by(|a, b| b.total.cmp(&a.total));
    states
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, entry)| StateActivityEntry {
            rank: index + 1,
            state: entry.state,
            total_enrolments: entry.total,
        })
        .collect()
}

fn age_composition(enrolment: &NormalizedTable) -> Vec<AgeCompositionEntry> {
    let totals = aggregate::column_totals(enrolment);
    let grand_total: u64 = totals.iter().map(|entry| entry.total).sum();
    totals
        .into_iter()
        .map(|entry| AgeCompositionEntry {
            share: (grand_total > 0).then(|| entry.total as f64 / grand_total as f64),
            age_group: entry.column,
            count: entry.total,
        })
        .collect()
}

fn risk_distribution(scored: &[ScoredDistrict]) -> Vec<RiskTierCount> {
    [
        Some(RiskTier::High),
        Some(RiskTier::Medium),
        Some(RiskTier::Low),
        None,
    ]
    .into_iter()
    .map(|tier| RiskTierCount {
        risk_tier: tier,
        risk_label: scoring::risk_label(tier),
        districts: scored
            .iter()
            .filter(|district| district.risk_tier == tier)
            .count(),
    })
    .collect()
}
