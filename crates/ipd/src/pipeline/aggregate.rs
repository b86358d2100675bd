use super::domain::{Month, NormalizedTable};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateAggregate {
    pub state: String,
    pub total: u64,
}

/// Enrolment, demographic and biometric sums for one (state, district) pair,
/// plus the owning state's enrolment totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictAggregate {
    pub state: String,
    pub district: String,
    pub observed_enrolments: u64,
    pub demo_updates: u64,
    pub bio_updates: u64,
    pub state_total_enrolments: u64,
    pub num_districts_in_state: usize,
}

impl DistrictAggregate {
    /// Per-district share of the state's enrolments; `None` only for an
    /// aggregate with no districts, which [`by_district`] never produces.
    pub fn expected_enrolments(&self) -> Option<f64> {
        (self.num_districts_in_state > 0)
            .then(|| self.state_total_enrolments as f64 / self.num_districts_in_state as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeakActivity {
    Peak { date: NaiveDate, total: u64 },
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyActivity {
    pub month: Month,
    pub enrolments: u64,
    pub demo_updates: u64,
    pub bio_updates: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnTotal {
    pub column: String,
    pub total: u64,
}

/// Sums totals per state, ordered by state name.
pub fn by_state(table: &NormalizedTable) -> Vec<StateAggregate> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for record in table.records() {
        *totals.entry(record.state.as_str()).or_default() += record.total;
    }
    totals
        .into_iter()
        .map(|(state, total)| StateAggregate {
            state: state.to_string(),
            total,
        })
        .collect()
}

/// Sums totals per (state, district), ordered by key.
pub fn district_totals(table: &NormalizedTable) -> BTreeMap<(String, String), u64> {
    let mut totals: BTreeMap<(String, String), u64> = BTreeMap::new();
    for record in table.records() {
        *totals
            .entry((record.state.clone(), record.district.clone()))
            .or_default() += record.total;
    }
    totals
}

/// Builds one aggregate per (state, district) present in `enrol`.
///
/// District coverage and the per-state denominator both come from the
/// enrolment table; demographic and biometric sums are joined onto those keys
/// and default to zero.
pub fn by_district(
    enrol: &NormalizedTable,
    demo: &NormalizedTable,
    bio: &NormalizedTable,
) -> Vec<DistrictAggregate> {
    let observed = district_totals(enrol);
    let demo_totals = district_totals(demo);
    let bio_totals = district_totals(bio);

    let mut state_totals: HashMap<&str, u64> = HashMap::new();
    let mut state_districts: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for ((state, district), total) in &observed {
        *state_totals.entry(state.as_str()).or_default() += total;
        state_districts
            .entry(state.as_str())
            .or_default()
            .insert(district.as_str());
    }

    observed
        .iter()
        .map(|(key, &observed_enrolments)| {
            let (state, district) = key;
            DistrictAggregate {
                state: state.clone(),
                district: district.clone(),
                observed_enrolments,
                demo_updates: demo_totals.get(key).copied().unwrap_or(0),
                bio_updates: bio_totals.get(key).copied().unwrap_or(0),
                state_total_enrolments: state_totals.get(state.as_str()).copied().unwrap_or(0),
                num_districts_in_state: state_districts
                    .get(state.as_str())
                    .map_or(0, BTreeSet::len),
            }
        })
        .collect()
}

/// Finds the busiest day in an enrolment table. Undated rows are ignored and
/// ties go to the earliest date.
pub fn peak_activity_date(enrol: &NormalizedTable) -> PeakActivity {
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in enrol.records() {
        if let Some(date) = record.date {
            *daily.entry(date).or_default() += record.total;
        }
    }

    daily
        .into_iter()
        .fold(None, |best: Option<(NaiveDate, u64)>, (date, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((date, total)),
        })
        .map_or(PeakActivity::NoData, |(date, total)| PeakActivity::Peak {
            date,
            total,
        })
}

/// Per-month totals of the three tables, outer-joined on month and sorted.
/// Rows without a month are left out.
pub fn monthly_trend(
    enrol: &NormalizedTable,
    demo: &NormalizedTable,
    bio: &NormalizedTable,
) -> Vec<MonthlyActivity> {
    let mut months: BTreeMap<Month, [u64; 3]> = BTreeMap::new();
    for (slot, table) in [enrol, demo, bio].into_iter().enumerate() {
        for record in table.records() {
            if let Some(month) = record.month {
                months.entry(month).or_default()[slot] += record.total;
            }
        }
    }

    months
        .into_iter()
        .map(|(month, [enrolments, demo_updates, bio_updates])| MonthlyActivity {
            month,
            enrolments,
            demo_updates,
            bio_updates,
        })
        .collect()
}

/// Per-column sums of a table's count columns, in column order.
pub fn column_totals(table: &NormalizedTable) -> Vec<ColumnTotal> {
    let mut totals = vec![0u64; table.columns().len()];
    for record in table.records() {
        for (slot, value) in totals.iter_mut().zip(&record.counts) {
            *slot += value;
        }
    }
    table
        .columns()
        .iter()
        .zip(totals)
        .map(|(column, total)| ColumnTotal {
            column: column.clone(),
            total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{ActivityRecord, DatasetKind};

    fn table(kind: DatasetKind, rows: &[(Option<(i32, u32, u32)>, &str, &str, u64)]) -> NormalizedTable {
        let records = rows
            .iter()
            .map(|&(date, state, district, count)| {
                let date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
                ActivityRecord::new(date, state.into(), district.into(), vec![count])
            })
            .collect();
        NormalizedTable::with_records(kind, vec!["count".into()], records)
    }

    fn empty(kind: DatasetKind) -> NormalizedTable {
        NormalizedTable::new(kind, vec!["count".into()])
    }

    #[test]
    fn state_totals_are_sorted_by_state() {
        let enrol = table(
            DatasetKind::Enrolment,
            &[
                (None, "Goa", "North Goa", 3),
                (None, "Assam", "Cachar", 10),
                (None, "Goa", "South Goa", 4),
            ],
        );
        assert_eq!(
            by_state(&enrol),
            vec![
                StateAggregate { state: "Assam".into(), total: 10 },
                StateAggregate { state: "Goa".into(), total: 7 },
            ]
        );
    }

    #[test]
    fn district_aggregates_join_updates_onto_enrolment_keys() {
        let enrol = table(
            DatasetKind::Enrolment,
            &[
                (None, "Bihar", "Patna", 60),
                (None, "Bihar", "Gaya", 40),
                (None, "Bihar", "Patna", 20),
                (None, "Goa", "North Goa", 5),
            ],
        );
        let demo = table(
            DatasetKind::DemographicUpdate,
            &[(None, "Bihar", "Gaya", 9), (None, "Kerala", "Kollam", 100)],
        );
        let bio = table(DatasetKind::BiometricUpdate, &[(None, "Goa", "North Goa", 2)]);

        let districts = by_district(&enrol, &demo, &bio);
        assert_eq!(districts.len(), 3, "Kollam has no enrolments and is dropped");

        let gaya = &districts[0];
        assert_eq!((gaya.state.as_str(), gaya.district.as_str()), ("Bihar", "Gaya"));
        assert_eq!(gaya.observed_enrolments, 40);
        assert_eq!(gaya.demo_updates, 9);
        assert_eq!(gaya.bio_updates, 0);
        assert_eq!(gaya.state_total_enrolments, 120);
        assert_eq!(gaya.num_districts_in_state, 2);
        assert_eq!(gaya.expected_enrolments(), Some(60.0));

        let north_goa = &districts[2];
        assert_eq!(north_goa.bio_updates, 2);
        assert_eq!(north_goa.num_districts_in_state, 1);
    }

    #[test]
    fn district_observations_sum_to_state_total() {
        let enrol = table(
            DatasetKind::Enrolment,
            &[
                (None, "Bihar", "Patna", 7),
                (None, "Bihar", "Gaya", 0),
                (None, "Bihar", "Nalanda", 13),
                (None, "Goa", "North Goa", 5),
            ],
        );
        let districts = by_district(&enrol, &empty(DatasetKind::DemographicUpdate), &empty(DatasetKind::BiometricUpdate));
        for state in by_state(&enrol) {
            let observed: u64 = districts
                .iter()
                .filter(|d| d.state == state.state)
                .map(|d| d.observed_enrolments)
                .sum();
            assert_eq!(observed, state.total);
            assert!(districts
                .iter()
                .filter(|d| d.state == state.state)
                .all(|d| d.state_total_enrolments == state.total));
        }
    }

    #[test]
    fn empty_inputs_produce_empty_aggregates() {
        let enrol = empty(DatasetKind::Enrolment);
        assert!(by_state(&enrol).is_empty());
        assert!(by_district(&enrol, &empty(DatasetKind::DemographicUpdate), &empty(DatasetKind::BiometricUpdate)).is_empty());
        assert_eq!(peak_activity_date(&enrol), PeakActivity::NoData);
    }

    #[test]
    fn peak_date_skips_undated_rows_and_prefers_earliest_tie() {
        let enrol = table(
            DatasetKind::Enrolment,
            &[
                (Some((2025, 5, 2)), "Goa", "A", 30),
                (None, "Goa", "A", 500),
                (Some((2025, 5, 1)), "Goa", "A", 10),
                (Some((2025, 5, 1)), "Goa", "B", 20),
                (Some((2025, 5, 3)), "Goa", "B", 5),
            ],
        );
        assert_eq!(
            peak_activity_date(&enrol),
            PeakActivity::Peak {
                date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                total: 30,
            }
        );

        let undated = table(DatasetKind::Enrolment, &[(None, "Goa", "A", 9)]);
        assert_eq!(peak_activity_date(&undated), PeakActivity::NoData);
    }

    #[test]
    fn monthly_trend_outer_joins_months() {
        let enrol = table(
            DatasetKind::Enrolment,
            &[(Some((2025, 3, 1)), "Goa", "A", 4), (Some((2025, 4, 1)), "Goa", "A", 6)],
        );
        let demo = table(
            DatasetKind::DemographicUpdate,
            &[(Some((2025, 5, 1)), "Goa", "A", 8), (None, "Goa", "A", 100)],
        );
        let bio = table(DatasetKind::BiometricUpdate, &[(Some((2025, 3, 20)), "Goa", "A", 2)]);

        let trend = monthly_trend(&enrol, &demo, &bio);
        let months: Vec<String> = trend.iter().map(|row| row.month.to_string()).collect();
        assert_eq!(months, vec!["2025-03", "2025-04", "2025-05"]);
        assert_eq!((trend[0].enrolments, trend[0].demo_updates, trend[0].bio_updates), (4, 0, 2));
        assert_eq!((trend[2].enrolments, trend[2].demo_updates, trend[2].bio_updates), (0, 8, 0));
    }

    #[test]
    fn column_totals_follow_column_order() {
        let records = vec![
            ActivityRecord::new(None, "Goa".into(), "A".into(), vec![1, 2, 3]),
            ActivityRecord::new(None, "Goa".into(), "B".into(), vec![10, 0, 5]),
        ];
        let enrol = NormalizedTable::with_records(
            DatasetKind::Enrolment,
            vec!["age_0_5".into(), "age_5_17".into(), "age_18_greater".into()],
            records,
        );
        let totals: Vec<(String, u64)> = column_totals(&enrol)
            .into_iter()
            .map(|entry| (entry.column, entry.total))
            .collect();
        assert_eq!(
            totals,
            vec![
                ("age_0_5".to_string(), 11),
                ("age_5_17".to_string(), 2),
                ("age_18_greater".to_string(), 8),
            ]
        );
    }
}
