use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Label substituted for a missing or blank `state`/`district` cell.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Enrolment,
    DemographicUpdate,
    BiometricUpdate,
}

impl DatasetKind {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::Enrolment,
            Self::DemographicUpdate,
            Self::BiometricUpdate,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Enrolment => "enrolment",
            Self::DemographicUpdate => "demographic update",
            Self::BiometricUpdate => "biometric update",
        }
    }

    /// File name prefix used by the published UIDAI API extracts.
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Self::Enrolment => "api_data_aadhar_enrolment_",
            Self::DemographicUpdate => "api_data_aadhar_demographic_",
            Self::BiometricUpdate => "api_data_aadhar_biometric_",
        }
    }

    pub const fn total_column(self) -> &'static str {
        match self {
            Self::Enrolment => "total_enrolments",
            Self::DemographicUpdate => "total_demo_updates",
            Self::BiometricUpdate => "total_bio_updates",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar year-month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a YYYY-MM month")]
pub struct InvalidMonth(pub String);

impl FromStr for Month {
    type Err = InvalidMonth;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonth(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One source row after coercion. `counts` lines up with the owning table's
/// [`NormalizedTable::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub date: Option<NaiveDate>,
    pub month: Option<Month>,
    pub state: String,
    pub district: String,
    pub counts: Vec<u64>,
    pub total: u64,
}

impl ActivityRecord {
    pub fn new(date: Option<NaiveDate>, state: String, district: String, counts: Vec<u64>) -> Self {
        let total = counts.iter().sum();
        Self {
            date,
            month: date.map(Month::from_date),
            state,
            district,
            counts,
            total,
        }
    }
}

/// Normalized rows for a single dataset kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    kind: DatasetKind,
    columns: Vec<String>,
    records: Vec<ActivityRecord>,
}

impl NormalizedTable {
    pub fn new(kind: DatasetKind, columns: Vec<String>) -> Self {
        Self {
            kind,
            columns,
            records: Vec::new(),
        }
    }

    pub fn with_records(
        kind: DatasetKind,
        columns: Vec<String>,
        records: Vec<ActivityRecord>,
    ) -> Self {
        debug_assert!(records.iter().all(|r| r.counts.len() == columns.len()));
        Self {
            kind,
            columns,
            records,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Count columns summed into each record's total.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn push(&mut self, record: ActivityRecord) {
        self.records.push(record);
    }

    pub fn total(&self) -> u64 {
        self.records.iter().map(|record| record.total).sum()
    }

    pub fn months(&self) -> Vec<Month> {
        self.records
            .iter()
            .filter_map(|record| record.month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn states(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.state.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
