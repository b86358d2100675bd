//! Header inspection for the three dataset kinds.
//!
//! Enrolment extracts carry a fixed set of age-bucket columns. The update
//! extracts are sniffed by name, so a batch whose header drifts changes which
//! columns are summed into its total.

use super::domain::DatasetKind;

pub const DATE_COLUMN: &str = "date";
pub const STATE_COLUMN: &str = "state";
pub const DISTRICT_COLUMN: &str = "district";

pub const ENROLMENT_COLUMNS: [&str; 3] = ["age_0_5", "age_5_17", "age_18_greater"];

/// A count column chosen for a dataset kind, with its position in the header
/// when present. Absent enrolment columns read as all zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountColumn {
    pub name: String,
    pub position: Option<usize>,
}

/// Picks the count columns for `kind` out of a header row.
pub fn infer_columns<S: AsRef<str>>(header: &[S], kind: DatasetKind) -> Vec<CountColumn> {
    let names: Vec<String> = header.iter().map(|name| clean_header(name.as_ref())).collect();

    match kind {
        DatasetKind::Enrolment => ENROLMENT_COLUMNS
            .iter()
            .map(|expected| CountColumn {
                name: (*expected).to_string(),
                position: names.iter().position(|name| name == expected),
            })
            .collect(),
        DatasetKind::DemographicUpdate => sniff(&names, &["age"]),
        DatasetKind::BiometricUpdate => sniff(&names, &["bio", "age"]),
    }
}

fn sniff(names: &[String], needles: &[&str]) -> Vec<CountColumn> {
    let mut selected: Vec<CountColumn> = Vec::new();
    for (position, name) in names.iter().enumerate() {
        let lowered = name.to_lowercase();
        if !needles.iter().any(|needle| lowered.contains(needle)) {
            continue;
        }
        // First occurrence wins when a header repeats a name.
        if selected.iter().any(|column| &column.name == name) {
            continue;
        }
        selected.push(CountColumn {
            name: name.clone(),
            position: Some(position),
        });
    }
    selected
}

pub(crate) fn clean_header(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}'], "").trim().to_string()
}

pub(crate) fn position_of<S: AsRef<str>>(header: &[S], column: &str) -> Option<usize> {
    header
        .iter()
        .position(|name| clean_header(name.as_ref()) == column)
}
