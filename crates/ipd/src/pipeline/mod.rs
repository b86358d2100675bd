//! Enrolment visibility pipeline: normalize the three UIDAI extracts, filter,
//! aggregate by state and district, score each district and attach
//! recommended interventions.

pub mod aggregate;
pub mod cache;
pub mod columns;
pub mod domain;
pub mod filter;
pub mod loader;
pub mod normalizer;
pub mod recommend;
pub mod report;
pub mod scoring;

pub use aggregate::{DistrictAggregate, PeakActivity, StateAggregate};
pub use domain::{ActivityRecord, DatasetKind, Month, NormalizedTable, UNKNOWN_LABEL};
pub use filter::{FilterError, FilterParams};
pub use loader::{BatchSource, DatasetLoader, DirectorySource, InMemorySource};
pub use report::DashboardReport;
pub use scoring::{HotspotMetric, RiskTier, ScoredDistrict};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no {kind} source data found in {location}")]
    MissingSourceData { kind: DatasetKind, location: String },
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {batch}: {source}")]
    Csv {
        batch: String,
        #[source]
        source: csv::Error,
    },
}
