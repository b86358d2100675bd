use ipd::error::AppError;
use ipd::pipeline::report::DatasetTables;
use ipd::pipeline::{BatchSource, DatasetLoader, FilterParams};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type SharedLoader = Arc<DatasetLoader<Arc<dyn BatchSource>>>;

pub(crate) const DEFAULT_HOTSPOTS: usize = 20;
pub(crate) const DEFAULT_ACTION_PLAN: usize = 25;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) datasets: SharedLoader,
}

impl AppState {
    /// Loads the tables and runs `work` on them on the blocking pool; file
    /// access, CSV parsing and scoring stay off the async workers.
    pub(crate) async fn with_tables<T, F>(&self, work: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(DatasetTables) -> Result<T, AppError> + Send + 'static,
    {
        let datasets = Arc::clone(&self.datasets);
        tokio::task::spawn_blocking(move || {
            let tables = DatasetTables::load(datasets.as_ref())?;
            work(tables)
        })
        .await
        .map_err(|err| AppError::Task(err.to_string()))?
    }
}

/// Parses the month and state selectors shared by every report query.
/// Absent or `All` means no restriction.
pub(crate) fn filter_params(
    month: Option<&str>,
    state: Option<&str>,
) -> Result<FilterParams, AppError> {
    Ok(FilterParams::from_selection(month, state)?)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    pub(crate) month: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) top_states: Option<usize>,
    #[serde(default)]
    pub(crate) top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HotspotQuery {
    #[serde(default)]
    pub(crate) month: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) top_n: Option<usize>,
    #[serde(default)]
    pub(crate) metric: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActionPlanQuery {
    #[serde(default)]
    pub(crate) month: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}
