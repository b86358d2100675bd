use crate::cli::ServeArgs;
use crate::infra::{AppState, SharedLoader};
use crate::routes::router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ipd::config::AppConfig;
use ipd::error::AppError;
use ipd::pipeline::{BatchSource, DatasetLoader, DirectorySource};
use ipd::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let source: Arc<dyn BatchSource> = Arc::new(DirectorySource::new(config.data.data_dir.clone()));
    let datasets: SharedLoader = Arc::new(DatasetLoader::new(source, config.data.cache_ttl));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        datasets,
    };

    // Warm the cache; report endpoints answer 503 until the batches appear.
    let warmed = app_state
        .with_tables(|tables| {
            Ok([
                tables.enrolment.len(),
                tables.demographic.len(),
                tables.biometric.len(),
            ])
        })
        .await;
    match warmed {
        Ok([enrolment_rows, demographic_rows, biometric_rows]) => info!(
            enrolment_rows,
            demographic_rows,
            biometric_rows,
            "datasets loaded"
        ),
        Err(err) => warn!(error = %err, data_dir = %config.data.data_dir.display(), "datasets unavailable"),
    }

    let app = router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "invisible population detector ready");

    axum::serve(listener, app).await?;
    Ok(())
}
