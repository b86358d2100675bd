use crate::infra::{
    filter_params, ActionPlanQuery, AppState, DashboardQuery, HotspotQuery, DEFAULT_ACTION_PLAN,
    DEFAULT_HOTSPOTS,
};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use ipd::error::AppError;
use ipd::pipeline::report::views::{ActionPlanEntry, FilterOptions, HotspotView};
use ipd::pipeline::report::ReportOptions;
use ipd::pipeline::scoring::rank_by;
use ipd::pipeline::{DashboardReport, FilterParams, HotspotMetric};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub(crate) struct HotspotsResponse {
    pub(crate) filters: FilterParams,
    pub(crate) metric: HotspotMetric,
    pub(crate) hotspots: Vec<HotspotView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionPlanResponse {
    pub(crate) filters: FilterParams,
    pub(crate) actions: Vec<ActionPlanEntry>,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/options", get(options_endpoint))
        .route("/api/v1/dashboard", get(dashboard_endpoint))
        .route("/api/v1/hotspots", get(hotspots_endpoint))
        .route("/api/v1/action-plan", get(action_plan_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn options_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<FilterOptions>, AppError> {
    let options = state.with_tables(|tables| Ok(tables.options())).await?;
    Ok(Json(options))
}

pub(crate) async fn dashboard_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardReport>, AppError> {
    let params = filter_params(query.month.as_deref(), query.state.as_deref())?;
    let mut options = ReportOptions::default();
    if let Some(top_states) = query.top_states {
        options.top_states = top_states;
    }
    if let Some(top_n) = query.top_n {
        options.hotspots = top_n;
        options.action_plan = top_n;
    }

    let report = state
        .with_tables(move |tables| Ok(DashboardReport::build(&tables, &params, options)))
        .await?;
    Ok(Json(report))
}

pub(crate) async fn hotspots_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<HotspotQuery>,
) -> Result<Json<HotspotsResponse>, AppError> {
    let params = filter_params(query.month.as_deref(), query.state.as_deref())?;
    let metric = match query.metric.as_deref() {
        Some(raw) => raw.parse::<HotspotMetric>()?,
        None => HotspotMetric::default(),
    };
    let limit = query.top_n.unwrap_or(DEFAULT_HOTSPOTS);

    let response = state
        .with_tables(move |tables| {
            let scored = tables.score(&params);
            let hotspots = rank_by(&scored, metric)
                .iter()
                .take(limit)
                .enumerate()
                .map(|(index, district)| HotspotView::from_scored(index + 1, district))
                .collect();
            Ok(HotspotsResponse {
                filters: params,
                metric,
                hotspots,
            })
        })
        .await?;
    Ok(Json(response))
}

pub(crate) async fn action_plan_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ActionPlanQuery>,
) -> Result<Json<ActionPlanResponse>, AppError> {
    let params = filter_params(query.month.as_deref(), query.state.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_ACTION_PLAN);

    let response = state
        .with_tables(move |tables| {
            let scored = tables.score(&params);
            let actions = rank_by(&scored, HotspotMetric::Vgs)
                .iter()
                .take(limit)
                .enumerate()
                .map(|(index, district)| ActionPlanEntry::from_scored(index + 1, district))
                .collect();
            Ok(ActionPlanResponse {
                filters: params,
                actions,
            })
        })
        .await?;
    Ok(Json(response))
}
