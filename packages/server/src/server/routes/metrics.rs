//! `/api/metrics`: read-only views over recorded AI usage.

use axum::{
    extract::{Extension, Path, Query},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domains::metrics::projections::{
    self, AggregateReport, CostReport, MetricsHealth, RecentMetrics, RequestMetricsReport,
    TimeWindow, DEFAULT_RECENT_LIMIT, DEFAULT_WINDOW_HOURS, HEALTH_SAMPLE,
};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

const NO_METRICS: &str = "No metrics found for this request";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub hours: Option<i64>,
}

impl AggregateQuery {
    /// Explicit dates win over `hours`; both dates are needed.
    fn window(&self, now: DateTime<Utc>) -> TimeWindow {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => TimeWindow::between(start, end),
            _ => TimeWindow::last_hours(self.hours.unwrap_or(DEFAULT_WINDOW_HOURS), now),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HoursQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/metrics/request/:request_id
pub async fn request_metrics(
    Extension(state): Extension<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<RequestMetricsReport>> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::NotFound(NO_METRICS.to_string()))?;

    let metrics = state
        .deps
        .metrics
        .for_request(request_id)
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to fetch metrics"))?;

    projections::request_report(request_id, &metrics)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NO_METRICS.to_string()))
}

/// GET /api/metrics/aggregate?startDate&endDate|hours
pub async fn aggregate_metrics(
    Extension(state): Extension<AppState>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Json<AggregateReport>> {
    let window = query.window(Utc::now());
    let metrics = state
        .deps
        .metrics
        .in_range(window.start, window.end)
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to fetch aggregated metrics"))?;

    Ok(Json(projections::aggregate_report(window, &metrics)))
}

/// GET /api/metrics/recent?limit
pub async fn recent_metrics(
    Extension(state): Extension<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<RecentMetrics>> {
    let metrics = state
        .deps
        .metrics
        .recent(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to fetch recent metrics"))?;

    Ok(Json(projections::recent_metrics(metrics)))
}

/// GET /api/metrics/costs?hours
pub async fn cost_analysis(
    Extension(state): Extension<AppState>,
    Query(query): Query<HoursQuery>,
) -> ApiResult<Json<CostReport>> {
    let window = TimeWindow::last_hours(query.hours.unwrap_or(DEFAULT_WINDOW_HOURS), Utc::now());
    let metrics = state
        .deps
        .metrics
        .in_range(window.start, window.end)
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to fetch cost analysis"))?;

    Ok(Json(projections::cost_report(window, &metrics)))
}

/// GET /api/metrics/export, served as a JSON attachment
pub async fn export_metrics(
    Extension(state): Extension<AppState>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let metrics = state
        .deps
        .metrics
        .export()
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to export metrics"))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        projections::export_filename(now)
    );

    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(projections::export(metrics, now)),
    ))
}

/// GET /api/metrics/health
pub async fn metrics_health(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<MetricsHealth>> {
    let sink = &state.deps.metrics;
    let recent = sink
        .recent(HEALTH_SAMPLE)
        .await
        .map_err(|e| ApiError::or_failed(e, "Metrics health check failed"))?;
    let all = sink
        .export()
        .await
        .map_err(|e| ApiError::or_failed(e, "Metrics health check failed"))?;

    Ok(Json(projections::health(&recent, &all)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_defaults_to_last_day() {
        let now = Utc::now();
        let window = AggregateQuery::default().window(now);
        assert_eq!(window.end, now);
        assert_eq!(window.hours(), 24);
    }

    #[test]
    fn test_window_needs_both_dates() {
        let now = Utc::now();
        let query = AggregateQuery {
            start_date: Some(now - Duration::hours(3)),
            end_date: None,
            hours: Some(2),
        };
        assert_eq!(query.window(now).hours(), 2);

        let query = AggregateQuery {
            start_date: Some(now - Duration::hours(3)),
            end_date: Some(now),
            hours: Some(2),
        };
        assert_eq!(query.window(now).hours(), 3);
    }
}
