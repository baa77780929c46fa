//! Read-side views over recorded AI metrics.
//!
//! Pure functions from a slice of [`AiMetrics`] to the JSON documents served
//! under `/api/metrics`. Costs are rounded to 6 decimal places, per-token
//! costs to 8, and durations to whole milliseconds.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::common::{AiMetrics, AiProvider, TokenUsage};

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_RECENT_LIMIT: usize = 50;
/// Records inspected by the health view
pub const HEALTH_SAMPLE: usize = 10;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn cost6(value: f64) -> f64 {
    round_to(value, 6)
}

// =============================================================================
// Time window
// =============================================================================

/// Inclusive time range a view is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn last_hours(hours: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

// =============================================================================
// Totals
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStats {
    pub provider: AiProvider,
    pub count: usize,
    pub tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationStats {
    pub operation: String,
    pub count: usize,
    pub total_duration: u64,
    pub total_cost: f64,
}

impl OperationStats {
    pub fn avg_duration(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_duration as f64 / self.count as f64
        }
    }
}

/// Totals and breakdowns; groups appear in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTotals {
    pub total_requests: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_duration: u64,
    pub by_provider: Vec<ProviderStats>,
    pub by_operation: Vec<OperationStats>,
}

impl MetricsTotals {
    pub fn from_metrics(metrics: &[AiMetrics]) -> Self {
        let mut totals = Self::default();

        for m in metrics {
            totals.total_requests += 1;
            totals.total_tokens += m.token_usage.total_tokens;
            totals.total_cost += m.cost;
            totals.total_duration += m.duration_ms;

            match totals.by_provider.iter_mut().find(|p| p.provider == m.provider) {
                Some(stats) => {
                    stats.count += 1;
                    stats.tokens += m.token_usage.total_tokens;
                    stats.cost += m.cost;
                }
                None => totals.by_provider.push(ProviderStats {
                    provider: m.provider,
                    count: 1,
                    tokens: m.token_usage.total_tokens,
                    cost: m.cost,
                }),
            }

            match totals
                .by_operation
                .iter_mut()
                .find(|o| o.operation == m.operation)
            {
                Some(stats) => {
                    stats.count += 1;
                    stats.total_duration += m.duration_ms;
                    stats.total_cost += m.cost;
                }
                None => totals.by_operation.push(OperationStats {
                    operation: m.operation.clone(),
                    count: 1,
                    total_duration: m.duration_ms,
                    total_cost: m.cost,
                }),
            }
        }

        totals
    }

    pub fn avg_duration(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_duration as f64 / self.total_requests as f64
        }
    }
}

// =============================================================================
// Per-request report
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetricsReport {
    pub request_id: Uuid,
    pub summary: RequestSummary,
    pub operations: Vec<OperationRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub operations_count: usize,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_duration: u64,
    pub provider: AiProvider,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub operation: String,
    pub token_usage: TokenUsage,
    pub cost: f64,
    pub duration: u64,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `None` when nothing was recorded for the request.
pub fn request_report(request_id: Uuid, metrics: &[AiMetrics]) -> Option<RequestMetricsReport> {
    let first = metrics.first()?;
    let totals = MetricsTotals::from_metrics(metrics);

    Some(RequestMetricsReport {
        request_id,
        summary: RequestSummary {
            operations_count: metrics.len(),
            total_cost: cost6(totals.total_cost),
            total_tokens: totals.total_tokens,
            total_duration: totals.total_duration,
            provider: first.provider,
            model: first.model.clone(),
        },
        operations: metrics
            .iter()
            .map(|m| OperationRecord {
                operation: m.operation.clone(),
                token_usage: m.token_usage,
                cost: cost6(m.cost),
                duration: m.duration_ms,
                timestamp: m.timestamp,
                metadata: m.metadata.clone(),
            })
            .collect(),
    })
}

// =============================================================================
// Aggregate report
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub time_range: LabelledRange,
    pub summary: AggregateSummary,
    pub breakdown: Breakdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelledRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// e.g. "24 hours"
    pub duration: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total_requests: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_duration: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub by_provider: Vec<ProviderBreakdown>,
    pub by_operation: Vec<OperationBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBreakdown {
    pub provider: AiProvider,
    pub requests: usize,
    pub tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBreakdown {
    pub operation: String,
    pub requests: usize,
    pub avg_duration: u64,
    pub total_cost: f64,
}

/// `metrics` must already be restricted to `window`.
pub fn aggregate_report(window: TimeWindow, metrics: &[AiMetrics]) -> AggregateReport {
    let totals = MetricsTotals::from_metrics(metrics);

    AggregateReport {
        time_range: LabelledRange {
            start: window.start,
            end: window.end,
            duration: format!("{} hours", window.hours()),
        },
        summary: AggregateSummary {
            total_requests: totals.total_requests,
            total_tokens: totals.total_tokens,
            total_cost: cost6(totals.total_cost),
            avg_duration: totals.avg_duration().round() as u64,
        },
        breakdown: Breakdown {
            by_provider: totals
                .by_provider
                .iter()
                .map(|p| ProviderBreakdown {
                    provider: p.provider,
                    requests: p.count,
                    tokens: p.tokens,
                    cost: cost6(p.cost),
                })
                .collect(),
            by_operation: totals
                .by_operation
                .iter()
                .map(|o| OperationBreakdown {
                    operation: o.operation.clone(),
                    requests: o.count,
                    avg_duration: o.avg_duration().round() as u64,
                    total_cost: cost6(o.total_cost),
                })
                .collect(),
        },
    }
}

// =============================================================================
// Recent
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMetrics {
    pub count: usize,
    pub metrics: Vec<AiMetrics>,
}

/// `metrics` newest first, as returned by the sink.
pub fn recent_metrics(metrics: Vec<AiMetrics>) -> RecentMetrics {
    let metrics: Vec<AiMetrics> = metrics
        .into_iter()
        .map(|m| AiMetrics {
            cost: cost6(m.cost),
            ..m
        })
        .collect();

    RecentMetrics {
        count: metrics.len(),
        metrics,
    }
}

// =============================================================================
// Cost analysis
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    pub time_range: HoursRange,
    pub cost_summary: CostSummary,
    pub provider_comparison: Vec<ProviderCost>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub hours: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub total_cost: f64,
    pub cost_per_request: f64,
    pub cost_per_token: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCost {
    pub provider: AiProvider,
    pub total_cost: f64,
    pub cost_per_request: f64,
    pub cost_per_token: f64,
    /// Percentage of all tokens in the window, one decimal
    pub token_share: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `metrics` must already be restricted to `window`.
pub fn cost_report(window: TimeWindow, metrics: &[AiMetrics]) -> CostReport {
    let totals = MetricsTotals::from_metrics(metrics);
    let total_tokens = totals.total_tokens as f64;

    CostReport {
        time_range: HoursRange {
            start: window.start,
            end: window.end,
            hours: window.hours(),
        },
        cost_summary: CostSummary {
            total_cost: cost6(totals.total_cost),
            cost_per_request: cost6(ratio(totals.total_cost, totals.total_requests as f64)),
            cost_per_token: round_to(ratio(totals.total_cost, total_tokens), 8),
        },
        provider_comparison: totals
            .by_provider
            .iter()
            .map(|p| ProviderCost {
                provider: p.provider,
                total_cost: cost6(p.cost),
                cost_per_request: cost6(ratio(p.cost, p.count as f64)),
                cost_per_token: round_to(ratio(p.cost, p.tokens as f64), 8),
                token_share: round_to(ratio(p.tokens as f64, total_tokens) * 100.0, 1),
            })
            .collect(),
    }
}

// =============================================================================
// Export and health
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsExport {
    pub exported_at: DateTime<Utc>,
    pub total_records: usize,
    pub metrics: Vec<AiMetrics>,
}

pub fn export(metrics: Vec<AiMetrics>, now: DateTime<Utc>) -> MetricsExport {
    MetricsExport {
        exported_at: now,
        total_records: metrics.len(),
        metrics,
    }
}

/// Attachment name for an export taken at `now`.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("ai-metrics-{}.json", now.timestamp_millis())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsHealth {
    pub status: &'static str,
    /// Records in the recent sample, at most [`HEALTH_SAMPLE`]
    pub metrics_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
    pub total_cost: f64,
    pub total_tokens: u64,
}

/// `recent` newest first; `all` is everything retained.
pub fn health(recent: &[AiMetrics], all: &[AiMetrics]) -> MetricsHealth {
    let totals = MetricsTotals::from_metrics(all);

    MetricsHealth {
        status: "healthy",
        metrics_count: recent.len(),
        last_activity: recent.first().map(|m| m.timestamp),
        total_cost: cost6(totals.total_cost),
        total_tokens: totals.total_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(provider: AiProvider, operation: &str, tokens: u64, cost: f64, duration: u64) -> AiMetrics {
        AiMetrics::builder()
            .request_id(Uuid::nil())
            .provider(provider)
            .model(provider.model_name())
            .operation(operation)
            .token_usage(TokenUsage::new(tokens, 0))
            .cost(cost)
            .duration_ms(duration)
            .build()
    }

    fn sample() -> Vec<AiMetrics> {
        vec![
            metric(AiProvider::Anthropic, "analyze-article", 100, 0.001, 100),
            metric(AiProvider::OpenAi, "analyze-article", 300, 0.003, 200),
            metric(AiProvider::Anthropic, "generate-keywords", 100, 0.0000004, 301),
        ]
    }

    #[test]
    fn test_request_report_empty_is_none() {
        assert!(request_report(Uuid::nil(), &[]).is_none());
    }

    #[test]
    fn test_request_report_totals() {
        let report = request_report(Uuid::nil(), &sample()).unwrap();

        assert_eq!(report.summary.operations_count, 3);
        assert_eq!(report.summary.total_tokens, 500);
        assert_eq!(report.summary.total_duration, 601);
        assert_eq!(report.summary.total_cost, 0.004);
        assert_eq!(report.summary.provider, AiProvider::Anthropic);
        assert_eq!(report.operations[2].cost, 0.0);
    }

    #[test]
    fn test_aggregate_groups_in_first_seen_order() {
        let now = Utc::now();
        let report = aggregate_report(TimeWindow::last_hours(24, now), &sample());

        assert_eq!(report.time_range.duration, "24 hours");
        assert_eq!(report.summary.total_requests, 3);
        assert_eq!(report.summary.avg_duration, 200);

        let providers: Vec<AiProvider> = report
            .breakdown
            .by_provider
            .iter()
            .map(|p| p.provider)
            .collect();
        assert_eq!(providers, vec![AiProvider::Anthropic, AiProvider::OpenAi]);

        let analyze = &report.breakdown.by_operation[0];
        assert_eq!(analyze.operation, "analyze-article");
        assert_eq!(analyze.requests, 2);
        assert_eq!(analyze.avg_duration, 150);
    }

    #[test]
    fn test_cost_report_ratios() {
        let report = cost_report(TimeWindow::last_hours(6, Utc::now()), &sample());

        assert_eq!(report.time_range.hours, 6);
        let openai = report
            .provider_comparison
            .iter()
            .find(|p| p.provider == AiProvider::OpenAi)
            .unwrap();
        assert_eq!(openai.token_share, 60.0);
        assert_eq!(openai.cost_per_token, 0.00001);
        assert_eq!(openai.cost_per_request, 0.003);
    }

    #[test]
    fn test_cost_report_empty_window() {
        let report = cost_report(TimeWindow::last_hours(24, Utc::now()), &[]);
        assert_eq!(report.cost_summary.cost_per_request, 0.0);
        assert_eq!(report.cost_summary.cost_per_token, 0.0);
        assert!(report.provider_comparison.is_empty());
    }

    #[test]
    fn test_health_uses_newest_record() {
        let mut recent = sample();
        recent.reverse();
        let newest = recent[0].timestamp;

        let health = health(&recent, &sample());
        assert_eq!(health.status, "healthy");
        assert_eq!(health.metrics_count, 3);
        assert_eq!(health.last_activity, Some(newest));
        assert_eq!(health.total_tokens, 500);
    }

    #[test]
    fn test_export_filename() {
        let now = Utc::now();
        assert_eq!(
            export_filename(now),
            format!("ai-metrics-{}.json", now.timestamp_millis())
        );
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let now = Utc::now();
        let window = TimeWindow::between(now - Duration::hours(1), now);
        assert!(window.contains(now));
        assert!(!window.contains(now + Duration::seconds(1)));
        assert_eq!(window.hours(), 1);
    }
}
