use std::collections::VecDeque;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::common::AiMetrics;
use crate::kernel::BaseMetricsSink;

/// Bounded in-memory metrics store; the oldest records are evicted first.
pub struct MemoryMetricsStore {
    capacity: usize,
    records: RwLock<VecDeque<AiMetrics>>,
}

impl MemoryMetricsStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }
}

#[async_trait]
impl BaseMetricsSink for MemoryMetricsStore {
    async fn record(&self, metrics: AiMetrics) -> Result<()> {
        info!(
            request_id = %metrics.request_id,
            operation = %metrics.operation,
            provider = %metrics.provider,
            model = %metrics.model,
            tokens = metrics.token_usage.total_tokens,
            cost = %format!("{:.4}", metrics.cost),
            duration_ms = metrics.duration_ms,
            "AI metrics"
        );

        let mut records = self.records.write().unwrap();
        records.push_back(metrics);
        while records.len() > self.capacity {
            records.pop_front();
        }
        Ok(())
    }

    async fn for_request(&self, request_id: Uuid) -> Result<Vec<AiMetrics>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<AiMetrics>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.timestamp >= start && m.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AiMetrics>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn export(&self) -> Result<Vec<AiMetrics>> {
        Ok(self.records.read().unwrap().iter().cloned().collect())
    }
}
