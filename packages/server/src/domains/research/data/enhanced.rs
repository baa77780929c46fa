use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ResearchPlan, ResearchSummary};
use crate::common::AiProvider;

/// Plan, summary and processing metadata attached to a persisted result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedResearchData {
    pub research_summary: ResearchSummary,
    pub research_plan: ResearchPlan,
    pub metadata: ProcessingMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub provider: AiProvider,
    /// Raw articles analyzed, before top-N selection
    pub total_analyzed: usize,
    pub processing_timestamp: DateTime<Utc>,
}
