use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{clamp_score, AnalysisError};
use crate::common::{clean_list, truncate_chars};

/// A source the summary leans on, described in the model's own words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceNote {
    pub title: String,
    pub relevance: String,
    pub credibility: String,
}

/// Raw structured research summary, as returned by the model.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSummaryOutput {
    /// At most 500 characters
    pub executive_summary: String,
    /// At most 8
    pub key_findings: Vec<String>,
    /// At most 5
    pub recommendations: Vec<String>,
    /// Confidence in the completeness of the research, 0-10
    pub confidence_level: f64,
    /// Most valuable sources, at most 5
    pub sources: Vec<SourceNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSummary {
    pub executive_summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence_level: f64,
    pub sources: Vec<SourceNote>,
}

impl ResearchSummary {
    pub const SCHEMA_NAME: &'static str = "research_summary";

    pub fn from_output(output: ResearchSummaryOutput) -> Result<Self, AnalysisError> {
        Ok(Self {
            executive_summary: truncate_chars(output.executive_summary.trim(), 500),
            key_findings: clean_list(output.key_findings, 8),
            recommendations: clean_list(output.recommendations, 5),
            confidence_level: clamp_score(output.confidence_level, "confidenceLevel")?,
            sources: output
                .sources
                .into_iter()
                .filter(|s| !s.title.trim().is_empty())
                .take(5)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str) -> SourceNote {
        SourceNote {
            title: title.into(),
            relevance: "high".into(),
            credibility: "medium".into(),
        }
    }

    #[test]
    fn test_summary_is_bounded() {
        let summary = ResearchSummary::from_output(ResearchSummaryOutput {
            executive_summary: "e".repeat(900),
            key_findings: (0..12).map(|i| i.to_string()).collect(),
            recommendations: (0..7).map(|i| i.to_string()).collect(),
            confidence_level: 11.5,
            sources: (0..8).map(|i| note(&format!("source {}", i))).collect(),
        })
        .unwrap();

        assert_eq!(summary.executive_summary.chars().count(), 500);
        assert_eq!(summary.key_findings.len(), 8);
        assert_eq!(summary.recommendations.len(), 5);
        assert_eq!(summary.confidence_level, 10.0);
        assert_eq!(summary.sources.len(), 5);
    }

    #[test]
    fn test_untitled_sources_are_dropped() {
        let summary = ResearchSummary::from_output(ResearchSummaryOutput {
            executive_summary: "ok".into(),
            key_findings: vec![],
            recommendations: vec![],
            confidence_level: 7.0,
            sources: vec![note(""), note("kept")],
        })
        .unwrap();

        assert_eq!(summary.sources, vec![note("kept")]);
    }
}
