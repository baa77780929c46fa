use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{clamp_score, AnalysisError};
use crate::common::{clean_list, truncate_chars};
use crate::kernel::ArticleCandidate;

/// A source article, optionally enriched by AI analysis.
///
/// Raw articles from the data sources carry only the first four fields; the
/// analysis fields are filled once an article has been scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_score: Option<f64>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            url: url.into(),
            source: source.into(),
            relevance_score: None,
            key_insights: None,
            credibility_score: None,
        }
    }

    /// Accept a source candidate only if it has a non-blank title and url.
    pub fn from_candidate(candidate: ArticleCandidate) -> Option<Self> {
        let title = candidate.title.filter(|t| !t.trim().is_empty())?;
        let url = candidate.url.filter(|u| !u.trim().is_empty())?;
        Some(Self::new(
            title.trim(),
            candidate.summary,
            url.trim(),
            candidate.source,
        ))
    }

    /// The analyzed variant: the AI summary replaces the source snippet.
    pub fn enrich(self, analysis: &ArticleAnalysis) -> Self {
        Self {
            summary: analysis.summary.clone(),
            relevance_score: Some(analysis.relevance_score),
            key_insights: Some(analysis.key_insights.clone()),
            credibility_score: Some(analysis.credibility_score),
            ..self
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.relevance_score.is_some() && self.credibility_score.is_some()
    }
}

/// Raw structured output for one article, as returned by the model.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAnalysisOutput {
    /// Relevance to the research topic, 0-10
    pub relevance_score: f64,
    /// Main topics covered, at most 5
    pub main_topics: Vec<String>,
    /// Concise summary, at most 500 characters
    pub summary: String,
    /// Key insights, at most 3
    pub key_insights: Vec<String>,
    /// Credibility of source and content, 0-10
    pub credibility_score: f64,
}

/// Normalized analysis of one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAnalysis {
    pub relevance_score: f64,
    pub credibility_score: f64,
    pub main_topics: Vec<String>,
    pub summary: String,
    pub key_insights: Vec<String>,
}

impl ArticleAnalysis {
    pub const SCHEMA_NAME: &'static str = "article_analysis";

    pub fn from_output(output: ArticleAnalysisOutput) -> Result<Self, AnalysisError> {
        Ok(Self {
            relevance_score: clamp_score(output.relevance_score, "relevanceScore")?,
            credibility_score: clamp_score(output.credibility_score, "credibilityScore")?,
            main_topics: clean_list(output.main_topics, 5),
            summary: truncate_chars(output.summary.trim(), 500),
            key_insights: clean_list(output.key_insights, 3),
        })
    }
}
