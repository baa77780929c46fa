//! Research value types and the normalization applied to AI output.

mod article;
mod enhanced;
mod plan;
mod summary;
mod workflow_step;

pub use article::{Article, ArticleAnalysis, ArticleAnalysisOutput};
pub use enhanced::{EnhancedResearchData, ProcessingMetadata};
pub use plan::{ResearchDepth, ResearchPlan, ResearchPlanOutput};
pub use summary::{ResearchSummary, ResearchSummaryOutput, SourceNote};
pub use workflow_step::WorkflowStep;

/// AI output that cannot be turned into a valid value object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("AI returned malformed {schema}: {message}")]
    Malformed { schema: String, message: String },

    #[error("AI returned no usable {field} in {schema}")]
    EmptyField {
        schema: &'static str,
        field: &'static str,
    },

    #[error("AI returned an invalid {field}: {value}")]
    InvalidScore { field: &'static str, value: f64 },
}

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Clamp a model-reported score into [0, 10]; NaN and infinities are rejected.
pub(crate) fn clamp_score(value: f64, field: &'static str) -> Result<f64, AnalysisError> {
    if !value.is_finite() {
        return Err(AnalysisError::InvalidScore { field, value });
    }
    Ok(value.clamp(MIN_SCORE, MAX_SCORE))
}
