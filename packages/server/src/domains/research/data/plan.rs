use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::common::clean_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    Basic,
    Intermediate,
    Comprehensive,
}

/// Raw structured research plan, as returned by the model.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlanOutput {
    /// Most important questions to answer, up to 5
    pub primary_questions: Vec<String>,
    /// Most effective search terms, up to 10
    pub search_terms: Vec<String>,
    /// Expected types of findings, up to 3
    pub expected_findings: Vec<String>,
    pub research_depth: ResearchDepth,
}

/// Research plan produced at the start of every research job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlan {
    pub primary_questions: Vec<String>,
    pub search_terms: Vec<String>,
    pub expected_findings: Vec<String>,
    pub research_depth: ResearchDepth,
}

impl ResearchPlan {
    pub const SCHEMA_NAME: &'static str = "research_plan";

    pub const MAX_QUESTIONS: usize = 5;
    pub const MAX_SEARCH_TERMS: usize = 10;
    pub const MAX_FINDINGS: usize = 3;

    /// Trim, drop blanks and cap every list. A list left empty is malformed output.
    pub fn from_output(output: ResearchPlanOutput) -> Result<Self, AnalysisError> {
        let plan = Self {
            primary_questions: clean_list(output.primary_questions, Self::MAX_QUESTIONS),
            search_terms: clean_list(output.search_terms, Self::MAX_SEARCH_TERMS),
            expected_findings: clean_list(output.expected_findings, Self::MAX_FINDINGS),
            research_depth: output.research_depth,
        };

        for (field, list) in [
            ("primaryQuestions", &plan.primary_questions),
            ("searchTerms", &plan.search_terms),
            ("expectedFindings", &plan.expected_findings),
        ] {
            if list.is_empty() {
                return Err(AnalysisError::EmptyField {
                    schema: Self::SCHEMA_NAME,
                    field,
                });
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!(" {} {} ", prefix, i)).collect()
    }

    #[test]
    fn test_lists_are_trimmed_and_capped() {
        let plan = ResearchPlan::from_output(ResearchPlanOutput {
            primary_questions: strings(8, "q"),
            search_terms: strings(14, "t"),
            expected_findings: strings(4, "f"),
            research_depth: ResearchDepth::Comprehensive,
        })
        .unwrap();

        assert_eq!(plan.primary_questions.len(), 5);
        assert_eq!(plan.search_terms.len(), 10);
        assert_eq!(plan.expected_findings.len(), 3);
        assert_eq!(plan.primary_questions[0], "q 0");
    }

    #[test]
    fn test_blank_list_is_rejected() {
        let result = ResearchPlan::from_output(ResearchPlanOutput {
            primary_questions: vec!["  ".into(), "".into()],
            search_terms: strings(2, "t"),
            expected_findings: strings(1, "f"),
            research_depth: ResearchDepth::Basic,
        });

        match result {
            Err(AnalysisError::EmptyField { field, .. }) => assert_eq!(field, "primaryQuestions"),
            other => panic!("expected EmptyField, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_parses_lowercase() {
        let output: ResearchPlanOutput = serde_json::from_value(serde_json::json!({
            "primaryQuestions": ["q"],
            "searchTerms": ["t"],
            "expectedFindings": ["f"],
            "researchDepth": "intermediate"
        }))
        .unwrap();
        assert_eq!(output.research_depth, ResearchDepth::Intermediate);
    }
}
