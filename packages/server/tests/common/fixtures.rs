//! Scripted AI responses and seed data.

use research_core::common::AiProvider;
use research_core::domains::research::data::{ArticleAnalysis, ResearchPlan, ResearchSummary};
use research_core::domains::research::models::ResearchRequest;
use serde_json::{json, Value};
use uuid::Uuid;

pub const KEYWORDS_TEXT: &str = "machine learning, neural networks, Machine Learning, ethics";

pub fn plan_json() -> Value {
    json!({
        "primaryQuestions": ["What changed recently?", "Who is affected?"],
        "searchTerms": ["ai safety", "alignment", "regulation"],
        "expectedFindings": ["Policy proposals"],
        "researchDepth": "intermediate"
    })
}

pub fn analysis_json(relevance: f64) -> Value {
    json!({
        "relevanceScore": relevance,
        "mainTopics": ["ai"],
        "summary": "Analyzed summary",
        "keyInsights": ["An insight"],
        "credibilityScore": 8.0
    })
}

pub fn summary_json() -> Value {
    json!({
        "executiveSummary": "The field is moving quickly.",
        "keyFindings": ["Finding one", "Finding two"],
        "recommendations": ["Keep reading"],
        "confidenceLevel": 7.5,
        "sources": [
            { "title": "NewsAPI article 1", "relevance": "high", "credibility": "good" }
        ]
    })
}

/// AI that answers every structured schema and one keyword call.
///
/// Article relevance follows the article number in the prompt title so the
/// ranking is deterministic: "<source> article 3" scores 3.
pub fn scripted_ai() -> research_core::kernel::MockAI {
    research_core::kernel::MockAI::new()
        .with_structured_default(ResearchPlan::SCHEMA_NAME, plan_json())
        .with_structured_responder(ArticleAnalysis::SCHEMA_NAME, |prompt| {
            let relevance = (1..=9)
                .rev()
                .find(|n| prompt.contains(&format!("article {}", n)))
                .unwrap_or(1) as f64;
            analysis_json(relevance)
        })
        .with_structured_default(ResearchSummary::SCHEMA_NAME, summary_json())
        .with_text(KEYWORDS_TEXT)
}

pub fn submission(topic: &str, user_id: Uuid) -> Value {
    json!({ "topic": topic, "userId": user_id.to_string() })
}

pub fn new_request(topic: &str) -> ResearchRequest {
    ResearchRequest::new(topic, Uuid::new_v4(), AiProvider::Anthropic)
}
