//! Research activities: the operations behind the HTTP routes and the job handler.

pub mod aggregate_logs;
pub mod analysis;
pub mod gather_articles;
pub mod queries;
pub mod run_research;
pub mod submit;

pub use aggregate_logs::aggregate;
pub use analysis::{
    analyze_articles, generate_keywords, generate_research_plan, generate_research_summary,
    parse_keywords, process_articles, rank_by_relevance, AnalysisOptions, AnalyzedArticle,
    ProcessedArticles, MAX_KEYWORDS, TOP_ARTICLES,
};
pub use gather_articles::{fetch_articles, gather_articles, GatherError, MAX_ARTICLES};
pub use queries::{get_research_details, list_research, parse_user_id, ResearchDetails};
pub use run_research::run_research;
pub use submit::{
    parse_provider, submit_research, validate_topic, SubmitResearchInput, ValidSubmission,
};
