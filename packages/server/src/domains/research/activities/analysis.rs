//! AI analysis engine: research plans, per-article scoring, keywords and the
//! final research summary.
//!
//! Every structured call is parsed into its raw `*Output` DTO and normalized
//! into a value object before anything else sees it. Each successful call made
//! on behalf of a research request is recorded to the metrics sink; sink
//! failures are logged and never fail the caller.

use std::collections::HashSet;
use std::time::Instant;

use ai_client::{strip_code_blocks, StructuredOutput};
use anyhow::Result;
use futures::future::try_join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::{AiMetrics, AiProvider, TokenUsage};
use crate::domains::metrics::pricing::calculate_cost;
use crate::domains::research::data::{
    AnalysisError, Article, ArticleAnalysis, ArticleAnalysisOutput, ResearchPlan,
    ResearchPlanOutput, ResearchSummary, ResearchSummaryOutput,
};
use crate::kernel::{AiCompletion, ServerDeps};

/// Articles kept after ranking, and used as prompt material downstream.
pub const TOP_ARTICLES: usize = 5;

pub const MAX_KEYWORDS: usize = 15;

/// Provider and (optional) research request an AI call is made for.
///
/// Without a request id nothing is recorded to the metrics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub provider: AiProvider,
    pub request_id: Option<Uuid>,
}

impl AnalysisOptions {
    pub fn new(provider: AiProvider) -> Self {
        Self {
            provider,
            request_id: None,
        }
    }

    pub fn for_request(provider: AiProvider, request_id: Uuid) -> Self {
        Self {
            provider,
            request_id: Some(request_id),
        }
    }
}

/// A source article with its analysis, before the two are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedArticle {
    pub article: Article,
    pub analysis: ArticleAnalysis,
}

impl AnalyzedArticle {
    pub fn relevance(&self) -> f64 {
        self.analysis.relevance_score
    }

    /// The persisted form: analysis fields set, AI summary in place of the snippet.
    pub fn into_enriched(self) -> Article {
        self.article.enrich(&self.analysis)
    }
}

/// Output of the AI processing stage.
#[derive(Debug, Clone)]
pub struct ProcessedArticles {
    /// Top articles, enriched, most relevant first
    pub articles: Vec<Article>,
    pub keywords: Vec<String>,
    pub summary: ResearchSummary,
    /// Raw articles that went into analysis
    pub total_analyzed: usize,
}

// =============================================================================
// Research plan
// =============================================================================

pub async fn generate_research_plan(
    topic: &str,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<ResearchPlan> {
    let prompt = research_plan_prompt(topic);
    let started = Instant::now();

    let (output, completion) =
        generate_object::<ResearchPlanOutput>(ResearchPlan::SCHEMA_NAME, &prompt, options, deps)
            .await?;
    let plan = ResearchPlan::from_output(output)?;

    record_call(
        "generate-research-plan",
        &completion,
        started,
        metadata([("topic", json!(topic))]),
        options,
        deps,
    )
    .await;

    debug!(
        questions = plan.primary_questions.len(),
        search_terms = plan.search_terms.len(),
        "research plan generated"
    );
    Ok(plan)
}

fn research_plan_prompt(topic: &str) -> String {
    format!(
        "You are a research expert. Create a comprehensive research plan for the topic: \"{topic}\".\n\n\
         Consider:\n\
         - What are the most important questions to answer? (return up to {questions})\n\
         - What search terms would be most effective? (return up to {terms})\n\
         - What type of findings should we expect? (return up to {findings})\n\
         - How deep should this research go?\n\n\
         Do not exceed the requested counts. Provide concise, actionable outputs for each section.",
        topic = topic,
        questions = ResearchPlan::MAX_QUESTIONS,
        terms = ResearchPlan::MAX_SEARCH_TERMS,
        findings = ResearchPlan::MAX_FINDINGS,
    )
}

// =============================================================================
// Article analysis
// =============================================================================

/// Analyze every article concurrently; one failure fails the batch.
///
/// Results come back in input order. Rank them with [`rank_by_relevance`].
pub async fn analyze_articles(
    articles: &[Article],
    topic: &str,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<Vec<AnalyzedArticle>> {
    let started = Instant::now();

    let results = try_join_all(
        articles
            .iter()
            .map(|article| analyze_article(article, topic, options, deps)),
    )
    .await?;

    let mut analyzed = Vec::with_capacity(results.len());
    let mut usage: Option<TokenUsage> = None;
    let mut cost = 0.0;
    for (article, call_usage, call_cost) in results {
        if let Some(call_usage) = call_usage {
            usage = Some(usage.unwrap_or_default() + call_usage);
        }
        cost += call_cost;
        analyzed.push(article);
    }

    if let (Some(request_id), Some(usage)) = (options.request_id, usage) {
        let metrics = AiMetrics::builder()
            .request_id(request_id)
            .provider(options.provider)
            .model(options.provider.model_name())
            .operation("analyze-articles-batch")
            .token_usage(usage)
            .cost(cost)
            .duration_ms(elapsed_ms(started))
            .metadata(metadata([
                ("topic", json!(topic)),
                ("articlesCount", json!(articles.len())),
            ]))
            .build();
        record(metrics, deps).await;
    }

    info!(count = analyzed.len(), topic = %topic, "articles analyzed");
    Ok(analyzed)
}

async fn analyze_article(
    article: &Article,
    topic: &str,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<(AnalyzedArticle, Option<TokenUsage>, f64)> {
    let prompt = article_analysis_prompt(article, topic);
    let started = Instant::now();

    let (output, completion) = generate_object::<ArticleAnalysisOutput>(
        ArticleAnalysis::SCHEMA_NAME,
        &prompt,
        options,
        deps,
    )
    .await?;
    let analysis = ArticleAnalysis::from_output(output)?;

    let cost = record_call(
        "analyze-article",
        &completion,
        started,
        metadata([
            ("topic", json!(topic)),
            ("articleTitle", json!(article.title)),
        ]),
        options,
        deps,
    )
    .await;

    Ok((
        AnalyzedArticle {
            article: article.clone(),
            analysis,
        },
        completion.usage,
        cost,
    ))
}

fn article_analysis_prompt(article: &Article, topic: &str) -> String {
    format!(
        "Analyze this article for research on \"{topic}\":\n\n\
         Title: {title}\n\
         Content: {content}\n\
         Source: {source}\n\
         URL: {url}\n\n\
         Evaluate:\n\
         - Relevance to the research topic (0-10)\n\
         - Main topics covered\n\
         - Key insights extracted\n\
         - Credibility based on source and content (0-10)\n\
         - Create a concise summary (maximum 500 characters)\n\n\
         Be thorough and critical in your analysis.",
        topic = topic,
        title = article.title,
        content = article.summary,
        source = article.source,
        url = article.url,
    )
}

/// Stable sort by relevance, highest first. Equal scores keep their input order.
pub fn rank_by_relevance(mut analyzed: Vec<AnalyzedArticle>) -> Vec<AnalyzedArticle> {
    analyzed.sort_by(|a, b| b.relevance().total_cmp(&a.relevance()));
    analyzed
}

// =============================================================================
// Keywords
// =============================================================================

pub async fn generate_keywords(
    topic: &str,
    articles: &[Article],
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<Vec<String>> {
    let prompt = keywords_prompt(topic, articles);
    let started = Instant::now();

    let completion = deps.ai.generate_text(options.provider, &prompt).await?;
    let keywords = parse_keywords(&completion.content);

    record_call(
        "generate-keywords",
        &completion,
        started,
        metadata([
            ("topic", json!(topic)),
            ("articlesCount", json!(articles.len())),
        ]),
        options,
        deps,
    )
    .await;

    Ok(keywords)
}

fn keywords_prompt(topic: &str, articles: &[Article]) -> String {
    let material = articles
        .iter()
        .map(|a| format!("{}: {}", a.title, a.summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the research topic \"{topic}\" and these articles:\n\n\
         {material}\n\n\
         Generate 10-15 relevant keywords that capture:\n\
         1. Core concepts and themes\n\
         2. Technical terminology\n\
         3. Related fields and applications\n\
         4. Emerging trends mentioned\n\n\
         Return only the keywords as a comma-separated list, no explanations.",
        topic = topic,
        material = material,
    )
}

/// Comma-separated list: trimmed, blanks dropped, case-insensitive dedupe
/// keeping the first spelling, at most [`MAX_KEYWORDS`].
pub fn parse_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    strip_code_blocks(text)
        .split(',')
        .map(|k| k.trim().trim_matches('"').trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(MAX_KEYWORDS)
        .map(String::from)
        .collect()
}

// =============================================================================
// Research summary
// =============================================================================

/// Summarize the research from ranked analyzed articles; only the first
/// [`TOP_ARTICLES`] are used as prompt material.
pub async fn generate_research_summary(
    topic: &str,
    ranked: &[AnalyzedArticle],
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<ResearchSummary> {
    let material = &ranked[..ranked.len().min(TOP_ARTICLES)];
    let prompt = research_summary_prompt(topic, material);
    let started = Instant::now();

    let (output, completion) = generate_object::<ResearchSummaryOutput>(
        ResearchSummary::SCHEMA_NAME,
        &prompt,
        options,
        deps,
    )
    .await?;
    let summary = ResearchSummary::from_output(output)?;

    record_call(
        "generate-research-summary",
        &completion,
        started,
        metadata([
            ("topic", json!(topic)),
            ("sourcesCount", json!(material.len())),
        ]),
        options,
        deps,
    )
    .await;

    Ok(summary)
}

fn research_summary_prompt(topic: &str, material: &[AnalyzedArticle]) -> String {
    let sources = material
        .iter()
        .map(|a| {
            format!(
                "Title: {}\nSource: {}\nRelevance: {}/10\nKey Insights: {}\nSummary: {}",
                a.article.title,
                a.article.source,
                a.analysis.relevance_score,
                a.analysis.key_insights.join(", "),
                a.analysis.summary,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "Create a comprehensive research summary for the topic: \"{topic}\"\n\n\
         Based on this analyzed source material:\n\
         {sources}\n\n\
         Generate:\n\
         - An executive summary that captures the essence of the research\n\
         - Key findings that answer the main questions about this topic\n\
         - Actionable recommendations based on the research\n\
         - A confidence level in the completeness of this research (0-10)\n\
         - Source information highlighting the most valuable sources\n\n\
         Be analytical, well-structured, and evidence-based in your summary.",
        topic = topic,
        sources = sources,
    )
}

// =============================================================================
// Stage 3 pipeline
// =============================================================================

/// Analyze, rank, keep the top articles, then derive keywords and the summary.
pub async fn process_articles(
    articles: &[Article],
    topic: &str,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<ProcessedArticles> {
    let ranked = rank_by_relevance(analyze_articles(articles, topic, options, deps).await?);

    let top: Vec<AnalyzedArticle> = ranked.iter().take(TOP_ARTICLES).cloned().collect();
    let top_sources: Vec<Article> = top.iter().map(|a| a.article.clone()).collect();

    let keywords = generate_keywords(topic, &top_sources, options, deps).await?;
    let summary = generate_research_summary(topic, &ranked, options, deps).await?;

    Ok(ProcessedArticles {
        articles: top.into_iter().map(AnalyzedArticle::into_enriched).collect(),
        keywords,
        summary,
        total_analyzed: articles.len(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

async fn generate_object<T: StructuredOutput>(
    schema_name: &str,
    prompt: &str,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> Result<(T, AiCompletion)> {
    let completion = deps
        .ai
        .generate_structured(options.provider, prompt, schema_name, T::strict_schema())
        .await?;

    let parsed = serde_json::from_str::<T>(strip_code_blocks(&completion.content)).map_err(|e| {
        AnalysisError::Malformed {
            schema: schema_name.to_string(),
            message: e.to_string(),
        }
    })?;

    Ok((parsed, completion))
}

/// Record one call and return its cost. Nothing is recorded without a
/// request id or without reported usage.
async fn record_call(
    operation: &str,
    completion: &AiCompletion,
    started: Instant,
    metadata: Map<String, Value>,
    options: AnalysisOptions,
    deps: &ServerDeps,
) -> f64 {
    let Some(usage) = completion.usage else {
        return 0.0;
    };
    let cost = calculate_cost(&usage, &completion.model);

    if let Some(request_id) = options.request_id {
        let metrics = AiMetrics::builder()
            .request_id(request_id)
            .provider(options.provider)
            .model(completion.model.clone())
            .operation(operation)
            .token_usage(usage)
            .cost(cost)
            .duration_ms(elapsed_ms(started))
            .metadata(metadata)
            .build();
        record(metrics, deps).await;
    }

    cost
}

async fn record(metrics: AiMetrics, deps: &ServerDeps) {
    let operation = metrics.operation.clone();
    if let Err(e) = deps.metrics.record(metrics).await {
        warn!(operation = %operation, error = %e, "failed to record AI metrics");
    }
}

fn metadata<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
