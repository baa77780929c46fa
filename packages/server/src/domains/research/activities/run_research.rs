//! Research workflow orchestrator.
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!                 │
//!                 └──► Failed   (only on the final attempt)
//! ```
//!
//! Every attempt restarts from stage 1 and logs each stage as `started`, then
//! `completed`. A failure on a non-final attempt leaves the request in
//! `Processing` and logs a retry entry; the final attempt marks it `Failed` and
//! appends a terminal `Error` entry. The error is always re-raised so the job
//! queue can schedule the next attempt.

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::analysis::{generate_research_plan, process_articles, AnalysisOptions};
use super::gather_articles::gather_articles;
use crate::domains::research::data::{EnhancedResearchData, ProcessingMetadata, WorkflowStep};
use crate::domains::research::jobs::RunResearchJob;
use crate::domains::research::models::{
    ResearchResult, ResearchStatus, WorkflowLog, WorkflowLogStatus,
};
use crate::kernel::jobs::JobContext;
use crate::kernel::ServerDeps;

/// Step name of the entries written when an attempt fails but will be retried.
pub const RETRY_STEP: &str = "Retry";

pub async fn run_research(job: &RunResearchJob, ctx: JobContext, deps: &ServerDeps) -> Result<()> {
    let request_id = job.request_id;

    let Some(request) = deps.store.find_request(request_id).await? else {
        warn!(request_id = %request_id, "research request no longer exists, dropping job");
        return Ok(());
    };

    if deps.store.find_result(request_id).await?.is_some() {
        info!(request_id = %request_id, "result already persisted, completing request");
        deps.store
            .update_status(request_id, ResearchStatus::Completed)
            .await?;
        return Ok(());
    }

    if request.status.is_terminal() {
        info!(
            request_id = %request_id,
            status = request.status.as_str(),
            "research request already finished, skipping"
        );
        return Ok(());
    }

    info!(
        request_id = %request_id,
        provider = %job.provider,
        attempt = ctx.attempt,
        max_attempts = ctx.max_attempts,
        "research job started"
    );

    match run_stages(job, deps).await {
        Ok(()) => {
            info!(request_id = %request_id, provider = %job.provider, "research job completed");
            Ok(())
        }
        Err(e) => {
            handle_failure(request_id, &ctx, &e, deps).await;
            Err(e)
        }
    }
}

async fn run_stages(job: &RunResearchJob, deps: &ServerDeps) -> Result<()> {
    let request_id = job.request_id;
    let topic = job.topic.as_str();
    let options = AnalysisOptions::for_request(job.provider, request_id);

    // Stage 1: input parsing and research planning
    log_step(
        request_id,
        WorkflowStep::InputParsing,
        WorkflowLogStatus::Started,
        "Validating research topic and generating research plan",
        deps,
    )
    .await?;
    deps.store
        .update_status(request_id, ResearchStatus::Processing)
        .await?
        .ok_or_else(|| anyhow!("research request {} cannot move to processing", request_id))?;

    let plan = generate_research_plan(topic, options, deps).await?;
    log_step(
        request_id,
        WorkflowStep::InputParsing,
        WorkflowLogStatus::Completed,
        format!(
            "Research plan generated with {} key questions and {} search terms",
            plan.primary_questions.len(),
            plan.search_terms.len()
        ),
        deps,
    )
    .await?;

    // Stage 2: data gathering
    log_step(
        request_id,
        WorkflowStep::DataGathering,
        WorkflowLogStatus::Started,
        "Fetching articles from external API",
        deps,
    )
    .await?;
    let articles = gather_articles(topic, deps).await?;
    log_step(
        request_id,
        WorkflowStep::DataGathering,
        WorkflowLogStatus::Completed,
        format!("Fetched {} articles", articles.len()),
        deps,
    )
    .await?;

    // Stage 3: AI processing
    log_step(
        request_id,
        WorkflowStep::AiProcessing,
        WorkflowLogStatus::Started,
        "Analyzing articles with AI for relevance and insights",
        deps,
    )
    .await?;
    let processed = process_articles(&articles, topic, options, deps).await?;
    log_step(
        request_id,
        WorkflowStep::AiProcessing,
        WorkflowLogStatus::Completed,
        format!(
            "AI analysis completed: {} top articles selected, {} keywords generated",
            processed.articles.len(),
            processed.keywords.len()
        ),
        deps,
    )
    .await?;

    // Stage 4: result persistence
    log_step(
        request_id,
        WorkflowStep::ResultPersistence,
        WorkflowLogStatus::Started,
        "Saving enhanced results to database",
        deps,
    )
    .await?;
    let enhanced = EnhancedResearchData {
        research_summary: processed.summary,
        research_plan: plan,
        metadata: ProcessingMetadata {
            provider: job.provider,
            total_analyzed: processed.total_analyzed,
            processing_timestamp: Utc::now(),
        },
    };
    deps.store
        .create_result(&ResearchResult::new(
            request_id,
            processed.articles,
            processed.keywords,
            Some(enhanced),
        ))
        .await?;
    deps.store
        .update_status(request_id, ResearchStatus::Completed)
        .await?;
    log_step(
        request_id,
        WorkflowStep::ResultPersistence,
        WorkflowLogStatus::Completed,
        "Enhanced AI results saved successfully",
        deps,
    )
    .await?;

    Ok(())
}

/// Record a failed attempt. Errors here are logged, never raised, so the
/// stage error reaches the job queue.
async fn handle_failure(request_id: Uuid, ctx: &JobContext, err: &anyhow::Error, deps: &ServerDeps) {
    let message = failure_message(err);

    if ctx.is_final_attempt() {
        error!(
            request_id = %request_id,
            attempt = ctx.attempt,
            error = %message,
            "research job failed"
        );

        if let Err(e) = deps
            .store
            .update_status(request_id, ResearchStatus::Failed)
            .await
        {
            error!(request_id = %request_id, error = %e, "failed to mark research request failed");
        }
        if let Err(e) = log_step(
            request_id,
            WorkflowStep::Error,
            WorkflowLogStatus::Failed,
            message,
            deps,
        )
        .await
        {
            error!(request_id = %request_id, error = %e, "failed to write terminal error log");
        }
    } else {
        warn!(
            request_id = %request_id,
            attempt = ctx.attempt,
            max_attempts = ctx.max_attempts,
            error = %message,
            "research attempt failed, will retry"
        );

        let retry_message = format!(
            "Attempt {}/{} failed: {}; retrying",
            ctx.attempt, ctx.max_attempts, message
        );
        if let Err(e) = log_step(
            request_id,
            WorkflowStep::from(RETRY_STEP),
            WorkflowLogStatus::Failed,
            retry_message,
            deps,
        )
        .await
        {
            error!(request_id = %request_id, error = %e, "failed to write retry log");
        }
    }
}

fn failure_message(err: &anyhow::Error) -> String {
    let message = format!("{:#}", err);
    if message.trim().is_empty() {
        "Unknown error occurred".to_string()
    } else {
        message
    }
}

async fn log_step(
    request_id: Uuid,
    step: WorkflowStep,
    status: WorkflowLogStatus,
    message: impl Into<String>,
    deps: &ServerDeps,
) -> Result<()> {
    let entry = WorkflowLog::new(request_id, step, status, message);
    info!(
        request_id = %request_id,
        step = %entry.step,
        status = ?entry.status,
        message = %entry.message,
        "workflow step"
    );
    deps.store.append_log(&entry).await?;
    Ok(())
}
