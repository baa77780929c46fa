//! Application setup and server configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::JobSettings;
use crate::domains::research::jobs::register_research_jobs;
use crate::kernel::jobs::{JobRegistry, JobRunner, JobRunnerConfig};
use crate::kernel::ServerDeps;
use crate::server::routes::{ai, health_handler, metrics, research};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, allowed_origins: &[String]) -> Router {
    let app_state = AppState { deps };

    let research_routes = Router::new()
        .route(
            "/",
            post(research::create_research).get(research::list_research),
        )
        .route("/:id", get(research::get_research));

    let metrics_routes = Router::new()
        .route("/request/:request_id", get(metrics::request_metrics))
        .route("/aggregate", get(metrics::aggregate_metrics))
        .route("/recent", get(metrics::recent_metrics))
        .route("/costs", get(metrics::cost_analysis))
        .route("/export", get(metrics::export_metrics))
        .route("/health", get(metrics::metrics_health));

    let ai_routes = Router::new()
        .route("/research-plan", post(ai::research_plan))
        .route("/keywords", post(ai::keywords))
        .route("/stream-analysis", post(ai::stream_analysis));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/research", research_routes)
        .nest("/api/metrics", metrics_routes)
        .nest("/api/ai", ai_routes)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Any origin when none are configured (development)
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Register every job handler.
pub fn build_job_registry() -> JobRegistry {
    let mut registry = JobRegistry::new();
    register_research_jobs(&mut registry);
    registry
}

/// Spawn the job runner as a background task.
///
/// Store `true` into the returned flag to stop it after its current batch.
pub fn spawn_job_runner(
    deps: Arc<ServerDeps>,
    settings: &JobSettings,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let runner = JobRunner::with_config(
        deps.jobs.clone(),
        Arc::new(build_job_registry()),
        deps,
        JobRunnerConfig::from(settings),
    );
    let shutdown = runner.shutdown_handle();

    let handle = tokio::spawn(async move {
        if let Err(e) = runner.run().await {
            tracing::error!(error = %e, "Job runner exited with error");
        }
    });

    (handle, shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::research::jobs::RunResearchJob;

    #[test]
    fn test_registry_knows_research_jobs() {
        let registry = build_job_registry();
        assert!(registry.is_registered(RunResearchJob::JOB_TYPE));
    }
}
