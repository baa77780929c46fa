// Main entry point for the research API server

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use research_core::domains::metrics::MemoryMetricsStore;
use research_core::domains::research::store::PostgresResearchStore;
use research_core::kernel::deps::default_sources;
use research_core::kernel::jobs::{PostgresJobQueue, RetryPolicy};
use research_core::kernel::{ProviderAI, ServerDeps};
use research_core::server::{build_app, spawn_job_runner};
use research_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,research_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Research Assistant API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let ai = ProviderAI::new(
        config.openai_api_key.clone(),
        config.anthropic_api_key.clone(),
    );
    let providers = ai.configured_providers();
    if providers.is_empty() {
        tracing::warn!("No AI provider API keys configured; research jobs will fail");
    } else {
        tracing::info!(providers = ?providers, "AI providers configured");
    }

    let retry_policy = RetryPolicy::from(&config.jobs);
    let deps = Arc::new(ServerDeps::new(
        Arc::new(ai),
        default_sources(config.news_api_key.clone())
            .context("Failed to create article sources")?,
        Arc::new(MemoryMetricsStore::new(config.metrics_capacity)),
        Arc::new(PostgresResearchStore::new(pool.clone())),
        Arc::new(PostgresJobQueue::new(pool.clone(), retry_policy)),
    ));

    // Background job processing
    let (runner_handle, runner_shutdown) = spawn_job_runner(deps.clone(), &config.jobs);

    let app = build_app(deps, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
        })
        .await
        .context("Server error")?;

    runner_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = runner_handle.await {
        tracing::error!(error = %e, "Job runner task panicked");
    }

    Ok(())
}
