//! Test harnesses for integration testing.
//!
//! [`TestHarness`] wires the full application (router, job runner, job
//! handlers) over in-memory doubles. [`PostgresHarness`] starts one shared
//! Postgres container for the run and applies migrations once.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use research_core::kernel::jobs::{JobRunner, JobRunnerConfig};
use research_core::kernel::{ServerDeps, TestDependencies};
use research_core::server::{build_app, build_job_registry};
use serde_json::Value;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;

use super::scripted_ai;

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Full application over in-memory dependencies.
///
/// Jobs are not processed in the background; call [`TestHarness::drain_jobs`]
/// (or `runner.run_once()`) to execute what the API enqueued.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let (status, body) = ctx.post_json("/api/research", json!({...})).await;
/// }
/// ```
pub struct TestHarness {
    /// Typed handles to the doubles behind `deps`
    pub test_deps: TestDependencies,
    pub deps: Arc<ServerDeps>,
    pub app: Router,
    pub runner: JobRunner,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::with_dependencies(TestDependencies::new().mock_ai(scripted_ai()))
    }
}

impl TestHarness {
    pub fn with_dependencies(test_deps: TestDependencies) -> Self {
        init_tracing();

        let deps = Arc::new(test_deps.into_server_deps());
        let app = build_app(deps.clone(), &[]);
        let runner = JobRunner::with_config(
            deps.jobs.clone(),
            Arc::new(build_job_registry()),
            deps.clone(),
            JobRunnerConfig::with_worker_id("test-runner"),
        );

        Self {
            test_deps,
            deps,
            app,
            runner,
        }
    }

    /// Run claimed batches until the queue has nothing ready.
    pub async fn drain_jobs(&self) -> usize {
        let mut processed = 0;
        loop {
            let count = self
                .runner
                .run_once()
                .await
                .expect("job runner failed to claim");
            if count == 0 {
                return processed;
            }
            processed += count;
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

/// Shared Postgres container; started once and reused by every test.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Fresh pool against the shared, migrated Postgres container.
pub struct PostgresHarness {
    pub db_pool: PgPool,
}

impl AsyncTestContext for PostgresHarness {
    async fn setup() -> Self {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .expect("Failed to connect to test database");
        Self { db_pool }
    }
}
