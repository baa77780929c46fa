// TestDependencies - mock implementations for testing
//
// Provides mock services that can be assembled into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::jobs::{
    ClaimedJob, EnqueueResult, ErrorKind, FailureOutcome, Job, JobQueue, JobSpec, MemoryJobQueue,
    RetryPolicy,
};
use super::{AiCompletion, ArticleCandidate, BaseAI, BaseArticleSource, BaseMetricsSink, ServerDeps};
use crate::common::{AiMetrics, AiProvider, TokenUsage};
use crate::domains::metrics::MemoryMetricsStore;
use crate::domains::research::store::MemoryResearchStore;

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

/// Arguments captured from one AI call
#[derive(Debug, Clone)]
pub struct AiCall {
    pub provider: AiProvider,
    pub prompt: String,
    /// `None` for free-text calls
    pub schema_name: Option<String>,
}

type Responder = Arc<dyn Fn(&str) -> serde_json::Value + Send + Sync>;

/// Scriptable AI.
///
/// Structured calls are answered per schema name: queued responses first,
/// then a responder function, then a fixed default. Text calls pop the text
/// queue and fall back to "Mock AI response".
pub struct MockAI {
    structured: Arc<Mutex<HashMap<String, Vec<serde_json::Value>>>>,
    responders: Arc<Mutex<HashMap<String, Responder>>>,
    defaults: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    text_responses: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    usage: TokenUsage,
    calls: Arc<Mutex<Vec<AiCall>>>,
}

/// Key under which text-call failures are registered
const TEXT_KEY: &str = "text";

impl MockAI {
    pub fn new() -> Self {
        Self {
            structured: Arc::new(Mutex::new(HashMap::new())),
            responders: Arc::new(Mutex::new(HashMap::new())),
            defaults: Arc::new(Mutex::new(HashMap::new())),
            text_responses: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            usage: TokenUsage::new(100, 50),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a one-shot structured response for a schema
    pub fn with_structured(self, schema_name: &str, value: serde_json::Value) -> Self {
        self.structured
            .lock()
            .unwrap()
            .entry(schema_name.to_string())
            .or_default()
            .push(value);
        self
    }

    /// Compute structured responses from the prompt (for concurrent calls)
    pub fn with_structured_responder<F>(self, schema_name: &str, responder: F) -> Self
    where
        F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap()
            .insert(schema_name.to_string(), Arc::new(responder));
        self
    }

    /// Response used whenever nothing else is scripted for a schema
    pub fn with_structured_default(self, schema_name: &str, value: serde_json::Value) -> Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(schema_name.to_string(), value);
        self
    }

    /// Queue a free-text response
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.text_responses.lock().unwrap().push(text.into());
        self
    }

    /// Make every structured call for a schema fail
    pub fn failing_schema(self, schema_name: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(schema_name.to_string(), message.to_string());
        self
    }

    /// Make every free-text call fail
    pub fn failing_text(self, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(TEXT_KEY.to_string(), message.to_string());
        self
    }

    /// Token usage reported on every call
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn calls(&self) -> Vec<AiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls for a schema name
    pub fn structured_call_count(&self, schema_name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.schema_name.as_deref() == Some(schema_name))
            .count()
    }

    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.prompt.contains(text))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn completion(&self, provider: AiProvider, content: String) -> AiCompletion {
        AiCompletion {
            content,
            model: provider.model_name().to_string(),
            usage: Some(self.usage),
        }
    }

    fn scripted_failure(&self, key: &str) -> Result<()> {
        match self.failures.lock().unwrap().get(key) {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn generate_text(&self, provider: AiProvider, prompt: &str) -> Result<AiCompletion> {
        self.calls.lock().unwrap().push(AiCall {
            provider,
            prompt: prompt.to_string(),
            schema_name: None,
        });
        self.scripted_failure(TEXT_KEY)?;

        let mut responses = self.text_responses.lock().unwrap();
        let text = if responses.is_empty() {
            "Mock AI response".to_string()
        } else {
            responses.remove(0)
        };
        Ok(self.completion(provider, text))
    }

    async fn generate_structured(
        &self,
        provider: AiProvider,
        prompt: &str,
        schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<AiCompletion> {
        self.calls.lock().unwrap().push(AiCall {
            provider,
            prompt: prompt.to_string(),
            schema_name: Some(schema_name.to_string()),
        });
        self.scripted_failure(schema_name)?;

        let queued = self
            .structured
            .lock()
            .unwrap()
            .get_mut(schema_name)
            .filter(|queue| !queue.is_empty())
            .map(|queue| queue.remove(0));

        let value = match queued {
            Some(value) => value,
            None => {
                let responder = self.responders.lock().unwrap().get(schema_name).cloned();
                match responder {
                    Some(responder) => responder(prompt),
                    None => self
                        .defaults
                        .lock()
                        .unwrap()
                        .get(schema_name)
                        .cloned()
                        .ok_or_else(|| anyhow!("MockAI has no response for schema {}", schema_name))?,
                }
            }
        };

        Ok(self.completion(provider, value.to_string()))
    }
}

// =============================================================================
// Mock Article Source
// =============================================================================

pub struct MockArticleSource {
    name: String,
    articles: Vec<ArticleCandidate>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl MockArticleSource {
    /// A source that returns nothing (and therefore counts as failed)
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            articles: Vec::new(),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source returning `count` well-formed articles titled "<name> article <i>"
    pub fn with_generated(name: &str, count: usize) -> Self {
        let articles = (1..=count)
            .map(|i| ArticleCandidate {
                title: Some(format!("{} article {}", name, i)),
                url: Some(format!("https://example.com/{}/{}", name.to_lowercase().replace(' ', "-"), i)),
                summary: format!("Summary of {} article {}", name, i),
                source: name.to_string(),
            })
            .collect();
        Self::new(name).with_articles(articles)
    }

    pub fn with_articles(mut self, articles: Vec<ArticleCandidate>) -> Self {
        self.articles = articles;
        self
    }

    /// A source whose every fetch fails with `message`
    pub fn failing(name: &str, message: &str) -> Self {
        let mut source = Self::new(name);
        source.error = Some(message.to_string());
        source
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseArticleSource for MockArticleSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _topic: &str) -> Result<Vec<ArticleCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.articles.clone()),
        }
    }
}

// =============================================================================
// Failing Metrics Sink
// =============================================================================

/// Rejects every write; reads return nothing
#[derive(Default)]
pub struct FailingMetricsSink {
    attempts: AtomicUsize,
}

impl FailingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseMetricsSink for FailingMetricsSink {
    async fn record(&self, _metrics: AiMetrics) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("metrics sink unavailable"))
    }

    async fn for_request(&self, _request_id: Uuid) -> Result<Vec<AiMetrics>> {
        Ok(Vec::new())
    }

    async fn in_range(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<Vec<AiMetrics>> {
        Ok(Vec::new())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AiMetrics>> {
        Ok(Vec::new())
    }

    async fn export(&self) -> Result<Vec<AiMetrics>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Failing Job Queue
// =============================================================================

/// Rejects every enqueue; holds no jobs
#[derive(Default)]
pub struct FailingJobQueue;

#[async_trait]
impl JobQueue for FailingJobQueue {
    async fn enqueue_spec(&self, _spec: JobSpec) -> Result<EnqueueResult> {
        Err(anyhow!("job queue unavailable"))
    }

    async fn claim(&self, _worker_id: &str, _limit: i64) -> Result<Vec<ClaimedJob>> {
        Ok(Vec::new())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        Err(anyhow!("unknown job {}", job_id))
    }

    async fn mark_failed(&self, job_id: Uuid, _error: &str, _kind: ErrorKind) -> Result<FailureOutcome> {
        Err(anyhow!("unknown job {}", job_id))
    }

    async fn find(&self, _job_id: Uuid) -> Result<Option<Job>> {
        Ok(None)
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// In-memory dependency set. Keeps typed handles to every double so tests can
/// script and inspect them after building `ServerDeps`.
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub sources: Vec<Arc<MockArticleSource>>,
    pub metrics: Arc<dyn BaseMetricsSink>,
    pub memory_metrics: Arc<MemoryMetricsStore>,
    pub store: Arc<MemoryResearchStore>,
    pub jobs: Arc<MemoryJobQueue>,
    /// Queue handed to `ServerDeps`; `jobs` unless replaced
    pub queue: Arc<dyn JobQueue>,
}

impl TestDependencies {
    /// Three healthy sources, no backoff, three attempts per job
    pub fn new() -> Self {
        let memory_metrics = Arc::new(MemoryMetricsStore::new(1000));
        let jobs = Arc::new(MemoryJobQueue::new(RetryPolicy::immediate(3)));
        Self {
            ai: Arc::new(MockAI::new()),
            sources: vec![
                Arc::new(MockArticleSource::with_generated("NewsAPI", 3)),
                Arc::new(MockArticleSource::with_generated("Hacker News", 3)),
                Arc::new(MockArticleSource::with_generated("Wikipedia", 3)),
            ],
            metrics: memory_metrics.clone(),
            memory_metrics,
            store: Arc::new(MemoryResearchStore::new()),
            queue: jobs.clone(),
            jobs,
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_sources(mut self, sources: Vec<MockArticleSource>) -> Self {
        self.sources = sources.into_iter().map(Arc::new).collect();
        self
    }

    pub fn metrics_sink(mut self, sink: Arc<dyn BaseMetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn max_attempts(mut self, max_attempts: i32) -> Self {
        self.jobs = Arc::new(MemoryJobQueue::new(RetryPolicy::immediate(max_attempts)));
        self.queue = self.jobs.clone();
        self
    }

    pub fn job_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn into_server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.ai.clone(),
            self.sources
                .iter()
                .map(|s| s.clone() as Arc<dyn BaseArticleSource>)
                .collect(),
            self.metrics.clone(),
            self.store.clone(),
            self.queue.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
