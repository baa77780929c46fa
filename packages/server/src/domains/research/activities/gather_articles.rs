//! Ordered fallback across article sources.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domains::research::data::Article;
use crate::kernel::{BaseArticleSource, ServerDeps};

/// Articles kept from the first source that yields any.
pub const MAX_ARTICLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatherError {
    #[error("No data sources configured")]
    NoSources,

    /// One "<source>: <reason>" entry per source, in try order
    #[error("All data sources failed: {}", .0.join("; "))]
    AllSourcesExhausted(Vec<String>),
}

/// Gather articles for a topic using the configured sources.
pub async fn gather_articles(topic: &str, deps: &ServerDeps) -> Result<Vec<Article>, GatherError> {
    fetch_articles(topic, &deps.sources).await
}

/// Try each source in order and return the first non-empty, validated batch.
///
/// Candidates without a title or url are dropped before the emptiness check,
/// so a source returning only malformed entries counts as failed.
pub async fn fetch_articles(
    topic: &str,
    sources: &[Arc<dyn BaseArticleSource>],
) -> Result<Vec<Article>, GatherError> {
    if sources.is_empty() {
        return Err(GatherError::NoSources);
    }

    let mut failures = Vec::with_capacity(sources.len());

    for source in sources {
        let name = source.name();
        info!(source = %name, topic = %topic, "fetching articles");

        match source.fetch(topic).await {
            Ok(candidates) => {
                let articles: Vec<Article> = candidates
                    .into_iter()
                    .filter_map(Article::from_candidate)
                    .take(MAX_ARTICLES)
                    .collect();

                if articles.is_empty() {
                    warn!(source = %name, "source returned no usable articles");
                    failures.push(format!("{}: No articles found from {}", name, name));
                    continue;
                }

                info!(source = %name, count = articles.len(), "articles fetched");
                return Ok(articles);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "source failed, trying next");
                failures.push(format!("{}: {}", name, e));
            }
        }
    }

    Err(GatherError::AllSourcesExhausted(failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{ArticleCandidate, MockArticleSource};

    fn sources(list: Vec<MockArticleSource>) -> (Vec<Arc<MockArticleSource>>, Vec<Arc<dyn BaseArticleSource>>) {
        let typed: Vec<Arc<MockArticleSource>> = list.into_iter().map(Arc::new).collect();
        let erased = typed
            .iter()
            .map(|s| s.clone() as Arc<dyn BaseArticleSource>)
            .collect();
        (typed, erased)
    }

    #[tokio::test]
    async fn test_first_healthy_source_wins() {
        let (typed, erased) = sources(vec![
            MockArticleSource::with_generated("A", 2),
            MockArticleSource::with_generated("B", 2),
        ]);

        let articles = fetch_articles("rust", &erased).await.unwrap();

        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.source == "A"));
        assert_eq!(typed[1].call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_past_errors_and_empty_results() {
        let (typed, erased) = sources(vec![
            MockArticleSource::failing("A", "rate limited"),
            MockArticleSource::new("B"),
            MockArticleSource::with_generated("C", 3),
        ]);

        let articles = fetch_articles("rust", &erased).await.unwrap();

        assert!(articles.iter().all(|a| a.source == "C"));
        assert!(typed.iter().all(|s| s.call_count() == 1));
    }

    #[tokio::test]
    async fn test_stops_at_first_source_with_articles() {
        let (typed, erased) = sources(vec![
            MockArticleSource::failing("A", "rate limited"),
            MockArticleSource::with_generated("B", 3),
            MockArticleSource::with_generated("C", 3),
        ]);

        let articles = fetch_articles("rust", &erased).await.unwrap();

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["B article 1", "B article 2", "B article 3"]);
        assert_eq!(typed[0].call_count(), 1);
        assert_eq!(typed[1].call_count(), 1);
        assert_eq!(typed[2].call_count(), 0);
    }

    #[tokio::test]
    async fn test_every_failing_source_is_named() {
        let (typed, erased) = sources(vec![
            MockArticleSource::failing("A", "timeout"),
            MockArticleSource::failing("B", "HTTP 500"),
            MockArticleSource::failing("C", "invalid key"),
        ]);

        let err = fetch_articles("rust", &erased).await.unwrap_err();

        assert_eq!(
            err,
            GatherError::AllSourcesExhausted(vec![
                "A: timeout".to_string(),
                "B: HTTP 500".to_string(),
                "C: invalid key".to_string(),
            ])
        );
        assert_eq!(
            err.to_string(),
            "All data sources failed: A: timeout; B: HTTP 500; C: invalid key"
        );
        assert!(typed.iter().all(|s| s.call_count() == 1));
    }

    #[tokio::test]
    async fn test_caps_at_five_articles() {
        let (_, erased) = sources(vec![MockArticleSource::with_generated("A", 9)]);
        assert_eq!(fetch_articles("rust", &erased).await.unwrap().len(), MAX_ARTICLES);
    }

    #[tokio::test]
    async fn test_malformed_candidates_do_not_count() {
        let broken = ArticleCandidate {
            title: None,
            url: Some("https://a".into()),
            summary: "s".into(),
            source: "A".into(),
        };
        let (_, erased) = sources(vec![
            MockArticleSource::new("A").with_articles(vec![broken]),
            MockArticleSource::with_generated("B", 1),
        ]);

        let articles = fetch_articles("rust", &erased).await.unwrap();
        assert_eq!(articles[0].source, "B");
    }

    #[tokio::test]
    async fn test_all_sources_exhausted_lists_every_reason() {
        let (_, erased) = sources(vec![
            MockArticleSource::failing("A", "timeout"),
            MockArticleSource::new("B"),
        ]);

        let err = fetch_articles("rust", &erased).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "All data sources failed: A: timeout; B: No articles found from B"
        );
    }

    #[tokio::test]
    async fn test_no_sources() {
        assert_eq!(fetch_articles("rust", &[]).await.unwrap_err(), GatherError::NoSources);
    }
}
