use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ArticleCandidate, BaseArticleSource};
use crate::common::excerpt;

/// Hacker News search via the Algolia API (no key required)
pub struct HackerNewsClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    title: Option<String>,
    url: Option<String>,
    story_text: Option<String>,
    story_id: Option<u64>,
    #[serde(rename = "objectID")]
    object_id: Option<String>,
}

impl HackerNewsClient {
    pub const NAME: &'static str = "Hacker News";

    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: "https://hn.algolia.com".to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Hit {
    fn into_candidate(self) -> ArticleCandidate {
        let item_id = self
            .story_id
            .map(|id| id.to_string())
            .or(self.object_id);
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| item_id.map(|id| format!("https://news.ycombinator.com/item?id={}", id)));

        let summary = match self.story_text {
            Some(text) if !text.trim().is_empty() => excerpt(&text, 200),
            _ => "Discussion on Hacker News".to_string(),
        };

        ArticleCandidate {
            title: self.title,
            url,
            summary,
            source: HackerNewsClient::NAME.to_string(),
        }
    }
}

#[async_trait]
impl BaseArticleSource for HackerNewsClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<ArticleCandidate>> {
        let response = self
            .client
            .get(format!("{}/api/v1/search", self.base_url))
            .query(&[("query", topic), ("tags", "story"), ("hitsPerPage", "10")])
            .send()
            .await
            .context("Failed to send Hacker News search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Hacker News API error {}: {}", status, body);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Hacker News response")?;

        Ok(parsed.hits.into_iter().map(Hit::into_candidate).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_falls_back_to_discussion_page() {
        let hit: Hit = serde_json::from_value(serde_json::json!({
            "title": "Show HN: a thing",
            "url": null,
            "story_text": null,
            "story_id": 42,
            "objectID": "42"
        }))
        .unwrap();

        let candidate = hit.into_candidate();
        assert_eq!(
            candidate.url.as_deref(),
            Some("https://news.ycombinator.com/item?id=42")
        );
        assert_eq!(candidate.summary, "Discussion on Hacker News");
        assert_eq!(candidate.source, "Hacker News");
    }

    #[test]
    fn test_story_text_is_excerpted() {
        let hit: Hit = serde_json::from_value(serde_json::json!({
            "title": "Ask HN",
            "url": "https://example.com/post",
            "story_text": "y".repeat(300),
            "objectID": "7"
        }))
        .unwrap();

        let candidate = hit.into_candidate();
        assert_eq!(candidate.url.as_deref(), Some("https://example.com/post"));
        assert!(candidate.summary.ends_with("..."));
    }
}
