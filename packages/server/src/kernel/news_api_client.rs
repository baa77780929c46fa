use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ArticleCandidate, BaseArticleSource};
use crate::common::excerpt;

/// NewsAPI client (https://newsapi.org)
pub struct NewsApiClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

/// NewsAPI `/v2/everything` response
#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    content: Option<String>,
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl NewsApiClient {
    pub const NAME: &'static str = "NewsAPI";

    /// Create a new NewsAPI client; a missing key makes every fetch fail
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: "https://newsapi.org".to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl NewsApiArticle {
    fn into_candidate(self) -> ArticleCandidate {
        let summary = match (self.description, self.content) {
            (Some(description), _) if !description.trim().is_empty() => description,
            (_, Some(content)) if !content.trim().is_empty() => excerpt(&content, 200),
            _ => "No summary available".to_string(),
        };

        ArticleCandidate {
            title: self.title,
            url: self.url,
            summary,
            source: self
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| NewsApiClient::NAME.to_string()),
        }
    }
}

#[async_trait]
impl BaseArticleSource for NewsApiClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<ArticleCandidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .context("NewsAPI key not configured")?;

        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[
                ("q", topic),
                ("sortBy", "relevancy"),
                ("pageSize", "20"),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("Failed to send NewsAPI request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("NewsAPI error {}: {}", status, body);
        }

        let parsed: EverythingResponse = response
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;

        Ok(parsed
            .articles
            .into_iter()
            .map(NewsApiArticle::into_candidate)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(description: Option<&str>, content: Option<&str>) -> NewsApiArticle {
        NewsApiArticle {
            title: Some("Title".into()),
            url: Some("https://example.com".into()),
            description: description.map(Into::into),
            content: content.map(Into::into),
            source: Some(NewsApiSource {
                name: Some("Example Times".into()),
            }),
        }
    }

    #[test]
    fn test_summary_prefers_description() {
        let candidate = article(Some("A description"), Some("Body")).into_candidate();
        assert_eq!(candidate.summary, "A description");
        assert_eq!(candidate.source, "Example Times");
    }

    #[test]
    fn test_summary_falls_back_to_content_excerpt() {
        let long = "x".repeat(250);
        let candidate = article(None, Some(&long)).into_candidate();
        assert_eq!(candidate.summary.chars().count(), 203);
        assert!(candidate.summary.ends_with("..."));
    }

    #[test]
    fn test_summary_placeholder() {
        let candidate = article(None, None).into_candidate();
        assert_eq!(candidate.summary, "No summary available");
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = NewsApiClient::new(None).unwrap();
        let err = client.fetch("rust").await.unwrap_err();
        assert_eq!(err.to_string(), "NewsAPI key not configured");
    }
}
