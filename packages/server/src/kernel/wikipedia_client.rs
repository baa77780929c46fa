use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ArticleCandidate, BaseArticleSource};
use crate::common::excerpt;

/// Wikipedia search + page summary client (English Wikipedia, no key required)
pub struct WikipediaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pages: Vec<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    key: Option<String>,
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

impl WikipediaClient {
    pub const NAME: &'static str = "Wikipedia";

    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("research-assistant/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: "https://en.wikipedia.org".to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn search(&self, topic: &str) -> Result<Vec<SearchPage>> {
        let response = self
            .client
            .get(format!("{}/w/rest.php/v1/search/page", self.base_url))
            .query(&[("q", topic), ("limit", "5")])
            .send()
            .await
            .context("Failed to send Wikipedia search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Wikipedia search error {}: {}", status, body);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Wikipedia search response")?;

        Ok(parsed.pages)
    }

    async fn summary(&self, page: &SearchPage) -> Result<ArticleCandidate> {
        let key = page
            .key
            .clone()
            .unwrap_or_else(|| page.title.replace(' ', "_"));

        let response = self
            .client
            .get(format!(
                "{}/api/rest_v1/page/summary/{}",
                self.base_url,
                urlencoding::encode(&key)
            ))
            .send()
            .await
            .context("Failed to send Wikipedia summary request")?;

        if !response.status().is_success() {
            anyhow::bail!("Wikipedia summary error {} for {}", response.status(), key);
        }

        let summary: PageSummary = response
            .json()
            .await
            .context("Failed to parse Wikipedia summary")?;

        Ok(summary.into_candidate(&page.title, &key))
    }
}

impl PageSummary {
    fn into_candidate(self, search_title: &str, key: &str) -> ArticleCandidate {
        let url = self
            .content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page)
            .unwrap_or_else(|| format!("https://en.wikipedia.org/wiki/{}", urlencoding::encode(key)));

        ArticleCandidate {
            title: Some(self.title.unwrap_or_else(|| search_title.to_string())),
            url: Some(url),
            summary: excerpt(self.extract.as_deref().unwrap_or_default(), 300),
            source: WikipediaClient::NAME.to_string(),
        }
    }
}

#[async_trait]
impl BaseArticleSource for WikipediaClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<ArticleCandidate>> {
        let pages = self.search(topic).await?;

        let mut candidates = Vec::with_capacity(pages.len());
        for page in &pages {
            match self.summary(page).await {
                Ok(candidate) => candidates.push(candidate),
                // One missing summary should not sink the whole source
                Err(e) => debug!(title = %page.title, error = %e, "skipping Wikipedia page"),
            }
        }

        Ok(candidates)
    }
}
