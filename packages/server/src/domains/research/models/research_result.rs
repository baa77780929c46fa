use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::research::data::{Article, EnhancedResearchData};

/// Final output of a research request. At most one per request, never updated.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub id: Uuid,
    pub request_id: Uuid,
    /// Top-ranked, analyzed articles
    pub articles: Json<Vec<Article>>,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_data: Option<Json<EnhancedResearchData>>,
    pub created_at: DateTime<Utc>,
}

impl ResearchResult {
    pub fn new(
        request_id: Uuid,
        articles: Vec<Article>,
        keywords: Vec<String>,
        enhanced_data: Option<EnhancedResearchData>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            articles: Json(articles),
            keywords,
            enhanced_data: enhanced_data.map(Json),
            created_at: Utc::now(),
        }
    }

    /// Insert unless the request already has a result; returns the stored row either way.
    pub async fn insert_once(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query(
            "INSERT INTO research_results (id, request_id, articles, keywords, enhanced_data, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.request_id)
        .bind(&self.articles)
        .bind(&self.keywords)
        .bind(&self.enhanced_data)
        .bind(self.created_at)
        .execute(pool)
        .await?;

        Self::find_by_request(self.request_id, pool)
            .await?
            .context("research result missing after insert")
    }

    pub async fn find_by_request(request_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM research_results WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}
