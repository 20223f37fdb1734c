//! News item repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use newswatch_core::{
    defaults, Candidate, CandidateQuery, Error, NewsItemRepository, Result, Topic,
};

use crate::escape_like;

/// PostgreSQL implementation of NewsItemRepository.
pub struct PgNewsItemRepository {
    pool: Pool<Postgres>,
}

impl PgNewsItemRepository {
    /// Create a new PgNewsItemRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_candidate_row(row: sqlx::postgres::PgRow) -> Candidate {
        Candidate {
            topic: Topic::parse_or_default(row.get("topic")),
            title: row.get("title"),
            title_zh: row.get("title_zh"),
            summary: row.get("summary"),
            summary_zh: row.get("summary_zh"),
            source: row.get("source"),
            published_at: row.get("published_at"),
            url: row.get("url"),
        }
    }
}

#[async_trait]
impl NewsItemRepository for PgNewsItemRepository {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>> {
        let limit = query.limit.clamp(1, defaults::CANDIDATE_LIMIT_MAX);
        let since = query.days.since(Utc::now());
        let pattern = if query.query.is_empty() {
            None
        } else {
            Some(format!("%{}%", escape_like(&query.query)))
        };

        // The filter shape varies on two optional axes, so the query is
        // assembled from fixed fragments with stable bind positions.
        let mut sql = String::from(
            "SELECT topic, title, title_zh, summary, summary_zh, source, published_at, url
             FROM news_item
             WHERE topic = $1",
        );
        if since.is_some() {
            sql.push_str(" AND published_at >= $2");
        }
        if pattern.is_some() {
            let n = if since.is_some() { 3 } else { 2 };
            sql.push_str(&format!(
                " AND (title ILIKE ${n} ESCAPE '\\'
                   OR title_zh ILIKE ${n} ESCAPE '\\'
                   OR summary ILIKE ${n} ESCAPE '\\'
                   OR summary_zh ILIKE ${n} ESCAPE '\\'
                   OR source ILIKE ${n} ESCAPE '\\')"
            ));
        }
        let limit_n = 2 + usize::from(since.is_some()) + usize::from(pattern.is_some());
        sql.push_str(&format!(" ORDER BY published_at DESC LIMIT ${limit_n}"));

        let mut q = sqlx::query(&sql).bind(query.topic.as_str());
        if let Some(since) = since {
            q = q.bind(since);
        }
        if let Some(ref pattern) = pattern {
            q = q.bind(pattern);
        }
        let rows = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "news_items",
            op = "load_candidates",
            topic = %query.topic,
            candidate_count = rows.len(),
            "Loaded digest candidates"
        );

        Ok(rows.into_iter().map(Self::parse_candidate_row).collect())
    }
}
