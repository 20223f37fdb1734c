//! Digest job repository implementation.
//!
//! The job row is the system's only coordination point: the QUEUED →
//! RUNNING transition is a single conditional UPDATE, so concurrent
//! executors racing for the same job resolve at the database without
//! advisory locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use newswatch_core::{
    models::to_json_value, DayRange, DigestJob, DigestJobRepository, Error, JobStatus,
    JobSuccess, Result, Topic,
};
use uuid::Uuid;

/// PostgreSQL implementation of DigestJobRepository.
pub struct PgDigestJobRepository {
    pool: Pool<Postgres>,
}

impl PgDigestJobRepository {
    /// Create a new PgDigestJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<DigestJob> {
        let picked: Option<JsonValue> = row.get("picked");
        let digest: Option<JsonValue> = row.get("digest");
        Ok(DigestJob {
            id: row.get("id"),
            run_token: row.get("run_token"),
            topic: Topic::parse_or_default(row.get("topic")),
            days: DayRange::parse_or_default(row.get("days")),
            query: row.get("query"),
            candidate_limit: row.get("candidate_limit"),
            max_items: row.get("max_items"),
            status: JobStatus::parse_or_failed(row.get("status")),
            attempt: row.get("attempt"),
            next_run_at: row.get("next_run_at"),
            started_at: row.get("started_at"),
            ended_at: row.get("ended_at"),
            candidate_count: row.get("candidate_count"),
            error_message: row.get("error_message"),
            picked: picked.map(serde_json::from_value).transpose()?,
            digest: digest.map(serde_json::from_value).transpose()?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

const JOB_COLUMNS: &str = "id, run_token, topic, days, query, candidate_limit, max_items, \
     status, attempt, next_run_at, started_at, ended_at, candidate_count, \
     error_message, picked, digest, created_at, updated_at";

#[async_trait]
impl DigestJobRepository for PgDigestJobRepository {
    async fn create(&self, job: &DigestJob) -> Result<DigestJob> {
        let row = sqlx::query(&format!(
            "INSERT INTO digest_job
                 (id, run_token, topic, days, query, candidate_limit, max_items,
                  status, attempt, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job.id)
        .bind(&job.run_token)
        .bind(job.topic.as_str())
        .bind(job.days.as_str())
        .bind(&job.query)
        .bind(job.candidate_limit)
        .bind(job.max_items)
        .bind(job.status.as_str())
        .bind(job.attempt)
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_job_row(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DigestJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM digest_job WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn find_recent_success(
        &self,
        topic: Topic,
        days: DayRange,
        query: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DigestJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM digest_job
             WHERE topic = $1 AND days = $2 AND query = $3
               AND status = 'SUCCESS' AND created_at >= $4
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(topic.as_str())
        .bind(days.as_str())
        .bind(query)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn try_claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        // Zero rows means the job was not QUEUED; the caller lost the
        // race or the job already finished.
        let claimed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE digest_job
             SET status = 'RUNNING', started_at = $2, updated_at = $2,
                 error_message = NULL
             WHERE id = $1 AND status = 'QUEUED'
             RETURNING id",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "digest_jobs",
            op = "try_claim",
            job_id = %id,
            success = claimed.is_some(),
            "Claim attempt"
        );
        Ok(claimed.is_some())
    }

    async fn mark_success(&self, id: Uuid, outcome: &JobSuccess) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE digest_job
             SET status = 'SUCCESS', digest = $2, picked = $3, candidate_count = $4,
                 error_message = NULL, next_run_at = NULL, ended_at = $5, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(to_json_value(&outcome.digest)?)
        .bind(to_json_value(&outcome.picked)?)
        .bind(outcome.candidate_count)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_requeued(
        &self,
        id: Uuid,
        attempt: i32,
        next_run_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE digest_job
             SET status = 'QUEUED', attempt = $2, next_run_at = $3,
                 error_message = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempt)
        .bind(next_run_at)
        .bind(error_message)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, attempt: i32, error_message: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE digest_job
             SET status = 'FAILED', attempt = $2, error_message = $3,
                 next_run_at = NULL, ended_at = $4, updated_at = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempt)
        .bind(error_message)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<DigestJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM digest_job
             WHERE status = 'QUEUED'
               AND (next_run_at IS NULL OR next_run_at <= $1)
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }
}
