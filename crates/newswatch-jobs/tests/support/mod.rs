//! In-memory repositories for executor tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use newswatch_core::{
    new_id, new_run_token, Candidate, CandidateQuery, DayRange, DigestJob,
    DigestJobRepository, JobStatus, JobSuccess, NewsItemRepository, Result, Topic,
};

/// Fixed candidate set filtered the way the SQL loader filters.
pub struct InMemoryNewsItems {
    items: Vec<Candidate>,
}

impl InMemoryNewsItems {
    pub fn new(items: Vec<Candidate>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl NewsItemRepository for InMemoryNewsItems {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>> {
        let since = query.days.since(Utc::now());
        let needle = query.query.to_lowercase();
        let mut out: Vec<Candidate> = self
            .items
            .iter()
            .filter(|c| c.topic == query.topic)
            .filter(|c| since.map_or(true, |s| c.published_at >= s))
            .filter(|c| {
                if needle.is_empty() {
                    return true;
                }
                [
                    Some(c.title.as_str()),
                    c.title_zh.as_deref(),
                    c.summary.as_deref(),
                    c.summary_zh.as_deref(),
                    Some(c.source.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|f| f.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        out.truncate(query.limit.max(0) as usize);
        Ok(out)
    }
}

/// Job store over a mutex-guarded map; the claim check-and-set is
/// atomic under the lock, matching the conditional UPDATE.
#[derive(Default)]
pub struct InMemoryJobs {
    rows: Mutex<HashMap<Uuid, DigestJob>>,
}

impl InMemoryJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<DigestJob> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn insert(&self, job: DigestJob) {
        self.rows.lock().unwrap().insert(job.id, job);
    }
}

#[async_trait]
impl DigestJobRepository for InMemoryJobs {
    async fn create(&self, job: &DigestJob) -> Result<DigestJob> {
        self.rows.lock().unwrap().insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<DigestJob>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_recent_success(
        &self,
        topic: Topic,
        days: DayRange,
        query: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DigestJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|j| {
                j.status == JobStatus::Success
                    && j.topic == topic
                    && j.days == days
                    && j.query == query
                    && j.created_at >= since
            })
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn try_claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.status = JobStatus::Running;
                job.started_at = Some(now);
                job.error_message = None;
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_success(&self, id: Uuid, outcome: &JobSuccess) -> Result<()> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        if let Some(job) = rows.get_mut(&id) {
            job.status = JobStatus::Success;
            job.digest = Some(outcome.digest.clone());
            job.picked = Some(outcome.picked.clone());
            job.candidate_count = Some(outcome.candidate_count);
            job.error_message = None;
            job.next_run_at = None;
            job.ended_at = Some(now);
            job.updated_at = now;
        }
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
        let mut rows = self.rows.lock().unwrap();
        if let Some(job) = rows.get_mut(&id) {
            job.status = JobStatus::Queued;
            job.attempt = attempt;
            job.next_run_at = Some(next_run_at);
            job.error_message = Some(error_message.to_string());
            job.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, attempt: i32, error_message: &str) -> Result<()> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        if let Some(job) = rows.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.attempt = attempt;
            job.error_message = Some(error_message.to_string());
            job.next_run_at = None;
            job.ended_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<DigestJob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .filter(|j| j.next_run_at.map_or(true, |t| t <= now))
            .min_by_key(|j| j.created_at)
            .cloned())
    }
}

/// A stored candidate published `age_hours` ago.
pub fn candidate(topic: Topic, i: usize, age_hours: i64) -> Candidate {
    Candidate {
        topic,
        title: format!("headline {i}"),
        title_zh: None,
        summary: None,
        summary_zh: None,
        source: "reuters".to_string(),
        published_at: Utc::now() - Duration::hours(age_hours),
        url: format!("https://example.com/{i}"),
    }
}

/// A QUEUED job row with the given request parameters.
pub fn queued_job(topic: Topic, days: DayRange, query: &str, max_items: i32) -> DigestJob {
    let now = Utc::now();
    DigestJob {
        id: new_id(),
        run_token: new_run_token(),
        topic,
        days,
        query: query.to_string(),
        candidate_limit: 200,
        max_items,
        status: JobStatus::Queued,
        attempt: 0,
        next_run_at: None,
        started_at: None,
        ended_at: None,
        candidate_count: None,
        error_message: None,
        picked: None,
        digest: None,
        created_at: now,
        updated_at: now,
    }
}

/// A digest body the mock backend can return.
pub fn digest_json() -> String {
    serde_json::json!({
        "overall": "整体情绪偏多。",
        "majorChanges": [],
        "bullish": [
            {"title": "利润增长", "topic": "CATL", "reason": "毛利率改善。",
             "urls": ["https://example.com/0"]}
        ],
        "bearish": [],
        "watch": []
    })
    .to_string()
}
