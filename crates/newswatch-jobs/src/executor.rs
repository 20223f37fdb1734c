//! Digest job execution.
//!
//! `DigestPipeline` owns the whole lifecycle of a digest job: intake,
//! the claim-and-run executor, and the FIFO scheduler entry point. All
//! pipeline failures are classified here; nothing escapes `process_job`
//! as an unhandled error once a job has been claimed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use newswatch_core::{
    clamp_max_items, compute_next_run, defaults, new_id, new_run_token, retry_delay_secs,
    sanitize_query, Candidate, CandidateQuery, ChatBackend, CreateDigestJobRequest,
    CreatedDigestJob, DigestJob, DigestJobRepository, DigestJobView, Error, JobStatus,
    JobSuccess, NewsItemRepository, PickOutcome, PickedItem, Result, Translator,
};
use newswatch_inference::{DigestBuilder, DigestRequest, RelevancePicker};

/// Terminal message recorded when no digest can ever be produced.
pub const DIGEST_UNAVAILABLE_MESSAGE: &str = "AI digest disabled or no provider configured";

/// Which branch of the executor a `process_job` call took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// No job row with that id.
    Missing,
    /// The job already reached a terminal status.
    AlreadyDone,
    /// Another executor holds the claim.
    NotClaimed,
    /// Digest produced and persisted.
    Succeeded,
    /// Rate-limited; returned to the queue with backoff.
    Requeued {
        attempt: i32,
        next_run_at: DateTime<Utc>,
    },
    /// Terminal failure recorded on the row.
    Failed { message: String },
}

/// The digest job pipeline: intake, executor, scheduler.
pub struct DigestPipeline {
    news_items: Arc<dyn NewsItemRepository>,
    jobs: Arc<dyn DigestJobRepository>,
    backend: Option<Arc<dyn ChatBackend>>,
    builder: DigestBuilder,
    max_items: i32,
}

impl DigestPipeline {
    pub fn new(
        news_items: Arc<dyn NewsItemRepository>,
        jobs: Arc<dyn DigestJobRepository>,
        backend: Option<Arc<dyn ChatBackend>>,
        translator: Arc<dyn Translator>,
        digest_enabled: bool,
    ) -> Self {
        Self {
            news_items,
            jobs,
            backend: backend.clone(),
            builder: DigestBuilder::new(backend, translator, digest_enabled),
            max_items: max_items_from_env(),
        }
    }

    /// Override the per-job digest size (normally `AI_DIGEST_MAX_ITEMS`).
    pub fn with_max_items(mut self, max_items: i32) -> Self {
        self.max_items = clamp_max_items(max_items);
        self
    }

    // =========================================================================
    // INTAKE
    // =========================================================================

    /// Create a new QUEUED job from a client request.
    pub async fn create_job(&self, request: &CreateDigestJobRequest) -> Result<CreatedDigestJob> {
        let now = Utc::now();
        let job = DigestJob {
            id: new_id(),
            run_token: new_run_token(),
            topic: request.topic,
            days: request.days,
            query: sanitize_query(&request.query),
            candidate_limit: defaults::CANDIDATE_LIMIT as i32,
            max_items: self.max_items,
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
        };
        let stored = self.jobs.create(&job).await?;

        info!(
            subsystem = "jobs",
            component = "pipeline",
            op = "create_job",
            job_id = %stored.id,
            topic = %stored.topic,
            "Digest job created"
        );
        Ok(CreatedDigestJob {
            id: stored.id,
            run_token: stored.run_token,
        })
    }

    /// Public read shape of a job, for polling clients.
    pub async fn job_view(&self, id: Uuid) -> Result<Option<DigestJobView>> {
        Ok(self.jobs.get(id).await?.as_ref().map(DigestJobView::from))
    }

    /// A recent SUCCESS job with the same parameters, reusable instead
    /// of queueing a fresh one.
    pub async fn find_recent_success(
        &self,
        request: &CreateDigestJobRequest,
    ) -> Result<Option<DigestJobView>> {
        let since = Utc::now() - Duration::seconds(defaults::RECENT_SUCCESS_WINDOW_SECS);
        let found = self
            .jobs
            .find_recent_success(
                request.topic,
                request.days,
                &sanitize_query(&request.query),
                since,
            )
            .await?;
        Ok(found.as_ref().map(DigestJobView::from))
    }

    // =========================================================================
    // EXECUTOR
    // =========================================================================

    /// Run one digest job to a terminal state or a requeue.
    pub async fn process_job(&self, id: Uuid) -> Result<ExecutionOutcome> {
        let start = Instant::now();

        let Some(job) = self.jobs.get(id).await? else {
            return Ok(ExecutionOutcome::Missing);
        };
        if job.status.is_terminal() {
            return Ok(ExecutionOutcome::AlreadyDone);
        }
        if !self.jobs.try_claim(id, Utc::now()).await? {
            return Ok(ExecutionOutcome::NotClaimed);
        }

        // From here on, every failure lands on the row: requeue when
        // rate-limited, FAILED otherwise.
        let outcome = match self.run_claimed(&job).await {
            Ok(outcome) => outcome,
            Err(e) => self.settle_failure(&job, &e).await?,
        };

        info!(
            subsystem = "jobs",
            component = "pipeline",
            op = "process_job",
            job_id = %id,
            topic = %job.topic,
            attempt = job.attempt,
            duration_ms = start.elapsed().as_millis() as u64,
            success = matches!(outcome, ExecutionOutcome::Succeeded),
            "Digest job processed"
        );
        Ok(outcome)
    }

    async fn run_claimed(&self, job: &DigestJob) -> Result<ExecutionOutcome> {
        let candidates = self
            .news_items
            .load_candidates(&CandidateQuery {
                topic: job.topic,
                days: job.days,
                query: job.query.clone(),
                limit: i64::from(job.candidate_limit),
            })
            .await?;

        let max_items = clamp_max_items(job.max_items) as usize;
        let (pick, picked) = self.pick(&candidates, max_items).await;
        if let PickOutcome::Fallback { ref reason } = pick {
            warn!(
                subsystem = "jobs",
                component = "pipeline",
                job_id = %job.id,
                error = %reason,
                "Relevance ranking unavailable, using newest candidates"
            );
        }

        let items: Vec<Candidate> = picked
            .iter()
            .map(|p| candidates[p.i].clone())
            .collect();
        let digest = self
            .builder
            .build(&DigestRequest {
                topic: job.topic,
                days: job.days,
                query: job.query.clone(),
                items,
                max_items: job.max_items,
            })
            .await?;

        let Some(digest) = digest else {
            self.jobs
                .mark_failed(job.id, job.attempt + 1, DIGEST_UNAVAILABLE_MESSAGE)
                .await?;
            return Ok(ExecutionOutcome::Failed {
                message: DIGEST_UNAVAILABLE_MESSAGE.to_string(),
            });
        };

        self.jobs
            .mark_success(
                job.id,
                &JobSuccess {
                    digest,
                    picked,
                    candidate_count: candidates.len() as i32,
                },
            )
            .await?;
        Ok(ExecutionOutcome::Succeeded)
    }

    /// Select digest inputs, falling back to the newest-first prefix
    /// when ranking is unavailable or fails.
    async fn pick(
        &self,
        candidates: &[Candidate],
        max_items: usize,
    ) -> (PickOutcome, Vec<PickedItem>) {
        let outcome = match self.backend {
            Some(ref backend) => {
                let picker = RelevancePicker::new(backend.clone());
                match picker.pick_top_indices(candidates, max_items).await {
                    Ok(indices) => PickOutcome::Ranked(indices),
                    Err(e) => PickOutcome::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
            None => PickOutcome::Fallback {
                reason: "no provider configured".to_string(),
            },
        };

        let indices: Vec<usize> = match outcome {
            PickOutcome::Ranked(ref indices) => indices.clone(),
            PickOutcome::Fallback { .. } => (0..candidates.len().min(max_items)).collect(),
        };
        let picked = indices
            .into_iter()
            .map(|i| PickedItem {
                i,
                title: candidates[i].display_title().to_string(),
                source: candidates[i].source.clone(),
                published_at: candidates[i].published_at,
                url: candidates[i].url.clone(),
            })
            .collect();
        (outcome, picked)
    }

    /// Classify a post-claim failure and settle the row accordingly.
    async fn settle_failure(&self, job: &DigestJob, e: &Error) -> Result<ExecutionOutcome> {
        let message = e.to_string();
        if e.is_rate_limited() {
            let attempt = job.attempt + 1;
            let next_run_at = compute_next_run(attempt, Utc::now());
            self.jobs
                .mark_requeued(job.id, attempt, next_run_at, &message)
                .await?;
            warn!(
                subsystem = "jobs",
                component = "pipeline",
                job_id = %job.id,
                attempt,
                delay_secs = retry_delay_secs(attempt),
                "Rate limited, job requeued"
            );
            return Ok(ExecutionOutcome::Requeued {
                attempt,
                next_run_at,
            });
        }

        let attempt = job.attempt + 1;
        self.jobs.mark_failed(job.id, attempt, &message).await?;
        warn!(
            subsystem = "jobs",
            component = "pipeline",
            job_id = %job.id,
            attempt,
            error = %message,
            "Digest job failed"
        );
        Ok(ExecutionOutcome::Failed { message })
    }

    // =========================================================================
    // SCHEDULER
    // =========================================================================

    /// Process the oldest eligible QUEUED job, if any.
    ///
    /// Never propagates errors: a broken tick is logged and the next
    /// poll retries.
    pub async fn process_next_job(&self) -> Option<(Uuid, ExecutionOutcome)> {
        let job = match self.jobs.next_eligible(Utc::now()).await {
            Ok(job) => job?,
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "process_next_job",
                    error = %e,
                    "Failed to scan job queue"
                );
                return None;
            }
        };

        match self.process_job(job.id).await {
            Ok(outcome) => Some((job.id, outcome)),
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "process_next_job",
                    job_id = %job.id,
                    error = %e,
                    "Executor error"
                );
                None
            }
        }
    }
}

fn max_items_from_env() -> i32 {
    std::env::var("AI_DIGEST_MAX_ITEMS")
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
        .map(clamp_max_items)
        .unwrap_or(defaults::DIGEST_MAX_ITEMS)
}
