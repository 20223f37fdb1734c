//! Repository and backend traits for newswatch.
//!
//! These traits define the seams between the pure job logic and its
//! collaborators: the PostgreSQL repositories, the chat-completion
//! backend, and the translator. Tests substitute in-memory and scripted
//! implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Candidate, CandidateQuery, DayRange, DigestJob, JobSuccess, Topic,
};
use crate::Result;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// Read access to stored news items.
#[async_trait]
pub trait NewsItemRepository: Send + Sync {
    /// Load digest candidates matching the query, newest first.
    ///
    /// An empty result is `Ok(vec![])`, never an error.
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>>;
}

/// Durable digest job storage.
#[async_trait]
pub trait DigestJobRepository: Send + Sync {
    /// Insert a new QUEUED job and return the stored row.
    async fn create(&self, job: &DigestJob) -> Result<DigestJob>;

    /// Fetch a job by id.
    async fn get(&self, id: Uuid) -> Result<Option<DigestJob>>;

    /// Most recent SUCCESS job with identical request parameters whose
    /// `created_at` is at or after `since`.
    async fn find_recent_success(
        &self,
        topic: Topic,
        days: DayRange,
        query: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DigestJob>>;

    /// Atomically transition a job from QUEUED to RUNNING, clearing the
    /// previous attempt's error message.
    ///
    /// Returns `true` when this caller won the claim; `false` when the
    /// job was not in QUEUED (already claimed, finished, or missing).
    async fn try_claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Record a successful run: status SUCCESS, digest + picked + count
    /// persisted, `ended_at` set, `error_message` and `next_run_at`
    /// cleared.
    async fn mark_success(&self, id: Uuid, outcome: &JobSuccess) -> Result<()>;

    /// Return a rate-limited job to the queue: status QUEUED, attempt
    /// incremented, `next_run_at` set, error message recorded.
    async fn mark_requeued(
        &self,
        id: Uuid,
        attempt: i32,
        next_run_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<()>;

    /// Record a terminal failure: status FAILED, attempt counter set,
    /// `ended_at` set, `next_run_at` cleared, error message recorded.
    async fn mark_failed(&self, id: Uuid, attempt: i32, error_message: &str) -> Result<()>;

    /// Oldest QUEUED job whose `next_run_at` is null or has passed.
    async fn next_eligible(&self, now: DateTime<Utc>) -> Result<Option<DigestJob>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for chat-completion style text generation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run one chat completion with a system instruction and a user
    /// prompt, returning the assistant message content.
    async fn chat(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Provider identifier ("zhipu", "openai", "mock"), part of the
    /// digest cache key.
    fn provider_name(&self) -> &str;
}

// =============================================================================
// TRANSLATION TRAITS
// =============================================================================

/// One text fragment submitted for translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translatable {
    pub text: String,
}

/// Translation result for one fragment. `None` means the fragment was
/// left untranslated (provider unconfigured or declined).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: Option<String>,
}

/// Batch translator into Chinese.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a batch of fragments.
    ///
    /// The result has the same length and order as the input. An
    /// unconfigured translator returns all-`None` entries rather than
    /// an error.
    async fn translate_batch(&self, items: &[Translatable]) -> Result<Vec<Translation>>;
}
