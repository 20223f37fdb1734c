//! Core types, traits, and abstractions for newswatch.
//!
//! This crate defines the shared vocabulary of the system: the digest
//! job model and its state machine, the repository and backend traits
//! implemented by the db and inference crates, the error type, and the
//! pure helpers (backoff, sanitization, hashing) that the executor and
//! tests exercise directly.

pub mod defaults;
pub mod error;
pub mod hash;
pub mod logging;
pub mod models;
pub mod traits;

pub use error::{is_rate_limited_message, Error, Result};
pub use models::{
    clamp_max_items, compute_next_run, retry_delay_secs, sanitize_query,
    BacktranslateOutcome, Candidate, CandidateQuery, CreateDigestJobRequest,
    CreatedDigestJob, DayRange, DigestEntry, DigestJob, DigestJobView,
    DigestResult, JobStatus, JobSuccess, PickOutcome, PickedItem, Topic,
    TopicTag,
};
pub use traits::{
    ChatBackend, DigestJobRepository, NewsItemRepository, Translatable,
    Translation, Translator,
};

/// Generate a time-ordered UUIDv7 for new database rows.
pub fn new_id() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}

/// Generate a random run-authorization token for a new job.
pub fn new_run_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
