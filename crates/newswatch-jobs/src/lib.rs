//! Digest job processing for newswatch.
//!
//! The executor (`DigestPipeline`) runs a persisted digest job through
//! candidate loading, relevance selection, digest generation, and the
//! terminal status transition; the worker polls the queue and runs one
//! job per tick.

pub mod executor;
pub mod worker;

pub use executor::{DigestPipeline, ExecutionOutcome, DIGEST_UNAVAILABLE_MESSAGE};
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};
