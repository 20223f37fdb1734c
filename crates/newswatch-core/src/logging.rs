//! Structured logging field name constants for newswatch.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, job completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "digest_builder", "picker", "worker", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process_job", "try_claim", "chat", "translate_batch"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Digest job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Monitored topic the operation concerns.
pub const TOPIC: &str = "topic";

/// Free-text query filter of the job.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidates loaded or processed.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of items picked into the digest input.
pub const PICKED_COUNT: &str = "picked_count";

/// Job attempt counter after the current transition.
pub const ATTEMPT: &str = "attempt";

/// Retry delay in seconds applied on requeue.
pub const DELAY_SECS: &str = "delay_secs";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Provider name ("zhipu", "openai").
pub const PROVIDER: &str = "provider";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
