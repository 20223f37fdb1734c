//! Centralized default constants for newswatch.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// CANDIDATE LOADING
// =============================================================================

/// Default number of stored items loaded as digest input.
pub const CANDIDATE_LIMIT: i64 = 200;

/// Hard ceiling on the candidate loader limit.
pub const CANDIDATE_LIMIT_MAX: i64 = 500;

/// Maximum characters kept from a free-text query after sanitization.
pub const QUERY_MAX_CHARS: usize = 80;

// =============================================================================
// DIGEST
// =============================================================================

/// Default number of items fed into digest generation.
pub const DIGEST_MAX_ITEMS: i32 = 30;

/// Smallest allowed digest input size.
pub const DIGEST_MIN_ITEMS: i32 = 5;

/// Largest allowed digest input size.
pub const DIGEST_MAX_ITEMS_CAP: i32 = 60;

/// Cap on the majorChanges list in a digest.
pub const DIGEST_MAJOR_CHANGES_CAP: usize = 5;

/// Cap on the bullish list in a digest.
pub const DIGEST_BULLISH_CAP: usize = 6;

/// Cap on the bearish list in a digest.
pub const DIGEST_BEARISH_CAP: usize = 6;

/// Cap on the watch list in a digest.
pub const DIGEST_WATCH_CAP: usize = 5;

/// Cap on urls per digest entry.
pub const DIGEST_ENTRY_URLS_CAP: usize = 3;

/// Digest cache entry lifetime in seconds.
pub const DIGEST_CACHE_TTL_SECS: u64 = 600;

/// Number of leading candidate fingerprints included in the cache key.
pub const DIGEST_CACHE_KEY_ITEMS: usize = 40;

/// Sampling temperature for digest and picker chat calls.
pub const CHAT_TEMPERATURE: f32 = 0.2;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Base retry delay in seconds for rate-limited failures.
pub const BACKOFF_BASE_SECS: i64 = 30;

/// Per-attempt retry delay increment in seconds.
pub const BACKOFF_STEP_SECS: i64 = 45;

/// Upper bound on the retry delay in seconds.
pub const BACKOFF_MAX_SECS: i64 = 600;

/// Reuse window for a prior successful job with identical parameters.
pub const RECENT_SUCCESS_WINDOW_SECS: i64 = 30 * 60;

/// Default job worker poll interval in milliseconds.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// TRANSLATION
// =============================================================================

/// Items per translation chat call.
pub const TRANSLATE_BATCH_SIZE: usize = 10;

// =============================================================================
// INFERENCE
// =============================================================================

/// Zhipu OpenAI-compatible endpoint.
pub const ZHIPU_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Zhipu digest model.
pub const ZHIPU_DIGEST_MODEL: &str = "glm-4.7-flash";

/// Default Zhipu translation model.
pub const ZHIPU_TRANSLATE_MODEL: &str = "glm-4.6v";

/// Default OpenAI digest model.
pub const OPENAI_DIGEST_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI translation model.
pub const OPENAI_TRANSLATE_MODEL: &str = "gpt-4o-mini";

/// Timeout for chat completion requests in seconds.
pub const CHAT_TIMEOUT_SECS: u64 = 120;
