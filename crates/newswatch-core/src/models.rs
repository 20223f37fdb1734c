//! Core data model for newswatch.
//!
//! Everything durable or wire-visible lives here: the monitored topics,
//! the stored news item projection used as digest input, the digest job
//! row and its public read shape, and the digest payload produced by
//! the model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// TOPICS
// =============================================================================

/// A monitored entity the system tracks news for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Topic {
    Catl,
    Xiaomi,
}

impl Topic {
    /// Wire/database string for this topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Catl => "CATL",
            Topic::Xiaomi => "XIAOMI",
        }
    }

    /// Lenient parse: case-insensitive, unknown values fall back to CATL.
    pub fn parse_or_default(s: &str) -> Topic {
        match s.to_uppercase().as_str() {
            "XIAOMI" => Topic::Xiaomi,
            _ => Topic::Catl,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic attribution for a digest entry. `Both` is the sentinel the
/// model may use when an entry affects both monitored entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TopicTag {
    Catl,
    Xiaomi,
    Both,
}

impl TopicTag {
    /// Coerce an untrusted model-output value into a valid tag.
    pub fn normalize(v: Option<&str>) -> TopicTag {
        match v {
            Some("CATL") => TopicTag::Catl,
            Some("XIAOMI") => TopicTag::Xiaomi,
            _ => TopicTag::Both,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicTag::Catl => "CATL",
            TopicTag::Xiaomi => "XIAOMI",
            TopicTag::Both => "BOTH",
        }
    }
}

// =============================================================================
// DAY RANGE
// =============================================================================

/// Fixed day-range selector for candidate loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayRange {
    #[serde(rename = "1")]
    D1,
    #[serde(rename = "7")]
    D7,
    #[serde(rename = "30")]
    D30,
    #[serde(rename = "ALL")]
    All,
}

impl DayRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayRange::D1 => "1",
            DayRange::D7 => "7",
            DayRange::D30 => "30",
            DayRange::All => "ALL",
        }
    }

    /// Lenient parse, unknown values fall back to ALL (unbounded).
    pub fn parse_or_default(s: &str) -> DayRange {
        match s.to_uppercase().as_str() {
            "1" => DayRange::D1,
            "7" => DayRange::D7,
            "30" => DayRange::D30,
            _ => DayRange::All,
        }
    }

    /// Lower window bound for candidate loading, `None` when unbounded.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            DayRange::D1 => 1,
            DayRange::D7 => 7,
            DayRange::D30 => 30,
            DayRange::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl std::fmt::Display for DayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// NEWS ITEMS
// =============================================================================

/// Projection of a stored news item used as digest input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub topic: Topic,
    pub title: String,
    pub title_zh: Option<String>,
    pub summary: Option<String>,
    pub summary_zh: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

impl Candidate {
    /// Display title, preferring the translated one when present.
    pub fn display_title(&self) -> &str {
        match self.title_zh.as_deref().map(str::trim) {
            Some(zh) if !zh.is_empty() => zh,
            _ => &self.title,
        }
    }

    /// Best-available summary, preferring the translated one.
    pub fn best_summary(&self) -> Option<&str> {
        for s in [self.summary_zh.as_deref(), self.summary.as_deref()] {
            if let Some(s) = s.map(str::trim) {
                if !s.is_empty() {
                    return Some(s);
                }
            }
        }
        None
    }

    /// Compact cache-key fingerprint, distinct from the content hash
    /// used for storage deduplication.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}",
            self.topic,
            self.published_at.to_rfc3339(),
            self.url
        )
    }
}

/// Query parameters for the candidate loader.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub topic: Topic,
    pub days: DayRange,
    /// Already-sanitized free-text filter; empty string means no filter.
    pub query: String,
    pub limit: i64,
}

// =============================================================================
// DIGEST PAYLOAD
// =============================================================================

/// One entry in a digest list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub title: String,
    pub topic: TopicTag,
    pub reason: String,
    pub urls: Vec<String>,
}

/// The structured sentiment/impact summary produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestResult {
    pub overall: String,
    pub major_changes: Vec<DigestEntry>,
    pub bullish: Vec<DigestEntry>,
    pub bearish: Vec<DigestEntry>,
    pub watch: Vec<DigestEntry>,
}

/// A candidate selected into the final digest input, projected to the
/// fields a client needs to render which inputs informed the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedItem {
    pub i: usize,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

/// Explicit two-branch outcome of candidate selection, so callers and
/// tests can tell a ranked selection from the naive prefix fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// Model-ranked indices, importance-descending.
    Ranked(Vec<usize>),
    /// Prefix of the first `max_items` candidates.
    Fallback { reason: String },
}

/// Outcome of the residual back-translation pass over a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktranslateOutcome {
    /// `n` fragments were replaced with translations.
    Applied(usize),
    /// No fragment needed translation.
    Clean,
    /// No translator configured; digest left as produced.
    Unavailable,
    /// Translation failed; digest left as produced (fail-open).
    Failed(String),
}

// =============================================================================
// DIGEST JOBS
// =============================================================================

/// Status of a digest job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse a database status string. Unknown values map to Failed so
    /// a corrupted row can never be claimed.
    pub fn parse_or_failed(s: &str) -> JobStatus {
        match s {
            "QUEUED" => JobStatus::Queued,
            "RUNNING" => JobStatus::Running,
            "SUCCESS" => JobStatus::Success,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// The durable digest job row.
///
/// Request parameters (topic, days, query, candidate_limit, max_items)
/// are immutable after creation; execution state is mutated only by the
/// job executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestJob {
    pub id: Uuid,
    /// Capability secret for triggering execution without the shared
    /// operator secret.
    pub run_token: String,
    pub topic: Topic,
    pub days: DayRange,
    pub query: String,
    pub candidate_limit: i32,
    pub max_items: i32,
    pub status: JobStatus,
    pub attempt: i32,
    pub next_run_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub candidate_count: Option<i32>,
    pub error_message: Option<String>,
    pub picked: Option<Vec<PickedItem>>,
    pub digest: Option<DigestResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public read shape of a job, exposed to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestJobView {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub attempt: i32,
    pub next_run_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub digest: Option<DigestResult>,
    pub picked: Option<Vec<PickedItem>>,
}

impl From<&DigestJob> for DigestJobView {
    fn from(job: &DigestJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            ended_at: job.ended_at,
            attempt: job.attempt,
            next_run_at: job.next_run_at,
            error_message: job.error_message.clone(),
            digest: job.digest.clone(),
            picked: job.picked.clone(),
        }
    }
}

/// Request shape for creating a digest job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDigestJobRequest {
    pub topic: Topic,
    pub days: DayRange,
    pub query: String,
}

/// Creation response: the job id plus its run-authorization token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDigestJob {
    pub id: Uuid,
    pub run_token: String,
}

/// Patch applied when a job finishes successfully.
#[derive(Debug, Clone)]
pub struct JobSuccess {
    pub digest: DigestResult,
    pub picked: Vec<PickedItem>,
    pub candidate_count: i32,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Sanitize a free-text query for use inside LIKE patterns and as a
/// stored job parameter: wildcard characters become spaces, surrounding
/// whitespace is trimmed, and the result is truncated to 80 characters.
pub fn sanitize_query(q: &str) -> String {
    let cleaned: String = q.replace(['%', '_'], " ");
    cleaned.trim().chars().take(defaults::QUERY_MAX_CHARS).collect()
}

/// Clamp a requested digest size into the supported [5, 60] range.
pub fn clamp_max_items(n: i32) -> i32 {
    n.clamp(defaults::DIGEST_MIN_ITEMS, defaults::DIGEST_MAX_ITEMS_CAP)
}

/// Backoff delay in seconds for a retryable failure, given the attempt
/// counter *after* incrementing for that failure.
pub fn retry_delay_secs(attempt: i32) -> i64 {
    (defaults::BACKOFF_BASE_SECS + i64::from(attempt) * defaults::BACKOFF_STEP_SECS)
        .min(defaults::BACKOFF_MAX_SECS)
}

/// Next-eligible-run timestamp for a retryable failure.
pub fn compute_next_run(attempt: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(retry_delay_secs(attempt))
}

/// Serialize a value to a JSON column value, mapping errors into the
/// crate error type.
pub fn to_json_value<T: Serialize>(v: &T) -> crate::Result<JsonValue> {
    Ok(serde_json::to_value(v)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_wire_strings() {
        assert_eq!(Topic::Catl.as_str(), "CATL");
        assert_eq!(Topic::Xiaomi.as_str(), "XIAOMI");
        assert_eq!(
            serde_json::to_string(&Topic::Xiaomi).unwrap(),
            "\"XIAOMI\""
        );
        let t: Topic = serde_json::from_str("\"CATL\"").unwrap();
        assert_eq!(t, Topic::Catl);
    }

    #[test]
    fn topic_lenient_parse() {
        assert_eq!(Topic::parse_or_default("xiaomi"), Topic::Xiaomi);
        assert_eq!(Topic::parse_or_default("CATL"), Topic::Catl);
        assert_eq!(Topic::parse_or_default("tesla"), Topic::Catl);
    }

    #[test]
    fn topic_tag_normalize() {
        assert_eq!(TopicTag::normalize(Some("CATL")), TopicTag::Catl);
        assert_eq!(TopicTag::normalize(Some("XIAOMI")), TopicTag::Xiaomi);
        assert_eq!(TopicTag::normalize(Some("BOTH")), TopicTag::Both);
        assert_eq!(TopicTag::normalize(Some("garbage")), TopicTag::Both);
        assert_eq!(TopicTag::normalize(None), TopicTag::Both);
    }

    #[test]
    fn day_range_since() {
        let now = Utc::now();
        assert_eq!(DayRange::All.since(now), None);
        assert_eq!(DayRange::D7.since(now), Some(now - Duration::days(7)));
        assert_eq!(DayRange::D1.since(now), Some(now - Duration::days(1)));
    }

    #[test]
    fn day_range_wire_strings() {
        assert_eq!(serde_json::to_string(&DayRange::D30).unwrap(), "\"30\"");
        assert_eq!(serde_json::to_string(&DayRange::All).unwrap(), "\"ALL\"");
        let d: DayRange = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(d, DayRange::D7);
        assert_eq!(DayRange::parse_or_default("90"), DayRange::All);
    }

    #[test]
    fn job_status_strings() {
        for s in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse_or_failed(s.as_str()), s);
        }
        assert_eq!(JobStatus::parse_or_failed("garbage"), JobStatus::Failed);
        assert!(JobStatus::Success.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn sanitize_query_strips_wildcards() {
        assert_eq!(sanitize_query("  a%b_c  "), "a b c");
        assert_eq!(sanitize_query("%%__"), "");
    }

    #[test]
    fn sanitize_query_truncates_on_char_boundary() {
        let long = "宁".repeat(200);
        let out = sanitize_query(&long);
        assert_eq!(out.chars().count(), 80);
    }

    #[test]
    fn clamp_max_items_range() {
        assert_eq!(clamp_max_items(1), 5);
        assert_eq!(clamp_max_items(30), 30);
        assert_eq!(clamp_max_items(500), 60);
    }

    #[test]
    fn backoff_formula() {
        assert_eq!(retry_delay_secs(1), 75);
        assert_eq!(retry_delay_secs(2), 120);
        assert_eq!(retry_delay_secs(12), 570);
        // Cap at 600 seconds.
        assert_eq!(retry_delay_secs(13), 600);
        assert_eq!(retry_delay_secs(100), 600);
    }

    #[test]
    fn backoff_monotonic_until_cap() {
        let mut prev = 0;
        for attempt in 1..=13 {
            let d = retry_delay_secs(attempt);
            assert!(d > prev, "delay must strictly increase before the cap");
            prev = d;
        }
        assert_eq!(retry_delay_secs(14), retry_delay_secs(13));
    }

    #[test]
    fn candidate_display_title_prefers_translation() {
        let mut c = candidate("Original", Some("译文"));
        assert_eq!(c.display_title(), "译文");
        c.title_zh = Some("   ".to_string());
        assert_eq!(c.display_title(), "Original");
        c.title_zh = None;
        assert_eq!(c.display_title(), "Original");
    }

    #[test]
    fn candidate_best_summary_order() {
        let mut c = candidate("t", None);
        assert_eq!(c.best_summary(), None);
        c.summary = Some("english".to_string());
        assert_eq!(c.best_summary(), Some("english"));
        c.summary_zh = Some("中文".to_string());
        assert_eq!(c.best_summary(), Some("中文"));
    }

    #[test]
    fn digest_result_serde_camel_case() {
        let d = DigestResult {
            overall: "总体".to_string(),
            major_changes: vec![],
            bullish: vec![],
            bearish: vec![],
            watch: vec![],
        };
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"majorChanges\""));
        let back: DigestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn job_view_projection() {
        let job = DigestJob {
            id: Uuid::new_v4(),
            run_token: "tok".to_string(),
            topic: Topic::Catl,
            days: DayRange::D7,
            query: String::new(),
            candidate_limit: 200,
            max_items: 30,
            status: JobStatus::Failed,
            attempt: 2,
            next_run_at: None,
            started_at: None,
            ended_at: Some(Utc::now()),
            candidate_count: Some(12),
            error_message: Some("boom".to_string()),
            picked: None,
            digest: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = DigestJobView::from(&job);
        assert_eq!(view.id, job.id);
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.attempt, 2);
        assert_eq!(view.error_message.as_deref(), Some("boom"));
        // The run token is never part of the public view.
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("tok"));
        assert!(json.contains("errorMessage"));
    }

    fn candidate(title: &str, title_zh: Option<&str>) -> Candidate {
        Candidate {
            topic: Topic::Catl,
            title: title.to_string(),
            title_zh: title_zh.map(String::from),
            summary: None,
            summary_zh: None,
            source: "reuters".to_string(),
            published_at: Utc::now(),
            url: "https://example.com/a".to_string(),
        }
    }
}
