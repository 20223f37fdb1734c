//! Content hashing and normalization helpers.
//!
//! Stored news items are deduplicated by a content hash computed over
//! the canonicalized URL and normalized title, so the same story fetched
//! via different tracking links collapses to one row.

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters stripped during URL canonicalization. These carry
/// tracking state only and vary per referrer for the same article.
const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_"];
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "igshid"];

/// Hex-encoded SHA-256 of the input.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalize a URL for deduplication: drop tracking query parameters
/// and the fragment, keep everything else as-is. Unparseable input is
/// returned trimmed but otherwise unchanged.
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_fragment(None);
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_lowercase();
    TRACKING_PARAM_PREFIXES.iter().any(|p| lower.starts_with(p))
        || TRACKING_PARAMS.contains(&lower.as_str())
}

/// Normalize a title for hashing: lowercase, collapse whitespace runs
/// to single spaces, trim.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Content hash of a news item, keyed on canonical URL + normalized
/// title.
pub fn content_hash(url: &str, title: &str) -> String {
    sha256_hex(&format!("{}|{}", canonicalize_url(url), normalize_title(title)))
}
