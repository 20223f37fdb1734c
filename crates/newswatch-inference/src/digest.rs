//! Digest generation: one chat call turning picked candidates into a
//! structured sentiment summary, with a short-lived in-process cache
//! and a residual back-translation pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use newswatch_core::{
    defaults, BacktranslateOutcome, Candidate, ChatBackend, DayRange, DigestEntry,
    DigestResult, Error, Result, Topic, TopicTag, Translatable, Translation, Translator,
};

use crate::extract::extract_json_object;
use crate::translate::needs_translation;

const DIGEST_SYSTEM: &str = "You are a financial news analyst. Summarize the given news \
items into a strict JSON object with exactly these keys: \"overall\" (one-paragraph \
sentiment summary in Chinese), \"majorChanges\", \"bullish\", \"bearish\", \"watch\" \
(each an array of {\"title\", \"topic\", \"reason\", \"urls\"}; topic is CATL, XIAOMI \
or BOTH; reason is one sentence in Chinese; urls lists up to 3 source links). Reply \
with ONLY the JSON object.";

// =============================================================================
// REQUEST
// =============================================================================

/// Input to digest generation.
#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub topic: Topic,
    pub days: DayRange,
    pub query: String,
    pub items: Vec<Candidate>,
    pub max_items: i32,
}

// =============================================================================
// CACHE
// =============================================================================

struct CacheEntry {
    inserted_at: Instant,
    digest: DigestResult,
}

/// TTL cache for finished digests, keyed on the request identity.
///
/// Expired entries are pruned on insert, which bounds the map to the
/// distinct request shapes seen within one TTL window.
struct DigestCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl DigestCache {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    fn get(&self, key: &str, now: Instant) -> Option<DigestResult> {
        self.entries
            .get(key)
            .filter(|e| now.duration_since(e.inserted_at) < self.ttl)
            .map(|e| e.digest.clone())
    }

    fn insert(&mut self, key: String, digest: DigestResult, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.inserted_at) < ttl);
        self.entries.insert(
            key,
            CacheEntry {
                inserted_at: now,
                digest,
            },
        );
    }
}

/// Cache key over the request identity: topic, query, day range, the
/// first 40 item fingerprints, and the provider name.
fn cache_key(request: &DigestRequest, items: &[Candidate], provider: &str) -> String {
    let prints: Vec<String> = items
        .iter()
        .take(defaults::DIGEST_CACHE_KEY_ITEMS)
        .map(Candidate::fingerprint)
        .collect();
    format!(
        "{}|{}|{}|{}|{}",
        request.topic,
        request.query,
        request.days,
        prints.join(","),
        provider
    )
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builds digests over the chat backend.
pub struct DigestBuilder {
    backend: Option<Arc<dyn ChatBackend>>,
    translator: Arc<dyn Translator>,
    enabled: bool,
    cache: Mutex<DigestCache>,
}

impl DigestBuilder {
    pub fn new(
        backend: Option<Arc<dyn ChatBackend>>,
        translator: Arc<dyn Translator>,
        enabled: bool,
    ) -> Self {
        Self {
            backend,
            translator,
            enabled,
            cache: Mutex::new(DigestCache::new(Duration::from_secs(
                defaults::DIGEST_CACHE_TTL_SECS,
            ))),
        }
    }

    /// Generate a digest for the request.
    ///
    /// Returns `Ok(None)` when digest generation is disabled or no
    /// provider is configured; this is not an error.
    pub async fn build(&self, request: &DigestRequest) -> Result<Option<DigestResult>> {
        self.build_at(request, Instant::now()).await
    }

    // Clock injected for deterministic TTL tests.
    async fn build_at(
        &self,
        request: &DigestRequest,
        now: Instant,
    ) -> Result<Option<DigestResult>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(ref backend) = self.backend else {
            return Ok(None);
        };

        let max_items =
            newswatch_core::clamp_max_items(request.max_items) as usize;
        let items = &request.items[..request.items.len().min(max_items)];

        let key = cache_key(request, items, backend.provider_name());
        if let Some(cached) = self.cache.lock().await.get(&key, now) {
            debug!(
                subsystem = "inference",
                component = "digest_builder",
                op = "build",
                topic = %request.topic,
                "Digest cache hit"
            );
            return Ok(Some(cached));
        }

        let prompt = build_prompt(request, items)?;
        let response = backend.chat(DIGEST_SYSTEM, &prompt).await?;
        let mut digest = parse_digest(&response)?;

        let outcome = self.backtranslate(&mut digest).await;
        if let BacktranslateOutcome::Failed(ref reason) = outcome {
            warn!(
                subsystem = "inference",
                component = "digest_builder",
                error = %reason,
                "Back-translation failed, keeping original text"
            );
        }

        info!(
            subsystem = "inference",
            component = "digest_builder",
            op = "build",
            topic = %request.topic,
            model = backend.model_name(),
            picked_count = items.len(),
            "Digest generated"
        );

        self.cache.lock().await.insert(key, digest.clone(), now);
        Ok(Some(digest))
    }

    /// Replace untranslated fragments in place. Any failure keeps the
    /// digest as produced.
    ///
    /// Collection and application walk the digest in the same fixed
    /// order, so translations line up with their source fragments.
    async fn backtranslate(&self, digest: &mut DigestResult) -> BacktranslateOutcome {
        let mut batch: Vec<Translatable> = Vec::new();
        walk_fragments(digest, |text| {
            batch.push(Translatable { text: text.clone() });
        });
        if batch.is_empty() {
            return BacktranslateOutcome::Clean;
        }

        let translations = match self.translator.translate_batch(&batch).await {
            Ok(t) => t,
            Err(e) => return BacktranslateOutcome::Failed(e.to_string()),
        };
        if translations.len() != batch.len() {
            return BacktranslateOutcome::Failed("translation count mismatch".to_string());
        }
        if translations.iter().all(|t| t.text.is_none()) {
            return BacktranslateOutcome::Unavailable;
        }

        let mut applied = 0;
        let mut next = translations.into_iter();
        walk_fragments(digest, |text| {
            if let Some(Translation { text: Some(translated) }) = next.next() {
                *text = translated;
                applied += 1;
            }
        });
        BacktranslateOutcome::Applied(applied)
    }
}

/// Visit every digest fragment that still needs translation, in a
/// stable order: overall first, then each list's titles and reasons.
fn walk_fragments(digest: &mut DigestResult, mut f: impl FnMut(&mut String)) {
    if needs_translation(&digest.overall) {
        f(&mut digest.overall);
    }
    for list in [
        &mut digest.major_changes,
        &mut digest.bullish,
        &mut digest.bearish,
        &mut digest.watch,
    ] {
        for entry in list.iter_mut() {
            if needs_translation(&entry.title) {
                f(&mut entry.title);
            }
            if needs_translation(&entry.reason) {
                f(&mut entry.reason);
            }
        }
    }
}

fn build_prompt(request: &DigestRequest, items: &[Candidate]) -> Result<String> {
    let listing: Vec<JsonValue> = items
        .iter()
        .enumerate()
        .map(|(i, c)| {
            serde_json::json!({
                "i": i,
                "topic": c.topic,
                "title": c.display_title(),
                "summary": c.best_summary(),
                "source": c.source,
                "date": c.published_at.format("%Y-%m-%d").to_string(),
                "url": c.url,
            })
        })
        .collect();
    Ok(format!(
        "Topic: {}. Range: last {} days. Filter: {}.\nNews items:\n{}",
        request.topic,
        request.days,
        if request.query.is_empty() { "(none)" } else { &request.query },
        serde_json::to_string(&listing)?
    ))
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Parse and normalize model output into a valid digest.
fn parse_digest(response: &str) -> Result<DigestResult> {
    let Some(object) = extract_json_object(response) else {
        return Err(Error::Inference(
            "no JSON object in digest response".to_string(),
        ));
    };
    let raw: JsonValue = serde_json::from_str(object)
        .map_err(|e| Error::Inference(format!("bad digest object: {e}")))?;

    let overall = raw
        .get("overall")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if overall.is_empty() {
        return Err(Error::Inference("digest missing overall summary".to_string()));
    }

    Ok(DigestResult {
        overall,
        major_changes: normalize_entries(&raw, &["majorChanges", "major_changes"],
            defaults::DIGEST_MAJOR_CHANGES_CAP),
        bullish: normalize_entries(&raw, &["bullish"], defaults::DIGEST_BULLISH_CAP),
        bearish: normalize_entries(&raw, &["bearish"], defaults::DIGEST_BEARISH_CAP),
        watch: normalize_entries(&raw, &["watch"], defaults::DIGEST_WATCH_CAP),
    })
}

fn normalize_entries(raw: &JsonValue, keys: &[&str], cap: usize) -> Vec<DigestEntry> {
    let array = keys
        .iter()
        .find_map(|k| raw.get(k))
        .and_then(JsonValue::as_array);
    let Some(array) = array else {
        return vec![];
    };

    array
        .iter()
        .filter_map(normalize_entry)
        .take(cap)
        .collect()
}

/// Entries missing a title or reason are dropped; everything else is
/// coerced into shape.
fn normalize_entry(v: &JsonValue) -> Option<DigestEntry> {
    let title = v.get("title")?.as_str()?.trim();
    let reason = v.get("reason")?.as_str()?.trim();
    if title.is_empty() || reason.is_empty() {
        return None;
    }

    let mut urls: Vec<String> = v
        .get("urls")
        .and_then(JsonValue::as_array)
        .map(|a| {
            a.iter()
                .filter_map(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    urls.dedup();
    urls.truncate(defaults::DIGEST_ENTRY_URLS_CAP);

    Some(DigestEntry {
        title: title.to_string(),
        topic: TopicTag::normalize(v.get("topic").and_then(JsonValue::as_str)),
        reason: reason.to_string(),
        urls,
    })
}
