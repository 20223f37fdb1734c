//! Candidate relevance selection.
//!
//! When more candidates are loaded than fit the digest input, one chat
//! call ranks them and returns the indices of the most important ones.
//! Parsing is tolerant of model sloppiness; any failure surfaces to the
//! caller, which owns the prefix fallback.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use newswatch_core::{Candidate, ChatBackend, Error, Result};

use crate::extract::extract_json_array;

const PICK_SYSTEM: &str = "You are a financial news analyst ranking headlines by market \
impact. Reply with ONLY a JSON array of item indices (integers), most important first. \
No explanations.";

/// Selects the most relevant candidates via the chat backend.
pub struct RelevancePicker {
    backend: Arc<dyn ChatBackend>,
}

impl RelevancePicker {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Indices of the top `max_items` candidates, importance-descending.
    ///
    /// When the input already fits, returns the original order without
    /// a model call.
    pub async fn pick_top_indices(
        &self,
        candidates: &[Candidate],
        max_items: usize,
    ) -> Result<Vec<usize>> {
        if candidates.len() <= max_items {
            return Ok((0..candidates.len()).collect());
        }

        let listing: Vec<JsonValue> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                serde_json::json!({
                    "i": i,
                    "topic": c.topic,
                    "title": c.display_title(),
                    "source": c.source,
                    "date": c.published_at.format("%Y-%m-%d").to_string(),
                    "url": c.url,
                })
            })
            .collect();
        let prompt = format!(
            "From the following {} news items, select the {} most market-relevant. \
             Items:\n{}",
            candidates.len(),
            max_items,
            serde_json::to_string(&listing)?
        );

        let response = self.backend.chat(PICK_SYSTEM, &prompt).await?;
        let indices = parse_indices(&response, candidates.len(), max_items)?;

        debug!(
            subsystem = "inference",
            component = "picker",
            op = "pick_top_indices",
            candidate_count = candidates.len(),
            picked_count = indices.len(),
            "Ranked candidates"
        );
        Ok(indices)
    }
}

/// Parse a ranked index list from model output: tolerant array
/// extraction, out-of-range entries dropped, first occurrence wins,
/// truncated to `max_items`.
fn parse_indices(response: &str, len: usize, max_items: usize) -> Result<Vec<usize>> {
    let Some(array) = extract_json_array(response) else {
        return Err(Error::Inference(
            "no JSON array in picker response".to_string(),
        ));
    };
    let values: Vec<JsonValue> = serde_json::from_str(array)
        .map_err(|e| Error::Inference(format!("bad picker array: {e}")))?;

    let mut seen = vec![false; len];
    let mut indices = Vec::new();
    for v in values {
        let Some(i) = as_index(&v) else { continue };
        if i < len && !seen[i] {
            seen[i] = true;
            indices.push(i);
            if indices.len() == max_items {
                break;
            }
        }
    }

    if indices.is_empty() {
        return Err(Error::Inference("picker returned no usable indices".to_string()));
    }
    Ok(indices)
}

/// Accept integers, floats with integral value, and numeric strings.
fn as_index(v: &JsonValue) -> Option<usize> {
    match v {
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u as usize)
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as usize)
            }
        }
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
