//! Batch translation into Chinese via the chat backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use newswatch_core::{
    defaults, ChatBackend, Error, Result, Translatable, Translation, Translator,
};

use crate::extract::extract_json_array;

const TRANSLATE_SYSTEM: &str = "You are a professional news translator. Translate each \
item into natural simplified Chinese. Reply with ONLY a JSON array of strings, one \
translation per input item, in the same order. Use null for items you cannot translate. \
No explanations.";

/// Whether a text fragment still needs translation: it has a run of
/// latin letters and latin letters outnumber CJK characters. Short
/// brand acronyms inside Chinese sentences stay untouched.
pub fn needs_translation(text: &str) -> bool {
    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let cjk = text.chars().filter(|c| is_cjk(*c)).count();
    let has_run = text
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|w| w.len() >= 4);
    has_run && latin > cjk
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}')
}

/// Translator backed by a chat completion model.
///
/// Constructed over an optional backend: with `None` every fragment
/// comes back untranslated, which callers treat as "translation
/// unavailable" rather than a failure.
pub struct LlmTranslator {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl LlmTranslator {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>) -> Self {
        Self { backend }
    }

    /// Whether a backend is available.
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    async fn translate_chunk(
        &self,
        backend: &Arc<dyn ChatBackend>,
        chunk: &[Translatable],
    ) -> Result<Vec<Translation>> {
        let numbered: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.text))
            .collect();
        let prompt = numbered.join("\n");

        let response = backend.chat(TRANSLATE_SYSTEM, &prompt).await?;

        let Some(array) = extract_json_array(&response) else {
            return Err(Error::Translation(
                "no JSON array in translation response".to_string(),
            ));
        };
        let parsed: Vec<Option<String>> = serde_json::from_str(array)
            .map_err(|e| Error::Translation(format!("bad translation array: {e}")))?;

        if parsed.len() != chunk.len() {
            // A miscounted reply is unusable; drop the whole chunk
            // rather than misalign translations with their sources.
            warn!(
                subsystem = "inference",
                component = "translator",
                expected = chunk.len(),
                got = parsed.len(),
                "Translation count mismatch, discarding chunk"
            );
            return Ok(vec![Translation { text: None }; chunk.len()]);
        }

        Ok(parsed
            .into_iter()
            .map(|text| Translation {
                text: text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            })
            .collect())
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate_batch(&self, items: &[Translatable]) -> Result<Vec<Translation>> {
        if items.is_empty() {
            return Ok(vec![]);
        }
        let Some(ref backend) = self.backend else {
            return Ok(vec![Translation { text: None }; items.len()]);
        };

        let mut out = Vec::with_capacity(items.len());
        for chunk in items.chunks(defaults::TRANSLATE_BATCH_SIZE) {
            out.extend(self.translate_chunk(backend, chunk).await?);
        }

        debug!(
            subsystem = "inference",
            component = "translator",
            op = "translate_batch",
            input_count = items.len(),
            translated = out.iter().filter(|t| t.text.is_some()).count(),
            "Batch translation complete"
        );
        Ok(out)
    }
}
