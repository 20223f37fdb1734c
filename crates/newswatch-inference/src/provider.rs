//! Provider selection from environment configuration.
//!
//! Two providers are supported, both behind the same OpenAI-compatible
//! chat protocol. A missing API key is not an error: it means the
//! corresponding capability is unconfigured and callers degrade
//! gracefully (digest jobs finish with a fixed disabled message,
//! translation is skipped).

use std::sync::Arc;

use tracing::debug;

use newswatch_core::{defaults, ChatBackend, Result};

use crate::chat::{ChatConfig, OpenAiChatBackend};

/// Supported chat providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Zhipu,
    Openai,
}

impl ProviderKind {
    /// Parse a provider name, case-insensitive. Unknown values fall
    /// back to Zhipu, the primary provider.
    pub fn parse_or_default(s: &str) -> ProviderKind {
        match s.to_lowercase().as_str() {
            "openai" => ProviderKind::Openai,
            _ => ProviderKind::Zhipu,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Zhipu => "zhipu",
            ProviderKind::Openai => "openai",
        }
    }
}

/// Resolved provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    /// API key for the selected provider, `None` when unconfigured.
    pub api_key: Option<String>,
    pub digest_model: String,
    pub translate_model: String,
    /// `AI_DIGEST` kill switch.
    pub digest_enabled: bool,
    /// `TRANSLATE_TO_ZH` toggle for the translation pass.
    pub translate_enabled: bool,
}

impl ProviderConfig {
    /// Load provider configuration from environment variables.
    ///
    /// - `AI_PROVIDER` — "zhipu" (default) or "openai"
    /// - `ZHIPU_API_KEY` / `GLM` — Zhipu key (either name)
    /// - `OPENAI_API_KEY` — OpenAI key
    /// - `ZHIPU_DIGEST_MODEL` / `OPENAI_DIGEST_MODEL` — digest model override
    /// - `ZHIPU_MODEL` / `OPENAI_TRANSLATE_MODEL` — translation model override
    /// - `AI_DIGEST` — set to `0` or `false` to disable digest generation
    /// - `TRANSLATE_TO_ZH` — set to `0` or `false` to disable translation
    pub fn from_env() -> Self {
        let provider = ProviderKind::parse_or_default(
            &std::env::var("AI_PROVIDER").unwrap_or_default(),
        );

        let (api_key, digest_model, translate_model) = match provider {
            ProviderKind::Zhipu => (
                std::env::var("ZHIPU_API_KEY")
                    .or_else(|_| std::env::var("GLM"))
                    .ok(),
                std::env::var("ZHIPU_DIGEST_MODEL")
                    .unwrap_or_else(|_| defaults::ZHIPU_DIGEST_MODEL.to_string()),
                std::env::var("ZHIPU_MODEL")
                    .unwrap_or_else(|_| defaults::ZHIPU_TRANSLATE_MODEL.to_string()),
            ),
            ProviderKind::Openai => (
                std::env::var("OPENAI_API_KEY").ok(),
                std::env::var("OPENAI_DIGEST_MODEL")
                    .unwrap_or_else(|_| defaults::OPENAI_DIGEST_MODEL.to_string()),
                std::env::var("OPENAI_TRANSLATE_MODEL")
                    .unwrap_or_else(|_| defaults::OPENAI_TRANSLATE_MODEL.to_string()),
            ),
        };

        let config = Self {
            provider,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            digest_model,
            translate_model,
            digest_enabled: env_flag("AI_DIGEST", true),
            translate_enabled: env_flag("TRANSLATE_TO_ZH", true),
        };

        debug!(
            subsystem = "inference",
            component = "provider",
            provider = config.provider.as_str(),
            configured = config.api_key.is_some(),
            digest_enabled = config.digest_enabled,
            "Resolved provider configuration"
        );
        config
    }

    /// Whether a provider is configured with a usable key.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Chat backend for digest and picker calls, `None` when
    /// unconfigured.
    pub fn digest_backend(&self) -> Result<Option<Arc<dyn ChatBackend>>> {
        self.backend(&self.digest_model)
    }

    /// Chat backend for translation calls, `None` when unconfigured.
    pub fn translate_backend(&self) -> Result<Option<Arc<dyn ChatBackend>>> {
        if !self.translate_enabled {
            return Ok(None);
        }
        self.backend(&self.translate_model)
    }

    fn backend(&self, model: &str) -> Result<Option<Arc<dyn ChatBackend>>> {
        let Some(ref key) = self.api_key else {
            return Ok(None);
        };
        let config = match self.provider {
            ProviderKind::Zhipu => ChatConfig::zhipu(key.clone(), model.to_string()),
            ProviderKind::Openai => ChatConfig::openai(key.clone(), model.to_string()),
        };
        Ok(Some(Arc::new(OpenAiChatBackend::new(config)?)))
    }
}

/// Boolean environment flag: `0` and `false` (any case) are false,
/// `1` and `true` are true, anything else takes the default.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => parse_flag(&v, default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "0" | "false" => false,
        "1" | "true" => true,
        _ => default,
    }
}
