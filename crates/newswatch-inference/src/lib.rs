//! LLM layer for newswatch.
//!
//! An OpenAI-compatible chat backend (covering both OpenAI and Zhipu),
//! provider selection from the environment, tolerant JSON extraction,
//! and the three model-driven components: the relevance picker, the
//! digest builder, and the batch translator.

pub mod chat;
pub mod digest;
pub mod extract;
pub mod picker;
pub mod provider;
pub mod translate;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use chat::{ChatConfig, OpenAiChatBackend};
pub use digest::{DigestBuilder, DigestRequest};
pub use extract::{extract_json_array, extract_json_object};
pub use picker::RelevancePicker;
pub use provider::{ProviderConfig, ProviderKind};
pub use translate::{needs_translation, LlmTranslator};
