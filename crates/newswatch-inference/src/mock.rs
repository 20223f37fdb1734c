//! Mock chat backend for deterministic testing.
//!
//! Responses are scripted in order; each `chat` call pops the next one.
//! When the script runs out, the backend repeats the last scripted
//! response. Call inputs are logged for assertion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use newswatch_core::{ChatBackend, Error, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
enum Scripted {
    Ok(String),
    Err(String),
}

/// One recorded chat call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

/// Scripted chat backend for tests.
#[derive(Clone)]
pub struct MockChatBackend {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatBackend {
    /// Create an empty mock. A call with no scripted response fails.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a successful response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Ok(response.into()));
        self
    }

    /// Script a failing response with the given error message.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Err(message.into()));
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of chat calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Scripted::Ok(s)) => Ok(s),
            Some(Scripted::Err(msg)) => Err(Error::Inference(msg)),
            None => Err(Error::Inference("mock script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
