//! LLM Provider Abstraction Layer
//!
//! The classifier, the receipt reader and the briefing all talk to an
//! OpenAI-compatible chat completion endpoint. The `LLMProvider` trait is the
//! seam between those callers and the HTTP client, so tests can swap in a
//! canned provider.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod openai;

pub use openai::OpenAICompatibleProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("{0} not configured")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::NotConfigured(key) => EngineError::MissingSecret(key),
            LLMError::NetworkError(msg) => EngineError::Network(msg),
            other => EngineError::LLMProvider(other.to_string()),
        }
    }
}

/// Message in a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,

    pub content: String,

    /// Image attached to a user message, as an `https:` or `data:` URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            image_url: None,
        }
    }

    /// A user message carrying text plus one image
    pub fn user_with_image(content: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image_url: Some(image_url.into()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Per-call sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f64,

    /// Overrides the provider's default model (used for vision calls)
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature,
            model: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "xai", "openai")
    fn name(&self) -> &str;

    /// Run one chat completion and return the assistant's text
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String>;

    /// True when the provider has what it needs (an API key) to be called
    fn is_configured(&self) -> bool {
        true
    }
}

/// Pull the first JSON object out of a model answer.
///
/// Handles, in order:
/// 1. Raw JSON (the entire answer is an object)
/// 2. A markdown code fence, with or without trailing prose
/// 3. An object embedded in prose, found by brace matching
pub fn extract_json_object(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Some(v) = parse_object(trimmed) {
        return Some(v);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(v) = parse_object(inner.trim()) {
            return Some(v);
        }
    }

    let mut search_from = 0;
    while let Some(rel) = trimmed[search_from..].find('{') {
        let pos = search_from + rel;
        if let Some(candidate) = extract_balanced_json(&trimmed[pos..]) {
            if let Some(v) = parse_object(candidate) {
                return Some(v);
            }
        }
        search_from = pos + 1;
    }

    None
}

fn parse_object(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s)
        .ok()
        .filter(Value::is_object)
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays canned answers and records what it was sent
    pub struct ScriptedProvider {
        answers: Mutex<VecDeque<Result<String>>>,
        pub calls: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
    }

    impl ScriptedProvider {
        pub fn new(answers: Vec<Result<String>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn answering(answer: &str) -> Self {
            Self::new(vec![Ok(answer.to_string())])
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[Message],
            options: &CompletionOptions,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::InvalidRequest("no scripted answer".into())))
        }
    }
}
