//! Core LLM client trait, error type, and a scripted mock backend

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Default model used when a request does not override it
    fn model(&self) -> &str;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

/// One scripted reply for [`MockLlmClient`]
#[derive(Debug)]
pub enum MockReply {
    Text(String),
    Error(LlmError),
    /// Text delivered only after sleeping for the given duration
    Delayed(String, Duration),
}

/// Scripted backend for tests.
///
/// Replies are consumed in order; once the script is exhausted the last
/// text reply is repeated. Every request is recorded.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<Option<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockLlmClient {
    /// Create a mock that replies with each text in order
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::scripted(replies.into_iter().map(|r| MockReply::Text(r.into())))
    }

    /// Create a mock from an explicit script of replies and errors
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn next_reply(&self) -> Result<(String, Option<Duration>), LlmError> {
        let next = self
            .replies
            .lock()
            .map_err(|_| LlmError::InvalidResponse("mock script poisoned".to_string()))?
            .pop_front();

        let mut fallback = self
            .fallback
            .lock()
            .map_err(|_| LlmError::InvalidResponse("mock script poisoned".to_string()))?;

        match next {
            Some(MockReply::Text(text)) => {
                *fallback = Some(text.clone());
                Ok((text, None))
            }
            Some(MockReply::Delayed(text, delay)) => Ok((text, Some(delay))),
            Some(MockReply::Error(e)) => Err(e),
            None => fallback
                .clone()
                .map(|text| (text, None))
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (text, delay) = self.next_reply()?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(CompletionResponse::text(text))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
