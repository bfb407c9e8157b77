//! ActionExecutor - turns a candidate artifact into an `ExecutionOutcome`.
//!
//! Parse failures and sentinel matches are business outcomes here, never
//! errors: both come back as `success == false` with the raw text embedded
//! in `content` so the next round can see what went wrong.

use serde::{Deserialize, Serialize};

use crate::artifact::{self, DEFAULT_SENTINEL, ParseError};

/// Why an outcome was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// No structured answer could be extracted.
    Parse(String),
    /// The summary was the sentinel phrase.
    Sentinel,
}

/// Result of executing one candidate artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,

    /// Accepted payload, or a diagnostic that embeds the raw output.
    pub content: String,

    /// Set exactly when `success` is false.
    pub rejection: Option<RejectionKind>,
}

impl ExecutionOutcome {
    /// Accepted payload.
    pub fn accepted(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            rejection: None,
        }
    }

    /// No structured answer in `raw`.
    pub fn parse_failure(raw: &str, error: &ParseError) -> Self {
        Self {
            success: false,
            content: format!("structured answer not found, raw={raw}"),
            rejection: Some(RejectionKind::Parse(error.to_string())),
        }
    }

    /// The model answered with the sentinel phrase.
    pub fn sentinel(raw: &str) -> Self {
        Self {
            success: false,
            content: format!("content not related to the user question, raw={raw}"),
            rejection: Some(RejectionKind::Sentinel),
        }
    }

    /// Whether this outcome failed structurally and needs no second opinion.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self.rejection, Some(RejectionKind::Parse(_)))
    }
}

/// Executes candidate artifacts against a configured sentinel phrase.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    sentinel: String,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

impl ActionExecutor {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Execute one round's raw model output.
    pub fn execute(&self, raw: &str) -> ExecutionOutcome {
        let result = match artifact::parse(raw) {
            Ok(result) => result,
            Err(e) => {
                log::info!("Structured answer not found: {}", e);
                return ExecutionOutcome::parse_failure(raw, &e);
            }
        };

        if artifact::matches(&result.summary, &self.sentinel) {
            log::info!("Model answered with the sentinel phrase");
            return ExecutionOutcome::sentinel(raw);
        }

        log::debug!("Accepted summary ({} chars)", result.summary.len());
        ExecutionOutcome::accepted(result.summary)
    }
}
