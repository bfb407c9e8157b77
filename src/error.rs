//! Error types for Vetloop
//!
//! Centralized error handling using thiserror. Each component owns a narrow
//! error enum; `VetloopError` is the umbrella the binary and callers that
//! don't care about the distinction can bubble up with `?`.

use thiserror::Error;

use crate::artifact::ParseError;
use crate::llm::LlmError;
use crate::runner::{CoordinatorError, GenerationError};
use crate::validation::CheckerError;

/// All error types that can occur in Vetloop
#[derive(Debug, Error)]
pub enum VetloopError {
    /// Raw model output had no usable structured answer
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Model backend failure
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Judge call could not produce a verdict
    #[error("Checker error: {0}")]
    Checker(#[from] CheckerError),

    /// Generation call could not produce a candidate
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Turn could not be driven to a terminal state
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Vetloop operations
pub type Result<T> = std::result::Result<T, VetloopError>;
