//! LLM Client Layer - chat-style model backend abstraction
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient implementation
//! - MockLlmClient for tests

pub mod anthropic;
pub mod client;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient, MockReply};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
