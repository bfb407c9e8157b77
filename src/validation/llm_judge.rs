//! Second-opinion correctness check.
//!
//! A separate judge-model call compares the user's goal with the content the
//! executor produced. The judge never generates new content; its free-text
//! reply is reduced to a `CorrectnessVerdict` by the `ReplyGrammar`.
//!
//! A judged "False" is a verdict. Failing to get a reply at all (transport
//! error, timeout, empty body) is a `CheckerError`, so callers can tell
//! "the judge said no" apart from "could not ask the judge".

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::verdict::{CorrectnessVerdict, ReplyGrammar};
use crate::config::JudgeConfig;
use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Errors from correctness check operations.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("judge model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("judge timed out after {0:?}")]
    Timeout(Duration),

    #[error("judge returned an empty reply")]
    EmptyReply,
}

/// Judge-model correctness checker.
pub struct CorrectnessChecker {
    /// LLM client to use for evaluation.
    client: Arc<dyn LlmClient>,

    /// Rubric override; `None` renders the default rubric from the grammar.
    system_prompt: Option<String>,

    /// How judge replies are read.
    grammar: ReplyGrammar,

    /// Timeout for judge calls.
    timeout: Duration,

    /// Max tokens for judge response.
    max_tokens: u32,

    /// Judge model override.
    model: Option<String>,
}

impl CorrectnessChecker {
    /// Create a new checker with the given LLM client.
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: None,
            grammar: ReplyGrammar::default(),
            timeout: Duration::from_secs(60),
            max_tokens: 500,
            model: None,
        }
    }

    /// Create a checker from the `judge` config section.
    pub fn from_config(config: &JudgeConfig, client: Arc<dyn LlmClient>) -> Self {
        let grammar = ReplyGrammar {
            delimiter: config.delimiter,
            stop_marker: config.stop_marker.clone(),
            accept_tokens: config.accept_tokens.clone(),
        };

        let checker = Self::new(client)
            .with_grammar(grammar)
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_max_tokens(config.max_tokens)
            .with_model(config.model.clone());

        match &config.system_prompt {
            Some(rubric) => checker.with_system_prompt(rubric.clone()),
            None => checker,
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the reply grammar.
    pub fn with_grammar(mut self, grammar: ReplyGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Judge with a model other than the client's default.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// The rubric sent as the judge's system instruction.
    pub fn system_prompt(&self) -> String {
        self.system_prompt
            .clone()
            .unwrap_or_else(|| default_rubric(&self.grammar))
    }

    /// Build the judge request for one check.
    pub fn build_request(&self, goal: &str, produced_content: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(self.system_prompt())
            .with_human_message(format!(
                "Check the user's question and the generated code, and decide whether the generated code is correct.\n\
                 User input: {goal}\n\
                 Generated result: {produced_content}"
            ))
            .with_max_tokens(self.max_tokens)
            .with_model(self.model.clone());

        if !self.grammar.stop_marker.is_empty() {
            request = request.with_stop_sequence(self.grammar.stop_marker.clone());
        }

        request
    }

    /// Ask the judge once and reduce its reply to a verdict.
    pub async fn check(&self, goal: &str, produced_content: &str) -> Result<CorrectnessVerdict, CheckerError> {
        let start = Instant::now();
        let request = self.build_request(goal, produced_content);

        let response = tokio::time::timeout(self.timeout, self.client.complete(request))
            .await
            .map_err(|_| CheckerError::Timeout(self.timeout))??;

        let reply = response.content.trim();
        if reply.is_empty() {
            return Err(CheckerError::EmptyReply);
        }

        let verdict = CorrectnessVerdict::from(self.grammar.classify(reply));
        log::info!(
            "Judge verdict: accepted={} in {:?} (reply: {})",
            verdict.accepted,
            start.elapsed(),
            truncate_for_log(reply, 100)
        );

        Ok(verdict)
    }
}

/// The judging rubric, rendered with the grammar's tokens.
fn default_rubric(grammar: &ReplyGrammar) -> String {
    format!(
        "You are a code expert who checks whether the code a bot generated for a question is correct.\n\
         Your answer must follow these rules:\n\
         \x20   Rule 1: If you think the code has no problem, respond only with True.\n\
         \x20   Rule 2: If you think the generated code has a problem, respond with False and a description of the \
         problem, including the problem itself and where it is in the code, separated by {}, and end with {}.",
        grammar.delimiter, grammar.stop_marker
    )
}

/// Truncate text for log lines.
fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
