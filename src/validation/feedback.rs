//! Structured feedback for rejected rounds.
//!
//! When a round is rejected we need actionable feedback that the generation
//! model can use in the next round, and a round-numbered record the caller
//! can show when the turn is abandoned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of failure for better organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// No structured answer in the model output
    Parse,
    /// Model answered with the sentinel phrase
    Sentinel,
    /// Judge model rejected the answer
    Judge,
    /// Judge model could not be asked
    Checker,
    /// Generation model could not be asked
    Generation,
}

impl FailureCategory {
    /// Get a human-readable name for the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Parse => "parse",
            FailureCategory::Sentinel => "sentinel",
            FailureCategory::Judge => "judge",
            FailureCategory::Checker => "checker",
            FailureCategory::Generation => "generation",
        }
    }

    /// Whether this failure came from an errored model call rather than a judgment.
    pub fn is_error(&self) -> bool {
        matches!(self, FailureCategory::Checker | FailureCategory::Generation)
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feedback from a single rejected round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundFeedback {
    /// Which round this feedback is from (1-indexed).
    pub round: u32,

    /// What rejected the round.
    pub category: FailureCategory,

    /// Human-readable failure message, fed into the next generation prompt.
    pub message: String,

    /// When the round was rejected.
    pub timestamp: DateTime<Utc>,
}

impl RoundFeedback {
    /// Create feedback for a rejected round.
    pub fn new(round: u32, category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            round,
            category,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Formatter for incorporating feedback into prompts.
pub struct FeedbackFormatter {
    /// Maximum number of lines to include from a failure message.
    pub max_message_lines: usize,
}

impl Default for FeedbackFormatter {
    fn default() -> Self {
        Self { max_message_lines: 40 }
    }
}

impl FeedbackFormatter {
    /// Create a new formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum message lines.
    pub fn with_max_message_lines(mut self, max: usize) -> Self {
        self.max_message_lines = max;
        self
    }

    /// Format the previous round's feedback for the next generation prompt.
    pub fn format_for_prompt(&self, feedback: &RoundFeedback) -> String {
        let mut output = String::new();

        output.push_str("## Previous Round Feedback\n\n");
        output.push_str(&format!(
            "### Round {} rejected ({})\n\n",
            feedback.round, feedback.category
        ));
        output.push_str(&truncate_lines(&feedback.message, self.max_message_lines));
        output.push_str("\n\n**Address the feedback above and answer again.**\n");

        output
    }

    /// Format a list of rejected rounds as a round-numbered explanation.
    pub fn format_history(&self, history: &[RoundFeedback], max_rounds: u32) -> String {
        history
            .iter()
            .map(|fb| {
                format!(
                    "- Round {}/{} [{}]: {}",
                    fb.round,
                    max_rounds,
                    fb.category,
                    truncate_lines(&fb.message, self.max_message_lines).replace('\n', " ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Truncate text to a maximum number of lines.
fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().take(max_lines).collect();
    let truncated = lines.len() < text.lines().count();
    let mut result = lines.join("\n");
    if truncated {
        result.push_str("\n... (truncated)");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_category_as_str() {
        assert_eq!(FailureCategory::Parse.as_str(), "parse");
        assert_eq!(FailureCategory::Sentinel.as_str(), "sentinel");
        assert_eq!(FailureCategory::Judge.as_str(), "judge");
        assert_eq!(FailureCategory::Checker.to_string(), "checker");
    }

    #[test]
    fn test_failure_category_is_error() {
        assert!(FailureCategory::Checker.is_error());
        assert!(FailureCategory::Generation.is_error());
        assert!(!FailureCategory::Judge.is_error());
        assert!(!FailureCategory::Parse.is_error());
    }

    #[test]
    fn test_round_feedback_new() {
        let feedback = RoundFeedback::new(2, FailureCategory::Judge, "missing import");
        assert_eq!(feedback.round, 2);
        assert_eq!(feedback.category, FailureCategory::Judge);
        assert_eq!(feedback.message, "missing import");
    }

    #[test]
    fn test_format_for_prompt() {
        let formatter = FeedbackFormatter::new();
        let feedback = RoundFeedback::new(1, FailureCategory::Judge, "missing import statement");

        let output = formatter.format_for_prompt(&feedback);

        assert!(output.contains("Previous Round Feedback"));
        assert!(output.contains("Round 1 rejected (judge)"));
        assert!(output.contains("missing import statement"));
    }

    #[test]
    fn test_format_for_prompt_truncates_long_messages() {
        let formatter = FeedbackFormatter::new().with_max_message_lines(2);
        let feedback = RoundFeedback::new(1, FailureCategory::Parse, "a\nb\nc\nd");

        let output = formatter.format_for_prompt(&feedback);

        assert!(output.contains("a\nb"));
        assert!(!output.contains("\nc\n"));
        assert!(output.contains("truncated"));
    }

    #[test]
    fn test_format_history() {
        let formatter = FeedbackFormatter::new();
        let history = vec![
            RoundFeedback::new(1, FailureCategory::Sentinel, "not related"),
            RoundFeedback::new(2, FailureCategory::Checker, "judge timed out"),
        ];

        let output = formatter.format_history(&history, 3);

        assert_eq!(
            output,
            "- Round 1/3 [sentinel]: not related\n- Round 2/3 [checker]: judge timed out"
        );
    }

    #[test]
    fn test_format_history_empty() {
        assert!(FeedbackFormatter::new().format_history(&[], 3).is_empty());
    }

    #[test]
    fn test_truncate_lines() {
        let text = "line1\nline2\nline3\nline4\nline5";
        let truncated = truncate_lines(text, 3);
        assert!(truncated.contains("line3"));
        assert!(truncated.contains("truncated"));
        assert!(!truncated.contains("line4"));
        assert_eq!(truncate_lines("one", 3), "one");
    }
}
