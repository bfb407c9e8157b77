//! Turn outcome types.
//!
//! A turn always ends in one of three terminal states, and always surfaces a
//! `TurnResult`. `TurnReport` adds the round history and renders the
//! user-visible response.

use serde::{Deserialize, Serialize};

use crate::validation::{FeedbackFormatter, RoundFeedback};

/// Terminal state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The judge accepted an executed answer
    Accepted,
    /// Every round was rejected
    Exhausted,
    /// The final round could not be completed because a model call failed
    ExhaustedWithError,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Accepted => "accepted",
            TurnOutcome::Exhausted => "exhausted",
            TurnOutcome::ExhaustedWithError => "exhausted_with_error",
        }
    }
}

impl std::fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round result surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub accepted: bool,

    /// Accepted payload, or the last execution content.
    pub content: String,

    /// Last reason a round was rejected. `None` when accepted.
    pub fail_reason: Option<String>,

    pub rounds_used: u32,
}

/// Everything a finished turn reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn_id: String,
    pub outcome: TurnOutcome,
    pub result: TurnResult,
    pub max_rounds: u32,

    /// One entry per rejected round, in order.
    pub history: Vec<RoundFeedback>,
}

impl TurnReport {
    pub fn is_accepted(&self) -> bool {
        self.outcome == TurnOutcome::Accepted
    }

    /// Whether the turn ended because a model call failed.
    pub fn ended_with_error(&self) -> bool {
        self.outcome == TurnOutcome::ExhaustedWithError
    }
}

impl std::fmt::Display for TurnReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_accepted() {
            return write!(f, "{}", self.result.content);
        }

        let cause = match self.outcome {
            TurnOutcome::ExhaustedWithError => "the last model call failed",
            _ => "no answer passed verification",
        };
        writeln!(
            f,
            "Generation abandoned after {} round(s): {}.",
            self.result.rounds_used, cause
        )?;

        let history = FeedbackFormatter::new()
            .with_max_message_lines(3)
            .format_history(&self.history, self.max_rounds);
        if !history.is_empty() {
            writeln!(f, "{}", history)?;
        }

        if let Some(reason) = &self.result.fail_reason {
            write!(f, "Last reason: {}", reason)?;
        }

        Ok(())
    }
}
