//! Judge reply classification.
//!
//! The judge is asked to answer `True`, or `False<delim><reason>` followed by
//! a stop marker. Its free text reduces to exactly one of three shapes:
//!
//! - contains an accept token (`true` / `yes`, case-insensitive): accepted
//! - splits on the delimiter into exactly two parts: rejected with reason
//! - anything else: rejected with a generic reason

use serde::{Deserialize, Serialize};

/// Default delimiter between verdict and reason.
pub const DEFAULT_DELIMITER: char = '|';

/// Default marker the judge ends a rejection with.
pub const DEFAULT_STOP_MARKER: &str = "TERMINATE";

/// Classified judge reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeReply {
    Accepted,
    RejectedWithReason(String),
    RejectedGeneric,
}

/// Verdict produced once per judged round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectnessVerdict {
    pub accepted: bool,

    /// Always set when `accepted` is false.
    pub fail_reason: Option<String>,
}

impl CorrectnessVerdict {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            fail_reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            fail_reason: Some(reason.into()),
        }
    }
}

impl From<JudgeReply> for CorrectnessVerdict {
    fn from(reply: JudgeReply) -> Self {
        match reply {
            JudgeReply::Accepted => CorrectnessVerdict::accepted(),
            JudgeReply::RejectedWithReason(reason) => CorrectnessVerdict::rejected(format!(
                "results cannot satisfy the request due to: {reason}. Please re-understand and complete the task."
            )),
            JudgeReply::RejectedGeneric => CorrectnessVerdict::rejected(
                "results cannot satisfy the request. Please re-understand and complete the task.",
            ),
        }
    }
}

/// The reply micro-grammar, parameterised by its tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyGrammar {
    pub delimiter: char,
    pub stop_marker: String,
    pub accept_tokens: Vec<String>,
}

impl Default for ReplyGrammar {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            stop_marker: DEFAULT_STOP_MARKER.to_string(),
            accept_tokens: vec!["true".to_string(), "yes".to_string()],
        }
    }
}

impl ReplyGrammar {
    /// Classify a judge reply.
    pub fn classify(&self, reply: &str) -> JudgeReply {
        let lower = reply.to_lowercase();
        if self
            .accept_tokens
            .iter()
            .map(|token| token.trim().to_lowercase())
            .any(|token| !token.is_empty() && lower.contains(&token))
        {
            return JudgeReply::Accepted;
        }

        let parts: Vec<&str> = reply.split(self.delimiter).collect();
        let [_, reason] = parts.as_slice() else {
            return JudgeReply::RejectedGeneric;
        };

        let reason = self.strip_stop_marker(reason);
        if reason.is_empty() {
            JudgeReply::RejectedGeneric
        } else {
            JudgeReply::RejectedWithReason(reason.to_string())
        }
    }

    fn strip_stop_marker<'a>(&self, reason: &'a str) -> &'a str {
        let reason = reason.trim();
        if self.stop_marker.is_empty() {
            return reason;
        }
        reason
            .strip_suffix(self.stop_marker.as_str())
            .unwrap_or(reason)
            .trim()
    }
}
