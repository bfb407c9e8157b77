//! Correctness validation: judge-model checks and round feedback.

pub mod feedback;
pub mod llm_judge;
pub mod verdict;

pub use feedback::{FailureCategory, FeedbackFormatter, RoundFeedback};
pub use llm_judge::{CheckerError, CorrectnessChecker};
pub use verdict::{CorrectnessVerdict, JudgeReply, ReplyGrammar};
