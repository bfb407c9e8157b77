//! RetryCoordinator - drives generate, execute, check until accepted or out of rounds.
//!
//! Each round starts from a fresh generation request; the only thing carried
//! between rounds is the `RetryState` (round index, last verdict, feedback).
//! Per round:
//!
//! ```text
//! Generating -> Executing -> Checking -> Accepted
//!                                     -> Retrying (round < max_rounds)
//!                                     -> Exhausted | ExhaustedWithError
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::action::{ActionExecutor, ExecutionOutcome};
use crate::config::GlobalConfig;
use crate::domain::{Task, TurnOutcome, TurnReport, TurnResult};
use crate::llm::{LlmClient, LlmError};
use crate::prompt::GenerationPrompt;
use crate::validation::{CorrectnessChecker, CorrectnessVerdict, FailureCategory, RoundFeedback};

/// Errors from the generation call of a round.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that end a turn without a `TurnReport`.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("turn cancelled during round {round}")]
    Cancelled { round: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where a round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Generating,
    Executing,
    Checking,
    Accepted,
    Retrying,
    Exhausted,
    ExhaustedWithError,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Generating => "generating",
            RoundPhase::Executing => "executing",
            RoundPhase::Checking => "checking",
            RoundPhase::Accepted => "accepted",
            RoundPhase::Retrying => "retrying",
            RoundPhase::Exhausted => "exhausted",
            RoundPhase::ExhaustedWithError => "exhausted_with_error",
        }
    }

    /// Whether the turn ends in this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoundPhase::Accepted | RoundPhase::Exhausted | RoundPhase::ExhaustedWithError
        )
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retry knobs for one coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_rounds: u32,

    /// Timeout for each generation call.
    pub generation_timeout: Duration,

    /// Retry a round whose judge or generation call failed.
    pub retry_on_checker_error: bool,

    /// Send sentinel rejections to the judge as well.
    pub judge_rejected_outcomes: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            generation_timeout: Duration::from_secs(300),
            retry_on_checker_error: true,
            judge_rejected_outcomes: true,
        }
    }
}

impl RetryPolicy {
    /// Phase after a rejected round.
    ///
    /// `round_index` is zero-based; `failed` means a model call failed
    /// rather than an answer being rejected.
    pub fn after_rejection(&self, round_index: u32, failed: bool) -> RoundPhase {
        let last_round = round_index + 1 >= self.max_rounds;
        match (failed, last_round) {
            (true, _) if !self.retry_on_checker_error => RoundPhase::ExhaustedWithError,
            (true, true) => RoundPhase::ExhaustedWithError,
            (false, true) => RoundPhase::Exhausted,
            (_, false) => RoundPhase::Retrying,
        }
    }
}

/// Turn-local state carried from one round into the next.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Zero-based index of the current round.
    pub round_index: u32,

    /// Verdict of the last judged round.
    pub last_verdict: Option<CorrectnessVerdict>,

    /// Why the previous round was rejected.
    pub feedback: Option<RoundFeedback>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-based round number.
    pub fn round(&self) -> u32 {
        self.round_index + 1
    }

    /// State for the next round.
    pub fn advance(self, verdict: Option<CorrectnessVerdict>, feedback: RoundFeedback) -> Self {
        Self {
            round_index: self.round_index + 1,
            last_verdict: verdict.or(self.last_verdict),
            feedback: Some(feedback),
        }
    }
}

/// What one round produced.
#[derive(Debug)]
enum RoundDecision {
    Accepted(ExecutionOutcome),
    Rejected {
        outcome: Option<ExecutionOutcome>,
        verdict: Option<CorrectnessVerdict>,
        feedback: RoundFeedback,
    },
}

/// Bounded self-correcting loop around a generation model.
pub struct RetryCoordinator {
    generator: Arc<dyn LlmClient>,
    prompt: GenerationPrompt,
    executor: ActionExecutor,
    checker: CorrectnessChecker,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    /// Create a coordinator with the default policy.
    pub fn new(
        generator: Arc<dyn LlmClient>,
        prompt: GenerationPrompt,
        executor: ActionExecutor,
        checker: CorrectnessChecker,
    ) -> Self {
        Self {
            generator,
            prompt,
            executor,
            checker,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wire a coordinator from configuration.
    ///
    /// `generator` and `judge` may be the same client.
    pub fn from_config(
        config: &GlobalConfig,
        generator: Arc<dyn LlmClient>,
        judge: Arc<dyn LlmClient>,
    ) -> Result<Self, CoordinatorError> {
        config
            .validate()
            .map_err(|e| CoordinatorError::InvalidConfig(e.to_string()))?;

        let checker = CorrectnessChecker::from_config(&config.judge, judge);

        let prompt = GenerationPrompt::new(config.agent.clone(), config.retry.sentinel.clone())
            .with_max_tokens(config.llm.max_tokens)
            .with_model(Some(config.llm.model.clone()));

        let policy = RetryPolicy {
            max_rounds: config.retry.max_rounds,
            generation_timeout: Duration::from_millis(config.llm.timeout_ms),
            retry_on_checker_error: config.retry.retry_on_checker_error,
            judge_rejected_outcomes: config.retry.judge_rejected_outcomes,
        };

        Ok(Self::new(generator, prompt, ActionExecutor::new(config.retry.sentinel.clone()), checker)
            .with_policy(policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one turn to a terminal outcome.
    pub async fn run(&self, task: &Task) -> Result<TurnReport, CoordinatorError> {
        self.run_until(task, std::future::pending::<()>()).await
    }

    /// Run one turn, abandoning it as soon as `cancelled` resolves.
    ///
    /// Cancellation drops the in-flight model call and yields no report.
    pub async fn run_until<F>(&self, task: &Task, cancelled: F) -> Result<TurnReport, CoordinatorError>
    where
        F: Future<Output = ()>,
    {
        if self.policy.max_rounds == 0 {
            return Err(CoordinatorError::InvalidConfig("max_rounds must be > 0".to_string()));
        }

        tokio::pin!(cancelled);

        let mut state = RetryState::new();
        let mut history: Vec<RoundFeedback> = Vec::new();
        let mut last_outcome: Option<ExecutionOutcome> = None;

        tracing::info!(turn_id = %task.id(), max_rounds = self.policy.max_rounds, "Turn started");

        loop {
            let round = state.round();

            let decision = tokio::select! {
                biased;
                _ = &mut cancelled => {
                    tracing::warn!(turn_id = %task.id(), round, "Turn cancelled");
                    return Err(CoordinatorError::Cancelled { round });
                }
                decision = self.run_round(task, &state) => decision,
            };

            match decision {
                RoundDecision::Accepted(outcome) => {
                    tracing::info!(turn_id = %task.id(), round, phase = %RoundPhase::Accepted, "Answer accepted");
                    return Ok(TurnReport {
                        turn_id: task.id().to_string(),
                        outcome: TurnOutcome::Accepted,
                        result: TurnResult {
                            accepted: true,
                            content: outcome.content,
                            fail_reason: None,
                            rounds_used: round,
                        },
                        max_rounds: self.policy.max_rounds,
                        history,
                    });
                }
                RoundDecision::Rejected {
                    outcome,
                    verdict,
                    feedback,
                } => {
                    if outcome.is_some() {
                        last_outcome = outcome;
                    }
                    history.push(feedback.clone());

                    let next = self
                        .policy
                        .after_rejection(state.round_index, feedback.category.is_error());
                    let last_reason = verdict
                        .as_ref()
                        .or(state.last_verdict.as_ref())
                        .and_then(|v| v.fail_reason.as_deref())
                        .unwrap_or("-");
                    tracing::info!(
                        turn_id = %task.id(),
                        round,
                        phase = %next,
                        category = %feedback.category,
                        last_verdict = %last_reason,
                        "Round rejected"
                    );

                    let outcome = match next {
                        RoundPhase::Exhausted => TurnOutcome::Exhausted,
                        RoundPhase::ExhaustedWithError => TurnOutcome::ExhaustedWithError,
                        _ => {
                            state = state.advance(verdict, feedback);
                            continue;
                        }
                    };

                    return Ok(TurnReport {
                        turn_id: task.id().to_string(),
                        outcome,
                        result: TurnResult {
                            accepted: false,
                            content: last_outcome.map(|o| o.content).unwrap_or_default(),
                            fail_reason: Some(feedback.message),
                            rounds_used: round,
                        },
                        max_rounds: self.policy.max_rounds,
                        history,
                    });
                }
            }
        }
    }

    /// One generate, execute, check pass.
    async fn run_round(&self, task: &Task, state: &RetryState) -> RoundDecision {
        let round = state.round();

        // Generating
        tracing::debug!(turn_id = %task.id(), round, phase = %RoundPhase::Generating, "Calling generation model");
        let raw = match self.generate(task, state).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Round {} generation failed: {}", round, e);
                return RoundDecision::Rejected {
                    outcome: None,
                    verdict: None,
                    feedback: RoundFeedback::new(round, FailureCategory::Generation, e.to_string()),
                };
            }
        };

        // Executing
        tracing::debug!(turn_id = %task.id(), round, phase = %RoundPhase::Executing, "Executing answer");
        let outcome = self.executor.execute(&raw);

        if outcome.is_parse_failure() {
            let feedback = RoundFeedback::new(round, FailureCategory::Parse, outcome.content.clone());
            return RoundDecision::Rejected {
                outcome: Some(outcome),
                verdict: None,
                feedback,
            };
        }

        if !outcome.success && !self.policy.judge_rejected_outcomes {
            let feedback = RoundFeedback::new(round, FailureCategory::Sentinel, outcome.content.clone());
            return RoundDecision::Rejected {
                outcome: Some(outcome),
                verdict: None,
                feedback,
            };
        }

        // Checking
        tracing::debug!(turn_id = %task.id(), round, phase = %RoundPhase::Checking, "Calling judge");
        let verdict = match self.checker.check(task.goal(), &outcome.content).await {
            Ok(verdict) => verdict,
            Err(e) => {
                log::warn!("Round {} check failed: {}", round, e);
                return RoundDecision::Rejected {
                    outcome: Some(outcome),
                    verdict: None,
                    feedback: RoundFeedback::new(round, FailureCategory::Checker, e.to_string()),
                };
            }
        };

        if outcome.success && verdict.accepted {
            return RoundDecision::Accepted(outcome);
        }

        // A sentinel outcome is never accepted, whatever the judge said.
        let (category, message) = if outcome.success {
            (FailureCategory::Judge, verdict.fail_reason.clone().unwrap_or_default())
        } else {
            let message = verdict
                .fail_reason
                .clone()
                .unwrap_or_else(|| outcome.content.clone());
            (FailureCategory::Sentinel, message)
        };

        RoundDecision::Rejected {
            outcome: Some(outcome),
            verdict: Some(verdict),
            feedback: RoundFeedback::new(round, category, message),
        }
    }

    async fn generate(&self, task: &Task, state: &RetryState) -> Result<String, GenerationError> {
        let request = self.prompt.build_request(task, state.feedback.as_ref());
        let timeout = self.policy.generation_timeout;

        let response = tokio::time::timeout(timeout, self.generator.complete(request))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    const ANSWER: &str = r#"{"summary": "SHOW TABLES"}"#;
    const SENTINEL_ANSWER: &str = r#"{"summary": "生成的代码是错误的"}"#;

    fn coordinator(generator: Arc<MockLlmClient>, judge: Arc<MockLlmClient>) -> RetryCoordinator {
        RetryCoordinator::new(
            generator,
            GenerationPrompt::default(),
            ActionExecutor::default(),
            CorrectnessChecker::new(judge),
        )
    }

    #[test]
    fn test_after_rejection_transitions() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.after_rejection(0, false), RoundPhase::Retrying);
        assert_eq!(policy.after_rejection(1, true), RoundPhase::Retrying);
        assert_eq!(policy.after_rejection(2, false), RoundPhase::Exhausted);
        assert_eq!(policy.after_rejection(2, true), RoundPhase::ExhaustedWithError);

        let strict = RetryPolicy {
            retry_on_checker_error: false,
            ..Default::default()
        };
        assert_eq!(strict.after_rejection(0, true), RoundPhase::ExhaustedWithError);
        assert_eq!(strict.after_rejection(0, false), RoundPhase::Retrying);
    }

    #[test]
    fn test_single_round_policy() {
        let policy = RetryPolicy {
            max_rounds: 1,
            ..Default::default()
        };
        assert_eq!(policy.after_rejection(0, false), RoundPhase::Exhausted);
    }

    #[test]
    fn test_retry_state_advance() {
        let state = RetryState::new();
        assert_eq!(state.round(), 1);

        let feedback = RoundFeedback::new(1, FailureCategory::Judge, "nope");
        let state = state.advance(Some(CorrectnessVerdict::rejected("nope")), feedback);
        assert_eq!(state.round_index, 1);
        assert_eq!(state.round(), 2);
        assert!(state.last_verdict.is_some());

        let feedback = RoundFeedback::new(2, FailureCategory::Checker, "timeout");
        let state = state.advance(None, feedback);
        assert_eq!(state.round(), 3);
        assert!(state.last_verdict.is_some());
        assert_eq!(state.feedback.unwrap().category, FailureCategory::Checker);
    }

    #[test]
    fn test_phase_terminality() {
        assert!(RoundPhase::Accepted.is_terminal());
        assert!(RoundPhase::ExhaustedWithError.is_terminal());
        assert!(!RoundPhase::Retrying.is_terminal());
        assert_eq!(RoundPhase::Checking.to_string(), "checking");
    }

    #[tokio::test]
    async fn test_accepted_first_round() {
        let generator = Arc::new(MockLlmClient::new([ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator.clone(), judge.clone());

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Accepted);
        assert_eq!(report.result.content, "SHOW TABLES");
        assert_eq!(report.result.rounds_used, 1);
        assert!(report.history.is_empty());
        assert_eq!(generator.call_count(), 1);
        assert_eq!(judge.call_count(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_skips_judge() {
        let generator = Arc::new(MockLlmClient::new(["no json here", ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator.clone(), judge.clone());

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert!(report.is_accepted());
        assert_eq!(report.result.rounds_used, 2);
        assert_eq!(report.history[0].category, FailureCategory::Parse);
        assert_eq!(judge.call_count(), 1);
    }

    #[tokio::test]
    async fn test_judge_rejection_feeds_next_round() {
        let generator = Arc::new(MockLlmClient::new([ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["False|missing import statement", "True"]));
        let coordinator = coordinator(generator.clone(), judge);

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert!(report.is_accepted());
        assert_eq!(report.result.rounds_used, 2);

        let requests = generator.requests();
        assert!(!requests[0].human_text().contains("Previous Round Feedback"));
        assert!(requests[1].human_text().contains("missing import statement"));
    }

    #[tokio::test]
    async fn test_sentinel_never_accepted_even_if_judged_true() {
        let generator = Arc::new(MockLlmClient::new([SENTINEL_ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator, judge.clone()).with_policy(RetryPolicy {
            max_rounds: 2,
            ..Default::default()
        });

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Exhausted);
        assert_eq!(report.result.rounds_used, 2);
        assert!(report.result.content.starts_with("content not related to the user question"));
        assert!(report.history.iter().all(|f| f.category == FailureCategory::Sentinel));
        assert_eq!(judge.call_count(), 2);
    }

    #[tokio::test]
    async fn test_sentinel_skips_judge_when_configured() {
        let generator = Arc::new(MockLlmClient::new([SENTINEL_ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator, judge.clone()).with_policy(RetryPolicy {
            judge_rejected_outcomes: false,
            ..Default::default()
        });

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Exhausted);
        assert_eq!(report.result.rounds_used, 3);
        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_timeout_is_error() {
        let generator = Arc::new(MockLlmClient::new([ANSWER]).with_delay(Duration::from_millis(500)));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator, judge.clone()).with_policy(RetryPolicy {
            max_rounds: 2,
            generation_timeout: Duration::from_millis(20),
            ..Default::default()
        });

        let report = coordinator.run(&Task::new("list tables")).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::ExhaustedWithError);
        assert_eq!(report.result.rounds_used, 2);
        assert!(report.result.content.is_empty());
        assert_eq!(report.history[1].category, FailureCategory::Generation);
        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_round() {
        let generator = Arc::new(MockLlmClient::new([ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator, judge);

        let result = coordinator.run_until(&Task::new("list tables"), async {}).await;

        assert!(matches!(result, Err(CoordinatorError::Cancelled { round: 1 })));
    }

    #[tokio::test]
    async fn test_zero_rounds_rejected() {
        let generator = Arc::new(MockLlmClient::new([ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = coordinator(generator, judge).with_policy(RetryPolicy {
            max_rounds: 0,
            ..Default::default()
        });

        let result = coordinator.run(&Task::new("list tables")).await;
        assert!(matches!(result, Err(CoordinatorError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = GlobalConfig::default();
        config.retry.max_rounds = 0;

        let client = Arc::new(MockLlmClient::new(["True"]));
        let result = RetryCoordinator::from_config(&config, client.clone(), client);
        assert!(matches!(result, Err(CoordinatorError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_config_policy() {
        let mut config = GlobalConfig::default();
        config.retry.max_rounds = 5;
        config.llm.timeout_ms = 1500;
        config.retry.retry_on_checker_error = false;

        let client = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = RetryCoordinator::from_config(&config, client.clone(), client).unwrap();

        assert_eq!(coordinator.policy().max_rounds, 5);
        assert_eq!(coordinator.policy().generation_timeout, Duration::from_millis(1500));
        assert!(!coordinator.policy().retry_on_checker_error);
    }

    #[tokio::test]
    async fn test_from_config_uses_generation_model() {
        let mut config = GlobalConfig::default();
        config.llm.model = "claude-3-haiku-20240307".to_string();
        config.llm.max_tokens = 2048;

        let generator = Arc::new(MockLlmClient::new([ANSWER]));
        let judge = Arc::new(MockLlmClient::new(["True"]));
        let coordinator = RetryCoordinator::from_config(&config, generator.clone(), judge).unwrap();

        coordinator.run(&Task::new("list tables")).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests[0].model.as_deref(), Some("claude-3-haiku-20240307"));
        assert_eq!(requests[0].max_tokens, Some(2048));
    }
}
