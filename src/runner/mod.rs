//! Runner module - the bounded retry loop for one conversation turn.
//!
//! - RetryCoordinator drives generate, execute, check rounds
//! - RetryPolicy decides what happens after a rejected round
//! - RetryState is the only thing carried from one round into the next

mod coordinator;

pub use coordinator::{
    CoordinatorError, GenerationError, RetryCoordinator, RetryPolicy, RetryState, RoundPhase,
};
