//! Domain types for Vetloop
//!
//! - Task: the user's request for one conversation turn
//! - TurnOutcome / TurnResult / TurnReport: what a finished turn surfaces

pub mod outcome;
pub mod task;

pub use outcome::{TurnOutcome, TurnReport, TurnResult};
pub use task::Task;
