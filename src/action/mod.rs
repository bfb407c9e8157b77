//! Action execution: raw model output to an accept/reject outcome.

mod executor;

pub use executor::{ActionExecutor, ExecutionOutcome, RejectionKind};
