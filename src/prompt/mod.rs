//! Prompt System - generation prompt assembly
//!
//! Builds the fresh-context request the generation model receives each round:
//! agent profile and answer format in the system instruction, task context and
//! previous-round feedback in the human message.

mod generation;

pub use generation::{AgentProfile, DEFAULT_EXAMPLE, GenerationPrompt};
