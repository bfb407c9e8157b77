//! Vetloop - a verification loop for code-generating agents
//!
//! Each turn iterates generate, execute, check with fresh context until the
//! judge accepts an answer or the round budget runs out.

pub mod action;
pub mod artifact;
pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod llm;
pub mod prompt;
pub mod runner;
pub mod validation;

pub use error::{Result, VetloopError};
