//! Artifact Parsing Module
//!
//! This module turns a candidate artifact (raw model text) into a typed
//! `StructuredResult`, and detects the "no correct answer" sentinel phrase.

mod parser;
mod sentinel;

pub use parser::*;
pub use sentinel::*;
