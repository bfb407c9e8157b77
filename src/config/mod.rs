//! Configuration system for Vetloop.
//!
//! A single YAML file with four sections: `llm`, `judge`, `retry`, `agent`.

pub use self::global::{GlobalConfig, JudgeConfig, LlmConfig, RetryConfig};

mod global;

use eyre::Result;
use std::path::PathBuf;

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .vetloop.yml in current directory (project config)
/// 3. ~/.config/vetloop/vetloop.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<GlobalConfig> {
    GlobalConfig::load(explicit_path)
}
