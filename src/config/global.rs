//! Global configuration.
//!
//! Loaded from ~/.config/vetloop/vetloop.yml or .vetloop.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::{DEFAULT_SENTINEL, normalize};
use crate::llm::anthropic::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::prompt::AgentProfile;
use crate::validation::verdict::{DEFAULT_DELIMITER, DEFAULT_STOP_MARKER};

/// Global configuration for Vetloop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Generation model settings.
    pub llm: LlmConfig,

    /// Judge model settings.
    pub judge: JudgeConfig,

    /// Retry loop settings.
    pub retry: RetryConfig,

    /// Generation agent profile.
    pub agent: AgentProfile,
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .vetloop.yml in current directory
    /// 3. ~/.config/vetloop/vetloop.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".vetloop.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .vetloop.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .vetloop.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("vetloop").join("vetloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_rounds == 0 {
            eyre::bail!("retry.max-rounds must be > 0");
        }
        if self.llm.timeout_ms == 0 {
            eyre::bail!("llm.timeout-ms must be > 0");
        }
        if self.judge.timeout_ms == 0 {
            eyre::bail!("judge.timeout-ms must be > 0");
        }
        if normalize(&self.retry.sentinel).is_empty() {
            eyre::bail!("retry.sentinel must contain at least one letter or digit");
        }
        if self.judge.accept_tokens.is_empty() {
            eyre::bail!("judge.accept-tokens must contain at least one token");
        }
        if self.judge.accept_tokens.iter().any(|t| t.trim().is_empty()) {
            eyre::bail!("judge.accept-tokens must not contain blank tokens");
        }
        Ok(())
    }
}

/// Generation model settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model used for generation (and judging unless overridden).
    pub model: String,

    /// Base URL for the API.
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Timeout per generation call in milliseconds.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Maximum tokens for a generation response.
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            timeout_ms: 300_000, // 5 minutes
            max_tokens: 4096,
        }
    }
}

/// Judge model settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Judge model; falls back to `llm.model`.
    pub model: Option<String>,

    /// Timeout per judge call in milliseconds.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Maximum tokens for a judge reply.
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Separator between verdict and reason.
    pub delimiter: char,

    /// Marker the judge ends a rejection with.
    #[serde(rename = "stop-marker")]
    pub stop_marker: String,

    /// Case-insensitive substrings that mean "accepted".
    #[serde(rename = "accept-tokens")]
    pub accept_tokens: Vec<String>,

    /// Replaces the built-in rubric.
    #[serde(rename = "system-prompt")]
    pub system_prompt: Option<String>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: None,
            timeout_ms: 60_000,
            max_tokens: 500,
            delimiter: DEFAULT_DELIMITER,
            stop_marker: DEFAULT_STOP_MARKER.to_string(),
            accept_tokens: vec!["true".to_string(), "yes".to_string()],
            system_prompt: None,
        }
    }
}

/// Retry loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum generate/execute/check rounds per turn.
    #[serde(rename = "max-rounds")]
    pub max_rounds: u32,

    /// Phrase the generation model emits when it has no correct answer.
    pub sentinel: String,

    /// Retry a round whose judge or generation call failed.
    #[serde(rename = "retry-on-checker-error")]
    pub retry_on_checker_error: bool,

    /// Send sentinel rejections to the judge too.
    #[serde(rename = "judge-rejected-outcomes")]
    pub judge_rejected_outcomes: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            sentinel: DEFAULT_SENTINEL.to_string(),
            retry_on_checker_error: true,
            judge_rejected_outcomes: true,
        }
    }
}
