//! Structured result extraction from raw model text.
//!
//! The generation model is asked to answer with a JSON object carrying a
//! `summary` field. Models wrap that object in prose or markdown fences often
//! enough that we try, in order: the whole text, a fenced block, and the
//! first balanced `{ ... }` object found by scanning the text. A top-level
//! array yields its first object element.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Name of the required field in the structured answer.
pub const SUMMARY_FIELD: &str = "summary";

/// Errors from structured result parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON payload found in model output")]
    NoPayload,

    #[error("structured payload is not an object")]
    NotAnObject,

    #[error("structured payload has no string `summary` field")]
    MissingSummary,

    #[error("structured payload has an empty `summary` field")]
    EmptySummary,
}

/// Parsed form of a candidate artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResult {
    /// The generated answer. Never empty.
    pub summary: String,
}

/// Parse raw model output into a `StructuredResult`.
pub fn parse(raw: &str) -> Result<StructuredResult, ParseError> {
    let value = extract_json(raw).ok_or(ParseError::NoPayload)?;

    let map = match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .find_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .ok_or(ParseError::NotAnObject)?,
        _ => return Err(ParseError::NotAnObject),
    };

    let summary = map
        .get(SUMMARY_FIELD)
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingSummary)?;

    if summary.trim().is_empty() {
        return Err(ParseError::EmptySummary);
    }

    Ok(StructuredResult {
        summary: summary.to_string(),
    })
}

/// Locate the first well-formed JSON value in free text.
fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(fenced)
    {
        return Some(value);
    }

    first_object(trimmed)
}

/// First `{` position that starts a complete JSON object.
///
/// The stream deserializer stops at the end of the first value, so trailing
/// prose and braces inside strings are handled.
fn first_object(content: &str) -> Option<Value> {
    content.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&content[start..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
            .filter(Value::is_object)
    })
}

/// Body of the first ``` fenced block, without its language tag.
fn fenced_block(content: &str) -> Option<&str> {
    let open = content.find("```")?;
    let after_open = &content[open + 3..];
    let body_start = after_open.find('\n').map(|pos| pos + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}
