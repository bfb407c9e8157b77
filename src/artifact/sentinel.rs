//! Fuzzy comparison against the sentinel phrase.
//!
//! Two strings match when they are equal after lower-casing and dropping
//! every character that is not alphanumeric (punctuation, symbols,
//! whitespace), so `"代码 是错误的。"` matches `"代码是错误的"`.

/// Default sentinel the generation model emits when it has no correct answer.
pub const DEFAULT_SENTINEL: &str = "生成的代码是错误的";

/// Normalize a string for sentinel comparison.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `candidate` equals `sentinel` modulo case, punctuation and whitespace.
pub fn matches(candidate: &str, sentinel: &str) -> bool {
    normalize(candidate) == normalize(sentinel)
}
