//! ID generation utilities for Vetloop

use sha2::{Digest, Sha256};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Short hex fingerprint of some text
///
/// First 8 bytes of the SHA-256 digest, hex encoded (16 chars).
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

/// Generate a turn ID for a goal
///
/// Format: `{timestamp_ms}-{fingerprint[..8]}`
/// Example: `1738300800123-a1b2c3d4`
pub fn generate_turn_id(goal: &str) -> String {
    format!("{}-{}", now_ms(), &fingerprint(goal)[..8])
}
