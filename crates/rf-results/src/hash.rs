//! Content digest for run metadata.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Stable hex digest of any serializable configuration, recorded in the
/// run metadata so results can be traced back to the exact scenario.
pub fn config_digest<T: Serialize>(value: &T) -> String {
    let mut hasher = Sha256::new();
    let json = serde_json::to_string(value).unwrap_or_default();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}
