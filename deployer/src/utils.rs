//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version information for the deployer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

const ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random identifier of `len` characters drawn from `[a-z0-9]`
pub fn short_id(len: usize) -> String {
    let mut id = String::with_capacity(len);
    while id.len() < len {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        // bytes 6 and 8 carry the fixed version and variant bits
        for byte in bytes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, b)| *b)
            .take(len - id.len())
        {
            id.push(ID_ALPHABET[byte as usize % ID_ALPHABET.len()] as char);
        }
    }
    id
}

/// Format a duration as the `HH:MM:SS` literal RouterOS expects in time arithmetic
pub fn routeros_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
