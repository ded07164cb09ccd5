//! Device storage detection
//!
//! Devices with a `flash` directory (RouterOS v7, ax series) only persist
//! files placed under it; everything else keeps uploads in the default store.

use std::fmt;

use tracing::debug;

use crate::session::RemoteSession;

/// Query counting `flash` entries in the device file table
pub const FLASH_STORAGE_QUERY: &str = "/file print count-only where name=\"flash\"";

/// Where uploaded files should live on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePrefix {
    /// Default storage, no prefix
    Default,

    /// `flash/`
    Flash,
}

impl StoragePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoragePrefix::Default => "",
            StoragePrefix::Flash => "flash/",
        }
    }

    /// Prefix `filename` with this storage location
    pub fn remote_path(&self, filename: &str) -> String {
        format!("{}{}", self.as_str(), filename)
    }

    /// Interpret the output of [`FLASH_STORAGE_QUERY`].
    ///
    /// Anything but a positive integer means there is no flash storage.
    pub fn from_count_output(output: &str) -> Self {
        match output.trim().parse::<i64>() {
            Ok(count) if count > 0 => StoragePrefix::Flash,
            _ => StoragePrefix::Default,
        }
    }
}

impl fmt::Display for StoragePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePrefix::Default => write!(f, "(default storage)"),
            StoragePrefix::Flash => write!(f, "{}", self.as_str()),
        }
    }
}

/// Ask the device which storage prefix to use. Never fails: a query error
/// counts as "no flash".
pub async fn detect_storage_prefix<S>(session: &mut S) -> StoragePrefix
where
    S: RemoteSession + ?Sized,
{
    match session.exec(FLASH_STORAGE_QUERY).await {
        Ok(output) => StoragePrefix::from_count_output(&output.stdout),
        Err(e) => {
            debug!("Storage query failed, using default storage: {}", e);
            StoragePrefix::Default
        }
    }
}
