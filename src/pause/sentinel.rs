//! Sentinel file I/O.
//!
//! Gating reads and explicit pause/resume actions handle errors differently
//! and are kept as separate helpers: [`is_present`] fails open (an unreadable
//! sentinel means "not paused"), [`write`] and [`remove`] propagate every
//! error so the user learns the action did not happen.

use std::path::Path;

use crate::error::Result;

use super::SentinelRecord;

/// Gating read. Any I/O error is logged and treated as absent.
pub fn is_present(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot stat pause sentinel, treating as not paused"
            );
            false
        }
    }
}

/// Explicit pause. Creates parent directories as needed.
pub fn write(path: &Path, record: &SentinelRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Explicit resume. Returns whether a file was removed; a missing file is
/// not an error and touches nothing.
pub fn remove(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Read metadata for display. Unreadable or malformed content yields `None`.
pub fn read(path: &Path) -> Option<SentinelRecord> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
