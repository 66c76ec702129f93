pub mod hook;
pub mod mode_cmd;
pub mod pause;
pub mod template;

use std::path::PathBuf;

/// Working directory for commands run by a person, not by the harness.
pub(crate) fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
