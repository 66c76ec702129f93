//! Supervision mode, stored alongside the pause sentinels.
//!
//! `interactive` lets the agent stop freely (a human is watching); safety
//! checks on tool calls still run. The local mode file wins over the global one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BdbError, Result};
use crate::workspace;

pub const MODE_FILE: &str = "mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Default,
    Auto,
    Interactive,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Default => write!(f, "default"),
            Mode::Auto => write!(f, "auto"),
            Mode::Interactive => write!(f, "interactive"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Mode::Default),
            "auto" => Ok(Mode::Auto),
            "interactive" => Ok(Mode::Interactive),
            _ => Err(format!("unknown mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModeRecord {
    mode: Mode,
    timestamp: DateTime<Utc>,
    user: String,
}

/// Reads and writes mode files for one working directory.
#[derive(Debug, Clone)]
pub struct ModeResolver {
    cwd: PathBuf,
    global_dir: PathBuf,
}

impl ModeResolver {
    pub fn new(cwd: impl Into<PathBuf>, global_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            global_dir: global_dir.into(),
        }
    }

    pub fn local_path(&self) -> Option<PathBuf> {
        workspace::find_workspace_root(&self.cwd).map(|root| root.join(".bdb").join(MODE_FILE))
    }

    pub fn global_path(&self) -> PathBuf {
        self.global_dir.join(MODE_FILE)
    }

    /// Current mode and the file it came from (`None` when defaulted).
    pub fn current(&self) -> (Mode, Option<PathBuf>) {
        if let Some(local) = self.local_path() {
            if let Some(mode) = read_mode_file(&local) {
                return (mode, Some(local));
            }
        }
        let global = self.global_path();
        if let Some(mode) = read_mode_file(&global) {
            return (mode, Some(global));
        }
        (Mode::Default, None)
    }

    pub fn set(&self, mode: Mode, global: bool) -> Result<PathBuf> {
        let path = self.target(global)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = ModeRecord {
            mode,
            timestamp: Utc::now(),
            user: workspace::current_user(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
        Ok(path)
    }

    /// Remove the mode file. Returns the removed path, if any.
    pub fn clear(&self, global: bool) -> Result<Option<PathBuf>> {
        let path = if global {
            self.global_path()
        } else {
            match self.local_path() {
                Some(path) => path,
                None => return Ok(None),
            }
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(Some(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn target(&self, global: bool) -> Result<PathBuf> {
        if global {
            return Ok(self.global_path());
        }
        self.local_path().ok_or_else(|| BdbError::NotInWorkspace {
            cwd: self.cwd.clone(),
        })
    }
}

/// Missing, unreadable or invalid mode files are ignored.
fn read_mode_file(path: &Path) -> Option<Mode> {
    let contents = std::fs::read_to_string(path).ok()?;
    let record: ModeRecord = serde_json::from_str(&contents).ok()?;
    Some(record.mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let global = tmp.path().join("global");
        (tmp, repo, global)
    }

    #[test]
    fn defaults_when_no_files() {
        let (_tmp, repo, global) = setup();
        let resolver = ModeResolver::new(&repo, &global);
        assert_eq!(resolver.current(), (Mode::Default, None));
    }

    #[test]
    fn local_wins_over_global() {
        let (_tmp, repo, global) = setup();
        let resolver = ModeResolver::new(&repo, &global);
        resolver.set(Mode::Auto, true).unwrap();
        let local = resolver.set(Mode::Interactive, false).unwrap();

        assert_eq!(resolver.current(), (Mode::Interactive, Some(local)));
    }

    #[test]
    fn clear_reverts_to_global() {
        let (_tmp, repo, global) = setup();
        let resolver = ModeResolver::new(&repo, &global);
        let global_path = resolver.set(Mode::Auto, true).unwrap();
        resolver.set(Mode::Interactive, false).unwrap();

        assert!(resolver.clear(false).unwrap().is_some());
        assert_eq!(resolver.current(), (Mode::Auto, Some(global_path)));
        assert!(resolver.clear(false).unwrap().is_none());
    }

    #[test]
    fn invalid_mode_file_is_ignored() {
        let (_tmp, repo, global) = setup();
        std::fs::create_dir_all(&global).unwrap();
        std::fs::write(global.join(MODE_FILE), r#"{"mode": "turbo"}"#).unwrap();
        let resolver = ModeResolver::new(&repo, &global);
        assert_eq!(resolver.current().0, Mode::Default);
    }

    #[test]
    fn parse_mode() {
        assert_eq!("Interactive".parse::<Mode>().unwrap(), Mode::Interactive);
        assert!("turbo".parse::<Mode>().is_err());
    }
}
