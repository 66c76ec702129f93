//! Pause override: sentinel files that suspend all supervision.
//!
//! A workspace-scoped sentinel at `<repo-root>/.bdb-paused` and a user-scoped
//! one at `~/.bdb/.bdb-paused`. Only existence matters for gating; the JSON
//! content is informational. The local sentinel wins when both exist.

pub mod sentinel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BdbError, Result};
use crate::workspace;

pub const SENTINEL_NAME: &str = ".bdb-paused";

/// Which sentinel a pause/resume request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseScope {
    Local,
    Global,
}

impl std::fmt::Display for PauseScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PauseScope::Local => write!(f, "local"),
            PauseScope::Global => write!(f, "global"),
        }
    }
}

/// On-disk sentinel content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelRecord {
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    pub user: String,
}

impl SentinelRecord {
    pub fn now(reason: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            reason: reason.map(String::from),
            user: workspace::current_user(),
        }
    }
}

/// Result of a gating check. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseState {
    pub paused: bool,
    pub sentinel_path: Option<PathBuf>,
}

impl PauseState {
    fn active(path: PathBuf) -> Self {
        Self {
            paused: true,
            sentinel_path: Some(path),
        }
    }

    fn inactive() -> Self {
        Self {
            paused: false,
            sentinel_path: None,
        }
    }
}

/// Resolves pause state for one working directory.
#[derive(Debug, Clone)]
pub struct PauseGate {
    cwd: PathBuf,
    global_dir: PathBuf,
}

impl PauseGate {
    pub fn new(cwd: impl Into<PathBuf>, global_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            global_dir: global_dir.into(),
        }
    }

    /// Sentinel at the workspace root, if the cwd is inside a repository.
    pub fn local_sentinel(&self) -> Option<PathBuf> {
        workspace::find_workspace_root(&self.cwd).map(|root| root.join(SENTINEL_NAME))
    }

    pub fn global_sentinel(&self) -> PathBuf {
        self.global_dir.join(SENTINEL_NAME)
    }

    /// Check local first, then global. Read errors count as "not paused".
    pub fn check(&self) -> PauseState {
        if let Some(local) = self.local_sentinel() {
            if sentinel::is_present(&local) {
                return PauseState::active(local);
            }
        }

        let global = self.global_sentinel();
        if sentinel::is_present(&global) {
            return PauseState::active(global);
        }

        PauseState::inactive()
    }

    /// Local when inside a workspace, global otherwise.
    pub fn default_scope(&self) -> PauseScope {
        if self.local_sentinel().is_some() {
            PauseScope::Local
        } else {
            PauseScope::Global
        }
    }

    /// Sentinel path for an explicit scope.
    pub fn sentinel_for(&self, scope: PauseScope) -> Result<PathBuf> {
        match scope {
            PauseScope::Global => Ok(self.global_sentinel()),
            PauseScope::Local => self
                .local_sentinel()
                .ok_or_else(|| BdbError::NotInWorkspace {
                    cwd: self.cwd.clone(),
                }),
        }
    }

    /// Create a sentinel. Returns the scope and path that were written.
    pub fn pause(
        &self,
        scope: Option<PauseScope>,
        reason: Option<&str>,
    ) -> Result<(PauseScope, PathBuf)> {
        let scope = scope.unwrap_or_else(|| self.default_scope());
        let path = self.sentinel_for(scope)?;
        sentinel::write(&path, &SentinelRecord::now(reason))?;
        tracing::info!(scope = %scope, path = %path.display(), "supervision paused");
        Ok((scope, path))
    }

    /// Remove a sentinel. Without an explicit scope, removes whichever one is
    /// currently active. Returns the removed path, or `None` if nothing was paused.
    pub fn resume(&self, scope: Option<PauseScope>) -> Result<Option<PathBuf>> {
        let path = match scope {
            Some(scope) => self.sentinel_for(scope)?,
            None => match self.check().sentinel_path {
                Some(active) => active,
                None => return Ok(None),
            },
        };

        if sentinel::remove(&path)? {
            tracing::info!(path = %path.display(), "supervision resumed");
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Read sentinel metadata for display.
    pub fn info(path: &Path) -> Option<SentinelRecord> {
        sentinel::read(path)
    }
}
