pub mod hooks;
pub mod llm;

pub use hooks::*;
pub use llm::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BdbError, Result};

/// Returns the global state directory: `~/.bdb/`
pub fn dirs_global() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".bdb")
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(path),
    }
}

/// Top-level configuration from `~/.bdb/config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// User-configured patterns checked against every tool call.
    #[serde(default)]
    pub blocklist: Vec<BlocklistEntry>,
}

impl Config {
    /// Load config from a YAML file. Returns default if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        if !has_secure_permissions(path) {
            return Err(BdbError::InsecureConfig {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| BdbError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config at `~/.bdb/config.yaml`.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        dirs_global().join("config.yaml")
    }

    /// Render the default configuration as a YAML template.
    pub fn template() -> Result<String> {
        let body = serde_yaml::to_string(&Self::default()).map_err(|e| BdbError::ConfigParse {
            path: Self::default_path(),
            reason: e.to_string(),
        })?;
        Ok(format!(
            "# Better Drinking Bird configuration\n\
             # Location: ~/.bdb/config.yaml (chmod 600)\n\
             {body}"
        ))
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path. `~/` is expanded.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_file() -> String {
    "~/.bdb/supervisor.log".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> PathBuf {
        expand_home(&self.file)
    }
}

/// A user-configured blocklist pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistEntry {
    pub pattern: String,

    #[serde(default = "default_blocklist_reason")]
    pub reason: String,

    /// Tool names the entry applies to. `*` matches every tool.
    #[serde(default = "default_blocklist_tools")]
    pub tools: Vec<String>,
}

fn default_blocklist_reason() -> String {
    "Blocked by user blocklist".into()
}
fn default_blocklist_tools() -> Vec<String> {
    vec!["*".into()]
}

impl BlocklistEntry {
    pub fn matches_tool(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t == "*" || t == tool_name)
    }
}

/// Group and other must have no access to the config file, since it may hold API keys.
#[cfg(unix)]
fn has_secure_permissions(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o077 == 0,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn has_secure_permissions(_path: &Path) -> bool {
    true
}
