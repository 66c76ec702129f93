use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BdbError {
    #[error("config parse error in {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("config file {path} has insecure permissions (run: chmod 600 {path})")]
    InsecureConfig { path: PathBuf },

    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("provider error: {reason}")]
    Provider { reason: String },

    #[error("provider timeout after {timeout_secs}s")]
    ProviderTimeout { timeout_secs: u64 },

    #[error("api error: status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not in a git repository: {cwd} (use --global)")]
    NotInWorkspace { cwd: PathBuf },

    #[error("unknown hook event: {name}")]
    UnknownEvent { name: String },

    #[error("invalid hook event: {reason}")]
    InvalidEvent { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BdbError>;
