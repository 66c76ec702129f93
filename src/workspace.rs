use std::path::{Path, PathBuf};

/// Marker entry that identifies a version-controlled workspace root.
/// A directory for normal repositories, a file for linked worktrees.
pub const REPO_MARKER: &str = ".git";

/// Walk up from `start` looking for a directory that contains `.git`.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| dir.join(REPO_MARKER).exists())
        .map(Path::to_path_buf)
}

/// Get the current OS username.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".into())
}

/// Read the checked-out branch from `<root>/.git/HEAD`, following the
/// `gitdir:` indirection used by linked worktrees.
pub fn current_branch(root: &Path) -> Option<String> {
    let marker = root.join(REPO_MARKER);
    let git_dir = if marker.is_file() {
        let contents = std::fs::read_to_string(&marker).ok()?;
        let gitdir = contents.trim().strip_prefix("gitdir:")?.trim();
        let gitdir = PathBuf::from(gitdir);
        if gitdir.is_absolute() {
            gitdir
        } else {
            root.join(gitdir)
        }
    } else {
        marker
    };

    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .map(|branch| branch.to_string())
}
