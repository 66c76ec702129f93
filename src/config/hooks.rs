use serde::{Deserialize, Serialize};

/// Per-hook configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub stop: StopHookConfig,

    #[serde(default)]
    pub pre_tool: PreToolHookConfig,

    #[serde(default)]
    pub tool_failure: ToolFailureHookConfig,

    #[serde(default)]
    pub pre_compact: PreCompactHookConfig,
}

fn default_true() -> bool {
    true
}

/// Stop hook: nudges the agent back to work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopHookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "Should I proceed?"
    #[serde(default = "default_true")]
    pub block_permission_seeking: bool,

    /// "Let me try a simpler approach"
    #[serde(default = "default_true")]
    pub block_plan_deviation: bool,

    /// "We can skip the tests"
    #[serde(default = "default_true")]
    pub block_quality_shortcuts: bool,

    /// Number of trailing transcript records the stop engine looks at.
    #[serde(default = "default_window_messages")]
    pub window_messages: usize,
}

fn default_window_messages() -> usize {
    20
}

impl Default for StopHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_permission_seeking: true,
            block_plan_deviation: true,
            block_quality_shortcuts: true,
            window_messages: default_window_messages(),
        }
    }
}

/// What the fuzzy classifier does when no provider is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Block,
    Allow,
}

impl std::fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackPolicy::Block => write!(f, "block"),
            FallbackPolicy::Allow => write!(f, "allow"),
        }
    }
}

/// Pre-tool hook: blocks dangerous shell commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolHookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub categories: SafetyCategories,

    #[serde(default)]
    pub llm_fallback: FallbackPolicy,
}

impl Default for PreToolHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: SafetyCategories::default(),
            llm_fallback: FallbackPolicy::Block,
        }
    }
}

/// Enable flags for the deterministic rule categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCategories {
    /// --no-verify, HUSKY=0
    #[serde(default = "default_true")]
    pub ci_bypass: bool,
    /// reset --hard, clean -f, push --force
    #[serde(default = "default_true")]
    pub destructive_git: bool,
    /// checkout main (protects worktrees)
    #[serde(default = "default_true")]
    pub branch_switching: bool,
    /// rebase -i, add -p
    #[serde(default = "default_true")]
    pub interactive_git: bool,
    /// rm -rf /
    #[serde(default = "default_true")]
    pub dangerous_files: bool,
    /// verbose git log, git blame
    #[serde(default = "default_true")]
    pub git_history: bool,
    /// cat .env, .pem files
    #[serde(default = "default_true")]
    pub credential_access: bool,
}

impl Default for SafetyCategories {
    fn default() -> Self {
        Self {
            ci_bypass: true,
            destructive_git: true,
            branch_switching: true,
            interactive_git: true,
            dangerous_files: true,
            git_history: true,
            credential_access: true,
        }
    }
}

/// Minimum confidence a recovery hint needs before it is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Tool failure hook: recovery hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFailureHookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub confidence_threshold: Confidence,
}

impl Default for ToolFailureHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: Confidence::Medium,
        }
    }
}

/// Pre-compact hook: preserves context across compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCompactHookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Glob patterns, relative to the workspace root, of files worth re-reading.
    #[serde(default = "default_context_patterns")]
    pub context_patterns: Vec<String>,
}

fn default_context_patterns() -> Vec<String> {
    vec![
        "docs/plans/*.md".into(),
        "docs/*.md".into(),
        ".claude/plans/*.md".into(),
        "CLAUDE.md".into(),
        "AGENTS.md".into(),
        "README.md".into(),
    ]
}

impl Default for PreCompactHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_patterns: default_context_patterns(),
        }
    }
}
