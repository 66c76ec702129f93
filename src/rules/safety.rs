use std::sync::LazyLock;

use crate::config::SafetyCategories;
use crate::error::Result;

use super::{RuleSet, RuleSpec};

/// Deterministic rule categories. Each can be switched off in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyCategory {
    CiBypass,
    DestructiveGit,
    BranchSwitching,
    InteractiveGit,
    DangerousFiles,
    GitHistory,
    CredentialAccess,
}

impl SafetyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::CiBypass => "ci_bypass",
            SafetyCategory::DestructiveGit => "destructive_git",
            SafetyCategory::BranchSwitching => "branch_switching",
            SafetyCategory::InteractiveGit => "interactive_git",
            SafetyCategory::DangerousFiles => "dangerous_files",
            SafetyCategory::GitHistory => "git_history",
            SafetyCategory::CredentialAccess => "credential_access",
        }
    }

    pub fn is_enabled(&self, enabled: &SafetyCategories) -> bool {
        match self {
            SafetyCategory::CiBypass => enabled.ci_bypass,
            SafetyCategory::DestructiveGit => enabled.destructive_git,
            SafetyCategory::BranchSwitching => enabled.branch_switching,
            SafetyCategory::InteractiveGit => enabled.interactive_git,
            SafetyCategory::DangerousFiles => enabled.dangerous_files,
            SafetyCategory::GitHistory => enabled.git_history,
            SafetyCategory::CredentialAccess => enabled.credential_access,
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fired safety rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyViolation {
    pub category: SafetyCategory,
    pub message: &'static str,
}

struct SafetyRule {
    category: SafetyCategory,
    pattern: &'static str,
    unless: Option<&'static str>,
    message: &'static str,
}

const BRANCH_SWITCH_MSG: &str = "ABSOLUTELY NOT. Switching branches corrupts worktrees. \
    Stay on your assigned branch. Use `git switch -C <name>` to create a new branch.";
const FORCE_PUSH_MSG: &str = "NO. Force push is destructive. Ask the user.";
const PUSH_MAIN_MSG: &str = "Do not push directly to main/master. Use a pull request.";

use SafetyCategory::*;

#[rustfmt::skip]
const SAFETY_RULES: &[SafetyRule] = &[
    SafetyRule { category: CiBypass, pattern: r"(?i)--no-verify", unless: None,
        message: "NO. Do not bypass pre-commit hooks. Fix the issue." },
    SafetyRule { category: CiBypass, pattern: r"(?i)--no-gpg-sign", unless: None,
        message: "Do not skip GPG signing." },
    SafetyRule { category: CiBypass, pattern: r"(?i)--skip-hooks", unless: None,
        message: "Do not skip hooks." },
    SafetyRule { category: CiBypass, pattern: r"(?i)HUSKY\s*=\s*0", unless: None,
        message: "Do not disable Husky." },
    SafetyRule { category: CiBypass, pattern: r"(?i)PRE_COMMIT_ALLOW_NO_CONFIG", unless: None,
        message: "Do not bypass pre-commit." },
    SafetyRule { category: CiBypass, pattern: r"(?i)(?:sed|awk|perl|ed|cat\s*>|echo\s.*>|tee)\s.*pre.commit", unless: None,
        message: "Do not modify pre-commit hooks. Fix the code, not the safety net." },
    SafetyRule { category: CiBypass, pattern: r"(?i)chmod\s.*pre.commit", unless: None,
        message: "Do not modify pre-commit hook permissions. Fix the code, not the safety net." },

    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+reset\s+--hard", unless: None,
        message: "NO. git reset --hard destroys work. Ask the user first." },
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+clean\s+-f", unless: None,
        message: "NO. git clean -f deletes untracked files. Ask the user." },
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+(?:checkout|co)\s+\.", unless: None,
        message: "NO. git checkout . discards changes. Ask the user." },
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+restore\s+\.", unless: None,
        message: "NO. git restore . discards changes. Ask the user." },
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+push\s+--force", unless: None,
        message: FORCE_PUSH_MSG },
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+push\s+-f\b", unless: None,
        message: FORCE_PUSH_MSG },
    // -d is the safe spelling, so the flag is matched case-sensitively.
    SafetyRule { category: DestructiveGit, pattern: r"(?i)git\s+branch\s+(?-i:-D)\b", unless: None,
        message: "NO. git branch -D force-deletes branches. Use -d instead." },

    // Creating a branch with -c/-C/--create is fine.
    SafetyRule { category: BranchSwitching, pattern: r"(?i)git\s+(?:switch|sw)\s+\S",
        unless: Some(r"(?i)git\s+(?:switch|sw)\s+(?:-c\b|--create\b)"),
        message: BRANCH_SWITCH_MSG },
    // `checkout <ref> -- <file>` is let through by the allow-list below.
    SafetyRule { category: BranchSwitching, pattern: r"(?i)git\s+(?:checkout|co)\s+[\w\-/]",
        unless: Some(r"(?i)git\s+(?:checkout|co)\s+--"),
        message: BRANCH_SWITCH_MSG },
    SafetyRule { category: BranchSwitching, pattern: r"(?i)git\s+(?:checkout|co)\s+\S+\s+--\s+\.", unless: None,
        message: "ABSOLUTELY NOT. Checking out all files from another ref destroys the worktree. \
                  Stay on your assigned branch." },
    SafetyRule { category: BranchSwitching, pattern: r"(?i)git\s+push\s+\S+\s+(main|master)\b", unless: None,
        message: PUSH_MAIN_MSG },
    SafetyRule { category: BranchSwitching, pattern: r"(?i)git\s+push\s+\S+\s+\S+:(main|master)\b", unless: None,
        message: PUSH_MAIN_MSG },

    SafetyRule { category: InteractiveGit, pattern: r"(?i)git\s+rebase\s+-i", unless: None,
        message: "Interactive rebase won't work in this environment." },
    SafetyRule { category: InteractiveGit, pattern: r"(?i)git\s+add\s+-i", unless: None,
        message: "Interactive add won't work in this environment." },
    SafetyRule { category: InteractiveGit, pattern: r"(?i)git\s+add\s+-p", unless: None,
        message: "Patch add won't work in this environment." },

    SafetyRule { category: DangerousFiles, pattern: r"(?i)rm\s+-rf\s+/", unless: None,
        message: "NO. Absolutely not." },
    SafetyRule { category: DangerousFiles, pattern: r"(?i)rm\s+-rf\s+~", unless: None,
        message: "NO. Do not delete home directory." },
    SafetyRule { category: DangerousFiles, pattern: r"(?i)rm\s+-rf\s+\*", unless: None,
        message: "NO. Do not delete everything." },
    SafetyRule { category: DangerousFiles, pattern: r"(?i)>\s*/dev/sd", unless: None,
        message: "NO. Do not write to block devices." },

    SafetyRule { category: GitHistory, pattern: r"(?i)git\s+log\b",
        unless: Some(r"(?i)git\s+log\b.*--oneline\b"),
        message: "Don't dig through git history for bugs. Read the actual code." },
    SafetyRule { category: GitHistory, pattern: r"(?i)git\s+blame\b", unless: None,
        message: "Don't use git blame. Read the actual code." },

    SafetyRule { category: CredentialAccess, pattern: r"(?i)cat\s+.*\.env\b", unless: None,
        message: "Do not cat .env files. They contain secrets." },
    SafetyRule { category: CredentialAccess, pattern: r"(?i)cat\s+.*credentials", unless: None,
        message: "Do not cat credential files." },
    SafetyRule { category: CredentialAccess, pattern: r"(?i)cat\s+.*\.pem\b", unless: None,
        message: "Do not cat private keys." },
    SafetyRule { category: CredentialAccess, pattern: r"(?i)cat\s+.*_rsa\b", unless: None,
        message: "Do not cat SSH keys." },
];

/// Overrides every safety rule.
const SAFETY_ALLOWED: &[RuleSpec] = &[
    (r"(?i)git\s+diff\b", Some(r"(?i)git\s+diff\b.*HEAD~")),
    (r"(?i)git\s+status\b", None),
    (r"(?i)git\s+log\s+--oneline\b", None),
    // restore a file from a ref, but not `-- .`
    (
        r"(?i)git\s+(?:checkout|co)\s+\S+\s+--\s+\S",
        Some(r"(?i)git\s+(?:checkout|co)\s+\S+\s+--\s+\.(?:\s|$)"),
    ),
];

static BUILTIN_SAFETY: LazyLock<SafetyRules> =
    LazyLock::new(|| SafetyRules::compile().expect("builtin safety rules compile"));

/// Category rules with an allow-list override.
#[derive(Debug, Clone)]
pub struct SafetyRules {
    allowed: RuleSet,
    rules: RuleSet,
    meta: Vec<SafetyViolation>,
}

impl SafetyRules {
    fn compile() -> Result<Self> {
        let specs: Vec<RuleSpec> = SAFETY_RULES.iter().map(|r| (r.pattern, r.unless)).collect();
        Ok(Self {
            allowed: RuleSet::new(SAFETY_ALLOWED)?,
            rules: RuleSet::new(&specs)?,
            meta: SAFETY_RULES
                .iter()
                .map(|r| SafetyViolation {
                    category: r.category,
                    message: r.message,
                })
                .collect(),
        })
    }

    pub fn builtin() -> &'static SafetyRules {
        &BUILTIN_SAFETY
    }

    /// First violation among enabled categories, in table order.
    pub fn check(&self, command: &str, enabled: &SafetyCategories) -> Option<SafetyViolation> {
        if self.allowed.is_match(command) {
            return None;
        }
        self.rules
            .matches(command)
            .map(|i| &self.meta[i])
            .find(|v| v.category.is_enabled(enabled))
            .cloned()
    }
}
