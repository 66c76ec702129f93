//! Advisory handlers. These never block; they either allow silently or attach
//! context for the agent to read.

use globset::{Glob, GlobSet, GlobSetBuilder};
use schemars::JsonSchema;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Confidence, PreCompactHookConfig};
use crate::decision::HookResult;
use crate::error::{BdbError, Result};
use crate::event::{EventContext, ToolInvocation};
use crate::provider::{self, Provider};
use crate::transcript::{self, Transcript};
use crate::workspace;

const HINT_PROMPT: &str = r#"You are a coach for an AI coding agent that just hit an error.

## Philosophy
Errors are information, not failures. Give a nudge in the right direction and keep momentum going.

## Your Response
Give ONE specific, actionable hint based on the error message. Keep it to 1-2 sentences.

If the error is clear (missing flag, typo, wrong syntax): point to the exact fix.
If the error is ambiguous (unknown command, unclear message): suggest checking --help or docs.
If the error suggests a missing dependency or setup issue: say what needs to be installed or configured.

Always end with brief encouragement: "Try again!", "Keep going!", "Almost there!"

## Confidence Levels
- high: you are certain about the fix
- medium: you have a reasonable guess
- low: you are suggesting exploration

## Response Format
{
  "advice": "your hint + encouragement (1-2 sentences)",
  "confidence": "high" | "medium" | "low"
}"#;

pub const GENERIC_HINT: &str = "[HINT (low)]: Check command syntax and try again! \
    (Note: Configure LLM in ~/.bdb/config.yaml for smarter hints)";

/// Error output sent to the provider is cut to this many characters.
const MAX_ERROR_CHARS: usize = 2000;
const MAX_REFS: usize = 20;
/// Directory depth searched for context files below the workspace root.
const MAX_SCAN_DEPTH: usize = 4;
const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules"];

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)]
enum HintConfidence {
    High,
    Medium,
    Low,
}

#[derive(Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct HintResponse {
    advice: String,
    confidence: HintConfidence,
}

fn parse_confidence(raw: Option<&str>) -> Confidence {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("high") => Confidence::High,
        Some("medium") => Confidence::Medium,
        _ => Confidence::Low,
    }
}

/// Recovery hint for a failed tool call.
pub async fn tool_failure_hint(
    provider: Option<&Arc<dyn Provider>>,
    timeout: Duration,
    threshold: Confidence,
    tool: &ToolInvocation,
    error: &str,
) -> HookResult {
    if error.trim().is_empty() {
        return HookResult::allow("No error output");
    }

    let backend = match provider {
        Some(p) if p.is_configured() => p,
        _ => return HookResult::with_context(GENERIC_HINT),
    };

    let input = tool
        .command()
        .map(String::from)
        .unwrap_or_else(|| tool.input.to_string());
    let prompt = format!(
        "Tool: {}\nCommand/Input: {}\n\nError Output:\n{}",
        tool.name,
        input,
        transcript::truncate_chars(error, MAX_ERROR_CHARS)
    );
    let schema = provider::response_schema::<HintResponse>();

    let response =
        match provider::call_bounded(backend.as_ref(), timeout, HINT_PROMPT, &prompt, &schema)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "hint call failed");
                return HookResult::with_context(GENERIC_HINT);
            }
        };

    let advice = response
        .str_field("advice")
        .filter(|a| !a.trim().is_empty())
        .unwrap_or("Check command syntax and try again!");
    let confidence = parse_confidence(response.str_field("confidence"));

    if confidence < threshold {
        tracing::debug!(%confidence, %threshold, "hint below threshold");
        return HookResult::allow("Confidence below threshold");
    }
    HookResult::with_context(format!("[HINT ({confidence})]: {advice}"))
}

/// Glob matcher over workspace-relative paths.
pub struct ContextFiles {
    set: GlobSet,
}

impl ContextFiles {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| BdbError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| BdbError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self { set })
    }

    /// Matching files under `root`, relative and sorted.
    pub fn find(&self, root: &Path) -> Vec<String> {
        let mut found = Vec::new();
        self.walk(root, root, 0, &mut found);
        found.sort();
        found
    }

    fn walk(&self, root: &Path, dir: &Path, depth: usize, found: &mut Vec<String>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable dir");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let name = entry.file_name();
                if depth < MAX_SCAN_DEPTH && !SKIP_DIRS.iter().any(|s| name == *s) {
                    self.walk(root, &path, depth + 1, found);
                }
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                if self.set.is_match(relative) {
                    found.push(relative.to_string_lossy().into_owned());
                }
            }
        }
    }
}

/// Git position shown at the top of the reminder.
fn git_line(root: &Path) -> Option<String> {
    let branch = workspace::current_branch(root)?;
    let mut line = format!("Branch: {branch}");
    if root.join(workspace::REPO_MARKER).is_file() {
        line.push_str(&format!(" | Worktree: {}", root.display()));
    }
    Some(line)
}

/// Reminder of plan files, user references and git position before compaction.
pub fn compaction_reminder(config: &PreCompactHookConfig, context: &EventContext) -> HookResult {
    let root: PathBuf = workspace::find_workspace_root(&context.cwd)
        .unwrap_or_else(|| context.cwd.clone());

    let files = match ContextFiles::compile(&config.context_patterns) {
        Ok(matcher) => matcher.find(&root),
        Err(e) => {
            tracing::warn!(error = %e, "bad pre_compact.context_patterns");
            Vec::new()
        }
    };

    let refs: Vec<String> = context
        .transcript_path
        .as_deref()
        .and_then(|p| Transcript::load(p).ok())
        .map(|t| {
            transcript::existing_mentions(&t.mentions(), &context.cwd)
                .into_iter()
                .map(|(mention, _)| mention)
                .take(MAX_REFS)
                .collect()
        })
        .unwrap_or_default();

    let mut parts = Vec::new();
    if let Some(line) = git_line(&root) {
        parts.push(line);
    }
    if !files.is_empty() {
        parts.push(format!("Context: {}", files.join(", ")));
    }
    if !refs.is_empty() {
        let refs: Vec<String> = refs.iter().map(|r| format!("@{r}")).collect();
        parts.push(format!("Refs: {}", refs.join(", ")));
    }

    if parts.is_empty() {
        return HookResult::allow("No context to preserve");
    }
    tracing::debug!(files = files.len(), refs = refs.len(), "compaction reminder built");
    HookResult::with_context(parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::provider::ProviderResponse;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct Hint(Value);

    #[async_trait]
    impl Provider for Hint {
        fn name(&self) -> &str {
            "hint"
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn call(&self, _: &str, _: &str, _: &Value) -> Result<ProviderResponse> {
            Ok(ProviderResponse::new(self.0.clone()))
        }
    }

    fn hint_provider(value: Value) -> Arc<dyn Provider> {
        Arc::new(Hint(value))
    }

    #[tokio::test]
    async fn no_error_text_allows() {
        let tool = ToolInvocation::bash("ls");
        let r = tool_failure_hint(None, Duration::from_secs(1), Confidence::Medium, &tool, "  ").await;
        assert_eq!(r.decision, Decision::Allow);
        assert!(r.context.is_none());
    }

    #[tokio::test]
    async fn no_provider_gives_generic_hint() {
        let tool = ToolInvocation::bash("cargo tset");
        let r = tool_failure_hint(
            None,
            Duration::from_secs(1),
            Confidence::Medium,
            &tool,
            "error: no such command",
        )
        .await;
        assert_eq!(r.context.as_deref(), Some(GENERIC_HINT));
    }

    #[tokio::test]
    async fn confident_hint_is_attached() {
        let provider = hint_provider(json!({"advice": "Use `cargo test`. Try again!", "confidence": "high"}));
        let tool = ToolInvocation::bash("cargo tset");
        let r = tool_failure_hint(
            Some(&provider),
            Duration::from_secs(1),
            Confidence::Medium,
            &tool,
            "error: no such command: `tset`",
        )
        .await;
        assert_eq!(
            r.context.as_deref(),
            Some("[HINT (high)]: Use `cargo test`. Try again!")
        );
    }

    #[tokio::test]
    async fn low_confidence_is_dropped() {
        let provider = hint_provider(json!({"advice": "Maybe check --help", "confidence": "low"}));
        let tool = ToolInvocation::bash("frob --x");
        let r = tool_failure_hint(
            Some(&provider),
            Duration::from_secs(1),
            Confidence::Medium,
            &tool,
            "unknown flag",
        )
        .await;
        assert_eq!(r.decision, Decision::Allow);
        assert!(r.context.is_none());
    }

    #[test]
    fn reminder_lists_files_refs_and_branch() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref: refs/heads/feature/x\n").unwrap();
        std::fs::create_dir_all(root.join("docs/plans")).unwrap();
        std::fs::write(root.join("docs/plans/phase1.md"), "plan").unwrap();
        std::fs::write(root.join("CLAUDE.md"), "rules").unwrap();
        std::fs::write(root.join("notes.txt"), "n").unwrap();

        let transcript = root.join("t.jsonl");
        std::fs::write(
            &transcript,
            json!({"role": "user", "content": "follow @notes.txt and @gone.md"}).to_string(),
        )
        .unwrap();

        let context = EventContext {
            cwd: root.to_path_buf(),
            transcript_path: Some(transcript),
            session_id: None,
        };
        let r = compaction_reminder(&PreCompactHookConfig::default(), &context);
        let text = r.context.unwrap();
        assert!(text.starts_with("Branch: feature/x"));
        assert!(text.contains("Context: CLAUDE.md, docs/plans/phase1.md"));
        assert!(text.contains("Refs: @notes.txt"));
        assert!(!text.contains("gone.md"));
    }

    #[test]
    fn nothing_to_remind_allows() {
        let tmp = TempDir::new().unwrap();
        let context = EventContext {
            cwd: tmp.path().to_path_buf(),
            transcript_path: None,
            session_id: None,
        };
        let r = compaction_reminder(&PreCompactHookConfig::default(), &context);
        assert_eq!(r.decision, Decision::Allow);
        assert!(r.context.is_none());
    }

    #[test]
    fn invalid_glob_is_rejected() {
        assert!(ContextFiles::compile(&["docs/[".to_string()]).is_err());
    }
}
