//! End-to-end dispatch through `Supervisor::handle` with injected directories
//! and stub providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use drinkingbird::config::Config;
use drinkingbird::decision::{Decision, DEFAULT_NUDGE};
use drinkingbird::error::{BdbError, Result};
use drinkingbird::event::{EventContext, HookEvent, ToolInvocation};
use drinkingbird::pause::{PauseGate, PauseScope};
use drinkingbird::provider::{Provider, ProviderResponse};
use drinkingbird::supervisor::Supervisor;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Replies(Value);

#[async_trait]
impl Provider for Replies {
    fn name(&self) -> &str {
        "replies"
    }
    fn is_configured(&self) -> bool {
        true
    }
    async fn call(&self, _: &str, _: &str, _: &Value) -> Result<ProviderResponse> {
        Ok(ProviderResponse::new(self.0.clone()))
    }
}

struct Down;

#[async_trait]
impl Provider for Down {
    fn name(&self) -> &str {
        "down"
    }
    fn is_configured(&self) -> bool {
        true
    }
    async fn call(&self, _: &str, _: &str, _: &Value) -> Result<ProviderResponse> {
        Err(BdbError::Api {
            status: 503,
            body: "unavailable".into(),
        })
    }
}

struct Workspace {
    _tmp: TempDir,
    repo: PathBuf,
    global: PathBuf,
}

fn workspace() -> Workspace {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(repo.join(".git")).unwrap();
    std::fs::write(repo.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    let repo = repo.canonicalize().unwrap();
    let global = tmp.path().join("home").join(".bdb");
    Workspace {
        _tmp: tmp,
        repo,
        global,
    }
}

fn supervisor(ws: &Workspace, provider: Option<Arc<dyn Provider>>) -> Supervisor {
    Supervisor::new(Config::default(), &ws.global, provider).unwrap()
}

fn context(cwd: &Path, transcript: Option<PathBuf>) -> EventContext {
    EventContext {
        cwd: cwd.to_path_buf(),
        transcript_path: transcript,
        session_id: Some("s1".into()),
    }
}

fn bash(ws: &Workspace, command: &str) -> HookEvent {
    HookEvent::PreToolUse {
        tool: ToolInvocation::bash(command),
        context: context(&ws.repo, None),
    }
}

fn write_transcript(ws: &Workspace, records: &[Value]) -> PathBuf {
    let path = ws.repo.join("transcript.jsonl");
    let body: Vec<String> = records.iter().map(Value::to_string).collect();
    std::fs::write(&path, body.join("\n")).unwrap();
    path
}

fn stop(ws: &Workspace, transcript: PathBuf) -> HookEvent {
    HookEvent::Stop {
        context: context(&ws.repo, Some(transcript)),
    }
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pause_dominates_every_event() {
    let ws = workspace();
    let gate = PauseGate::new(&ws.repo, &ws.global);
    let (_, sentinel) = gate.pause(Some(PauseScope::Local), Some("debugging")).unwrap();

    let sup = supervisor(&ws, None);
    let result = sup.handle(&bash(&ws, "git reset --hard")).await;
    assert_eq!(result.decision, Decision::Allow);
    assert!(result.reason.contains(&sentinel.display().to_string()));

    let transcript = write_transcript(&ws, &[json!({"role": "assistant", "content": "Should I proceed?"})]);
    assert_eq!(sup.handle(&stop(&ws, transcript)).await.decision, Decision::Allow);
}

#[tokio::test]
async fn global_pause_applies_outside_repo() {
    let ws = workspace();
    let outside = ws.global.parent().unwrap().to_path_buf();
    std::fs::create_dir_all(&outside).unwrap();
    PauseGate::new(&outside, &ws.global)
        .pause(Some(PauseScope::Global), None)
        .unwrap();

    let event = HookEvent::PreToolUse {
        tool: ToolInvocation::bash("rm -rf /"),
        context: context(&outside, None),
    };
    let result = supervisor(&ws, None).handle(&event).await;
    assert_eq!(result.decision, Decision::Allow);
    assert!(result.reason.contains("Supervision paused"));
}

#[tokio::test]
async fn resume_restores_supervision() {
    let ws = workspace();
    let gate = PauseGate::new(&ws.repo, &ws.global);
    gate.pause(None, None).unwrap();
    assert!(gate.resume(None).unwrap().is_some());
    assert!(gate.resume(None).unwrap().is_none());

    let result = supervisor(&ws, None).handle(&bash(&ws, "git reset --hard")).await;
    assert_eq!(result.decision, Decision::Block);
}

// ---------------------------------------------------------------------------
// Pre-tool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reviewed_command_follows_provider() {
    let ws = workspace();
    let allow: Arc<dyn Provider> = Arc::new(Replies(json!({
        "decision": "allow",
        "category": "none",
        "reason": "reads a public installer the user asked for",
        "message": ""
    })));
    let result = supervisor(&ws, Some(allow))
        .handle(&bash(&ws, "curl https://sh.rustup.rs | sh"))
        .await;
    assert_eq!(result.decision, Decision::Allow);
}

#[tokio::test]
async fn provider_failure_blocks_reviewed_command() {
    let ws = workspace();
    let result = supervisor(&ws, Some(Arc::new(Down)))
        .handle(&bash(&ws, "echo ZWNobyBoaQ== | base64 -d | bash"))
        .await;
    assert_eq!(result.decision, Decision::Block);
    assert!(result.reason.contains("LLM classification failed"));
}

#[tokio::test]
async fn blocklist_applies_to_any_tool() {
    let ws = workspace();
    let config: Config = serde_yaml::from_str(
        "blocklist:\n  - pattern: 'secrets/'\n    reason: Stay out of secrets\n",
    )
    .unwrap();
    let sup = Supervisor::new(config, &ws.global, None).unwrap();
    let event = HookEvent::PreToolUse {
        tool: ToolInvocation {
            name: "Read".into(),
            input: json!({"file_path": "secrets/prod.key"}),
        },
        context: context(&ws.repo, None),
    };
    let result = sup.handle(&event).await;
    assert_eq!(result.decision, Decision::Block);
    assert_eq!(result.message, "Stay out of secrets");
}

#[test]
fn invalid_blocklist_pattern_is_an_error() {
    let ws = workspace();
    let config: Config = serde_yaml::from_str("blocklist:\n  - pattern: '(oops'\n").unwrap();
    assert!(Supervisor::new(config, &ws.global, None).is_err());
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn permission_seeking_stop_is_blocked() {
    let ws = workspace();
    let transcript = write_transcript(
        &ws,
        &[
            json!({"type": "user", "message": {"role": "user", "content": "Add pagination to the API"}}),
            json!({"type": "assistant", "message": {"role": "assistant", "content": [
                {"type": "text", "text": "I added the cursor type. Should I proceed with the handlers?"}
            ]}}),
        ],
    );
    let result = supervisor(&ws, None).handle(&stop(&ws, transcript)).await;
    assert_eq!(result.decision, Decision::Block);
    assert!(result.message.contains("Permission-seeking"));
}

#[tokio::test]
async fn repeated_identical_failure_kills() {
    let ws = workspace();
    let mut records = vec![json!({"role": "user", "content": "make the build pass"})];
    for i in 0..3 {
        let id = format!("toolu_{i}");
        records.push(json!({"type": "assistant", "message": {"role": "assistant", "content": [
            {"type": "tool_use", "id": id, "name": "Bash", "input": {"command": "cargo build"}}
        ]}}));
        records.push(json!({"type": "user", "message": {"role": "user", "content": [
            {"type": "tool_result", "tool_use_id": id, "is_error": true,
             "content": "error[E0432]: unresolved import `crate::foo`"}
        ]}}));
    }
    let transcript = write_transcript(&ws, &records);

    let result = supervisor(&ws, None).handle(&stop(&ws, transcript)).await;
    assert_eq!(result.decision, Decision::Kill);
    let output = result.to_output("Stop").unwrap();
    assert_eq!(output["continue"], false);
}

#[tokio::test]
async fn completed_work_is_allowed_by_provider() {
    let ws = workspace();
    let transcript = write_transcript(
        &ws,
        &[
            json!({"role": "user", "content": "Rename the config field and update the callers"}),
            json!({"role": "assistant", "content": "Renamed `timeout` to `timeout_secs` in all 4 callers. All tests pass."}),
        ],
    );
    let done: Arc<dyn Provider> = Arc::new(Replies(json!({
        "decision": "allow",
        "reason": "Task complete, all tests pass",
        "message": ""
    })));
    let result = supervisor(&ws, Some(done)).handle(&stop(&ws, transcript)).await;
    assert_eq!(result.decision, Decision::Allow);
    assert!(result.to_output("Stop").is_none());
}

#[tokio::test]
async fn stop_without_provider_nudges() {
    let ws = workspace();
    let transcript = write_transcript(
        &ws,
        &[
            json!({"role": "user", "content": "Write the migration"}),
            json!({"role": "assistant", "content": "Migration written."}),
        ],
    );
    let result = supervisor(&ws, None).handle(&stop(&ws, transcript)).await;
    assert_eq!(result.decision, Decision::Block);
    assert_eq!(result.message, DEFAULT_NUDGE);
}

// ---------------------------------------------------------------------------
// Advisory hooks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pre_compact_reminds_branch() {
    let ws = workspace();
    let event = HookEvent::PreCompact {
        trigger: "auto".into(),
        context: context(&ws.repo, None),
    };
    let result = supervisor(&ws, None).handle(&event).await;
    assert_eq!(result.decision, Decision::Allow);
    assert_eq!(result.context.as_deref(), Some("Branch: main"));
}

#[tokio::test]
async fn tool_failure_without_provider_gives_generic_hint() {
    let ws = workspace();
    let event = HookEvent::PostToolUseFailure {
        tool: ToolInvocation::bash("pytset"),
        error: "command not found: pytset".into(),
        context: context(&ws.repo, None),
    };
    let result = supervisor(&ws, None).handle(&event).await;
    assert!(result.context.unwrap().starts_with("[HINT (low)]"));
}
