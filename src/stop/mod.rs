//! Stop-intent analysis: is the agent done, quitting early, or stuck?
//!
//! Checks run cheapest first. A looping tail kills; a stop message matching a
//! known avoidance phrase blocks; otherwise a provider judges the window.
//! Without a usable provider the agent is nudged back to work.

pub mod intents;
pub mod loops;
pub mod prompts;

use serde::Serialize;
use schemars::JsonSchema;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::redact;
use crate::config::StopHookConfig;
use crate::decision::{Decision, HookResult, DEFAULT_NUDGE};
use crate::provider::{self, Provider, ProviderResponse};
use crate::transcript::{self, Transcript};

use intents::IntentDetector;

/// Referenced files are cut to this many characters in the prompt.
pub const MAX_REFERENCED_CHARS: usize = 10_000;

/// Standard files that do not count as plan documents.
const AMBIENT_DOCS: &[&str] = &["CLAUDE.md", "AGENTS.md", "README.md"];

const PLAN_NUDGE: &str = "Stick to the plan. Do it right. The reward at the end is worth it.";

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)]
enum StopDecisionField {
    Allow,
    Block,
    Kill,
}

#[derive(Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct StopResponse {
    decision: StopDecisionField,
    reason: String,
    message: String,
}

/// Outcome for one stop attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopVerdict {
    pub decision: Decision,
    pub reason: String,
    pub message: String,
}

impl StopVerdict {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: reason.into(),
            message: String::new(),
        }
    }

    fn block(reason: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            decision: Decision::Block,
            reason: reason.into(),
            message: if message.trim().is_empty() {
                DEFAULT_NUDGE.to_string()
            } else {
                message
            },
        }
    }

    fn kill(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            decision: Decision::Kill,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

impl From<StopVerdict> for HookResult {
    fn from(v: StopVerdict) -> Self {
        match v.decision {
            Decision::Allow => HookResult::allow(v.reason),
            Decision::Block => HookResult::block_with_reason(v.message, v.reason),
            Decision::Kill => {
                let mut result = HookResult::kill(v.message);
                if !v.reason.is_empty() {
                    result.reason = v.reason;
                }
                result
            }
        }
    }
}

/// A user-referenced file that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub mention: String,
    pub path: PathBuf,
}

impl Reference {
    fn is_plan_document(&self) -> bool {
        let name = Path::new(&self.mention)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.mention);
        !AMBIENT_DOCS.contains(&name)
    }
}

pub struct StopDecisionEngine {
    config: StopHookConfig,
    provider: Option<Arc<dyn Provider>>,
    timeout: Duration,
}

impl StopDecisionEngine {
    pub fn new(
        config: StopHookConfig,
        provider: Option<Arc<dyn Provider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            config,
            provider,
            timeout,
        }
    }

    pub async fn evaluate(&self, transcript_path: Option<&Path>, cwd: &Path) -> StopVerdict {
        let transcript = match transcript_path.map(Transcript::load) {
            Some(Ok(t)) => t,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "cannot read transcript for stop decision");
                Transcript::default()
            }
            None => Transcript::default(),
        };
        self.evaluate_transcript(&transcript, cwd).await
    }

    pub async fn evaluate_transcript(&self, transcript: &Transcript, cwd: &Path) -> StopVerdict {
        if transcript.is_empty() {
            return StopVerdict::block("empty or unreadable transcript", DEFAULT_NUDGE);
        }

        let window = transcript.window(self.config.window_messages);

        if let Some(report) = loops::detect_loop(window, loops::LOOP_THRESHOLD) {
            tracing::info!(
                repeats = report.repeats,
                signature = %report.signature,
                "agent is looping"
            );
            return StopVerdict::kill(
                format!(
                    "same failing action repeated {} times: {}",
                    report.repeats, report.signature
                ),
                format!(
                    "Stopping: the same action failed {} times in a row with the same error. \
                     Ending the session so a human can take a look.",
                    report.repeats
                ),
            );
        }

        let references = resolve_references(transcript, cwd);
        let last_assistant = transcript.last_assistant_in(self.config.window_messages);

        if let Some(found) =
            last_assistant.and_then(|text| IntentDetector::builtin().detect(text, &self.config))
        {
            let reason = found.describe();
            tracing::info!(reason = %reason, "stop blocked by pattern");
            let message = with_references(
                &format!("{PLAN_NUDGE}\n\nBlocked: {reason}"),
                &references,
            );
            return StopVerdict::block(reason, message);
        }

        let backend = match &self.provider {
            Some(p) if p.is_configured() => p,
            _ => {
                return StopVerdict::block(
                    "no provider configured",
                    with_references(DEFAULT_NUDGE, &references),
                )
            }
        };

        let documentation_mode = references.iter().any(Reference::is_plan_document);
        let system_prompt = if documentation_mode {
            prompts::DOCUMENTATION_PROMPT
        } else {
            prompts::INTERACTIVE_PROMPT
        };
        let user_prompt = redact::redact(&build_prompt(transcript, window, &references));
        let schema = provider::response_schema::<StopResponse>();

        let reply = provider::call_bounded(
            backend.as_ref(),
            self.timeout,
            system_prompt,
            &user_prompt,
            &schema,
        )
        .await;

        match reply {
            Ok(response) => self.interpret(&response, documentation_mode, &references),
            Err(e) => {
                tracing::warn!(error = %e, "stop supervisor call failed");
                StopVerdict::block(
                    format!("provider failed: {e}"),
                    with_references(DEFAULT_NUDGE, &references),
                )
            }
        }
    }

    fn interpret(
        &self,
        response: &ProviderResponse,
        documentation_mode: bool,
        references: &[Reference],
    ) -> StopVerdict {
        let reason = response.str_field("reason").unwrap_or_default().to_string();
        let message = response.str_field("message").unwrap_or_default();

        match response.str_field("decision") {
            Some("kill") => {
                let text = if message.is_empty() {
                    reason.as_str()
                } else {
                    message
                };
                let text = if text.is_empty() { "Agent terminated" } else { text };
                StopVerdict::kill(reason.clone(), text)
            }
            Some("allow") if !documentation_mode || prompts::allow_is_justified(&reason) => {
                tracing::info!(reason = %reason, "stop allowed");
                StopVerdict::allow(reason)
            }
            Some("allow") => {
                tracing::info!(reason = %reason, "allow not justified, blocking");
                StopVerdict::block(
                    format!("allow overridden: {reason}"),
                    with_references(DEFAULT_NUDGE, references),
                )
            }
            _ => {
                let base = if message.is_empty() { DEFAULT_NUDGE } else { message };
                StopVerdict::block(reason, with_references(base, references))
            }
        }
    }
}

/// `@mentions` from every user message that exist relative to `cwd`.
pub fn resolve_references(transcript: &Transcript, cwd: &Path) -> Vec<Reference> {
    transcript::existing_mentions(&transcript.mentions(), cwd)
        .into_iter()
        .map(|(mention, path)| Reference { mention, path })
        .collect()
}

fn with_references(message: &str, references: &[Reference]) -> String {
    if references.is_empty() {
        return message.to_string();
    }
    let refs = references
        .iter()
        .map(|r| format!("@{}", r.mention))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{message}\n\nReferenced documents: {refs}")
}

fn build_prompt(
    transcript: &Transcript,
    window: &[transcript::Entry],
    references: &[Reference],
) -> String {
    let mut parts = Vec::new();

    let first_user = transcript
        .first_user_message()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("[No user message found]");
    parts.push("=== ORIGINAL INTENT ===".to_string());
    parts.push(first_user.to_string());

    let mut loaded = Vec::new();
    for reference in references {
        match std::fs::read_to_string(&reference.path) {
            Ok(content) => loaded.push((reference, content)),
            Err(e) => tracing::debug!(
                path = %reference.path.display(),
                error = %e,
                "skipping unreadable reference"
            ),
        }
    }
    if !loaded.is_empty() {
        parts.push("\n=== REFERENCED FILES ===".to_string());
        for (reference, content) in loaded {
            parts.push(format!("\n--- @{} ---", reference.mention));
            let cut = transcript::truncate_chars(&content, MAX_REFERENCED_CHARS);
            if cut.len() < content.len() {
                parts.push(format!("{cut}\n... [truncated]"));
            } else {
                parts.push(content);
            }
        }
    }

    let recent: Vec<String> = window
        .iter()
        .filter(|e| !e.text.trim().is_empty() || !e.tool_calls.is_empty())
        .map(|e| {
            let mut line = format!(
                "{}: {}",
                e.role.as_str(),
                transcript::truncate_chars(e.text.trim(), 1000)
            );
            for call in &e.tool_calls {
                line.push_str(&format!(
                    "\n  [tool {}] {}",
                    call.name,
                    transcript::truncate_chars(&call.input.to_string(), 300)
                ));
            }
            line
        })
        .collect();
    if !recent.is_empty() {
        parts.push("\n=== RECENT EXCHANGE ===".to_string());
        parts.extend(recent);
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BdbError, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct Scripted {
        reply: Value,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn call(&self, system: &str, user: &str, _: &Value) -> Result<ProviderResponse> {
            self.prompts
                .lock()
                .unwrap()
                .push(format!("{system}\n----\n{user}"));
            Ok(ProviderResponse::new(self.reply.clone()))
        }
    }

    struct Broken;

    #[async_trait]
    impl Provider for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn call(&self, _: &str, _: &str, _: &Value) -> Result<ProviderResponse> {
            Err(BdbError::Provider {
                reason: "connection refused".into(),
            })
        }
    }

    fn engine(provider: Option<Arc<dyn Provider>>) -> StopDecisionEngine {
        StopDecisionEngine::new(StopHookConfig::default(), provider, Duration::from_secs(5))
    }

    fn conversation(user: &str, assistant: &str) -> Transcript {
        Transcript::parse(&format!(
            "{}\n{}",
            json!({"role": "user", "content": user}),
            json!({"role": "assistant", "content": assistant})
        ))
    }

    #[tokio::test]
    async fn empty_transcript_blocks_with_nudge() {
        let tmp = tempfile::TempDir::new().unwrap();
        let v = engine(None)
            .evaluate(Some(&tmp.path().join("missing.jsonl")), tmp.path())
            .await;
        assert_eq!(v.decision, Decision::Block);
        assert_eq!(v.message, DEFAULT_NUDGE);
    }

    #[tokio::test]
    async fn permission_seeking_lists_references() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs/plan.md"), "# Plan").unwrap();
        let t = conversation(
            "Implement @docs/plan.md and @docs/missing.md",
            "Step one is done. Should I proceed?",
        );

        let v = engine(None).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Block);
        assert!(v.message.starts_with(PLAN_NUDGE));
        assert!(v.message.contains("Blocked: Permission-seeking detected"));
        assert!(v.message.ends_with("Referenced documents: @docs/plan.md"));
    }

    #[tokio::test]
    async fn unjustified_allow_is_overridden_in_documentation_mode() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("spec.md"), "spec").unwrap();
        let provider = Arc::new(Scripted {
            reply: json!({"decision": "allow", "reason": "looks fine", "message": ""}),
            prompts: Mutex::new(vec![]),
        });
        let t = conversation("Build @spec.md", "I implemented the parser.");

        let v = engine(Some(provider.clone())).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Block);
        assert!(v.message.contains("@spec.md"));

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].starts_with(prompts::DOCUMENTATION_PROMPT));
        assert!(prompts[0].contains("--- @spec.md ---\nspec"));
    }

    #[tokio::test]
    async fn interactive_mode_trusts_allow() {
        let tmp = tempfile::TempDir::new().unwrap();
        let provider = Arc::new(Scripted {
            reply: json!({"decision": "allow", "reason": "answered the question", "message": ""}),
            prompts: Mutex::new(vec![]),
        });
        let t = conversation("What does this regex do?", "It matches ISO dates.");

        let v = engine(Some(provider.clone())).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Allow);
        assert!(provider.prompts.lock().unwrap()[0].starts_with(prompts::INTERACTIVE_PROMPT));
    }

    #[tokio::test]
    async fn provider_kill_is_terminal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let provider = Arc::new(Scripted {
            reply: json!({"decision": "kill", "reason": "hallucinating files", "message": ""}),
            prompts: Mutex::new(vec![]),
        });
        let t = conversation("fix the bug", "I updated src/imaginary.rs.");

        let v = engine(Some(provider)).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Kill);
        assert_eq!(v.message, "hallucinating files");
    }

    #[tokio::test]
    async fn provider_failure_blocks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let t = conversation("fix the bug", "I fixed it.");
        let v = engine(Some(Arc::new(Broken))).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Block);
        assert!(v.reason.contains("connection refused"));
        assert_eq!(v.message, DEFAULT_NUDGE);
    }

    #[tokio::test]
    async fn missing_decision_blocks_with_model_message() {
        let tmp = tempfile::TempDir::new().unwrap();
        let provider = Arc::new(Scripted {
            reply: json!({"message": "Write the tests next."}),
            prompts: Mutex::new(vec![]),
        });
        let t = conversation("add tests", "Added the first test.");
        let v = engine(Some(provider)).evaluate_transcript(&t, tmp.path()).await;
        assert_eq!(v.decision, Decision::Block);
        assert_eq!(v.message, "Write the tests next.");
    }

    #[test]
    fn ambient_docs_are_not_plan_documents() {
        let r = |m: &str| Reference {
            mention: m.into(),
            path: PathBuf::from(m),
        };
        assert!(!r("CLAUDE.md").is_plan_document());
        assert!(!r("sub/README.md").is_plan_document());
        assert!(r("docs/plans/phase2.md").is_plan_document());
    }

    #[test]
    fn kill_verdict_keeps_reason() {
        let result: HookResult = StopVerdict::kill("loop", "Stopping.").into();
        assert_eq!(result.decision, Decision::Kill);
        assert_eq!(result.reason, "loop");
        assert_eq!(result.message, "Stopping.");
    }
}
