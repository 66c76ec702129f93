use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The three possible verdicts for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Block,
    /// Terminal: the caller should end the agent session, not just deny one action.
    Kill,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Block => write!(f, "block"),
            Decision::Kill => write!(f, "kill"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(Decision::Allow),
            "block" => Ok(Decision::Block),
            "kill" => Ok(Decision::Kill),
            _ => Err(format!("unknown decision: {s}")),
        }
    }
}

/// Category of a fuzzy-review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GitHistory,
    Obfuscation,
    RemoteExecution,
    Other,
    None,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::GitHistory => "git_history",
            Category::Obfuscation => "obfuscation",
            Category::RemoteExecution => "remote_execution",
            Category::Other => "other",
            Category::None => "none",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "git_history" => Ok(Category::GitHistory),
            "obfuscation" => Ok(Category::Obfuscation),
            "remote_execution" => Ok(Category::RemoteExecution),
            "other" => Ok(Category::Other),
            "none" => Ok(Category::None),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Outcome of fuzzy review for one command.
///
/// `is_blocked` is true iff the underlying decision was `block`, and `message`
/// is never empty when blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_blocked: bool,
    pub category: Category,
    pub reason: String,
    pub message: String,
}

impl ClassificationResult {
    pub fn allowed(category: Category, reason: impl Into<String>) -> Self {
        Self {
            is_blocked: false,
            category,
            reason: reason.into(),
            message: String::new(),
        }
    }

    pub fn blocked(
        category: Category,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Command blocked by safety review.".to_string();
        }
        Self {
            is_blocked: true,
            category,
            reason: reason.into(),
            message,
        }
    }
}

/// Fallback message for block/kill results built without agent-facing text.
pub const DEFAULT_NUDGE: &str = "Great work! Keep going.";

/// The uniform output of the supervisor for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
    pub decision: Decision,

    /// Why the decision was made (for logs and `bdb test`).
    pub reason: String,

    /// Text shown to the agent. Non-empty for block and kill.
    pub message: String,

    /// Advisory text injected into the agent's context on allow.
    pub context: Option<String>,
}

impl HookResult {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: reason.into(),
            message: String::new(),
            context: None,
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        let message = non_empty(message.into());
        Self {
            decision: Decision::Block,
            reason: message.clone(),
            message,
            context: None,
        }
    }

    pub fn block_with_reason(message: impl Into<String>, reason: impl Into<String>) -> Self {
        let message = non_empty(message.into());
        let reason = reason.into();
        Self {
            decision: Decision::Block,
            reason: if reason.is_empty() {
                message.clone()
            } else {
                reason
            },
            message,
            context: None,
        }
    }

    pub fn kill(message: impl Into<String>) -> Self {
        let message = non_empty(message.into());
        Self {
            decision: Decision::Kill,
            reason: message.clone(),
            message,
            context: None,
        }
    }

    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: "advisory context attached".to_string(),
            message: String::new(),
            context: Some(context.into()),
        }
    }

    /// Render the hook protocol JSON the harness reads from stdout.
    ///
    /// Returns `None` for a plain allow, which is signalled by empty output.
    pub fn to_output(&self, event_name: &str) -> Option<Value> {
        match self.decision {
            Decision::Block => Some(json!({
                "decision": "block",
                "reason": self.message,
            })),
            Decision::Kill => Some(json!({
                "continue": false,
                "stopReason": self.message,
            })),
            Decision::Allow => self.context.as_ref().map(|ctx| {
                json!({
                    "hookSpecificOutput": {
                        "hookEventName": event_name,
                        "additionalContext": ctx,
                    }
                })
            }),
        }
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        DEFAULT_NUDGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_output_uses_message() {
        let result = HookResult::block("Do not force push.");
        let out = result.to_output("PreToolUse").unwrap();
        assert_eq!(out["decision"], "block");
        assert_eq!(out["reason"], "Do not force push.");
    }

    #[test]
    fn kill_is_distinct_from_block() {
        let out = HookResult::kill("looping").to_output("Stop").unwrap();
        assert_eq!(out["continue"], false);
        assert_eq!(out["stopReason"], "looping");
        assert!(out.get("decision").is_none());
    }

    #[test]
    fn plain_allow_has_no_output() {
        assert!(HookResult::allow("fine").to_output("Stop").is_none());
    }

    #[test]
    fn context_allow_renders_additional_context() {
        let out = HookResult::with_context("[HINT (high)]: retry")
            .to_output("PostToolUseFailure")
            .unwrap();
        assert_eq!(
            out["hookSpecificOutput"]["hookEventName"],
            "PostToolUseFailure"
        );
        assert_eq!(
            out["hookSpecificOutput"]["additionalContext"],
            "[HINT (high)]: retry"
        );
    }

    #[test]
    fn empty_block_message_gets_default_nudge() {
        let result = HookResult::block("   ");
        assert_eq!(result.message, DEFAULT_NUDGE);
        let blocked = ClassificationResult::blocked(Category::Other, "x", "");
        assert!(!blocked.message.is_empty());
    }

    #[test]
    fn category_parses_snake_case() {
        assert_eq!(
            "remote_execution".parse::<Category>().unwrap(),
            Category::RemoteExecution
        );
        assert!("bogus".parse::<Category>().is_err());
        assert_eq!(Category::GitHistory.to_string(), "git_history");
    }
}
