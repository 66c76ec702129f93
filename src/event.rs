use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{BdbError, Result};

/// Raw hook payload as written to stdin by the harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub tool_response: Option<Value>,
    /// Older harnesses send the tool error under `error`.
    #[serde(default)]
    pub error: Option<Value>,
    /// Compaction trigger (`manual` or `auto`).
    #[serde(default, alias = "matcher")]
    pub trigger: Option<String>,
}

/// Fields every event carries.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub cwd: PathBuf,
    pub transcript_path: Option<PathBuf>,
    pub session_id: Option<String>,
}

/// A tool call proposed by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub input: Value,
}

impl ToolInvocation {
    pub fn bash(command: &str) -> Self {
        Self {
            name: "Bash".into(),
            input: serde_json::json!({ "command": command }),
        }
    }

    pub fn is_shell(&self) -> bool {
        self.name == "Bash"
    }

    /// The raw shell command, for Bash calls.
    pub fn command(&self) -> Option<&str> {
        self.input.get("command").and_then(Value::as_str)
    }
}

/// One event from the harness. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    PreToolUse {
        tool: ToolInvocation,
        context: EventContext,
    },
    Stop {
        context: EventContext,
    },
    PostToolUseFailure {
        tool: ToolInvocation,
        error: String,
        context: EventContext,
    },
    PreCompact {
        trigger: String,
        context: EventContext,
    },
}

impl HookEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse { .. } => "PreToolUse",
            HookEvent::Stop { .. } => "Stop",
            HookEvent::PostToolUseFailure { .. } => "PostToolUseFailure",
            HookEvent::PreCompact { .. } => "PreCompact",
        }
    }

    pub fn context(&self) -> &EventContext {
        match self {
            HookEvent::PreToolUse { context, .. }
            | HookEvent::Stop { context }
            | HookEvent::PostToolUseFailure { context, .. }
            | HookEvent::PreCompact { context, .. } => context,
        }
    }

    /// Parse a stdin payload.
    pub fn from_json(raw: &str) -> Result<Self> {
        let input: HookInput = serde_json::from_str(raw)?;
        Self::try_from(input)
    }
}

impl TryFrom<HookInput> for HookEvent {
    type Error = BdbError;

    fn try_from(input: HookInput) -> Result<Self> {
        let cwd = input
            .cwd
            .filter(|c| !c.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let context = EventContext {
            cwd,
            transcript_path: input
                .transcript_path
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            session_id: input.session_id,
        };

        let tool = || -> Result<ToolInvocation> {
            let name = input
                .tool_name
                .clone()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| BdbError::InvalidEvent {
                    reason: format!("{} without tool_name", input.hook_event_name),
                })?;
            Ok(ToolInvocation {
                name,
                input: input.tool_input.clone().unwrap_or(Value::Null),
            })
        };

        match input.hook_event_name.as_str() {
            "PreToolUse" => Ok(HookEvent::PreToolUse {
                tool: tool()?,
                context,
            }),
            "Stop" => Ok(HookEvent::Stop { context }),
            "PostToolUseFailure" => {
                let tool = tool()?;
                let error = input
                    .tool_response
                    .as_ref()
                    .or(input.error.as_ref())
                    .map(extract_error_text)
                    .unwrap_or_default();
                Ok(HookEvent::PostToolUseFailure {
                    tool,
                    error,
                    context,
                })
            }
            "PreCompact" => Ok(HookEvent::PreCompact {
                trigger: input.trigger.unwrap_or_else(|| "auto".into()),
                context,
            }),
            other => Err(BdbError::UnknownEvent {
                name: other.to_string(),
            }),
        }
    }
}

/// Pull the most useful error text out of a tool response.
pub fn extract_error_text(response: &Value) -> String {
    match response {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            for key in ["error", "stderr", "message", "output"] {
                if let Some(val) = map.get(key) {
                    return match val {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                }
            }
            response.to_string()
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
