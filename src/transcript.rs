//! Newline-delimited JSON transcript parsing.
//!
//! Three record shapes are accepted:
//! - `{"type": "user"|"assistant", "message": {"role", "content"}}`
//! - `{"role": "user"|"assistant", "content": ...}`
//! - `{"type": "human", "message": ...}` (legacy)
//!
//! `content` is either a string or a list of blocks (`text`, `tool_use`,
//! `tool_result`). Malformed lines are skipped.

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::Result;

/// Records considered when building a classification excerpt.
pub const EXCERPT_RECORDS: usize = 10;
/// Per-message cap inside an excerpt.
pub const EXCERPT_SNIPPET_CHARS: usize = 500;
/// Total excerpt budget.
pub const EXCERPT_BUDGET_CHARS: usize = 2000;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w./-]+)").expect("static mention pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Other,
}

impl Role {
    fn parse(s: &str) -> Self {
        match s {
            "user" | "human" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }
}

/// A `tool_use` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: Option<String>,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    /// Stable identity of the action, used to spot repeats.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.name, self.input)
    }
}

/// A `tool_result` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: Option<String>,
    pub is_error: bool,
    pub text: String,
}

/// One parsed transcript record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub role: Role,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
}

impl Entry {
    fn from_record(record: &Value) -> Option<Self> {
        let kind = record.get("type").and_then(Value::as_str);
        let (role, content) = match record.get("message") {
            Some(Value::Object(message)) => {
                let role = message
                    .get("role")
                    .and_then(Value::as_str)
                    .or(kind)
                    .unwrap_or_default();
                (role, message.get("content").cloned().unwrap_or(Value::Null))
            }
            Some(Value::String(text)) => (kind.unwrap_or_default(), Value::String(text.clone())),
            _ => {
                let role = record
                    .get("role")
                    .and_then(Value::as_str)
                    .or(kind)
                    .unwrap_or_default();
                (role, record.get("content").cloned().unwrap_or(Value::Null))
            }
        };

        let role = Role::parse(role);
        if role == Role::Other {
            return None;
        }

        let mut entry = Entry {
            role,
            text: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        };

        match content {
            Value::String(text) => entry.text = text,
            Value::Array(blocks) => {
                let mut texts = Vec::new();
                for block in &blocks {
                    match block.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                texts.push(text.to_string());
                            }
                        }
                        Some("tool_use") => entry.tool_calls.push(ToolCall {
                            id: str_field(block, "id"),
                            name: str_field(block, "name").unwrap_or_default(),
                            input: block.get("input").cloned().unwrap_or(Value::Null),
                        }),
                        Some("tool_result") => entry.tool_results.push(ToolResult {
                            tool_use_id: str_field(block, "tool_use_id"),
                            is_error: block
                                .get("is_error")
                                .and_then(Value::as_bool)
                                .unwrap_or(false),
                            text: block_text(block.get("content")),
                        }),
                        _ => {}
                    }
                }
                entry.text = texts.join("\n");
            }
            Value::Object(ref block) if block.get("type").and_then(Value::as_str) == Some("text") => {
                entry.text = block
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            Value::Null => {}
            other => entry.text = other.to_string(),
        }

        Some(entry)
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

/// Text of a `tool_result` content field (string or list of text blocks).
fn block_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A parsed conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut skipped = 0usize;
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(record) => Entry::from_record(&record),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(skipped, "skipped malformed transcript lines");
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `n` records.
    pub fn window(&self, n: usize) -> &[Entry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// User-authored text, skipping records that only carry tool results.
    pub fn user_messages(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.role == Role::User && !e.text.trim().is_empty())
            .map(|e| e.text.as_str())
    }

    pub fn first_user_message(&self) -> Option<&str> {
        self.user_messages().next()
    }

    /// Latest non-empty assistant text within the last `n` records.
    pub fn last_assistant_in(&self, n: usize) -> Option<&str> {
        self.window(n)
            .iter()
            .rev()
            .find(|e| e.role == Role::Assistant && !e.text.trim().is_empty())
            .map(|e| e.text.as_str())
    }

    /// `@path` mentions across all user messages, first occurrence order.
    pub fn mentions(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for text in self.user_messages() {
            for mention in extract_mentions(text) {
                if !seen.contains(&mention) {
                    seen.push(mention);
                }
            }
        }
        seen
    }

    /// Recent conversation as `role: text` lines, newest kept first when the
    /// budget runs out, returned in chronological order.
    pub fn excerpt(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut used = 0usize;
        for entry in self.window(EXCERPT_RECORDS).iter().rev() {
            if entry.text.is_empty() {
                continue;
            }
            let snippet = format!(
                "{}: {}",
                entry.role.as_str(),
                truncate_chars(&entry.text, EXCERPT_SNIPPET_CHARS)
            );
            let len = snippet.chars().count();
            if used + len > EXCERPT_BUDGET_CHARS {
                break;
            }
            used += len;
            parts.push(snippet);
        }
        parts.reverse();
        parts.join("\n")
    }
}

/// Excerpt for a transcript file. Read errors yield `None`.
pub fn excerpt_from_path(path: &Path) -> Option<String> {
    match Transcript::load(path) {
        Ok(transcript) => Some(transcript.excerpt()).filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "transcript unavailable for context");
            None
        }
    }
}

pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// Mentions that resolve to an existing file under `base`.
pub fn existing_mentions(mentions: &[String], base: &Path) -> Vec<(String, PathBuf)> {
    mentions
        .iter()
        .filter_map(|m| {
            let path = if Path::new(m).is_absolute() {
                PathBuf::from(m)
            } else {
                base.join(m)
            };
            path.is_file().then(|| (m.clone(), path))
        })
        .collect()
}

pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(records: &[Value]) -> String {
        records
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parses_all_record_shapes() {
        let raw = lines(&[
            json!({"type": "user", "message": {"role": "user", "content": "build it"}}),
            json!({"role": "assistant", "content": [{"type": "text", "text": "on it"}]}),
            json!({"type": "human", "message": "legacy hello"}),
            json!({"type": "summary", "summary": "ignored"}),
        ]);
        let t = Transcript::parse(&raw);
        assert_eq!(t.entries().len(), 3);
        assert_eq!(t.first_user_message(), Some("build it"));
        assert_eq!(t.last_assistant_in(10), Some("on it"));
        assert_eq!(t.user_messages().count(), 2);
    }

    #[test]
    fn last_assistant_stays_inside_window() {
        let raw = lines(&[
            json!({"role": "assistant", "content": "old reply"}),
            json!({"role": "user", "content": "next"}),
            json!({"role": "assistant", "content": "   "}),
        ]);
        let t = Transcript::parse(&raw);
        assert_eq!(t.last_assistant_in(3), Some("old reply"));
        assert_eq!(t.last_assistant_in(2), None);
    }

    #[test]
    fn skips_malformed_lines() {
        let raw = format!(
            "{}\nnot json\n\n{}",
            json!({"role": "user", "content": "a"}),
            json!({"role": "assistant", "content": "b"})
        );
        assert_eq!(Transcript::parse(&raw).entries().len(), 2);
    }

    #[test]
    fn collects_tool_blocks() {
        let raw = lines(&[
            json!({"type": "assistant", "message": {"role": "assistant", "content": [
                {"type": "tool_use", "id": "t1", "name": "Bash", "input": {"command": "cargo test"}}
            ]}}),
            json!({"type": "user", "message": {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "t1", "is_error": true,
                 "content": [{"type": "text", "text": "error[E0425]"}]}
            ]}}),
        ]);
        let t = Transcript::parse(&raw);
        let call = &t.entries()[0].tool_calls[0];
        assert_eq!(call.id.as_deref(), Some("t1"));
        assert_eq!(call.signature(), r#"Bash:{"command":"cargo test"}"#);
        let result = &t.entries()[1].tool_results[0];
        assert!(result.is_error);
        assert_eq!(result.text, "error[E0425]");
        // Tool-result-only records are not user messages.
        assert_eq!(t.user_messages().count(), 0);
    }

    #[test]
    fn excerpt_respects_budget_and_order() {
        let long = "x".repeat(900);
        let records: Vec<Value> = (0..12)
            .map(|i| json!({"role": if i % 2 == 0 { "user" } else { "assistant" }, "content": format!("{i}{long}")}))
            .collect();
        let excerpt = Transcript::parse(&lines(&records)).excerpt();
        let parts: Vec<&str> = excerpt.lines().collect();

        // Each snippet is ~510 chars, so only three fit in 2000.
        assert_eq!(parts.len(), 3);
        assert!(parts[0].starts_with("assistant: 9"));
        assert!(parts[2].starts_with("assistant: 11"));
        assert!(excerpt.chars().count() <= EXCERPT_BUDGET_CHARS + 2);
    }

    #[test]
    fn mentions_are_deduplicated() {
        let raw = lines(&[
            json!({"role": "user", "content": "follow @docs/plan.md and @CLAUDE.md."}),
            json!({"role": "user", "content": "again @docs/plan.md"}),
        ]);
        assert_eq!(
            Transcript::parse(&raw).mentions(),
            vec!["docs/plan.md".to_string(), "CLAUDE.md".to_string()]
        );
    }

    #[test]
    fn existing_mentions_filters_missing_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("plan.md"), "# plan").unwrap();
        let found = existing_mentions(&["plan.md".into(), "gone.md".into()], tmp.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "plan.md");
    }

    #[test]
    fn excerpt_from_missing_path_is_none() {
        assert!(excerpt_from_path(Path::new("/nonexistent/bdb/transcript.jsonl")).is_none());
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
