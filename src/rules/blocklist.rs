use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::config::BlocklistEntry;
use crate::error::{BdbError, Result};

/// User-configured patterns, matched case-insensitively against the
/// serialized tool input.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    entries: Vec<(BlocklistEntry, Regex)>,
}

impl Blocklist {
    pub fn compile(entries: &[BlocklistEntry]) -> Result<Self> {
        let entries = entries
            .iter()
            .map(|entry| -> Result<(BlocklistEntry, Regex)> {
                let regex = RegexBuilder::new(&entry.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| BdbError::InvalidPattern {
                        pattern: entry.pattern.clone(),
                        reason: e.to_string(),
                    })?;
                Ok((entry.clone(), regex))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reason of the first entry that applies to `tool_name` and matches.
    pub fn check(&self, tool_name: &str, tool_input: &Value) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let serialized = tool_input.to_string();
        self.entries
            .iter()
            .filter(|(entry, _)| entry.matches_tool(tool_name))
            .find(|(_, regex)| regex.is_match(&serialized))
            .map(|(entry, _)| entry.reason.as_str())
    }
}
