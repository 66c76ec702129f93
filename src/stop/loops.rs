//! Loop detection over the tail of a transcript window.
//!
//! An attempt is a tool call paired with its result. The agent is looping
//! when the trailing attempts are the same call failing with the same error.

use std::collections::VecDeque;

use crate::transcript::{Entry, ToolCall};

/// Identical failures needed before a session is ended.
pub const LOOP_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub signature: String,
    pub failed: bool,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub signature: String,
    pub repeats: usize,
    pub error: String,
}

/// Pair calls with results by `tool_use_id`, falling back to call order.
pub fn attempts(window: &[Entry]) -> Vec<Attempt> {
    let mut pending: VecDeque<&ToolCall> = VecDeque::new();
    let mut out = Vec::new();

    for entry in window {
        pending.extend(entry.tool_calls.iter());
        for result in &entry.tool_results {
            let by_id = result.tool_use_id.as_deref().and_then(|id| {
                pending
                    .iter()
                    .position(|call| call.id.as_deref() == Some(id))
            });
            let call = match by_id {
                Some(pos) => pending.remove(pos),
                None => pending.pop_front(),
            };
            // Results for calls outside the window cannot be attributed.
            if let Some(call) = call {
                out.push(Attempt {
                    signature: call.signature(),
                    failed: result.is_error,
                    error: result.text.trim().to_string(),
                });
            }
        }
    }
    out
}

/// Trailing run of identical failures, if it reaches `threshold`.
pub fn detect_loop(window: &[Entry], threshold: usize) -> Option<LoopReport> {
    let attempts = attempts(window);
    let last = attempts.last().filter(|a| a.failed)?;
    let repeats = attempts
        .iter()
        .rev()
        .take_while(|a| a.failed && a.signature == last.signature && a.error == last.error)
        .count();

    (repeats >= threshold.max(1)).then(|| LoopReport {
        signature: last.signature.clone(),
        repeats,
        error: last.error.clone(),
    })
}
