//! Secret redaction for text that leaves the process in a provider prompt.
//!
//! Two passes: known token prefixes through an aho-corasick automaton, then
//! credential-shaped assignments through a `RegexSet` prefilter.

use aho_corasick::AhoCorasick;
use regex::{Captures, Regex, RegexSet};
use std::sync::LazyLock;

use crate::error::{BdbError, Result};

pub const REDACTED: &str = "<REDACTED>";

const TOKEN_PREFIXES: &[&str] = &[
    "sk-ant-",
    "sk-proj-",
    "ghp_",
    "gho_",
    "ghs_",
    "github_pat_",
    "glpat-",
    "AKIA",
    "ASIA",
    "xoxb-",
    "xoxp-",
    "npm_",
    "pypi-",
    "AGE-SECRET-KEY-",
    "sk_live_",
    "rk_live_",
    "whsec_",
    "hf_",
    "hvs.",
    "AIzaSy",
    "ya29.",
];

/// Group 1 of each pattern is kept; the remainder of the match is replaced.
const CREDENTIAL_PATTERNS: &[&str] = &[
    r"(?i)(bearer\s+)[a-zA-Z0-9_\-\.]{20,}",
    r"(?i)((?:api[_-]?key|token|secret|password|passwd|credentials?)\s*[=:]\s*)\S{8,}",
    r"(?i)((?:postgres|mysql|mongodb|redis|amqp)://[^\s:/]+:)[^\s@]+@",
    r"(?i)((?:--password|--token|--secret|--api-key)[\s=]+)\S{8,}",
    r"(-----BEGIN [A-Z ]*PRIVATE KEY-----)[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----",
];

static DEFAULT_REDACTOR: LazyLock<Redactor> = LazyLock::new(|| {
    Redactor::new(TOKEN_PREFIXES, CREDENTIAL_PATTERNS).expect("static redaction patterns")
});

pub struct Redactor {
    prefixes: AhoCorasick,
    set: RegexSet,
    patterns: Vec<Regex>,
}

impl Redactor {
    pub fn new(prefixes: &[&str], patterns: &[&str]) -> Result<Self> {
        let automaton = AhoCorasick::new(prefixes).map_err(|e| BdbError::InvalidPattern {
            pattern: prefixes.join(", "),
            reason: e.to_string(),
        })?;
        let set = RegexSet::new(patterns).map_err(|e| BdbError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| BdbError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            prefixes: automaton,
            set,
            patterns,
        })
    }

    pub fn builtin() -> &'static Redactor {
        &DEFAULT_REDACTOR
    }

    pub fn redact(&self, input: &str) -> String {
        let prefixed = self.redact_prefixed(input);
        self.redact_patterns(&prefixed)
    }

    fn redact_prefixed(&self, input: &str) -> String {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for mat in self.prefixes.find_iter(input) {
            let start = mat.start();
            // Prefix must begin a token, so `stop_hf_x` is left alone.
            let at_boundary = input[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_');
            if !at_boundary {
                continue;
            }
            let rest = &input[start..];
            let len = rest.find(is_token_end).unwrap_or(rest.len());
            if len > mat.len() {
                ranges.push((start, start + len));
            }
        }

        let mut out = input.to_string();
        for (start, end) in merge(ranges).into_iter().rev() {
            out.replace_range(start..end, REDACTED);
        }
        out
    }

    fn redact_patterns(&self, input: &str) -> String {
        let mut out = input.to_string();
        for idx in self.set.matches(input).iter() {
            out = self.patterns[idx]
                .replace_all(&out, |caps: &Captures| match caps.get(1) {
                    Some(keep) => format!("{}{REDACTED}", keep.as_str()),
                    None => REDACTED.to_string(),
                })
                .into_owned();
        }
        out
    }
}

fn is_token_end(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | ',' | ';' | '}' | ']' | ')' | '`' | '@')
}

fn merge(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Redact with the built-in tables.
pub fn redact(input: &str) -> String {
    Redactor::builtin().redact(input)
}
