//! Deterministic command rules.
//!
//! A rule is a primary regex plus an optional `unless` regex. The `unless`
//! pattern is tried at the start of each primary match and cancels only that
//! occurrence, so `git switch -c x && git switch main` still fires on the
//! second switch. Rule tables are compiled once into a [`RuleSet`] that
//! prefilters with a `RegexSet`.

pub mod blocklist;
pub mod safety;

use regex::{Regex, RegexSet};
use std::sync::LazyLock;

use crate::error::{BdbError, Result};

pub use blocklist::Blocklist;
pub use safety::{SafetyCategory, SafetyRules, SafetyViolation};

/// Static rule definition: `(pattern, unless)`.
pub type RuleSpec = (&'static str, Option<&'static str>);

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct CommandRule {
    primary: Regex,
    unless: Option<Regex>,
}

impl CommandRule {
    pub fn new(pattern: &str, unless: Option<&str>) -> Result<Self> {
        Ok(Self {
            primary: compile(pattern)?,
            unless: unless.map(compile).transpose()?,
        })
    }

    /// True when some occurrence of the primary pattern is not cancelled.
    pub fn is_match(&self, command: &str) -> bool {
        let Some(unless) = &self.unless else {
            return self.primary.is_match(command);
        };
        self.primary.find_iter(command).any(|m| {
            unless
                .find_at(command, m.start())
                .map_or(true, |u| u.start() != m.start())
        })
    }

    pub fn pattern(&self) -> &str {
        self.primary.as_str()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| BdbError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// An ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    set: RegexSet,
    rules: Vec<CommandRule>,
}

impl RuleSet {
    pub fn new(specs: &[RuleSpec]) -> Result<Self> {
        let set = RegexSet::new(specs.iter().map(|(p, _)| *p)).map_err(|e| {
            BdbError::InvalidPattern {
                pattern: "<rule set>".into(),
                reason: e.to_string(),
            }
        })?;
        let rules = specs
            .iter()
            .map(|(pattern, unless)| CommandRule::new(pattern, *unless))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { set, rules })
    }

    /// Indices of firing rules, in table order.
    pub fn matches<'a>(&'a self, command: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.set
            .matches(command)
            .into_iter()
            .filter(move |&i| self.rules[i].is_match(command))
    }

    pub fn first_match(&self, command: &str) -> Option<usize> {
        self.matches(command).next()
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.first_match(command).is_some()
    }
}

/// Commands that never need review.
const ALWAYS_ALLOWED: &[RuleSpec] = &[
    (r"(?i)git\s+log\s+--oneline\s+-\d+$", None),
    (r"(?i)git\s+status\b", None),
    (r"(?i)git\s+diff\b", Some(r"(?i)git\s+diff\b.*HEAD~")),
    (r"(?i)git\s+show\s+HEAD\b", Some(r"(?i)git\s+show\s+HEAD~")),
];

/// Commands whose safety depends on intent.
const REVIEW_TRIGGERS: &[RuleSpec] = &[
    // history inspection
    (
        r"(?i)git\s+log\b",
        Some(r"(?i)git\s+log\b.*--oneline\s+-\d+$"),
    ),
    (r"(?i)git\s+show\s+HEAD~", None),
    (r"(?i)git\s+diff\s+HEAD~", None),
    (r"(?i)git\s+blame\b", None),
    // decode idioms
    (r"(?i)base64\s+(-d|--decode)", None),
    (r"(?i)xxd\s+-r", None),
    (r"(?i)exec\s*\([^)]*decode", None),
    (r"(?i)eval\s+\$\(", None),
    // remote fetch piped to a shell
    (r"(?i)curl\s+[^|]+\|\s*(bash|sh|zsh)", None),
    (r"(?i)wget\s+[^|]+\|\s*(bash|sh|zsh)", None),
    (r"(?i)curl.*-o\s*-.*\|\s*(bash|sh)", None),
];

/// How the rule matcher sees a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    AlwaysAllowed,
    NeedsReview,
    NotOfInterest,
}

/// Fast-path gate in front of the fuzzy classifier.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    allowed: RuleSet,
    triggers: RuleSet,
}

static BUILTIN_MATCHER: LazyLock<RuleMatcher> = LazyLock::new(|| {
    RuleMatcher::new(ALWAYS_ALLOWED, REVIEW_TRIGGERS).expect("builtin review rules compile")
});

impl RuleMatcher {
    pub fn new(allowed: &[RuleSpec], triggers: &[RuleSpec]) -> Result<Self> {
        Ok(Self {
            allowed: RuleSet::new(allowed)?,
            triggers: RuleSet::new(triggers)?,
        })
    }

    pub fn builtin() -> &'static RuleMatcher {
        &BUILTIN_MATCHER
    }

    /// Allow-list first, then the review triggers.
    pub fn classify(&self, command: &str) -> RuleVerdict {
        if self.allowed.is_match(command) {
            RuleVerdict::AlwaysAllowed
        } else if self.triggers.is_match(command) {
            RuleVerdict::NeedsReview
        } else {
            RuleVerdict::NotOfInterest
        }
    }

    pub fn needs_fuzzy_review(&self, command: &str) -> bool {
        self.classify(command) == RuleVerdict::NeedsReview
    }
}
