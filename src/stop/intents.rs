use std::sync::LazyLock;

use crate::config::StopHookConfig;
use crate::rules::{RuleSet, RuleSpec};

/// Why an agent's stop message gets pushed back without asking a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopIntent {
    PermissionSeeking,
    PlanDeviation,
    QualityShortcut,
}

impl StopIntent {
    pub fn label(&self) -> &'static str {
        match self {
            StopIntent::PermissionSeeking => "Permission-seeking",
            StopIntent::PlanDeviation => "Plan deviation",
            StopIntent::QualityShortcut => "Quality shortcut",
        }
    }

    pub fn is_enabled(&self, config: &StopHookConfig) -> bool {
        match self {
            StopIntent::PermissionSeeking => config.block_permission_seeking,
            StopIntent::PlanDeviation => config.block_plan_deviation,
            StopIntent::QualityShortcut => config.block_quality_shortcuts,
        }
    }
}

const PERMISSION_SEEKING: &[RuleSpec] = &[
    (r"(?i)ready\s+for\s+(your\s+)?feedback", None),
    (r"(?i)should\s+I\s+proceed", None),
    (r"(?i)would\s+you\s+like\s+(me\s+to|to)", None),
    (r"(?i)if\s+you\s+(want|would\s+like)", None),
    (r"(?i)let\s+me\s+know\s+(if|when|what)", None),
    (r"(?i)awaiting\s+(your|further)", None),
    (r"(?i)waiting\s+for\s+(your|further)", None),
    (r"(?i)please\s+(confirm|let\s+me\s+know|advise)", None),
    (r"(?i)do\s+you\s+want\s+me\s+to", None),
    (r"(?i)shall\s+I\s+(proceed|continue|go\s+ahead)", None),
    (r"(?i)I\s+can\s+(also|help|assist).*if\s+you", None),
    (r"(?i)what\s+would\s+you\s+like\s+me\s+to", None),
    (r"(?i)I('m|\s+am)\s+ready\s+(to|for)", None),
    (r"(?i)next\s+steps.*\?\s*$", None),
    // handing off instead of doing
    (r"(?i)time\s+to\s+(execute|implement|build|start|begin)", None),
    (r"(?i)(foundation|groundwork|setup)\s+is\s+(solid|complete|ready|done)", None),
    (r"(?i)ready\s+to\s+(execute|implement|build|start|begin)", None),
    (r"(?i)now\s+(you\s+can|we\s+can)\s+(execute|implement|build)", None),
    (r"(?i)(plan|design|architecture)\s+is\s+(complete|ready|solid|done)\.?\s*$", None),
    // progress reports that stop early
    (r"(?i)(I've|I\s+have)\s+made\s+(good\s+)?progress", None),
    (r"(?i)let\s+me\s+save\s+this\s+work", None),
    (r"(?i)summary\s+(coming|follows)", None),
    (r"(?i)due\s+to\s+(the\s+)?complexity", None),
    (r"(?i)session\s+\d+\s+(summary|recap)", None),
];

const PLAN_DEVIATION: &[RuleSpec] = &[
    (r"(?i)let\s+me\s+try\s+(something|a)\s+(simpler|different|easier)", None),
    (r"(?i)(a|the)\s+simpler\s+approach", None),
    (r"(?i)instead\s+of\s+following\s+the\s+plan", None),
    (r"(?i)deviat(e|ing)\s+from\s+the\s+plan", None),
    (r"(?i)(quick|temporary)\s+workaround", None),
    (r"(?i)(skip|defer)\s+(this|that)\s+(step|part|phase)\s+for\s+now", None),
    (r"(?i)in\s+a\s+(future|later|follow-?up)\s+(session|pr|iteration)", None),
    (r"(?i)(simplified|minimal)\s+version\s+(instead|for\s+now)", None),
];

const QUALITY_SHORTCUTS: &[RuleSpec] = &[
    (r"(?i)skip(ping)?\s+(the\s+)?(failing\s+)?tests?", None),
    (r"(?i)(disable|disabling|turn\s+off)\s+(the\s+)?(tests?|lints?|linter|checks?|type\s+check)", None),
    (r"(?i)mark(ed|ing)?\s+(it|them|the\s+tests?)\s+as\s+ignored", None),
    (r"(?i)comment(ed|ing)?\s+out\s+(the\s+)?(failing\s+)?tests?", None),
    (r"(?i)(placeholder|stub)\s+implementation", None),
    (r"(?i)hard-?code\s+the\s+(expected\s+)?(result|output|value)", None),
    (r"(?i)tests?\s+(can|will)\s+(be\s+added|come)\s+later", None),
    (r"@ts-ignore|eslint-disable|#\s*type:\s*ignore", None),
];

/// A detected intent and the phrase pattern that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMatch {
    pub intent: StopIntent,
    pub pattern: String,
}

impl IntentMatch {
    pub fn describe(&self) -> String {
        format!("{} detected: '{}'", self.intent.label(), self.pattern)
    }
}

pub struct IntentDetector {
    tables: Vec<(StopIntent, &'static [RuleSpec], RuleSet)>,
}

static BUILTIN_DETECTOR: LazyLock<IntentDetector> =
    LazyLock::new(|| IntentDetector::compile().expect("builtin intent patterns compile"));

impl IntentDetector {
    fn compile() -> crate::error::Result<Self> {
        let tables = [
            (StopIntent::PermissionSeeking, PERMISSION_SEEKING),
            (StopIntent::PlanDeviation, PLAN_DEVIATION),
            (StopIntent::QualityShortcut, QUALITY_SHORTCUTS),
        ]
        .into_iter()
        .map(|(intent, specs)| -> crate::error::Result<_> {
            Ok((intent, specs, RuleSet::new(specs)?))
        })
        .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self { tables })
    }

    pub fn builtin() -> &'static IntentDetector {
        &BUILTIN_DETECTOR
    }

    /// First enabled intent matching `text`.
    pub fn detect(&self, text: &str, config: &StopHookConfig) -> Option<IntentMatch> {
        self.tables
            .iter()
            .filter(|(intent, _, _)| intent.is_enabled(config))
            .find_map(|(intent, specs, set)| {
                set.first_match(text).map(|i| IntentMatch {
                    intent: *intent,
                    pattern: specs[i].0.trim_start_matches("(?i)").to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<StopIntent> {
        IntentDetector::builtin()
            .detect(text, &StopHookConfig::default())
            .map(|m| m.intent)
    }

    #[test]
    fn permission_seeking() {
        assert_eq!(detect("Should I proceed?"), Some(StopIntent::PermissionSeeking));
        assert_eq!(
            detect("Phase 1 is in place. Would you like me to continue with phase 2?"),
            Some(StopIntent::PermissionSeeking)
        );
        assert_eq!(
            detect("The foundation is solid. Time to implement the parser."),
            Some(StopIntent::PermissionSeeking)
        );
    }

    #[test]
    fn plan_deviation() {
        assert_eq!(
            detect("The macro approach is fiddly; let me try something simpler."),
            Some(StopIntent::PlanDeviation)
        );
        assert_eq!(
            detect("I'll leave the migration for a follow-up in a future session."),
            Some(StopIntent::PlanDeviation)
        );
    }

    #[test]
    fn quality_shortcuts() {
        assert_eq!(
            detect("We can skip the tests for this module."),
            Some(StopIntent::QualityShortcut)
        );
        assert_eq!(
            detect("I commented out the failing test so CI is green."),
            Some(StopIntent::QualityShortcut)
        );
    }

    #[test]
    fn completion_summary_is_clean() {
        assert_eq!(
            detect("Implemented the cache layer and wired it into the server. All 42 tests pass and clippy is clean."),
            None
        );
    }

    #[test]
    fn disabled_intent_is_ignored() {
        let config = StopHookConfig {
            block_permission_seeking: false,
            ..Default::default()
        };
        assert!(IntentDetector::builtin()
            .detect("Should I proceed?", &config)
            .is_none());
    }

    #[test]
    fn description_names_pattern() {
        let m = IntentDetector::builtin()
            .detect("shall I continue?", &StopHookConfig::default())
            .unwrap();
        assert_eq!(
            m.describe(),
            r"Permission-seeking detected: 'shall\s+I\s+(proceed|continue|go\s+ahead)'"
        );
    }
}
