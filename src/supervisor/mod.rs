//! Event dispatcher. One event in, one `HookResult` out.
//!
//! Order: pause gate, mode (stop only), per-hook enable flag, then the
//! event-specific pipeline.

pub mod advisory;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::FuzzyClassifier;
use crate::config::Config;
use crate::decision::HookResult;
use crate::error::Result;
use crate::event::{EventContext, HookEvent, ToolInvocation};
use crate::mode::{Mode, ModeResolver};
use crate::pause::PauseGate;
use crate::provider::Provider;
use crate::rules::{Blocklist, RuleMatcher, SafetyRules};
use crate::stop::StopDecisionEngine;

pub struct Supervisor {
    config: Config,
    global_dir: PathBuf,
    provider: Option<Arc<dyn Provider>>,
    blocklist: Blocklist,
}

impl Supervisor {
    /// Fails only when a blocklist pattern does not compile.
    pub fn new(
        config: Config,
        global_dir: impl Into<PathBuf>,
        provider: Option<Arc<dyn Provider>>,
    ) -> Result<Self> {
        let blocklist = Blocklist::compile(&config.blocklist)?;
        Ok(Self::with_blocklist(config, global_dir, provider, blocklist))
    }

    pub fn with_blocklist(
        config: Config,
        global_dir: impl Into<PathBuf>,
        provider: Option<Arc<dyn Provider>>,
        blocklist: Blocklist,
    ) -> Self {
        Self {
            config,
            global_dir: global_dir.into(),
            provider,
            blocklist,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.llm.timeout_secs)
    }

    pub async fn handle(&self, event: &HookEvent) -> HookResult {
        let context = event.context();

        let pause = PauseGate::new(&context.cwd, &self.global_dir).check();
        if pause.paused {
            let sentinel = pause
                .sentinel_path
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            tracing::info!(event = event.name(), %sentinel, "supervision paused");
            return HookResult::allow(format!("Supervision paused (sentinel: {sentinel})"));
        }

        if let HookEvent::Stop { .. } = event {
            let (mode, _) = ModeResolver::new(&context.cwd, &self.global_dir).current();
            if mode == Mode::Interactive {
                return HookResult::allow("Interactive mode");
            }
        }

        if !self.is_enabled(event) {
            tracing::debug!(event = event.name(), "hook disabled");
            return HookResult::allow(format!("{} hook disabled", event.name()));
        }

        let result = match event {
            HookEvent::PreToolUse { tool, context } => self.pre_tool(tool, context).await,
            HookEvent::Stop { context } => self.stop(context).await,
            HookEvent::PostToolUseFailure { tool, error, .. } => {
                advisory::tool_failure_hint(
                    self.provider.as_ref(),
                    self.timeout(),
                    self.config.hooks.tool_failure.confidence_threshold,
                    tool,
                    error,
                )
                .await
            }
            HookEvent::PreCompact { trigger, context } => {
                tracing::debug!(%trigger, "pre-compact");
                advisory::compaction_reminder(&self.config.hooks.pre_compact, context)
            }
        };

        tracing::info!(
            event = event.name(),
            decision = %result.decision,
            reason = %result.reason,
            "hook result"
        );
        result
    }

    fn is_enabled(&self, event: &HookEvent) -> bool {
        let hooks = &self.config.hooks;
        match event {
            HookEvent::PreToolUse { .. } => hooks.pre_tool.enabled,
            HookEvent::Stop { .. } => hooks.stop.enabled,
            HookEvent::PostToolUseFailure { .. } => hooks.tool_failure.enabled,
            HookEvent::PreCompact { .. } => hooks.pre_compact.enabled,
        }
    }

    async fn pre_tool(&self, tool: &ToolInvocation, context: &EventContext) -> HookResult {
        if let Some(reason) = self.blocklist.check(&tool.name, &tool.input) {
            tracing::info!(tool = %tool.name, %reason, "blocklist match");
            return HookResult::block(reason);
        }

        let command = match tool.command().filter(|_| tool.is_shell()) {
            Some(command) => command,
            None => return HookResult::allow("Not a Bash command"),
        };

        if RuleMatcher::builtin().needs_fuzzy_review(command) {
            let classifier = FuzzyClassifier::new(
                self.provider.clone(),
                self.config.hooks.pre_tool.llm_fallback,
                self.timeout(),
            );
            let result = classifier
                .classify(command, context.transcript_path.as_deref())
                .await;
            return if result.is_blocked {
                HookResult::block_with_reason(result.message, result.reason)
            } else {
                HookResult::allow(result.reason)
            };
        }

        match SafetyRules::builtin().check(command, &self.config.hooks.pre_tool.categories) {
            Some(violation) => {
                tracing::info!(category = %violation.category, "safety rule match");
                HookResult::block_with_reason(
                    violation.message,
                    format!("{} rule", violation.category),
                )
            }
            None => HookResult::allow("Command allowed"),
        }
    }

    async fn stop(&self, context: &EventContext) -> HookResult {
        let engine = StopDecisionEngine::new(
            self.config.hooks.stop.clone(),
            self.provider.clone(),
            self.timeout(),
        );
        engine
            .evaluate(context.transcript_path.as_deref(), &context.cwd)
            .await
            .into()
    }
}
