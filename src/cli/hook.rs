use std::io::Read;

use crate::config::{self, Config};
use crate::error::Result;
use crate::event::HookEvent;
use crate::provider;
use crate::rules::Blocklist;
use crate::supervisor::Supervisor;

/// Build the supervisor for a loaded config. A bad blocklist or provider
/// setting is logged and dropped rather than failing the hook.
pub fn supervisor_for(config: Config) -> Supervisor {
    let provider = match provider::from_config(&config.llm) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "provider unavailable");
            None
        }
    };

    let blocklist = match Blocklist::compile(&config.blocklist) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(error = %e, "invalid blocklist, ignoring it");
            Blocklist::default()
        }
    };
    Supervisor::with_blocklist(config, config::dirs_global(), provider, blocklist)
}

/// Hook entry point: one JSON event on stdin, at most one JSON object on stdout.
///
/// Never fails the process. A payload that cannot be understood is allowed.
pub async fn run_hook(config: Config) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;

    let event = match HookEvent::from_json(&raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring hook payload");
            return Ok(());
        }
    };
    tracing::debug!(event = event.name(), cwd = %event.context().cwd.display(), "hook received");

    let supervisor = supervisor_for(config);
    let result = supervisor.handle(&event).await;

    if let Some(output) = result.to_output(event.name()) {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
