use crate::config::{self, Config};
use crate::error::Result;
use crate::mode::ModeResolver;
use crate::pause::{PauseGate, PauseScope};
use crate::provider;

use super::cwd;

fn scope(global: bool, local: bool) -> Option<PauseScope> {
    match (global, local) {
        (true, _) => Some(PauseScope::Global),
        (_, true) => Some(PauseScope::Local),
        _ => None,
    }
}

fn gate() -> PauseGate {
    PauseGate::new(cwd(), config::dirs_global())
}

/// Create a pause sentinel.
pub async fn run_pause(global: bool, local: bool, reason: Option<&str>) -> Result<()> {
    let (scope, path) = gate().pause(scope(global, local), reason)?;
    eprintln!("bdb: supervision paused ({scope}) -- {}", path.display());
    Ok(())
}

/// Remove a pause sentinel. Not being paused is not an error.
pub async fn run_resume(global: bool, local: bool) -> Result<()> {
    match gate().resume(scope(global, local))? {
        Some(path) => eprintln!("bdb: supervision resumed -- removed {}", path.display()),
        None => eprintln!("bdb: not paused"),
    }
    Ok(())
}

/// Print pause state, mode and provider setup.
pub async fn run_status(config: &Config) -> Result<()> {
    let gate = gate();
    let state = gate.check();

    match state.sentinel_path.as_deref().filter(|_| state.paused) {
        Some(path) => {
            println!("Supervision: PAUSED ({})", path.display());
            if let Some(record) = PauseGate::info(path) {
                println!(
                    "  Since: {} by {}",
                    record.timestamp.to_rfc3339(),
                    record.user
                );
                if let Some(reason) = record.reason {
                    println!("  Reason: {reason}");
                }
            }
        }
        None => println!("Supervision: active"),
    }

    let (mode, source) = ModeResolver::new(cwd(), config::dirs_global()).current();
    match source {
        Some(path) => println!("Mode: {mode} ({})", path.display()),
        None => println!("Mode: {mode}"),
    }

    match provider::from_config(&config.llm) {
        Ok(Some(p)) if p.is_configured() => println!("LLM: {} (configured)", p.name()),
        Ok(Some(p)) => println!("LLM: {} (no API key)", p.name()),
        Ok(None) => println!("LLM: none"),
        Err(e) => println!("LLM: error ({e})"),
    }
    println!("Config: {}", Config::default_path().display());
    Ok(())
}
