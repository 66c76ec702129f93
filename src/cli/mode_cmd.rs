use crate::config;
use crate::error::Result;
use crate::mode::{Mode, ModeResolver};

use super::cwd;

/// Show, set or clear the supervision mode.
pub async fn run(mode: Option<&str>, global: bool, clear: bool) -> Result<()> {
    let resolver = ModeResolver::new(cwd(), config::dirs_global());

    if clear {
        match resolver.clear(global)? {
            Some(path) => eprintln!("bdb: mode cleared -- removed {}", path.display()),
            None => eprintln!("bdb: no mode file to clear"),
        }
        return Ok(());
    }

    let Some(raw) = mode else {
        let (mode, source) = resolver.current();
        match source {
            Some(path) => println!("{mode} ({})", path.display()),
            None => println!("{mode}"),
        }
        return Ok(());
    };

    let mode: Mode = match raw.parse() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("bdb: {e} (expected default, auto or interactive)");
            std::process::exit(1);
        }
    };
    let path = resolver.set(mode, global)?;
    eprintln!("bdb: mode set to {mode} -- {}", path.display());
    Ok(())
}
