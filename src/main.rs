use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing::Level;

use drinkingbird::cli;
use drinkingbird::cli::test::TestHook;
use drinkingbird::config::{Config, LoggingConfig};

/// Better Drinking Bird -- keeps AI coding agents working and out of trouble.
#[derive(Parser, Debug)]
#[command(name = "bdb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hook entry point: reads one event from stdin, writes the decision to stdout
    Run {
        /// Force debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Suspend supervision
    Pause {
        /// Pause for every workspace
        #[arg(long, conflicts_with = "local")]
        global: bool,

        /// Pause only the current workspace
        #[arg(long)]
        local: bool,

        /// Note stored in the sentinel
        #[arg(long)]
        reason: Option<String>,
    },

    /// Resume supervision
    Resume {
        #[arg(long, conflicts_with = "local")]
        global: bool,

        #[arg(long)]
        local: bool,
    },

    /// Show pause state, mode and provider setup
    Status,

    /// Show or set the supervision mode (default, auto, interactive)
    Mode {
        mode: Option<String>,

        /// Use the user-wide mode file
        #[arg(long)]
        global: bool,

        /// Remove the mode file
        #[arg(long, conflicts_with = "mode")]
        clear: bool,
    },

    /// Run one hook with synthetic input and print the verdict
    Test {
        #[arg(value_enum)]
        hook: TestHook,

        /// Transcript file (JSONL) for stop and pre-compact
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Shell command for pre-tool and tool-failure
        #[arg(long)]
        command: Option<String>,

        /// Error output for tool-failure
        #[arg(long)]
        error: Option<String>,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the default config.yaml
    Template,
}

/// Log to the configured file; stderr when it cannot be opened. Stdout
/// carries hook output and is never used for logs.
fn init_logging(logging: &LoggingConfig, debug: bool) {
    let debug = debug || std::env::var_os("BDB_DEBUG").is_some_and(|v| !v.is_empty());
    let level = if debug {
        Level::DEBUG
    } else {
        logging.level.parse().unwrap_or(Level::INFO)
    };

    let path = logging.file_path();
    let file = path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
        });

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    match file {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(_) => builder.with_writer(std::io::stderr).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let debug = matches!(args.command, Commands::Run { debug: true });
    init_logging(&config.logging, debug);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "using default config");
        if !matches!(args.command, Commands::Run { .. }) {
            eprintln!("bdb: {e} (using defaults)");
        }
    }

    match args.command {
        Commands::Run { .. } => {
            // The harness treats a non-zero exit as a hook failure, so the
            // process always exits 0 once the event has been read.
            if let Err(e) = cli::hook::run_hook(config).await {
                tracing::error!(error = %e, "hook failed");
            }
        }
        Commands::Pause {
            global,
            local,
            reason,
        } => cli::pause::run_pause(global, local, reason.as_deref()).await?,
        Commands::Resume { global, local } => cli::pause::run_resume(global, local).await?,
        Commands::Status => cli::pause::run_status(&config).await?,
        Commands::Mode { mode, global, clear } => {
            cli::mode_cmd::run(mode.as_deref(), global, clear).await?
        }
        Commands::Test {
            hook,
            transcript,
            command,
            error,
        } => {
            cli::test::run_test(
                config,
                hook,
                transcript,
                command.as_deref(),
                error.as_deref(),
            )
            .await?
        }
        Commands::Config { action } => match action {
            ConfigCommands::Template => cli::template::run_template().await?,
        },
    }
    Ok(())
}
