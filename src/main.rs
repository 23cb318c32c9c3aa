//! droidenv - compute an Android cross-compilation environment
//!
//! With no command, prints `export` lines suitable for `eval`. Otherwise
//! runs the command with the environment applied.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use droidenv::commands::{Environment, ExportCommand, FindLibraryCommand, RunCommand};
use droidenv::core::{APP_NAME, VERSION};

#[derive(Debug, Parser)]
#[command(name = "droidenv", version, about = "Compute the environment needed to cross-compile for Android")]
struct Cli {
    /// Configuration file (default: droidenv.toml in the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the sysroot path of each library
    #[arg(long, value_name = "LIB", num_args = 1.., conflicts_with = "command")]
    find_library: Option<Vec<String>>,

    /// Command to run in the computed environment
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

/// Logs go to stderr so stdout can be passed to `eval`
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("DROIDENV_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("{} v{}", APP_NAME, VERSION);

    let environment = Environment::resolve(cli.config.as_deref()).await?;
    environment.env.apply_to_process();

    let mut stdout = std::io::stdout().lock();

    if let Some(libraries) = cli.find_library {
        FindLibraryCommand { libraries }.execute(&environment, &mut stdout)?;
    } else if cli.command.is_empty() {
        ExportCommand.execute(&environment, &mut stdout)?;
    } else {
        drop(stdout);
        let code = RunCommand { argv: cli.command }.execute(&environment).await?;
        std::process::exit(code);
    }

    Ok(())
}
