use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use miette::Diagnostic;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use emotiv_servos::config::Settings;
use emotiv_servos::dispatcher::Dispatcher;

/// Interactive shell linking an Emotiv EmoEngine session to a six-servo
/// prosthetic forearm.
#[derive(Debug, Parser)]
#[command(name = "emotiv-servos", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// TOML settings file
    #[arg(short, long, env = "EMOTIV_SERVOS_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Longest wait for the engine to accept a connection
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Longest wait for event bytes on each `ler`
    #[arg(long, value_name = "MS")]
    poll_window_ms: Option<u64>,
}

#[derive(Debug, Error, Diagnostic)]
enum CliError {
    #[error("Could not load settings")]
    #[diagnostic(
        code(emotiv_servos::settings),
        help("Check the file given with --config and any EMOTIV_SERVOS_* variables.")
    )]
    Settings(#[source] emotiv_servos::Error),

    #[error("Could not prepare the engine link")]
    #[diagnostic(code(emotiv_servos::link))]
    Link(#[source] emotiv_servos::Error),

    #[error("Terminal I/O failed")]
    #[diagnostic(code(emotiv_servos::terminal))]
    Terminal(#[source] emotiv_servos::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout belongs to the shell
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut settings = Settings::load(cli.config.as_deref()).map_err(CliError::Settings)?;
    if let Some(ms) = cli.connect_timeout_ms {
        settings.connect_timeout_ms = ms;
    }
    if let Some(ms) = cli.poll_window_ms {
        settings.poll_window_ms = ms;
    }
    tracing::debug!(?settings, "settings resolved");

    let engine = settings.link_config().build().map_err(CliError::Link)?;
    let mut shell = Dispatcher::new(engine, io::stdin().lock(), io::stdout().lock());
    shell.run().map_err(CliError::Terminal)
}
