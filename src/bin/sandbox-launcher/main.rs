//! `sandbox-launcher` binary entry point: CLI parsing, logging init, and
//! translation of the pipeline's `Result` into a process exit code (§6.1).

use clap::Parser;
use sandbox_launcher::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with stderr output plus a non-blocking, daily-rolling
/// file under the log directory. Returns the `WorkerGuard` that must stay
/// alive for the duration of `main` to keep the background writer thread
/// running (§6.6).
fn init_logging(log_dir: &std::path::Path, verbosity: &str) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(log_dir).expect("failed to create log directory");

    let file_appender = tracing_appender::rolling::daily(log_dir, "sandbox-launcher.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG takes precedence over -v when both are set (§6.6).
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}

fn main() {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli.effective_log_dir(), cli.verbosity_filter());

    let exit_code = match sandbox_launcher::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "launch failed");
            err.exit_code()
        }
    };

    std::process::exit(exit_code);
}
