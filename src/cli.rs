//! Command-line surface (§6.1): one positional application identifier, a
//! trailing pass-through argument vector, and a small set of global flags.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Launch an application inside a manifest-driven isolation sandbox"
)]
pub struct Cli {
    /// Application identifier, matched against a manifest under the apps directory.
    ///
    /// Kept optional at the `clap` layer rather than `required = true` so a
    /// missing argument flows through [`crate::run`]'s own `LauncherError::Usage`
    /// and its exit-code-1 mapping (§6.1), instead of `clap`'s own exit(2).
    pub application_id: Option<String>,

    /// Arguments passed through to the application's own process.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Raise the log level one step per occurrence (info -> debug -> trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the default log directory.
    #[arg(long = "log-dir", value_name = "PATH")]
    pub log_dir: Option<PathBuf>,

    /// Override the system apps directory (primarily for testing).
    #[arg(long = "apps-dir", value_name = "PATH")]
    pub apps_dir: Option<PathBuf>,
}

impl Cli {
    /// Resolve the effective log level from `-v` repeats, used when
    /// `RUST_LOG` is not set (§6.6: `RUST_LOG` takes precedence when both
    /// are set).
    pub fn verbosity_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn effective_apps_dir(&self) -> PathBuf {
        if let Some(dir) = &self.apps_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(crate::constants::envs::TAU_APPS_DIR) {
            return PathBuf::from(dir);
        }
        crate::constants::paths::default_apps_dir()
    }

    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(crate::constants::paths::default_log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_steps_through_levels() {
        let mut cli = Cli::parse_from(["sandbox-launcher", "notes"]);
        assert_eq!(cli.verbosity_filter(), "info");
        cli.verbose = 1;
        assert_eq!(cli.verbosity_filter(), "debug");
        cli.verbose = 5;
        assert_eq!(cli.verbosity_filter(), "trace");
    }

    #[test]
    fn trailing_args_are_captured_verbatim() {
        let cli = Cli::parse_from(["sandbox-launcher", "notes", "--flag", "-x", "value"]);
        assert_eq!(cli.application_id.as_deref(), Some("notes"));
        assert_eq!(cli.args, vec!["--flag", "-x", "value"]);
    }

    #[test]
    fn missing_application_id_parses_rather_than_erroring() {
        // A missing positional must not be a clap-level parse error (which
        // would bypass `LauncherError::Usage`'s exit code 1 in favor of
        // clap's own exit code 2); `run()` turns the `None` into `Usage`.
        let cli = Cli::parse_from(["sandbox-launcher"]);
        assert!(cli.application_id.is_none());
    }

    #[test]
    fn apps_dir_override_takes_precedence_over_default() {
        let cli = Cli::parse_from(["sandbox-launcher", "notes", "--apps-dir", "/tmp/apps"]);
        assert_eq!(cli.effective_apps_dir(), PathBuf::from("/tmp/apps"));
    }
}
