//! Application sandbox launcher: manifest-driven namespace, seccomp and MAC
//! isolation for a single application invocation (§2 SYSTEM OVERVIEW).
//!
//! The pipeline in [`run`] wires the modules below in the fixed order the
//! overview describes: manifest load, consent resolution, policy
//! compilation, sandbox construction, and supervision. Each stage is a
//! standalone module so it can be tested without the others.

pub mod cli;
pub mod consent;
pub mod constants;
pub mod error;
pub mod manifest;
pub mod policy;
pub mod sandbox;
pub mod supervisor;

use cli::Cli;
use consent::prompter::{ConsentPrompter, HeadlessPrompter};
use consent::store::ConsentStore;
use error::{LauncherError, LauncherResult};
use manifest::ApplicationId;

/// Run the full pipeline for one invocation and return the process exit
/// code to use (§6.1). Errors are already translated to their exit code by
/// the caller via [`LauncherError::exit_code`]; this function's `Err`
/// variant carries the error for logging before that translation happens.
pub fn run(cli: &Cli) -> LauncherResult<i32> {
    let raw_id = cli.application_id.as_deref().ok_or(LauncherError::Usage)?;
    let app_id = ApplicationId::parse(raw_id).map_err(|_| LauncherError::Usage)?;
    tracing::info!(app_id = %app_id, "launch requested");

    let apps_dir = cli.effective_apps_dir();
    let (manifest, requested) = manifest::load(&apps_dir, &app_id)?;
    tracing::info!(app_id = %app_id, capabilities = requested.len(), "manifest accepted");

    let consent_path = constants::paths::default_consent_store_path()
        .ok_or_else(|| LauncherError::Malformed {
            app_id: app_id.to_string(),
            reason: "could not resolve a configuration directory for the consent store".into(),
        })?;
    let mut store = ConsentStore::open(&consent_path);

    let mut prompter = default_prompter();
    let granted = consent::resolve_consent(&mut store, prompter.as_mut(), app_id.as_str(), &requested)?;
    tracing::info!(app_id = %app_id, granted = granted.len(), "consent resolved");

    let mac_profile_dir = constants::paths::default_mac_profile_dir();
    let mac_data_dir = constants::paths::app_data_dir(app_id.as_str()).ok_or_else(|| {
        LauncherError::Malformed {
            app_id: app_id.to_string(),
            reason: "could not resolve a per-application data directory".into(),
        }
    })?;
    let sandbox_policy =
        policy::SandboxPolicy::compile(app_id.as_str(), granted, mac_profile_dir, mac_data_dir);
    tracing::info!(
        app_id = %app_id,
        network = sandbox_policy.network,
        filesystem = sandbox_policy.filesystem,
        devices = sandbox_policy.devices,
        "policy compiled"
    );

    let binary = manifest.binary_path(&apps_dir);
    let mut child = sandbox::spawn(&sandbox_policy, &binary, &cli.args)?;
    tracing::info!(app_id = %app_id, "sandbox constructed, application running");

    let exit_code = supervisor::wait_for_exit_code(&mut child)?;
    tracing::info!(app_id = %app_id, exit_code, "application exited");
    Ok(exit_code)
}

/// Pick the production consent prompter: the graphical dialog when the
/// `desktop` feature is compiled in and a display is reachable, otherwise
/// the fail-closed headless prompter (§4.3).
fn default_prompter() -> Box<dyn ConsentPrompter> {
    #[cfg(feature = "desktop")]
    {
        if has_display() {
            return Box::new(consent::prompter::GuiPrompter::default());
        }
    }
    Box::new(HeadlessPrompter)
}

#[cfg(feature = "desktop")]
fn has_display() -> bool {
    std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
}
