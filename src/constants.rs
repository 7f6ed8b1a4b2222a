//! Centralized paths, environment variable names, and naming conventions.

use std::path::PathBuf;

pub mod envs {
    /// Overrides the system apps directory (see [`paths::default_apps_dir`]).
    pub const TAU_APPS_DIR: &str = "TAU_APPS_DIR";
}

/// Filesystem layout. Roots are resolved once at startup and threaded
/// through explicitly rather than read from the environment deep inside
/// the pipeline.
pub mod paths {
    use super::PathBuf;

    pub const MANIFEST_FILENAME: &str = "manifest.tau";
    pub const CONSENT_LOG_FILENAME: &str = "consent.log";

    /// Default root for per-application manifest directories.
    pub fn default_apps_dir() -> PathBuf {
        PathBuf::from("/usr/share/tau/apps")
    }

    /// `<apps_dir>/<app_id>/manifest.tau`, per §6.3.
    pub fn manifest_path(apps_dir: &std::path::Path, app_id: &str) -> PathBuf {
        apps_dir.join(app_id).join(MANIFEST_FILENAME)
    }

    /// `$XDG_CONFIG_HOME/tau/consent.log`, falling back to `~/.config/tau/consent.log`.
    pub fn default_consent_store_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tau").join(CONSENT_LOG_FILENAME))
    }

    /// Root directory for per-application MAC profiles.
    pub fn default_mac_profile_dir() -> PathBuf {
        PathBuf::from("/etc/tau/mac-profiles")
    }

    /// Root directory for launcher logs.
    pub fn default_log_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("tau")
            .join("logs")
    }

    /// Per-application private data directory under the user's home,
    /// granted read-write in the default MAC profile (§4.4.2).
    pub fn app_data_dir(app_id: &str) -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("tau").join("apps").join(app_id))
    }
}

/// MAC profile naming convention.
pub mod mac {
    /// Profile names are `tau.<app_id>`.
    pub fn profile_name(app_id: &str) -> String {
        format!("tau.{app_id}")
    }

    /// Fallback label when the derived profile does not exist on this system.
    pub const UNCONFINED_LABEL: &str = "unconfined";
}
