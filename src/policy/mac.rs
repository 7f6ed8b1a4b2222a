//! Mandatory-access-control profile emission and loading (§4.4.2).
//!
//! External-tool discovery follows the same shape as the jailer's own
//! `bwrap` discovery (`OnceLock`-cached search of the system `PATH`,
//! probed with `--version`, falling back gracefully when absent): here the
//! tool is the AppArmor profile loader instead of `bwrap`, and "absent" is
//! a warning rather than a hard failure, since §6.5 makes MAC optional.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::constants::mac::{profile_name, UNCONFINED_LABEL};

static PARSER_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Locate `apparmor_parser` on `PATH`. Cached for the process lifetime,
/// mirroring `bwrap.rs`'s `get_bwrap_path`.
fn get_parser_path() -> Option<&'static PathBuf> {
    PARSER_PATH
        .get_or_init(|| {
            match Command::new("apparmor_parser").arg("--version").output() {
                Ok(output) if output.status.success() => {
                    tracing::debug!("using system apparmor_parser");
                    Some(PathBuf::from("apparmor_parser"))
                }
                _ => {
                    tracing::debug!("apparmor_parser not found on PATH");
                    None
                }
            }
        })
        .as_ref()
}

/// The outcome of applying a MAC profile: either the named profile is
/// active, or the system has no MAC userspace and the process runs
/// "unconfined" (a silent no-op per §6.5/§4.4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacLabel {
    Profile(String),
    Unconfined,
}

impl MacLabel {
    pub fn as_str(&self) -> &str {
        match self {
            MacLabel::Profile(name) => name,
            MacLabel::Unconfined => UNCONFINED_LABEL,
        }
    }
}

/// Default profile body template (§4.4.2): global tunables and base
/// abstractions, map-and-read on the binary, read-write on a scratch
/// tmpdir and on the per-application private data directory.
fn default_profile_body(profile: &str, binary: &Path, data_dir: &Path) -> String {
    format!(
        "#include <tunables/global>\n\n\
         profile {profile} flags=(attach_disconnected) {{\n  \
           #include <abstractions/base>\n\n  \
           {binary} mr,\n  \
           /tmp/** rw,\n  \
           {data_dir}/** rw,\n\
         }}\n",
        profile = profile,
        binary = binary.display(),
        data_dir = data_dir.display(),
    )
}

/// Ensure a profile exists for `app_id` at `profile_dir`, emitting the
/// default body if absent, and attempt to load it. Per the Design Notes,
/// an existing profile is never regenerated (administrator overrides must
/// survive relaunches).
///
/// Returns the label to apply to the exec context. This crate never
/// configures MAC as mandatory (§7: `mac_failed` applies "only if MAC is
/// mandatory", and nothing here makes it so), so every failure along this
/// path — no MAC userspace present, the profile directory or file can't be
/// written, the loader can't be invoked, or the loader rejects the profile —
/// is a warning, not an abort: the launch falls back to `MacLabel::Unconfined`
/// and proceeds. Only the namespaces and syscall filter are mandatory (§6.5).
pub fn ensure_and_load(app_id: &str, profile_dir: &Path, binary: &Path, data_dir: &Path) -> MacLabel {
    let Some(parser) = get_parser_path() else {
        tracing::warn!("no AppArmor/SELinux userspace available, running unconfined");
        return MacLabel::Unconfined;
    };

    let profile = profile_name(app_id);
    let profile_path = profile_dir.join(&profile);

    if !profile_path.exists() {
        if let Err(e) = write_default_profile(&profile, &profile_path, binary, data_dir) {
            tracing::warn!(profile = %profile, error = %e, "failed to emit default MAC profile, running unconfined");
            return MacLabel::Unconfined;
        }
        tracing::info!(profile = %profile, path = %profile_path.display(), "emitted default MAC profile");
    }

    let status = match Command::new(parser).arg("--replace").arg(&profile_path).status() {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(profile = %profile, error = %e, "failed to invoke profile loader, running unconfined");
            return MacLabel::Unconfined;
        }
    };

    if !status.success() {
        tracing::warn!(profile = %profile, "profile loader failed, falling back to unconfined");
        return MacLabel::Unconfined;
    }

    MacLabel::Profile(profile)
}

/// Write the default profile body to `profile_path`, creating its parent
/// directory if needed. Split out of [`ensure_and_load`] so the `?`
/// operator can be used for the two fallible filesystem steps; both
/// failures are treated identically by the caller (warn and run
/// unconfined).
fn write_default_profile(
    profile: &str,
    profile_path: &Path,
    binary: &Path,
    data_dir: &Path,
) -> std::io::Result<()> {
    if let Some(parent) = profile_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = default_profile_body(profile, binary, data_dir);
    std::fs::write(profile_path, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn profile_name_uses_tau_prefix() {
        assert_eq!(profile_name("notes"), "tau.notes");
    }

    #[test]
    fn default_profile_body_grants_binary_and_data_dir() {
        let body = default_profile_body("tau.notes", Path::new("/usr/bin/notes"), Path::new("/home/u/.tau/notes"));
        assert!(body.contains("profile tau.notes"));
        assert!(body.contains("/usr/bin/notes mr,"));
        assert!(body.contains("/home/u/.tau/notes/** rw,"));
        assert!(body.contains("/tmp/** rw,"));
    }

    #[test]
    fn mac_label_as_str_roundtrips() {
        assert_eq!(MacLabel::Unconfined.as_str(), "unconfined");
        assert_eq!(MacLabel::Profile("tau.a".into()).as_str(), "tau.a");
    }

    /// When no profile-loader binary is resolvable, `ensure_and_load`
    /// never touches the filesystem; this is exercised indirectly since
    /// `get_parser_path` depends on the host's actual `PATH`, so we only
    /// assert on the pure helper here.
    #[test]
    fn unconfined_is_silent_fallback_shape() {
        let dir = tempdir().unwrap();
        // Profile directory not created; MacLabel::Unconfined carries no
        // filesystem side effect by construction.
        assert!(!dir.path().join("tau.missing").exists());
    }

    /// `write_default_profile`'s directory-creation and file-write steps
    /// are genuinely fallible (e.g. an unwritable profile directory); MAC
    /// is never mandatory (§7), so `ensure_and_load` treats either failure
    /// as a warning rather than propagating an error.
    #[test]
    fn write_default_profile_fails_when_parent_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("this-is-a-file");
        std::fs::write(&not_a_dir, "x").unwrap();
        let profile_path = not_a_dir.join("tau.notes");

        let result = write_default_profile(
            "tau.notes",
            &profile_path,
            Path::new("/usr/bin/notes"),
            Path::new("/home/u/.tau/notes"),
        );
        assert!(result.is_err());
    }
}
