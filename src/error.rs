//! Error kinds for the launcher pipeline and their exit-code mapping.

use std::path::PathBuf;

/// A single error kind per pipeline stage, matching the fail-closed
/// discipline: every variant maps to exactly one exit code, computed from
/// the variant alone rather than scattered at each call site.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    /// bad invocation
    #[error("usage: sandbox-launcher <application_id> [arg ...]")]
    Usage,

    /// manifest file missing
    #[error("manifest not found for application {app_id:?} at {path}")]
    NotFound { app_id: String, path: PathBuf },

    /// manifest parse or validation failure
    #[error("malformed manifest for {app_id:?}: {reason}")]
    Malformed { app_id: String, reason: String },

    /// capability name outside the closed vocabulary
    #[error("unknown capability {capability:?} requested by {app_id:?}")]
    UnknownCapability { app_id: String, capability: String },

    /// user denied a requested capability
    #[error("consent denied for {app_id:?} capability {capability:?}")]
    ConsentDenied { app_id: String, capability: String },

    /// namespace unshare failed in the child before exec
    #[error("failed to unshare {namespace} namespace: {source}")]
    NamespaceFailed {
        namespace: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// seccomp filter installation failed
    #[error("failed to install syscall filter: {reason}")]
    FilterFailed { reason: String },

    /// mandatory MAC profile step failed while MAC was configured as mandatory
    #[error("MAC profile setup failed: {reason}")]
    MacFailed { reason: String },

    /// exec of the target binary failed
    #[error("failed to exec {binary}: {source}")]
    ExecFailed {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// any pre-exec step (no_new_privs, unshare, MAC label, filter install)
    /// failed inside the forked child; `std::process::Command::pre_exec`
    /// reports these to the parent as a single opaque `spawn()` failure,
    /// so the individual step cannot be distinguished after the fact.
    #[error("sandbox construction failed before exec: {source}")]
    SandboxConstructionFailed {
        #[source]
        source: std::io::Error,
    },

    /// application process was killed by a signal
    #[error("application killed by signal {signal}")]
    ChildSignalled { signal: i32 },
}

impl LauncherError {
    /// Exit code per §6.1 of the launcher's external interface.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::Usage => 1,
            LauncherError::NotFound { .. } => 1,
            LauncherError::Malformed { .. } => 1,
            LauncherError::UnknownCapability { .. } => 1,
            LauncherError::ConsentDenied { .. } => 2,
            LauncherError::NamespaceFailed { .. } => 3,
            LauncherError::FilterFailed { .. } => 3,
            LauncherError::MacFailed { .. } => 3,
            LauncherError::ExecFailed { .. } => 3,
            LauncherError::SandboxConstructionFailed { .. } => 3,
            LauncherError::ChildSignalled { signal } => 128 + signal,
        }
    }
}

pub type LauncherResult<T> = Result<T, LauncherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_exit_1() {
        assert_eq!(LauncherError::Usage.exit_code(), 1);
    }

    #[test]
    fn not_found_is_exit_1() {
        let err = LauncherError::NotFound {
            app_id: "a".into(),
            path: PathBuf::from("/x"),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn consent_denied_is_exit_2() {
        let err = LauncherError::ConsentDenied {
            app_id: "a".into(),
            capability: "net.client".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn construction_failures_are_exit_3() {
        let variants = [
            LauncherError::NamespaceFailed {
                namespace: "user",
                source: std::io::Error::other("denied"),
            },
            LauncherError::FilterFailed {
                reason: "bad arch".into(),
            },
            LauncherError::MacFailed {
                reason: "no parser".into(),
            },
            LauncherError::ExecFailed {
                binary: PathBuf::from("/bin/app"),
                source: std::io::Error::other("enoent"),
            },
            LauncherError::SandboxConstructionFailed {
                source: std::io::Error::other("pre-exec hook failed"),
            },
        ];
        for v in variants {
            assert_eq!(v.exit_code(), 3);
        }
    }

    #[test]
    fn child_signalled_encodes_128_plus_n() {
        let err = LauncherError::ChildSignalled { signal: 9 };
        assert_eq!(err.exit_code(), 137);
    }
}
