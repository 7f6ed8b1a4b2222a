//! Sandbox construction (§4.4.4): forks the target application under the
//! compiled [`SandboxPolicy`] and execs it once isolation is in place.
//!
//! The steps that must run strictly after `fork` and strictly before `exec`
//! — `no_new_privs`, the namespace unshares, the MAC exec label, and the
//! syscall filter install — run inside a single `pre_exec` hook, following
//! the same split the jailer's own `pre_exec.rs` documents: only
//! async-signal-safe operations are allowed in that closure (no heap
//! allocation, no logging, no mutexes). Everything that needs to allocate
//! or spawn a helper process (building the manifest's derived policy,
//! compiling the seccomp BPF program, emitting and loading the MAC profile)
//! runs in the parent beforehand and is captured into the closure as
//! already-built, immutable values.

use std::ffi::CString;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use crate::error::LauncherError;
use crate::policy::mac::MacLabel;
use crate::policy::namespaces::Namespace;
use crate::policy::SandboxPolicy;

/// Write the AppArmor exec label for the *next* exec in this process via
/// `/proc/self/attr/exec`. Async-signal-safe: a single open/write/close with
/// no heap allocation beyond the pre-built `CString`.
///
/// # Safety
/// Must only be called between `fork` and `exec`, per the same discipline
/// documented on [`common::fd::close_fds_from`](https://docs.rs) in the
/// jailer (raw syscalls only, no libstd path/string machinery).
unsafe fn set_exec_label_raw(label: &CString) -> Result<(), i32> {
    let path = c"/proc/self/attr/exec";
    let fd = libc::open(path.as_ptr(), libc::O_WRONLY);
    if fd < 0 {
        return Err(*libc::__errno_location());
    }
    let n = libc::write(fd, label.as_ptr() as *const libc::c_void, label.as_bytes().len());
    let write_errno = if n < 0 { Some(*libc::__errno_location()) } else { None };
    libc::close(fd);
    match write_errno {
        Some(errno) => Err(errno),
        None => Ok(()),
    }
}

/// Unshare a single namespace. Async-signal-safe: `unshare(2)` is a plain
/// syscall with no allocation.
unsafe fn unshare_raw(flag: i32) -> Result<(), i32> {
    if libc::unshare(flag) == 0 {
        Ok(())
    } else {
        Err(*libc::__errno_location())
    }
}

/// Set `PR_SET_NO_NEW_PRIVS` so the syscall filter and MAC label cannot be
/// escaped by execing a setuid binary (§4.4.4 step 1).
unsafe fn set_no_new_privs_raw() -> Result<(), i32> {
    if libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) == 0 {
        Ok(())
    } else {
        Err(*libc::__errno_location())
    }
}

/// Everything the pre-exec hook needs, pre-built in the parent and moved
/// into the closure by value — no pointer back into `SandboxPolicy` or any
/// other parent-owned state survives into the child (Design Notes'
/// ownership rule: child state is value-copied before `fork`).
struct PreExecPlan {
    namespaces: Vec<Namespace>,
    mac_label: Option<CString>,
    seccomp_filter: seccompiler::BpfProgram,
}

/// Build the [`Command`] that launches `binary` under `policy`. Performs
/// every allocation-requiring step (MAC profile emission/loading, seccomp
/// compilation) in the parent; the returned `Command` carries a pre-exec
/// hook that only touches the kernel directly.
pub fn build_command(
    policy: &SandboxPolicy,
    binary: &Path,
    args: &[String],
) -> Result<Command, LauncherError> {
    let mac_label = crate::policy::mac::ensure_and_load(
        &policy.app_id,
        &policy.mac_profile_dir,
        binary,
        &policy.mac_data_dir,
    );
    // MAC is never mandatory in this crate (§7), so even a malformed label
    // name falls back to unconfined rather than aborting the launch.
    let mac_label = match mac_label {
        MacLabel::Unconfined => None,
        MacLabel::Profile(name) => match CString::new(name) {
            Ok(label) => Some(label),
            Err(e) => {
                tracing::warn!(error = %e, "MAC profile name contained a NUL byte, running unconfined");
                None
            }
        },
    };

    let seccomp_filter = policy.compile_seccomp_bpf()?;

    let plan = PreExecPlan {
        namespaces: policy.namespaces.clone(),
        mac_label,
        seccomp_filter,
    };

    let mut cmd = Command::new(binary);
    cmd.args(args);

    // SAFETY: the closure below only calls `set_no_new_privs_raw`,
    // `unshare_raw`, `set_exec_label_raw` and `seccompiler::apply_filter`,
    // all of which operate on values already owned by the closure and
    // perform no heap allocation, logging, or locking.
    unsafe {
        cmd.pre_exec(move || {
            set_no_new_privs_raw().map_err(std::io::Error::from_raw_os_error)?;

            for namespace in &plan.namespaces {
                unshare_raw(namespace.clone_flag()).map_err(std::io::Error::from_raw_os_error)?;
            }

            if let Some(label) = &plan.mac_label {
                set_exec_label_raw(label).map_err(std::io::Error::from_raw_os_error)?;
            }

            seccompiler::apply_filter(&plan.seccomp_filter)
                .map_err(|e| std::io::Error::other(e.to_string()))?;

            Ok(())
        });
    }

    Ok(cmd)
}

/// Spawn the sandboxed application. Any failure inside the pre-exec hook
/// surfaces here as a single opaque `io::Error` (§4.4.4: "no exec attempt"
/// on construction failure) since `std::process::Command` has no way to
/// report which step failed once the child has already forked.
pub fn spawn(
    policy: &SandboxPolicy,
    binary: &Path,
    args: &[String],
) -> Result<std::process::Child, LauncherError> {
    let mut cmd = build_command(policy, binary, args)?;
    cmd.spawn().map_err(|source| {
        if source.raw_os_error() == Some(libc::ENOENT) {
            LauncherError::ExecFailed { binary: binary.to_path_buf(), source }
        } else {
            LauncherError::SandboxConstructionFailed { source }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Capability;
    use std::path::PathBuf;

    fn policy(granted: Vec<Capability>) -> SandboxPolicy {
        SandboxPolicy::compile(
            "demo",
            granted,
            PathBuf::from("/tmp/does-not-exist-mac-profiles"),
            PathBuf::from("/tmp/does-not-exist-data"),
        )
    }

    #[test]
    fn build_command_does_not_touch_argv0_binary() {
        // Building the Command must not itself spawn or exec anything; it
        // only fails if MAC/seccomp preparation in the parent fails.
        let policy = policy(vec![]);
        let result = build_command(&policy, Path::new("/bin/true"), &[]);
        assert!(result.is_ok());
    }

    #[test]
    fn build_command_threads_user_args_through() {
        let policy = policy(vec![Capability::NetClient]);
        let cmd = build_command(
            &policy,
            Path::new("/bin/true"),
            &["--flag".to_string(), "value".to_string()],
        )
        .unwrap();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["--flag".to_string(), "value".to_string()]);
    }

    #[test]
    fn spawn_nonexistent_binary_reports_exec_failed() {
        let policy = policy(vec![]);
        let err = spawn(&policy, Path::new("/no/such/binary-xyz"), &[]).unwrap_err();
        assert!(matches!(err, LauncherError::ExecFailed { .. } | LauncherError::SandboxConstructionFailed { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}
