//! Child process supervision (§4.5): waits on the sandboxed application and
//! translates its outcome into the launcher's own exit code.
//!
//! Grounded on the CLI's `to_shell_exit_code` helper (normal exit codes pass
//! through unchanged, signal deaths become `128 + signal`); here the
//! translation works off a real `std::process::ExitStatus` instead of a
//! synthetic box-runtime exit code, and produced as a [`LauncherError`] so
//! the caller's single `exit_code()` mapping (§6.1) stays the only place
//! that decides the process's final exit status.

use std::process::{Child, ExitStatus};

use crate::error::LauncherError;

/// Wait for the sandboxed child, surfacing only a failure to wait at all
/// (e.g. the child was already reaped). Exit code translation, including
/// nonzero exits and signal deaths, happens in [`wait_for_exit_code`].
pub fn wait(child: &mut Child) -> Result<ExitStatus, LauncherError> {
    child.wait().map_err(|source| LauncherError::SandboxConstructionFailed { source })
}

/// Wait for the sandboxed child and compute the process's own exit code
/// per §4.5: the application's exit code is propagated unchanged; a signal
/// death is encoded as `128 + signal`, matching the shell convention the
/// rest of the launcher's exit-code table already follows.
pub fn wait_for_exit_code(child: &mut Child) -> Result<i32, LauncherError> {
    let status = wait(child)?;
    Ok(exit_code_for(status))
}

fn exit_code_for(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        return code;
    }
    // `ExitStatus::code()` returns `None` exactly when the process was
    // terminated by a signal rather than exiting normally.
    let signal = status.signal().unwrap_or(0);
    128 + signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn normal_exit_code_passes_through() {
        let mut child = Command::new("/bin/sh").args(["-c", "exit 7"]).spawn().unwrap();
        assert_eq!(wait_for_exit_code(&mut child).unwrap(), 7);
    }

    #[test]
    fn success_is_zero() {
        let mut child = Command::new("/bin/true").spawn().unwrap();
        assert_eq!(wait_for_exit_code(&mut child).unwrap(), 0);
    }

    #[test]
    fn signal_death_encodes_128_plus_n() {
        let mut child = Command::new("/bin/sh")
            .args(["-c", "kill -KILL $$"])
            .spawn()
            .unwrap();
        assert_eq!(wait_for_exit_code(&mut child).unwrap(), 137);
    }
}
