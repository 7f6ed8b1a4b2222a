//! Syscall filter construction (§4.4.3).
//!
//! The decision table is first expressed as the tagged-variant program the
//! design notes call for — `Allow | Kill | IfEq(syscall_nr, then, else)` —
//! so the table itself is inspectable and testable independent of the BPF
//! backend, then compiled to a `seccompiler` rule map. Grounded on the
//! seccomp module retrieved from a sibling boxlite fork (the teacher's own
//! copy was not present in this retrieval pack): the `BTreeMap<i64,
//! Vec<SeccompRule>>` construction, `SeccompFilter::new(..).try_into()` to
//! `BpfProgram`, and `seccompiler::apply_filter()` are all the same shape.

use std::collections::BTreeMap;

use crate::error::LauncherError;

/// A single node of the tagged-variant filter program (Design Notes §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Allow,
    Kill,
    IfEq {
        syscall_nr: i64,
        then: Box<FilterOp>,
        otherwise: Box<FilterOp>,
    },
}

/// One syscall's name, number, and whether the compiled policy allows it.
#[derive(Debug, Clone, Copy)]
struct Entry {
    name: &'static str,
    nr: i64,
    allow: bool,
}

/// Build the flat entry list from the policy's derived booleans (§4.4.3).
/// Ordering follows the spec: unconditional set first, then the three
/// gated groups, in the order network, filesystem, devices.
fn entries(network: bool, filesystem: bool, devices: bool) -> Vec<Entry> {
    let mut list = vec![
        Entry { name: "read", nr: libc::SYS_read, allow: true },
        Entry { name: "write", nr: libc::SYS_write, allow: true },
        Entry { name: "exit", nr: libc::SYS_exit, allow: true },
        Entry { name: "exit_group", nr: libc::SYS_exit_group, allow: true },
        Entry { name: "brk", nr: libc::SYS_brk, allow: true },
        Entry { name: "mmap", nr: libc::SYS_mmap, allow: true },
        Entry { name: "munmap", nr: libc::SYS_munmap, allow: true },
        Entry { name: "sigreturn", nr: libc::SYS_rt_sigreturn, allow: true },
        Entry { name: "socket", nr: libc::SYS_socket, allow: network },
        Entry { name: "connect", nr: libc::SYS_connect, allow: network },
        Entry { name: "bind", nr: libc::SYS_bind, allow: network },
        Entry { name: "openat", nr: libc::SYS_openat, allow: filesystem },
        Entry { name: "ioctl", nr: libc::SYS_ioctl, allow: devices },
    ];
    // `open(2)` does not exist as a syscall number on every architecture
    // (aarch64 only ever had `openat`); include it only where libc defines
    // SYS_open, since a filter entry with no corresponding syscall number
    // is meaningless rather than merely redundant.
    #[cfg(target_arch = "x86_64")]
    list.push(Entry { name: "open", nr: libc::SYS_open, allow: filesystem });
    list
}

/// Build the tagged-variant program: a chain of `IfEq` nodes, one per
/// entry, falling through to `Kill` when no syscall number matches
/// (§4.4.3 rule 5, "default: kill"). Ordering does not affect correctness
/// since each syscall number appears at most once in the chain.
pub fn build_program(network: bool, filesystem: bool, devices: bool) -> FilterOp {
    entries(network, filesystem, devices)
        .into_iter()
        .rev()
        .fold(FilterOp::Kill, |acc, entry| FilterOp::IfEq {
            syscall_nr: entry.nr,
            then: Box::new(if entry.allow { FilterOp::Allow } else { FilterOp::Kill }),
            otherwise: Box::new(acc),
        })
}

/// Evaluate the program for a given incoming syscall number. Used by tests
/// to check the decision table without going through the BPF backend.
pub fn evaluate(program: &FilterOp, syscall_nr: i64) -> FilterOp {
    match program {
        FilterOp::Allow => FilterOp::Allow,
        FilterOp::Kill => FilterOp::Kill,
        FilterOp::IfEq { syscall_nr: nr, then, otherwise } => {
            if *nr == syscall_nr {
                (**then).clone()
            } else {
                evaluate(otherwise, syscall_nr)
            }
        }
    }
}

#[cfg(target_os = "linux")]
pub fn compile(network: bool, filesystem: bool, devices: bool) -> Result<seccompiler::BpfProgram, LauncherError> {
    use seccompiler::{SeccompAction, SeccompFilter, SeccompRule};

    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    for entry in entries(network, filesystem, devices) {
        if entry.allow {
            // Empty rule vector matches the syscall unconditionally.
            rules.insert(entry.nr, vec![]);
        }
    }

    let filter = SeccompFilter::new(
        rules,
        SeccompAction::KillProcess,
        SeccompAction::Allow,
        target_arch(),
    )
    .map_err(|e| LauncherError::FilterFailed {
        reason: format!("failed to build seccomp filter: {e}"),
    })?;

    filter.try_into().map_err(|e: seccompiler::BackendError| LauncherError::FilterFailed {
        reason: format!("failed to compile seccomp filter to BPF: {e}"),
    })
}

#[cfg(target_os = "linux")]
fn target_arch() -> seccompiler::TargetArch {
    #[cfg(target_arch = "x86_64")]
    {
        seccompiler::TargetArch::x86_64
    }
    #[cfg(target_arch = "aarch64")]
    {
        seccompiler::TargetArch::aarch64
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        compile_error!("seccomp filter generation is only implemented for x86_64 and aarch64");
    }
}

/// Install the compiled filter in the current thread. Must be called
/// after `no_new_privs` has been set and after every namespace operation
/// (§4.4.3 invariant, §4.4.4 step 4).
#[cfg(target_os = "linux")]
pub fn apply(filter: &seccompiler::BpfProgram) -> Result<(), LauncherError> {
    seccompiler::apply_filter(filter).map_err(|e| LauncherError::FilterFailed {
        reason: format!("failed to install syscall filter: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_syscalls_always_allowed() {
        let program = build_program(false, false, false);
        for nr in [libc::SYS_read, libc::SYS_write, libc::SYS_exit, libc::SYS_brk] {
            assert_eq!(evaluate(&program, nr), FilterOp::Allow);
        }
    }

    #[test]
    fn network_gated_syscalls_follow_network_flag() {
        let denied = build_program(false, false, false);
        let allowed = build_program(true, false, false);
        for nr in [libc::SYS_socket, libc::SYS_connect, libc::SYS_bind] {
            assert_eq!(evaluate(&denied, nr), FilterOp::Kill);
            assert_eq!(evaluate(&allowed, nr), FilterOp::Allow);
        }
    }

    #[test]
    fn filesystem_gated_syscalls_follow_filesystem_flag() {
        let denied = build_program(false, false, false);
        let allowed = build_program(false, true, false);
        assert_eq!(evaluate(&denied, libc::SYS_openat), FilterOp::Kill);
        assert_eq!(evaluate(&allowed, libc::SYS_openat), FilterOp::Allow);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn open_syscall_follows_filesystem_flag_on_x86_64() {
        let denied = build_program(false, false, false);
        let allowed = build_program(false, true, false);
        assert_eq!(evaluate(&denied, libc::SYS_open), FilterOp::Kill);
        assert_eq!(evaluate(&allowed, libc::SYS_open), FilterOp::Allow);
    }

    #[test]
    fn device_gated_syscall_follows_devices_flag() {
        let denied = build_program(false, false, false);
        let allowed = build_program(false, false, true);
        assert_eq!(evaluate(&denied, libc::SYS_ioctl), FilterOp::Kill);
        assert_eq!(evaluate(&allowed, libc::SYS_ioctl), FilterOp::Allow);
    }

    #[test]
    fn unlisted_syscall_defaults_to_kill() {
        let program = build_program(true, true, true);
        // ptrace is never in the allowlist regardless of capability flags.
        assert_eq!(evaluate(&program, libc::SYS_ptrace), FilterOp::Kill);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn compile_succeeds_for_every_flag_combination() {
        for network in [false, true] {
            for filesystem in [false, true] {
                for devices in [false, true] {
                    assert!(compile(network, filesystem, devices).is_ok());
                }
            }
        }
    }
}
