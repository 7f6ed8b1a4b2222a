//! Namespace set derivation (§4.4.1).
//!
//! Kept as plain data, separate from the `unshare()` calls in
//! [`crate::sandbox`], so the ordering can be asserted in tests without a
//! real fork — mirrors how `bwrap.rs`'s `with_default_namespaces` builds an
//! argument list before anything is actually spawned.

/// One kernel namespace to unshare in the child, tagged with the `CLONE_*`
/// flag the sandbox constructor passes to `unshare(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    User,
    Pid,
    Network,
    Mount,
}

impl Namespace {
    pub fn clone_flag(self) -> i32 {
        match self {
            Namespace::User => libc::CLONE_NEWUSER,
            Namespace::Pid => libc::CLONE_NEWPID,
            Namespace::Network => libc::CLONE_NEWNET,
            Namespace::Mount => libc::CLONE_NEWNS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Namespace::User => "user",
            Namespace::Pid => "pid",
            Namespace::Network => "network",
            Namespace::Mount => "mount",
        }
    }
}

/// Build the ordered namespace list from the manifest's `network` boolean.
/// User, pid and mount are always unshared; network only when the
/// application was not granted any `net.*` capability (§4.4.1). Mount is
/// last so later mount fixups in the child never leak to the parent.
pub fn namespace_plan(network_granted: bool) -> Vec<Namespace> {
    let mut plan = vec![Namespace::User, Namespace::Pid];
    if !network_granted {
        plan.push(Namespace::Network);
    }
    plan.push(Namespace::Mount);
    plan
}
