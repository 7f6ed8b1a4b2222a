//! Policy compiler (§4.4): turns a manifest's granted capabilities into a
//! [`SandboxPolicy`] — namespace set, syscall filter, and MAC label.

pub mod mac;
pub mod namespaces;
pub mod seccomp;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::LauncherError;
use crate::manifest::Capability;
use namespaces::{namespace_plan, Namespace};

/// The compiled, ephemeral sandbox policy for one launch (§3). Built once
/// in the parent before `fork`, then value-copied into the child's
/// pre-exec closure per the Design Notes' ownership rule.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    pub app_id: String,
    pub granted: BTreeSet<Capability>,
    pub network: bool,
    pub filesystem: bool,
    pub devices: bool,
    pub namespaces: Vec<Namespace>,
    pub mac_profile_dir: PathBuf,
    pub mac_data_dir: PathBuf,
}

impl SandboxPolicy {
    /// Compile a policy from the capabilities actually granted by the
    /// consent pipeline (never the raw manifest request — invariant 2).
    pub fn compile(
        app_id: &str,
        granted: Vec<Capability>,
        mac_profile_dir: PathBuf,
        mac_data_dir: PathBuf,
    ) -> Self {
        let granted: BTreeSet<Capability> = granted.into_iter().collect();
        let network = granted
            .iter()
            .any(|c| c.group() == crate::manifest::CapabilityGroup::Network);
        let filesystem = granted
            .iter()
            .any(|c| c.group() == crate::manifest::CapabilityGroup::Filesystem);
        let devices = granted
            .iter()
            .any(|c| c.group() == crate::manifest::CapabilityGroup::Devices);

        Self {
            app_id: app_id.to_string(),
            granted,
            network,
            filesystem,
            devices,
            namespaces: namespace_plan(network),
            mac_profile_dir,
            mac_data_dir,
        }
    }

    pub fn seccomp_program(&self) -> seccomp::FilterOp {
        seccomp::build_program(self.network, self.filesystem, self.devices)
    }

    #[cfg(target_os = "linux")]
    pub fn compile_seccomp_bpf(&self) -> Result<seccompiler::BpfProgram, LauncherError> {
        seccomp::compile(self.network, self.filesystem, self.devices)
    }

    pub fn mac_profile_path_for(&self, profile_dir: &Path) -> PathBuf {
        profile_dir.join(crate::constants::mac::profile_name(&self.app_id))
    }
}
