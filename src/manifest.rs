//! Manifest loader: parses a per-application `manifest.tau` file into a
//! typed, immutable capability request (§3, §4.1).

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::LauncherError;

/// A short, filesystem-safe application identifier: `[A-Za-z0-9_.-]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn parse(raw: &str) -> Result<Self, LauncherError> {
        if raw.is_empty()
            || !raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(LauncherError::Usage);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed capability vocabulary, §6.2. Group membership drives the
/// derived booleans in [`Manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    NetClient,
    NetServer,
    FsReadHome,
    FsReadDocs,
    FsWriteDocs,
    FsReadMedia,
    FsWriteMedia,
    DevCamera,
    DevMicrophone,
    DevLocation,
    DevBluetooth,
    SystemNotifications,
    SystemClipboard,
}

/// Which derived boolean aggregate (§3) a capability belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityGroup {
    Network,
    Filesystem,
    Devices,
    System,
}

impl Capability {
    /// Parse the manifest's dotted capability name, or `None` if it is
    /// outside the closed vocabulary (the caller turns that into a hard
    /// `unknown_capability` failure).
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "net.client" => Capability::NetClient,
            "net.server" => Capability::NetServer,
            "fs.read.home" => Capability::FsReadHome,
            "fs.read.docs" => Capability::FsReadDocs,
            "fs.write.docs" => Capability::FsWriteDocs,
            "fs.read.media" => Capability::FsReadMedia,
            "fs.write.media" => Capability::FsWriteMedia,
            "dev.camera" => Capability::DevCamera,
            "dev.microphone" => Capability::DevMicrophone,
            "dev.location" => Capability::DevLocation,
            "dev.bluetooth" => Capability::DevBluetooth,
            "system.notifications" => Capability::SystemNotifications,
            "system.clipboard" => Capability::SystemClipboard,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::NetClient => "net.client",
            Capability::NetServer => "net.server",
            Capability::FsReadHome => "fs.read.home",
            Capability::FsReadDocs => "fs.read.docs",
            Capability::FsWriteDocs => "fs.write.docs",
            Capability::FsReadMedia => "fs.read.media",
            Capability::FsWriteMedia => "fs.write.media",
            Capability::DevCamera => "dev.camera",
            Capability::DevMicrophone => "dev.microphone",
            Capability::DevLocation => "dev.location",
            Capability::DevBluetooth => "dev.bluetooth",
            Capability::SystemNotifications => "system.notifications",
            Capability::SystemClipboard => "system.clipboard",
        }
    }

    pub fn group(&self) -> CapabilityGroup {
        match self {
            Capability::NetClient | Capability::NetServer => CapabilityGroup::Network,
            Capability::FsReadHome
            | Capability::FsReadDocs
            | Capability::FsWriteDocs
            | Capability::FsReadMedia
            | Capability::FsWriteMedia => CapabilityGroup::Filesystem,
            Capability::DevCamera
            | Capability::DevMicrophone
            | Capability::DevLocation
            | Capability::DevBluetooth => CapabilityGroup::Devices,
            Capability::SystemNotifications | Capability::SystemClipboard => {
                CapabilityGroup::System
            }
        }
    }

    /// A short human-readable label for the consent dialog (§4.3).
    pub fn human_label(&self) -> &'static str {
        match self {
            Capability::NetClient => "connect to the network as a client",
            Capability::NetServer => "accept incoming network connections",
            Capability::FsReadHome => "read files in your home folder",
            Capability::FsReadDocs => "read your documents",
            Capability::FsWriteDocs => "modify your documents",
            Capability::FsReadMedia => "read your media files",
            Capability::FsWriteMedia => "modify your media files",
            Capability::DevCamera => "use your camera",
            Capability::DevMicrophone => "use your microphone",
            Capability::DevLocation => "access your location",
            Capability::DevBluetooth => "use Bluetooth",
            Capability::SystemNotifications => "show notifications",
            Capability::SystemClipboard => "read and write the clipboard",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, immutable manifest (§3). The four derived booleans are
/// computed once at load time and memoized here.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub app_id: ApplicationId,
    pub version: String,
    pub description: String,
    pub capabilities: BTreeSet<Capability>,
    pub network: bool,
    pub filesystem: bool,
    pub devices: bool,
    pub system: bool,
}

impl Manifest {
    /// Path to the application's entrypoint binary: `<apps_dir>/<app_id>/bin/<app_id>`.
    /// The manifest format carries no separate entrypoint field, so the
    /// binary name is the application identifier itself.
    pub fn binary_path(&self, apps_dir: &Path) -> std::path::PathBuf {
        apps_dir.join(self.app_id.as_str()).join("bin").join(self.app_id.as_str())
    }
}

/// Load and validate the manifest for `app_id` rooted at `apps_dir`.
///
/// Returns the manifest plus the capability list in declaration order (the
/// `BTreeSet` on [`Manifest`] loses that order, and the consent prompter
/// needs it).
pub fn load(apps_dir: &Path, app_id: &ApplicationId) -> Result<(Manifest, Vec<Capability>), LauncherError> {
    let path = crate::constants::paths::manifest_path(apps_dir, app_id.as_str());
    let text = std::fs::read_to_string(&path).map_err(|_| LauncherError::NotFound {
        app_id: app_id.as_str().to_string(),
        path: path.clone(),
    })?;
    parse(&text, app_id)
}

fn parse(
    text: &str,
    expected_id: &ApplicationId,
) -> Result<(Manifest, Vec<Capability>), LauncherError> {
    let malformed = |reason: &str| LauncherError::Malformed {
        app_id: expected_id.as_str().to_string(),
        reason: reason.to_string(),
    };

    let mut name: Option<String> = None;
    let mut version = String::new();
    let mut description = String::new();
    let mut declared_order: Vec<Capability> = Vec::new();
    let mut capabilities: BTreeSet<Capability> = BTreeSet::new();

    for raw_line in text.lines() {
        let line = raw_line.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            tracing::warn!(line = trimmed, "ignoring manifest line with no '='");
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "name" => name = Some(parse_quoted_string(value).ok_or_else(|| malformed("name is not a quoted string"))?),
            "version" => {
                version = parse_quoted_string(value).ok_or_else(|| malformed("version is not a quoted string"))?
            }
            "description" => {
                description =
                    parse_quoted_string(value).ok_or_else(|| malformed("description is not a quoted string"))?
            }
            "capabilities" => {
                let names = parse_quoted_list(value)
                    .ok_or_else(|| malformed("capabilities is not a quoted list"))?;
                for cap_name in names {
                    let cap = Capability::parse(&cap_name).ok_or_else(|| {
                        LauncherError::UnknownCapability {
                            app_id: expected_id.as_str().to_string(),
                            capability: cap_name.clone(),
                        }
                    })?;
                    if capabilities.insert(cap) {
                        declared_order.push(cap);
                    }
                }
            }
            other => {
                tracing::warn!(key = other, "ignoring unrecognized manifest key");
            }
        }
    }

    let name = name.ok_or_else(|| malformed("missing required key 'name'"))?;
    if name != expected_id.as_str() {
        return Err(malformed(&format!(
            "manifest name {name:?} does not match application identifier {:?}",
            expected_id.as_str()
        )));
    }

    let network = capabilities.iter().any(|c| c.group() == CapabilityGroup::Network);
    let filesystem = capabilities
        .iter()
        .any(|c| c.group() == CapabilityGroup::Filesystem);
    let devices = capabilities.iter().any(|c| c.group() == CapabilityGroup::Devices);
    let system = capabilities.iter().any(|c| c.group() == CapabilityGroup::System);

    let manifest = Manifest {
        app_id: expected_id.clone(),
        version,
        description,
        capabilities,
        network,
        filesystem,
        devices,
        system,
    };
    Ok((manifest, declared_order))
}

/// Parse a `"quoted string"` value, trailing whitespace already stripped by
/// the caller. Inner whitespace is preserved verbatim.
fn parse_quoted_string(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

/// Parse a `[ "a", "b" ]` list value into its quoted elements.
fn parse_quoted_list(value: &str) -> Option<Vec<String>> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|item| parse_quoted_string(item.trim()))
        .collect()
}
