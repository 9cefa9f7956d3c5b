//! Platform descriptors and host detection.
//!
//! A [`Platform`] names the operating system, its version, the machine
//! architecture, and the [`PlatformFamily`] that selects a package backend
//! and the native package suffix. When no platform is configured it is
//! detected from `/etc/os-release`.

use crate::error::{InstallerError, Result};
use serde::Deserialize;
use std::fmt;

/// Location of the os-release file on Linux hosts.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Operating system families with distinct package formats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PlatformFamily {
    /// Debian, Ubuntu and derivatives (`.deb`).
    Debian,
    /// Red Hat Enterprise Linux, CentOS, Fedora and derivatives (`.rpm`).
    Rhel,
    /// SUSE Linux Enterprise and openSUSE (`.rpm`).
    Suse,
    /// Any other family; no backend is available.
    Other(String),
}

impl PlatformFamily {
    /// The native package file suffix, without the leading dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::platform::PlatformFamily;
    ///
    /// assert_eq!(PlatformFamily::Debian.package_suffix(), Some("deb"));
    /// assert_eq!(PlatformFamily::Suse.package_suffix(), Some("rpm"));
    /// assert_eq!(PlatformFamily::from("arch").package_suffix(), None);
    /// ```
    #[must_use]
    pub fn package_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Debian => Some("deb"),
            Self::Rhel | Self::Suse => Some("rpm"),
            Self::Other(_) => None,
        }
    }

    /// Map an os-release `ID` or `ID_LIKE` token to a family.
    fn from_os_id(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" => Some(Self::Debian),
            "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn"
            | "redhat" => Some(Self::Rhel),
            "suse" | "sles" | "sled" | "opensuse" | "opensuse-leap" => Some(Self::Suse),
            _ => None,
        }
    }
}

impl From<&str> for PlatformFamily {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "debian" => Self::Debian,
            "rhel" | "fedora" | "amazon" => Self::Rhel,
            "suse" => Self::Suse,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for PlatformFamily {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debian => f.write_str("debian"),
            Self::Rhel => f.write_str("rhel"),
            Self::Suse => f.write_str("suse"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The platform add-ons are installed on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Platform {
    /// Platform name, e.g. `ubuntu` or `centos`.
    pub name: String,
    /// Platform version, e.g. `18.04` or `7.6.1810`.
    pub version: String,
    /// Machine architecture, e.g. `x86_64`.
    #[serde(default = "host_machine")]
    pub machine: String,
    /// Platform family selecting the backend.
    pub family: PlatformFamily,
}

impl Platform {
    /// Detect the host platform from `/etc/os-release`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PlatformDetection`] when the file cannot be
    /// read or lacks an `ID`.
    pub fn detect() -> Result<Self> {
        let contents = std::fs::read_to_string(OS_RELEASE_PATH).map_err(|e| {
            InstallerError::PlatformDetection {
                reason: format!("cannot read {OS_RELEASE_PATH}: {e}"),
            }
        })?;
        let platform = parse_os_release(&contents, &host_machine())?;
        log::debug!("detected platform {platform}");
        Ok(platform)
    }

    /// The platform name as understood by the release channel service.
    ///
    /// RHEL rebuilds are published under `el`, SUSE under `sles` and Amazon
    /// Linux under `amazon`.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        match self.name.as_str() {
            "rhel" | "redhat" | "centos" | "rocky" | "almalinux" | "ol" | "oracle" => "el",
            "sles" | "opensuse-leap" | "opensuse" => "sles",
            "amzn" => "amazon",
            other => other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {} family)",
            self.name, self.version, self.machine, self.family
        )
    }
}

/// The architecture this binary was compiled for.
#[must_use]
pub fn host_machine() -> String {
    std::env::consts::ARCH.to_owned()
}

/// Parse the contents of an os-release file.
///
/// The family is taken from `ID` when recognised, otherwise from the first
/// recognised token of `ID_LIKE`.
///
/// # Errors
///
/// Returns [`InstallerError::PlatformDetection`] when `ID` is missing.
///
/// # Examples
///
/// ```
/// use addon_installer::platform::{PlatformFamily, parse_os_release};
///
/// let contents = "ID=ubuntu\nVERSION_ID=\"18.04\"\nID_LIKE=debian\n";
/// let platform = parse_os_release(contents, "x86_64").expect("valid os-release");
/// assert_eq!(platform.family, PlatformFamily::Debian);
/// assert_eq!(platform.version, "18.04");
/// ```
pub fn parse_os_release(contents: &str, machine: &str) -> Result<Platform> {
    let mut id = None;
    let mut version = None;
    let mut id_like = None;

    for line in contents.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "ID" => id = Some(value.to_ascii_lowercase()),
            "VERSION_ID" => version = Some(value.to_owned()),
            "ID_LIKE" => id_like = Some(value.to_ascii_lowercase()),
            _ => {}
        }
    }

    let name = id.ok_or_else(|| InstallerError::PlatformDetection {
        reason: "os-release has no ID field".to_owned(),
    })?;
    let family = PlatformFamily::from_os_id(&name)
        .or_else(|| {
            id_like
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .find_map(PlatformFamily::from_os_id)
        })
        .unwrap_or_else(|| PlatformFamily::Other(name.clone()));

    Ok(Platform {
        name,
        version: version.unwrap_or_default(),
        machine: machine.to_owned(),
        family,
    })
}
