//! Add-on package identities and per-package workflow stages.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Vendor prefixes stripped from package names to derive product identifiers.
pub const VENDOR_PREFIXES: &[&str] = &["chef-", "opscode-"];

/// One configured add-on package.
///
/// # Examples
///
/// ```
/// use addon_installer::package::PackageSpec;
///
/// let spec = PackageSpec::new("chef-manage", "/var/cache/addons");
/// assert_eq!(spec.name(), "chef-manage");
/// assert_eq!(spec.product(), "manage");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    name: String,
    product: String,
    source: Utf8PathBuf,
}

impl PackageSpec {
    /// Create a spec for `name`, reading artifacts from `source`.
    ///
    /// `source` is the cache directory in remote mode, or the configured
    /// package directory or file in local mode.
    #[must_use]
    pub fn new(name: &str, source: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.to_owned(),
            product: product_identifier(name).to_owned(),
            source: source.into(),
        }
    }

    /// The package name as configured.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The release-channel product identifier.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Where this package's artifact lives or will be cached.
    #[must_use]
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }
}

/// Strip a recognised vendor prefix from `name`.
///
/// Names without a vendor prefix are returned unchanged. Only a leading
/// prefix counts: `my-chef-addon` stays `my-chef-addon` rather than being
/// split at the embedded `chef-`.
///
/// # Examples
///
/// ```
/// use addon_installer::package::product_identifier;
///
/// assert_eq!(product_identifier("chef-manage"), "manage");
/// assert_eq!(product_identifier("opscode-analytics"), "analytics");
/// assert_eq!(product_identifier("push-jobs-server"), "push-jobs-server");
/// assert_eq!(product_identifier("my-chef-addon"), "my-chef-addon");
/// ```
#[must_use]
pub fn product_identifier(name: &str) -> &str {
    VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
}

/// The stage a package has reached in its workflow.
///
/// Packages move through
/// `Pending → (Fetching →)? Locating → Located → Installing → Installed`.
/// Any stage may end in failure; the stage is then carried by
/// [`InstallerError::PackageFailed`](crate::error::InstallerError::PackageFailed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageStage {
    /// Not yet started.
    Pending,
    /// Resolving and downloading the remote artifact.
    Fetching,
    /// Finding the local package file.
    Locating,
    /// A local package file has been selected.
    Located,
    /// Running the package backend.
    Installing,
    /// The backend installed the package.
    Installed,
}

impl fmt::Display for PackageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Locating => "locating",
            Self::Located => "located",
            Self::Installing => "installing",
            Self::Installed => "installed",
        };
        f.write_str(label)
    }
}
