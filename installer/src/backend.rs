//! Platform package backends.
//!
//! Debian-family hosts install `.deb` files through `dpkg`; RHEL and SUSE
//! hosts share the `rpm` backend. Each backend reads the package name and
//! version from the file first and skips the install when that exact version
//! is already present, so only real installs reach the recorder.

use crate::error::{InstallerError, Result};
use crate::executor::{CommandExecutor, failure_text, stdout_text};
use crate::platform::PlatformFamily;
use camino::Utf8Path;
use std::fmt;

/// The binary package tool for a platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// `dpkg`, for Debian-family systems.
    Dpkg,
    /// `rpm`, for RHEL- and SUSE-family systems.
    Rpm,
}

impl BackendKind {
    /// Select the backend for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] for families with no
    /// backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::backend::BackendKind;
    /// use addon_installer::platform::PlatformFamily;
    ///
    /// let kind = BackendKind::for_family(&PlatformFamily::Suse).expect("rpm family");
    /// assert_eq!(kind, BackendKind::Rpm);
    /// ```
    pub fn for_family(family: &PlatformFamily) -> Result<Self> {
        match family {
            PlatformFamily::Debian => Ok(Self::Dpkg),
            PlatformFamily::Rhel | PlatformFamily::Suse => Ok(Self::Rpm),
            PlatformFamily::Other(name) => Err(InstallerError::UnsupportedPlatform {
                family: name.clone(),
            }),
        }
    }

    /// The command-line tool this backend drives.
    #[must_use]
    pub fn tool(self) -> &'static str {
        match self {
            Self::Dpkg => "dpkg",
            Self::Rpm => "rpm",
        }
    }

    /// Build the backend implementation on top of `executor`.
    #[must_use]
    pub fn backend<'a>(self, executor: &'a dyn CommandExecutor) -> Box<dyn PackageBackend + 'a> {
        match self {
            Self::Dpkg => Box::new(DpkgBackend::new(executor)),
            Self::Rpm => Box::new(RpmBackend::new(executor)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool())
    }
}

/// What a backend did with a package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package was installed or upgraded to `version`.
    Installed {
        /// Version now installed.
        version: String,
    },
    /// The same version was already installed; nothing ran.
    AlreadyInstalled {
        /// Version already present.
        version: String,
    },
}

/// Installs package files through a platform package manager.
#[cfg_attr(test, mockall::automock)]
pub trait PackageBackend {
    /// Short backend name used in messages.
    fn name(&self) -> &'static str;

    /// Install `package` from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InstallBackend`] when the package manager
    /// rejects the file.
    fn install(&self, package: &str, path: &Utf8Path) -> Result<InstallOutcome>;
}

/// Name and version recorded inside a package file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackageIdentity {
    name: String,
    version: String,
}

/// Parse `name<TAB>version` from the first line of query output.
fn parse_identity(stdout: &str) -> Option<PackageIdentity> {
    let line = stdout.lines().next()?;
    let (name, version) = line.split_once('\t')?;
    let (name, version) = (name.trim(), version.trim());
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some(PackageIdentity {
        name: name.to_owned(),
        version: version.to_owned(),
    })
}

/// Run a query or install command, mapping failures to
/// [`InstallerError::InstallBackend`].
fn run_checked(
    executor: &dyn CommandExecutor,
    backend: &'static str,
    package: &str,
    cmd: &str,
    args: &[&str],
) -> Result<String> {
    let output = executor.run(cmd, args)?;
    if output.status.success() {
        Ok(stdout_text(&output))
    } else {
        Err(InstallerError::InstallBackend {
            package: package.to_owned(),
            backend,
            message: failure_text(&output),
        })
    }
}

fn read_identity(
    executor: &dyn CommandExecutor,
    backend: &'static str,
    package: &str,
    cmd: &str,
    args: &[&str],
) -> Result<PackageIdentity> {
    let stdout = run_checked(executor, backend, package, cmd, args)?;
    parse_identity(&stdout).ok_or_else(|| InstallerError::InstallBackend {
        package: package.to_owned(),
        backend,
        message: format!("cannot read package name and version from `{stdout}`"),
    })
}

/// `dpkg` backend for Debian-family systems.
pub struct DpkgBackend<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> DpkgBackend<'a> {
    /// Create a backend that runs commands through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        let output = self.executor.run(
            "dpkg-query",
            &["-W", "--showformat", "${Status}\t${Version}\n", name],
        )?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(parse_identity(&stdout_text(&output))
            .filter(|status| status.name.ends_with(" ok installed"))
            .map(|status| status.version))
    }
}

impl PackageBackend for DpkgBackend<'_> {
    fn name(&self) -> &'static str {
        "dpkg"
    }

    fn install(&self, package: &str, path: &Utf8Path) -> Result<InstallOutcome> {
        let candidate = read_identity(
            self.executor,
            self.name(),
            package,
            "dpkg-deb",
            &["-W", "--showformat", "${Package}\t${Version}\n", path.as_str()],
        )?;

        if self.installed_version(&candidate.name)?.as_deref() == Some(candidate.version.as_str()) {
            return Ok(InstallOutcome::AlreadyInstalled {
                version: candidate.version,
            });
        }

        run_checked(
            self.executor,
            self.name(),
            package,
            "dpkg",
            &["-i", path.as_str()],
        )?;
        Ok(InstallOutcome::Installed {
            version: candidate.version,
        })
    }
}

/// `rpm` backend shared by RHEL- and SUSE-family systems.
pub struct RpmBackend<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> RpmBackend<'a> {
    /// Create a backend that runs commands through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        let output = self.executor.run(
            "rpm",
            &["-q", "--queryformat", "%{VERSION}-%{RELEASE}\n", name],
        )?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(stdout_text(&output)
            .lines()
            .next()
            .map(str::to_owned)
            .filter(|version| !version.is_empty()))
    }
}

impl PackageBackend for RpmBackend<'_> {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn install(&self, package: &str, path: &Utf8Path) -> Result<InstallOutcome> {
        let candidate = read_identity(
            self.executor,
            self.name(),
            package,
            "rpm",
            &[
                "-qp",
                "--queryformat",
                "%{NAME}\t%{VERSION}-%{RELEASE}\n",
                path.as_str(),
            ],
        )?;

        let mode = match self.installed_version(&candidate.name)? {
            Some(installed) if installed == candidate.version => {
                return Ok(InstallOutcome::AlreadyInstalled {
                    version: candidate.version,
                });
            }
            Some(installed) => {
                log::info!(
                    "upgrading {} from {installed} to {}",
                    candidate.name,
                    candidate.version
                );
                "-U"
            }
            None => "-i",
        };

        run_checked(
            self.executor,
            self.name(),
            package,
            "rpm",
            &[mode, path.as_str()],
        )?;
        Ok(InstallOutcome::Installed {
            version: candidate.version,
        })
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
