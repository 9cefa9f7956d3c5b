//! Run configuration.
//!
//! Settings come from an `addons.toml` file and are then overridden by
//! command-line flags. [`AddonConfig::resolve`] validates the merged result
//! and fixes the install mode and artifact source for the whole run.
//!
//! ```toml
//! packages = ["chef-manage", "opscode-reporting"]
//! remote_install = true
//! cache_dir = "/var/cache/addon-installer"
//! channel = "stable"
//!
//! [platform]
//! name = "ubuntu"
//! version = "18.04"
//! family = "debian"
//! ```

use crate::dirs::{BaseDirs, default_cache_dir, default_config_path};
use crate::locator::{Channel, DEFAULT_RESOLVER_URL, LocatorSettings};
use crate::package::PackageSpec;
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// The file that was read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this installer.
    #[error("invalid configuration in {path}: {reason}")]
    Parse {
        /// The file that was parsed.
        path: String,
        /// The TOML parser message.
        reason: String,
    },

    /// The merged configuration is inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

/// How packages reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resolve, download and verify each package before installing.
    Remote,
    /// Install package files already present on disk.
    Local,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// The configuration file as written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Add-on package names, installed in order.
    pub packages: Vec<String>,
    /// Fetch packages from the release channel.
    pub remote_install: bool,
    /// Download cache used in remote mode.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Package directory or file used in local mode.
    pub path: Option<Utf8PathBuf>,
    /// Release channel.
    pub channel: Channel,
    /// Accept builds for less specific platform versions.
    pub compatibility_mode: bool,
    /// Release metadata service base URL.
    pub resolver_url: Option<String>,
    /// Platform override; detected when absent.
    pub platform: Option<Platform>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            remote_install: false,
            cache_dir: None,
            path: None,
            channel: Channel::Stable,
            compatibility_mode: true,
            resolver_url: None,
            platform: None,
        }
    }
}

impl ConfigFile {
    /// Parse configuration text; `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::config::ConfigFile;
    ///
    /// let file = ConfigFile::parse("packages = [\"chef-manage\"]", "inline")
    ///     .expect("valid configuration");
    /// assert_eq!(file.packages, ["chef-manage"]);
    /// assert!(file.compatibility_mode);
    /// ```
    pub fn parse(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_owned(),
            reason: e.message().to_owned(),
        })
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is invalid.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents, path.as_str())
    }

    /// Load `explicit` if given, else the default file when it exists, else
    /// an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be loaded.
    pub fn discover(
        explicit: Option<&Utf8Path>,
        dirs: &dyn BaseDirs,
    ) -> crate::error::Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::load(path)?);
        }
        match default_config_path(dirs)? {
            Some(path) if path.is_file() => {
                log::debug!("loading configuration from {path}");
                Ok(Self::load(&path)?)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Command-line settings that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Packages replacing the configured list when non-empty.
    pub packages: Vec<String>,
    /// Forced install mode.
    pub mode: Option<Mode>,
    /// Cache directory for remote mode.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Package directory or file for local mode.
    pub path: Option<Utf8PathBuf>,
    /// Release channel.
    pub channel: Option<Channel>,
    /// Require an exact platform version match.
    pub no_compatibility_mode: bool,
}

/// Validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonConfig {
    /// Add-on package names in install order, without duplicates.
    pub packages: Vec<String>,
    /// Install mode for the whole run.
    pub mode: Mode,
    /// Cache directory (remote) or package path (local).
    pub source: Utf8PathBuf,
    /// Artifact resolution settings.
    pub locator: LocatorSettings,
    /// Release metadata service base URL.
    pub resolver_url: String,
    /// Platform override, if configured.
    pub platform: Option<Platform>,
}

impl AddonConfig {
    /// Merge `file` with `overrides` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a package name is empty, local
    /// mode has no path, or remote mode has no usable cache directory.
    pub fn resolve(
        file: ConfigFile,
        overrides: &ConfigOverrides,
        dirs: &dyn BaseDirs,
    ) -> crate::error::Result<Self> {
        let mode = overrides.mode.unwrap_or(if file.remote_install {
            Mode::Remote
        } else {
            Mode::Local
        });

        let requested = if overrides.packages.is_empty() {
            file.packages
        } else {
            overrides.packages.clone()
        };
        let packages = dedupe_packages(requested)?;

        let source = match mode {
            Mode::Local => overrides
                .path
                .clone()
                .or(file.path)
                .ok_or_else(|| invalid("local installs need a package `path`"))?,
            Mode::Remote => match overrides.cache_dir.clone().or(file.cache_dir) {
                Some(dir) => dir,
                None => default_cache_dir(dirs)?.ok_or_else(|| {
                    invalid("remote installs need a `cache_dir`; no platform cache directory found")
                })?,
            },
        };

        Ok(Self {
            packages,
            mode,
            source,
            locator: LocatorSettings {
                channel: overrides.channel.unwrap_or(file.channel),
                compatibility_mode: file.compatibility_mode && !overrides.no_compatibility_mode,
            },
            resolver_url: file
                .resolver_url
                .unwrap_or_else(|| DEFAULT_RESOLVER_URL.to_owned()),
            platform: file.platform,
        })
    }

    /// One [`PackageSpec`] per configured package, in order.
    #[must_use]
    pub fn package_specs(&self) -> Vec<PackageSpec> {
        self.packages
            .iter()
            .map(|name| PackageSpec::new(name, self.source.clone()))
            .collect()
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

fn dedupe_packages(requested: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let mut packages: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(invalid("package names must not be empty"));
        }
        if packages.contains(&name) {
            log::warn!("skipping duplicate package {name}");
            continue;
        }
        packages.push(name);
    }
    Ok(packages)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
