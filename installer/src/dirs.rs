//! Platform directory resolution.
//!
//! Default locations for the configuration file and the package cache come
//! from the platform's per-user directories. The [`BaseDirs`] trait keeps
//! that lookup out of the code that consumes it so tests can supply paths.

use crate::error::{Result, utf8_path};
use camino::Utf8PathBuf;
use directories_next::ProjectDirs;
use std::path::PathBuf;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "addons.toml";

/// Subdirectory of the cache directory that holds downloaded packages.
pub const PACKAGE_CACHE_DIR: &str = "packages";

/// Source of per-user base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory holding the installer's configuration.
    fn config_dir(&self) -> Option<PathBuf>;

    /// Directory holding cached downloads.
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the host's platform conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "addon-installer")
    }
}

impl BaseDirs for SystemBaseDirs {
    fn config_dir(&self) -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.cache_dir().to_path_buf())
    }
}

/// The default configuration file path, if a config directory exists.
///
/// # Errors
///
/// Returns [`InstallerError::NonUtf8Path`](crate::error::InstallerError::NonUtf8Path)
/// if the directory is not UTF-8.
pub fn default_config_path(dirs: &dyn BaseDirs) -> Result<Option<Utf8PathBuf>> {
    dirs.config_dir()
        .map(|dir| utf8_path(dir).map(|dir| dir.join(CONFIG_FILE_NAME)))
        .transpose()
}

/// The default package cache directory, if a cache directory exists.
///
/// # Errors
///
/// Returns [`InstallerError::NonUtf8Path`](crate::error::InstallerError::NonUtf8Path)
/// if the directory is not UTF-8.
pub fn default_cache_dir(dirs: &dyn BaseDirs) -> Result<Option<Utf8PathBuf>> {
    dirs.cache_dir()
        .map(|dir| utf8_path(dir).map(|dir| dir.join(PACKAGE_CACHE_DIR)))
        .transpose()
}
