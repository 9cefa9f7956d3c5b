//! Error types for the add-on installer.
//!
//! This module defines semantic error variants that provide actionable guidance
//! to operators when an add-on run fails. Component-level errors (resolution,
//! download, configuration) are folded into [`InstallerError`] with enough
//! context to name the package and the stage that failed.

use crate::config::ConfigError;
use crate::digest::DigestError;
use crate::fetcher::DownloadError;
use crate::package::PackageStage;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during an add-on installation run.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The configuration file or CLI overrides were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The host platform could not be detected.
    #[error("platform detection failed: {reason}")]
    PlatformDetection {
        /// Description of why detection failed.
        reason: String,
    },

    /// No package backend exists for the platform family.
    #[error("no package backend for platform family {family}; supported: debian, rhel, suse")]
    UnsupportedPlatform {
        /// The unrecognised platform family.
        family: String,
    },

    /// The release channel holds no artifact for the platform.
    #[error("no {channel} artifact for {product} on {platform}: {reason}")]
    Resolution {
        /// Product identifier that was queried.
        product: String,
        /// Release channel that was queried.
        channel: String,
        /// Platform descriptor used for the query.
        platform: String,
        /// Description of the resolution failure.
        reason: String,
    },

    /// Downloading an artifact failed.
    #[error("failed to download {url}")]
    DownloadFailed {
        /// The URL that was requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: DownloadError,
    },

    /// A downloaded artifact did not match its published checksum.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Integrity {
        /// The artifact URL or path being verified.
        path: String,
        /// The published SHA-256 digest.
        expected: String,
        /// The SHA-256 digest of the bytes on disk.
        actual: String,
    },

    /// No local package file matched the expected name pattern.
    #[error("missing artifact for {package}: nothing matches {pattern}")]
    MissingArtefact {
        /// Name of the package being located.
        package: String,
        /// The pattern that was searched for.
        pattern: String,
    },

    /// The package manager rejected the package.
    #[error("{backend} failed to install {package}: {message}")]
    InstallBackend {
        /// Name of the package being installed.
        package: String,
        /// The backend that ran the install.
        backend: &'static str,
        /// Trimmed stderr or a description of the failure.
        message: String,
    },

    /// A file could not be hashed.
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// A package failed at a given stage of its workflow.
    #[error("add-on {package} failed while {stage}: {source}")]
    PackageFailed {
        /// Name of the failed package.
        package: String,
        /// The stage the package had reached.
        stage: PackageStage,
        /// The error that stopped the package.
        #[source]
        source: Box<InstallerError>,
    },

    /// A path was not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    /// Wrap `self` with the package and stage it interrupted.
    #[must_use]
    pub fn for_package(self, package: &str, stage: PackageStage) -> Self {
        Self::PackageFailed {
            package: package.to_owned(),
            stage,
            source: Box::new(self),
        }
    }

    /// Build a [`InstallerError::NonUtf8Path`] from a rejected path.
    #[must_use]
    pub fn non_utf8(path: &std::path::Path) -> Self {
        Self::NonUtf8Path {
            path: path.display().to_string(),
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

/// Convert a standard path into a UTF-8 path.
///
/// # Errors
///
/// Returns [`InstallerError::NonUtf8Path`] when the path is not UTF-8.
pub fn utf8_path(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|rejected| InstallerError::non_utf8(&rejected))
}
