//! Artifact download into the local package cache.
//!
//! Downloads land in a temporary file inside the cache directory and are
//! only moved to `cache_dir/basename(url)` once their SHA-256 digest
//! matches the published checksum. A file already cached with the right
//! digest is reused without touching the network.

use crate::digest::{Sha256Digest, compute_sha256};
use crate::error::{InstallerError, Result};
use crate::locator::ArtifactInfo;
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for metadata queries and artifact downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Trait for downloading an artifact to a local file.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactDownloader {
    /// Download `url` into the file at `dest`, replacing its contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or file write fails.
    fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), DownloadError>;
}

/// Errors arising from artifact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artifact was not found (HTTP 404).
    #[error("artifact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The URL has no file name to cache the artifact under.
    #[error("cannot derive a file name from {url}")]
    NoFileName {
        /// The rejected URL.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl ArtifactDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file)?;
        file.sync_all()?;
        Ok(())
    }
}

/// Shared `ureq` agent with request timeout configuration.
pub(crate) fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// How a failed request through [`http_agent`] is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HttpFailure {
    /// The server answered 404.
    NotFound,
    /// Any other status or transport failure, rendered for display.
    Other(String),
}

impl HttpFailure {
    /// Classify a ureq error.
    pub(crate) fn from_ureq(err: &ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    let url = url.to_owned();
    match HttpFailure::from_ureq(err) {
        HttpFailure::NotFound => DownloadError::NotFound { url },
        HttpFailure::Other(reason) => DownloadError::HttpError { url, reason },
    }
}

/// A verified artifact in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// Cached file path.
    pub path: Utf8PathBuf,
    /// Verified digest of the cached file.
    pub sha256: Sha256Digest,
    /// True when an existing cached file was reused.
    pub reused: bool,
}

/// The file name an artifact URL is cached under.
///
/// Query strings and fragments are ignored.
///
/// # Examples
///
/// ```
/// use addon_installer::fetcher::cache_file_name;
///
/// assert_eq!(
///     cache_file_name("https://packages.example/stable/manage_2.5.16-1_amd64.deb?token=x"),
///     Some("manage_2.5.16-1_amd64.deb")
/// );
/// assert_eq!(cache_file_name("https://packages.example/"), None);
/// ```
#[must_use]
pub fn cache_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, resource) = after_scheme.split_once('/')?;
    resource.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Download `info` into `cache_dir` and verify its checksum.
///
/// # Errors
///
/// Returns [`InstallerError::DownloadFailed`] when the transport fails and
/// [`InstallerError::Integrity`] when the downloaded bytes do not match the
/// published digest. In both cases nothing is written to the destination.
pub fn fetch_artifact(
    info: &ArtifactInfo,
    cache_dir: &Utf8Path,
    downloader: &dyn ArtifactDownloader,
) -> Result<FetchedArtifact> {
    let download_error = |source| InstallerError::DownloadFailed {
        url: info.url.clone(),
        source,
    };
    let file_name = cache_file_name(&info.url).ok_or_else(|| {
        download_error(DownloadError::NoFileName {
            url: info.url.clone(),
        })
    })?;

    std::fs::create_dir_all(cache_dir)?;
    let dest = cache_dir.join(file_name);

    if dest.is_file() && compute_sha256(dest.as_std_path())? == info.sha256 {
        log::info!("reusing cached {dest}; checksum matches");
        return Ok(FetchedArtifact {
            path: dest,
            sha256: info.sha256.clone(),
            reused: true,
        });
    }

    let staged = tempfile::Builder::new()
        .prefix(".addon-download-")
        .tempfile_in(cache_dir)?;
    log::debug!("downloading {} to {dest}", info.url);
    downloader
        .download(&info.url, staged.path())
        .map_err(download_error)?;

    let actual = compute_sha256(staged.path())?;
    if actual != info.sha256 {
        return Err(InstallerError::Integrity {
            path: info.url.clone(),
            expected: info.sha256.to_string(),
            actual: actual.to_string(),
        });
    }

    staged
        .persist(dest.as_std_path())
        .map_err(|e| InstallerError::Io(e.error))?;
    log::info!("fetched {} ({})", dest, info.version);

    Ok(FetchedArtifact {
        path: dest,
        sha256: actual,
        reused: false,
    })
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
