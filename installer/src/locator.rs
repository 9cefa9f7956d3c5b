//! Release-channel artifact resolution.
//!
//! In remote mode each add-on is resolved to a download URL and SHA-256
//! checksum by asking the release metadata service for the latest build of
//! the product on the current platform. The service is reached through the
//! [`ArtifactResolver`] trait so tests can script its answers.

use crate::digest::Sha256Digest;
use crate::error::{InstallerError, Result};
use crate::fetcher::{HttpFailure, http_agent};
use crate::package::PackageSpec;
use crate::platform::Platform;
use serde::Deserialize;
use std::fmt;

/// Default release metadata service.
pub const DEFAULT_RESOLVER_URL: &str = "https://omnitruck.chef.io";

/// The version requested from the release channel.
pub const LATEST: &str = "latest";

/// Release stability tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Promoted, supported releases.
    #[default]
    Stable,
    /// Builds that passed the release pipeline but are not yet promoted.
    Current,
    /// Every build.
    Unstable,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => f.write_str("stable"),
            Self::Current => f.write_str("current"),
            Self::Unstable => f.write_str("unstable"),
        }
    }
}

/// One metadata lookup against the release service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    /// Release channel to search.
    pub channel: Channel,
    /// Product identifier (package name without vendor prefix).
    pub product: String,
    /// Requested product version.
    pub version: String,
    /// Platform name in release-channel terms.
    pub platform: String,
    /// Platform version to match.
    pub platform_version: String,
    /// Machine architecture.
    pub machine: String,
}

impl MetadataRequest {
    /// Short description used in logs and errors.
    #[must_use]
    pub fn platform_label(&self) -> String {
        format!(
            "{} {} {}",
            self.platform, self.platform_version, self.machine
        )
    }
}

/// Where and how to download one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Download URL.
    pub url: String,
    /// Published SHA-256 checksum.
    pub sha256: Sha256Digest,
    /// Platform the build was published for.
    pub platform: String,
    /// Resolved product version.
    pub version: String,
}

/// Errors reported by a release metadata service.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No build matches the request.
    #[error("no matching build at {url}")]
    NotFound {
        /// The metadata URL that was queried.
        url: String,
    },

    /// The request failed.
    #[error("metadata request to {url} failed: {reason}")]
    Http {
        /// The metadata URL that was queried.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The response body was not valid metadata.
    #[error("malformed metadata from {url}: {reason}")]
    Malformed {
        /// The metadata URL that was queried.
        url: String,
        /// Description of the parse failure.
        reason: String,
    },
}

/// A source of release artifact metadata.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactResolver {
    /// Look up the build matching `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when nothing matches, or another
    /// variant when the service cannot be queried.
    fn metadata(&self, request: &MetadataRequest) -> std::result::Result<ArtifactInfo, ResolveError>;
}

/// Options for artifact resolution that stay fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorSettings {
    /// Release channel to search.
    pub channel: Channel,
    /// Accept builds published for a less specific platform version.
    pub compatibility_mode: bool,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            channel: Channel::Stable,
            compatibility_mode: true,
        }
    }
}

/// Resolve the latest artifact for `spec` on `platform`.
///
/// With compatibility mode on, a missing build for the exact platform
/// version is retried with progressively shorter versions (`7.4.1708`,
/// `7.4`, `7`).
///
/// # Errors
///
/// Returns [`InstallerError::Resolution`] when no build matches or the
/// service cannot be queried.
pub fn locate_artifact(
    spec: &PackageSpec,
    platform: &Platform,
    settings: LocatorSettings,
    resolver: &dyn ArtifactResolver,
) -> Result<ArtifactInfo> {
    let resolution_error = |reason: String| InstallerError::Resolution {
        product: spec.product().to_owned(),
        channel: settings.channel.to_string(),
        platform: platform.to_string(),
        reason,
    };

    let candidates = platform_version_candidates(&platform.version, settings.compatibility_mode);
    for platform_version in &candidates {
        let request = MetadataRequest {
            channel: settings.channel,
            product: spec.product().to_owned(),
            version: LATEST.to_owned(),
            platform: platform.channel_name().to_owned(),
            platform_version: platform_version.clone(),
            machine: platform.machine.clone(),
        };
        log::debug!(
            "resolving {} on {}",
            request.product,
            request.platform_label()
        );
        match resolver.metadata(&request) {
            Ok(info) => {
                log::info!("resolved {} {} at {}", spec.name(), info.version, info.url);
                return Ok(info);
            }
            Err(ResolveError::NotFound { url }) => {
                log::debug!("no build at {url}");
            }
            Err(other) => return Err(resolution_error(other.to_string())),
        }
    }

    Err(resolution_error(format!(
        "no build for platform versions {}",
        candidates.join(", ")
    )))
}

/// Platform versions to try, most specific first.
///
/// # Examples
///
/// ```
/// use addon_installer::locator::platform_version_candidates;
///
/// assert_eq!(platform_version_candidates("7.4.1708", true), ["7.4.1708", "7.4", "7"]);
/// assert_eq!(platform_version_candidates("7.4.1708", false), ["7.4.1708"]);
/// ```
#[must_use]
pub fn platform_version_candidates(version: &str, compatibility_mode: bool) -> Vec<String> {
    let mut candidates = vec![version.to_owned()];
    if compatibility_mode {
        let mut current = version;
        while let Some((shorter, _)) = current.rsplit_once('.') {
            if shorter.is_empty() {
                break;
            }
            candidates.push(shorter.to_owned());
            current = shorter;
        }
    }
    candidates
}

/// Metadata body returned by the release service.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    url: String,
    sha256: Sha256Digest,
    version: String,
}

/// HTTP client for an omnitruck-style release metadata service.
///
/// Requests take the form
/// `GET {base}/{channel}/{product}/metadata?v=..&p=..&pv=..&m=..`.
#[derive(Debug, Clone)]
pub struct OmnitruckResolver {
    base_url: String,
}

impl OmnitruckResolver {
    /// Create a resolver for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The metadata URL for `request`.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::locator::{Channel, MetadataRequest, OmnitruckResolver};
    ///
    /// let resolver = OmnitruckResolver::new("https://omnitruck.example/");
    /// let request = MetadataRequest {
    ///     channel: Channel::Stable,
    ///     product: "manage".to_owned(),
    ///     version: "latest".to_owned(),
    ///     platform: "ubuntu".to_owned(),
    ///     platform_version: "18.04".to_owned(),
    ///     machine: "x86_64".to_owned(),
    /// };
    /// assert_eq!(
    ///     resolver.metadata_url(&request),
    ///     "https://omnitruck.example/stable/manage/metadata?v=latest&p=ubuntu&pv=18.04&m=x86_64"
    /// );
    /// ```
    #[must_use]
    pub fn metadata_url(&self, request: &MetadataRequest) -> String {
        format!(
            "{}/{}/{}/metadata?v={}&p={}&pv={}&m={}",
            self.base_url,
            request.channel,
            request.product,
            request.version,
            request.platform,
            request.platform_version,
            request.machine
        )
    }
}

impl Default for OmnitruckResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVER_URL)
    }
}

impl ArtifactResolver for OmnitruckResolver {
    fn metadata(&self, request: &MetadataRequest) -> std::result::Result<ArtifactInfo, ResolveError> {
        let url = self.metadata_url(request);
        let response = http_agent()
            .get(&url)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| ResolveError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let parsed = parse_metadata(&url, &body)?;
        Ok(ArtifactInfo {
            url: parsed.url,
            sha256: parsed.sha256,
            platform: request.platform_label(),
            version: parsed.version,
        })
    }
}

fn parse_metadata(url: &str, body: &str) -> std::result::Result<MetadataResponse, ResolveError> {
    serde_json::from_str(body).map_err(|e| ResolveError::Malformed {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> ResolveError {
    let url = url.to_owned();
    match HttpFailure::from_ureq(err) {
        HttpFailure::NotFound => ResolveError::NotFound { url },
        HttpFailure::Other(reason) => ResolveError::Http { url, reason },
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
