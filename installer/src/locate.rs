//! Local package file discovery.
//!
//! The locate step runs after any fetch for the same package and takes the
//! fetch result as input, so a package can never be located before its
//! download has finished. Without a fetch, a configured directory is scanned
//! for `<package>*.<suffix>` and the newest match wins; a configured file is
//! used as-is.

use crate::error::{InstallerError, Result};
use crate::fetcher::FetchedArtifact;
use crate::package::PackageSpec;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::time::SystemTime;

/// Result of the fetch stage, required by [`locate_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The artifact was downloaded (or reused) and verified.
    Fetched(FetchedArtifact),
    /// No fetch ran; the artifact is expected on disk already.
    NotFetched,
}

/// Find the package file to install for `spec`.
///
/// # Errors
///
/// Returns [`InstallerError::MissingArtefact`] when a scanned directory has
/// no matching file or a fetched file has disappeared, and
/// [`InstallerError::Io`] when the directory cannot be read.
pub fn locate_package(
    spec: &PackageSpec,
    suffix: &str,
    fetch: &FetchOutcome,
) -> Result<Utf8PathBuf> {
    match fetch {
        FetchOutcome::Fetched(artifact) => {
            if artifact.path.is_file() {
                Ok(artifact.path.clone())
            } else {
                Err(InstallerError::MissingArtefact {
                    package: spec.name().to_owned(),
                    pattern: artifact.path.to_string(),
                })
            }
        }
        FetchOutcome::NotFetched if spec.source().is_dir() => {
            newest_match(spec.source(), spec.name(), suffix)?.ok_or_else(|| {
                InstallerError::MissingArtefact {
                    package: spec.name().to_owned(),
                    pattern: search_pattern(spec.source(), spec.name(), suffix),
                }
            })
        }
        FetchOutcome::NotFetched => Ok(spec.source().to_owned()),
    }
}

/// The glob-style pattern scanned for a package.
#[must_use]
pub fn search_pattern(dir: &Utf8Path, name: &str, suffix: &str) -> String {
    format!("{dir}/{name}*.{suffix}")
}

/// Scan `dir` for `<name>*.<suffix>` and return the most recently modified
/// match. Ties on modification time go to the greatest file name.
///
/// # Errors
///
/// Returns an error if the directory or file metadata cannot be read.
pub fn newest_match(dir: &Utf8Path, name: &str, suffix: &str) -> io::Result<Option<Utf8PathBuf>> {
    let extension = format!(".{suffix}");
    let mut newest: Option<(SystemTime, Utf8PathBuf)> = None;

    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let file_name = entry.file_name();
        if !file_name.starts_with(name) || !file_name.ends_with(&extension) {
            continue;
        }
        let metadata = entry.path().metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let candidate = (metadata.modified()?, entry.path().to_owned());
        log::debug!("candidate {} for {name}", candidate.1);
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|(_, path)| path))
}
