//! Add-on install orchestration.
//!
//! [`AddonRun`] walks the configured packages in order. For each one it
//! resolves and downloads the artifact (remote mode only), locates the
//! package file from that fetch result, installs it through the platform
//! backend, and records it when the backend actually installed something.
//! The first failure halts the run.

use crate::backend::{InstallOutcome, PackageBackend};
use crate::config::{AddonConfig, Mode};
use crate::error::{InstallerError, Result};
use crate::fetcher::{ArtifactDownloader, fetch_artifact};
use crate::locate::{FetchOutcome, locate_package};
use crate::locator::{ArtifactResolver, locate_artifact};
use crate::package::{PackageSpec, PackageStage};
use crate::platform::Platform;
use crate::recorder::{InstallRecorder, RunHandler, RunHandlers, RunOutcome};
use std::io::Write;
use std::sync::Arc;

/// External services used by a run.
#[derive(Clone, Copy)]
pub struct InstallDeps<'a> {
    /// Release metadata service.
    pub resolver: &'a dyn ArtifactResolver,
    /// Artifact download transport.
    pub downloader: &'a dyn ArtifactDownloader,
    /// Platform package manager.
    pub backend: &'a dyn PackageBackend,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packages the backend installed, in order.
    pub installed: Vec<String>,
    /// Packages skipped because the same version was present.
    pub already_installed: Vec<String>,
}

/// One add-on installation run.
pub struct AddonRun<'a> {
    config: &'a AddonConfig,
    platform: &'a Platform,
    suffix: &'static str,
    deps: InstallDeps<'a>,
    recorder: Arc<InstallRecorder>,
}

impl<'a> AddonRun<'a> {
    /// Prepare a run and register its recorder with `handlers`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] when the platform
    /// family has no native package format.
    pub fn new(
        config: &'a AddonConfig,
        platform: &'a Platform,
        deps: InstallDeps<'a>,
        handlers: &mut RunHandlers,
    ) -> Result<Self> {
        let suffix =
            platform
                .family
                .package_suffix()
                .ok_or_else(|| InstallerError::UnsupportedPlatform {
                    family: platform.family.to_string(),
                })?;
        let recorder = Arc::new(InstallRecorder::default());
        let handler: Arc<dyn RunHandler> = recorder.clone();
        handlers.register(handler);
        Ok(Self {
            config,
            platform,
            suffix,
            deps,
            recorder,
        })
    }

    /// The recorder collecting this run's installs.
    #[must_use]
    pub fn recorder(&self) -> &InstallRecorder {
        &self.recorder
    }

    /// Process every configured package in order.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PackageFailed`] for the first package that
    /// fails; later packages are not attempted.
    pub fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for spec in self.config.package_specs() {
            match self.install_package(&spec)? {
                InstallOutcome::Installed { .. } => {
                    summary.installed.push(spec.name().to_owned());
                }
                InstallOutcome::AlreadyInstalled { .. } => {
                    summary.already_installed.push(spec.name().to_owned());
                }
            }
        }
        Ok(summary)
    }

    fn install_package(&self, spec: &PackageSpec) -> Result<InstallOutcome> {
        let name = spec.name();
        let failed = |stage: PackageStage| move |err: InstallerError| err.for_package(name, stage);
        log::debug!("{name}: {}", PackageStage::Pending);

        let fetch = match self.config.mode {
            Mode::Remote => {
                log::debug!("{name}: {}", PackageStage::Fetching);
                let info = locate_artifact(
                    spec,
                    self.platform,
                    self.config.locator,
                    self.deps.resolver,
                )
                .map_err(failed(PackageStage::Fetching))?;
                let artifact = fetch_artifact(&info, spec.source(), self.deps.downloader)
                    .map_err(failed(PackageStage::Fetching))?;
                FetchOutcome::Fetched(artifact)
            }
            Mode::Local => FetchOutcome::NotFetched,
        };

        log::debug!("{name}: {}", PackageStage::Locating);
        let path = locate_package(spec, self.suffix, &fetch)
            .map_err(failed(PackageStage::Locating))?;
        log::debug!("{name}: {} at {path}", PackageStage::Located);

        log::debug!(
            "{name}: {} with {}",
            PackageStage::Installing,
            self.deps.backend.name()
        );
        let outcome = self
            .deps
            .backend
            .install(name, &path)
            .map_err(failed(PackageStage::Installing))?;

        match &outcome {
            InstallOutcome::Installed { version } => {
                self.recorder.add(name);
                log::info!("{name}: {} {version}", PackageStage::Installed);
            }
            InstallOutcome::AlreadyInstalled { version } => {
                log::warn!("{name} {version} is already installed; skipping");
            }
        }
        Ok(outcome)
    }
}

/// Report a finished run through the handler list matching its result.
///
/// # Errors
///
/// Returns [`InstallerError::WriteFailed`] if the report cannot be written.
pub fn finish<T>(handlers: &RunHandlers, result: &Result<T>, out: &mut dyn Write) -> Result<()> {
    let outcome = if result.is_ok() {
        RunOutcome::Succeeded
    } else {
        RunOutcome::Failed
    };
    handlers
        .finish(outcome, out)
        .map_err(|source| InstallerError::WriteFailed { source })
}

#[cfg(test)]
#[path = "install_flow_tests.rs"]
mod tests;
