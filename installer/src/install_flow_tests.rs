//! Unit tests for add-on install orchestration.

use super::*;
use crate::backend::MockPackageBackend;
use crate::digest::Sha256Digest;
use crate::fetcher::MockArtifactDownloader;
use crate::locator::{ArtifactInfo, LocatorSettings, MetadataRequest, MockArtifactResolver};
use crate::platform::PlatformFamily;
use crate::recorder::REPORT_PREFIX;
use crate::test_utils::sha256_hex;
use camino::Utf8PathBuf;
use mockall::Sequence;
use rstest::{fixture, rstest};
use std::sync::Mutex;

struct Workspace {
    _temp: tempfile::TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    Workspace { _temp: temp, path }
}

#[fixture]
fn ubuntu() -> Platform {
    Platform {
        name: "ubuntu".to_owned(),
        version: "18.04".to_owned(),
        machine: "x86_64".to_owned(),
        family: PlatformFamily::Debian,
    }
}

fn config(mode: Mode, source: &Utf8PathBuf, packages: &[&str]) -> AddonConfig {
    AddonConfig {
        packages: packages.iter().map(|name| (*name).to_owned()).collect(),
        mode,
        source: source.clone(),
        locator: LocatorSettings::default(),
        resolver_url: "https://omnitruck.example".to_owned(),
        platform: None,
    }
}

fn artifact_url(request: &MetadataRequest) -> String {
    format!("https://packages.example/{}_1.0.0-1_amd64.deb", request.product)
}

fn published(request: &MetadataRequest) -> ArtifactInfo {
    let url = artifact_url(request);
    ArtifactInfo {
        sha256: Sha256Digest::try_from(sha256_hex(url.as_bytes())).expect("valid digest"),
        url,
        platform: request.platform_label(),
        version: "1.0.0".to_owned(),
    }
}

type Seen = Arc<Mutex<Vec<String>>>;

/// Backend that installs everything and remembers what it saw.
fn recording_backend(seen: &Seen) -> MockPackageBackend {
    let seen = Arc::clone(seen);
    let mut backend = MockPackageBackend::new();
    backend.expect_name().return_const("dpkg");
    backend.expect_install().returning(move |package, path| {
        seen.lock()
            .expect("lock")
            .push(format!("{package}={}", path.file_name().unwrap_or_default()));
        Ok(InstallOutcome::Installed {
            version: "1.0.0".to_owned(),
        })
    });
    backend
}

fn report(handlers: &RunHandlers, result: &Result<RunSummary>) -> String {
    let mut out = Vec::new();
    finish(handlers, result, &mut out).expect("report written");
    String::from_utf8(out).expect("UTF-8 report")
}

#[rstest]
fn local_mode_never_resolves_or_downloads(workspace: Workspace, ubuntu: Platform) {
    std::fs::write(workspace.path.join("chef-manage-2.5.16.deb"), b"deb").expect("write");
    std::fs::write(workspace.path.join("opscode-reporting-1.0.deb"), b"deb").expect("write");

    let mut resolver = MockArtifactResolver::new();
    resolver.expect_metadata().never();
    let mut downloader = MockArtifactDownloader::new();
    downloader.expect_download().never();
    let seen = Seen::default();
    let backend = recording_backend(&seen);

    let config = config(
        Mode::Local,
        &workspace.path,
        &["chef-manage", "opscode-reporting"],
    );
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");
    let result = run.run();

    assert_eq!(
        result.as_ref().expect("run succeeds").installed,
        ["chef-manage", "opscode-reporting"]
    );
    assert_eq!(
        *seen.lock().expect("lock"),
        [
            "chef-manage=chef-manage-2.5.16.deb",
            "opscode-reporting=opscode-reporting-1.0.deb"
        ]
    );
    assert_eq!(
        report(&handlers, &result),
        format!("{REPORT_PREFIX}chef-manage\n{REPORT_PREFIX}opscode-reporting\n")
    );
}

#[rstest]
fn remote_mode_resolves_each_package_before_its_download(workspace: Workspace, ubuntu: Platform) {
    let mut resolver = MockArtifactResolver::new();
    let mut downloader = MockArtifactDownloader::new();
    let mut seq = Sequence::new();
    for product in ["manage", "reporting"] {
        resolver
            .expect_metadata()
            .withf(move |request| request.product == product)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|request| Ok(published(request)));
        downloader
            .expect_download()
            .withf(move |url, _| url.contains(product))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, dest| {
                std::fs::write(dest, url)?;
                Ok(())
            });
    }
    let seen = Seen::default();
    let backend = recording_backend(&seen);

    let config = config(
        Mode::Remote,
        &workspace.path,
        &["chef-manage", "opscode-reporting"],
    );
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");
    let result = run.run();

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(
        *seen.lock().expect("lock"),
        [
            "chef-manage=manage_1.0.0-1_amd64.deb",
            "opscode-reporting=reporting_1.0.0-1_amd64.deb"
        ]
    );
    assert!(workspace.path.join("manage_1.0.0-1_amd64.deb").is_file());
    assert_eq!(report(&handlers, &result).lines().count(), 2);
}

#[rstest]
fn checksum_mismatch_stops_install_and_report(workspace: Workspace, ubuntu: Platform) {
    let mut resolver = MockArtifactResolver::new();
    resolver
        .expect_metadata()
        .returning(|request| Ok(published(request)));
    let mut downloader = MockArtifactDownloader::new();
    downloader.expect_download().returning(|url, dest| {
        let body = if url.contains("reporting") {
            "tampered"
        } else {
            url
        };
        std::fs::write(dest, body)?;
        Ok(())
    });
    let seen = Seen::default();
    let backend = recording_backend(&seen);

    let config = config(
        Mode::Remote,
        &workspace.path,
        &["chef-manage", "opscode-reporting", "opscode-analytics"],
    );
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");
    let result = run.run();

    match &result {
        Err(InstallerError::PackageFailed {
            package,
            stage,
            source,
        }) => {
            assert_eq!(package, "opscode-reporting");
            assert_eq!(*stage, PackageStage::Fetching);
            assert!(matches!(**source, InstallerError::Integrity { .. }));
        }
        other => panic!("expected PackageFailed, got {other:?}"),
    }
    assert_eq!(*seen.lock().expect("lock"), ["chef-manage=manage_1.0.0-1_amd64.deb"]);
    assert!(!workspace.path.join("reporting_1.0.0-1_amd64.deb").exists());
    assert_eq!(
        report(&handlers, &result),
        format!("{REPORT_PREFIX}chef-manage\n")
    );
}

#[rstest]
fn already_installed_package_is_not_recorded(workspace: Workspace, ubuntu: Platform) {
    std::fs::write(workspace.path.join("chef-manage-2.5.16.deb"), b"deb").expect("write");
    let resolver = MockArtifactResolver::new();
    let downloader = MockArtifactDownloader::new();
    let mut backend = MockPackageBackend::new();
    backend.expect_name().return_const("dpkg");
    backend.expect_install().times(1).returning(|_, _| {
        Ok(InstallOutcome::AlreadyInstalled {
            version: "2.5.16".to_owned(),
        })
    });

    let config = config(Mode::Local, &workspace.path, &["chef-manage"]);
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");
    let result = run.run();

    assert_eq!(
        result.as_ref().expect("run succeeds").already_installed,
        ["chef-manage"]
    );
    assert!(run.recorder().packages().is_empty());
    assert!(report(&handlers, &result).is_empty());
}

#[rstest]
fn backend_failure_halts_and_reports_earlier_installs(workspace: Workspace, ubuntu: Platform) {
    for name in ["chef-manage-1.deb", "opscode-reporting-1.deb", "opscode-analytics-1.deb"] {
        std::fs::write(workspace.path.join(name), b"deb").expect("write");
    }
    let resolver = MockArtifactResolver::new();
    let downloader = MockArtifactDownloader::new();
    let mut backend = MockPackageBackend::new();
    backend.expect_name().return_const("dpkg");
    backend
        .expect_install()
        .times(2)
        .returning(|package, _| match package {
            "opscode-reporting" => Err(InstallerError::InstallBackend {
                package: package.to_owned(),
                backend: "dpkg",
                message: "dependency problems".to_owned(),
            }),
            _ => Ok(InstallOutcome::Installed {
                version: "1".to_owned(),
            }),
        });

    let config = config(
        Mode::Local,
        &workspace.path,
        &["chef-manage", "opscode-reporting", "opscode-analytics"],
    );
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");
    let result = run.run();

    let err = result.as_ref().expect_err("run fails");
    assert!(
        err.to_string()
            .starts_with("add-on opscode-reporting failed while installing"),
        "{err}"
    );
    assert_eq!(
        report(&handlers, &result),
        format!("{REPORT_PREFIX}chef-manage\n")
    );
}

#[rstest]
fn missing_local_package_fails_while_locating(workspace: Workspace, ubuntu: Platform) {
    let resolver = MockArtifactResolver::new();
    let downloader = MockArtifactDownloader::new();
    let mut backend = MockPackageBackend::new();
    backend.expect_name().return_const("dpkg");
    backend.expect_install().never();

    let config = config(Mode::Local, &workspace.path, &["chef-manage"]);
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();
    let run = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("supported platform");

    let err = run.run().expect_err("nothing to install");
    assert!(matches!(
        err,
        InstallerError::PackageFailed {
            stage: PackageStage::Locating,
            ..
        }
    ));
}

#[rstest]
fn each_run_registers_a_single_recorder(workspace: Workspace, ubuntu: Platform) {
    let resolver = MockArtifactResolver::new();
    let downloader = MockArtifactDownloader::new();
    let backend = MockPackageBackend::new();
    let config = config(Mode::Local, &workspace.path, &[]);
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();

    let _first = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("first run");
    let second = AddonRun::new(&config, &ubuntu, deps, &mut handlers).expect("second run");
    second.recorder().add("chef-manage");

    assert_eq!(handlers.report_handlers().len(), 1);
    assert_eq!(handlers.exception_handlers().len(), 1);
    assert_eq!(
        report(&handlers, &Ok(RunSummary::default())),
        format!("{REPORT_PREFIX}chef-manage\n")
    );
}

#[rstest]
fn unsupported_family_is_rejected_up_front(workspace: Workspace) {
    let resolver = MockArtifactResolver::new();
    let downloader = MockArtifactDownloader::new();
    let backend = MockPackageBackend::new();
    let config = config(Mode::Local, &workspace.path, &["chef-manage"]);
    let platform = Platform {
        name: "arch".to_owned(),
        version: "rolling".to_owned(),
        machine: "x86_64".to_owned(),
        family: PlatformFamily::Other("arch".to_owned()),
    };
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: &backend,
    };
    let mut handlers = RunHandlers::default();

    let result = AddonRun::new(&config, &platform, deps, &mut handlers);
    assert!(matches!(
        result,
        Err(InstallerError::UnsupportedPlatform { ref family }) if family == "arch"
    ));
    assert!(handlers.report_handlers().is_empty());
}
