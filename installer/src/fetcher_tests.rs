//! Unit tests for artifact download and verification.

use super::*;
use crate::test_utils::sha256_hex;
use rstest::{fixture, rstest};

const FAKE_PACKAGE: &[u8] = b"fake deb payload";
const PACKAGE_URL: &str = "https://packages.example/stable/ubuntu/18.04/chef-manage_2.5.16-1_amd64.deb";

struct CacheDir {
    _temp: tempfile::TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn cache() -> CacheDir {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().join("cache")).expect("UTF-8 path");
    CacheDir { _temp: temp, path }
}

fn info_with_digest(hex: &str) -> ArtifactInfo {
    ArtifactInfo {
        url: PACKAGE_URL.to_owned(),
        sha256: Sha256Digest::try_from(hex).expect("valid digest"),
        platform: "ubuntu 18.04 x86_64".to_owned(),
        version: "2.5.16".to_owned(),
    }
}

fn writing(bytes: &'static [u8]) -> MockArtifactDownloader {
    let mut downloader = MockArtifactDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .returning(move |_, dest| std::fs::write(dest, bytes).map_err(DownloadError::Io));
    downloader
}

fn cache_entries(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read cache dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

#[rstest]
fn downloads_into_cache_under_url_basename(cache: CacheDir) {
    let info = info_with_digest(&sha256_hex(FAKE_PACKAGE));
    let downloader = writing(FAKE_PACKAGE);

    let fetched = fetch_artifact(&info, &cache.path, &downloader).expect("fetch succeeds");

    assert_eq!(
        fetched.path,
        cache.path.join("chef-manage_2.5.16-1_amd64.deb")
    );
    assert!(!fetched.reused);
    assert_eq!(
        std::fs::read(fetched.path.as_std_path()).expect("read cached file"),
        FAKE_PACKAGE
    );
    assert_eq!(
        cache_entries(&cache.path),
        vec!["chef-manage_2.5.16-1_amd64.deb".to_owned()]
    );
}

#[rstest]
fn checksum_mismatch_leaves_no_file_behind(cache: CacheDir) {
    let info = info_with_digest(&"a".repeat(64));
    let downloader = writing(b"tampered content");

    let err = fetch_artifact(&info, &cache.path, &downloader).expect_err("mismatch");

    assert!(matches!(err, InstallerError::Integrity { .. }), "{err:?}");
    assert!(cache_entries(&cache.path).is_empty());
}

#[rstest]
fn transport_failure_is_reported_with_url(cache: CacheDir) {
    let info = info_with_digest(&sha256_hex(FAKE_PACKAGE));
    let mut downloader = MockArtifactDownloader::new();
    downloader.expect_download().times(1).returning(|url, _| {
        Err(DownloadError::NotFound {
            url: url.to_owned(),
        })
    });

    let err = fetch_artifact(&info, &cache.path, &downloader).expect_err("download fails");

    match err {
        InstallerError::DownloadFailed { url, source } => {
            assert_eq!(url, PACKAGE_URL);
            assert!(matches!(source, DownloadError::NotFound { .. }));
        }
        other => panic!("expected DownloadFailed, got {other:?}"),
    }
    assert!(cache_entries(&cache.path).is_empty());
}

#[rstest]
fn reuses_cached_file_with_matching_digest(cache: CacheDir) {
    std::fs::create_dir_all(&cache.path).expect("create cache");
    let cached = cache.path.join("chef-manage_2.5.16-1_amd64.deb");
    std::fs::write(&cached, FAKE_PACKAGE).expect("seed cache");
    let info = info_with_digest(&sha256_hex(FAKE_PACKAGE));
    let mut downloader = MockArtifactDownloader::new();
    downloader.expect_download().never();

    let fetched = fetch_artifact(&info, &cache.path, &downloader).expect("fetch succeeds");

    assert!(fetched.reused);
    assert_eq!(fetched.path, cached);
}

#[rstest]
fn replaces_stale_cached_file(cache: CacheDir) {
    std::fs::create_dir_all(&cache.path).expect("create cache");
    let cached = cache.path.join("chef-manage_2.5.16-1_amd64.deb");
    std::fs::write(&cached, b"older build").expect("seed cache");
    let info = info_with_digest(&sha256_hex(FAKE_PACKAGE));
    let downloader = writing(FAKE_PACKAGE);

    let fetched = fetch_artifact(&info, &cache.path, &downloader).expect("fetch succeeds");

    assert!(!fetched.reused);
    assert_eq!(std::fs::read(&cached).expect("read cached file"), FAKE_PACKAGE);
}

#[rstest]
#[case::plain("https://host.example/a/b/pkg.rpm", Some("pkg.rpm"))]
#[case::query("https://host.example/pkg.rpm?x=1", Some("pkg.rpm"))]
#[case::fragment("https://host.example/pkg.rpm#top", Some("pkg.rpm"))]
#[case::trailing_slash("https://host.example/dir/", None)]
#[case::host_only("https://host.example", None)]
fn derives_cache_file_name(#[case] url: &str, #[case] expected: Option<&str>) {
    assert_eq!(cache_file_name(url), expected);
}

#[test]
fn maps_404_to_not_found() {
    let err = map_ureq_error("https://host.example/pkg.rpm", &ureq::Error::StatusCode(404));
    assert!(matches!(err, DownloadError::NotFound { .. }));
}

#[test]
fn maps_other_status_to_http_error() {
    let err = map_ureq_error("https://host.example/pkg.rpm", &ureq::Error::StatusCode(503));
    assert!(matches!(err, DownloadError::HttpError { .. }));
}

#[rstest]
#[case::not_found(404, true)]
#[case::gone(410, false)]
#[case::server_error(503, false)]
fn classifies_http_failures(#[case] status: u16, #[case] not_found: bool) {
    let err = ureq::Error::StatusCode(status);
    let failure = HttpFailure::from_ureq(&err);
    if not_found {
        assert_eq!(failure, HttpFailure::NotFound);
    } else {
        assert_eq!(failure, HttpFailure::Other(err.to_string()));
    }
}
