//! Add-on installer library.
//!
//! This crate installs vendor add-on packages on a host. In remote mode each
//! add-on is resolved against a release channel, downloaded into a local
//! cache and verified by SHA-256 before the platform package manager
//! installs it; in local mode package files already on disk are installed.
//! Every add-on actually installed is recorded and reported when the run
//! ends, whether it succeeds or fails. It is used by the `addon-installer`
//! CLI binary and can be driven programmatically with custom resolvers,
//! downloaders and backends.
//!
//! # Modules
//!
//! - [`backend`] - dpkg and rpm package backends
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration and CLI overrides
//! - [`digest`] - Validated SHA-256 digests and file hashing
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types
//! - [`executor`] - External command execution
//! - [`fetcher`] - Verified artifact downloads into the cache
//! - [`install_flow`] - Per-package fetch, locate and install orchestration
//! - [`locate`] - Package file discovery on disk
//! - [`locator`] - Release-channel artifact resolution
//! - [`output`] - Progress, summary and dry-run formatting
//! - [`package`] - Package specs, product identifiers and stages
//! - [`platform`] - Host platform detection and family mapping
//! - [`recorder`] - Install recording and end-of-run reporting

pub mod backend;
pub mod cli;
pub mod config;
pub mod digest;
pub mod dirs;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod install_flow;
pub mod locate;
pub mod locator;
pub mod output;
pub mod package;
pub mod platform;
pub mod recorder;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
