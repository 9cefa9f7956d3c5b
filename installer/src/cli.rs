//! CLI argument definitions for the add-on installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::{ConfigOverrides, Mode};
use crate::locator::Channel;
use camino::Utf8PathBuf;
use clap::Parser;

/// Fetch, verify and install vendor add-on packages.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "addon-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Fetch, verify and install vendor add-on packages.\n\n",
    "Each configured add-on is installed in order. In remote mode the latest ",
    "build for this platform is resolved from the release channel, downloaded ",
    "into the cache directory and checked against its published SHA-256 ",
    "checksum before installation. In local mode package files already on disk ",
    "are installed; when the path is a directory the newest matching file wins.\n\n",
    "Every add-on actually installed is reported on standard output, even when ",
    "the run fails part way.",
))]
#[command(after_help = concat!(
    "CONFIGURATION:\n",
    "  Settings are read from addons.toml in the platform configuration\n",
    "  directory unless --config is given. Flags override file values.\n\n",
    "EXAMPLES:\n",
    "  Install add-ons listed in the configuration file:\n",
    "    $ addon-installer\n\n",
    "  Download and install the latest stable chef-manage:\n",
    "    $ addon-installer --remote -p chef-manage\n\n",
    "  Install from a directory of package files:\n",
    "    $ addon-installer --local --path /srv/addons -p opscode-reporting\n\n",
    "  Preview without installing:\n",
    "    $ addon-installer --dry-run\n",
))]
pub struct Cli {
    /// Configuration file [default: platform-specific addons.toml].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Install a specific add-on (can be repeated; replaces the configured list).
    #[arg(short, long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Resolve and download packages from the release channel.
    #[arg(long, conflicts_with = "local")]
    pub remote: bool,

    /// Install package files already on disk.
    #[arg(long, conflicts_with = "remote")]
    pub local: bool,

    /// Download cache for remote installs.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Package directory or file for local installs.
    #[arg(long, value_name = "PATH")]
    pub path: Option<Utf8PathBuf>,

    /// Release channel to install from.
    #[arg(long, value_enum, value_name = "CHANNEL")]
    pub channel: Option<Channel>,

    /// Only accept builds for the exact platform version.
    #[arg(long)]
    pub no_compatibility_mode: bool,

    /// Show the resolved configuration and exit without installing.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors and the install report still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// The install mode forced by `--remote` or `--local`, if any.
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        match (self.remote, self.local) {
            (true, _) => Some(Mode::Remote),
            (_, true) => Some(Mode::Local),
            _ => None,
        }
    }

    /// Configuration values supplied on the command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::cli::Cli;
    /// use addon_installer::config::Mode;
    /// use clap::Parser;
    ///
    /// let cli = Cli::parse_from(["addon-installer", "--local", "-p", "chef-manage"]);
    /// let overrides = cli.overrides();
    /// assert_eq!(overrides.mode, Some(Mode::Local));
    /// assert_eq!(overrides.packages, ["chef-manage"]);
    /// ```
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            packages: self.packages.clone(),
            mode: self.mode(),
            cache_dir: self.cache_dir.clone(),
            path: self.path.clone(),
            channel: self.channel,
            no_compatibility_mode: self.no_compatibility_mode,
        }
    }

    /// Default log filter for the chosen verbosity.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbosity) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
