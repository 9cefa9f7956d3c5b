//! Output formatting for the installer CLI.
//!
//! Progress, summaries and dry-run information go to stderr. Standard output
//! is reserved for the install report written by the run handlers.

use crate::config::{AddonConfig, Mode};
use crate::install_flow::RunSummary;
use crate::platform::Platform;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Format the end-of-run summary.
///
/// # Examples
///
/// ```
/// use addon_installer::install_flow::RunSummary;
/// use addon_installer::output::summary_message;
///
/// let summary = RunSummary {
///     installed: vec!["chef-manage".to_owned()],
///     already_installed: vec!["opscode-reporting".to_owned()],
/// };
/// assert_eq!(
///     summary_message(&summary),
///     "Installed 1 add-on; 1 already up to date"
/// );
/// ```
#[must_use]
pub fn summary_message(summary: &RunSummary) -> String {
    let count = summary.installed.len();
    let plural = if count == 1 { "add-on" } else { "add-ons" };
    let mut message = format!("Installed {count} {plural}");
    if !summary.already_installed.is_empty() {
        message.push_str(&format!(
            "; {} already up to date",
            summary.already_installed.len()
        ));
    }
    message
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved run configuration.
    pub config: &'a AddonConfig,
    /// The target platform.
    pub platform: &'a Platform,
    /// Backend tool that would run the installs.
    pub backend: &'a str,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let source_label = match config.mode {
            Mode::Remote => "Cache directory",
            Mode::Local => "Package path",
        };
        let mut lines = vec![
            "Dry run - nothing will be downloaded or installed".to_owned(),
            String::new(),
            format!("Platform: {}", self.platform),
            format!("Backend: {}", self.backend),
            format!("Mode: {}", config.mode),
            format!("{source_label}: {}", config.source),
        ];

        if config.mode == Mode::Remote {
            lines.push(format!("Channel: {}", config.locator.channel));
            lines.push(format!("Resolver: {}", config.resolver_url));
            lines.push(format!(
                "Compatibility mode: {}",
                config.locator.compatibility_mode
            ));
        }

        lines.push(String::new());
        if config.packages.is_empty() {
            lines.push("No add-ons configured.".to_owned());
        } else {
            lines.push("Add-ons to install:".to_owned());
            lines.extend(config.package_specs().iter().map(|spec| {
                format!("  - {} (product {})", spec.name(), spec.product())
            }));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorSettings;
    use crate::platform::PlatformFamily;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};

    #[fixture]
    fn platform() -> Platform {
        Platform {
            name: "ubuntu".to_owned(),
            version: "18.04".to_owned(),
            machine: "x86_64".to_owned(),
            family: PlatformFamily::Debian,
        }
    }

    fn config(mode: Mode, packages: &[&str]) -> AddonConfig {
        AddonConfig {
            packages: packages.iter().map(|name| (*name).to_owned()).collect(),
            mode,
            source: Utf8PathBuf::from("/var/cache/addons"),
            locator: LocatorSettings::default(),
            resolver_url: "https://omnitruck.example".to_owned(),
            platform: None,
        }
    }

    #[rstest]
    fn remote_dry_run_lists_channel_and_packages(platform: Platform) {
        let config = config(Mode::Remote, &["chef-manage"]);
        let text = DryRunInfo {
            config: &config,
            platform: &platform,
            backend: "dpkg",
        }
        .display_text();

        assert!(text.starts_with("Dry run"));
        assert!(text.contains("Cache directory: /var/cache/addons"));
        assert!(text.contains("Channel: stable"));
        assert!(text.contains("  - chef-manage (product manage)"));
    }

    #[rstest]
    fn local_dry_run_omits_channel(platform: Platform) {
        let config = config(Mode::Local, &[]);
        let text = DryRunInfo {
            config: &config,
            platform: &platform,
            backend: "dpkg",
        }
        .display_text();

        assert!(text.contains("Package path: /var/cache/addons"));
        assert!(!text.contains("Channel:"));
        assert!(text.contains("No add-ons configured."));
    }

    #[rstest]
    #[case::none(0, 0, "Installed 0 add-ons")]
    #[case::singular(1, 0, "Installed 1 add-on")]
    #[case::plural(3, 2, "Installed 3 add-ons; 2 already up to date")]
    fn summary_message_pluralises_correctly(
        #[case] installed: usize,
        #[case] skipped: usize,
        #[case] expected: &str,
    ) {
        let summary = RunSummary {
            installed: vec!["a".to_owned(); installed],
            already_installed: vec!["b".to_owned(); skipped],
        };
        assert_eq!(summary_message(&summary), expected);
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut out = Vec::new();
        write_stderr_line(&mut out, "Installing chef-manage");
        assert_eq!(out, b"Installing chef-manage\n");
    }
}
