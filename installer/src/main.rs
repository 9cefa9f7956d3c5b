//! Add-on installer CLI entrypoint.
//!
//! This binary installs vendor add-on packages on the local host, fetching
//! them from the release channel first when remote installs are enabled.
//! Installed add-ons are reported on stdout when the run ends.

use addon_installer::backend::BackendKind;
use addon_installer::cli::Cli;
use addon_installer::config::{AddonConfig, ConfigFile};
use addon_installer::dirs::SystemBaseDirs;
use addon_installer::error::Result;
use addon_installer::executor::SystemCommandExecutor;
use addon_installer::fetcher::HttpDownloader;
use addon_installer::install_flow::{AddonRun, InstallDeps, finish};
use addon_installer::locator::OmnitruckResolver;
use addon_installer::output::{DryRunInfo, summary_message, write_stderr_line};
use addon_installer::platform::Platform;
use addon_installer::recorder::RunHandlers;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the CLI level.
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        // A subscriber is already installed; keep it.
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let dirs = SystemBaseDirs;

    // Step 1: Load configuration and apply CLI overrides
    let file = ConfigFile::discover(cli.config.as_deref(), &dirs)?;
    let config = AddonConfig::resolve(file, &cli.overrides(), &dirs)?;

    // Step 2: Determine the platform and its package backend
    let platform = resolve_platform(&config)?;
    let backend_kind = BackendKind::for_family(&platform.family)?;

    if cli.dry_run {
        let info = DryRunInfo {
            config: &config,
            platform: &platform,
            backend: backend_kind.tool(),
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    // Step 3: Install every add-on, then report
    let executor = SystemCommandExecutor;
    let backend = backend_kind.backend(&executor);
    let resolver = OmnitruckResolver::new(&config.resolver_url);
    let downloader = HttpDownloader;
    let deps = InstallDeps {
        resolver: &resolver,
        downloader: &downloader,
        backend: backend.as_ref(),
    };

    let mut handlers = RunHandlers::default();
    let addon_run = AddonRun::new(&config, &platform, deps, &mut handlers)?;
    if !cli.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Installing {} add-on(s) on {platform} in {} mode...",
                config.packages.len(),
                config.mode
            ),
        );
    }

    let result = addon_run.run();
    let reported = finish(&handlers, &result, stdout);
    let summary = result?;
    reported?;

    if !cli.quiet {
        write_stderr_line(stderr, summary_message(&summary));
    }
    Ok(())
}

/// Uses the configured platform, or detects the host's.
fn resolve_platform(config: &AddonConfig) -> Result<Platform> {
    match &config.platform {
        Some(platform) => Ok(platform.clone()),
        None => Platform::detect(),
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
