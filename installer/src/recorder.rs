//! Install event recording and end-of-run reporting.
//!
//! [`InstallRecorder`] accumulates the add-ons installed during a run.
//! [`RunHandlers`] keeps the reporters invoked when a run succeeds and when
//! it fails; the recorder sits in both lists so installed packages are
//! reported whatever the outcome.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Prefix of every report line.
pub const REPORT_PREFIX: &str = "-- Installed Add-On Package: ";

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every package was processed.
    Succeeded,
    /// The run halted on an error.
    Failed,
}

/// A reporter invoked at the end of a run.
pub trait RunHandler: fmt::Debug + Send + Sync {
    /// Identifies the handler type; registering a handler replaces any
    /// previously registered handler of the same kind.
    fn kind(&self) -> &'static str;

    /// Write this handler's report for a finished run.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    fn report(&self, outcome: RunOutcome, out: &mut dyn Write) -> io::Result<()>;
}

/// Records add-on packages installed during one run.
///
/// # Examples
///
/// ```
/// use addon_installer::recorder::InstallRecorder;
///
/// let recorder = InstallRecorder::default();
/// recorder.add("chef-manage");
///
/// let mut out = Vec::new();
/// recorder.write_report(&mut out).expect("write report");
/// assert_eq!(
///     String::from_utf8(out).expect("utf-8"),
///     "-- Installed Add-On Package: chef-manage\n"
/// );
/// ```
#[derive(Debug, Default)]
pub struct InstallRecorder {
    packages: Mutex<Vec<String>>,
}

impl InstallRecorder {
    /// Kind tag shared by every recorder instance.
    pub const KIND: &'static str = "addon-install-recorder";

    /// Append `name` to the install record.
    pub fn add(&self, name: &str) {
        self.packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_owned());
    }

    /// The recorded package names in insertion order.
    #[must_use]
    pub fn packages(&self) -> Vec<String> {
        self.packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write one report line per recorded package.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_report(&self, out: &mut dyn Write) -> io::Result<()> {
        for name in self.packages() {
            writeln!(out, "{REPORT_PREFIX}{name}")?;
        }
        Ok(())
    }
}

impl RunHandler for InstallRecorder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn report(&self, _outcome: RunOutcome, out: &mut dyn Write) -> io::Result<()> {
        self.write_report(out)
    }
}

/// Success-path and failure-path reporter lists for a run.
#[derive(Debug, Default)]
pub struct RunHandlers {
    report_handlers: Vec<Arc<dyn RunHandler>>,
    exception_handlers: Vec<Arc<dyn RunHandler>>,
}

impl RunHandlers {
    /// Register `handler` for both successful and failed runs.
    ///
    /// Handlers of the same [`RunHandler::kind`] are removed from both lists
    /// first, so at most one instance of each kind is active.
    pub fn register(&mut self, handler: Arc<dyn RunHandler>) {
        let kind = handler.kind();
        self.report_handlers.retain(|h| h.kind() != kind);
        self.exception_handlers.retain(|h| h.kind() != kind);
        self.report_handlers.push(Arc::clone(&handler));
        self.exception_handlers.push(handler);
    }

    /// Handlers invoked when a run succeeds.
    #[must_use]
    pub fn report_handlers(&self) -> &[Arc<dyn RunHandler>] {
        &self.report_handlers
    }

    /// Handlers invoked when a run fails.
    #[must_use]
    pub fn exception_handlers(&self) -> &[Arc<dyn RunHandler>] {
        &self.exception_handlers
    }

    /// Invoke the handlers matching `outcome`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first write error; later handlers are skipped.
    pub fn finish(&self, outcome: RunOutcome, out: &mut dyn Write) -> io::Result<()> {
        let handlers = match outcome {
            RunOutcome::Succeeded => &self.report_handlers,
            RunOutcome::Failed => &self.exception_handlers,
        };
        for handler in handlers {
            handler.report(outcome, out)?;
        }
        out.flush()
    }
}
