//! # Exit Reporting
//!
//! The exit handler is the last step of every invocation. It maps the outcome to one of three
//! exit classes and writes whatever diagnostics the host should see on stderr:
//!
//! | Call | Status | Default code | Diagnostics |
//! |------|--------|--------------|-------------|
//! | `exit_with_success` | [`ExitStatus::Success`] | 0 | none |
//! | `exit_with_error` | [`ExitStatus::Failure`] | 1 | terse line, full detail with `--debug` |
//! | `exit_with_no_data` | [`ExitStatus::NoData`] | 2 | one line |
//!
//! Handlers return the [`Exit`] instead of terminating the process themselves. The caller
//! releases its resources first and then turns the `Exit` into the process exit code, so a
//! container owned by the initializer is always closed before the process goes away.
//!
//! A custom handler is installed by registering an `Arc<dyn ExitHandler>` bean.

use crate::config::ExitCodes;
use crate::error::FnError;
use colored::Colorize;
use std::error::Error as _;
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    NoData,
}

/// The exit class chosen for an invocation and the process code that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    pub status: ExitStatus,
    pub code: u8,
}

impl Exit {
    pub fn new(status: ExitStatus, codes: &ExitCodes) -> Self {
        let code = match status {
            ExitStatus::Success => codes.success,
            ExitStatus::Failure => codes.error,
            ExitStatus::NoData => codes.no_data,
        };
        Self { status, code }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Success
    }
}

impl From<Exit> for std::process::ExitCode {
    fn from(exit: Exit) -> Self {
        std::process::ExitCode::from(exit.code)
    }
}

pub trait ExitHandler: Send + Sync {
    fn exit_with_success(&self) -> Exit;

    fn exit_with_error(&self, error: &FnError, debug: bool) -> Exit;

    fn exit_with_no_data(&self) -> Exit;
}

/// Writes diagnostics to stderr (or any writer) and maps outcomes to the configured codes.
pub struct DefaultExitHandler {
    codes: ExitCodes,
    diagnostics: Mutex<Box<dyn Write + Send>>,
}

impl DefaultExitHandler {
    pub fn new(codes: ExitCodes) -> Self {
        Self::with_writer(codes, std::io::stderr())
    }

    pub fn with_writer<W: Write + Send + 'static>(codes: ExitCodes, writer: W) -> Self {
        Self {
            codes,
            diagnostics: Mutex::new(Box::new(writer)),
        }
    }

    pub fn codes(&self) -> &ExitCodes {
        &self.codes
    }

    fn emit(&self, text: &str) {
        let mut writer = match self.diagnostics.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!(target: "fnrun::exit", error = %e, "Failed to write diagnostics");
        }
    }
}

impl Default for DefaultExitHandler {
    fn default() -> Self {
        Self::new(ExitCodes::default())
    }
}

impl ExitHandler for DefaultExitHandler {
    fn exit_with_success(&self) -> Exit {
        Exit::new(ExitStatus::Success, &self.codes)
    }

    fn exit_with_error(&self, error: &FnError, debug: bool) -> Exit {
        self.emit(&render_diagnostic(error, debug));
        Exit::new(ExitStatus::Failure, &self.codes)
    }

    fn exit_with_no_data(&self) -> Exit {
        self.emit(&format!(
            "{} no data supplied, pass the input with --data <DATA>\n",
            "Error:".red().bold()
        ));
        Exit::new(ExitStatus::NoData, &self.codes)
    }
}

/// Text written for a failed invocation.
///
/// Without `debug` this is a single line. With `debug` it adds the error kind, every cause in
/// the source chain and the debug representation of the error.
pub fn render_diagnostic(error: &FnError, debug: bool) -> String {
    if !debug {
        return format!("{} {}\n", "Error:".red().bold(), error);
    }

    let mut out = format!("{} [{}] {}\n", "Error:".red().bold(), error.kind(), error);
    if let FnError::Unconvertible {
        reason: Some(reason),
        ..
    } = error
    {
        out.push_str(&format!("  reason: {}\n", reason));
    }
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(&format!("  caused by: {}\n", cause));
        source = cause.source();
    }
    out.push_str(&format!("  detail: {:?}\n", error));
    out
}
