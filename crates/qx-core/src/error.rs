//! Error kinds surfaced by qx commands.
//!
//! Two kinds exist: [`ValidationError`] for expected, user-actionable problems
//! (bad config, missing files, a dirty working tree) and everything else, which
//! travels as a plain [`anyhow::Error`] with its original context intact.

use thiserror::Error;

/// An expected failure the user can fix.
///
/// Built through [`ValidationError::new`], which logs the message at error
/// severity right away, so the top-level handler never prints it twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Component that raised the error, used as the log prefix.
    pub prefix: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(prefix: impl Into<String>, message: impl Into<String>) -> Self {
        let err = Self {
            prefix: prefix.into(),
            message: message.into(),
        };
        crate::logging::resume();
        tracing::error!(prefix = %err.prefix, "{}", err.message);
        err
    }
}

/// An external process exited unsuccessfully.
#[derive(Debug, Clone, Error)]
#[error("`{command}` exited with status {code}{}", stderr_suffix(.stderr))]
pub struct CommandFailed {
    pub command: String,
    pub code: i32,
    pub stderr: String,
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// How the CLI should report a failed command chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Already logged; print nothing else.
    Validation,
    /// Log the raw message.
    Unexpected,
}

pub fn classify(err: &anyhow::Error) -> ErrorKind {
    if err.downcast_ref::<ValidationError>().is_some() {
        ErrorKind::Validation
    } else {
        ErrorKind::Unexpected
    }
}

/// Process exit code for a failed chain: an explicit positive code when the
/// error carries one, otherwise 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CommandFailed>())
        .map(|failed| failed.code)
        .filter(|code| *code > 0)
        .unwrap_or(1)
}
