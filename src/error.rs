//! Error types for the docpress library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PressError`] is **fatal**: the request cannot even be built (source
//!   missing, unreadable, unknown format) or the configuration is invalid.
//!   Returned as `Err(PressError)` before any tool is spawned.
//!
//! * [`AttemptError`] is **non-fatal**: one strategy failed (tool crashed,
//!   timed out, exited 0 without writing anything). The orchestrator records
//!   it in [`crate::output::AttemptRecord`] and moves on to the next strategy.
//!
//! Nothing a strategy does can turn into a `PressError`: a conversion where
//! every toolchain is missing or broken is a normal outcome with
//! `succeeded = false`.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: returned before the fallback chain starts.
#[derive(Debug, Error)]
pub enum PressError {
    // ── Request construction ──────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("Source document not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source path exists but is a directory (or another non-file).
    #[error("Source '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// The source extension does not map to a known input format.
    #[error("Unsupported source '{path}': expected .tex, .md or .html")]
    UnsupportedSource { path: PathBuf },

    /// The working directory does not exist or is not a directory.
    #[error("Working directory '{path}' does not exist")]
    WorkdirMissing { path: PathBuf },

    /// The target path is the source itself.
    #[error("Target '{path}' would overwrite the source")]
    TargetIsSource { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. runtime construction).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single strategy attempt.
///
/// Stored as the `detail` of a failed [`crate::output::AttemptRecord`].
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum AttemptError {
    /// The executable was located but could not be started.
    #[error("{tool}: failed to start: {detail}")]
    SpawnFailed { tool: String, detail: String },

    /// The tool ran and exited unsuccessfully.
    #[error("{tool}: exited with {}{}", describe_code(.code), tail_suffix(.output))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    /// The tool did not finish within its time budget and was killed.
    #[error("{tool}: timed out after {}", describe_limit(.limit_ms))]
    Timeout { tool: String, limit_ms: u64 },

    /// The tool reported success but the artifact does not exist.
    #[error("no artifact at '{path}' after the tool reported success")]
    OutputMissing { path: PathBuf },

    /// The tool reported success but the artifact is zero bytes.
    #[error("artifact '{path}' is empty (0 bytes)")]
    OutputEmpty { path: PathBuf },

    /// Filesystem work around the tool (writing a preview, moving output) failed.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },

    /// The strategy panicked; the panic was contained by the orchestrator.
    #[error("strategy panicked: {0}")]
    Panicked(String),
}

impl AttemptError {
    /// Wrap a `std::io::Error` raised while touching `path`.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        AttemptError::Io {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

fn describe_limit(ms: &u64) -> String {
    let ms = *ms;
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

fn tail_suffix(output: &str) -> String {
    let last = output.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}
