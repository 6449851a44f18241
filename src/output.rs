//! Conversion outcome types.
//!
//! A [`ConversionOutcome`] is produced exactly once per request and carries
//! one [`AttemptRecord`] per strategy in the chain, in chain order, so the
//! caller can tell which toolchains were missing, which ran and failed, and
//! which were never tried because an earlier one already succeeded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What happened to one strategy during a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Required tool missing, or the strategy cannot handle this request.
    Skipped,
    /// The strategy ran but no valid artifact came out of it.
    Failed,
    /// The strategy produced the authoritative artifact.
    Succeeded,
    /// An earlier strategy already succeeded.
    NotReached,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::Skipped => "skipped",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::NotReached => "not reached",
        };
        f.pad(s)
    }
}

/// One line of the diagnostic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Strategy name, e.g. `"pdflatex"` or `"browser"`.
    pub strategy: String,
    pub status: AttemptStatus,
    /// Human-readable reason (missing tools, error message, artifact size).
    pub detail: String,
    /// Wall-clock time spent in the strategy (0 for skipped / not reached).
    pub duration_ms: u64,
}

/// Result of [`crate::convert::Converter::convert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// `true` iff some strategy's artifact passed the success predicate.
    pub succeeded: bool,
    /// The request's target path when `succeeded`, otherwise `None`.
    pub artifact_path: Option<PathBuf>,
    /// Name of the strategy that produced the artifact.
    pub winner: Option<String>,
    /// One record per strategy, in chain order.
    pub attempts: Vec<AttemptRecord>,
    /// Deduplicated names of probed tools that were not installed.
    ///
    /// On total failure this is the list of things to install.
    pub missing_tools: Vec<String>,
    pub total_duration_ms: u64,
}

impl ConversionOutcome {
    /// Records with the given status.
    pub fn with_status(&self, status: AttemptStatus) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter().filter(move |a| a.status == status)
    }

    /// Multi-line summary suitable for logs and terminal output.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for a in &self.attempts {
            out.push_str(&format!("  {:<12} {:<12} {}\n", a.strategy, a.status, a.detail));
        }
        if !self.succeeded && !self.missing_tools.is_empty() {
            out.push_str(&format!(
                "  install any of: {}\n",
                self.missing_tools.join(", ")
            ));
        }
        out
    }
}

/// Where (and whether) one external tool was found; see
/// [`crate::convert::tool_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAvailability {
    pub tool: String,
    pub path: Option<PathBuf>,
}
