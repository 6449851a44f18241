//! Bounded execution of external tools.
//!
//! Every strategy spawns through [`run`], so every tool gets the same
//! treatment: a structured argument vector (no shell), a working directory,
//! no stdin, captured output, and a hard timeout after which the child is
//! killed.

use crate::error::AttemptError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Bytes of combined stdout/stderr kept for diagnostics.
const OUTPUT_TAIL_BYTES: usize = 2048;

/// One fully-specified tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: PathBuf,
    timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Short tool label for messages: the executable's file name.
    pub fn tool_label(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a successful run looked like.
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub elapsed: Duration,
    /// Tail of stdout followed by tail of stderr.
    pub output: String,
}

/// Run `inv` to completion and require exit status 0.
///
/// # Errors
/// - [`AttemptError::SpawnFailed`] if the process cannot be started
/// - [`AttemptError::Timeout`] if it outlives `inv.timeout` (the child is killed)
/// - [`AttemptError::ToolFailed`] on a non-zero exit or death by signal
pub async fn run(inv: &Invocation) -> Result<ToolRun, AttemptError> {
    let tool = inv.tool_label();
    debug!("Spawning: {}", inv);
    let start = Instant::now();

    let child = Command::new(&inv.program)
        .args(&inv.args)
        .current_dir(&inv.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AttemptError::SpawnFailed {
            tool: tool.clone(),
            detail: e.to_string(),
        })?;

    // Dropping the wait future on timeout drops the child, and
    // kill_on_drop terminates it.
    let output = tokio::time::timeout(inv.timeout, child.wait_with_output())
        .await
        .map_err(|_| AttemptError::Timeout {
            tool: tool.clone(),
            limit_ms: inv.timeout.as_millis() as u64,
        })?
        .map_err(|e| AttemptError::SpawnFailed {
            tool: tool.clone(),
            detail: e.to_string(),
        })?;

    let elapsed = start.elapsed();
    let captured = format!("{}{}", tail(&output.stdout), tail(&output.stderr));
    debug!(
        "{} exited with {:?} after {}ms",
        tool,
        output.status.code(),
        elapsed.as_millis()
    );

    if !output.status.success() {
        return Err(AttemptError::ToolFailed {
            tool,
            code: output.status.code(),
            output: captured,
        });
    }

    Ok(ToolRun {
        elapsed,
        output: captured,
    })
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(OUTPUT_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}
