//! Converter strategies: one way of turning a source into the requested
//! artifact with one family of external tools.
//!
//! The orchestrator treats every strategy the same. A strategy either
//! declines ([`Attempt::Skipped`]) because it cannot handle the request or
//! its tools are missing, or it runs ([`Attempt::Ran`]) and leaves whatever
//! it produced at the request's target. Whether that counts is decided by
//! the orchestrator, not the strategy.
//!
//! # Contract
//!
//! Implementations must:
//! - check source format, target kind and platform before probing tools
//! - probe through [`AttemptContext::locator`] only, never by spawning
//! - report missing tools as `Skipped(ToolsMissing)`, never as an error
//! - spawn through [`crate::process::run`] so every tool is time-bounded
//! - never write document content of their own into the target

mod browser;
mod driver;
mod editor;
mod native;
mod office;
mod pandoc;
mod wkhtml;

pub use browser::BrowserPrint;
pub use driver::Latexmk;
pub use editor::WordAutomation;
pub use native::NativeCompiler;
pub use office::LibreOffice;
pub use pandoc::Pandoc;
pub use wkhtml::Wkhtmltopdf;

use crate::config::PressConfig;
use crate::error::AttemptError;
use crate::probe::{Tool, ToolLocator};
use crate::process::Invocation;
use crate::request::{ConversionRequest, SourceFormat, TargetKind};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// What a strategy did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Tools were invoked; the artifact (if any) is at the target.
    Ran,
    /// The strategy did not run.
    Skipped(SkipReason),
}

/// Why a strategy declined a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Required tools are not installed (canonical tool names).
    ToolsMissing(Vec<String>),
    UnsupportedSource(SourceFormat),
    UnsupportedTarget(TargetKind),
    /// The strategy only exists on another operating system.
    UnsupportedPlatform,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ToolsMissing(tools) => write!(f, "missing {}", tools.join(", ")),
            SkipReason::UnsupportedSource(format) => write!(f, "cannot read {format} sources"),
            SkipReason::UnsupportedTarget(kind) => write!(f, "cannot produce {kind}"),
            SkipReason::UnsupportedPlatform => {
                write!(f, "not available on {:?}", toolprobe::Platform::current())
            }
        }
    }
}

/// Everything a strategy may look at during one attempt.
pub struct AttemptContext<'a> {
    pub request: &'a ConversionRequest,
    pub config: &'a PressConfig,
    pub locator: &'a dyn ToolLocator,
}

impl<'a> AttemptContext<'a> {
    pub fn new(
        request: &'a ConversionRequest,
        config: &'a PressConfig,
        locator: &'a dyn ToolLocator,
    ) -> Self {
        Self {
            request,
            config,
            locator,
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.config.tool_timeout_secs)
    }

    /// Locate every tool in `tools`, or name the ones that are missing.
    pub fn require(&self, tools: &[Tool<'_>]) -> Result<Vec<PathBuf>, SkipReason> {
        let mut found = Vec::with_capacity(tools.len());
        let mut missing = Vec::new();
        for tool in tools {
            match self.locator.locate(tool) {
                Some(p) => found.push(p),
                None => missing.push(tool.name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(SkipReason::ToolsMissing(missing))
        }
    }

    /// An invocation of `program` in the working directory with the
    /// general tool timeout.
    pub fn invocation(&self, program: &Path) -> Invocation {
        Invocation::new(program, self.request.workdir(), self.tool_timeout())
    }

    /// Reject anything but LaTeX sources.
    pub fn latex_only(&self) -> Result<(), SkipReason> {
        match self.request.source_format() {
            SourceFormat::Latex => Ok(()),
            other => Err(SkipReason::UnsupportedSource(other)),
        }
    }

    /// Reject anything but PDF targets.
    pub fn pdf_only(&self) -> Result<(), SkipReason> {
        match self.request.kind() {
            TargetKind::Pdf => Ok(()),
            other => Err(SkipReason::UnsupportedTarget(other)),
        }
    }
}

/// Early return of `Ok(Attempt::Skipped(reason))` from a strategy when a
/// precondition does not hold.
macro_rules! skip_unless {
    ($check:expr) => {
        if let Err(reason) = $check {
            return Ok($crate::strategy::Attempt::Skipped(reason));
        }
    };
}
pub(crate) use skip_unless;

/// One way of producing the target artifact.
#[async_trait]
pub trait ConverterStrategy: Send + Sync {
    /// Stable name used in attempt records, e.g. `"pdflatex"`.
    fn name(&self) -> &str;

    /// Try to produce `ctx.request.target()`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` when a tool was started and failed. The
    /// orchestrator records it and moves on.
    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError>;
}

/// The default chain, best fidelity first.
pub fn default_chain() -> Vec<Arc<dyn ConverterStrategy>> {
    vec![
        Arc::new(NativeCompiler::tectonic()),
        Arc::new(Latexmk),
        Arc::new(NativeCompiler::pdflatex()),
        Arc::new(Pandoc),
        Arc::new(LibreOffice),
        Arc::new(WordAutomation),
        Arc::new(BrowserPrint),
        Arc::new(Wkhtmltopdf),
    ]
}
