//! Configuration for the conversion fallback chain.
//!
//! All tunables live in [`PressConfig`], built via [`PressConfigBuilder`].
//! The orchestrator and the strategies read from it but never embed document
//! content: a config is about *how* to run tools, never *what* to write.

use crate::error::PressError;
use crate::progress::ObserverHandle;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Configuration for a [`crate::convert::Converter`].
///
/// # Example
/// ```rust
/// use docpress::PressConfig;
///
/// let config = PressConfig::builder()
///     .tool_timeout_secs(120)
///     .latex_passes(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.latex_passes, 3);
/// ```
#[derive(Clone)]
pub struct PressConfig {
    /// Upper bound on any single tool invocation, in seconds. Default: 300.
    ///
    /// A LaTeX run that waits for terminal input would otherwise block the
    /// whole batch forever; on timeout the process is killed and the
    /// strategy counts as failed.
    pub tool_timeout_secs: u64,

    /// Upper bound on one headless-browser print, in seconds. Default: 90.
    pub browser_timeout_secs: u64,

    /// Virtual-time budget handed to the browser, in milliseconds. Default: 15000.
    ///
    /// Math-heavy pages keep scheduling layout work; the budget tells the
    /// browser to stop waiting for "idle" and print what it has.
    pub virtual_time_budget_ms: u64,

    /// Number of `pdflatex` passes. Default: 2 (second pass resolves references).
    pub latex_passes: u32,

    /// PDF engines for Pandoc, in preference order.
    /// Default: `xelatex`, `lualatex`, `pdflatex`.
    pub pdf_engines: Vec<String>,

    /// Pass `--citeproc` to Pandoc for DOCX output. Default: true.
    pub citeproc: bool,

    /// Maximum requests converted at once by `convert_batch`. Default: 4.
    pub concurrency: usize,

    /// Explicit executable paths keyed by tool name (e.g. `"pandoc"`).
    /// Checked before `DOCPRESS_<NAME>` and `PATH`.
    pub tool_overrides: HashMap<String, PathBuf>,

    /// Optional observer notified as strategies start and finish.
    pub observer: Option<ObserverHandle>,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 300,
            browser_timeout_secs: 90,
            virtual_time_budget_ms: 15_000,
            latex_passes: 2,
            pdf_engines: vec!["xelatex".into(), "lualatex".into(), "pdflatex".into()],
            citeproc: true,
            concurrency: 4,
            tool_overrides: HashMap::new(),
            observer: None,
        }
    }
}

impl fmt::Debug for PressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressConfig")
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("virtual_time_budget_ms", &self.virtual_time_budget_ms)
            .field("latex_passes", &self.latex_passes)
            .field("pdf_engines", &self.pdf_engines)
            .field("citeproc", &self.citeproc)
            .field("concurrency", &self.concurrency)
            .field("tool_overrides", &self.tool_overrides)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn ConversionObserver>"))
            .finish()
    }
}

impl PressConfig {
    /// Create a new builder for `PressConfig`.
    pub fn builder() -> PressConfigBuilder {
        PressConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PressConfig`].
#[derive(Debug)]
pub struct PressConfigBuilder {
    config: PressConfig,
}

impl PressConfigBuilder {
    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs.max(1);
        self
    }

    pub fn browser_timeout_secs(mut self, secs: u64) -> Self {
        self.config.browser_timeout_secs = secs.max(1);
        self
    }

    pub fn virtual_time_budget_ms(mut self, ms: u64) -> Self {
        self.config.virtual_time_budget_ms = ms;
        self
    }

    pub fn latex_passes(mut self, n: u32) -> Self {
        self.config.latex_passes = n.clamp(1, 5);
        self
    }

    pub fn pdf_engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pdf_engines = engines.into_iter().map(Into::into).collect();
        self
    }

    pub fn citeproc(mut self, v: bool) -> Self {
        self.config.citeproc = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Pin `tool` (e.g. `"soffice"`) to an explicit executable.
    pub fn tool_override(mut self, tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.config.tool_overrides.insert(tool.into(), path.into());
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PressConfig, PressError> {
        let c = &self.config;
        if c.latex_passes == 0 {
            return Err(PressError::InvalidConfig(
                "latex_passes must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PressError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if let Some(bad) = c.pdf_engines.iter().find(|e| e.trim().is_empty()) {
            return Err(PressError::InvalidConfig(format!(
                "empty PDF engine name in {:?} ({bad:?})",
                c.pdf_engines
            )));
        }
        if let Some((tool, _)) = c.tool_overrides.iter().find(|(k, _)| k.trim().is_empty()) {
            return Err(PressError::InvalidConfig(format!(
                "tool override with empty name {tool:?}"
            )));
        }
        Ok(self.config)
    }
}
