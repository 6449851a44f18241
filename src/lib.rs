//! # docpress
//!
//! Turn LaTeX, Markdown or HTML manuscripts into PDF or DOCX with whatever
//! toolchains happen to be installed.
//!
//! ## Why this crate?
//!
//! Every document toolchain is missing somewhere. CI images have Pandoc but
//! no TeX, a colleague's laptop has LibreOffice and a browser, Windows boxes
//! have Word. Instead of hard-coding one tool, this crate walks an ordered
//! chain of strategies, highest fidelity first, and keeps the first artifact
//! that actually exists and is non-empty. When nothing works you get a
//! per-strategy diagnostic and the list of tools to install, not a panic.
//!
//! ## Fallback Chain
//!
//! ```text
//! source (.tex / .md / .html)
//!  │
//!  ├─ 1. tectonic     self-contained LaTeX engine
//!  ├─ 2. latexmk      LaTeX build driver
//!  ├─ 3. pdflatex     N passes for cross-references
//!  ├─ 4. pandoc       PDF via xelatex/lualatex/pdflatex, or DOCX (+ citeproc)
//!  ├─ 5. libreoffice  intermediate DOCX → headless PDF export
//!  ├─ 6. word         PowerShell + Word COM (Windows)
//!  ├─ 7. browser      headless Chrome/Chromium/Edge print-to-pdf
//!  └─ 8. wkhtmltopdf  HTML preview → PDF
//! ```
//!
//! Tools are found by looking at the filesystem (`PATH`, well-known install
//! locations, `DOCPRESS_<TOOL>` overrides), never by running them. Every
//! invocation is time-bounded and killed on timeout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docpress::{convert, ConversionRequest, PressConfig, TargetKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PressConfig::default();
//!     let request = ConversionRequest::beside_source("paper.tex", TargetKind::Pdf)?;
//!     let outcome = convert(&request, &config).await;
//!     match outcome.winner {
//!         Some(ref w) => println!("{} via {}", request.target().display(), w),
//!         None => eprintln!("failed:\n{}", outcome.summary()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docpress = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod convert;
pub mod error;
pub mod html;
pub mod output;
pub mod probe;
pub mod process;
pub mod progress;
pub mod request;
pub mod strategy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PressConfig, PressConfigBuilder};
pub use convert::{convert, convert_batch, convert_sync, tool_report, Converter};
pub use error::{AttemptError, PressError};
pub use output::{AttemptRecord, AttemptStatus, ConversionOutcome, ToolAvailability};
pub use probe::{StaticLocator, SystemLocator, Tool, ToolLocator};
pub use progress::{ConversionObserver, NoopObserver, ObserverHandle};
pub use request::{ConversionRequest, SourceFormat, TargetKind};
pub use strategy::{Attempt, AttemptContext, ConverterStrategy, SkipReason};
