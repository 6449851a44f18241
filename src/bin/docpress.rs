//! CLI binary for docpress.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PressConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docpress::{
    tool_report, AttemptRecord, AttemptStatus, ConversionObserver, ConversionOutcome,
    ConversionRequest, Converter, ObserverHandle, PressConfig, TargetKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner naming the strategy being waited on, plus
/// one log line per finished attempt.
struct CliObserver {
    bar: ProgressBar,
    /// Requests still in flight; the spinner is cleared when it reaches 0.
    pending: AtomicUsize,
}

impl CliObserver {
    fn new(requests: usize) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Probing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            pending: AtomicUsize::new(requests),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ConversionObserver for CliObserver {
    fn on_request_start(&self, source: &Path, strategies: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{}: {strategies} strategies", file_name(source)))
        ));
    }

    fn on_attempt_start(&self, source: &Path, strategy: &str) {
        self.bar.set_prefix("Converting");
        self.bar
            .set_message(format!("{} via {strategy}…", file_name(source)));
    }

    fn on_attempt_finished(&self, _source: &Path, record: &AttemptRecord) {
        let mark = match record.status {
            AttemptStatus::Succeeded => green("✓"),
            AttemptStatus::Failed => red("✗"),
            AttemptStatus::Skipped => dim("–"),
            AttemptStatus::NotReached => return,
        };
        // Keep one line per attempt even for chatty tool output.
        let detail = record.detail.lines().next().unwrap_or_default();
        let detail = if detail.chars().count() > 80 {
            format!("{}\u{2026}", detail.chars().take(79).collect::<String>())
        } else {
            detail.to_string()
        };
        self.bar.println(format!(
            "  {} {:<12} {}  {}",
            mark,
            record.strategy,
            if record.status == AttemptStatus::Failed {
                red(&detail)
            } else {
                dim(&detail)
            },
            dim(&format!("{:.1}s", record.duration_ms as f64 / 1000.0)),
        ));
    }

    fn on_request_complete(&self, _source: &Path, _outcome: &ConversionOutcome) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) <= 1 {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PDF next to the source
  docpress paper.tex

  # Word document for a journal submission
  docpress paper.tex --to docx -o submission/paper.docx

  # Both formats, intermediates in a scratch directory
  docpress paper.tex --to both --workdir build/

  # Several manuscripts at once
  docpress papers/*.tex --to pdf

  # Use a specific LibreOffice install
  docpress notes.md --tool soffice=/opt/libreoffice/program/soffice

  # What is installed?
  docpress --list-tools

FALLBACK CHAIN (first non-empty artifact wins):
  1. tectonic      LaTeX → PDF
  2. latexmk       LaTeX → PDF
  3. pdflatex      LaTeX → PDF (two passes)
  4. pandoc        any → PDF (xelatex/lualatex/pdflatex) or DOCX
  5. libreoffice   any → DOCX → PDF
  6. word          DOCX → PDF (Windows)
  7. browser       HTML preview → PDF (Chrome, Chromium, Edge, Brave)
  8. wkhtmltopdf   HTML preview → PDF

ENVIRONMENT VARIABLES:
  DOCPRESS_<TOOL>         Path to a tool, e.g. DOCPRESS_PANDOC=/opt/pandoc/bin/pandoc
  RUST_LOG                Override log filter (e.g. docpress=debug)
"#;

/// Convert LaTeX, Markdown or HTML to PDF or DOCX using whatever is installed.
#[derive(Parser, Debug)]
#[command(
    name = "docpress",
    version,
    about = "Convert LaTeX/Markdown/HTML to PDF or DOCX using whatever toolchain is installed",
    long_about = "Convert manuscripts (.tex, .md, .html) to PDF or DOCX by trying, in order, \
tectonic, latexmk, pdflatex, Pandoc, LibreOffice, Microsoft Word, a headless browser and \
wkhtmltopdf. The first strategy that produces a non-empty file wins; if none does, the \
missing tools are listed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source documents (.tex, .md, .html).
    #[arg(required_unless_present = "list_tools")]
    sources: Vec<PathBuf>,

    /// Output format.
    #[arg(long, env = "DOCPRESS_TO", value_enum, default_value = "pdf")]
    to: ToArg,

    /// Output path (single source only). With `--to both` the extension is
    /// replaced per format.
    #[arg(short, long, env = "DOCPRESS_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for tool output and intermediates. Default: the source's folder.
    #[arg(long, env = "DOCPRESS_WORKDIR")]
    workdir: Option<PathBuf>,

    /// Per-tool timeout in seconds.
    #[arg(long, env = "DOCPRESS_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Timeout for one headless-browser print, in seconds.
    #[arg(long, env = "DOCPRESS_BROWSER_TIMEOUT", default_value_t = 90)]
    browser_timeout: u64,

    /// Number of pdflatex passes (1–5).
    #[arg(long, env = "DOCPRESS_LATEX_PASSES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=5))]
    latex_passes: u32,

    /// Do not pass --citeproc to Pandoc for DOCX output.
    #[arg(long, env = "DOCPRESS_NO_CITEPROC")]
    no_citeproc: bool,

    /// Pin a tool to an executable, e.g. `--tool pandoc=/opt/pandoc/bin/pandoc`.
    #[arg(long = "tool", value_name = "NAME=PATH", value_parser = parse_tool_override)]
    tools: Vec<(String, PathBuf)>,

    /// Number of documents converted at once.
    #[arg(short, long, env = "DOCPRESS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output structured JSON (ConversionOutcome per request).
    #[arg(long, env = "DOCPRESS_JSON")]
    json: bool,

    /// Show which tools are installed and exit.
    #[arg(long)]
    list_tools: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCPRESS_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCPRESS_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ToArg {
    Pdf,
    Docx,
    Both,
}

impl ToArg {
    fn kinds(self) -> &'static [TargetKind] {
        match self {
            ToArg::Pdf => &[TargetKind::Pdf],
            ToArg::Docx => &[TargetKind::Docx],
            ToArg::Both => &[TargetKind::Pdf, TargetKind::Docx],
        }
    }
}

fn parse_tool_override(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected NAME=PATH, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // per-attempt lines carry everything that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_tools;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build requests ───────────────────────────────────────────────────
    let requests = if cli.list_tools {
        Vec::new()
    } else {
        build_requests(&cli)?
    };

    let observer: Option<ObserverHandle> = if show_progress {
        Some(CliObserver::new(requests.len()) as ObserverHandle)
    } else {
        None
    };
    let config = build_config(&cli, observer)?;

    // ── Tool report mode ─────────────────────────────────────────────────
    if cli.list_tools {
        let report = tool_report(&config);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise tool report")?
            );
        } else {
            for entry in &report {
                match entry.path {
                    Some(ref p) => println!("{} {:<12} {}", green("✓"), entry.tool, p.display()),
                    None => println!("{} {:<12} {}", red("✗"), entry.tool, dim("not found")),
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Run conversions ──────────────────────────────────────────────────
    let converter = Converter::new(config);
    let outcomes = converter.convert_batch(&requests).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcomes).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        for (req, outcome) in requests.iter().zip(&outcomes) {
            print_outcome(req, outcome, show_progress);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded).count();
    if failed > 0 {
        let mut missing: Vec<&str> = Vec::new();
        for tool in outcomes.iter().flat_map(|o| o.missing_tools.iter()) {
            if !missing.contains(&tool.as_str()) {
                missing.push(tool);
            }
        }
        if !cli.json && !missing.is_empty() {
            eprintln!(
                "{} install any of: {}",
                cyan("hint:"),
                bold(&missing.join(", "))
            );
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_outcome(req: &ConversionRequest, outcome: &ConversionOutcome, show_progress: bool) {
    match outcome.winner {
        Some(ref winner) => eprintln!(
            "{}  {} ({})  {}ms  →  {}",
            green("✔"),
            req.kind(),
            winner,
            outcome.total_duration_ms,
            bold(&req.target().display().to_string()),
        ),
        None => {
            eprintln!(
                "{}  {} → {}: every strategy failed",
                red("✘"),
                req.source().display(),
                req.kind()
            );
            // The spinner already printed each attempt.
            if !show_progress {
                eprint!("{}", outcome.summary());
            }
        }
    }
}

/// One request per (source, kind) pair.
fn build_requests(cli: &Cli) -> Result<Vec<ConversionRequest>> {
    if cli.output.is_some() && cli.sources.len() > 1 {
        anyhow::bail!("--output can only be used with a single source");
    }

    let mut requests = Vec::new();
    for source in &cli.sources {
        let workdir = match cli.workdir {
            Some(ref w) => w.clone(),
            None => match source.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        if cli.workdir.is_some() {
            std::fs::create_dir_all(&workdir)
                .with_context(|| format!("Failed to create working directory {:?}", workdir))?;
        }

        for &kind in cli.to.kinds() {
            let target = match cli.output {
                Some(ref out) if cli.to == ToArg::Both => out.with_extension(kind.extension()),
                Some(ref out) => out.clone(),
                None => source.with_extension(kind.extension()),
            };
            if let Some(parent) = target.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory {:?}", parent)
                    })?;
                }
            }
            let request = ConversionRequest::new(source, kind, target, &workdir)
                .with_context(|| format!("Cannot convert {:?}", source))?;
            requests.push(request);
        }
    }
    Ok(requests)
}

/// Map CLI args to `PressConfig`.
fn build_config(cli: &Cli, observer: Option<ObserverHandle>) -> Result<PressConfig> {
    let mut builder = PressConfig::builder()
        .tool_timeout_secs(cli.timeout)
        .browser_timeout_secs(cli.browser_timeout)
        .latex_passes(cli.latex_passes)
        .citeproc(!cli.no_citeproc)
        .concurrency(cli.concurrency);

    for (name, path) in &cli.tools {
        builder = builder.tool_override(name.clone(), path.clone());
    }
    if let Some(cb) = observer {
        builder = builder.observer(cb);
    }

    builder.build().context("Invalid configuration")
}
