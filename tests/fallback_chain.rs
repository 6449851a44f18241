//! Integration tests for the full default chain.
//!
//! Real toolchains are replaced by small shell scripts that mimic each
//! tool's command-line contract (where it writes its output, which flags
//! carry paths). A [`StaticLocator`] makes exactly those scripts "installed",
//! so every scenario is reproducible regardless of what the test machine has.
//!
//! Run with:
//!   cargo test --test fallback_chain -- --nocapture
#![cfg(unix)]

use docpress::strategy::default_chain;
use docpress::{
    AttemptStatus, ConversionOutcome, ConversionRequest, Converter, PressConfig, PressError,
    StaticLocator, TargetKind,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

// ── Fake tools ───────────────────────────────────────────────────────────────

// <source> -f <reader> ... -o <out> ...; fails like pandoc on an unreadable source.
const PANDOC: &str = r#"echo "pandoc $*" >> 'LOG'
[ -r "$1" ] || { echo "cannot open $1 in $(pwd)" >&2; exit 1; }
out=""; prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
printf 'pandoc output' > "$out""#;

// --headless --convert-to <fmt[:filter]> --outdir <dir> <file>
const SOFFICE: &str = r#"echo "soffice $*" >> 'LOG'
fmt="${3%%:*}"; out="$5"; in="$6"
base=$(basename "$in"); stem="${base%.*}"
printf 'office %s' "$fmt" > "$out/$stem.$fmt""#;

// --outdir <dir> <source>
const TECTONIC: &str = r#"echo "tectonic $*" >> 'LOG'
stem=$(basename "$3" .tex)
printf '%%PDF-1.7 tectonic' > "$2/$stem.pdf""#;

const TECTONIC_EMPTY: &str = r#"stem=$(basename "$3" .tex)
: > "$2/$stem.pdf""#;

const TECTONIC_HANGS: &str = "exec sleep 30";

// -interaction=nonstopmode -halt-on-error -output-directory=<dir> <source>
const PDFLATEX: &str = r#"echo "pdflatex $*" >> 'LOG'
dir="${3#-output-directory=}"; stem=$(basename "$4" .tex)
printf '%%PDF-1.5 pdflatex' > "$dir/$stem.pdf""#;

// -pdf -interaction=nonstopmode -halt-on-error -outdir=<dir> <source>
const LATEXMK: &str = r#"echo "latexmk $*" >> 'LOG'
dir="${4#-outdir=}"; stem=$(basename "$5" .tex)
printf '%%PDF-1.5 latexmk' > "$dir/$stem.pdf""#;

const CHROME: &str = r#"echo "chrome $*" >> 'LOG'
for a in "$@"; do
  case "$a" in --print-to-pdf=*) printf '%%PDF-1.4 chrome' > "${a#--print-to-pdf=}";; esac
done"#;

const WKHTMLTOPDF: &str = r#"echo "wkhtmltopdf $*" >> 'LOG'
cat "$3" > "$4""#;

// ── Test helpers ─────────────────────────────────────────────────────────────

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Scripts are written and then executed; serialising the tests keeps a
/// concurrent fork from holding a script open for writing (ETXTBSY).
fn serial() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// A directory of fake tools plus the locator that knows about them.
struct Toolbox {
    bin: TempDir,
    log: PathBuf,
    locator: StaticLocator,
}

impl Toolbox {
    fn new() -> Self {
        let bin = tempfile::tempdir().unwrap();
        let log = bin.path().join("calls.log");
        Self {
            bin,
            log,
            locator: StaticLocator::new(),
        }
    }

    /// Install `body` as the executable for tool `name`.
    fn with(mut self, name: &str, body: &str) -> Self {
        let path = self.bin.path().join(name);
        let script = format!(
            "#!/bin/sh\n{}\n",
            body.replace("LOG", &self.log.to_string_lossy())
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        self.locator = self.locator.with(name, path);
        self
    }

    fn everything() -> Self {
        Self::new()
            .with("tectonic", TECTONIC)
            .with("latexmk", LATEXMK)
            .with("pdflatex", PDFLATEX)
            .with("pandoc", PANDOC)
            .with("soffice", SOFFICE)
            .with("chrome", CHROME)
            .with("wkhtmltopdf", WKHTMLTOPDF)
    }

    fn calls(&self) -> String {
        std::fs::read_to_string(&self.log).unwrap_or_default()
    }

    fn converter(&self, config: PressConfig) -> Converter {
        Converter::with_parts(config, default_chain(), Arc::new(self.locator.clone()))
    }
}

const MANUSCRIPT: &str = r"\documentclass{article}
\title{Exponential Decay of Correlation Functions}
\begin{document}
\maketitle
\section{Introduction}
See Section~\ref{sec:proof}.
\section{Proof}\label{sec:proof}
$a < b$.
\end{document}
";

fn manuscript(dir: &Path) -> PathBuf {
    let src = dir.join("03_Yang_Mills.tex");
    std::fs::write(&src, MANUSCRIPT).unwrap();
    src
}

fn statuses(outcome: &ConversionOutcome) -> Vec<(String, AttemptStatus)> {
    outcome
        .attempts
        .iter()
        .map(|a| (a.strategy.clone(), a.status))
        .collect()
}

fn status_of(outcome: &ConversionOutcome, strategy: &str) -> AttemptStatus {
    outcome
        .attempts
        .iter()
        .find(|a| a.strategy == strategy)
        .map(|a| a.status)
        .unwrap_or_else(|| panic!("no record for {strategy}"))
}

fn assert_valid(path: &Path) {
    let meta = std::fs::metadata(path).unwrap_or_else(|_| panic!("{} missing", path.display()));
    assert!(meta.len() > 0, "{} is empty", path.display());
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn nothing_installed_reports_every_missing_tool() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new();
    let converter = tools.converter(PressConfig::default());

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = converter.convert(&req).await;

    assert!(!outcome.succeeded);
    assert!(outcome.artifact_path.is_none());
    assert_eq!(outcome.attempts.len(), 8);
    assert!(outcome
        .attempts
        .iter()
        .all(|a| a.status == AttemptStatus::Skipped));
    for tool in ["tectonic", "latexmk", "pdflatex", "pandoc", "soffice", "chrome", "wkhtmltopdf"] {
        assert!(
            outcome.missing_tools.iter().any(|t| t == tool),
            "{tool} not in {:?}",
            outcome.missing_tools
        );
    }
    assert!(!req.target().exists());
}

#[tokio::test]
async fn nothing_installed_docx() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new();

    let req = ConversionRequest::beside_source(&src, TargetKind::Docx).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.missing_tools, ["pandoc", "soffice"]);
}

#[tokio::test]
async fn pandoc_only_without_engine() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new().with("pandoc", PANDOC);

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert!(outcome.succeeded, "{}", outcome.summary());
    assert_eq!(outcome.winner.as_deref(), Some("pandoc"));
    assert_valid(req.target());
    let calls = tools.calls();
    assert!(calls.contains("-f latex -o"), "{calls}");
    assert!(!calls.contains("--pdf-engine"), "{calls}");
    assert_eq!(
        statuses(&outcome)[4..],
        [
            ("libreoffice".to_string(), AttemptStatus::NotReached),
            ("word".to_string(), AttemptStatus::NotReached),
            ("browser".to_string(), AttemptStatus::NotReached),
            ("wkhtmltopdf".to_string(), AttemptStatus::NotReached),
        ]
    );
}

#[tokio::test]
async fn pandoc_docx_uses_citeproc() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new().with("pandoc", PANDOC);

    let req = ConversionRequest::beside_source(&src, TargetKind::Docx).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(outcome.winner.as_deref(), Some("pandoc"));
    assert_eq!(req.target(), work.path().join("03_Yang_Mills.docx"));
    assert_valid(req.target());
    assert!(tools.calls().contains("--citeproc"));
}

#[tokio::test]
async fn pandoc_uses_first_installed_engine() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new()
        .with("pandoc", PANDOC)
        .with("lualatex", "exit 1");

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(outcome.winner.as_deref(), Some("pandoc"));
    let calls = tools.calls();
    assert!(calls.contains("--pdf-engine="), "{calls}");
    assert!(calls.contains("lualatex"), "{calls}");
}

#[tokio::test]
async fn office_suite_only() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new().with("soffice", SOFFICE);

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert!(outcome.succeeded, "{}", outcome.summary());
    assert_eq!(outcome.winner.as_deref(), Some("libreoffice"));
    assert_valid(req.target());
    // The intermediate stays behind.
    assert_valid(&work.path().join("03_Yang_Mills.docx"));
    assert_eq!(status_of(&outcome, "pandoc"), AttemptStatus::Skipped);
    assert!(outcome.missing_tools.iter().any(|t| t == "pandoc"));

    let calls = tools.calls();
    assert!(calls.contains("--convert-to docx:MS Word 2007 XML"), "{calls}");
    assert!(calls.contains("--convert-to pdf"), "{calls}");
}

#[tokio::test]
async fn office_suite_with_separate_workdir() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new()
        .with("soffice", SOFFICE)
        .with("pandoc", "exit 3");

    let target = out.path().join("final.pdf");
    let req = ConversionRequest::new(&src, TargetKind::Pdf, &target, scratch.path()).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(outcome.winner.as_deref(), Some("libreoffice"));
    assert_eq!(outcome.artifact_path.as_deref(), Some(target.as_path()));
    assert_valid(&target);
    assert_eq!(status_of(&outcome, "pandoc"), AttemptStatus::Failed);
    assert_valid(&scratch.path().join("03_Yang_Mills.docx"));
    assert!(!scratch.path().join("03_Yang_Mills.pdf").exists());
}

#[tokio::test]
async fn everything_installed_prefers_the_native_engine() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::everything();

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(outcome.winner.as_deref(), Some("tectonic"));
    assert!(std::fs::read_to_string(req.target())
        .unwrap()
        .contains("tectonic"));
    assert!(outcome.missing_tools.is_empty());
    assert_eq!(
        outcome.with_status(AttemptStatus::NotReached).count(),
        7
    );
    let calls = tools.calls();
    assert_eq!(calls.lines().count(), 1, "{calls}");
}

#[tokio::test]
async fn zero_byte_output_falls_through() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new()
        .with("tectonic", TECTONIC_EMPTY)
        .with("pdflatex", PDFLATEX);

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(status_of(&outcome, "tectonic"), AttemptStatus::Failed);
    assert_eq!(status_of(&outcome, "latexmk"), AttemptStatus::Skipped);
    assert_eq!(outcome.winner.as_deref(), Some("pdflatex"));
    // Two passes for cross-references.
    assert_eq!(tools.calls().matches("pdflatex ").count(), 2);
}

#[tokio::test]
async fn hung_tool_is_killed_and_chain_continues() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new()
        .with("tectonic", TECTONIC_HANGS)
        .with("pandoc", PANDOC);
    let config = PressConfig::builder().tool_timeout_secs(1).build().unwrap();

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let started = std::time::Instant::now();
    let outcome = tools.converter(config).convert(&req).await;

    assert!(started.elapsed() < std::time::Duration::from_secs(20));
    assert_eq!(status_of(&outcome, "tectonic"), AttemptStatus::Failed);
    assert!(outcome.attempts[0].detail.contains("timed out"));
    assert_eq!(outcome.winner.as_deref(), Some("pandoc"));
}

#[tokio::test]
async fn browser_prints_markdown_preview() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = work.path().join("notes.md");
    std::fs::write(&src, "# Notes\n\nSome *text*.\n").unwrap();
    let tools = Toolbox::new().with("chrome", CHROME);

    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();
    let outcome = tools.converter(PressConfig::default()).convert(&req).await;

    assert_eq!(outcome.winner.as_deref(), Some("browser"));
    assert_eq!(status_of(&outcome, "tectonic"), AttemptStatus::Skipped);
    assert_valid(&work.path().join("notes.html"));
    let calls = tools.calls();
    assert!(calls.contains("--headless=new"), "{calls}");
    assert!(calls.contains("file://"), "{calls}");
}

#[tokio::test]
async fn relative_source_in_a_subdirectory() {
    let _g = serial();
    let work = tempfile::Builder::new()
        .prefix(".docpress-chain")
        .tempdir_in(".")
        .unwrap();
    let docs = work.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    manuscript(&docs);
    let rel = work
        .path()
        .strip_prefix(".")
        .unwrap()
        .join("docs/03_Yang_Mills.tex");
    let tools = Toolbox::new()
        .with("pandoc", PANDOC)
        .with("soffice", SOFFICE);

    for kind in [TargetKind::Pdf, TargetKind::Docx] {
        let req = ConversionRequest::beside_source(&rel, kind).unwrap();
        let outcome = tools.converter(PressConfig::default()).convert(&req).await;

        assert!(outcome.succeeded, "{}", outcome.summary());
        assert_eq!(outcome.winner.as_deref(), Some("pandoc"));
        assert_valid(&docs.join(format!("03_Yang_Mills.{}", kind.extension())));
    }
    assert!(!docs.join("docs").exists());
}

#[tokio::test]
async fn repeated_runs_pick_the_same_winner() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new()
        .with("soffice", SOFFICE)
        .with("wkhtmltopdf", WKHTMLTOPDF);
    let converter = tools.converter(PressConfig::default());
    let req = ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap();

    let first = converter.convert(&req).await;
    let second = converter.convert(&req).await;

    assert_eq!(first.winner, second.winner);
    assert_eq!(first.winner.as_deref(), Some("libreoffice"));
    assert_eq!(statuses(&first), statuses(&second));
    assert_valid(req.target());
}

#[tokio::test]
async fn batch_outcomes_follow_input_order() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let tools = Toolbox::new().with("pandoc", PANDOC);
    let mut requests = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let src = work.path().join(format!("{name}.md"));
        std::fs::write(&src, format!("# {name}\n")).unwrap();
        requests.push(ConversionRequest::beside_source(&src, TargetKind::Docx).unwrap());
    }
    let config = PressConfig::builder().concurrency(3).build().unwrap();

    let outcomes = tools.converter(config).convert_batch(&requests).await;

    assert_eq!(outcomes.len(), 4);
    for (req, outcome) in requests.iter().zip(&outcomes) {
        assert!(outcome.succeeded);
        assert_eq!(outcome.artifact_path.as_deref(), Some(req.target()));
        assert_valid(req.target());
    }
}

#[tokio::test]
async fn both_kinds_of_one_source_in_a_batch() {
    let _g = serial();
    let work = tempfile::tempdir().unwrap();
    let src = manuscript(work.path());
    let tools = Toolbox::new().with("soffice", SOFFICE);
    let requests = vec![
        ConversionRequest::beside_source(&src, TargetKind::Pdf).unwrap(),
        ConversionRequest::beside_source(&src, TargetKind::Docx).unwrap(),
    ];

    let outcomes = tools.converter(PressConfig::default()).convert_batch(&requests).await;

    for (req, outcome) in requests.iter().zip(&outcomes) {
        assert!(outcome.succeeded, "{}", outcome.summary());
        assert_eq!(outcome.winner.as_deref(), Some("libreoffice"));
        assert_valid(req.target());
    }
    // One office run at a time: import + export for the PDF, import for the DOCX.
    let calls = tools.calls();
    let order: Vec<&str> = calls
        .lines()
        .map(|l| if l.contains("--convert-to pdf") { "pdf" } else { "docx" })
        .collect();
    assert_eq!(order, ["docx", "pdf", "docx"], "{calls}");
}

#[test]
fn missing_source_fails_before_any_tool_runs() {
    let work = tempfile::tempdir().unwrap();
    let err = ConversionRequest::beside_source(work.path().join("absent.tex"), TargetKind::Pdf)
        .unwrap_err();
    assert!(matches!(err, PressError::SourceNotFound { .. }));
}
