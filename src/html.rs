//! HTML preview of a source document.
//!
//! The browser and wkhtmltopdf strategies print HTML, not LaTeX. The preview
//! is produced by `pandoc -s --mathml` when Pandoc is installed; otherwise a
//! self-contained page is written that shows the raw source in a `<pre>`
//! block, which is ugly but always succeeds.

use crate::error::AttemptError;
use crate::process::{self, Invocation};
use crate::request::{ConversionRequest, SourceFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

static RE_LATEX_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\title\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}").unwrap());

static RE_LATEX_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\\begin\{document\}(.*?)\\end\{document\}").unwrap()
});

static RE_MARKDOWN_H1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+(.+?)\s*#*\s*$").unwrap());

const DEFAULT_TITLE: &str = "Document";

const RAW_CSS: &str = r#"      body { max-width: 52rem; margin: 2rem auto; font-family: Georgia, serif; }
      h1 { font-size: 1.6rem; text-align: center; }
      pre { white-space: pre-wrap; word-wrap: break-word; font-size: 0.85rem; line-height: 1.4; }"#;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Best-effort document title.
pub fn extract_title(text: &str, format: SourceFormat) -> String {
    let found = match format {
        SourceFormat::Latex => RE_LATEX_TITLE.captures(text).map(|c| c[1].to_string()),
        SourceFormat::Markdown => RE_MARKDOWN_H1.captures(text).map(|c| c[1].to_string()),
        SourceFormat::Html => None,
    };
    found
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// The part of the source worth showing: the document environment for
/// LaTeX, everything otherwise.
pub fn extract_body(text: &str, format: SourceFormat) -> &str {
    match format {
        SourceFormat::Latex => RE_LATEX_BODY
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches('\n'))
            .unwrap_or(text),
        _ => text,
    }
}

/// Standalone HTML page showing `text` verbatim.
pub fn raw_wrapper(text: &str, format: SourceFormat) -> String {
    let title = html_escape(&extract_title(text, format));
    let body = html_escape(extract_body(text, format));
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
{css}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <pre>{body}</pre>
</body>
</html>
"#,
        title = title,
        css = RAW_CSS,
        body = body
    )
}

/// Where the preview for `request` lives. An HTML source is its own preview.
pub fn preview_path(request: &ConversionRequest) -> PathBuf {
    match request.source_format() {
        SourceFormat::Html => request.source().to_path_buf(),
        _ => request.workdir_output("html"),
    }
}

/// Ensure the preview exists and return its path.
///
/// `pandoc` is the located Pandoc executable, if any. A failing Pandoc run
/// is logged and replaced by the raw wrapper; only filesystem errors
/// propagate.
pub async fn write_preview(
    request: &ConversionRequest,
    pandoc: Option<&Path>,
    timeout: Duration,
) -> Result<PathBuf, AttemptError> {
    let path = preview_path(request);
    if request.source_format() == SourceFormat::Html {
        return Ok(path);
    }

    crate::artifact::clear_stale(&path)?;
    if let Some(pandoc) = pandoc {
        let inv = Invocation::new(pandoc, request.workdir(), timeout)
            .arg(request.source())
            .args(["-f", request.source_format().pandoc_reader()])
            .args(["-s", "--mathml", "-o"])
            .arg(&path);
        match process::run(&inv).await {
            Ok(_) if crate::artifact::is_valid(&path) => {
                debug!("Preview written by pandoc: {}", path.display());
                return Ok(path);
            }
            Ok(_) => warn!("pandoc left no preview at {}; using raw wrapper", path.display()),
            Err(e) => warn!("pandoc preview failed ({}); using raw wrapper", e),
        }
    }

    let bytes = std::fs::read(request.source()).map_err(|e| AttemptError::io(request.source(), e))?;
    let text = String::from_utf8_lossy(&bytes);
    std::fs::write(&path, raw_wrapper(&text, request.source_format()))
        .map_err(|e| AttemptError::io(&path, e))?;
    debug!("Preview written as raw wrapper: {}", path.display());
    Ok(path)
}

/// `file://` URL for an absolute or relative local path.
pub fn file_url(path: &Path) -> String {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|d| d.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut s = abs.to_string_lossy().replace('\\', "/");
    if !s.starts_with('/') {
        // Windows drive path: C:/...
        s.insert(0, '/');
    }

    let mut out = String::from("file://");
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = r"\documentclass{article}
\title{On  the Separation
  of Classes}
\begin{document}
\maketitle
Let $a < b$ \& done.
\end{document}
";

    #[test]
    fn html_escape_escapes_special_chars() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"q\""), "&quot;q&quot;");
    }

    #[test]
    fn latex_title_is_normalised() {
        assert_eq!(
            extract_title(PAPER, SourceFormat::Latex),
            "On the Separation of Classes"
        );
        assert_eq!(extract_title("no title", SourceFormat::Latex), DEFAULT_TITLE);
    }

    #[test]
    fn markdown_title_from_h1() {
        assert_eq!(
            extract_title("intro\n# Results #\nbody", SourceFormat::Markdown),
            "Results"
        );
    }

    #[test]
    fn latex_body_excludes_preamble() {
        let body = extract_body(PAPER, SourceFormat::Latex);
        assert!(body.starts_with("\\maketitle"));
        assert!(!body.contains("documentclass"));
        assert_eq!(extract_body("plain", SourceFormat::Latex), "plain");
    }

    #[test]
    fn raw_wrapper_escapes_source() {
        let html = raw_wrapper(PAPER, SourceFormat::Latex);
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>On the Separation of Classes</title>"));
        assert!(html.contains("$a &lt; b$ \\&amp; done."));
        assert!(!html.contains("\\begin{document}"));
    }

    #[test]
    fn file_url_percent_encodes() {
        assert_eq!(
            file_url(Path::new("/tmp/my paper/a#1.html")),
            "file:///tmp/my%20paper/a%231.html"
        );
    }

    #[tokio::test]
    async fn preview_without_pandoc_uses_raw_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("paper.tex");
        std::fs::write(&src, PAPER).unwrap();
        let req = ConversionRequest::new(
            &src,
            crate::request::TargetKind::Pdf,
            dir.path().join("paper.pdf"),
            dir.path(),
        )
        .unwrap();

        let preview = write_preview(&req, None, Duration::from_secs(5)).await.unwrap();
        assert_eq!(preview, dir.path().join("paper.html"));
        let html = std::fs::read_to_string(&preview).unwrap();
        assert!(html.contains("<pre>"));
    }

    #[tokio::test]
    async fn html_source_is_its_own_preview() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("page.html");
        std::fs::write(&src, "<p>hi</p>").unwrap();
        let req =
            ConversionRequest::beside_source(&src, crate::request::TargetKind::Pdf).unwrap();
        let preview = write_preview(&req, None, Duration::from_secs(5)).await.unwrap();
        assert_eq!(preview, src);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_pandoc_falls_back_to_raw_wrapper() {
        use crate::strategy::test_support::{fake_tool, spawn_lock};
        let _guard = spawn_lock();
        let dir = tempfile::tempdir().unwrap();
        let pandoc = fake_tool(dir.path(), "pandoc", "exit 2");

        let src = dir.path().join("notes.md");
        std::fs::write(&src, "# Notes\n\n<b>bold</b>\n").unwrap();
        let req =
            ConversionRequest::beside_source(&src, crate::request::TargetKind::Pdf).unwrap();

        let preview = write_preview(&req, Some(&pandoc), Duration::from_secs(5))
            .await
            .unwrap();
        let html = std::fs::read_to_string(preview).unwrap();
        assert!(html.contains("<title>Notes</title>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }
}
