//! Conversion requests: what to convert, into what, and where.
//!
//! A [`ConversionRequest`] is validated once at construction and is
//! immutable afterwards. Validation is the only place the library fails fast;
//! once a request exists, [`crate::convert::Converter::convert`] always
//! returns an outcome.

use crate::error::PressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The logical output kind requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Pdf,
    Docx,
}

impl TargetKind {
    /// File extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            TargetKind::Pdf => "pdf",
            TargetKind::Docx => "docx",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Input format, inferred from the source extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Latex,
    Markdown,
    Html,
}

impl SourceFormat {
    /// Infer the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tex" | "latex" | "ltx" => Some(SourceFormat::Latex),
            "md" | "markdown" => Some(SourceFormat::Markdown),
            "html" | "htm" => Some(SourceFormat::Html),
            _ => None,
        }
    }

    /// Reader name understood by `pandoc -f`.
    pub fn pandoc_reader(self) -> &'static str {
        match self {
            SourceFormat::Latex => "latex",
            SourceFormat::Markdown => "markdown",
            SourceFormat::Html => "html",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pandoc_reader())
    }
}

/// One document to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    source: PathBuf,
    source_format: SourceFormat,
    kind: TargetKind,
    target: PathBuf,
    workdir: PathBuf,
}

impl ConversionRequest {
    /// Build a request, validating the source and the working directory.
    ///
    /// # Errors
    /// - [`PressError::SourceNotFound`] / [`PressError::PermissionDenied`] /
    ///   [`PressError::NotAFile`] when the source cannot be read
    /// - [`PressError::UnsupportedSource`] for unknown extensions
    /// - [`PressError::WorkdirMissing`] when `workdir` is not a directory
    ///
    /// Relative paths are resolved against the current directory here, since
    /// every tool is later spawned inside `workdir`.
    pub fn new(
        source: impl Into<PathBuf>,
        kind: TargetKind,
        target: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
    ) -> Result<Self, PressError> {
        let source = source.into();
        let source = absolute(&source).ok_or(PressError::SourceNotFound { path: source })?;
        let workdir = workdir.into();
        let workdir = absolute(&workdir).ok_or(PressError::WorkdirMissing { path: workdir })?;

        check_readable(&source)?;
        let source_format = SourceFormat::from_path(&source)
            .ok_or_else(|| PressError::UnsupportedSource { path: source.clone() })?;

        if !workdir.is_dir() {
            return Err(PressError::WorkdirMissing { path: workdir });
        }

        let target = target.into();
        let target = absolute(&target).ok_or_else(|| {
            PressError::InvalidConfig(format!("invalid target path '{}'", target.display()))
        })?;
        if target == source {
            return Err(PressError::TargetIsSource { path: target });
        }

        Ok(Self {
            source,
            source_format,
            kind,
            target,
            workdir,
        })
    }

    /// Build a request whose target sits next to the source, with the
    /// kind's extension, and whose working directory is the source's folder.
    pub fn beside_source(source: impl Into<PathBuf>, kind: TargetKind) -> Result<Self, PressError> {
        let source = source.into();
        let workdir = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = source.with_extension(kind.extension());
        Self::new(source, kind, target, workdir)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn source_format(&self) -> SourceFormat {
        self.source_format
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// File stem of the source, used to name intermediates.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Where a tool that writes `<outdir>/<stem>.<ext>` leaves its output
    /// when pointed at the working directory.
    pub fn workdir_output(&self, ext: &str) -> PathBuf {
        self.workdir.join(format!("{}.{ext}", self.stem()))
    }
}

fn absolute(path: &Path) -> Option<PathBuf> {
    std::path::absolute(path).ok()
}

fn check_readable(path: &Path) -> Result<(), PressError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PressError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(PressError::SourceNotFound {
                path: path.to_path_buf(),
            })
        }
    };
    if !meta.is_file() {
        return Err(PressError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PressError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(PressError::SourceNotFound {
            path: path.to_path_buf(),
        }),
    }
}
