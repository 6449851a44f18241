//! Tool availability probe.
//!
//! Strategies never spawn a tool to find out whether it exists. They ask a
//! [`ToolLocator`], which answers from the filesystem (or, in tests, from a
//! fixed table). "Not installed" is `None`, a normal answer.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// An external tool, identified by a canonical name and the executable
/// names it may be installed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tool<'a> {
    /// Canonical name; used for overrides, `DOCPRESS_<NAME>` and the
    /// install hint.
    pub name: &'a str,
    /// Executable names to look for, in preference order.
    pub candidates: &'a [&'a str],
}

impl<'a> Tool<'a> {
    /// A tool known under a single executable name, such as a Pandoc PDF
    /// engine taken from config.
    pub fn single(name: &'a &'a str) -> Self {
        Tool {
            name: *name,
            candidates: std::slice::from_ref(name),
        }
    }

    /// Environment variable that overrides this tool's location.
    pub fn env_var(&self) -> String {
        let upper: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("DOCPRESS_{upper}")
    }
}

pub const TECTONIC: Tool<'static> = Tool {
    name: "tectonic",
    candidates: &["tectonic"],
};

pub const LATEXMK: Tool<'static> = Tool {
    name: "latexmk",
    candidates: &["latexmk"],
};

pub const PDFLATEX: Tool<'static> = Tool {
    name: "pdflatex",
    candidates: &["pdflatex"],
};

pub const XELATEX: Tool<'static> = Tool {
    name: "xelatex",
    candidates: &["xelatex"],
};

pub const LUALATEX: Tool<'static> = Tool {
    name: "lualatex",
    candidates: &["lualatex"],
};

pub const PANDOC: Tool<'static> = Tool {
    name: "pandoc",
    candidates: &["pandoc"],
};

pub const SOFFICE: Tool<'static> = Tool {
    name: "soffice",
    candidates: &["soffice", "libreoffice"],
};

pub const POWERSHELL: Tool<'static> = Tool {
    name: "powershell",
    candidates: &["powershell", "pwsh"],
};

pub const BROWSER: Tool<'static> = Tool {
    name: "chrome",
    candidates: &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "msedge",
        "microsoft-edge",
        "brave-browser",
    ],
};

pub const WKHTMLTOPDF: Tool<'static> = Tool {
    name: "wkhtmltopdf",
    candidates: &["wkhtmltopdf"],
};

/// Every tool the default chain may probe, in chain order.
pub const ALL_TOOLS: &[Tool<'static>] = &[
    TECTONIC,
    LATEXMK,
    PDFLATEX,
    PANDOC,
    XELATEX,
    LUALATEX,
    SOFFICE,
    POWERSHELL,
    BROWSER,
    WKHTMLTOPDF,
];

/// Resolves tools to executables without side effects.
pub trait ToolLocator: Send + Sync {
    /// Every executable that can serve as `tool`, best first.
    fn locate_all(&self, tool: &Tool<'_>) -> Vec<PathBuf>;

    /// The preferred executable for `tool`, if any.
    fn locate(&self, tool: &Tool<'_>) -> Option<PathBuf> {
        self.locate_all(tool).into_iter().next()
    }
}

/// Production locator: overrides, then `DOCPRESS_<NAME>`, then `PATH` and
/// platform install locations via [`toolprobe`].
#[derive(Debug, Clone, Default)]
pub struct SystemLocator {
    overrides: HashMap<String, PathBuf>,
}

impl SystemLocator {
    pub fn new(overrides: HashMap<String, PathBuf>) -> Self {
        Self { overrides }
    }

    fn override_for(&self, tool: &Tool<'_>) -> Option<PathBuf> {
        let explicit = self
            .overrides
            .get(tool.name)
            .cloned()
            .map(|p| (p, "config"))
            .or_else(|| {
                std::env::var_os(tool.env_var()).map(|p| (PathBuf::from(p), "environment"))
            });

        let (path, origin) = explicit?;
        if toolprobe::is_executable(&path) {
            Some(path)
        } else {
            warn!(
                "Ignoring {} override for {} ('{}'): not an executable file",
                origin,
                tool.name,
                path.display()
            );
            None
        }
    }
}

impl ToolLocator for SystemLocator {
    fn locate_all(&self, tool: &Tool<'_>) -> Vec<PathBuf> {
        if let Some(p) = self.override_for(tool) {
            debug!("{} → {} (override)", tool.name, p.display());
            return vec![p];
        }

        let mut found: Vec<PathBuf> = Vec::new();
        for candidate in tool.candidates {
            for p in toolprobe::find_all(candidate) {
                if !found.contains(&p) {
                    found.push(p);
                }
            }
        }
        debug!("{} → {} candidate(s)", tool.name, found.len());
        found
    }
}

/// Locator backed by an explicit table, keyed by [`Tool::name`].
///
/// Nothing outside the table exists. Used by tests and by embedders that
/// ship their own toolchain.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    table: HashMap<String, Vec<PathBuf>>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as (another) executable for the tool named `name`.
    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.table.entry(name.into()).or_default().push(path.into());
        self
    }
}

impl ToolLocator for StaticLocator {
    fn locate_all(&self, tool: &Tool<'_>) -> Vec<PathBuf> {
        self.table.get(tool.name).cloned().unwrap_or_default()
    }
}
