//! # toolprobe
//!
//! Locate external executables without running them.
//!
//! Converters that shell out to third-party tools (LaTeX engines, Pandoc,
//! LibreOffice, headless browsers) need to know *before* spawning whether a
//! tool is installed. Spawning `tool --version` to find out has side effects
//! (some office suites start a daemon, some browsers create a profile), so
//! this crate answers the question purely from the filesystem.
//!
//! ## How it works
//!
//! For a tool name such as `"soffice"`:
//!
//! 1. Every directory on `PATH` is searched. On Windows each `PATHEXT`
//!    extension (`.exe`, `.cmd`, …) is tried when the name has none.
//! 2. If nothing is found, a small per-platform table of well-known install
//!    locations is consulted (macOS app bundles, `Program Files`, `/opt`,
//!    `/snap/bin`). GUI installers often do not touch `PATH`.
//!
//! Absence is a normal answer: every lookup returns `Option`/`Vec`, never an
//! error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use toolprobe::{find_executable, find_all};
//!
//! if let Some(pandoc) = find_executable("pandoc") {
//!     println!("pandoc at {}", pandoc.display());
//! }
//! for browser in find_all("google-chrome") {
//!     println!("candidate browser: {}", browser.display());
//! }
//! ```
//!
//! ## Platform support
//!
//! | OS      | Extra locations searched                                      |
//! |---------|---------------------------------------------------------------|
//! | macOS   | `/Applications/*.app/Contents/MacOS`, `/Library/TeX/texbin`, Homebrew |
//! | Linux   | `/usr/local/bin`, `/opt/*`, `/snap/bin`                        |
//! | Windows | `%ProgramFiles%`, `%ProgramFiles(x86)%`, `%LOCALAPPDATA%`      |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

// ── Platform detection ───────────────────────────────────────────────────────

/// Operating-system family, as far as install locations are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" | "freebsd" | "openbsd" | "netbsd" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }
}

// ── PATH search ──────────────────────────────────────────────────────────────

/// Directories listed in the `PATH` environment variable, in order.
pub fn search_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default()
}

/// File names to try for `name` on the current platform.
///
/// On Windows a bare name expands to one entry per `PATHEXT` extension
/// (falling back to `.exe;.cmd;.bat;.com`). Elsewhere it is just `name`.
pub fn executable_names(name: &str) -> Vec<OsString> {
    if Platform::current() != Platform::Windows || Path::new(name).extension().is_some() {
        return vec![OsString::from(name)];
    }

    let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".to_string());
    pathext
        .split(';')
        .filter(|ext| !ext.is_empty())
        .map(|ext| OsString::from(format!("{name}{}", ext.to_ascii_lowercase())))
        .collect()
}

/// Whether `path` is a regular file the current user could execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Search `dirs` in order for an executable called `name`.
pub fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let names = executable_names(name);
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|candidate| is_executable(candidate))
}

/// Search `PATH` for `name`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    find_in_dirs(name, &search_path())
}

// ── Well-known install locations ─────────────────────────────────────────────

/// Install locations for `name` that are commonly absent from `PATH`.
///
/// The returned paths are candidates only; nothing is checked for existence.
pub fn well_known_locations(name: &str) -> Vec<PathBuf> {
    well_known_for(Platform::current(), name)
}

fn well_known_for(platform: Platform, name: &str) -> Vec<PathBuf> {
    match platform {
        Platform::MacOs => macos_locations(name),
        Platform::Windows => windows_locations(name),
        Platform::Linux => linux_locations(name),
        Platform::Other => Vec::new(),
    }
}

fn macos_locations(name: &str) -> Vec<PathBuf> {
    let app = |bundle: &str, exe: &str| {
        PathBuf::from(format!("/Applications/{bundle}.app/Contents/MacOS/{exe}"))
    };
    let mut out = match name {
        "soffice" | "libreoffice" => vec![app("LibreOffice", "soffice")],
        "google-chrome" | "chrome" => vec![app("Google Chrome", "Google Chrome")],
        "chromium" => vec![app("Chromium", "Chromium")],
        "msedge" | "microsoft-edge" => vec![app("Microsoft Edge", "Microsoft Edge")],
        "brave-browser" => vec![app("Brave Browser", "Brave Browser")],
        "pdflatex" | "xelatex" | "lualatex" | "latexmk" => {
            vec![PathBuf::from("/Library/TeX/texbin").join(name)]
        }
        _ => Vec::new(),
    };
    for prefix in ["/opt/homebrew/bin", "/usr/local/bin"] {
        out.push(PathBuf::from(prefix).join(name));
    }
    out
}

fn linux_locations(name: &str) -> Vec<PathBuf> {
    let mut out = vec![
        PathBuf::from("/usr/local/bin").join(name),
        PathBuf::from("/snap/bin").join(name),
    ];
    match name {
        "soffice" | "libreoffice" => {
            out.push(PathBuf::from("/opt/libreoffice/program/soffice"));
            out.push(PathBuf::from("/usr/lib/libreoffice/program/soffice"));
        }
        "google-chrome" | "google-chrome-stable" | "chrome" => {
            out.push(PathBuf::from("/opt/google/chrome/chrome"));
        }
        "msedge" | "microsoft-edge" => {
            out.push(PathBuf::from("/opt/microsoft/msedge/msedge"));
        }
        _ => {}
    }
    out
}

fn windows_locations(name: &str) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
        .collect();
    if let Some(local) = dirs::data_local_dir() {
        roots.push(local.clone());
        roots.push(local.join("Programs"));
    }

    let relative: &[&str] = match name {
        "soffice" | "libreoffice" => &["LibreOffice\\program\\soffice.exe"],
        "google-chrome" | "chrome" => &["Google\\Chrome\\Application\\chrome.exe"],
        "msedge" | "microsoft-edge" => &["Microsoft\\Edge\\Application\\msedge.exe"],
        "brave-browser" => &["BraveSoftware\\Brave-Browser\\Application\\brave.exe"],
        "wkhtmltopdf" => &["wkhtmltopdf\\bin\\wkhtmltopdf.exe"],
        "pandoc" => &["Pandoc\\pandoc.exe"],
        "pdflatex" | "xelatex" | "lualatex" | "latexmk" => &["MiKTeX\\miktex\\bin\\x64"],
        _ => &[],
    };

    let mut out = Vec::new();
    for root in &roots {
        for rel in relative {
            let p = root.join(rel);
            // MiKTeX entries name a directory; the binary lives inside it.
            if p.extension().is_none() {
                out.push(p.join(format!("{name}.exe")));
            } else {
                out.push(p);
            }
        }
    }
    out
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate `name`: `PATH` first, then well-known install locations.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    find_all(name).into_iter().next()
}

/// Every executable copy of `name` that can be found, `PATH` hits first,
/// without duplicates.
pub fn find_all(name: &str) -> Vec<PathBuf> {
    let names = executable_names(name);
    let mut found: Vec<PathBuf> = Vec::new();

    let path_hits = search_path()
        .into_iter()
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)).collect::<Vec<_>>());

    for candidate in path_hits.chain(well_known_locations(name)) {
        if !is_executable(&candidate) {
            continue;
        }
        let key = std::fs::canonicalize(&candidate).unwrap_or_else(|_| candidate.clone());
        let duplicate = found
            .iter()
            .any(|f| std::fs::canonicalize(f).unwrap_or_else(|_| f.clone()) == key);
        if !duplicate {
            found.push(candidate);
        }
    }
    found
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn make_exe(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let p = dir.join(name);
        std::fs::write(&p, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o755)).unwrap();
        p
    }

    #[test]
    fn missing_tool_is_none() {
        assert!(find_executable("definitely-not-a-real-tool-4f1c2a").is_none());
        assert!(find_all("definitely-not-a-real-tool-4f1c2a").is_empty());
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(dir.path()));
        assert!(!is_executable(&dir.path().join("absent")));
    }

    #[cfg(unix)]
    #[test]
    fn find_in_dirs_respects_order_and_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        // Not executable: must be ignored.
        let plain = first.path().join("pandoc");
        std::fs::write(&plain, "data").unwrap();
        std::fs::set_permissions(&plain, std::fs::Permissions::from_mode(0o644)).unwrap();

        let real = make_exe(second.path(), "pandoc");
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(find_in_dirs("pandoc", &dirs), Some(real));

        let exe_first = make_exe(first.path(), "latexmk");
        make_exe(second.path(), "latexmk");
        assert_eq!(find_in_dirs("latexmk", &dirs), Some(exe_first));
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_on_unix_is_unchanged() {
        assert_eq!(executable_names("soffice"), vec![OsString::from("soffice")]);
    }

    #[test]
    fn well_known_tables_cover_office_and_browsers() {
        assert!(!well_known_for(Platform::MacOs, "soffice").is_empty());
        assert!(well_known_for(Platform::MacOs, "google-chrome")
            .iter()
            .any(|p| p.to_string_lossy().contains("Google Chrome.app")));
        assert!(well_known_for(Platform::Linux, "soffice")
            .iter()
            .any(|p| p.ends_with("program/soffice")));
        assert!(well_known_for(Platform::Other, "soffice").is_empty());
    }

    #[test]
    fn platform_is_stable() {
        assert_eq!(Platform::current(), Platform::current());
    }
}
