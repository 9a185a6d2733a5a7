//! # pdfium-probe
//!
//! Locate an installed [PDFium](https://pdfium.googlesource.com/pdfium/)
//! library and bind `pdfium-render` to it, or explain precisely what is
//! missing and how to fix it.
//!
//! ## Search order
//!
//! 1. An explicit path supplied by the caller (a library file, or a directory
//!    containing the platform library). If given and absent, the search stops
//!    with [`ProbeError::ExplicitPathMissing`].
//! 2. The per-user cache directory, see [`pdfium_cache_dir`].
//! 3. The directory containing the running executable.
//! 4. The current working directory.
//! 5. The operating system's library search path.
//!
//! Nothing is downloaded. When every location misses, [`ProbeError::NotFound`]
//! lists the paths that were tried together with [`REMEDIATION`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_probe::{bind_pdfium, locate_pdfium};
//!
//! let location = locate_pdfium(None).expect("PDFium unavailable");
//! println!("using {location}");
//! let pdfium = bind_pdfium(None).expect("bind failed");
//! ```
//!
//! ## Platform library names
//!
//! | OS      | Library           |
//! |---------|-------------------|
//! | macOS   | `libpdfium.dylib` |
//! | Linux   | `libpdfium.so`    |
//! | Windows | `pdfium.dll`      |

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Name of the per-user cache sub-directory searched for the library.
pub const CACHE_DIR_NAME: &str = "pdf-unwatermark";

/// How to install PDFium when it cannot be found.
pub const REMEDIATION: &str = "\
Install a PDFium build for your platform, for example from\n\
  https://github.com/bblanchon/pdfium-binaries/releases\n\
then either copy the library next to the executable, into the cache\n\
directory shown above, or pass its location with --pdfium-lib <PATH>.";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by pdfium-probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The caller named a library location that does not exist.
    #[error("PDFium library not found at '{path}'\n{}", REMEDIATION)]
    ExplicitPathMissing { path: PathBuf },

    /// No location in the search order held a loadable library.
    #[error(
        "PDFium library not found. Searched:\n{}\n  (system library path)\n{}",
        format_searched(.searched),
        REMEDIATION
    )]
    NotFound { searched: Vec<PathBuf> },

    /// A library file was found but `pdfium-render` could not load it.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    /// The system library path was reported as usable but binding failed.
    #[error("Failed to bind the system PDFium library: {0}")]
    BindSystem(String),
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Location ─────────────────────────────────────────────────────────────────

/// Where a usable PDFium library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumLocation {
    /// A concrete library file.
    File(PathBuf),
    /// Resolved by the dynamic loader from the system search path.
    System,
}

impl fmt::Display for PdfiumLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfiumLocation::File(p) => write!(f, "{}", p.display()),
            PdfiumLocation::System => f.write_str("<system library path>"),
        }
    }
}

/// Platform file name of the PDFium library (`libpdfium.so`, `pdfium.dll`, …).
pub fn library_name() -> OsString {
    Pdfium::pdfium_platform_library_name()
}

/// Returns the per-user directory searched for a cached PDFium library.
///
/// - **macOS**: `~/Library/Caches/pdf-unwatermark/pdfium/`
/// - **Linux**: `~/.cache/pdf-unwatermark/pdfium/`
/// - **Windows**: `%LOCALAPPDATA%\pdf-unwatermark\pdfium\`
pub fn pdfium_cache_dir() -> PathBuf {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join(CACHE_DIR_NAME).join("pdfium")
}

/// The file paths that are checked, in order, when no explicit path is given.
pub fn candidate_paths() -> Vec<PathBuf> {
    let name = library_name();
    let mut paths = vec![pdfium_cache_dir().join(&name)];

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(&name));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(&name));
    }

    paths.dedup();
    paths
}

/// Resolve an explicit location: a directory is joined with the platform
/// library name, anything else is taken as the library file itself.
fn resolve_explicit(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(library_name())
    } else {
        path.to_path_buf()
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Find a PDFium library without keeping it loaded.
///
/// File candidates only need to exist; the system path is probed by actually
/// asking the dynamic loader, which is the only reliable test there.
pub fn locate_pdfium(explicit: Option<&Path>) -> Result<PdfiumLocation, ProbeError> {
    if let Some(path) = explicit {
        let file = resolve_explicit(path);
        if file.is_file() {
            return Ok(PdfiumLocation::File(file));
        }
        return Err(ProbeError::ExplicitPathMissing { path: file });
    }

    let searched = candidate_paths();
    if let Some(found) = searched.iter().find(|p| p.is_file()) {
        return Ok(PdfiumLocation::File(found.clone()));
    }

    match Pdfium::bind_to_system_library() {
        Ok(_bindings) => Ok(PdfiumLocation::System),
        Err(_) => Err(ProbeError::NotFound { searched }),
    }
}

/// Locate PDFium and bind to it.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ProbeError> {
    match locate_pdfium(explicit)? {
        PdfiumLocation::File(path) => bind_pdfium_from_path(&path),
        PdfiumLocation::System => Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ProbeError::BindSystem(e.to_string())),
    }
}

/// Binds to a PDFium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, ProbeError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| ProbeError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
