//! Input resolution: find candidate PDFs, apply the user's choice, and
//! validate the chosen file before any stage touches it.
//!
//! Validation looks for the `%PDF-` header in the first kilobyte, the same
//! window PDFium accepts, so callers get a meaningful error instead of an
//! opaque PDFium failure.

use crate::config::{SelectionPolicy, OUTPUT_MARKER};
use crate::error::UnwatermarkError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PDF_HEADER: &[u8] = b"%PDF-";
/// Bytes scanned for [`PDF_HEADER`]; leading junk before it is tolerated.
const HEADER_WINDOW: u64 = 1024;

/// The source document picked from the candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: PathBuf,
    /// 1-based position among the candidates.
    pub number: usize,
    /// `true` when the choice was unusable and the first candidate was taken.
    pub fell_back: bool,
}

/// List the PDF files directly inside `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, UnwatermarkError> {
    let entries = std::fs::read_dir(dir).map_err(|e| UnwatermarkError::io(dir, e))?;

    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| UnwatermarkError::io(dir, e))?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            found.push(path);
        }
    }
    found.sort();

    debug!("Found {} PDF candidates in {}", found.len(), dir.display());
    Ok(found)
}

/// Discover the PDFs in `dir` and select one non-interactively.
pub fn find_source(
    dir: &Path,
    choice: Option<&str>,
    policy: SelectionPolicy,
) -> Result<Selection, UnwatermarkError> {
    let candidates = discover_sources(dir)?;
    if candidates.is_empty() {
        return Err(UnwatermarkError::NoSourceDocuments {
            dir: dir.to_path_buf(),
        });
    }
    select_source(&candidates, choice, policy)
}

/// Pick one candidate using a 1-based `choice`.
///
/// A single candidate is returned without consulting `choice`. With several,
/// a missing, non-numeric or out-of-range choice either falls back to the
/// first candidate or is rejected, depending on `policy`.
pub fn select_source(
    candidates: &[PathBuf],
    choice: Option<&str>,
    policy: SelectionPolicy,
) -> Result<Selection, UnwatermarkError> {
    let Some(first) = candidates.first() else {
        return Err(UnwatermarkError::NoSourceDocuments {
            dir: PathBuf::from("."),
        });
    };

    if candidates.len() == 1 {
        return Ok(Selection {
            path: first.clone(),
            number: 1,
            fell_back: false,
        });
    }

    let raw = choice.map(str::trim).unwrap_or("");
    match raw.parse::<usize>() {
        Ok(n) if (1..=candidates.len()).contains(&n) => Ok(Selection {
            path: candidates[n - 1].clone(),
            number: n,
            fell_back: false,
        }),
        _ => match policy {
            SelectionPolicy::FallbackToFirst => {
                warn!(
                    "Invalid selection '{}', using the first PDF: {}",
                    raw,
                    first.display()
                );
                Ok(Selection {
                    path: first.clone(),
                    number: 1,
                    fell_back: true,
                })
            }
            SelectionPolicy::Strict => Err(UnwatermarkError::InvalidSelection {
                input: raw.to_string(),
                candidates: candidates.len(),
            }),
        },
    }
}

/// Validate that `path` exists, is readable, and has a `%PDF-` header in its
/// first kilobyte.
pub fn resolve_local(path: &Path) -> Result<PathBuf, UnwatermarkError> {
    if !path.exists() {
        return Err(UnwatermarkError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(f) => {
            let mut head = Vec::new();
            f.take(HEADER_WINDOW)
                .read_to_end(&mut head)
                .map_err(|e| UnwatermarkError::io(path, e))?;
            if !head.windows(PDF_HEADER.len()).any(|w| w == PDF_HEADER) {
                let mut magic = [0u8; 4];
                let n = head.len().min(magic.len());
                magic[..n].copy_from_slice(&head[..n]);
                return Err(UnwatermarkError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(UnwatermarkError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(UnwatermarkError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// `<dir>/<stem>_no_watermark.pdf` next to the source.
pub fn default_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{stem}_{OUTPUT_MARKER}.pdf"))
}
