//! Error types for the pdf-unwatermark library.
//!
//! Every stage contains its own failures and hands the orchestrator either a
//! typed report or one [`UnwatermarkError`]. The orchestrator never retries:
//! the first error halts the pipeline and is returned to the caller as is.
//!
//! Item-level problems that a stage is allowed to survive (a file the pruner
//! could not delete, a cleaned image the reassembler could not load) are not
//! errors at all; they are logged and recorded in the stage report.
//!
//! [`UnwatermarkError::kind`] folds the variants into the small taxonomy that
//! callers actually branch on.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`UnwatermarkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A decode/encode capability (PDFium, PNG codec) is absent.
    MissingCapability,
    /// No source document could be found at the given location.
    SourceNotFound,
    /// The user's numeric choice was rejected under the strict policy.
    InvalidSelection,
    /// A stage could not read, decode, encode, write or delete a file.
    StageIo,
    /// A stage found nothing matching its expected input pattern.
    NoQualifyingInput,
    /// The configuration was rejected before any stage ran.
    InvalidConfig,
}

/// All fatal errors returned by the pdf-unwatermark library.
#[derive(Debug, Error)]
pub enum UnwatermarkError {
    // ── Capability errors ─────────────────────────────────────────────────
    /// A required raster or image capability is unavailable.
    #[error("Missing capability: {capability}\n{remedy}")]
    MissingCapability { capability: String, remedy: String },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The explicitly supplied source path does not exist.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Discovery found no PDF documents in the directory.
    #[error("No PDF files found in '{dir}'")]
    NoSourceDocuments { dir: PathBuf },

    /// The choice was out of range or not a number, and the policy is strict.
    #[error("Invalid selection '{input}': expected a number between 1 and {candidates}")]
    InvalidSelection { input: String, candidates: usize },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Rasterizer errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    // ── Image I/O errors ──────────────────────────────────────────────────
    /// A raster image could not be opened or decoded.
    #[error("Failed to load image '{path}': {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A raster image could not be encoded or written.
    #[error("Failed to save image '{path}': {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Generic file-system failure (create dir, list dir).
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage that works on the working directory found it absent.
    #[error("Working directory '{path}' does not exist")]
    WorkDirMissing { path: PathBuf },

    // ── Empty-input errors ────────────────────────────────────────────────
    /// A stage found zero inputs matching its expected pattern.
    #[error("{stage} stage found no {expected} in '{dir}'")]
    NoQualifyingInput {
        stage: Stage,
        dir: PathBuf,
        expected: &'static str,
    },

    /// Cleaned images were found but none of them could be loaded.
    #[error("None of the {attempted} cleaned images in '{dir}' could be loaded")]
    NoImagesLoaded { dir: PathBuf, attempted: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output PDF could not be serialised.
    #[error("Failed to encode output PDF '{path}': {detail}")]
    PdfEncodeFailed { path: PathBuf, detail: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or argument combination failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UnwatermarkError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use UnwatermarkError::*;
        match self {
            MissingCapability { .. } => ErrorKind::MissingCapability,
            SourceNotFound { .. } | NoSourceDocuments { .. } => ErrorKind::SourceNotFound,
            InvalidSelection { .. } => ErrorKind::InvalidSelection,
            NoQualifyingInput { .. } => ErrorKind::NoQualifyingInput,
            InvalidConfig(_) => ErrorKind::InvalidConfig,
            PermissionDenied { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | RasterisationFailed { .. }
            | ImageDecode { .. }
            | ImageEncode { .. }
            | Io { .. }
            | WorkDirMissing { .. }
            | NoImagesLoaded { .. }
            | PdfEncodeFailed { .. }
            | OutputWriteFailed { .. } => ErrorKind::StageIo,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UnwatermarkError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_qualifying_input_display() {
        let e = UnwatermarkError::NoQualifyingInput {
            stage: Stage::Reassemble,
            dir: PathBuf::from("output_images"),
            expected: "cleaned images",
        };
        let msg = e.to_string();
        assert!(msg.contains("reassemble"), "got: {msg}");
        assert!(msg.contains("output_images"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::NoQualifyingInput);
    }

    #[test]
    fn source_errors_share_a_kind() {
        let missing = UnwatermarkError::SourceNotFound {
            path: PathBuf::from("a.pdf"),
        };
        let empty = UnwatermarkError::NoSourceDocuments {
            dir: PathBuf::from("."),
        };
        assert_eq!(missing.kind(), ErrorKind::SourceNotFound);
        assert_eq!(empty.kind(), ErrorKind::SourceNotFound);
    }

    #[test]
    fn invalid_selection_display() {
        let e = UnwatermarkError::InvalidSelection {
            input: "9".into(),
            candidates: 3,
        };
        assert!(e.to_string().contains("between 1 and 3"));
        assert_eq!(e.kind(), ErrorKind::InvalidSelection);
    }

    #[test]
    fn io_failures_are_stage_io() {
        let e = UnwatermarkError::io(
            "page_1.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(e.kind(), ErrorKind::StageIo);
        assert!(e.to_string().contains("page_1.png"));

        let e = UnwatermarkError::RasterisationFailed {
            page: 3,
            detail: "bad stream".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert_eq!(e.kind(), ErrorKind::StageIo);
    }

    #[test]
    fn missing_capability_includes_remedy() {
        let e = UnwatermarkError::MissingCapability {
            capability: "PDFium".into(),
            remedy: "install libpdfium".into(),
        };
        assert!(e.to_string().contains("install libpdfium"));
        assert_eq!(e.kind(), ErrorKind::MissingCapability);
    }
}
