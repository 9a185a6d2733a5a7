//! Configuration types for watermark removal.
//!
//! All run-time behaviour is controlled through [`RemovalConfig`], built via
//! its [`RemovalConfigBuilder`]. The removal heuristic itself is not
//! configurable: rendering density is [`RENDER_DPI`] and the color band is
//! [`crate::pipeline::filter::WATERMARK_BAND`].

use crate::error::UnwatermarkError;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Density at which every page is rasterised.
pub const RENDER_DPI: u32 = 600;

/// PDF user space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Conventional working directory name used by the CLI.
pub const DEFAULT_WORK_DIR: &str = "output_images";

/// Marker appended to the source stem to name the output document.
pub const OUTPUT_MARKER: &str = "no_watermark";

/// Configuration for one watermark-removal run.
///
/// # Example
/// ```rust
/// use pdf_unwatermark::{RemovalConfig, SelectionPolicy};
///
/// let config = RemovalConfig::builder()
///     .work_dir("output_images")
///     .selection_policy(SelectionPolicy::Strict)
///     .build()
///     .unwrap();
/// assert!(config.work_dir.is_some());
/// ```
#[derive(Clone, Default)]
pub struct RemovalConfig {
    /// Working directory for the on-disk handoff. Default: `None`.
    ///
    /// `None` keeps every page in memory and hands it directly to the next
    /// stage. `Some(dir)` persists each stage's output under `dir` using the
    /// `page_<N>.png` / `page_<N>_modify.png` layout, so any stage can be
    /// inspected or re-run afterwards.
    pub work_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents. Default: `None`.
    pub password: Option<String>,

    /// Explicit location of the PDFium library (file or directory).
    ///
    /// `None` searches the locations listed in [`pdfium_probe`].
    pub pdfium_library: Option<PathBuf>,

    /// What to do with an unusable numeric source selection.
    pub selection_policy: SelectionPolicy,

    /// Pre-built rasteriser. Default: PDFium.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Optional progress callback for per-stage, per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RemovalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalConfig")
            .field("work_dir", &self.work_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field("selection_policy", &self.selection_policy)
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl RemovalConfig {
    /// Create a new builder with default values.
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RemovalConfig`].
#[derive(Debug)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Persist stage outputs under `dir`.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    /// Keep pages in memory between stages (the default).
    pub fn in_memory(mut self) -> Self {
        self.config.work_dir = None;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.config.selection_policy = policy;
        self
    }

    /// Replace PDFium with another rasteriser.
    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Validate and build the config.
    pub fn build(self) -> Result<RemovalConfig, UnwatermarkError> {
        if let Some(ref dir) = self.config.work_dir {
            if dir.as_os_str().is_empty() {
                return Err(UnwatermarkError::InvalidConfig(
                    "work_dir must not be empty".into(),
                ));
            }
            if dir.exists() && !dir.is_dir() {
                return Err(UnwatermarkError::InvalidConfig(format!(
                    "work_dir '{}' exists and is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Policy for a numeric source selection that is missing, not a number, or
/// out of range when several candidate PDFs exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Warn and use the first candidate.
    #[default]
    FallbackToFirst,
    /// Reject the selection with [`UnwatermarkError::InvalidSelection`].
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_in_memory_with_fallback() {
        let config = RemovalConfig::builder().build().unwrap();
        assert!(config.work_dir.is_none());
        assert_eq!(config.selection_policy, SelectionPolicy::FallbackToFirst);
        assert!(config.rasterizer.is_none());
    }

    #[test]
    fn work_dir_that_is_a_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = RemovalConfig::builder()
            .work_dir(file.path())
            .build()
            .unwrap_err();
        assert!(matches!(err, UnwatermarkError::InvalidConfig(_)));
    }

    #[test]
    fn missing_work_dir_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let config = RemovalConfig::builder()
            .work_dir(dir.path().join("not_yet_created"))
            .build()
            .unwrap();
        assert!(config.work_dir.is_some());
    }

    #[test]
    fn in_memory_clears_work_dir() {
        let config = RemovalConfig::builder()
            .work_dir("x")
            .in_memory()
            .build()
            .unwrap();
        assert!(config.work_dir.is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let config = RemovalConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
