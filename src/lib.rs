//! # pdf-unwatermark
//!
//! Remove light-gray watermarks from PDF documents.
//!
//! ## How it works
//!
//! Watermarks are commonly stamped as a flat, light gray overlay. Every page
//! is rasterised at 600 DPI, every pixel whose three channels all fall in
//! the gray band `[186, 246]` is rewritten to pure white, and the cleaned
//! pages are reassembled into a new image-only PDF with the source's page
//! dimensions. Text is not preserved as text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Rasterize   render pages via pdfium            page_<N>.png
//!  ├─ 2. Filter      whiten watermark-gray pixels       page_<N>_modify.png
//!  ├─ 3. Prune       delete raw renders
//!  └─ 4. Reassemble  cleaned pages, in page order       <stem>_no_watermark.pdf
//! ```
//!
//! Pages travel between stages in memory by default. Set a working
//! directory to persist each stage's output with the file layout above, which
//! also lets any stage be re-run with [`resume_from`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_unwatermark::{remove_watermark, RemovalConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemovalConfig::builder().work_dir("output_images").build()?;
//!     let report = remove_watermark(Path::new("report.pdf"), None, &config)?;
//!     eprintln!("{} pages → {}", report.page_count(), report.output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cli`      | on      | Enables the `pdf-unwatermark` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `parallel` | off     | Runs the filter stage on a rayon pool |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-unwatermark = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native dependency
//!
//! Rendering needs the PDFium shared library at run time. See
//! [`pdfium_probe`] for where it is searched, and [`check_capabilities`] to
//! verify the environment before a run.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod remove;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    RemovalConfig, RemovalConfigBuilder, SelectionPolicy, DEFAULT_WORK_DIR, RENDER_DPI,
};
pub use error::{ErrorKind, UnwatermarkError};
pub use output::{
    AssembleReport, CapabilityReport, FilterReport, PipelineReport, PruneReport,
    RasterizeReport,
};
pub use pipeline::filter::{WatermarkBand, WATERMARK_BAND};
pub use pipeline::input::{default_output_path, discover_sources, find_source, select_source};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use pipeline::{PageTag, RasterPage, Stage};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use remove::{check_capabilities, remove_watermark, resume_from};
