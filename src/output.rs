//! Stage reports and the final pipeline summary.
//!
//! Every stage returns one of these on success. They double as the audit
//! trail of a run: the CLI prints the [`PipelineReport`] as JSON with
//! `--json`.

use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of the rasterisation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RasterizeReport {
    /// Pages in the source document; one raster per page.
    pub page_count: usize,
    /// Files written, in page order (empty for the in-memory handoff).
    pub written: Vec<PathBuf>,
}

/// One image processed by the filter stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredImage {
    /// 1-based page index, or 0 when a file name carries none.
    pub page_index: u32,
    /// Pixels rewritten to white.
    pub whitened_pixels: u64,
    /// Cleaned file (absent for the in-memory handoff).
    pub output: Option<PathBuf>,
}

/// Result of the filter stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterReport {
    pub images: Vec<FilteredImage>,
}

impl FilterReport {
    pub fn processed(&self) -> usize {
        self.images.len()
    }

    pub fn whitened_pixels(&self) -> u64 {
        self.images.iter().map(|i| i.whitened_pixels).sum()
    }
}

/// A file the pruner could not remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of the prune stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PruneFailure>,
}

/// A cleaned image the reassembler had to skip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of the reassembly stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleReport {
    pub output: PathBuf,
    /// Page indices in output order.
    pub page_order: Vec<u64>,
    pub skipped: Vec<SkippedImage>,
}

impl AssembleReport {
    pub fn page_count(&self) -> usize {
        self.page_order.len()
    }
}

/// Wall-clock timing of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Summary of a whole run.
///
/// Stages that did not run in this invocation (for example the rasterizer
/// when resuming from a later stage) leave their report as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub source: Option<PathBuf>,
    pub output: PathBuf,
    /// Working directory of the on-disk handoff; `None` when in memory.
    pub work_dir: Option<PathBuf>,
    pub rasterize: Option<RasterizeReport>,
    pub filter: Option<FilterReport>,
    pub prune: Option<PruneReport>,
    pub assemble: AssembleReport,
    pub timings: Vec<StageTiming>,
    pub total_duration_ms: u64,
}

impl PipelineReport {
    /// Pages in the output document.
    pub fn page_count(&self) -> usize {
        self.assemble.page_count()
    }
}

/// What [`crate::check_capabilities`] found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    /// Where PDFium was bound from; `None` when a custom rasteriser is
    /// configured and PDFium is not needed.
    pub pdfium: Option<String>,
    /// The PNG codec encoded and decoded a probe image.
    pub png_codec: bool,
}
