//! Pipeline entry points.
//!
//! [`remove_watermark`] runs all four stages against one source document,
//! [`resume_from`] re-runs the on-disk pipeline from any stage against an
//! existing working directory, and [`check_capabilities`] verifies the
//! native collaborators before any work starts.
//!
//! The first stage that fails halts the pipeline: later stages never run,
//! the progress callback is told which stage failed, and the stage's error
//! is returned unchanged.

use crate::config::{RemovalConfig, RENDER_DPI};
use crate::error::UnwatermarkError;
use crate::output::{CapabilityReport, PipelineReport, StageTiming};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::{assemble, filter, input, prune, render, Stage};
use crate::progress::{NoopProgressCallback, PipelineProgressCallback};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs stages one after another, recording timings and progress events.
struct StageRunner<'a> {
    progress: &'a dyn PipelineProgressCallback,
    timings: Vec<StageTiming>,
}

impl<'a> StageRunner<'a> {
    fn new(progress: &'a dyn PipelineProgressCallback) -> Self {
        Self {
            progress,
            timings: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    fn run<T>(
        &mut self,
        stage: Stage,
        body: impl FnOnce() -> Result<T, UnwatermarkError>,
        processed: impl FnOnce(&T) -> usize,
    ) -> Result<T, UnwatermarkError> {
        info!("Stage {}/{}: {}", stage.number(), Stage::ALL.len(), stage);
        self.progress.on_stage_start(stage, None);
        let start = Instant::now();

        match body() {
            Ok(out) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.timings.push(StageTiming { stage, duration_ms });
                self.progress.on_stage_complete(stage, processed(&out));
                Ok(out)
            }
            Err(e) => {
                error!("Stage {} failed, pipeline halted: {}", stage, e);
                self.progress.on_stage_error(stage, &e.to_string());
                Err(e)
            }
        }
    }
}

fn resolve_rasterizer(config: &RemovalConfig) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(config.pdfium_library.clone())),
    }
}

fn resolve_progress<'a>(
    config: &'a RemovalConfig,
    noop: &'a NoopProgressCallback,
) -> &'a dyn PipelineProgressCallback {
    match config.progress_callback {
        Some(ref cb) => cb.as_ref(),
        None => noop,
    }
}

/// Remove the watermark from `source`, writing the cleaned PDF to `output`
/// (default: `<stem>_no_watermark.pdf` next to the source).
///
/// The source and PDFium are validated before any stage runs, so a missing
/// or non-PDF source, or an absent PDFium library, never touches the working
/// directory. With [`RemovalConfig::work_dir`] set, every stage persists its
/// output there; otherwise pages are handed between stages in memory.
///
/// # Errors
/// The first failing stage's error. Per-item problems that a stage tolerates
/// (an undeletable raw image, an unreadable cleaned image) are recorded in
/// the returned report instead.
pub fn remove_watermark(
    source: &Path,
    output: Option<&Path>,
    config: &RemovalConfig,
) -> Result<PipelineReport, UnwatermarkError> {
    let total_start = Instant::now();
    let source = input::resolve_local(source)?;
    ensure_pdfium(config)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input::default_output_path(&source));
    info!(
        "Removing watermark: {} → {}",
        source.display(),
        output.display()
    );

    let noop = NoopProgressCallback;
    let progress = resolve_progress(config, &noop);
    let rasterizer = resolve_rasterizer(config);
    let password = config.password.as_deref();

    let mut report = match config.work_dir {
        Some(ref work_dir) => run_on_disk(
            Stage::Rasterize,
            Some(source.as_path()),
            work_dir,
            &output,
            rasterizer.as_ref(),
            password,
            progress,
        )?,
        None => {
            let mut runner = StageRunner::new(progress);
            let (pages, rasterize) = runner.run(
                Stage::Rasterize,
                || {
                    render::render_pages(
                        rasterizer.as_ref(),
                        &source,
                        RENDER_DPI,
                        password,
                        progress,
                    )
                },
                |(_, r)| r.page_count,
            )?;
            let (cleaned, filter) = runner.run(
                Stage::Filter,
                || filter::filter_pages(pages, progress),
                |(_, r)| r.processed(),
            )?;
            let assemble = runner.run(
                Stage::Reassemble,
                || assemble::assemble_pages(cleaned, &output, RENDER_DPI, progress),
                |r| r.page_count(),
            )?;

            PipelineReport {
                source: None,
                output: assemble.output.clone(),
                work_dir: None,
                rasterize: Some(rasterize),
                filter: Some(filter),
                prune: None,
                assemble,
                timings: runner.timings,
                total_duration_ms: 0,
            }
        }
    };

    report.source = Some(source);
    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Watermark removed: {} pages → {} ({}ms)",
        report.page_count(),
        report.output.display(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Re-run the on-disk pipeline starting at `stage`.
///
/// Requires [`RemovalConfig::work_dir`]. `source` is needed when starting at
/// [`Stage::Rasterize`]; otherwise it only supplies the default output name,
/// and `output` must be given when it is absent.
pub fn resume_from(
    stage: Stage,
    source: Option<&Path>,
    output: Option<&Path>,
    config: &RemovalConfig,
) -> Result<PipelineReport, UnwatermarkError> {
    let total_start = Instant::now();
    let work_dir = config.work_dir.as_deref().ok_or_else(|| {
        UnwatermarkError::InvalidConfig("resuming a stage requires a working directory".into())
    })?;

    let source = match source {
        Some(p) => Some(input::resolve_local(p)?),
        None if stage == Stage::Rasterize => {
            return Err(UnwatermarkError::InvalidConfig(
                "the rasterize stage requires a source PDF".into(),
            ));
        }
        None => None,
    };
    if stage == Stage::Rasterize {
        ensure_pdfium(config)?;
    }

    let output = match (output, source.as_deref()) {
        (Some(o), _) => o.to_path_buf(),
        (None, Some(s)) => input::default_output_path(s),
        (None, None) => {
            return Err(UnwatermarkError::InvalidConfig(
                "an output path is required when resuming without a source".into(),
            ));
        }
    };
    info!(
        "Resuming from stage {} in {}",
        stage,
        work_dir.display()
    );

    let noop = NoopProgressCallback;
    let progress = resolve_progress(config, &noop);
    let rasterizer = resolve_rasterizer(config);

    let mut report = run_on_disk(
        stage,
        source.as_deref(),
        work_dir,
        &output,
        rasterizer.as_ref(),
        config.password.as_deref(),
        progress,
    )?;
    report.source = source;
    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(report)
}

fn run_on_disk(
    from: Stage,
    source: Option<&Path>,
    work_dir: &Path,
    output: &Path,
    rasterizer: &dyn Rasterizer,
    password: Option<&str>,
    progress: &dyn PipelineProgressCallback,
) -> Result<PipelineReport, UnwatermarkError> {
    let mut runner = StageRunner::new(progress);

    let rasterize = if from <= Stage::Rasterize {
        let source = source.ok_or_else(|| {
            UnwatermarkError::InvalidConfig("the rasterize stage requires a source PDF".into())
        })?;
        Some(runner.run(
            Stage::Rasterize,
            || render::rasterize_to_dir(rasterizer, source, work_dir, RENDER_DPI, password, progress),
            |r| r.page_count,
        )?)
    } else {
        None
    };

    let filter = if from <= Stage::Filter {
        Some(runner.run(
            Stage::Filter,
            || filter::filter_dir(work_dir, progress),
            |r| r.processed(),
        )?)
    } else {
        None
    };

    let prune = if from <= Stage::Prune {
        Some(runner.run(
            Stage::Prune,
            || prune::prune_dir(work_dir, progress),
            |r| r.deleted.len(),
        )?)
    } else {
        None
    };

    let assemble = runner.run(
        Stage::Reassemble,
        || assemble::reassemble_dir(work_dir, output, RENDER_DPI, progress),
        |r| r.page_count(),
    )?;

    Ok(PipelineReport {
        source: None,
        output: assemble.output.clone(),
        work_dir: Some(work_dir.to_path_buf()),
        rasterize,
        filter,
        prune,
        assemble,
        timings: runner.timings,
        total_duration_ms: 0,
    })
}

fn missing_pdfium(e: pdfium_probe::ProbeError) -> UnwatermarkError {
    UnwatermarkError::MissingCapability {
        capability: "PDFium rendering library".into(),
        remedy: e.to_string(),
    }
}

/// Locate PDFium unless a custom rasteriser replaces it.
fn ensure_pdfium(config: &RemovalConfig) -> Result<Option<String>, UnwatermarkError> {
    if config.rasterizer.is_some() {
        return Ok(None);
    }
    let location =
        pdfium_probe::locate_pdfium(config.pdfium_library.as_deref()).map_err(missing_pdfium)?;
    debug!("PDFium located: {}", location);
    Ok(Some(location.to_string()))
}

/// Verify that PDFium can be bound and the PNG codec works.
///
/// PDFium is not probed when `config` carries a custom rasteriser.
pub fn check_capabilities(config: &RemovalConfig) -> Result<CapabilityReport, UnwatermarkError> {
    let pdfium = ensure_pdfium(config)?;
    if let Some(ref location) = pdfium {
        pdfium_probe::bind_pdfium(config.pdfium_library.as_deref()).map_err(missing_pdfium)?;
        info!("PDFium available: {}", location);
    }

    png_round_trip().map_err(|detail| UnwatermarkError::MissingCapability {
        capability: "PNG image codec".into(),
        remedy: format!("{detail}; rebuild with the image crate's `png` feature enabled"),
    })?;

    Ok(CapabilityReport {
        pdfium,
        png_codec: true,
    })
}

fn png_round_trip() -> Result<(), String> {
    let probe = RgbImage::from_pixel(1, 1, Rgb([216, 216, 216]));
    let mut buf = Cursor::new(Vec::new());
    probe
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    let decoded = image::load_from_memory_with_format(buf.get_ref(), ImageFormat::Png)
        .map_err(|e| format!("PNG decode failed: {e}"))?
        .to_rgb8();
    if decoded != probe {
        return Err("PNG round trip altered pixel data".into());
    }
    Ok(())
}
