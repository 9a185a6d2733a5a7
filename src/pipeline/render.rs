//! PDF rasterisation: render every page to an RGB image via pdfium.
//!
//! The [`Rasterizer`] trait is the seam between the pipeline and the
//! rendering backend. Pages are pushed to a sink as soon as each one is
//! rendered, so the on-disk stage writes `page_<N>.png` files one at a time
//! instead of holding every 600 DPI page in memory at once.

use crate::config::POINTS_PER_INCH;
use crate::error::UnwatermarkError;
use crate::output::RasterizeReport;
use crate::pipeline::input;
use crate::pipeline::naming::{PageTag, RasterPage};
use crate::pipeline::Stage;
use crate::progress::PipelineProgressCallback;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receives each rendered page together with the document's page count.
pub type PageSink<'a> = dyn FnMut(RasterPage, usize) -> Result<(), UnwatermarkError> + 'a;

/// Renders the pages of a PDF into raster images.
///
/// Implementations must call `sink` exactly once per page, in ascending page
/// order, with raw tags `1..=page_count`, and return the page count. An error
/// returned by `sink` must be propagated unchanged.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf_path: &Path,
        dpi: u32,
        password: Option<&str>,
        sink: &mut PageSink<'_>,
    ) -> Result<usize, UnwatermarkError>;
}

/// The default rasteriser, backed by the PDFium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Use `library` (file or directory) instead of searching for PDFium.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        dpi: u32,
        password: Option<&str>,
        sink: &mut PageSink<'_>,
    ) -> Result<usize, UnwatermarkError> {
        let pdfium = pdfium_probe::bind_pdfium(self.library.as_deref()).map_err(|e| {
            UnwatermarkError::MissingCapability {
                capability: "PDFium rendering library".into(),
                remedy: e.to_string(),
            }
        })?;

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    UnwatermarkError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    UnwatermarkError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                UnwatermarkError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

        for (idx, page) in pages.iter().enumerate() {
            let page_index = idx as u32 + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                UnwatermarkError::RasterisationFailed {
                    page: page_index,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image().to_rgb8();
            debug!(
                "Rendered page {} → {}x{} px",
                page_index,
                image.width(),
                image.height()
            );

            sink(RasterPage::new(PageTag::raw(page_index), image), total_pages)?;
        }

        Ok(total_pages)
    }
}

/// Rasterise `pdf_path` into memory.
///
/// Returns raw pages in ascending page order.
pub fn render_pages(
    rasterizer: &dyn Rasterizer,
    pdf_path: &Path,
    dpi: u32,
    password: Option<&str>,
    progress: &dyn PipelineProgressCallback,
) -> Result<(Vec<RasterPage>, RasterizeReport), UnwatermarkError> {
    input::resolve_local(pdf_path)?;

    let mut pages = Vec::new();
    let page_count = rasterizer.rasterize(pdf_path, dpi, password, &mut |page, total| {
        if pages.is_empty() {
            pages.reserve_exact(total);
            progress.on_stage_total(Stage::Rasterize, total);
        }
        progress.on_item_complete(Stage::Rasterize, &page.tag.to_string());
        pages.push(page);
        Ok(())
    })?;

    info!("Rendered {} pages from {}", page_count, pdf_path.display());
    Ok((
        pages,
        RasterizeReport {
            page_count,
            written: Vec::new(),
        },
    ))
}

/// Rasterise `pdf_path` into `work_dir` as `page_<N>.png` files.
///
/// The directory is created if absent; nothing already in it is removed.
/// Every file is written and closed before this returns.
pub fn rasterize_to_dir(
    rasterizer: &dyn Rasterizer,
    pdf_path: &Path,
    work_dir: &Path,
    dpi: u32,
    password: Option<&str>,
    progress: &dyn PipelineProgressCallback,
) -> Result<RasterizeReport, UnwatermarkError> {
    input::resolve_local(pdf_path)?;

    if !work_dir.exists() {
        std::fs::create_dir_all(work_dir).map_err(|e| UnwatermarkError::io(work_dir, e))?;
        info!("Created working directory: {}", work_dir.display());
    }

    let mut written = Vec::new();
    let page_count = rasterizer.rasterize(pdf_path, dpi, password, &mut |page, total| {
        if written.is_empty() {
            progress.on_stage_total(Stage::Rasterize, total);
        }
        let path = work_dir.join(page.tag.file_name());
        page.image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| UnwatermarkError::ImageEncode {
                path: path.clone(),
                source,
            })?;
        info!(
            "Page {}/{} saved as {}",
            page.tag.page_index,
            total,
            path.display()
        );
        progress.on_item_complete(Stage::Rasterize, &path.display().to_string());
        written.push(path);
        Ok(())
    })?;

    info!("PDF rasterised: {} pages", page_count);
    Ok(RasterizeReport {
        page_count,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgressCallback;
    use image::{Rgb, RgbImage};

    /// Emits `colors.len()` pages of 4x3 pixels, one solid color each.
    struct SolidPages {
        colors: Vec<[u8; 3]>,
    }

    impl Rasterizer for SolidPages {
        fn rasterize(
            &self,
            _pdf_path: &Path,
            _dpi: u32,
            _password: Option<&str>,
            sink: &mut PageSink<'_>,
        ) -> Result<usize, UnwatermarkError> {
            let total = self.colors.len();
            for (i, c) in self.colors.iter().enumerate() {
                let image = RgbImage::from_pixel(4, 3, Rgb(*c));
                sink(RasterPage::new(PageTag::raw(i as u32 + 1), image), total)?;
            }
            Ok(total)
        }
    }

    fn fake_pdf(dir: &Path) -> PathBuf {
        let p = dir.join("src.pdf");
        std::fs::write(&p, b"%PDF-1.4\n").unwrap();
        p
    }

    #[test]
    fn one_raw_image_per_page_with_indices() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(dir.path());
        let work = dir.path().join("work");
        let r = SolidPages {
            colors: vec![[255; 3]; 12],
        };

        let report =
            rasterize_to_dir(&r, &pdf, &work, 600, None, &NoopProgressCallback).unwrap();
        assert_eq!(report.page_count, 12);
        assert_eq!(report.written.len(), 12);

        let mut indices: Vec<u32> = std::fs::read_dir(&work)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter_map(|n| PageTag::from_file_name(&n))
            .inspect(|t| assert!(!t.is_cleaned))
            .map(|t| t.page_index)
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn existing_work_dir_content_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(dir.path());
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        std::fs::write(work.join("keep.txt"), b"x").unwrap();

        let r = SolidPages {
            colors: vec![[0; 3]],
        };
        rasterize_to_dir(&r, &pdf, &work, 600, None, &NoopProgressCallback).unwrap();
        assert!(work.join("keep.txt").exists());
        assert!(work.join("page_1.png").exists());
    }

    #[test]
    fn missing_source_fails_without_touching_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let r = SolidPages { colors: vec![] };
        let err = rasterize_to_dir(
            &r,
            &dir.path().join("absent.pdf"),
            &work,
            600,
            None,
            &NoopProgressCallback,
        )
        .unwrap_err();
        assert!(matches!(err, UnwatermarkError::SourceNotFound { .. }));
        assert!(!work.exists());
    }

    #[test]
    fn in_memory_pages_are_ordered_and_raw() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(dir.path());
        let r = SolidPages {
            colors: vec![[1; 3], [2; 3], [3; 3]],
        };
        let (pages, report) = render_pages(&r, &pdf, 600, None, &NoopProgressCallback).unwrap();
        assert_eq!(report.page_count, 3);
        assert!(report.written.is_empty());
        for (i, p) in pages.iter().enumerate() {
            assert_eq!(p.tag, PageTag::raw(i as u32 + 1));
            assert_eq!(p.image.get_pixel(0, 0), &Rgb([i as u8 + 1; 3]));
        }
    }
}
