//! Reassembly: compose cleaned page images, in page order, into one PDF.
//!
//! Each page becomes a single full-page `DeviceRGB` image XObject,
//! deflate-compressed so the output stays lossless. Page size is the
//! image's physical size at the render density, which reproduces the
//! source document's page dimensions.

use crate::config::POINTS_PER_INCH;
use crate::error::UnwatermarkError;
use crate::output::{AssembleReport, SkippedImage};
use crate::pipeline::naming::{self, RasterPage};
use crate::pipeline::Stage;
use crate::progress::PipelineProgressCallback;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Builds an image-only PDF one page at a time.
///
/// Each page's pixels are compressed as soon as it is added, so only the
/// compressed form is retained until [`PdfAssembler::finish`].
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    output: PathBuf,
    dpi: u32,
}

impl PdfAssembler {
    pub fn new(output: impl Into<PathBuf>, dpi: u32) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            output: output.into(),
            dpi,
        }
    }

    /// Pages added so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn encode_failed(&self, detail: impl ToString) -> UnwatermarkError {
        UnwatermarkError::PdfEncodeFailed {
            path: self.output.clone(),
            detail: detail.to_string(),
        }
    }

    /// Append `image` as the next page.
    pub fn add_page(&mut self, image: &RgbImage) -> Result<(), UnwatermarkError> {
        let (width, height) = image.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(image.as_raw())
            .map_err(|e| self.encode_failed(e))?;
        let data = encoder.finish().map_err(|e| self.encode_failed(e))?;

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            },
            data,
        ));

        let scale = POINTS_PER_INCH / self.dpi as f32;
        let page_w = width as f32 * scale;
        let page_h = height as f32 * scale;

        // Stretch the unit-square image over the whole page.
        let content = format!("q\n{page_w:.4} 0 0 {page_h:.4} 0 0 cm\n/Im0 Do\nQ\n");
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());

        debug!(
            "Added page {} ({}x{} px, {:.1}x{:.1} pt)",
            self.kids.len(),
            width,
            height,
            page_w,
            page_h
        );
        Ok(())
    }

    /// Write the document to the output path.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// a failed write never leaves a truncated PDF behind.
    pub fn finish(mut self) -> Result<PathBuf, UnwatermarkError> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => std::mem::take(&mut self.kids),
            "Count" => count,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| self.encode_failed(e))?;

        let path = self.output;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| UnwatermarkError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        }

        let tmp_path = path.with_extension("pdf.tmp");
        std::fs::write(&tmp_path, &buf).map_err(|e| UnwatermarkError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| UnwatermarkError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }
}

/// Assemble cleaned in-memory pages into `output`, ordered by page index.
pub fn assemble_pages(
    mut pages: Vec<RasterPage>,
    output: &Path,
    dpi: u32,
    progress: &dyn PipelineProgressCallback,
) -> Result<AssembleReport, UnwatermarkError> {
    pages.retain(|p| p.tag.is_cleaned);
    if pages.is_empty() {
        return Err(UnwatermarkError::NoQualifyingInput {
            stage: Stage::Reassemble,
            dir: PathBuf::from("<memory>"),
            expected: "cleaned images",
        });
    }
    pages.sort_by_key(|p| p.tag.page_index);
    progress.on_stage_total(Stage::Reassemble, pages.len());

    let mut assembler = PdfAssembler::new(output, dpi);
    let mut page_order = Vec::with_capacity(pages.len());
    for page in pages {
        assembler.add_page(&page.image)?;
        progress.on_item_complete(Stage::Reassemble, &page.tag.to_string());
        page_order.push(u64::from(page.tag.page_index));
    }

    let output = assembler.finish()?;
    info!(
        "PDF created: {} ({} pages)",
        output.display(),
        page_order.len()
    );
    Ok(AssembleReport {
        output,
        page_order,
        skipped: Vec::new(),
    })
}

/// List `*_modify.png` files in `work_dir`, ordered by their encoded page
/// index. Ties (including unparseable names, which sort as 0) keep
/// lexicographic order.
fn cleaned_images(work_dir: &Path) -> Result<Vec<PathBuf>, UnwatermarkError> {
    if !work_dir.is_dir() {
        return Err(UnwatermarkError::WorkDirMissing {
            path: work_dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(work_dir).map_err(|e| UnwatermarkError::io(work_dir, e))? {
        let path = entry.map_err(|e| UnwatermarkError::io(work_dir, e))?.path();
        if path.is_file() && naming::is_cleaned_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    files.sort_by_key(|p| naming::cleaned_sort_key(p));
    Ok(files)
}

/// Assemble every cleaned image in `work_dir` into `output`.
///
/// An image that fails to load is skipped with a warning; the stage fails
/// only when there is nothing cleaned to start with, nothing loads, or the
/// PDF cannot be written.
pub fn reassemble_dir(
    work_dir: &Path,
    output: &Path,
    dpi: u32,
    progress: &dyn PipelineProgressCallback,
) -> Result<AssembleReport, UnwatermarkError> {
    let files = cleaned_images(work_dir)?;
    if files.is_empty() {
        return Err(UnwatermarkError::NoQualifyingInput {
            stage: Stage::Reassemble,
            dir: work_dir.to_path_buf(),
            expected: "cleaned images (*_modify.png)",
        });
    }
    info!("Found {} cleaned images, merging into PDF", files.len());
    progress.on_stage_total(Stage::Reassemble, files.len());

    let mut assembler = PdfAssembler::new(output, dpi);
    let mut page_order = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in &files {
        match image::open(path) {
            Ok(img) => {
                assembler.add_page(&img.to_rgb8())?;
                info!("Loaded: {}", path.display());
                progress.on_item_complete(Stage::Reassemble, &path.display().to_string());
                page_order.push(naming::cleaned_sort_key(path));
            }
            Err(e) => {
                warn!("Failed to load image {}: {}", path.display(), e);
                progress.on_item_error(Stage::Reassemble, &path.display().to_string(), &e.to_string());
                skipped.push(SkippedImage {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if assembler.page_count() == 0 {
        return Err(UnwatermarkError::NoImagesLoaded {
            dir: work_dir.to_path_buf(),
            attempted: files.len(),
        });
    }

    let output = assembler.finish()?;
    info!(
        "PDF created: {} ({} images merged)",
        output.display(),
        page_order.len()
    );
    Ok(AssembleReport {
        output,
        page_order,
        skipped,
    })
}
