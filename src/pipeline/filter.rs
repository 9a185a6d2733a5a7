//! Watermark removal: whiten every pixel inside the watermark color band.
//!
//! The band is a fixed cube around the nominal watermark gray
//! `(216, 216, 216)` with a tolerance of 30 per channel, so every channel
//! must lie in `[186, 246]`. White paper `(255, 255, 255)` and dark text sit
//! outside it. Content that happens to fall inside the band is whitened
//! too; there is no detection step.

use crate::error::UnwatermarkError;
use crate::output::{FilterReport, FilteredImage};
use crate::pipeline::naming::{self, RasterPage};
use crate::pipeline::Stage;
use crate::progress::PipelineProgressCallback;
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Inclusive per-channel band treated as watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkBand {
    base: u8,
    tolerance: u8,
}

/// The band this tool removes: `216 ± 30` on every channel.
pub const WATERMARK_BAND: WatermarkBand = WatermarkBand::new(216, 30);

impl WatermarkBand {
    const fn new(base: u8, tolerance: u8) -> Self {
        Self { base, tolerance }
    }

    pub const fn base(&self) -> u8 {
        self.base
    }

    pub const fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Lowest channel value inside the band.
    pub const fn low(&self) -> u8 {
        self.base.saturating_sub(self.tolerance)
    }

    /// Highest channel value inside the band.
    pub const fn high(&self) -> u8 {
        self.base.saturating_add(self.tolerance)
    }

    /// `true` when all three channels are within `[low, high]`.
    pub fn contains(&self, pixel: Rgb<u8>) -> bool {
        let range = self.low()..=self.high();
        pixel.0.iter().all(|c| range.contains(c))
    }
}

/// Rewrite every in-band pixel to white, leaving all others untouched.
///
/// Returns the number of whitened pixels.
pub fn whiten_watermark(image: &mut RgbImage) -> u64 {
    let mut whitened = 0;
    for pixel in image.pixels_mut() {
        if WATERMARK_BAND.contains(*pixel) {
            *pixel = WHITE;
            whitened += 1;
        }
    }
    whitened
}

/// Clean raw in-memory pages.
///
/// Raw pages are consumed; the returned pages carry cleaned tags with the
/// same page indices, in the same order.
pub fn filter_pages(
    pages: Vec<RasterPage>,
    progress: &dyn PipelineProgressCallback,
) -> Result<(Vec<RasterPage>, FilterReport), UnwatermarkError> {
    let raw: Vec<RasterPage> = pages.into_iter().filter(|p| !p.tag.is_cleaned).collect();
    if raw.is_empty() {
        return Err(UnwatermarkError::NoQualifyingInput {
            stage: Stage::Filter,
            dir: PathBuf::from("<memory>"),
            expected: "raw page images",
        });
    }
    progress.on_stage_total(Stage::Filter, raw.len());

    let clean_one = |mut page: RasterPage| {
        let whitened = whiten_watermark(&mut page.image);
        page.tag = page.tag.cleaned();
        debug!("Cleaned {}: {} pixels whitened", page.tag, whitened);
        progress.on_item_complete(Stage::Filter, &page.tag.to_string());
        (page, whitened)
    };

    #[cfg(feature = "parallel")]
    let cleaned: Vec<(RasterPage, u64)> = raw.into_par_iter().map(clean_one).collect();
    #[cfg(not(feature = "parallel"))]
    let cleaned: Vec<(RasterPage, u64)> = raw.into_iter().map(clean_one).collect();

    let report = FilterReport {
        images: cleaned
            .iter()
            .map(|(p, whitened)| FilteredImage {
                page_index: p.tag.page_index,
                whitened_pixels: *whitened,
                output: None,
            })
            .collect(),
    };
    info!("Image processing complete: {} pages cleaned", cleaned.len());
    Ok((cleaned.into_iter().map(|(p, _)| p).collect(), report))
}

/// List the raw `*.png` images in `work_dir`, sorted by path.
fn raw_images(work_dir: &Path) -> Result<Vec<PathBuf>, UnwatermarkError> {
    if !work_dir.is_dir() {
        return Err(UnwatermarkError::WorkDirMissing {
            path: work_dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(work_dir).map_err(|e| UnwatermarkError::io(work_dir, e))? {
        let path = entry.map_err(|e| UnwatermarkError::io(work_dir, e))?.path();
        if path.is_file() && naming::is_raw_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load one raw image, whiten it, and save it under its cleaned name.
fn clean_file(raw: &Path) -> Result<FilteredImage, UnwatermarkError> {
    let mut image = image::open(raw)
        .map_err(|source| UnwatermarkError::ImageDecode {
            path: raw.to_path_buf(),
            source,
        })?
        .to_rgb8();

    let whitened = whiten_watermark(&mut image);

    let out = raw.with_file_name(naming::cleaned_file_name(raw));
    image
        .save_with_format(&out, ImageFormat::Png)
        .map_err(|source| UnwatermarkError::ImageEncode {
            path: out.clone(),
            source,
        })?;

    let page_index = raw
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(naming::PageTag::from_file_name)
        .map_or(0, |t| t.page_index);

    Ok(FilteredImage {
        page_index,
        whitened_pixels: whitened,
        output: Some(out),
    })
}

/// Clean every raw image in `work_dir`, writing `<stem>_modify.png` next to
/// each one. Raw images are left in place.
///
/// The first image that cannot be read or written aborts the stage.
pub fn filter_dir(
    work_dir: &Path,
    progress: &dyn PipelineProgressCallback,
) -> Result<FilterReport, UnwatermarkError> {
    let files = raw_images(work_dir)?;
    if files.is_empty() {
        return Err(UnwatermarkError::NoQualifyingInput {
            stage: Stage::Filter,
            dir: work_dir.to_path_buf(),
            expected: "raw page images",
        });
    }
    progress.on_stage_total(Stage::Filter, files.len());

    let process = |raw: &PathBuf| -> Result<FilteredImage, UnwatermarkError> {
        let filtered = clean_file(raw)?;
        if let Some(ref out) = filtered.output {
            info!("Processed and saved: {}", out.display());
            progress.on_item_complete(Stage::Filter, &out.display().to_string());
        }
        Ok(filtered)
    };

    #[cfg(feature = "parallel")]
    let images = files.par_iter().map(process).collect::<Result<Vec<_>, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let images = files.iter().map(process).collect::<Result<Vec<_>, _>>()?;

    info!("Image processing complete: {} images processed", images.len());
    Ok(FilterReport { images })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::naming::PageTag;
    use crate::progress::NoopProgressCallback;

    #[test]
    fn band_is_186_to_246() {
        assert_eq!(WATERMARK_BAND.base(), 216);
        assert_eq!(WATERMARK_BAND.tolerance(), 30);
        assert_eq!(WATERMARK_BAND.low(), 186);
        assert_eq!(WATERMARK_BAND.high(), 246);
    }

    #[test]
    fn band_bounds_are_inclusive() {
        assert!(WATERMARK_BAND.contains(Rgb([186, 186, 186])));
        assert!(WATERMARK_BAND.contains(Rgb([246, 246, 246])));
        assert!(WATERMARK_BAND.contains(Rgb([216, 216, 216])));
        assert!(!WATERMARK_BAND.contains(Rgb([185, 200, 200])));
        assert!(!WATERMARK_BAND.contains(Rgb([247, 200, 200])));
        assert!(!WATERMARK_BAND.contains(Rgb([200, 185, 200])));
        assert!(!WATERMARK_BAND.contains(Rgb([200, 200, 247])));
        assert!(!WATERMARK_BAND.contains(Rgb([255, 255, 255])));
        assert!(!WATERMARK_BAND.contains(Rgb([0, 0, 0])));
    }

    #[test]
    fn only_in_band_pixels_change() {
        let samples = [
            [186, 186, 186],
            [246, 246, 246],
            [185, 216, 216],
            [247, 216, 216],
            [216, 216, 216],
            [10, 20, 30],
            [255, 255, 255],
            [200, 250, 200],
            [230, 190, 240],
        ];
        let mut img = RgbImage::new(samples.len() as u32, 2);
        for (x, s) in samples.iter().enumerate() {
            img.put_pixel(x as u32, 0, Rgb(*s));
            img.put_pixel(x as u32, 1, Rgb(*s));
        }
        let original = img.clone();

        let whitened = whiten_watermark(&mut img);

        let mut expected_whitened = 0;
        for (x, y, before) in original.enumerate_pixels() {
            let after = img.get_pixel(x, y);
            if WATERMARK_BAND.contains(*before) {
                assert_eq!(after, &WHITE, "pixel {before:?} should be white");
                expected_whitened += 1;
            } else {
                assert_eq!(after, before, "pixel {before:?} must be unchanged");
            }
        }
        assert_eq!(whitened, expected_whitened);
        assert_eq!(whitened, 8);
    }

    #[test]
    fn white_page_unchanged_gray_page_whitened() {
        let mut white = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        assert_eq!(whiten_watermark(&mut white), 0);
        assert!(white.pixels().all(|p| *p == WHITE));

        let mut gray = RgbImage::from_pixel(8, 8, Rgb([216, 216, 216]));
        assert_eq!(whiten_watermark(&mut gray), 64);
        assert!(gray.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn filter_pages_marks_cleaned_and_keeps_order() {
        let pages = vec![
            RasterPage::new(PageTag::raw(1), RgbImage::from_pixel(2, 2, Rgb([216; 3]))),
            RasterPage::new(PageTag::raw(2), RgbImage::from_pixel(2, 2, Rgb([0; 3]))),
        ];
        let (cleaned, report) = filter_pages(pages, &NoopProgressCallback).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].tag, PageTag::raw(1).cleaned());
        assert_eq!(cleaned[1].tag, PageTag::raw(2).cleaned());
        assert_eq!(report.whitened_pixels(), 4);
        assert_eq!(cleaned[1].image.get_pixel(0, 0), &Rgb([0; 3]));
    }

    #[test]
    fn filter_pages_requires_raw_input() {
        let pages = vec![RasterPage::new(
            PageTag::raw(1).cleaned(),
            RgbImage::new(1, 1),
        )];
        let err = filter_pages(pages, &NoopProgressCallback).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoQualifyingInput);
    }

    #[test]
    fn filter_dir_writes_cleaned_and_keeps_raw() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("page_1.png");
        RgbImage::from_pixel(3, 3, Rgb([216, 216, 216]))
            .save(&raw)
            .unwrap();
        // Already-cleaned images are not inputs.
        RgbImage::from_pixel(3, 3, Rgb([200, 200, 200]))
            .save(dir.path().join("page_9_modify.png"))
            .unwrap();

        let report = filter_dir(dir.path(), &NoopProgressCallback).unwrap();
        assert_eq!(report.processed(), 1);
        assert_eq!(report.images[0].page_index, 1);
        assert_eq!(report.whitened_pixels(), 9);

        let cleaned = image::open(dir.path().join("page_1_modify.png"))
            .unwrap()
            .to_rgb8();
        assert!(cleaned.pixels().all(|p| *p == WHITE));

        let untouched = image::open(&raw).unwrap().to_rgb8();
        assert!(untouched.pixels().all(|p| *p == Rgb([216, 216, 216])));
        assert!(!dir.path().join("page_9_modify_modify.png").exists());
    }

    #[test]
    fn filter_dir_without_raw_images_fails() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(1, 1)
            .save(dir.path().join("page_1_modify.png"))
            .unwrap();
        let err = filter_dir(dir.path(), &NoopProgressCallback).unwrap_err();
        assert!(matches!(
            err,
            UnwatermarkError::NoQualifyingInput {
                stage: Stage::Filter,
                ..
            }
        ));
    }

    #[test]
    fn corrupt_raw_image_aborts_stage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page_1.png"), b"definitely not a png").unwrap();
        let err = filter_dir(dir.path(), &NoopProgressCallback).unwrap_err();
        assert!(matches!(err, UnwatermarkError::ImageDecode { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::StageIo);
    }

    #[test]
    fn missing_work_dir_is_stage_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = filter_dir(&dir.path().join("gone"), &NoopProgressCallback).unwrap_err();
        assert!(matches!(err, UnwatermarkError::WorkDirMissing { .. }));
    }
}
