//! End-to-end tests against the real PDFium renderer.
//!
//! These need the PDFium shared library, so they are gated behind the
//! `E2E_ENABLED` environment variable and do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! PDFium is found the same way as for the CLI without `--pdfium-lib`: the
//! per-user cache, next to the test binary, the current directory, or the
//! system library path.

use flate2::read::ZlibDecoder;
use image::{Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_unwatermark::{
    check_capabilities, remove_watermark, ErrorKind, RemovalConfig, WATERMARK_BAND,
};
use std::io::Read;
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pdf_unwatermark=debug")
            .with_test_writer()
            .try_init();
    }};
}

/// Write a PDF whose pages are 1 x 1 inch, filled with watermark gray,
/// with a black half-inch square in the lower-left quadrant of each.
fn write_watermarked_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let gray = WATERMARK_BAND.base() as f32 / 255.0;
    let content = format!("{gray:.4} g\n0 0 72 72 re f\n0 g\n0 0 36 36 re f\n");

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.clone().into_bytes(),
            ));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(72), Object::Integer(72)],
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn first_page_image(pdf: &Path) -> RgbImage {
    let doc = Document::load(pdf).unwrap();
    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
    let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();

    let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap() as u32;
    let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap() as u32;
    let mut raw = Vec::new();
    ZlibDecoder::new(stream.content.as_slice())
        .read_to_end(&mut raw)
        .unwrap();
    RgbImage::from_raw(width, height, raw).unwrap()
}

fn source_in(dir: &Path, pages: usize) -> PathBuf {
    let src = dir.join("stamped.pdf");
    write_watermarked_pdf(&src, pages);
    src
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn e2e_capabilities_available() {
    e2e_skip_unless_enabled!();
    let config = RemovalConfig::builder().build().unwrap();
    let report = check_capabilities(&config).expect("PDFium must be installed for e2e tests");
    assert!(report.pdfium.is_some());
    assert!(report.png_codec);
}

#[test]
fn e2e_in_memory_removes_gray_fill() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let src = source_in(dir.path(), 2);
    let config = RemovalConfig::builder().build().unwrap();

    let report = remove_watermark(&src, None, &config).unwrap();
    assert_eq!(report.page_count(), 2);

    let page = first_page_image(&report.output);
    // 1 inch at 600 DPI.
    assert_eq!(page.dimensions(), (600, 600));
    // Top-right quadrant was watermark gray.
    assert_eq!(*page.get_pixel(450, 150), Rgb([255, 255, 255]));
    // Bottom-left quadrant is the black square (image rows run top-down).
    assert_eq!(*page.get_pixel(150, 450), Rgb([0, 0, 0]));
}

#[test]
fn e2e_on_disk_run_matches_layout() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let src = source_in(dir.path(), 3);
    let work = dir.path().join("output_images");
    let config = RemovalConfig::builder().work_dir(&work).build().unwrap();

    let report = remove_watermark(&src, None, &config).unwrap();

    assert_eq!(report.output, dir.path().join("stamped_no_watermark.pdf"));
    assert_eq!(report.assemble.page_order, vec![1, 2, 3]);
    let mut names: Vec<String> = std::fs::read_dir(&work)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["page_1_modify.png", "page_2_modify.png", "page_3_modify.png"]
    );
}

#[test]
fn e2e_not_a_pdf_is_rejected() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("fake.pdf");
    std::fs::write(&fake, b"this is not a pdf").unwrap();
    let config = RemovalConfig::builder().build().unwrap();

    let err = remove_watermark(&fake, None, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StageIo);
}
