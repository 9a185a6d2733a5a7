//! Page identity and the working-directory file-name contract.
//!
//! In memory every raster carries an explicit [`PageTag`]; nothing is parsed.
//! On disk the tag is encoded in the file name:
//!
//! | Variant | File name |
//! |---------|-----------|
//! | raw     | `page_<N>.png` |
//! | cleaned | `page_<N>_modify.png` |
//!
//! `N` is the 1-based page index without leading zeros, so two pages can
//! never collide. Directory listings sort `page_10` before `page_2`; order is
//! always recovered from the parsed index, never from listing order.

use image::RgbImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// Extension of every raster image in the working directory.
pub const IMAGE_EXTENSION: &str = "png";

/// Suffix that marks a cleaned image (`page_3_modify.png`).
pub const CLEANED_SUFFIX: &str = "_modify.png";

static RAW_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page_(\d+)\.png$").unwrap());
static CLEANED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"page_(\d+)_modify\.png").unwrap());

/// Identity of one rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTag {
    /// 1-based page index in the source document.
    pub page_index: u32,
    /// `true` once the watermark filter has run over the page.
    pub is_cleaned: bool,
}

impl PageTag {
    pub fn raw(page_index: u32) -> Self {
        Self {
            page_index,
            is_cleaned: false,
        }
    }

    /// The same page, marked as cleaned.
    pub fn cleaned(self) -> Self {
        Self {
            is_cleaned: true,
            ..self
        }
    }

    /// File name of this page in the working directory.
    pub fn file_name(&self) -> String {
        if self.is_cleaned {
            format!("page_{}{}", self.page_index, CLEANED_SUFFIX)
        } else {
            format!("page_{}.{}", self.page_index, IMAGE_EXTENSION)
        }
    }

    /// Parse a file name produced by [`PageTag::file_name`].
    pub fn from_file_name(name: &str) -> Option<Self> {
        if let Some(caps) = RAW_NAME.captures(name) {
            return caps[1].parse().ok().map(PageTag::raw);
        }
        CLEANED_NAME
            .captures(name)
            .filter(|_| name.ends_with(CLEANED_SUFFIX))
            .and_then(|caps| caps[1].parse().ok())
            .map(|idx| PageTag::raw(idx).cleaned())
    }
}

impl fmt::Display for PageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.page_index)?;
        if self.is_cleaned {
            f.write_str(" (cleaned)")?;
        }
        Ok(())
    }
}

/// A rendered page travelling between stages.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub tag: PageTag,
    pub image: RgbImage,
}

impl RasterPage {
    pub fn new(tag: PageTag, image: RgbImage) -> Self {
        Self { tag, image }
    }
}

// ── File classification ──────────────────────────────────────────────────

fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Any `*.png` in the working directory.
pub fn is_raster_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == IMAGE_EXTENSION)
}

/// A filter-stage output (`*_modify.png`).
pub fn is_cleaned_image(path: &Path) -> bool {
    file_name_str(path).is_some_and(|n| n.ends_with(CLEANED_SUFFIX))
}

/// A raster image that the filter stage has not produced.
pub fn is_raw_image(path: &Path) -> bool {
    is_raster_image(path) && !is_cleaned_image(path)
}

/// Name of the cleaned image derived from a raw image path.
///
/// `page_7.png` becomes `page_7_modify.png`; arbitrary names follow the same
/// rule (`scan.png` → `scan_modify.png`).
pub fn cleaned_file_name(raw: &Path) -> String {
    let stem = raw
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{CLEANED_SUFFIX}")
}

/// Page index encoded in a cleaned image's name; unparseable names sort as 0.
pub fn cleaned_sort_key(path: &Path) -> u64 {
    file_name_str(path)
        .and_then(|n| CLEANED_NAME.captures(n))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn file_names_follow_layout() {
        assert_eq!(PageTag::raw(1).file_name(), "page_1.png");
        assert_eq!(PageTag::raw(12).cleaned().file_name(), "page_12_modify.png");
    }

    #[test]
    fn names_parse_back_to_tags() {
        for idx in [1, 2, 9, 10, 11, 120] {
            let raw = PageTag::raw(idx);
            assert_eq!(PageTag::from_file_name(&raw.file_name()), Some(raw));
            let cleaned = raw.cleaned();
            assert_eq!(PageTag::from_file_name(&cleaned.file_name()), Some(cleaned));
        }
        assert_eq!(PageTag::from_file_name("cover.png"), None);
        assert_eq!(PageTag::from_file_name("page_x_modify.png"), None);
    }

    #[test]
    fn no_two_pages_collide() {
        let names: HashSet<String> = (1..=200)
            .flat_map(|i| [PageTag::raw(i).file_name(), PageTag::raw(i).cleaned().file_name()])
            .collect();
        assert_eq!(names.len(), 400);
    }

    #[test]
    fn classification() {
        assert!(is_raw_image(Path::new("dir/page_3.png")));
        assert!(!is_raw_image(Path::new("dir/page_3_modify.png")));
        assert!(is_cleaned_image(Path::new("dir/page_3_modify.png")));
        assert!(!is_raster_image(Path::new("dir/notes.txt")));
        assert!(!is_raw_image(Path::new("dir/page_3.PNG.bak")));
    }

    #[test]
    fn cleaned_name_keeps_stem() {
        assert_eq!(cleaned_file_name(Path::new("/w/page_4.png")), "page_4_modify.png");
        assert_eq!(cleaned_file_name(Path::new("scan.png")), "scan_modify.png");
    }

    #[test]
    fn sort_key_beats_lexicographic_order() {
        let mut files: Vec<PathBuf> = ["page_10_modify.png", "page_2_modify.png", "page_1_modify.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        files.sort();
        assert_eq!(files[0], PathBuf::from("page_10_modify.png"));

        files.sort_by_key(|p| cleaned_sort_key(p));
        let keys: Vec<u64> = files.iter().map(|p| cleaned_sort_key(p)).collect();
        assert_eq!(keys, vec![1, 2, 10]);
    }

    #[test]
    fn unparseable_cleaned_name_sorts_first() {
        assert_eq!(cleaned_sort_key(Path::new("scan_modify.png")), 0);
    }

    #[test]
    fn sort_key_keeps_indices_past_u32() {
        let big = Path::new("page_4294967296_modify.png");
        assert_eq!(cleaned_sort_key(big), 4_294_967_296);
        assert!(cleaned_sort_key(big) > cleaned_sort_key(Path::new("page_2_modify.png")));
    }
}
