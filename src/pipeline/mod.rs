//! Pipeline stages for watermark removal.
//!
//! Each submodule implements exactly one transformation step, and every
//! step exists in two flavours: an in-memory one that passes
//! [`RasterPage`] values straight to the next stage, and an on-disk one that
//! reads and writes the working-directory layout described in [`naming`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ filter ──▶ prune ──▶ assemble
//! (select)  (pdfium)   (whiten)   (delete)  (lopdf)
//! ```
//!
//! 1. [`input`]    — discover candidate PDFs, apply the 1-based selection,
//!    validate the chosen file
//! 2. [`render`]   — rasterise every page at 600 DPI
//! 3. [`filter`]   — replace watermark-gray pixels with white
//! 4. [`prune`]    — remove raw renders, leaving cleaned images only
//!    (in memory this happens by ownership: raw pages are consumed)
//! 5. [`assemble`] — compose cleaned pages, in page order, into one PDF

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod assemble;
pub mod filter;
pub mod input;
pub mod naming;
pub mod prune;
pub mod render;

pub use naming::{PageTag, RasterPage};

/// One of the four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rasterize,
    Filter,
    Prune,
    Reassemble,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Rasterize,
        Stage::Filter,
        Stage::Prune,
        Stage::Reassemble,
    ];

    /// 1-based position in the pipeline.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rasterize => "rasterize",
            Stage::Filter => "filter",
            Stage::Prune => "prune",
            Stage::Reassemble => "reassemble",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert_eq!(Stage::Rasterize.number(), 1);
        assert_eq!(Stage::Reassemble.number(), 4);
    }

    #[test]
    fn stage_display_matches_serde_name() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }
}
