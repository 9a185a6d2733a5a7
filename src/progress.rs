//! Progress-callback trait for per-stage and per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::RemovalConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each stage. The CLI turns these into
//! a terminal progress bar; library callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf_unwatermark::{PipelineProgressCallback, RemovalConfig, Stage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct CountingCallback {
//!     cleaned: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: Stage, label: &str) {
//!         if stage == Stage::Filter {
//!             self.cleaned.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("cleaned {label}");
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     cleaned: AtomicUsize::new(0),
//! });
//!
//! let config = RemovalConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the pipeline as it moves through stages and pages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With the `parallel` feature, `on_item_complete` may
/// be called concurrently from the filter stage's worker threads.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called when a stage begins.
    ///
    /// # Arguments
    /// * `stage` — the stage that is starting
    /// * `total_items` — number of items the stage will process, if known
    ///   up front (`None` for rasterisation before the PDF is opened)
    fn on_stage_start(&self, stage: Stage, total_items: Option<usize>) {
        let _ = (stage, total_items);
    }

    /// Called when the total becomes known after the stage started.
    fn on_stage_total(&self, stage: Stage, total_items: usize) {
        let _ = (stage, total_items);
    }

    /// Called after one page/image has been handled.
    ///
    /// # Arguments
    /// * `label` — human-readable item name (`page 3`, a file path, …)
    fn on_item_complete(&self, stage: Stage, label: &str) {
        let _ = (stage, label);
    }

    /// Called when one item failed but the stage carries on.
    fn on_item_error(&self, stage: Stage, label: &str, error: &str) {
        let _ = (stage, label, error);
    }

    /// Called when a stage finished successfully.
    ///
    /// # Arguments
    /// * `processed` — items the stage produced or deleted
    fn on_stage_complete(&self, stage: Stage, processed: usize) {
        let _ = (stage, processed);
    }

    /// Called when a stage failed and the pipeline halts.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RemovalConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
