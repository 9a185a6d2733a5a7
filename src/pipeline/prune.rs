//! Intermediate pruning: delete raw renders once the filter has run.
//!
//! After this stage the working directory holds only `*_modify.png` images
//! (plus any non-image files, which are never touched). Running it again
//! deletes nothing.

use crate::error::UnwatermarkError;
use crate::output::{PruneFailure, PruneReport};
use crate::pipeline::naming;
use crate::pipeline::Stage;
use crate::progress::PipelineProgressCallback;
use std::path::Path;
use tracing::{info, warn};

/// Delete every raw `*.png` in `work_dir`.
///
/// A file that cannot be deleted is logged and recorded in
/// [`PruneReport::failed`]; the remaining files are still attempted and the
/// stage succeeds. Only a missing or unreadable directory fails the stage.
pub fn prune_dir(
    work_dir: &Path,
    progress: &dyn PipelineProgressCallback,
) -> Result<PruneReport, UnwatermarkError> {
    prune_with(work_dir, progress, |path| std::fs::remove_file(path))
}

fn prune_with(
    work_dir: &Path,
    progress: &dyn PipelineProgressCallback,
    remove: impl Fn(&Path) -> std::io::Result<()>,
) -> Result<PruneReport, UnwatermarkError> {
    if !work_dir.is_dir() {
        return Err(UnwatermarkError::WorkDirMissing {
            path: work_dir.to_path_buf(),
        });
    }

    let mut targets = Vec::new();
    for entry in std::fs::read_dir(work_dir).map_err(|e| UnwatermarkError::io(work_dir, e))? {
        let path = entry.map_err(|e| UnwatermarkError::io(work_dir, e))?.path();
        if path.is_file() && naming::is_raw_image(&path) {
            targets.push(path);
        }
    }
    targets.sort();
    progress.on_stage_total(Stage::Prune, targets.len());

    let mut report = PruneReport::default();
    for path in targets {
        match remove(&path) {
            Ok(()) => {
                info!("Deleted: {}", path.display());
                progress.on_item_complete(Stage::Prune, &path.display().to_string());
                report.deleted.push(path);
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                progress.on_item_error(Stage::Prune, &path.display().to_string(), &e.to_string());
                report.failed.push(PruneFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Cleanup complete: {} files deleted, cleaned images kept",
        report.deleted.len()
    );
    Ok(report)
}
