use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::models::{DiskFile, FileStatus};
use crate::services::clipboard::{copy_all, copy_text, format_file_size};
use crate::services::{ExtractionPipeline, SubmitOutcome};

fn request_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

/// Submits local files as one batch and waits until all of them settle.
pub async fn add_handler(
    pipeline: &mut ExtractionPipeline,
    paths: &[PathBuf],
) -> AppResult<Vec<SubmitOutcome>> {
    let start = Instant::now();
    let request_id = request_id();

    info!(request_id = %request_id, files = paths.len(), "Starting add request");

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match DiskFile::open(path).await {
            Ok(file) => {
                debug!(
                    request_id = %request_id,
                    file_name = %file.path().display(),
                    "File opened"
                );
                files.push(file);
            }
            Err(e) => {
                // An unreadable path must not stop the rest of the batch.
                error!(request_id = %request_id, path = %path.display(), error = %e, "Failed to open file");
            }
        }
    }

    let outcomes = pipeline.submit_batch(files);
    pipeline.run_until_idle().await;

    info!(
        request_id = %request_id,
        total_time_ms = start.elapsed().as_millis() as u64,
        "Add request completed"
    );
    Ok(outcomes)
}

/// One line per record: name, type label, size and status.
pub fn list_handler(pipeline: &ExtractionPipeline) -> String {
    let registry = pipeline.registry();
    if registry.is_empty() {
        return "No files added".to_string();
    }

    registry
        .entries_in_order()
        .map(|(name, record)| {
            let status = match record.status() {
                FileStatus::Queued => "queued".to_string(),
                FileStatus::Loading => "loading".to_string(),
                FileStatus::Ready => format!("ready ({} chars)", record.text().chars().count()),
                FileStatus::Error => format!(
                    "error: {}",
                    record.error_message().unwrap_or("Error processing file")
                ),
            };
            format!(
                "{}\t{}\t{}\t{}",
                name,
                record.type_label(),
                format_file_size(record.size_bytes()),
                status
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clipboard text for one file, or for every ready file when `name` is
/// `None`.
pub fn copy_handler(pipeline: &ExtractionPipeline, name: Option<&str>) -> AppResult<String> {
    let registry = pipeline.registry();
    match name {
        Some(name) => {
            let record = registry.get(name).ok_or_else(|| AppError::not_found(name))?;
            copy_text(name, record).ok_or_else(|| AppError::nothing_to_copy(name))
        }
        None => copy_all(registry).ok_or_else(|| AppError::nothing_to_copy("any file")),
    }
}

pub fn remove_handler(pipeline: &mut ExtractionPipeline, name: &str) -> AppResult<()> {
    if pipeline.remove(name) {
        Ok(())
    } else {
        Err(AppError::not_found(name))
    }
}

pub fn clear_handler(pipeline: &mut ExtractionPipeline) {
    pipeline.clear();
}
