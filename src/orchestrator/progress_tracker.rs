//! # Progress Tracking Module
//!
//! Tracker thread-safe condiviso dai task di una submission.
//! Gestisce sia output JSON che progress bar tradizionale.

use crate::{
    error::BatchError,
    json_output::JsonMessage,
    orchestrator::batch::StoredFile,
    progress::{BatchStats, ProgressManager},
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracker cloned into every task of a batch
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_files: usize,
    json_output: bool,
    stats: Arc<Mutex<BatchStats>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_files: usize, json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden(total_files as u64)
        } else {
            ProgressManager::new(total_files as u64)
        };

        Self {
            total_files,
            json_output,
            stats: Arc::new(Mutex::new(BatchStats::new())),
            progress_manager,
        }
    }

    /// Record a finished task and emit its JSON event if needed
    pub async fn handle_file_completion(&self, source: &Path, result: &Result<StoredFile, BatchError>) {
        let name = source.file_name().unwrap_or_default().to_string_lossy().to_string();

        let message = match result {
            Ok(file) => {
                self.stats.lock().await.add(file);
                if self.json_output {
                    JsonMessage::file_complete(file).emit();
                }

                if let Some(warning) = file.warning() {
                    format!("[WARN] {}: original kept ({})", name, warning.reason)
                } else if file.was_compressed() {
                    format!(
                        "[OK] {}: {:.1}% saved",
                        name,
                        crate::file_manager::FileManager::calculate_reduction(file.original_size, file.stored_size())
                    )
                } else {
                    format!("[SKIP] {}: already within ceiling", name)
                }
            }
            Err(e) => {
                self.stats.lock().await.add_error();
                if self.json_output {
                    JsonMessage::file_failed(source, e.to_string()).emit();
                }
                format!("[ERROR] {}: {}", name, e)
            }
        };

        self.progress_manager.update(&message);
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    /// Ottieni statistiche per report finale
    pub async fn stats(&self) -> BatchStats {
        self.stats.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionWarning;
    use crate::job::{CompressionResult, MediaKind};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_tracker_counts_every_outcome() {
        let tracker = ProgressTracker::new(3, true);

        let result = CompressionResult::compressed(Path::new("/u/a.jpg"), 8_000, 1, 10_000);
        let ok = StoredFile::compressed(MediaKind::Image, Path::new("/u/a.jpg"), 15_000, result);
        tracker.handle_file_completion(Path::new("/u/a.jpg"), &Ok(ok)).await;

        let warning = CompressionWarning::new(MediaKind::Image, Path::new("/u/b.jpg"), "decode failed");
        let degraded = StoredFile::degraded(Path::new("/u/b.jpg"), 12_000, warning);
        tracker.handle_file_completion(Path::new("/u/b.jpg"), &Ok(degraded)).await;

        let failed = BatchError::Infrastructure {
            path: Some(PathBuf::from("/u/c.mp4")),
            reason: "encoder crashed".to_string(),
        };
        tracker.handle_file_completion(Path::new("/u/c.mp4"), &Err(failed)).await;

        let stats = tracker.stats().await;
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_compressed, 1);
        assert_eq!(stats.files_degraded, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_bytes_saved, 7_000);
    }
}
