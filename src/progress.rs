//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche di una submission.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking statistiche per file (compressi, non toccati, degradati, errori)
//! - Calcolo percentuali di riduzione e byte risparmiati
//! - Spinner per operazioni indeterminate (check dipendenze)
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale
//! - `BatchStats`: Statistiche cumulative della submission
//!
//! ## Statistiche tracciate:
//! - **files_processed**: Totale file elaborati
//! - **files_compressed**: File sostituiti da un artifact più piccolo
//! - **files_untouched**: File già sotto il ceiling o non riducibili
//! - **files_degraded**: Compressione fallita, originale mantenuto
//! - **errors**: Fallimenti strutturali (es. video rifiutato)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [========================================] 6/6 (100%) [OK] clip.mp4: 61.3% saved
//! ```

use crate::file_manager::FileManager;
use crate::orchestrator::batch::{BatchOutcome, StoredFile};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages the progress bar of a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode)
    pub fn hidden(total_files: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_files);
        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Statistics of one submission batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_compressed: usize,
    pub files_untouched: usize,
    pub files_degraded: usize,
    pub errors: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let mut stats = Self::new();
        for file in outcome.files() {
            stats.add(file);
        }
        stats
    }

    pub fn add(&mut self, file: &StoredFile) {
        self.files_processed += 1;
        self.total_original_size += file.original_size;

        if file.warning().is_some() {
            self.files_degraded += 1;
        } else if file.was_compressed() {
            self.files_compressed += 1;
            self.total_bytes_saved += file.original_size.saturating_sub(file.stored_size());
        } else {
            self.files_untouched += 1;
        }
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Compressed: {} | Untouched: {} | Degraded: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_compressed,
            self.files_untouched,
            self.files_degraded,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionWarning;
    use crate::job::{CompressionResult, MediaKind};
    use std::path::Path;

    fn compressed(path: &str, original: u64, stored: u64) -> StoredFile {
        let result = CompressionResult::compressed(Path::new(path), stored, 1, 10_000);
        StoredFile::compressed(MediaKind::Image, Path::new(path), original, result)
    }

    #[test]
    fn test_stats_from_outcome() {
        let untouched = StoredFile::compressed(
            MediaKind::Image,
            Path::new("/u/small.jpg"),
            4_000,
            CompressionResult::untouched(Path::new("/u/small.jpg"), 4_000, 10_000),
        );
        let degraded = StoredFile::degraded(
            Path::new("/u/clip.mp4"),
            60_000,
            CompressionWarning::new(MediaKind::Video, Path::new("/u/clip.mp4"), "encoder crashed"),
        );
        let outcome = BatchOutcome {
            images: vec![compressed("/u/a.jpg", 15_000, 8_000), untouched],
            videos: vec![degraded],
            letter: None,
        };

        let stats = BatchStats::from_outcome(&outcome);

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_compressed, 1);
        assert_eq!(stats.files_untouched, 1);
        assert_eq!(stats.files_degraded, 1);
        assert_eq!(stats.total_bytes_saved, 7_000);
        assert_eq!(stats.total_original_size, 79_000);
    }

    #[test]
    fn test_reduction_percent() {
        let mut stats = BatchStats::new();
        assert_eq!(stats.overall_reduction_percent(), 0.0);

        stats.add(&compressed("/u/a.jpg", 200, 50));
        assert_eq!(stats.overall_reduction_percent(), 75.0);

        stats.add_error();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.files_processed, 2);
        assert!(stats.format_summary().contains("Errors: 1"));
    }

    #[test]
    fn test_hidden_progress_counts() {
        let progress = ProgressManager::hidden(2);
        progress.update("[OK] a.jpg");
        progress.update("[OK] b.jpg");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }
}
