//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso
//! programmatico della CLI (un oggetto JSON per riga su stdout).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della submission
//! - `file_complete`: Fine elaborazione di un file (compresso, non toccato,
//!   degradato o fallito)
//! - `complete`: Fine submission con statistiche finali
//! - `error`: Errore strutturale

use crate::config::{Config, VideoFailurePolicy};
use crate::file_manager::FileManager;
use crate::job::MediaKind;
use crate::orchestrator::batch::{StoredFile, SubmissionBatch};
use crate::progress::BatchStats;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Compressed,
    Untouched,
    Degraded,
    Failed,
}

impl FileStatus {
    pub fn of(file: &StoredFile) -> Self {
        if file.warning().is_some() {
            Self::Degraded
        } else if file.was_compressed() {
            Self::Compressed
        } else {
            Self::Untouched
        }
    }
}

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della submission
    #[serde(rename = "start")]
    Start {
        email: String,
        images: usize,
        videos: usize,
        letter: bool,
        total_files: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        kind: Option<MediaKind>,
        source: PathBuf,
        stored_path: Option<PathBuf>,
        original_size: u64,
        final_size: u64,
        reduction_percent: f64,
        passes_applied: u32,
        converged: bool,
        status: FileStatus,
        warning: Option<String>,
    },

    /// Submission completata
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_compressed: usize,
        files_untouched: usize,
        files_degraded: usize,
        errors: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error { message: String, details: Option<String> },
}

/// Configurazione riportata nel messaggio `start`
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub image_ceiling_bytes: u64,
    pub video_ceiling_bytes: u64,
    pub document_ceiling_bytes: u64,
    pub video_crf: u8,
    pub workers: usize,
    pub max_concurrent_transcodes: usize,
    pub video_failure: VideoFailurePolicy,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(email: &str, batch: &SubmissionBatch, config: &Config) -> Self {
        Self::Start {
            email: email.to_string(),
            images: batch.images.len(),
            videos: batch.videos.len(),
            letter: batch.letter.is_some(),
            total_files: batch.len(),
            config: JsonConfig::from(config),
        }
    }

    pub fn file_complete(file: &StoredFile) -> Self {
        let (passes_applied, converged) = match &file.result {
            Ok(result) => (result.passes_applied, result.converged),
            Err(_) => (0, false),
        };
        let final_size = file.stored_size();

        Self::FileComplete {
            kind: Some(file.kind),
            source: file.source_path.clone(),
            stored_path: Some(file.stored_path.clone()),
            original_size: file.original_size,
            final_size,
            reduction_percent: FileManager::calculate_reduction(file.original_size, final_size),
            passes_applied,
            converged,
            status: FileStatus::of(file),
            warning: file.warning().map(|w| w.reason.clone()),
        }
    }

    /// A file whose failure rejects the whole submission
    pub fn file_failed(source: &Path, reason: String) -> Self {
        Self::FileComplete {
            kind: None,
            source: source.to_path_buf(),
            stored_path: None,
            original_size: 0,
            final_size: 0,
            reduction_percent: 0.0,
            passes_applied: 0,
            converged: false,
            status: FileStatus::Failed,
            warning: Some(reason),
        }
    }

    pub fn complete(stats: &BatchStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_compressed: stats.files_compressed,
            files_untouched: stats.files_untouched,
            files_degraded: stats.files_degraded,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            average_reduction: stats.overall_reduction_percent(),
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            image_ceiling_bytes: config.image_ceiling_bytes,
            video_ceiling_bytes: config.video_ceiling_bytes,
            document_ceiling_bytes: config.document_ceiling_bytes,
            video_crf: config.video_crf,
            workers: config.workers,
            max_concurrent_transcodes: config.max_concurrent_transcodes,
            video_failure: config.video_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionWarning;
    use crate::job::{CompressionResult, UploadedFile};
    use serde_json::Value;

    #[test]
    fn test_start_message() {
        let batch = SubmissionBatch::from_uploads(vec![
            UploadedFile::from_path("/u/a.jpg"),
            UploadedFile::from_path("/u/letter.pdf"),
        ])
        .unwrap();

        let value = serde_json::to_value(JsonMessage::start("ada@example.com", &batch, &Config::default())).unwrap();

        assert_eq!(value["type"], "start");
        assert_eq!(value["total_files"], 2);
        assert_eq!(value["letter"], true);
        assert_eq!(value["config"]["video_failure"], "keep_original");
    }

    #[test]
    fn test_file_complete_statuses() {
        let result = CompressionResult::compressed(Path::new("/u/a.jpg"), 8_000, 1, 10_000);
        let file = StoredFile::compressed(MediaKind::Image, Path::new("/u/a.jpg"), 16_000, result);
        let value: Value = serde_json::to_value(JsonMessage::file_complete(&file)).unwrap();
        assert_eq!(value["type"], "file_complete");
        assert_eq!(value["status"], "compressed");
        assert_eq!(value["kind"], "image");
        assert_eq!(value["reduction_percent"], 50.0);

        let warning = CompressionWarning::new(MediaKind::Document, Path::new("/u/l.pdf"), "bad xref");
        let file = StoredFile::degraded(Path::new("/u/l.pdf"), 12_000, warning);
        let value: Value = serde_json::to_value(JsonMessage::file_complete(&file)).unwrap();
        assert_eq!(value["status"], "degraded");
        assert_eq!(value["warning"], "bad xref");
        assert_eq!(value["final_size"], 12_000);

        let value: Value =
            serde_json::to_value(JsonMessage::file_failed(Path::new("/u/v.mp4"), "crash".to_string())).unwrap();
        assert_eq!(value["status"], "failed");
        assert!(value["stored_path"].is_null());
    }

    #[test]
    fn test_complete_message() {
        let mut stats = BatchStats::new();
        stats.add_error();
        let value: Value = serde_json::to_value(JsonMessage::complete(&stats, 1.5)).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["errors"], 1);
        assert_eq!(value["duration_seconds"], 1.5);
    }
}
