//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` per i fallimenti di un singolo compressore
//! - Definisce `BatchError` per i fallimenti strutturali di un'intera submission
//! - Definisce `CompressionWarning` per gli esiti degradati (originale mantenuto)
//!
//! ## Categorie di errori (`CompressError`):
//! - `Io`: File mancante, non leggibile o non scrivibile
//! - `Codec`: Decode/encode immagine fallito
//! - `Transcode`: Encoder video fallito (porta il messaggio diagnostico)
//! - `Rewrite`: Riscrittura documento PDF fallita
//! - `Timeout`: Encoder oltre il tempo massimo
//! - `UnsupportedFormat`: MIME type non gestito
//! - `MissingDependency`: Tool esterno mancante (ffmpeg)
//! - `Validation`: Input non valido (es. più di una lettera)
//! - `Worker`: Task del worker pool terminato in modo anomalo
//!
//! La non-convergenza del loop documenti NON è un errore: è un segnale
//! di controllo interno a `document_compressor`.
//!
//! ## Esempio:
//! ```rust,ignore
//! let size = FileManager::size_bytes(&path).await?;
//! if size == 0 {
//!     return Err(CompressError::Rewrite("empty output".to_string()));
//! }
//! ```

use crate::job::MediaKind;
use std::path::{Path, PathBuf};

/// Failure of a single compression job
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image codec error: {0}")]
    Codec(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Document rewrite error: {0}")]
    Rewrite(String),

    #[error("Encoder timed out after {secs}s for {}", .path.display())]
    Timeout { path: PathBuf, secs: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl CompressError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Structural failure of a whole submission batch
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("No record found to attach files to: {0}")]
    RecordNotFound(String),

    #[error("Compression infrastructure failure{}: {reason}", .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Infrastructure {
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("Record store error: {0}")]
    Persistence(String),
}

/// A degraded outcome: compression did not happen and the original was kept
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionWarning {
    pub kind: MediaKind,
    pub kept_path: PathBuf,
    pub reason: String,
}

impl CompressionWarning {
    pub fn new(kind: MediaKind, kept_path: &Path, reason: impl Into<String>) -> Self {
        Self {
            kind,
            kept_path: kept_path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CompressionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} compression skipped, kept {}: {}",
            self.kind,
            self.kept_path.display(),
            self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_message_includes_path() {
        let err = BatchError::Infrastructure {
            path: Some(PathBuf::from("/uploads/clip.mp4")),
            reason: "encoder crashed".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("/uploads/clip.mp4"));
        assert!(message.contains("encoder crashed"));

        let err = BatchError::Infrastructure {
            path: None,
            reason: "worker panicked".to_string(),
        };
        assert_eq!(err.to_string(), "Compression infrastructure failure: worker panicked");
    }

    #[test]
    fn test_warning_display() {
        let warning = CompressionWarning::new(MediaKind::Image, Path::new("/a/b.jpg"), "decode failed");
        assert_eq!(warning.to_string(), "image compression skipped, kept /a/b.jpg: decode failed");
    }
}
