//! # Upload Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di compressione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per il layer di upload
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom (compressore, submission, warning)
//! - `job`: Modello dati condiviso (tipo media, job, risultato)
//! - `file_manager`: Size probe, file temporanei e discovery upload
//! - `image_compressor`: Compressione immagini a due pass
//! - `video_transcoder`: Ricodifica video con ffmpeg
//! - `document_compressor`: Loop di riscrittura PDF con guardia di convergenza
//! - `orchestrator`: Worker pool e orchestrazione della submission
//! - `record_store`: Record della submission e persistenza
//! - `progress` / `json_output`: Progress bar, statistiche e output JSON
//! - `platform`: Comandi esterni cross-platform
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use upload_compressor::{CompressionOrchestrator, Config, JsonRecordStore, SubmissionBatch, UploadedFile};
//!
//! let orchestrator = CompressionOrchestrator::new(Config::default())?;
//! let store = JsonRecordStore::in_home().await?;
//! let batch = SubmissionBatch::from_uploads(vec![UploadedFile::from_path("photo.jpg")])?;
//! let outcome = orchestrator.process_submission(&store, "ada@example.com", batch).await?;
//! ```

pub mod config;
pub mod document_compressor;
pub mod error;
pub mod file_manager;
pub mod image_compressor;
pub mod job;
pub mod json_output;
pub mod orchestrator;
pub mod platform;
pub mod progress;
pub mod record_store;
pub mod video_transcoder;

#[cfg(test)]
mod testing;

pub use config::{Config, ImagePass, VideoFailurePolicy};
pub use document_compressor::DocumentCompressor;
pub use error::{BatchError, CompressError, CompressionWarning};
pub use image_compressor::ImageCompressor;
pub use job::{CompressionJob, CompressionResult, MediaKind, UploadedFile};
pub use orchestrator::{BatchOutcome, CompressionOrchestrator, StoredFile, SubmissionBatch};
pub use record_store::{JsonRecordStore, MemoryRecordStore, RecordStore, SubmissionRecord};
pub use video_transcoder::VideoTranscoder;
