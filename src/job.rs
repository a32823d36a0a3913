//! # Job Model Module
//!
//! Tipi condivisi tra compressori e orchestratore.
//!
//! ## Strutture dati:
//! - `MediaKind`: Tipo di media (enum chiuso, dispatch esaustivo)
//! - `UploadedFile`: File accettato dal layer di upload (path + MIME dichiarato)
//! - `CompressionJob`: Un file da comprimere con il suo ceiling
//! - `CompressionResult`: Esito di un compressore
//!
//! ## Classificazione:
//! Il MIME type arriva già classificato dal layer di upload: qui viene solo
//! tradotto in `MediaKind`. Per la CLI il MIME viene dedotto dall'estensione.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of uploaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classify a declared MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.split_once('/') {
            Some(("image", subtype)) if !subtype.is_empty() => Some(Self::Image),
            Some(("video", subtype)) if !subtype.is_empty() => Some(Self::Video),
            Some(("application", "pdf")) => Some(Self::Document),
            _ => None,
        }
    }

    /// Size ceiling configured for this kind
    pub fn ceiling(&self, config: &Config) -> u64 {
        match self {
            Self::Image => config.image_ceiling_bytes,
            Self::Video => config.video_ceiling_bytes,
            Self::Document => config.document_ceiling_bytes,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        };
        f.write_str(name)
    }
}

/// Guess a MIME type from the file extension
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// A file accepted by the upload layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub mime: String,
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime: mime.into(),
            original_name: original_name.into(),
        }
    }

    /// Build an upload from a local path, guessing the MIME type
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime = guess_mime_type(&path);
        let original_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self::new(path, mime, original_name)
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime)
    }
}

/// One file to compress
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionJob {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub media_kind: MediaKind,
    pub size_ceiling_bytes: u64,
}

impl CompressionJob {
    pub fn new(
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
        media_kind: MediaKind,
        size_ceiling_bytes: u64,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            media_kind,
            size_ceiling_bytes,
        }
    }

    /// Job that replaces the uploaded file at its own path
    pub fn in_place(path: impl Into<PathBuf>, media_kind: MediaKind, size_ceiling_bytes: u64) -> Self {
        let path = path.into();
        Self::new(path.clone(), path, media_kind, size_ceiling_bytes)
    }
}

/// Outcome of a compressor run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionResult {
    pub final_path: PathBuf,
    pub final_size_bytes: u64,
    pub passes_applied: u32,
    /// The final artifact is within the ceiling
    pub converged: bool,
}

impl CompressionResult {
    /// Result for an artifact left untouched
    pub fn untouched(path: &Path, size: u64, ceiling: u64) -> Self {
        Self {
            final_path: path.to_path_buf(),
            final_size_bytes: size,
            passes_applied: 0,
            converged: size <= ceiling,
        }
    }

    pub fn compressed(path: &Path, size: u64, passes: u32, ceiling: u64) -> Self {
        Self {
            final_path: path.to_path_buf(),
            final_size_bytes: size,
            passes_applied: passes,
            converged: size <= ceiling,
        }
    }
}
