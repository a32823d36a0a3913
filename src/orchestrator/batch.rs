//! # Submission Batch Module
//!
//! Input e output dell'orchestratore per una singola submission.
//!
//! ## Strutture dati:
//! - `SubmissionBatch`: file caricati raggruppati per tipo (immagini, video,
//!   al massimo una lettera PDF)
//! - `StoredFile`: esito per file (path finale o warning con originale mantenuto)
//! - `BatchOutcome`: un `StoredFile` per ogni file in input, nello stesso ordine

use crate::error::{CompressError, CompressionWarning};
use crate::job::{CompressionResult, MediaKind, UploadedFile};
use std::path::{Path, PathBuf};

/// Uploaded files of one submission, grouped by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionBatch {
    pub images: Vec<UploadedFile>,
    pub videos: Vec<UploadedFile>,
    pub letter: Option<UploadedFile>,
}

impl SubmissionBatch {
    /// Group a flat list of uploads by kind, keeping their relative order.
    ///
    /// Fails on an unsupported MIME type or on a second PDF letter.
    pub fn from_uploads<I>(uploads: I) -> Result<Self, CompressError>
    where
        I: IntoIterator<Item = UploadedFile>,
    {
        let mut batch = Self::default();

        for upload in uploads {
            match upload.kind() {
                Some(MediaKind::Image) => batch.images.push(upload),
                Some(MediaKind::Video) => batch.videos.push(upload),
                Some(MediaKind::Document) => {
                    if let Some(existing) = &batch.letter {
                        return Err(CompressError::Validation(format!(
                            "only one letter per submission ({} and {})",
                            existing.original_name, upload.original_name
                        )));
                    }
                    batch.letter = Some(upload);
                }
                None => {
                    return Err(CompressError::UnsupportedFormat(format!(
                        "{} ({})",
                        upload.original_name, upload.mime
                    )));
                }
            }
        }

        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.images.len() + self.videos.len() + usize::from(self.letter.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where one uploaded file ended up
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub kind: MediaKind,
    pub source_path: PathBuf,
    pub stored_path: PathBuf,
    pub original_size: u64,
    pub result: Result<CompressionResult, CompressionWarning>,
}

impl StoredFile {
    pub fn compressed(kind: MediaKind, source_path: &Path, original_size: u64, result: CompressionResult) -> Self {
        Self {
            kind,
            source_path: source_path.to_path_buf(),
            stored_path: result.final_path.clone(),
            original_size,
            result: Ok(result),
        }
    }

    /// The original was kept because compression failed
    pub fn degraded(source_path: &Path, original_size: u64, warning: CompressionWarning) -> Self {
        Self {
            kind: warning.kind,
            source_path: source_path.to_path_buf(),
            stored_path: warning.kept_path.clone(),
            original_size,
            result: Err(warning),
        }
    }

    pub fn stored_size(&self) -> u64 {
        match &self.result {
            Ok(result) => result.final_size_bytes,
            Err(_) => self.original_size,
        }
    }

    /// A smaller artifact replaced the upload
    pub fn was_compressed(&self) -> bool {
        self.result.is_ok() && self.stored_size() < self.original_size
    }

    pub fn warning(&self) -> Option<&CompressionWarning> {
        self.result.as_ref().err()
    }
}

/// One `StoredFile` per input file, grouped and ordered like the batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub images: Vec<StoredFile>,
    pub videos: Vec<StoredFile>,
    pub letter: Option<StoredFile>,
}

impl BatchOutcome {
    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.images.iter().map(|f| f.stored_path.clone()).collect()
    }

    pub fn video_paths(&self) -> Vec<PathBuf> {
        self.videos.iter().map(|f| f.stored_path.clone()).collect()
    }

    pub fn letter_path(&self) -> Option<PathBuf> {
        self.letter.as_ref().map(|f| f.stored_path.clone())
    }

    /// All stored files: images, then videos, then the letter
    pub fn files(&self) -> impl Iterator<Item = &StoredFile> {
        self.images.iter().chain(self.videos.iter()).chain(self.letter.iter())
    }

    pub fn warnings(&self) -> Vec<&CompressionWarning> {
        self.files().filter_map(StoredFile::warning).collect()
    }

    pub fn len(&self) -> usize {
        self.files().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
