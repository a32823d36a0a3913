//! # Task Runner Module
//!
//! Esegue un singolo `CompressionJob` applicando la policy del suo tipo.
//!
//! ## Policy per tipo:
//! - **image**: best-effort, un errore diventa `CompressionWarning` e
//!   l'originale viene mantenuto
//! - **video**: dipende da `VideoFailurePolicy` (`keep_original` come le
//!   immagini, `reject` fa fallire la submission)
//! - **document**: best-effort; un artifact mancante o vuoto è già un errore
//!   del compressore, quindi finisce anche lui in un warning

use crate::{
    config::{Config, VideoFailurePolicy},
    document_compressor::DocumentCompressor,
    error::{BatchError, CompressError, CompressionWarning},
    file_manager::FileManager,
    image_compressor::ImageCompressor,
    job::{CompressionJob, MediaKind, UploadedFile},
    orchestrator::batch::StoredFile,
    video_transcoder::VideoTranscoder,
};
use tracing::{debug, warn};

/// Runs one uploaded file through the compressor of its kind
#[derive(Clone)]
pub struct TaskRunner {
    config: Config,
    image: ImageCompressor,
    video: VideoTranscoder,
    document: DocumentCompressor,
}

impl TaskRunner {
    pub fn new(config: Config) -> Self {
        let image = ImageCompressor::new(&config);
        let video = VideoTranscoder::new(&config);
        let document = DocumentCompressor::new(&config);
        Self::with_compressors(config, image, video, document)
    }

    pub fn with_compressors(
        config: Config,
        image: ImageCompressor,
        video: VideoTranscoder,
        document: DocumentCompressor,
    ) -> Self {
        Self {
            config,
            image,
            video,
            document,
        }
    }

    /// Compress one upload in place.
    ///
    /// Only a video failure under `VideoFailurePolicy::Reject` is returned as
    /// an error; every other failure keeps the original.
    pub async fn run(&self, kind: MediaKind, upload: &UploadedFile) -> Result<StoredFile, BatchError> {
        let job = CompressionJob::in_place(&upload.path, kind, kind.ceiling(&self.config));
        let original_size = FileManager::size_bytes(&job.source_path).await.unwrap_or(0);

        debug!("Processing {} {} ({})", kind, upload.original_name, upload.path.display());

        let result = match kind {
            MediaKind::Image => self.image.compress(&job).await,
            MediaKind::Video => self.video.transcode(&job).await,
            MediaKind::Document => self.document.compress(&job).await,
        };

        match result {
            Ok(result) => Ok(StoredFile::compressed(kind, &job.source_path, original_size, result)),
            Err(e) => self.handle_failure(&job, original_size, e),
        }
    }

    fn handle_failure(
        &self,
        job: &CompressionJob,
        original_size: u64,
        error: CompressError,
    ) -> Result<StoredFile, BatchError> {
        if job.media_kind == MediaKind::Video && self.config.video_failure == VideoFailurePolicy::Reject {
            return Err(BatchError::Infrastructure {
                path: Some(job.source_path.clone()),
                reason: error.to_string(),
            });
        }

        let warning = CompressionWarning::new(job.media_kind, &job.source_path, error.to_string());
        warn!("⚠️ {}", warning);
        Ok(StoredFile::degraded(&job.source_path, original_size, warning))
    }
}
