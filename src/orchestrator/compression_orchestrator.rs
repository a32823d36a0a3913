//! # Compression Orchestrator
//!
//! Orchestratore principale: riceve una submission, esegue il compressore
//! giusto per ogni file tramite il worker pool e collega i path risultanti
//! al record del richiedente.
//!
//! ## Flusso:
//! 1. Un task tokio per file; ogni task attende il permesso del proprio tipo
//! 2. Tutti i task vengono attesi (anche dopo un fallimento) e i risultati
//!    raccolti nell'ordine originale
//! 3. Il primo errore strutturale viene restituito solo a batch concluso
//!
//! I task sono indipendenti dal chiamante: se il future dell'orchestratore
//! viene droppato, i job in corso arrivano comunque a termine.

use crate::{
    config::Config,
    error::BatchError,
    job::{MediaKind, UploadedFile},
    orchestrator::{
        batch::{BatchOutcome, StoredFile, SubmissionBatch},
        progress_tracker::ProgressTracker,
        task_runner::TaskRunner,
        worker_pool::WorkerPool,
    },
    record_store::{RecordStore, SubmissionRecord},
};
use anyhow::Result;
use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

type TaskResult = Result<StoredFile, BatchError>;

/// Runs whole submissions through the compressors
pub struct CompressionOrchestrator {
    runner: TaskRunner,
    pool: WorkerPool,
    progress: Option<ProgressTracker>,
}

impl CompressionOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(&config);
        Ok(Self {
            runner: TaskRunner::new(config),
            pool,
            progress: None,
        })
    }

    /// Orchestrator over custom compressors
    pub fn with_runner(config: &Config, runner: TaskRunner) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runner,
            pool: WorkerPool::new(config),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Compress every file of a batch.
    ///
    /// The outcome holds exactly one `StoredFile` per input, in input order.
    pub async fn compress_batch(&self, batch: SubmissionBatch) -> Result<BatchOutcome, BatchError> {
        info!(
            "📦 Compressing submission: {} image(s), {} video(s), {} letter",
            batch.images.len(),
            batch.videos.len(),
            if batch.letter.is_some() { "1" } else { "no" }
        );

        let SubmissionBatch { images, videos, letter } = batch;

        let image_tasks: Vec<_> = images.into_iter().map(|u| self.spawn(MediaKind::Image, u)).collect();
        let video_tasks: Vec<_> = videos.into_iter().map(|u| self.spawn(MediaKind::Video, u)).collect();
        let letter_task = letter.map(|u| self.spawn(MediaKind::Document, u));

        let image_results = join_all(image_tasks).await;
        let video_results = join_all(video_tasks).await;
        let letter_result = match letter_task {
            Some(task) => Some(task.await),
            None => None,
        };

        let mut first_error = None;
        let images = collect(image_results, &mut first_error);
        let videos = collect(video_results, &mut first_error);
        let letter = collect(letter_result.into_iter().collect(), &mut first_error).pop();

        if let Some(e) = first_error {
            error!("❌ Submission rejected: {}", e);
            return Err(e);
        }

        Ok(BatchOutcome { images, videos, letter })
    }

    /// Compress a batch and attach the stored paths to the record of `email`.
    ///
    /// The record is looked up first, so nothing is compressed for an
    /// unknown email. It is read again after compression so that paths
    /// attached meanwhile by another submission are kept; the store itself
    /// is last-writer-wins between that read and the save.
    pub async fn process_submission(
        &self,
        store: &dyn RecordStore,
        email: &str,
        batch: SubmissionBatch,
    ) -> Result<BatchOutcome, BatchError> {
        load_record(store, email).await?;

        let outcome = self.compress_batch(batch).await?;

        let mut record = load_record(store, email).await?;
        record.attach(&outcome);
        store
            .save(&record)
            .await
            .map_err(|e| BatchError::Persistence(format!("{:#}", e)))?;
        debug!("Record for {} updated with {} file(s)", email, outcome.len());

        Ok(outcome)
    }

    fn spawn(&self, kind: MediaKind, upload: UploadedFile) -> JoinHandle<TaskResult> {
        let pool = self.pool.clone();
        let runner = self.runner.clone();
        let progress = self.progress.clone();

        tokio::spawn(async move {
            let result = match pool.acquire(kind, &upload.path).await {
                // Released when the task ends
                Ok(_permit) => runner.run(kind, &upload).await,
                Err(e) => Err(BatchError::Infrastructure {
                    path: Some(upload.path.clone()),
                    reason: e.to_string(),
                }),
            };

            if let Some(progress) = &progress {
                progress.handle_file_completion(&upload.path, &result).await;
            }
            result
        })
    }
}

/// Unwrap task results in order, remembering the first failure
async fn load_record(store: &dyn RecordStore, email: &str) -> Result<SubmissionRecord, BatchError> {
    store
        .load(email)
        .await
        .map_err(|e| BatchError::Persistence(format!("{:#}", e)))?
        .ok_or_else(|| BatchError::RecordNotFound(email.to_string()))
}

fn collect(results: Vec<Result<TaskResult, JoinError>>, first_error: &mut Option<BatchError>) -> Vec<StoredFile> {
    let mut stored = Vec::with_capacity(results.len());

    for result in results {
        let failure = match result {
            Ok(Ok(file)) => {
                stored.push(file);
                continue;
            }
            Ok(Err(e)) => e,
            Err(join_error) => BatchError::Infrastructure {
                path: None,
                reason: format!("worker task failed: {}", join_error),
            },
        };

        if first_error.is_none() {
            *first_error = Some(failure);
        } else {
            error!("Additional failure in submission: {}", failure);
        }
    }

    stored
}
