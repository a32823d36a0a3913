//! # Document Compression Module
//!
//! Questo modulo gestisce la compressione della lettera PDF allegata a una
//! submission, con un loop di riscrittura protetto da convergenza.
//!
//! ## Loop di compressione:
//! 1. Se il PDF è già sotto il ceiling (default 10 MiB) non si fa nulla
//! 2. Ogni tentativo riscrive l'output migliore corrente su un temporaneo nuovo
//! 3. Se il tentativo non è strettamente più piccolo del precedente il loop
//!    termina (non-convergenza) e il tentativo viene scartato
//! 4. Il loop termina anche al raggiungimento del ceiling o del numero
//!    massimo di iterazioni (`document_max_iterations`)
//! 5. Il miglior artifact non vuoto viene promosso sulla destinazione; se
//!    nessun tentativo ha ridotto il file, l'originale viene copiato sulla
//!    destinazione (se diversa dalla sorgente)
//!
//! ## Garanzie:
//! - Un tentativo che peggiora non sovrascrive mai il miglior risultato
//! - Se il primo tentativo fallisce l'errore arriva al chiamante e il file
//!   originale resta intatto; un fallimento successivo tiene il migliore
//! - Nessun temporaneo rimane su disco
//!
//! ## Esempio:
//! ```rust,ignore
//! let compressor = DocumentCompressor::new(&config);
//! let job = CompressionJob::in_place(&path, MediaKind::Document, config.document_ceiling_bytes);
//! let result = compressor.compress(&job).await?;
//! ```

use crate::config::Config;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::job::{CompressionJob, CompressionResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Whole-document rewrite capability
pub trait DocumentRewriter: Send + Sync {
    /// Rewrite `input` into `output` with a more compact encoding
    fn rewrite(&self, input: &Path, output: &Path) -> Result<(), CompressError>;
}

/// Rewriter built on `lopdf`: drops unreferenced objects and deflates streams
pub struct LopdfRewriter;

impl DocumentRewriter for LopdfRewriter {
    fn rewrite(&self, input: &Path, output: &Path) -> Result<(), CompressError> {
        let mut doc = lopdf::Document::load(input)
            .map_err(|e| CompressError::Rewrite(format!("{}: {}", input.display(), e)))?;

        doc.delete_zero_length_streams();
        doc.prune_objects();
        doc.renumber_objects();
        doc.compress();

        doc.save(output)
            .map_err(|e| CompressError::Rewrite(format!("{}: {}", output.display(), e)))?;
        Ok(())
    }
}

/// One rewrite attempt of the convergence loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PassAttempt {
    attempt_index: u32,
    prior_size_bytes: u64,
    produced_size_bytes: u64,
}

impl PassAttempt {
    fn shrunk(&self) -> bool {
        self.produced_size_bytes < self.prior_size_bytes
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    WithinCeiling,
    NonConvergent,
    IterationCap,
    RewriteFailed,
}

/// Convergence-guarded PDF compressor
#[derive(Clone)]
pub struct DocumentCompressor {
    rewriter: Arc<dyn DocumentRewriter>,
    max_iterations: u32,
}

impl DocumentCompressor {
    pub fn new(config: &Config) -> Self {
        Self::with_rewriter(config, Arc::new(LopdfRewriter))
    }

    pub fn with_rewriter(config: &Config, rewriter: Arc<dyn DocumentRewriter>) -> Self {
        Self {
            rewriter,
            max_iterations: config.document_max_iterations,
        }
    }

    /// Repeatedly rewrite a document until it fits, stops shrinking, or the
    /// iteration cap is hit
    pub async fn compress(&self, job: &CompressionJob) -> Result<CompressionResult, CompressError> {
        let ceiling = job.size_ceiling_bytes;
        let original_size = FileManager::size_bytes(&job.source_path).await?;

        if original_size <= ceiling {
            debug!(
                "Document {} already under ceiling ({})",
                job.source_path.display(),
                FileManager::format_size(original_size)
            );
            FileManager::copy_into_place(&job.source_path, &job.destination_path).await?;
            return Ok(CompressionResult::untouched(&job.destination_path, original_size, ceiling));
        }

        info!(
            "📄 Compressing document {} ({} > {})",
            job.source_path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(ceiling)
        );

        let start_time = Instant::now();
        let mut best: Option<NamedTempFile> = None;
        let mut best_size = original_size;
        let mut attempts = 0u32;

        let exit = loop {
            if best_size <= ceiling {
                break LoopExit::WithinCeiling;
            }
            if attempts >= self.max_iterations {
                break LoopExit::IterationCap;
            }
            attempts += 1;

            let input = match &best {
                Some(temp) => temp.path().to_path_buf(),
                None => job.source_path.clone(),
            };
            let candidate = FileManager::temp_sibling(&job.destination_path)?;

            let produced = match self.rewrite_once(&input, candidate.path()).await {
                Ok(size) => size,
                Err(e) if best.is_some() => {
                    warn!("Rewrite attempt {} failed, keeping best so far: {}", attempts, e);
                    break LoopExit::RewriteFailed;
                }
                Err(e) => return Err(e),
            };

            let attempt = PassAttempt {
                attempt_index: attempts,
                prior_size_bytes: best_size,
                produced_size_bytes: produced,
            };
            debug!(
                "Rewrite attempt {}: {} -> {}",
                attempt.attempt_index,
                FileManager::format_size(attempt.prior_size_bytes),
                FileManager::format_size(attempt.produced_size_bytes)
            );

            if !attempt.shrunk() {
                // Dropping the candidate deletes it; the best artifact stays
                break LoopExit::NonConvergent;
            }
            best_size = produced;
            best = Some(candidate);
        };

        debug!(
            "Document loop for {} stopped ({:?}) after {} attempt(s) in {:?}",
            job.source_path.display(),
            exit,
            attempts,
            start_time.elapsed()
        );

        let Some(best) = best else {
            warn!(
                "Rewriting did not shrink {} ({}), keeping original",
                job.source_path.display(),
                FileManager::format_size(original_size)
            );
            FileManager::copy_into_place(&job.source_path, &job.destination_path).await?;
            return Ok(CompressionResult::compressed(&job.destination_path, original_size, attempts, ceiling));
        };

        FileManager::promote(best, &job.destination_path)?;

        if exit != LoopExit::WithinCeiling {
            warn!(
                "Document {} still above ceiling after {} attempt(s): {}",
                job.destination_path.display(),
                attempts,
                FileManager::format_size(best_size)
            );
        }
        info!(
            "✅ Document {}: {} -> {} ({:.1}% saved)",
            job.destination_path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(best_size),
            FileManager::calculate_reduction(original_size, best_size)
        );

        Ok(CompressionResult::compressed(&job.destination_path, best_size, attempts, ceiling))
    }

    /// Run one rewrite off the async runtime and return the produced size
    async fn rewrite_once(&self, input: &Path, output: &Path) -> Result<u64, CompressError> {
        let rewriter = Arc::clone(&self.rewriter);
        let input_buf = input.to_path_buf();
        let output_buf = output.to_path_buf();

        tokio::task::spawn_blocking(move || rewriter.rewrite(&input_buf, &output_buf))
            .await
            .map_err(|e| CompressError::Worker(e.to_string()))??;

        let size = FileManager::size_bytes(output).await?;
        if size == 0 {
            return Err(CompressError::Rewrite(format!(
                "rewrite of {} produced an empty file",
                input.display()
            )));
        }
        Ok(size)
    }
}
