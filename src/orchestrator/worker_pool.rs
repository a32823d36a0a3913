//! # Worker Pool Module
//!
//! Limita la concorrenza per tipo di media con un semaforo per tipo.
//!
//! | Tipo      | Permessi                    | Motivo                         |
//! |-----------|-----------------------------|--------------------------------|
//! | image     | `workers`                   | decode/encode CPU-bound        |
//! | video     | `max_concurrent_transcodes` | un processo ffmpeg per permesso |
//! | document  | 1                           | al massimo una lettera         |
//!
//! Ogni task acquisisce il permesso del proprio tipo prima di iniziare e lo
//! rilascia al drop, anche in caso di errore o panic.

use crate::config::Config;
use crate::error::CompressError;
use crate::job::MediaKind;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

/// Per-kind concurrency limits shared by every task of a batch
#[derive(Clone)]
pub struct WorkerPool {
    image_semaphore: Arc<Semaphore>,
    video_semaphore: Arc<Semaphore>,
    document_semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Self {
        debug!("🔧 Concurrency configuration:");
        debug!("  • Images: {} concurrent workers", config.workers);
        debug!("  • Videos: {} concurrent transcodes", config.max_concurrent_transcodes);
        debug!("  • Documents: 1 worker");

        Self {
            image_semaphore: Arc::new(Semaphore::new(config.workers)),
            video_semaphore: Arc::new(Semaphore::new(config.max_concurrent_transcodes)),
            document_semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    fn semaphore(&self, kind: MediaKind) -> &Arc<Semaphore> {
        match kind {
            MediaKind::Image => &self.image_semaphore,
            MediaKind::Video => &self.video_semaphore,
            MediaKind::Document => &self.document_semaphore,
        }
    }

    /// Wait for a free slot of the given kind
    pub async fn acquire(&self, kind: MediaKind, path: &Path) -> Result<WorkPermit, CompressError> {
        let semaphore = self.semaphore(kind);
        if semaphore.available_permits() == 0 {
            info!("⏳ Waiting for a free {} worker: {}", kind, path.display());
        }

        let permit = Arc::clone(semaphore)
            .acquire_owned()
            .await
            .map_err(|e| CompressError::Worker(e.to_string()))?;
        debug!("Acquired {} permit for {}", kind, path.display());

        Ok(WorkPermit { kind, _permit: permit })
    }

    pub fn available(&self, kind: MediaKind) -> usize {
        self.semaphore(kind).available_permits()
    }
}

/// Slot held by a running task, released on drop
pub struct WorkPermit {
    kind: MediaKind,
    _permit: OwnedSemaphorePermit,
}

impl Drop for WorkPermit {
    fn drop(&mut self) {
        debug!("Released {} permit", self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_permits_per_kind() {
        let config = Config {
            workers: 3,
            max_concurrent_transcodes: 2,
            ..Default::default()
        };
        let pool = WorkerPool::new(&config);

        assert_eq!(pool.available(MediaKind::Image), 3);
        assert_eq!(pool.available(MediaKind::Video), 2);
        assert_eq!(pool.available(MediaKind::Document), 1);

        let permit = pool.acquire(MediaKind::Video, Path::new("clip.mp4")).await.unwrap();
        assert_eq!(pool.available(MediaKind::Video), 1);
        assert_eq!(pool.available(MediaKind::Image), 3);

        drop(permit);
        assert_eq!(pool.available(MediaKind::Video), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let pool = WorkerPool::new(&Config::default());
        let held = pool.acquire(MediaKind::Document, Path::new("a.pdf")).await.unwrap();

        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            pool.acquire(MediaKind::Document, Path::new("b.pdf")),
        )
        .await;
        assert!(waiting.is_err());

        drop(held);
        tokio_test::assert_ok!(pool.acquire(MediaKind::Document, Path::new("b.pdf")).await);
    }
}
