//! # Orchestrator Module
//!
//! Separa le responsabilità dell'orchestrazione in sottomoduli:
//! - `compression_orchestrator`: Orchestratore principale della submission
//! - `task_runner`: Worker per singoli file con la policy del tipo
//! - `worker_pool`: Limiti di concorrenza per tipo di media
//! - `progress_tracker`: Gestione progress unificata
//! - `batch`: Input/output dell'orchestratore

pub mod batch;
pub mod compression_orchestrator;
pub mod progress_tracker;
pub mod task_runner;
pub mod worker_pool;

pub use batch::{BatchOutcome, StoredFile, SubmissionBatch};
pub use compression_orchestrator::CompressionOrchestrator;
pub use progress_tracker::ProgressTracker;
pub use task_runner::TaskRunner;
pub use worker_pool::WorkerPool;
