//! # Record Store Module
//!
//! Questo modulo gestisce il record della submission a cui vengono
//! collegati i file compressi.
//!
//! ## Responsabilità:
//! - Definisce `SubmissionRecord` (email + path dei file caricati)
//! - Aggancia l'esito di una submission al record (`attach`)
//! - Persiste i record tramite il trait `RecordStore`
//!
//! ## Implementazioni:
//! - `JsonRecordStore`: un file JSON per record, in
//!   `~/.upload-compressor/records/record_<hash>.json` (hash SHA-256
//!   dell'email normalizzata)
//! - `MemoryRecordStore`: in memoria, per test e uso come libreria
//!
//! ## Semantica di `attach`:
//! - Immagini e video vengono aggiunti in coda a quelli esistenti
//! - La lettera viene sostituita solo se la submission ne contiene una nuova
//!
//! ## Esempio struttura record:
//! ```json
//! {
//!   "email": "ada@example.com",
//!   "upload_image": ["/uploads/ada/photo.jpg"],
//!   "upload_video": [],
//!   "upload_letter": "/uploads/ada/letter.pdf",
//!   "updated_at": 1642680000
//! }
//! ```

use crate::file_manager::FileManager;
use crate::orchestrator::batch::BatchOutcome;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Record owning the uploaded files of one applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub email: String,
    #[serde(default)]
    pub upload_image: Vec<PathBuf>,
    #[serde(default)]
    pub upload_video: Vec<PathBuf>,
    #[serde(default)]
    pub upload_letter: Option<PathBuf>,
    #[serde(default)]
    pub updated_at: u64,
}

impl SubmissionRecord {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            upload_image: Vec::new(),
            upload_video: Vec::new(),
            upload_letter: None,
            updated_at: now_secs(),
        }
    }

    /// Merge the stored paths of a finished batch into the record
    pub fn attach(&mut self, outcome: &BatchOutcome) {
        self.upload_image.extend(outcome.image_paths());
        self.upload_video.extend(outcome.video_paths());
        if let Some(letter) = outcome.letter_path() {
            self.upload_letter = Some(letter);
        }
        self.updated_at = now_secs();
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Emails are matched case-insensitively, ignoring surrounding whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Persistence of submission records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the record of an email, `None` if there is none
    async fn load(&self, email: &str) -> Result<Option<SubmissionRecord>>;

    async fn save(&self, record: &SubmissionRecord) -> Result<()>;
}

/// One pretty-printed JSON file per record
pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    pub async fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create record directory {}: {}", dir.display(), e))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    /// Store under `~/.upload-compressor/records`
    pub async fn in_home() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(".upload-compressor")
            .join("records");
        Self::new(&dir).await
    }

    pub fn record_path(&self, email: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(normalize_email(email).as_bytes());
        let hash = hex::encode(hasher.finalize())[..16].to_string();
        self.dir.join(format!("record_{}.json", hash))
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn load(&self, email: &str) -> Result<Option<SubmissionRecord>> {
        let path = self.record_path(email);
        if !path.exists() {
            debug!("No record file for {} at {}", email, path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let record: SubmissionRecord = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Corrupted record file {}: {}", path.display(), e))?;

        if normalize_email(&record.email) != normalize_email(email) {
            return Err(anyhow::anyhow!(
                "Record file {} belongs to {}, not {}",
                path.display(),
                record.email,
                email
            ));
        }

        Ok(Some(record))
    }

    async fn save(&self, record: &SubmissionRecord) -> Result<()> {
        let path = self.record_path(&record.email);
        let content = serde_json::to_string_pretty(record)?;

        // One staging file per save; removed on drop if the write fails
        let staging = FileManager::temp_sibling(&path)?;
        fs::write(staging.path(), content)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write record staging file {}: {}", staging.path().display(), e))?;
        FileManager::promote(staging, &path)
            .map_err(|e| anyhow::anyhow!("Failed to replace record file {}: {}", path.display(), e))?;

        debug!("Saved record for {} to {}", record.email, path.display());
        Ok(())
    }
}

/// Records kept in memory, keyed by normalized email
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, SubmissionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: SubmissionRecord) {
        self.records.lock().await.insert(normalize_email(&record.email), record);
    }

    pub async fn get(&self, email: &str) -> Option<SubmissionRecord> {
        self.records.lock().await.get(&normalize_email(email)).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self, email: &str) -> Result<Option<SubmissionRecord>> {
        Ok(self.get(email).await)
    }

    async fn save(&self, record: &SubmissionRecord) -> Result<()> {
        self.insert(record.clone()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressionWarning;
    use crate::job::{CompressionResult, MediaKind};
    use crate::orchestrator::batch::StoredFile;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn stored(kind: MediaKind, path: &str) -> StoredFile {
        let result = CompressionResult::untouched(Path::new(path), 1, 10);
        StoredFile::compressed(kind, Path::new(path), 1, result)
    }

    #[test]
    fn test_attach_appends_media_and_replaces_letter() {
        let mut record = SubmissionRecord::new("ada@example.com");
        record.upload_image.push(PathBuf::from("/u/old.jpg"));
        record.upload_letter = Some(PathBuf::from("/u/old.pdf"));

        let outcome = BatchOutcome {
            images: vec![stored(MediaKind::Image, "/u/new.jpg")],
            videos: vec![stored(MediaKind::Video, "/u/clip.mp4")],
            letter: None,
        };
        record.attach(&outcome);

        assert_eq!(record.upload_image, vec![PathBuf::from("/u/old.jpg"), PathBuf::from("/u/new.jpg")]);
        assert_eq!(record.upload_video, vec![PathBuf::from("/u/clip.mp4")]);
        assert_eq!(record.upload_letter, Some(PathBuf::from("/u/old.pdf")));

        let warning = CompressionWarning::new(MediaKind::Document, Path::new("/u/new.pdf"), "bad xref");
        let outcome = BatchOutcome {
            letter: Some(StoredFile::degraded(Path::new("/u/new.pdf"), 1, warning)),
            ..Default::default()
        };
        record.attach(&outcome);
        assert_eq!(record.upload_letter, Some(PathBuf::from("/u/new.pdf")));
        assert_eq!(record.upload_image.len(), 2);
    }

    #[tokio::test]
    async fn test_json_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path()).await.unwrap();

        assert!(store.load("ada@example.com").await.unwrap().is_none());

        let mut record = SubmissionRecord::new("Ada@Example.com");
        record.upload_video.push(PathBuf::from("/u/clip.mp4"));
        store.save(&record).await.unwrap();

        let loaded = store.load("  ada@example.COM ").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_json_store_concurrent_saves_of_one_record() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonRecordStore::new(dir.path()).await.unwrap());

        for round in 0..20 {
            let saves = (0..8).map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut record = SubmissionRecord::new("ada@example.com");
                    for n in 0..=(round * 8 + i) {
                        record.upload_image.push(PathBuf::from(format!("/u/photo_{}.jpg", n)));
                    }
                    store.save(&record).await
                })
            });

            for result in futures::future::join_all(saves).await {
                tokio_test::assert_ok!(result.unwrap());
            }

            let loaded = store.load("ada@example.com").await.unwrap().unwrap();
            assert!(!loaded.upload_image.is_empty());
            assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_json_store_file_name() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path()).await.unwrap();

        let path = store.record_path("ada@example.com");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("record_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "record_".len() + 16 + ".json".len());
        assert_ne!(path, store.record_path("grace@example.com"));
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path()).await.unwrap();
        std::fs::write(store.record_path("ada@example.com"), "{not json").unwrap();

        tokio_test::assert_err!(store.load("ada@example.com").await);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryRecordStore::new();
        assert!(store.load("ada@example.com").await.unwrap().is_none());

        store.save(&SubmissionRecord::new("ada@example.com")).await.unwrap();
        assert!(store.load("ADA@example.com").await.unwrap().is_some());
    }
}
