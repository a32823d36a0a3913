//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file usate dai compressori.
//!
//! ## Responsabilità:
//! - Size probe: dimensione in byte di un artifact (guardia di ogni compressore)
//! - File temporanei "sibling" nella stessa directory della destinazione
//! - Sostituzione atomica (rename) del file temporaneo sulla destinazione
//! - Copia dell'originale su una destinazione separata (`copy_into_place`)
//! - Discovery dei file di una submission in una directory
//! - Formattazione human-readable delle dimensioni
//!
//! ## Sicurezza operazioni:
//! - I file temporanei sono `NamedTempFile`: vengono rimossi al drop su ogni
//!   percorso di uscita, successo o errore
//! - Il nome temporaneo ha un suffisso random, quindi job concorrenti non
//!   collidono mai
//! - La destinazione viene sostituita solo con `rename`, mai scritta in place
//!
//! ## Esempio:
//! ```rust,ignore
//! let size = FileManager::size_bytes(&path).await?;
//! let temp = FileManager::temp_sibling(&path)?;
//! // ... scrive su temp.path() ...
//! FileManager::promote(temp, &path)?;
//! ```

use crate::error::CompressError;
use crate::job::UploadedFile;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Prefix of every temporary artifact written next to a destination
pub const TEMP_PREFIX: &str = ".upload-compressor-";

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn size_bytes(path: &Path) -> Result<u64, CompressError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CompressError::io(path, e))?;
        if !metadata.is_file() {
            return Err(CompressError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(metadata.len())
    }

    /// Create a hidden temporary file in the destination's directory.
    ///
    /// The file keeps the destination's extension so that encoders which pick
    /// the container from the file name (ffmpeg) write the right format.
    pub fn temp_sibling(destination: &Path) -> Result<NamedTempFile, CompressError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let suffix = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| CompressError::io(dir, e))
    }

    /// Atomically rename a finished temporary file onto the destination
    pub fn promote(temp: NamedTempFile, destination: &Path) -> Result<(), CompressError> {
        // Tempfiles are created 0600; keep the mode the destination already had
        if let Ok(metadata) = std::fs::metadata(destination) {
            if let Err(e) = temp.as_file().set_permissions(metadata.permissions()) {
                warn!("Could not copy permissions onto {}: {}", temp.path().display(), e);
            }
        }

        let temp_path = temp.path().to_path_buf();
        temp.persist(destination)
            .map_err(|e| CompressError::io(destination, e.error))?;
        debug!("Renamed {} -> {}", temp_path.display(), destination.display());
        Ok(())
    }

    /// Copy `source` onto `destination` through a temp sibling; no-op when they are the same file
    pub async fn copy_into_place(source: &Path, destination: &Path) -> Result<(), CompressError> {
        if source == destination {
            return Ok(());
        }

        let temp = Self::temp_sibling(destination)?;
        tokio::fs::copy(source, temp.path())
            .await
            .map_err(|e| CompressError::io(source, e))?;
        Self::promote(temp, destination)
    }

    /// Check if a path is one of our temporary artifacts
    pub fn is_temp_artifact(path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().starts_with(TEMP_PREFIX))
            .unwrap_or(false)
    }

    /// Temporary artifacts left in a directory (non recursive)
    pub fn leftover_temps(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut leftovers = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if Self::is_temp_artifact(&path) {
                leftovers.push(path);
            }
        }
        Ok(leftovers)
    }

    /// Find all supported uploads in a submission directory, sorted by path
    pub fn collect_uploads(dir: &Path) -> Result<Vec<UploadedFile>> {
        let mut uploads = Vec::new();

        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if Self::is_temp_artifact(path) {
                continue;
            }
            let upload = UploadedFile::from_path(path);
            if upload.kind().is_some() {
                uploads.push(upload);
            } else {
                debug!("Skipping unsupported file: {}", path.display());
            }
        }

        Ok(uploads)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
