//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default uguali ai valori storici della pipeline
//!
//! ## Parametri di configurazione:
//! - `image_ceiling_bytes`: Ceiling immagini (default: 10 MiB)
//! - `image_primary_pass`: Primo pass immagini (default: lato lungo 1920px, qualità 80)
//! - `image_fallback_pass`: Secondo pass immagini (default: lato lungo 1280px, qualità 60)
//! - `video_ceiling_bytes`: Ceiling video (default: 50 MiB)
//! - `video_crf`: CRF H.264 (0-51, default: 28)
//! - `video_preset`: Preset libx264 (default: "medium")
//! - `video_timeout_secs`: Tempo massimo per video (default: 900)
//! - `document_ceiling_bytes`: Ceiling documenti (default: 10 MiB)
//! - `document_max_iterations`: Limite difensivo del loop documenti (default: 10)
//! - `workers`: Compressioni immagine concorrenti (default: 4)
//! - `max_concurrent_transcodes`: Processi ffmpeg concorrenti (default: 1)
//! - `video_failure`: Policy su fallimento video (default: keep_original)
//! - `ffmpeg_path`: Path esplicito di ffmpeg (default: None = PATH)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     video_crf: 30,
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MIB: u64 = 1024 * 1024;

/// Parameters of a single image re-encode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePass {
    /// Target length of the longer edge, in pixels
    pub max_edge: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
}

/// What to do when a video cannot be transcoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFailurePolicy {
    /// Store the uploaded video as-is
    KeepOriginal,
    /// Fail the whole submission
    Reject,
}

impl VideoFailurePolicy {
    /// What happens to a video that cannot be transcoded
    pub fn consequence(&self) -> &'static str {
        match self {
            Self::KeepOriginal => "videos above the ceiling will be kept as uploaded",
            Self::Reject => "submissions with videos above the ceiling will be rejected",
        }
    }
}

/// Configuration for the compression pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub image_ceiling_bytes: u64,
    pub image_primary_pass: ImagePass,
    pub image_fallback_pass: ImagePass,
    pub video_ceiling_bytes: u64,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    pub video_preset: String,
    pub video_timeout_secs: u64,
    pub document_ceiling_bytes: u64,
    /// Hard cap on rewrite attempts, even when every attempt still shrinks
    pub document_max_iterations: u32,
    /// Number of concurrent image jobs
    pub workers: usize,
    /// Number of concurrent ffmpeg processes
    pub max_concurrent_transcodes: usize,
    pub video_failure: VideoFailurePolicy,
    pub ffmpeg_path: Option<PathBuf>,
    /// Output progress and results as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_ceiling_bytes: 10 * MIB,
            image_primary_pass: ImagePass { max_edge: 1920, quality: 80 },
            image_fallback_pass: ImagePass { max_edge: 1280, quality: 60 },
            video_ceiling_bytes: 50 * MIB,
            video_crf: 28,
            video_preset: "medium".to_string(),
            video_timeout_secs: 900,
            document_ceiling_bytes: 10 * MIB,
            document_max_iterations: 10,
            workers: 4,
            max_concurrent_transcodes: 1,
            video_failure: VideoFailurePolicy::KeepOriginal,
            ffmpeg_path: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        for (name, pass) in [
            ("primary", &self.image_primary_pass),
            ("fallback", &self.image_fallback_pass),
        ] {
            if pass.quality == 0 || pass.quality > 100 {
                return Err(anyhow::anyhow!("Image {} pass quality must be between 1 and 100", name));
            }
            if pass.max_edge == 0 {
                return Err(anyhow::anyhow!("Image {} pass edge must be greater than 0", name));
            }
        }

        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if self.video_preset.trim().is_empty() {
            return Err(anyhow::anyhow!("Video preset must not be empty"));
        }

        if self.image_ceiling_bytes == 0 || self.video_ceiling_bytes == 0 || self.document_ceiling_bytes == 0 {
            return Err(anyhow::anyhow!("Size ceilings must be greater than 0"));
        }

        if self.document_max_iterations == 0 {
            return Err(anyhow::anyhow!("Document iteration cap must be greater than 0"));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.max_concurrent_transcodes == 0 {
            return Err(anyhow::anyhow!("Number of concurrent transcodes must be greater than 0"));
        }

        if self.video_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Video timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
