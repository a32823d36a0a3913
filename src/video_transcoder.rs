//! # Video Transcoding Module
//!
//! Questo modulo gestisce la ricodifica dei video caricati.
//!
//! ## Responsabilità:
//! - Size probe: i video sotto il ceiling (default 50 MiB) non vengono toccati
//! - Ricodifica single-pass a qualità costante (H.264 / libx264, CRF 28)
//! - Scrittura su file temporaneo e rename atomico sulla destinazione
//! - Timeout per video problematici (il processo ffmpeg viene terminato)
//! - Verifica della dipendenza esterna `ffmpeg`
//!
//! ## Controllo qualità (CRF):
//! - 18-23: Alta qualità
//! - 24-28: Buona qualità (default 28, bilanciato per upload)
//! - 29-35: Qualità accettabile (file piccoli)
//!
//! ## Error handling:
//! A differenza delle immagini, un fallimento video è restituito al chiamante
//! come `CompressError::Transcode` (o `Timeout`): la decisione se tenere
//! l'originale o rifiutare la submission spetta all'orchestratore.
//!
//! ## Esempio:
//! ```rust,ignore
//! let transcoder = VideoTranscoder::new(&config);
//! let job = CompressionJob::in_place(&path, MediaKind::Video, config.video_ceiling_bytes);
//! let result = transcoder.transcode(&job).await?;
//! ```

use crate::config::Config;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::job::{CompressionJob, CompressionResult};
use crate::platform::PlatformCommands;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Long-running re-encode capability
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Re-encode `input` into `output`
    async fn encode(&self, input: &Path, output: &Path) -> Result<(), CompressError>;

    fn name(&self) -> &'static str;
}

/// Encoder backed by an external `ffmpeg` process
pub struct FfmpegEncoder {
    program: PathBuf,
    crf: u8,
    preset: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(config: &Config) -> Self {
        let program = config
            .ffmpeg_path
            .clone()
            .unwrap_or_else(|| PlatformCommands::instance().program("ffmpeg"));

        Self {
            program,
            crf: config.video_crf,
            preset: config.video_preset.clone(),
            timeout: Duration::from_secs(config.video_timeout_secs),
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_os_string());
        args.extend(
            [
                "-c:v".to_string(),
                "libx264".to_string(),
                "-crf".to_string(),
                self.crf.to_string(),
                "-preset".to_string(),
                self.preset.clone(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, input: &Path, output: &Path) -> Result<(), CompressError> {
        debug!(
            "🎬 Encoding video: {} (CRF: {}, preset: {})",
            input.display(),
            self.crf,
            self.preset
        );

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.build_args(input, output))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let start_time = Instant::now();
        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| CompressError::Timeout {
                path: input.to_path_buf(),
                secs: self.timeout.as_secs(),
            })?;

        let output_data = match result {
            Ok(output_data) => output_data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CompressError::MissingDependency(format!(
                    "{} is required for video processing",
                    self.program.display()
                )));
            }
            Err(e) => {
                return Err(CompressError::Transcode(format!(
                    "Failed to execute {}: {}",
                    self.program.display(),
                    e
                )));
            }
        };

        let duration = start_time.elapsed();
        if !output_data.status.success() {
            let stderr = String::from_utf8_lossy(&output_data.stderr).trim().to_string();
            warn!("❌ ffmpeg failed after {:.1}s: {}", duration.as_secs_f64(), stderr);
            return Err(CompressError::Transcode(if stderr.is_empty() {
                format!("ffmpeg exited with {}", output_data.status)
            } else {
                stderr
            }));
        }

        debug!("Video encode completed in {:.1}s", duration.as_secs_f64());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Single-pass size-bounded video transcoder
#[derive(Clone)]
pub struct VideoTranscoder {
    encoder: Arc<dyn VideoEncoder>,
}

impl VideoTranscoder {
    pub fn new(config: &Config) -> Self {
        Self::with_encoder(Arc::new(FfmpegEncoder::new(config)))
    }

    pub fn with_encoder(encoder: Arc<dyn VideoEncoder>) -> Self {
        Self { encoder }
    }

    /// Re-encode a video that exceeds the job's ceiling
    pub async fn transcode(&self, job: &CompressionJob) -> Result<CompressionResult, CompressError> {
        let ceiling = job.size_ceiling_bytes;
        let original_size = FileManager::size_bytes(&job.source_path).await?;

        if original_size <= ceiling {
            debug!(
                "Video {} already under ceiling ({})",
                job.source_path.display(),
                FileManager::format_size(original_size)
            );
            return Ok(CompressionResult::untouched(&job.source_path, original_size, ceiling));
        }

        info!(
            "🎬 Transcoding video {} with {} ({} > {})",
            job.source_path.display(),
            self.encoder.name(),
            FileManager::format_size(original_size),
            FileManager::format_size(ceiling)
        );

        // Removed on drop if anything below fails
        let temp = FileManager::temp_sibling(&job.destination_path)?;
        self.encoder.encode(&job.source_path, temp.path()).await?;

        let new_size = FileManager::size_bytes(temp.path()).await?;
        if new_size == 0 {
            return Err(CompressError::Transcode(format!(
                "encoder produced an empty file for {}",
                job.source_path.display()
            )));
        }

        if new_size >= original_size {
            warn!(
                "Transcoded video is not smaller than {} ({} >= {}), keeping original",
                job.source_path.display(),
                FileManager::format_size(new_size),
                FileManager::format_size(original_size)
            );
            return Ok(CompressionResult::compressed(&job.source_path, original_size, 1, ceiling));
        }

        FileManager::promote(temp, &job.destination_path)?;

        info!(
            "✅ Video {}: {} -> {} ({:.1}% saved)",
            job.destination_path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(new_size),
            FileManager::calculate_reduction(original_size, new_size)
        );

        Ok(CompressionResult::compressed(&job.destination_path, new_size, 1, ceiling))
    }

    /// Check that ffmpeg can be spawned
    pub async fn check_dependencies(config: &Config) -> Result<(), CompressError> {
        let available = match config.ffmpeg_path {
            Some(ref path) => path.is_file(),
            None => PlatformCommands::instance().is_command_available("ffmpeg").await,
        };

        if available {
            Ok(())
        } else {
            Err(CompressError::MissingDependency(
                "ffmpeg is required for video processing".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MediaKind;
    use crate::testing::{write_sized, FakeEncoder};
    use tempfile::TempDir;

    const MIB: u64 = 1024 * 1024;

    fn job(path: &Path, ceiling: u64) -> CompressionJob {
        CompressionJob::in_place(path, MediaKind::Video, ceiling)
    }

    #[tokio::test]
    async fn test_under_ceiling_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.mp4");
        write_sized(&path, 4_000);
        let encoder = Arc::new(FakeEncoder::producing(1_000));

        let result = VideoTranscoder::with_encoder(encoder.clone())
            .transcode(&job(&path, 5_000))
            .await
            .unwrap();

        assert_eq!(result.final_path, path);
        assert_eq!(result.passes_applied, 0);
        assert_eq!(encoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_video_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        write_sized(&path, 60 * MIB);
        let encoder = Arc::new(FakeEncoder::producing(20 * MIB));

        let result = VideoTranscoder::with_encoder(encoder.clone())
            .transcode(&job(&path, 50 * MIB))
            .await
            .unwrap();

        assert_eq!(encoder.calls(), 1);
        assert_eq!(result.passes_applied, 1);
        assert!(result.converged);
        assert_eq!(result.final_path, path);
        assert!(std::fs::metadata(&path).unwrap().len() < 60 * MIB);
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_encoder_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.mov");
        write_sized(&path, 6_000);
        let encoder = Arc::new(FakeEncoder::failing());

        let err = VideoTranscoder::with_encoder(encoder)
            .transcode(&job(&path, 5_000))
            .await
            .unwrap_err();

        match err {
            CompressError::Transcode(message) => assert!(message.contains("Invalid data")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 6_000);
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_larger_output_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        write_sized(&path, 6_000);
        let encoder = Arc::new(FakeEncoder::producing(7_000));

        let result = VideoTranscoder::with_encoder(encoder)
            .transcode(&job(&path, 5_000))
            .await
            .unwrap();

        assert_eq!(result.final_size_bytes, 6_000);
        assert!(!result.converged);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 6_000);
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(FakeEncoder::producing(1));
        let err = VideoTranscoder::with_encoder(encoder)
            .transcode(&job(&dir.path().join("gone.mp4"), 5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::Io { .. }));
    }

    #[test]
    fn test_ffmpeg_args() {
        let encoder = FfmpegEncoder::new(&Config::default());
        let args: Vec<String> = encoder
            .build_args(Path::new("/in/a.mov"), Path::new("/out/.tmp.mov"))
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        let crf_at = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_at + 1], "28");
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/in/a.mov"));
        assert_eq!(args.last().unwrap(), "/out/.tmp.mov");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        write_sized(&path, 6_000);
        let config = Config {
            ffmpeg_path: Some(dir.path().join("no-such-ffmpeg")),
            ..Default::default()
        };

        assert!(VideoTranscoder::check_dependencies(&config).await.is_err());

        let err = VideoTranscoder::new(&config)
            .transcode(&job(&path, 5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::MissingDependency(_)));
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_encoder_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = TempDir::new().unwrap();
        let script = bin_dir.path().join("slow-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        write_sized(&path, 6_000);
        let config = Config {
            ffmpeg_path: Some(script),
            video_timeout_secs: 1,
            ..Default::default()
        };

        let start = Instant::now();
        let err = VideoTranscoder::new(&config)
            .transcode(&job(&path, 5_000))
            .await
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(10));
        match err {
            CompressError::Timeout { path: timed_out, secs } => {
                assert_eq!(timed_out, path);
                assert_eq!(secs, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 6_000);
        assert!(FileManager::leftover_temps(dir.path()).unwrap().is_empty());
    }
}
