//! # Upload Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON + override da CLI)
//! - Costruzione della submission da path espliciti o da una directory
//! - Avvio dell'orchestratore e report finale (testo o JSON)
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (email, file, ceiling, workers, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica la configurazione e applica gli override
//! 4. Verifica ffmpeg se la submission contiene video
//! 5. Comprime la submission e aggiorna il record del richiedente
//!
//! ## Esempio di utilizzo:
//! ```bash
//! upload-compressor --email ada@example.com --image photo.jpg --video clip.mov --letter letter.pdf
//! upload-compressor --email ada@example.com --dir ./uploads/ada --create-record --json
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use upload_compressor::{
    file_manager::FileManager,
    json_output::JsonMessage,
    orchestrator::ProgressTracker,
    platform::PlatformCommands,
    progress::ProgressManager,
    CompressionOrchestrator, Config, JsonRecordStore, MediaKind, RecordStore, SubmissionBatch,
    SubmissionRecord, UploadedFile, VideoFailurePolicy, VideoTranscoder,
};

const MIB: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "upload-compressor")]
#[command(about = "Compress submission uploads under their size ceilings and attach them to the applicant record")]
struct Args {
    /// Email of the applicant owning the record
    #[arg(short, long)]
    email: String,

    /// Image to compress (repeatable)
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Video to transcode (repeatable)
    #[arg(long = "video")]
    videos: Vec<PathBuf>,

    /// PDF letter to compress
    #[arg(long)]
    letter: Option<PathBuf>,

    /// Directory whose supported files are added to the submission
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record store directory (default: ~/.upload-compressor/records)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Create an empty record for the email if none exists
    #[arg(long)]
    create_record: bool,

    /// Number of concurrent image jobs
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of concurrent ffmpeg processes
    #[arg(long)]
    transcodes: Option<usize>,

    /// Video CRF value (0-51, lower = better quality)
    #[arg(long)]
    crf: Option<u8>,

    /// Image size ceiling in MiB
    #[arg(long)]
    image_ceiling_mb: Option<u64>,

    /// Video size ceiling in MiB
    #[arg(long)]
    video_ceiling_mb: Option<u64>,

    /// Document size ceiling in MiB
    #[arg(long)]
    document_ceiling_mb: Option<u64>,

    /// Fail the submission when a video cannot be transcoded
    #[arg(long)]
    reject_failed_videos: bool,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so that JSON lines on stdout stay parseable
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    if let Err(e) = run(args).await {
        if json {
            JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
        }
        return Err(e);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args).await?;
    let batch = build_batch(&args)?;
    debug!("Platform: {}", PlatformCommands::system_info());

    if !batch.videos.is_empty() {
        check_ffmpeg(&config).await;
    }

    let store = match args.store {
        Some(ref dir) => JsonRecordStore::new(dir).await?,
        None => JsonRecordStore::in_home().await?,
    };

    if args.create_record && store.load(&args.email).await?.is_none() {
        store.save(&SubmissionRecord::new(&args.email)).await?;
        info!("Created record for {}", args.email);
    }

    if config.json_output {
        JsonMessage::start(&args.email, &batch, &config).emit();
    } else {
        info!(
            "Starting submission for {}: {} file(s), video failures {}",
            args.email,
            batch.len(),
            match config.video_failure {
                VideoFailurePolicy::KeepOriginal => "keep the original",
                VideoFailurePolicy::Reject => "reject the submission",
            }
        );
    }

    let start_time = Instant::now();
    let json_output = config.json_output;
    let tracker = ProgressTracker::new(batch.len(), json_output);
    let orchestrator = CompressionOrchestrator::new(config)?.with_progress(tracker.clone());

    let result = orchestrator.process_submission(&store, &args.email, batch).await;

    let stats = tracker.stats().await;
    tracker.finish(&stats.format_summary());
    let outcome = result?;
    let duration = start_time.elapsed().as_secs_f64();

    if json_output {
        JsonMessage::complete(&stats, duration).emit();
    } else {
        info!("=== Submission Complete ===");
        info!("Files processed: {}", stats.files_processed);
        info!("Files compressed: {}", stats.files_compressed);
        info!("Files already within ceiling: {}", stats.files_untouched);
        info!("Files kept after a failure: {}", stats.files_degraded);
        info!("Bytes saved: {}", FileManager::format_size(stats.total_bytes_saved));
        info!("Average reduction: {:.2}%", stats.overall_reduction_percent());
        info!("Duration: {:.1}s", duration);
        for warning in outcome.warnings() {
            warn!("⚠️ {}", warning);
        }
    }

    Ok(())
}

/// Config file first, then command line overrides
async fn build_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(transcodes) = args.transcodes {
        config.max_concurrent_transcodes = transcodes;
    }
    if let Some(crf) = args.crf {
        config.video_crf = crf;
    }
    if let Some(mb) = args.image_ceiling_mb {
        config.image_ceiling_bytes = ceiling_bytes("--image-ceiling-mb", mb)?;
    }
    if let Some(mb) = args.video_ceiling_mb {
        config.video_ceiling_bytes = ceiling_bytes("--video-ceiling-mb", mb)?;
    }
    if let Some(mb) = args.document_ceiling_mb {
        config.document_ceiling_bytes = ceiling_bytes("--document-ceiling-mb", mb)?;
    }
    if args.reject_failed_videos {
        config.video_failure = VideoFailurePolicy::Reject;
    }
    config.json_output = args.json;

    config.validate()?;
    Ok(config)
}

fn ceiling_bytes(flag: &str, mb: u64) -> Result<u64> {
    mb.checked_mul(MIB)
        .ok_or_else(|| anyhow::anyhow!("{} {} is too large", flag, mb))
}

fn build_batch(args: &Args) -> Result<SubmissionBatch> {
    let mut uploads = Vec::new();

    if let Some(ref dir) = args.dir {
        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Submission directory does not exist: {}", dir.display()));
        }
        uploads.extend(FileManager::collect_uploads(dir)?);
    }

    for path in &args.images {
        uploads.push(explicit_upload(path, MediaKind::Image)?);
    }
    for path in &args.videos {
        uploads.push(explicit_upload(path, MediaKind::Video)?);
    }
    if let Some(ref path) = args.letter {
        uploads.push(explicit_upload(path, MediaKind::Document)?);
    }

    let batch = SubmissionBatch::from_uploads(uploads)?;
    if batch.is_empty() {
        return Err(anyhow::anyhow!("No files to process: use --image, --video, --letter or --dir"));
    }
    Ok(batch)
}

/// Upload passed with an explicit kind flag; the extension must agree with it
fn explicit_upload(path: &Path, kind: MediaKind) -> Result<UploadedFile> {
    if !path.is_file() {
        return Err(anyhow::anyhow!("File does not exist: {}", path.display()));
    }

    let upload = UploadedFile::from_path(path);
    if upload.kind() != Some(kind) {
        return Err(anyhow::anyhow!("{} is not a supported {} file", path.display(), kind));
    }
    Ok(upload)
}

async fn check_ffmpeg(config: &Config) {
    let spinner = (!config.json_output).then(|| ProgressManager::spinner("Checking ffmpeg..."));
    let result = VideoTranscoder::check_dependencies(config).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if let Err(e) = result {
        warn!("{}; {}", e, config.video_failure.consequence());
    }
}
