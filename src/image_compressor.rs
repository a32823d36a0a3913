//! # Image Compression Module
//!
//! Questo modulo gestisce la compressione delle immagini caricate con un
//! fallback a due stadi qualità/risoluzione.
//!
//! ## Pipeline di compressione
//!
//! 1. **Size probe**: se il file è già sotto il ceiling non si fa nulla
//!    (la compressione è elettiva, non obbligatoria)
//! 2. **Pass 1**: lato lungo ridotto a 1920px, JPEG qualità 80, su file temporaneo
//! 3. **Pass 2** (solo se il pass 1 è ancora sopra il ceiling): parte dall'output
//!    del pass 1, lato lungo 1280px, JPEG qualità 60
//! 4. **Rename atomico** del risultato migliore sulla destinazione
//!
//! | Pass     | Lato lungo | Qualità | Quando                       |
//! |----------|------------|---------|------------------------------|
//! | primary  | 1920px     | 80      | file sopra il ceiling        |
//! | fallback | 1280px     | 60      | primary ancora sopra ceiling |
//!
//! I valori arrivano da `Config` (`image_primary_pass`, `image_fallback_pass`).
//!
//! ## Garanzie
//!
//! - Il pass 2 non viene mai eseguito se il pass 1 basta (niente perdita di
//!   qualità inutile)
//! - Tra i due output viene tenuto il più piccolo
//! - Se nessun output è più piccolo dell'originale, l'originale resta intatto
//! - Nessun file parziale sulla destinazione: i temporanei vengono rimossi
//!   su ogni percorso di uscita
//!
//! ## Error handling
//!
//! `compress()` restituisce errori tipizzati (`Codec`, `Io`). La policy
//! best-effort (un'immagine rotta non deve bloccare la submission) è applicata
//! dal `TaskRunner`, che converte l'errore in `CompressionWarning`.
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let compressor = ImageCompressor::new(&config);
//! let job = CompressionJob::in_place(&path, MediaKind::Image, config.image_ceiling_bytes);
//! let result = compressor.compress(&job).await?;
//! ```

use crate::config::{Config, ImagePass};
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::job::{CompressionJob, CompressionResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Decode, resize and re-encode capability used by each pass
pub trait ImageCodec: Send + Sync {
    /// Re-encode `input` into `output` with the given pass parameters
    fn reencode(&self, input: &Path, output: &Path, pass: ImagePass) -> Result<(), CompressError>;
}

/// In-process codec built on the `image` crate.
///
/// Always writes baseline JPEG; alpha is dropped.
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn reencode(&self, input: &Path, output: &Path, pass: ImagePass) -> Result<(), CompressError> {
        // Content sniffing: a pass-1 output is JPEG whatever its extension says
        let img = image::io::Reader::open(input)
            .map_err(|e| CompressError::io(input, e))?
            .with_guessed_format()
            .map_err(|e| CompressError::io(input, e))?
            .decode()
            .map_err(|e| CompressError::Codec(format!("{}: {}", input.display(), e)))?;

        let img = fit_longer_edge(img, pass.max_edge);
        let rgb = img.to_rgb8();

        let file = std::fs::File::create(output).map_err(|e| CompressError::io(output, e))?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, pass.quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| CompressError::Codec(format!("{}: {}", output.display(), e)))?;
        writer.flush().map_err(|e| CompressError::io(output, e))?;

        Ok(())
    }
}

/// Shrink so that the longer edge is at most `max_edge`; never upscales
fn fit_longer_edge(img: DynamicImage, max_edge: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_edge {
        return img;
    }
    img.resize(max_edge, max_edge, FilterType::Lanczos3)
}

/// Two-stage size-bounded image compressor
#[derive(Clone)]
pub struct ImageCompressor {
    codec: Arc<dyn ImageCodec>,
    primary: ImagePass,
    fallback: ImagePass,
}

impl ImageCompressor {
    pub fn new(config: &Config) -> Self {
        Self::with_codec(config, Arc::new(RasterCodec))
    }

    pub fn with_codec(config: &Config, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            codec,
            primary: config.image_primary_pass,
            fallback: config.image_fallback_pass,
        }
    }

    /// Compress an image so that it fits under the job's ceiling if possible.
    ///
    /// Returns the untouched source when it is already small enough or when
    /// no pass produced a smaller file.
    pub async fn compress(&self, job: &CompressionJob) -> Result<CompressionResult, CompressError> {
        let ceiling = job.size_ceiling_bytes;
        let original_size = FileManager::size_bytes(&job.source_path).await?;

        if original_size <= ceiling {
            debug!(
                "Image {} already under ceiling ({} <= {})",
                job.source_path.display(),
                FileManager::format_size(original_size),
                FileManager::format_size(ceiling)
            );
            return Ok(CompressionResult::untouched(&job.source_path, original_size, ceiling));
        }

        info!(
            "🖼️ Compressing image {} ({} > {})",
            job.source_path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(ceiling)
        );

        let first = FileManager::temp_sibling(&job.destination_path)?;
        self.run_pass(&job.source_path, first.path(), self.primary).await?;
        let first_size = FileManager::size_bytes(first.path()).await?;
        debug!("Pass 1 produced {}", FileManager::format_size(first_size));

        let (best, best_size, passes) = if first_size > ceiling {
            let second = FileManager::temp_sibling(&job.destination_path)?;
            self.run_pass(first.path(), second.path(), self.fallback).await?;
            let second_size = FileManager::size_bytes(second.path()).await?;
            debug!("Pass 2 produced {}", FileManager::format_size(second_size));

            if second_size < first_size {
                (second, second_size, 2)
            } else {
                warn!(
                    "Pass 2 did not shrink {} ({} >= {}), keeping pass 1 output",
                    job.source_path.display(),
                    second_size,
                    first_size
                );
                (first, first_size, 2)
            }
        } else {
            (first, first_size, 1)
        };

        if best_size == 0 || best_size >= original_size {
            warn!(
                "Re-encoded image is not smaller than {} ({} >= {}), keeping original",
                job.source_path.display(),
                best_size,
                original_size
            );
            return Ok(CompressionResult::compressed(&job.source_path, original_size, passes, ceiling));
        }

        FileManager::promote(best, &job.destination_path)?;

        info!(
            "✅ Image {}: {} -> {} ({:.1}% saved, {} pass{})",
            job.destination_path.display(),
            FileManager::format_size(original_size),
            FileManager::format_size(best_size),
            FileManager::calculate_reduction(original_size, best_size),
            passes,
            if passes == 1 { "" } else { "es" }
        );

        Ok(CompressionResult::compressed(&job.destination_path, best_size, passes, ceiling))
    }

    async fn run_pass(&self, input: &Path, output: &Path, pass: ImagePass) -> Result<(), CompressError> {
        let codec = Arc::clone(&self.codec);
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        let start_time = Instant::now();
        tokio::task::spawn_blocking(move || codec.reencode(&input, &output, pass))
            .await
            .map_err(|e| CompressError::Worker(e.to_string()))??;
        debug!(
            "Image pass (edge {}px, quality {}) completed in {:?}",
            pass.max_edge,
            pass.quality,
            start_time.elapsed()
        );

        Ok(())
    }
}
