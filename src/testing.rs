//! Fake codecs with deterministic output sizes, shared by the unit tests.

use crate::config::ImagePass;
use crate::document_compressor::DocumentRewriter;
use crate::error::CompressError;
use crate::image_compressor::ImageCodec;
use crate::video_transcoder::VideoEncoder;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn write_sized(path: &Path, size: u64) {
    std::fs::write(path, vec![0x5au8; size as usize]).unwrap();
}

/// Image codec that writes a file of a fixed size per pass edge
#[derive(Default)]
pub struct FakeImageCodec {
    sizes: HashMap<u32, u64>,
    fail: bool,
    calls: Mutex<Vec<ImagePass>>,
}

impl FakeImageCodec {
    pub fn new(sizes: &[(u32, u64)]) -> Self {
        Self {
            sizes: sizes.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ImagePass> {
        self.calls.lock().unwrap().clone()
    }
}

impl ImageCodec for FakeImageCodec {
    fn reencode(&self, input: &Path, output: &Path, pass: ImagePass) -> Result<(), CompressError> {
        self.calls.lock().unwrap().push(pass);
        if self.fail {
            return Err(CompressError::Codec(format!("cannot decode {}", input.display())));
        }
        let size = self.sizes.get(&pass.max_edge).copied().unwrap_or(1);
        write_sized(output, size);
        Ok(())
    }
}

/// Video encoder that writes a fixed-size output, or fails
pub struct FakeEncoder {
    output_size: Option<u64>,
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    inputs: Mutex<Vec<PathBuf>>,
}

impl FakeEncoder {
    pub fn producing(output_size: u64) -> Self {
        Self {
            output_size: Some(output_size),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            output_size: None,
            ..Self::producing(0)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of encodes observed running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoEncoder for FakeEncoder {
    async fn encode(&self, input: &Path, output: &Path) -> Result<(), CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.to_path_buf());
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match self.output_size {
            Some(size) => {
                write_sized(output, size);
                Ok(())
            }
            None => {
                // A crashed encoder may leave a truncated file behind
                write_sized(output, 3);
                Err(CompressError::Transcode("Invalid data found when processing input".to_string()))
            }
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Document rewriter producing a scripted sequence of sizes.
///
/// Once the script is exhausted the last size repeats, or the rewrite fails
/// when built with `failing_after`.
pub struct FakeRewriter {
    sizes: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
    fail_when_exhausted: bool,
    calls: AtomicUsize,
}

impl FakeRewriter {
    pub fn new(sizes: &[u64]) -> Self {
        Self {
            sizes: Mutex::new(sizes.iter().copied().collect()),
            last: Mutex::new(sizes.last().copied().unwrap_or(1)),
            fail_when_exhausted: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(sizes: &[u64]) -> Self {
        Self {
            fail_when_exhausted: true,
            ..Self::new(sizes)
        }
    }

    pub fn failing() -> Self {
        Self::failing_after(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentRewriter for FakeRewriter {
    fn rewrite(&self, input: &Path, output: &Path) -> Result<(), CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.sizes.lock().unwrap().pop_front();
        let size = match next {
            Some(size) => {
                *self.last.lock().unwrap() = size;
                size
            }
            None if self.fail_when_exhausted => {
                return Err(CompressError::Rewrite(format!("invalid xref in {}", input.display())));
            }
            None => *self.last.lock().unwrap(),
        };
        write_sized(output, size);
        Ok(())
    }
}
