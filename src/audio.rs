//! Raw audio artifact writer.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::capture::hooks::AudioFrame;

/// Appends 16-bit PCM frames to a WAV file, finalized on stop.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    samples_written: usize,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;
        Ok(Self {
            writer: Some(writer),
            path,
            samples_written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("failed to write sample to WAV")?;
            }
            self.samples_written += frame.samples.len();
        }
        Ok(())
    }

    pub fn finalize(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("failed to finalize WAV file")?;
            info!(path = %self.path.display(), samples = self.samples_written, "audio artifact saved");
        }
        Ok(self.path.clone())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
