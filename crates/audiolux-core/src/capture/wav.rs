//! WAV file source
//!
//! Reads a WAV file lazily and yields fixed-size mono chunks, so a
//! recording can stand in for live capture.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavIntoSamples, WavReader};

use super::error::{CaptureError, CaptureResult};
use crate::error::{StreamError, StreamResult};
use crate::types::AudioFrame;

enum Samples {
    Int {
        samples: WavIntoSamples<BufReader<File>, i32>,
        scale: f32,
    },
    Float(WavIntoSamples<BufReader<File>, f32>),
}

impl Samples {
    fn next_sample(&mut self) -> Option<hound::Result<f32>> {
        match self {
            Samples::Int { samples, scale } => samples.next().map(|s| s.map(|v| v as f32 * *scale)),
            Samples::Float(samples) => samples.next(),
        }
    }
}

/// Chunked mono playback of a WAV file
///
/// Multi-channel files are averaged down to mono. The final chunk is
/// zero-padded to full length.
pub struct WavSource {
    samples: Samples,
    channels: usize,
    sample_rate: f32,
    chunk_len: usize,
    frames: u32,
    done: bool,
}

impl WavSource {
    /// Open `path`, yielding chunks of `chunk_len` samples per channel
    pub fn open(path: &Path, chunk_len: usize) -> CaptureResult<Self> {
        if chunk_len == 0 {
            return Err(CaptureError::InvalidChunkLength(chunk_len));
        }

        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        let frames = reader.duration();
        log::info!(
            "WAV source: {:?} ({} ch, {}Hz, {} bit {:?}, {} frames)",
            path,
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample,
            spec.sample_format,
            frames
        );

        let samples = match spec.sample_format {
            SampleFormat::Float => Samples::Float(reader.into_samples()),
            SampleFormat::Int => Samples::Int {
                samples: reader.into_samples(),
                scale: 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32,
            },
        };

        Ok(Self {
            samples,
            channels: spec.channels.max(1) as usize,
            sample_rate: spec.sample_rate as f32,
            chunk_len,
            frames,
            done: false,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Length of the file in samples per channel
    pub fn duration_frames(&self) -> u32 {
        self.frames
    }

    /// Read one interleaved frame and average it; `None` at end of file
    fn next_frame(&mut self) -> Option<hound::Result<f32>> {
        let mut sum = 0.0;
        for ch in 0..self.channels {
            match self.samples.next_sample() {
                Some(Ok(v)) => sum += v,
                Some(Err(e)) => return Some(Err(e)),
                // A truncated last frame counts as the end
                None if ch == 0 => return None,
                None => break,
            }
        }
        Some(Ok(sum / self.channels as f32))
    }
}

impl Iterator for WavSource {
    type Item = StreamResult<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut chunk = Vec::with_capacity(self.chunk_len);
        while chunk.len() < self.chunk_len {
            match self.next_frame() {
                Some(Ok(v)) => chunk.push(v),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(StreamError::Capture(e.to_string())));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if chunk.is_empty() {
            return None;
        }
        chunk.resize(self.chunk_len, 0.0);
        Some(Ok(AudioFrame::new(chunk, self.sample_rate)))
    }
}
