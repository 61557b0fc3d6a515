//! Audio preprocessor - anti-alias, decimate and frame a chunk stream
//!
//! Wraps a lazy pull stream of raw chunks at the capture rate and yields
//! one Hann-windowed analysis frame per incoming chunk. Each frame spans
//! the last `n_overlaps` hops of decimated audio, so consecutive frames
//! overlap and their boundaries are tapered.

use std::f32::consts::PI;

use crate::dsp::filter::FilterState;
use crate::error::{ConfigError, ConfigResult, StreamError, StreamResult};
use crate::types::AudioFrame;

/// Order of the anti-aliasing low-pass
pub const ANTI_ALIAS_ORDER: usize = 4;

/// Anti-aliasing cutoff as a fraction of the decimated Nyquist rate
pub const ANTI_ALIAS_FRACTION: f32 = 0.9;

/// Tolerance when comparing chunk sample rates
const RATE_TOLERANCE: f32 = 1e-3;

/// Symmetric Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos()))
            .collect(),
    }
}

/// Decimation factor for a capture rate and highest frequency of interest
///
/// `ds = max(1, floor((fs / 2) / fmax))`
pub fn downsample_factor(sample_rate: f32, fmax: f32) -> usize {
    let ds = ((sample_rate / 2.0) / fmax).floor();
    if ds.is_finite() && ds >= 1.0 {
        ds as usize
    } else {
        1
    }
}

/// Stream adapter producing overlapped, windowed analysis frames
///
/// Restartable only by reconstruction: filter state, decimation phase and
/// history all live here.
pub struct Preprocessor<S> {
    source: S,
    sample_rate: f32,
    ds: usize,
    lowpass: Option<FilterState>,
    /// Index into the next chunk of the first sample to keep
    phase: usize,
    n_overlaps: usize,
    hop: Option<usize>,
    history: Vec<f32>,
    window: Vec<f32>,
    filtered: Vec<f32>,
    decimated: Vec<f32>,
}

impl<S> Preprocessor<S>
where
    S: Iterator<Item = StreamResult<AudioFrame>>,
{
    /// Create a preprocessor for chunks arriving at `sample_rate`
    pub fn new(source: S, sample_rate: f32, fmax: f32, n_overlaps: usize) -> ConfigResult<Self> {
        if !fmax.is_finite() || fmax <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "fmax".to_string(),
                reason: format!("{} is not a positive frequency", fmax),
            });
        }
        if n_overlaps == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_overlaps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let ds = downsample_factor(sample_rate, fmax);
        let lowpass = if ds > 1 {
            let fs_ds = sample_rate / ds as f32;
            Some(FilterState::butter_lowpass(
                ANTI_ALIAS_ORDER,
                ANTI_ALIAS_FRACTION * fs_ds / 2.0,
                sample_rate,
            )?)
        } else {
            None
        };

        log::debug!(
            "Preprocessor: fs={}Hz fmax={}Hz ds={} n_overlaps={}",
            sample_rate,
            fmax,
            ds,
            n_overlaps
        );

        Ok(Self {
            source,
            sample_rate,
            ds,
            lowpass,
            phase: 0,
            n_overlaps,
            hop: None,
            history: Vec::new(),
            window: Vec::new(),
            filtered: Vec::new(),
            decimated: Vec::new(),
        })
    }

    /// Decimation factor
    pub fn downsample(&self) -> usize {
        self.ds
    }

    /// Sample rate of the produced frames
    pub fn output_rate(&self) -> f32 {
        self.sample_rate / self.ds as f32
    }

    /// Length of produced frames, known after the first chunk
    pub fn frame_len(&self) -> Option<usize> {
        self.hop.map(|hop| hop * self.n_overlaps)
    }

    fn process_chunk(&mut self, chunk: &AudioFrame) -> AudioFrame {
        let hop = *self
            .hop
            .get_or_insert_with(|| chunk.len().div_ceil(self.ds).max(1));
        let frame_len = hop * self.n_overlaps;
        if self.history.len() != frame_len {
            self.history = vec![0.0; frame_len];
            self.window = hann_window(frame_len);
        }

        let valid = match self.lowpass.as_mut() {
            Some(filter) => filter.process_block(chunk.as_slice(), &mut self.filtered),
            None => {
                self.filtered.clear();
                self.filtered.extend_from_slice(chunk.as_slice());
                true
            }
        };

        // Keep every ds-th sample, continuing the phase of the last chunk
        self.decimated.clear();
        let len = self.filtered.len();
        let mut i = self.phase;
        while i < len {
            self.decimated.push(self.filtered[i]);
            i += self.ds;
        }
        self.phase = i - len;

        let fresh = self.decimated.len().min(frame_len);
        self.history.copy_within(fresh.., 0);
        let tail = self.decimated.len() - fresh;
        self.history[frame_len - fresh..].copy_from_slice(&self.decimated[tail..]);

        let fs_ds = self.output_rate();
        if !valid {
            return AudioFrame::silence(frame_len, fs_ds);
        }
        let samples = self
            .history
            .iter()
            .zip(self.window.iter())
            .map(|(x, w)| x * w)
            .collect();
        AudioFrame::new(samples, fs_ds)
    }
}

impl<S> Iterator for Preprocessor<S>
where
    S: Iterator<Item = StreamResult<AudioFrame>>,
{
    type Item = StreamResult<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = match self.source.next()? {
            Ok(chunk) => chunk,
            Err(e) => return Some(Err(e)),
        };
        if (chunk.sample_rate() - self.sample_rate).abs() > RATE_TOLERANCE {
            return Some(Err(StreamError::RateMismatch {
                expected: self.sample_rate,
                actual: chunk.sample_rate(),
            }));
        }
        Some(Ok(self.process_chunk(&chunk)))
    }
}
