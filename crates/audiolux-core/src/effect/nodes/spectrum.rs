//! Spectrum - bass and melody spectra painted across the strip

use crate::dsp::smoothing::{convolve_same, hamming, resample_linear};
use crate::dsp::spectrum::{FrequencyBand, SpectrumAnalyzer};
use crate::effect::{
    write_pixels, EffectNode, NodeBase, NodeInfo, NodeIo, ParamValue, SignalKind, Staged,
};
use crate::error::{ConfigError, ConfigResult, StreamResult};
use crate::types::{ColorSample, PixelBuffer, MAX_CHANNEL_VALUE};

/// Input port carrying preprocessed audio
pub const INPUT_AUDIO: usize = 0;
/// Input port carrying the bass color
pub const INPUT_BASS_COLOR: usize = 1;
/// Input port carrying the melody color
pub const INPUT_MELODY_COLOR: usize = 2;

/// Warped spectrum resolution per band
pub const SPECTRUM_BINS: usize = 64;

/// Seconds of line means kept for normalization
const HISTORY_SECONDS: usize = 6;

/// Width of the box filter smoothing each spectral line
const LINE_SMOOTHING_TAPS: usize = 8;

/// Width of the Hamming window smoothing the resampled line
const FEATURE_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct LineHistory {
    bass: Vec<f32>,
    melody: Vec<f32>,
}

/// Per-line scratch space
#[derive(Debug, Clone, Default)]
struct LineScratch {
    smoothed: Vec<f32>,
    resampled: Vec<f32>,
    shaped: Vec<f32>,
}

/// Paints the bass band `[32.7, 261]` Hz and the melody band
/// `[261, fmax]` Hz, each normalized against a few seconds of its own
/// history, as two colors blended per pixel
///
/// With `mirror_middle` both spectra run from the ends of the strip
/// towards the middle.
pub struct SpectrumNode {
    base: NodeBase,
    num_pixels: usize,
    sample_rate: f32,
    mirror_middle: bool,
    bass_band: FrequencyBand,
    melody_band: FrequencyBand,
    history: Staged<LineHistory>,
    history_len: usize,
    analyzer: SpectrumAnalyzer,
    box_filter: Vec<f32>,
    feature_window: Vec<f32>,
    bass: LineScratch,
    melody: LineScratch,
    pixels: PixelBuffer,
}

impl SpectrumNode {
    /// `sample_rate` is the rate of the (preprocessed) audio feeding the
    /// node; `chunk_rate` the number of frames it delivers per second.
    pub fn new(
        num_pixels: usize,
        sample_rate: f32,
        fmax: f32,
        chunk_rate: usize,
        mirror_middle: bool,
    ) -> ConfigResult<Self> {
        let bass_band = FrequencyBand::bass();
        let melody_band = FrequencyBand::melody(fmax)?;
        melody_band.check_nyquist(sample_rate)?;
        if chunk_rate == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "chunk_rate".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let history_len = chunk_rate * HISTORY_SECONDS;
        Ok(Self {
            base: NodeBase::new(NodeInfo::new("Spectrum", "Audio")),
            num_pixels,
            sample_rate,
            mirror_middle,
            bass_band,
            melody_band,
            history: Staged::new(Self::initial_history(history_len)),
            history_len,
            analyzer: SpectrumAnalyzer::new(),
            box_filter: vec![1.0; LINE_SMOOTHING_TAPS],
            feature_window: hamming(FEATURE_WINDOW),
            bass: LineScratch::default(),
            melody: LineScratch::default(),
            pixels: PixelBuffer::zeros(num_pixels),
        })
    }

    fn initial_history(len: usize) -> LineHistory {
        LineHistory {
            bass: vec![0.0; len],
            melody: vec![0.0; len],
        }
    }

    /// Pixels covered by one resampled line
    fn line_len(&self) -> usize {
        if self.mirror_middle {
            self.num_pixels / 2
        } else {
            self.num_pixels
        }
    }
}

/// Smooth, normalize, resample and shape one spectral line
///
/// Leaves the result (0..=255 per pixel of the line) in `scratch.shaped`.
fn process_line(
    line: &[f32],
    history: &mut [f32],
    scratch: &mut LineScratch,
    box_filter: &[f32],
    feature_window: &[f32],
    out_len: usize,
) {
    convolve_same(line, box_filter, &mut scratch.smoothed);

    let mean = if scratch.smoothed.is_empty() {
        0.0
    } else {
        scratch.smoothed.iter().sum::<f32>() / scratch.smoothed.len() as f32
    };
    if !history.is_empty() {
        history.copy_within(..history.len() - 1, 1);
        history[0] = mean;
    }
    let max = history.iter().copied().fold(0.0f32, f32::max);

    for v in &mut scratch.smoothed {
        *v = if max > 0.0 && max.is_finite() {
            (*v / max).tanh() * MAX_CHANNEL_VALUE
        } else {
            0.0
        };
    }

    resample_linear(&scratch.smoothed, out_len, &mut scratch.resampled);
    convolve_same(&scratch.resampled, feature_window, &mut scratch.shaped);
}

/// Value of pixel `i` of a strip painted from `half`, either mirrored
/// around the middle or directly
#[inline]
fn line_value(half: &[f32], i: usize, n: usize, mirrored: bool) -> f32 {
    if !mirrored {
        return half.get(i).copied().unwrap_or(0.0);
    }
    let h = half.len();
    if h == 0 {
        return 0.0;
    }
    if i < h {
        half[i]
    } else if i >= n - h {
        half[n - 1 - i]
    } else {
        // Odd strip: middle pixel repeats the innermost value
        half[h - 1]
    }
}

impl EffectNode for SpectrumNode {
    fn num_input_channels(&self) -> usize {
        3
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn input_kind(&self, port: usize) -> SignalKind {
        match port {
            INPUT_AUDIO => SignalKind::audio(self.sample_rate),
            _ => SignalKind::Pixels,
        }
    }

    fn output_kind(&self, _port: usize) -> SignalKind {
        SignalKind::Pixels
    }

    fn update(&mut self, _dt: f32) {
        self.history.commit();
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let line_len = self.line_len();
        let (bass_line, melody_line) = match io.audio_input(INPUT_AUDIO) {
            Some(frame) => (
                self.analyzer.warped_psd(frame, &self.bass_band, SPECTRUM_BINS).bins,
                self.analyzer.warped_psd(frame, &self.melody_band, SPECTRUM_BINS).bins,
            ),
            None => (vec![0.0; SPECTRUM_BINS], vec![0.0; SPECTRUM_BINS]),
        };

        let history = self.history.begin();
        process_line(
            &bass_line,
            &mut history.bass,
            &mut self.bass,
            &self.box_filter,
            &self.feature_window,
            line_len,
        );
        process_line(
            &melody_line,
            &mut history.melody,
            &mut self.melody,
            &self.box_filter,
            &self.feature_window,
            line_len,
        );

        let color_of = |port: usize| {
            io.pixel_input(port)
                .and_then(|c| c.as_slice().first().copied())
                .unwrap_or(ColorSample::WHITE)
        };
        let bass_color = color_of(INPUT_BASS_COLOR);
        let melody_color = color_of(INPUT_MELODY_COLOR);

        let n = self.num_pixels;
        for (i, px) in self.pixels.iter_mut().enumerate() {
            let bass = line_value(&self.bass.shaped, i, n, self.mirror_middle);
            let melody = line_value(&self.melody.shaped, i, n, self.mirror_middle);
            *px = bass_color * (bass / MAX_CHANNEL_VALUE) + melody_color * (melody / MAX_CHANNEL_VALUE);
        }
        self.pixels.clamp();

        write_pixels(io, 0, &self.pixels);
        Ok(())
    }

    fn info(&self) -> &NodeInfo {
        self.base.info()
    }

    fn params(&self) -> &[ParamValue] {
        self.base.params()
    }

    fn set_param(&mut self, index: usize, value: f32) {
        self.base.set_param(index, value);
    }

    fn reset(&mut self) {
        self.history.reset(Self::initial_history(self.history_len));
        self.pixels.fill_black();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::{audio, pixels, run, tick};

    const FS: f32 = 12000.0;

    fn tone(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / FS).sin())
            .collect()
    }

    #[test]
    fn test_line_value_mirrors() {
        let half = [1.0, 2.0, 3.0];
        let even: Vec<f32> = (0..6).map(|i| line_value(&half, i, 6, true)).collect();
        assert_eq!(even, vec![1.0, 2.0, 3.0, 3.0, 2.0, 1.0]);
        let odd: Vec<f32> = (0..7).map(|i| line_value(&half, i, 7, true)).collect();
        assert_eq!(odd, vec![1.0, 2.0, 3.0, 3.0, 3.0, 2.0, 1.0]);
        assert_eq!(line_value(&half, 1, 3, false), 2.0);
    }

    #[test]
    fn test_silence_is_dark() {
        let mut node = SpectrumNode::new(20, FS, 6000.0, 60, true).unwrap();
        let out = tick(&mut node, 1.0 / 60.0, &[audio(vec![0.0; 1024], FS), None, None], 20);
        assert_eq!(out, PixelBuffer::zeros(20));
    }

    #[test]
    fn test_colors_follow_their_band() {
        let mut node = SpectrumNode::new(30, FS, 6000.0, 60, false).unwrap();
        let red = PixelBuffer::filled(30, ColorSample::new(255.0, 0.0, 0.0));
        let black = PixelBuffer::zeros(30);
        let inputs = [audio(tone(100.0, 2048), FS), pixels(red), pixels(black)];
        let out = tick(&mut node, 1.0 / 60.0, &inputs, 30);

        assert!(out.iter().all(|c| c.is_finite() && c.g == 0.0 && c.b == 0.0));
        assert!(out.iter().any(|c| c.r > 0.0));
        assert!(out.peak() <= 255.0);
    }

    #[test]
    fn test_mirrored_output_is_symmetric() {
        let mut node = SpectrumNode::new(16, FS, 6000.0, 60, true).unwrap();
        let out = tick(&mut node, 1.0 / 60.0, &[audio(tone(1000.0, 2048), FS), None, None], 16);
        for i in 0..8 {
            assert_eq!(out[i], out[15 - i]);
        }
    }

    #[test]
    fn test_process_is_idempotent() {
        let mut node = SpectrumNode::new(10, FS, 6000.0, 60, true).unwrap();
        let inputs = [audio(tone(440.0, 1024), FS), None, None];
        tick(&mut node, 0.02, &inputs, 10);
        node.update(0.02);
        assert_eq!(run(&mut node, &inputs, 10), run(&mut node, &inputs, 10));
    }

    #[test]
    fn test_rejects_fmax_above_nyquist() {
        assert!(matches!(
            SpectrumNode::new(10, 8000.0, 6000.0, 60, true),
            Err(ConfigError::InvalidBand { .. })
        ));
    }
}
