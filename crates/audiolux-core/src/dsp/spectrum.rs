//! Spectral analyzer - power spectrum warped onto the Bark scale

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::dsp::smoothing::interp;
use crate::error::{ConfigError, ConfigResult};
use crate::types::{AudioFrame, SpectralFrame};

/// Lower edge of the bass band (C1)
pub const BASS_LO_HZ: f32 = 32.7;

/// Split between bass and melody bands (C4)
pub const BASS_HI_HZ: f32 = 261.0;

/// Convert a frequency in Hz to Bark
#[inline]
pub fn bark(freq: f32) -> f32 {
    13.0 * (0.00076 * freq).atan() + 3.5 * ((freq / 7500.0).powi(2)).atan()
}

/// A validated, non-empty frequency range in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    lo: f32,
    hi: f32,
}

impl FrequencyBand {
    /// Reject non-finite, negative or empty bands
    pub fn new(lo: f32, hi: f32) -> ConfigResult<Self> {
        let invalid = |reason: &str| ConfigError::InvalidBand {
            lo,
            hi,
            reason: reason.to_string(),
        };
        if !lo.is_finite() || !hi.is_finite() {
            return Err(invalid("edges must be finite"));
        }
        if lo < 0.0 {
            return Err(invalid("edges must not be negative"));
        }
        if hi <= lo {
            return Err(invalid("band is empty"));
        }
        Ok(Self { lo, hi })
    }

    /// The bass band `[32.7, 261]` Hz
    pub fn bass() -> Self {
        Self {
            lo: BASS_LO_HZ,
            hi: BASS_HI_HZ,
        }
    }

    /// The melody band `[261, fmax]` Hz
    pub fn melody(fmax: f32) -> ConfigResult<Self> {
        Self::new(BASS_HI_HZ, fmax)
    }

    /// Reject bands reaching above the Nyquist frequency of `sample_rate`
    pub fn check_nyquist(&self, sample_rate: f32) -> ConfigResult<()> {
        let nyquist = sample_rate / 2.0;
        if self.hi > nyquist {
            return Err(ConfigError::InvalidBand {
                lo: self.lo,
                hi: self.hi,
                reason: format!("upper edge above Nyquist ({} Hz)", nyquist),
            });
        }
        Ok(())
    }

    pub fn lo(&self) -> f32 {
        self.lo
    }

    pub fn hi(&self) -> f32 {
        self.hi
    }
}

/// Power spectrum analyzer with a cached FFT plan
///
/// The plan is rebuilt only when the (zero-padded) frame size changes.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft: Option<Arc<dyn Fft<f32>>>,
    fft_size: usize,
    fft_buffer: Vec<Complex<f32>>,
    psd: Vec<f32>,
    bark_axis: Vec<f32>,
    axis_rate: f32,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            fft: None,
            fft_size: 0,
            fft_buffer: Vec::new(),
            psd: Vec::new(),
            bark_axis: Vec::new(),
            axis_rate: 0.0,
        }
    }

    fn prepare(&mut self, n: usize, sample_rate: f32) {
        if self.fft_size != n || self.fft.is_none() {
            self.fft = Some(self.planner.plan_fft_forward(n));
            self.fft_size = n;
            self.fft_buffer = vec![Complex::new(0.0, 0.0); n];
            self.axis_rate = 0.0;
        }
        if self.axis_rate != sample_rate {
            self.bark_axis = (0..=n / 2)
                .map(|k| bark(k as f32 * sample_rate / n as f32))
                .collect();
            self.axis_rate = sample_rate;
        }
    }

    /// One-sided power spectral density of `frame`
    ///
    /// The frame is zero-padded to the next power of two. Returns the PSD
    /// for bins `0..=n/2`; bin `k` is centered on `k * fs / n` Hz.
    pub fn psd(&mut self, frame: &AudioFrame) -> &[f32] {
        let samples = frame.as_slice();
        let fs = frame.sample_rate();
        let n = samples.len().next_power_of_two().max(2);
        self.prepare(n, fs);

        for (dst, &src) in self.fft_buffer.iter_mut().zip(samples.iter()) {
            *dst = Complex::new(src, 0.0);
        }
        for dst in self.fft_buffer.iter_mut().skip(samples.len()) {
            *dst = Complex::new(0.0, 0.0);
        }
        if let Some(fft) = &self.fft {
            fft.process(&mut self.fft_buffer);
        }

        let scale = 1.0 / (fs * n as f32);
        let half = n / 2;
        self.psd.clear();
        self.psd.extend(self.fft_buffer[..=half].iter().enumerate().map(|(k, c)| {
            let p = c.norm_sqr() * scale;
            if k == 0 || k == half {
                p
            } else {
                2.0 * p
            }
        }));
        &self.psd
    }

    /// Power spectrum of `frame` resampled onto `bins` points evenly spaced
    /// in Bark between `bark(band.lo)` and `bark(band.hi)`
    pub fn warped_psd(&mut self, frame: &AudioFrame, band: &FrequencyBand, bins: usize) -> SpectralFrame {
        let mut out = SpectralFrame {
            bins: Vec::with_capacity(bins),
            f_lo: band.lo(),
            f_hi: band.hi(),
        };
        if bins == 0 {
            return out;
        }
        if frame.is_empty() {
            out.bins.resize(bins, 0.0);
            return out;
        }

        self.psd(frame);
        let lo = bark(band.lo());
        let hi = bark(band.hi());
        let step = if bins > 1 { (hi - lo) / (bins - 1) as f32 } else { 0.0 };
        for i in 0..bins {
            let x = lo + step * i as f32;
            out.bins.push(interp(x, &self.bark_axis, &self.psd));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, fs: f32, len: usize) -> AudioFrame {
        let samples = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / fs).sin())
            .collect();
        AudioFrame::new(samples, fs)
    }

    #[test]
    fn test_bark_monotonic() {
        assert_eq!(bark(0.0), 0.0);
        let mut last = 0.0;
        for f in (1..200).map(|i| i as f32 * 50.0) {
            let b = bark(f);
            assert!(b > last);
            last = b;
        }
        assert!((bark(1000.0) - 8.51).abs() < 0.05);
    }

    #[test]
    fn test_band_validation() {
        assert!(FrequencyBand::new(32.7, 261.0).is_ok());
        assert!(FrequencyBand::new(-1.0, 261.0).is_err());
        assert!(FrequencyBand::new(300.0, 300.0).is_err());
        assert!(FrequencyBand::new(f32::NAN, 300.0).is_err());

        let band = FrequencyBand::melody(6000.0).unwrap();
        assert!(band.check_nyquist(12000.0).is_ok());
        assert!(matches!(
            band.check_nyquist(11025.0),
            Err(ConfigError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_psd_parseval() {
        // Unit sine on an exact bin: total power = 0.5
        let fs = 1024.0;
        let frame = tone(64.0, fs, 1024);
        let mut analyzer = SpectrumAnalyzer::new();
        let psd = analyzer.psd(&frame).to_vec();
        assert_eq!(psd.len(), 513);

        let df = fs / 1024.0;
        let total: f32 = psd.iter().sum::<f32>() * df;
        assert!((total - 0.5).abs() < 1e-3, "total power {}", total);

        let (peak_bin, _) = psd
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        assert_eq!(peak_bin, 64);
    }

    #[test]
    fn test_zero_padding() {
        let mut analyzer = SpectrumAnalyzer::new();
        let psd_len = analyzer.psd(&tone(100.0, 12000.0, 1600)).len();
        assert_eq!(psd_len, 2048 / 2 + 1);
    }

    #[test]
    fn test_warped_psd_finds_tone() {
        let fs = 12000.0;
        let mut analyzer = SpectrumAnalyzer::new();
        let band = FrequencyBand::new(BASS_HI_HZ, 6000.0).unwrap();

        let low = analyzer.warped_psd(&tone(400.0, fs, 2048), &band, 64);
        let high = analyzer.warped_psd(&tone(3000.0, fs, 2048), &band, 64);
        assert_eq!(low.len(), 64);
        assert_eq!(low.f_lo, BASS_HI_HZ);
        assert_eq!(low.f_hi, 6000.0);

        let argmax = |f: &SpectralFrame| {
            f.bins
                .iter()
                .enumerate()
                .fold((0, 0.0f32), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc })
                .0
        };
        assert!(argmax(&low) < argmax(&high));
    }

    #[test]
    fn test_silence_and_empty() {
        let mut analyzer = SpectrumAnalyzer::new();
        let band = FrequencyBand::bass();
        let silent = analyzer.warped_psd(&AudioFrame::silence(512, 12000.0), &band, 16);
        assert!(silent.bins.iter().all(|&b| b == 0.0));

        let empty = analyzer.warped_psd(&AudioFrame::new(Vec::new(), 12000.0), &band, 16);
        assert_eq!(empty.bins, vec![0.0; 16]);
    }
}
