//! Smoothing and resampling helpers for short 1-D lines and pixel strips

use crate::types::ColorSample;

/// Kernel radius in standard deviations
const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// Normalized, truncated Gaussian kernel with a reusable scratch line
///
/// Boundaries use half-sample reflection (`d c b a | a b c d | d c b a`).
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    weights: Vec<f32>,
    radius: usize,
    scratch: Vec<ColorSample>,
}

impl GaussianKernel {
    pub fn new(sigma: f32) -> Self {
        let sigma = sigma.max(f32::EPSILON);
        let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as usize;
        let mut weights: Vec<f32> = (0..=2 * radius)
            .map(|i| {
                let x = i as f32 - radius as f32;
                (-0.5 * x * x / (sigma * sigma)).exp()
            })
            .collect();
        let sum: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        Self {
            weights,
            radius,
            scratch: Vec::new(),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Smooth each color channel of `pixels` in place
    pub fn smooth(&mut self, pixels: &mut [ColorSample]) {
        let n = pixels.len();
        if n < 2 {
            return;
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(pixels);

        for (i, out) in pixels.iter_mut().enumerate() {
            let mut acc = ColorSample::BLACK;
            for (k, &w) in self.weights.iter().enumerate() {
                let offset = i as isize + k as isize - self.radius as isize;
                acc += self.scratch[reflect_index(offset, n)] * w;
            }
            *out = acc;
        }
    }
}

/// Half-sample symmetric reflection of an out-of-range index
#[inline]
fn reflect_index(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    i = i.rem_euclid(period);
    if i >= n {
        i = period - 1 - i;
    }
    i as usize
}

/// Convolution truncated to the input length, centered like a
/// "same"-mode convolution (offset `(m - 1) / 2` into the full result)
pub fn convolve_same(signal: &[f32], kernel: &[f32], out: &mut Vec<f32>) {
    out.clear();
    let n = signal.len();
    let m = kernel.len();
    if n == 0 || m == 0 {
        out.resize(n, 0.0);
        return;
    }
    let start = (m - 1) / 2;
    for i in 0..n {
        let k = i + start;
        // full[k] = sum_j signal[j] * kernel[k - j]
        let j_lo = k.saturating_sub(m - 1);
        let j_hi = k.min(n - 1);
        let mut acc = 0.0;
        for j in j_lo..=j_hi {
            acc += signal[j] * kernel[k - j];
        }
        out.push(acc);
    }
}

/// Symmetric Hamming window of length `m`
pub fn hamming(m: usize) -> Vec<f32> {
    match m {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..m)
            .map(|i| {
                0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (m - 1) as f32).cos()
            })
            .collect(),
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`
///
/// `xp` must be increasing. Values outside the range take the nearest
/// endpoint.
pub fn interp(x: f32, xp: &[f32], fp: &[f32]) -> f32 {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len().min(fp.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp[idx] > x; guaranteed in 1..n
    let idx = xp[..n].partition_point(|&v| v <= x);
    let (x0, x1) = (xp[idx - 1], xp[idx]);
    let (y0, y1) = (fp[idx - 1], fp[idx]);
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Linearly resample `input` to `out_len` points spanning the same range
///
/// The first and last output points equal the first and last input points.
pub fn resample_linear(input: &[f32], out_len: usize, out: &mut Vec<f32>) {
    out.clear();
    match (input.len(), out_len) {
        (_, 0) => {}
        (0, _) => out.resize(out_len, 0.0),
        (1, _) => out.resize(out_len, input[0]),
        (_, 1) => out.push(input[0]),
        (n, _) => {
            let step = (n - 1) as f32 / (out_len - 1) as f32;
            for i in 0..out_len {
                let pos = i as f32 * step;
                let lo = (pos.floor() as usize).min(n - 1);
                let hi = (lo + 1).min(n - 1);
                let frac = pos - lo as f32;
                out.push(input[lo] + (input[hi] - input[lo]) * frac);
            }
            out[out_len - 1] = input[n - 1];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_preserves_constant() {
        let mut kernel = GaussianKernel::new(0.5);
        assert_eq!(kernel.radius(), 2);
        let mut pixels = vec![ColorSample::new(10.0, 20.0, 30.0); 7];
        kernel.smooth(&mut pixels);
        for p in &pixels {
            assert!((p.r - 10.0).abs() < 1e-4);
            assert!((p.b - 30.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_gaussian_spreads_impulse() {
        let mut kernel = GaussianKernel::new(0.5);
        let mut pixels = vec![ColorSample::BLACK; 5];
        pixels[2] = ColorSample::new(100.0, 0.0, 0.0);
        kernel.smooth(&mut pixels);

        assert!(pixels[2].r < 100.0);
        assert!(pixels[1].r > 0.0);
        assert!((pixels[1].r - pixels[3].r).abs() < 1e-4);
        let total: f32 = pixels.iter().map(|p| p.r).sum();
        assert!((total - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
    }

    #[test]
    fn test_convolve_same() {
        let mut out = Vec::new();
        convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5], &mut out);
        // full = [0, 1, 2.5, 4, 1.5], centered slice starts at 1
        assert_eq!(out, vec![1.0, 2.5, 4.0]);

        convolve_same(&[1.0, 1.0, 1.0, 1.0, 1.0], &[1.0; 4], &mut out);
        // full = [1, 2, 3, 4, 4, 3, 2, 1], start at 1
        assert_eq!(out, vec![2.0, 3.0, 4.0, 4.0, 3.0]);
    }

    #[test]
    fn test_hamming() {
        let w = hamming(4);
        assert!((w[0] - 0.08).abs() < 1e-6);
        assert!((w[1] - 0.77).abs() < 1e-6);
        assert!((w[1] - w[2]).abs() < 1e-6);
    }

    #[test]
    fn test_interp_and_resample() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [0.0, 10.0, 30.0];
        assert_eq!(interp(-1.0, &xp, &fp), 0.0);
        assert_eq!(interp(2.0, &xp, &fp), 20.0);
        assert_eq!(interp(9.0, &xp, &fp), 30.0);

        let mut out = Vec::new();
        resample_linear(&[0.0, 4.0], 5, &mut out);
        assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        resample_linear(&[1.0, 3.0, 5.0, 7.0], 2, &mut out);
        assert_eq!(out, vec![1.0, 7.0]);
    }
}
