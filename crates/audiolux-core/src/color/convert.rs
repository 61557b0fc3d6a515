//! Color space conversions
//!
//! All components are normalized to 0.0..=1.0. Hue wraps modulo 1.

use crate::types::{ColorSample, MAX_CHANNEL_VALUE};

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRD: f64 = 2.0 / 3.0;

/// Normalized hue/saturation/value triple
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub fn new(h: f32, s: f32, v: f32) -> Self {
        Self { h, s, v }
    }
}

/// Convert hue/lightness/saturation to normalized RGB
///
/// Evaluated in `f64` so hue sector boundaries land exactly where they
/// should (hue 0 gives pure red with no blue bleed).
pub fn hls_to_rgb(h: f32, l: f32, s: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let (h, l, s) = (h as f64, l as f64, s as f64);
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hue_channel(m1, m2, h + ONE_THIRD) as f32,
        hue_channel(m1, m2, h) as f32,
        hue_channel(m1, m2, h - ONE_THIRD) as f32,
    )
}

#[inline]
fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRD {
        m1 + (m2 - m1) * (TWO_THIRD - hue) * 6.0
    } else {
        m1
    }
}

/// Convert normalized RGB to HSV
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> Hsv {
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let v = maxc;
    if minc == maxc {
        return Hsv::new(0.0, 0.0, v);
    }
    let range = maxc - minc;
    let s = range / maxc;
    let rc = (maxc - r) / range;
    let gc = (maxc - g) / range;
    let bc = (maxc - b) / range;
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    Hsv::new((h / 6.0).rem_euclid(1.0), s, v)
}

/// Convert HSV to normalized RGB
pub fn hsv_to_rgb(hsv: Hsv) -> (f32, f32, f32) {
    let Hsv { h, s, v } = hsv;
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Convert a 0..=255 color sample to HSV
pub fn sample_to_hsv(color: &ColorSample) -> Hsv {
    rgb_to_hsv(
        color.r / MAX_CHANNEL_VALUE,
        color.g / MAX_CHANNEL_VALUE,
        color.b / MAX_CHANNEL_VALUE,
    )
}

/// Convert HSV to a 0..=255 color sample
pub fn hsv_to_sample(hsv: Hsv) -> ColorSample {
    let (r, g, b) = hsv_to_rgb(hsv);
    ColorSample::new(r, g, b) * MAX_CHANNEL_VALUE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: (f32, f32, f32), b: (f32, f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5 && (a.2 - b.2).abs() < 1e-5
    }

    #[test]
    fn test_hls_primaries() {
        assert!(approx(hls_to_rgb(0.0, 0.5, 1.0), (1.0, 0.0, 0.0)));
        assert!(approx(hls_to_rgb(1.0 / 3.0, 0.5, 1.0), (0.0, 1.0, 0.0)));
        assert!(approx(hls_to_rgb(2.0 / 3.0, 0.5, 1.0), (0.0, 0.0, 1.0)));
        assert!(approx(hls_to_rgb(0.25, 0.3, 0.0), (0.3, 0.3, 0.3)));
    }

    #[test]
    fn test_hls_wraps_hue() {
        assert!(approx(hls_to_rgb(1.0, 0.5, 1.0), hls_to_rgb(0.0, 0.5, 1.0)));
        assert!(approx(hls_to_rgb(-0.25, 0.5, 1.0), hls_to_rgb(0.75, 0.5, 1.0)));
    }

    #[test]
    fn test_rgb_to_hsv() {
        let hsv = rgb_to_hsv(0.0, 1.0, 0.0);
        assert!((hsv.h - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(hsv.s, 1.0);
        assert_eq!(hsv.v, 1.0);

        let gray = rgb_to_hsv(0.5, 0.5, 0.5);
        assert_eq!(gray, Hsv::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_hsv_roundtrip_is_close() {
        for &(r, g, b) in &[(0.2, 0.4, 0.9), (1.0, 0.5, 0.0), (0.3, 0.3, 0.1), (0.9, 0.1, 0.6)] {
            let back = hsv_to_rgb(rgb_to_hsv(r, g, b));
            assert!(approx(back, (r, g, b)), "{:?} -> {:?}", (r, g, b), back);
        }
    }
}
