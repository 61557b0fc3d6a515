//! Color generators - pure functions of time and pixel position

use std::f32::consts::PI;

use super::convert::{hls_to_rgb, hsv_to_sample, sample_to_hsv, Hsv};
use crate::types::{ColorSample, PixelBuffer, MAX_CHANNEL_VALUE};

/// Lightness used by the color wheels (fully saturated, mid lightness)
const WHEEL_LIGHTNESS: f32 = 0.5;
const WHEEL_SATURATION: f32 = 1.0;

/// A source of colors over time and pixel index
pub trait ColorGenerator: Send {
    /// Color of `pixel` at time `t` (seconds)
    fn color_at(&self, t: f32, pixel: usize) -> ColorSample;

    /// Colors of `num_pixels` pixels at time `t`
    fn color_array(&self, t: f32, num_pixels: usize) -> PixelBuffer {
        PixelBuffer::from_vec((0..num_pixels).map(|i| self.color_at(t, i)).collect())
    }
}

/// A constant color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticColor {
    pub color: ColorSample,
}

impl StaticColor {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: ColorSample::new(r, g, b),
        }
    }
}

impl ColorGenerator for StaticColor {
    fn color_at(&self, _t: f32, _pixel: usize) -> ColorSample {
        self.color
    }

    fn color_array(&self, _t: f32, num_pixels: usize) -> PixelBuffer {
        PixelBuffer::filled(num_pixels, self.color)
    }
}

/// Hue rotating through the full wheel once per `cycle_time` seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorWheel {
    /// Seconds per full hue rotation
    pub cycle_time: f32,
    /// Time offset in seconds (shifts the starting hue)
    pub offset: f32,
}

impl Default for ColorWheel {
    fn default() -> Self {
        Self {
            cycle_time: 30.0,
            offset: 0.0,
        }
    }
}

impl ColorWheel {
    pub fn new(cycle_time: f32, offset: f32) -> Self {
        Self { cycle_time, offset }
    }

    /// Normalized hue at time `t`
    pub fn hue(&self, t: f32) -> f32 {
        if self.cycle_time <= 0.0 {
            return 0.0;
        }
        (t + self.offset).rem_euclid(self.cycle_time) / self.cycle_time
    }

    /// Wheel color at time `t` (same for every pixel)
    pub fn color(&self, t: f32) -> ColorSample {
        let (r, g, b) = hls_to_rgb(self.hue(t), WHEEL_LIGHTNESS, WHEEL_SATURATION);
        ColorSample::new(r, g, b) * MAX_CHANNEL_VALUE
    }
}

impl ColorGenerator for ColorWheel {
    fn color_at(&self, t: f32, _pixel: usize) -> ColorSample {
        self.color(t)
    }

    fn color_array(&self, t: f32, num_pixels: usize) -> PixelBuffer {
        PixelBuffer::filled(num_pixels, self.color(t))
    }
}

/// Color wheel whose amplitude follows `sin(2*pi*t / cycle_time_dim)`
///
/// The negative half of the sine produces negative channel values. They
/// are not clamped here; consumers clamp at their output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulsingColorWheel {
    pub wheel: ColorWheel,
    /// Seconds per full brightness period
    pub cycle_time_dim: f32,
}

impl Default for PulsingColorWheel {
    fn default() -> Self {
        Self {
            wheel: ColorWheel::default(),
            cycle_time_dim: 10.0,
        }
    }
}

impl PulsingColorWheel {
    pub fn new(cycle_time: f32, offset: f32, cycle_time_dim: f32) -> Self {
        Self {
            wheel: ColorWheel::new(cycle_time, offset),
            cycle_time_dim,
        }
    }

    /// Amplitude factor at time `t` (-1.0..=1.0)
    pub fn dim(&self, t: f32) -> f32 {
        if self.cycle_time_dim <= 0.0 {
            return 1.0;
        }
        (2.0 * PI * t / self.cycle_time_dim).sin()
    }

    pub fn color(&self, t: f32) -> ColorSample {
        self.wheel.color(t) * self.dim(t)
    }
}

impl ColorGenerator for PulsingColorWheel {
    fn color_at(&self, t: f32, _pixel: usize) -> ColorSample {
        self.color(t)
    }

    fn color_array(&self, t: f32, num_pixels: usize) -> PixelBuffer {
        PixelBuffer::filled(num_pixels, self.color(t))
    }
}

/// Fraction of the way from the first to the last pixel
#[inline]
pub(crate) fn pixel_fraction(pixel: usize, num_pixels: usize) -> f32 {
    if num_pixels <= 1 {
        0.0
    } else {
        pixel as f32 / (num_pixels - 1) as f32
    }
}

/// Linear RGB gradient between two endpoint colors
///
/// Pixel 0 is exactly `min`, pixel `num_pixels - 1` exactly `max`.
pub fn gradient_rgb(min: ColorSample, max: ColorSample, num_pixels: usize) -> PixelBuffer {
    let mut out = PixelBuffer::zeros(num_pixels);
    for (i, p) in out.iter_mut().enumerate() {
        *p = endpoint_or(i, num_pixels, min, max)
            .unwrap_or_else(|| min.lerp(&max, pixel_fraction(i, num_pixels)));
    }
    out
}

/// HSV gradient between two endpoint colors
///
/// Hue, saturation and value are interpolated independently (no shortest
/// path around the wheel). Endpoints are emitted verbatim.
pub fn gradient_hsv(min: ColorSample, max: ColorSample, num_pixels: usize) -> PixelBuffer {
    let a = sample_to_hsv(&min);
    let b = sample_to_hsv(&max);
    let mut out = PixelBuffer::zeros(num_pixels);
    for (i, p) in out.iter_mut().enumerate() {
        *p = endpoint_or(i, num_pixels, min, max).unwrap_or_else(|| {
            let f = pixel_fraction(i, num_pixels);
            hsv_to_sample(Hsv::new(
                a.h + (b.h - a.h) * f,
                a.s + (b.s - a.s) * f,
                a.v + (b.v - a.v) * f,
            ))
        });
    }
    out
}

#[inline]
fn endpoint_or(i: usize, n: usize, min: ColorSample, max: ColorSample) -> Option<ColorSample> {
    if i == 0 {
        Some(min)
    } else if i + 1 == n {
        Some(max)
    } else {
        None
    }
}

/// Linear RGB interpolation between two generators across the strip
///
/// Known limitation: large hue differences pass through muddy, desaturated
/// colors. Prefer [`InterpolateHsv`] when smoothness matters.
pub struct InterpolateRgb {
    pub min: Box<dyn ColorGenerator>,
    pub max: Box<dyn ColorGenerator>,
    pub num_pixels: usize,
}

impl InterpolateRgb {
    pub fn new(min: Box<dyn ColorGenerator>, max: Box<dyn ColorGenerator>, num_pixels: usize) -> Self {
        Self { min, max, num_pixels }
    }
}

impl ColorGenerator for InterpolateRgb {
    fn color_at(&self, t: f32, pixel: usize) -> ColorSample {
        let a = self.min.color_at(t, pixel);
        let b = self.max.color_at(t, pixel);
        endpoint_or(pixel, self.num_pixels, a, b)
            .unwrap_or_else(|| a.lerp(&b, pixel_fraction(pixel, self.num_pixels)))
    }

    fn color_array(&self, t: f32, num_pixels: usize) -> PixelBuffer {
        let a = self.min.color_array(t, num_pixels);
        let b = self.max.color_array(t, num_pixels);
        let mut out = PixelBuffer::zeros(num_pixels);
        for (i, p) in out.iter_mut().enumerate() {
            *p = endpoint_or(i, num_pixels, a[i], b[i])
                .unwrap_or_else(|| a[i].lerp(&b[i], pixel_fraction(i, num_pixels)));
        }
        out
    }
}

/// HSV interpolation between two generators across the strip
///
/// Endpoint colors are sampled at pixel 0 of each generator.
pub struct InterpolateHsv {
    pub min: Box<dyn ColorGenerator>,
    pub max: Box<dyn ColorGenerator>,
    pub num_pixels: usize,
}

impl InterpolateHsv {
    pub fn new(min: Box<dyn ColorGenerator>, max: Box<dyn ColorGenerator>, num_pixels: usize) -> Self {
        Self { min, max, num_pixels }
    }
}

impl ColorGenerator for InterpolateHsv {
    fn color_at(&self, t: f32, pixel: usize) -> ColorSample {
        let buffer = self.color_array(t, self.num_pixels);
        if pixel < buffer.len() {
            buffer[pixel]
        } else {
            ColorSample::BLACK
        }
    }

    fn color_array(&self, t: f32, num_pixels: usize) -> PixelBuffer {
        gradient_hsv(self.min.color_at(t, 0), self.max.color_at(t, 0), num_pixels)
    }
}
