//! Common types for Audiolux
//!
//! This module contains the fundamental buffer types shared by the DSP
//! front-end and the effect graph: audio frames, color samples and pixel
//! buffers.

use std::ops::{Index, IndexMut};

/// Default capture sample rate (48kHz - what most USB interfaces run at)
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Maximum value of a color channel that can be sent to hardware
pub const MAX_CHANNEL_VALUE: f32 = 255.0;

/// Strictly positive floor applied to levels before taking a logarithm.
///
/// `20 * log10(1e-16)` is -320 dB, far below any useful `db_range`.
pub const LEVEL_FLOOR: f32 = 1e-16;

/// Scale factor from signed 16-bit PCM to normalized `f32`
pub const SHORT_NORMALIZE: f32 = 1.0 / 32768.0;

/// Audio sample type (32-bit float, nominally -1.0..=1.0)
pub type Sample = f32;

/// A block of mono audio samples tagged with its sample rate
///
/// Produced by capture or preprocessing and consumed once by the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFrame {
    samples: Vec<Sample>,
    sample_rate: f32,
}

impl AudioFrame {
    /// Create a frame from owned samples
    pub fn new(samples: Vec<Sample>, sample_rate: f32) -> Self {
        Self { samples, sample_rate }
    }

    /// Create a silent frame of the given length
    pub fn silence(len: usize, sample_rate: f32) -> Self {
        Self {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    /// Create a frame from signed 16-bit PCM
    pub fn from_i16(pcm: &[i16], sample_rate: f32) -> Self {
        Self {
            samples: pcm.iter().map(|&s| s as f32 * SHORT_NORMALIZE).collect(),
            sample_rate,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Copy another frame into this one, reusing the allocation
    pub fn copy_from(&mut self, other: &AudioFrame) {
        self.samples.clear();
        self.samples.extend_from_slice(&other.samples);
        self.sample_rate = other.sample_rate;
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// Magnitude bins over a frequency sub-range
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Power per bin, evenly spaced on the warped frequency axis
    pub bins: Vec<f32>,
    /// Lower edge of the represented range (Hz)
    pub f_lo: f32,
    /// Upper edge of the represented range (Hz)
    pub f_hi: f32,
}

impl SpectralFrame {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// A single RGB color value
///
/// Channels are nominally 0..=255 but may transiently leave that range
/// (e.g. a pulsing generator going negative) until a node clamps them.
///
/// Uses `#[repr(C)]` so a `&[ColorSample]` can be viewed as a flat
/// `[r, g, b, r, g, b, ...]` float slice by output drivers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorSample {
    /// Opaque white, the neutral value for an unconnected color input
    pub const WHITE: ColorSample = ColorSample {
        r: MAX_CHANNEL_VALUE,
        g: MAX_CHANNEL_VALUE,
        b: MAX_CHANNEL_VALUE,
    };

    pub const BLACK: ColorSample = ColorSample { r: 0.0, g: 0.0, b: 0.0 };

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Scale all channels by a factor
    #[inline]
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    /// Clamp all channels to the hardware range
    #[inline]
    pub fn clamped(&self) -> Self {
        Self {
            r: self.r.clamp(0.0, MAX_CHANNEL_VALUE),
            g: self.g.clamp(0.0, MAX_CHANNEL_VALUE),
            b: self.b.clamp(0.0, MAX_CHANNEL_VALUE),
        }
    }

    /// Channel-wise maximum
    #[inline]
    pub fn max(&self, other: &Self) -> Self {
        Self {
            r: self.r.max(other.r),
            g: self.g.max(other.g),
            b: self.b.max(other.b),
        }
    }

    /// Linear blend towards `other` (`fact` 0.0 = self, 1.0 = other)
    #[inline]
    pub fn lerp(&self, other: &Self, fact: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * fact,
            g: self.g + (other.g - self.g) * fact,
            b: self.b + (other.b - self.b) * fact,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// Convert to 8-bit channels (clamped, rounded)
    #[inline]
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamped();
        [c.r.round() as u8, c.g.round() as u8, c.b.round() as u8]
    }
}

impl std::ops::Add for ColorSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
        }
    }
}

impl std::ops::AddAssign for ColorSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.r += other.r;
        self.g += other.g;
        self.b += other.b;
    }
}

impl std::ops::Mul<f32> for ColorSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: f32) -> Self {
        self.scale(factor)
    }
}

impl std::ops::MulAssign<f32> for ColorSample {
    #[inline]
    fn mul_assign(&mut self, factor: f32) {
        self.r *= factor;
        self.g *= factor;
        self.b *= factor;
    }
}

/// A strip of pixels
///
/// The length is fixed when the buffer is created; every operation here
/// preserves it. This is the wiring medium between effect nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelBuffer {
    pixels: Vec<ColorSample>,
}

impl PixelBuffer {
    /// Create an all-black buffer
    pub fn zeros(len: usize) -> Self {
        Self {
            pixels: vec![ColorSample::BLACK; len],
        }
    }

    /// Create a buffer with every pixel set to `color`
    pub fn filled(len: usize, color: ColorSample) -> Self {
        Self {
            pixels: vec![color; len],
        }
    }

    pub fn from_vec(pixels: Vec<ColorSample>) -> Self {
        Self { pixels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[ColorSample] {
        &self.pixels
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ColorSample] {
        &mut self.pixels
    }

    /// Zero-copy view as interleaved floats `[r, g, b, r, g, b, ...]`
    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Mutable zero-copy view as interleaved floats
    #[inline]
    pub fn as_flat_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    /// Set every pixel to black
    pub fn fill_black(&mut self) {
        self.pixels.fill(ColorSample::BLACK);
    }

    pub fn fill(&mut self, color: ColorSample) {
        self.pixels.fill(color);
    }

    /// Copy from another buffer of the same length
    pub fn copy_from(&mut self, other: &PixelBuffer) {
        debug_assert_eq!(self.len(), other.len(), "Pixel buffer lengths must match");
        let n = self.len().min(other.len());
        self.pixels[..n].copy_from_slice(&other.pixels[..n]);
    }

    /// Scale all pixels by a factor
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.pixels {
            *p *= factor;
        }
    }

    /// Clamp all channels to 0..=255
    pub fn clamp(&mut self) {
        for p in &mut self.pixels {
            *p = p.clamped();
        }
    }

    /// Element-wise maximum with another buffer
    pub fn max_assign(&mut self, other: &PixelBuffer) {
        for (dst, src) in self.pixels.iter_mut().zip(other.pixels.iter()) {
            *dst = dst.max(src);
        }
    }

    /// Element-wise sum with another buffer
    pub fn add_assign(&mut self, other: &PixelBuffer) {
        for (dst, src) in self.pixels.iter_mut().zip(other.pixels.iter()) {
            *dst += *src;
        }
    }

    /// True if every channel of every pixel is finite
    pub fn is_finite(&self) -> bool {
        self.pixels.iter().all(ColorSample::is_finite)
    }

    /// Brightest channel value in the buffer
    pub fn peak(&self) -> f32 {
        self.as_flat().iter().copied().fold(0.0, f32::max)
    }

    /// Convert to 8-bit RGB triples for an output driver
    pub fn to_rgb8(&self) -> Vec<[u8; 3]> {
        self.pixels.iter().map(ColorSample::to_rgb8).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorSample> {
        self.pixels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ColorSample> {
        self.pixels.iter_mut()
    }
}

impl Index<usize> for PixelBuffer {
    type Output = ColorSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.pixels[index]
    }
}

impl IndexMut<usize> for PixelBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.pixels[index]
    }
}
