//! Interpolation - gradient across the strip between two colors

use crate::color::{gradient_hsv, gradient_rgb};
use crate::effect::{write_pixels, EffectNode, NodeBase, NodeInfo, NodeIo, ParamValue, SignalKind};
use crate::error::StreamResult;
use crate::types::{ColorSample, PixelBuffer};

/// Input port for the color at pixel 0
pub const INPUT_MIN: usize = 0;
/// Input port for the color at the last pixel
pub const INPUT_MAX: usize = 1;

/// Color space the gradient is computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationSpace {
    Rgb,
    Hsv,
}

/// Spreads a gradient from the min input's pixel 0 to the max input's
/// pixel 0
///
/// With one input unconnected the other passes through; with both
/// unconnected the output is black.
pub struct InterpolateNode {
    base: NodeBase,
    space: InterpolationSpace,
    num_pixels: usize,
    gradient: PixelBuffer,
}

impl InterpolateNode {
    pub fn new(num_pixels: usize, space: InterpolationSpace) -> Self {
        let name = match space {
            InterpolationSpace::Rgb => "Interpolate RGB",
            InterpolationSpace::Hsv => "Interpolate HSV",
        };
        Self {
            base: NodeBase::new(NodeInfo::new(name, "Color")),
            space,
            num_pixels,
            gradient: PixelBuffer::zeros(num_pixels),
        }
    }

    pub fn space(&self) -> InterpolationSpace {
        self.space
    }

    fn endpoints(min: &PixelBuffer, max: &PixelBuffer) -> Option<(ColorSample, ColorSample)> {
        Some((*min.as_slice().first()?, *max.as_slice().first()?))
    }
}

impl EffectNode for InterpolateNode {
    fn num_input_channels(&self) -> usize {
        2
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn input_kind(&self, _port: usize) -> SignalKind {
        SignalKind::Pixels
    }

    fn output_kind(&self, _port: usize) -> SignalKind {
        SignalKind::Pixels
    }

    fn update(&mut self, _dt: f32) {}

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        match (io.pixel_input(INPUT_MIN), io.pixel_input(INPUT_MAX)) {
            (Some(min), Some(max)) => {
                if let Some((a, b)) = Self::endpoints(min, max) {
                    self.gradient = match self.space {
                        InterpolationSpace::Rgb => gradient_rgb(a, b, self.num_pixels),
                        InterpolationSpace::Hsv => gradient_hsv(a, b, self.num_pixels),
                    };
                } else {
                    self.gradient.fill_black();
                }
            }
            (Some(only), None) | (None, Some(only)) => self.gradient.copy_from(only),
            (None, None) => self.gradient.fill_black(),
        }
        self.gradient.clamp();
        write_pixels(io, 0, &self.gradient);
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
        self.gradient.fill_black();
    }
}
