//! Color generation primitives
//!
//! Generators are pure functions of time (seconds) and pixel index that
//! feed the effect graph:
//! - Static colors
//! - Hue wheels (plain and pulsing)
//! - RGB and HSV gradients between two generators

pub mod convert;
pub mod generator;

pub use convert::{hls_to_rgb, hsv_to_rgb, rgb_to_hsv, Hsv};
pub use generator::{
    gradient_hsv, gradient_rgb, ColorGenerator, ColorWheel, InterpolateHsv, InterpolateRgb,
    PulsingColorWheel, StaticColor,
};
