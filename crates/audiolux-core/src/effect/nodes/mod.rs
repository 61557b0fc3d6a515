//! Built-in effect nodes
//!
//! Modules with more than one input port are public so their port
//! constants can be used when wiring a graph by hand.

mod afterglow;
mod audio_input;
mod color_wheel;
pub mod interpolate;
pub mod level_meter;
mod mirror;
pub mod moving_light;
mod shift;
pub mod spectrum;
mod static_color;

pub use afterglow::AfterglowNode;
pub use audio_input::AudioInputNode;
pub use color_wheel::ColorWheelNode;
pub use interpolate::{InterpolateNode, InterpolationSpace};
pub use level_meter::{LevelMeterNode, MeterMode};
pub use mirror::{mirror_into, MirrorNode};
pub use moving_light::MovingLightNode;
pub use shift::ShiftNode;
pub use spectrum::SpectrumNode;
pub use static_color::StaticColorNode;
