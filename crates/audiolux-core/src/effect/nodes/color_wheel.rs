//! Color wheel sources - hue rotating over time, optionally pulsing

use crate::color::{ColorWheel, PulsingColorWheel};
use crate::effect::{EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind};
use crate::error::{ConfigResult, StreamResult};
use crate::types::ColorSample;

const PARAM_CYCLE_TIME: usize = 0;
const PARAM_OFFSET: usize = 1;
const PARAM_CYCLE_TIME_DIM: usize = 2;

/// Longest configurable period in seconds
const MAX_CYCLE_TIME: f32 = 300.0;

/// Fills the strip with the current color of a hue wheel
///
/// Parameters:
/// - cycle_time: Seconds per full hue rotation
/// - offset: Time offset in seconds
/// - cycle_time_dim: Seconds per brightness period (pulsing variant only)
///
/// The pulsing variant swings negative for half of each period; its output
/// is left unclamped like every raw color source.
pub struct ColorWheelNode {
    base: NodeBase,
    num_pixels: usize,
    pulsing: bool,
    t: f32,
    color: ColorSample,
}

impl ColorWheelNode {
    /// Plain hue wheel
    pub fn new(num_pixels: usize, cycle_time: f32, offset: f32) -> ConfigResult<Self> {
        let info = Self::wheel_info("Color Wheel");
        Self::build(info, num_pixels, false, &[cycle_time, offset])
    }

    /// Hue wheel scaled by `sin(2*pi*t / cycle_time_dim)`
    pub fn pulsing(num_pixels: usize, cycle_time: f32, offset: f32, cycle_time_dim: f32) -> ConfigResult<Self> {
        let info = Self::wheel_info("Pulsing Color Wheel").with_param(
            ParamInfo::new("cycle_time_dim", 0.0)
                .with_range(0.1, MAX_CYCLE_TIME)
                .with_unit("s"),
        );
        Self::build(info, num_pixels, true, &[cycle_time, offset, cycle_time_dim])
    }

    fn wheel_info(name: &str) -> NodeInfo {
        NodeInfo::new(name, "Color")
            .with_param(
                ParamInfo::new("cycle_time", 0.1)
                    .with_range(0.1, MAX_CYCLE_TIME)
                    .with_unit("s"),
            )
            .with_param(
                ParamInfo::new("offset", 0.0)
                    .with_range(0.0, MAX_CYCLE_TIME)
                    .with_unit("s"),
            )
    }

    fn build(info: NodeInfo, num_pixels: usize, pulsing: bool, values: &[f32]) -> ConfigResult<Self> {
        let mut base = NodeBase::new(info);
        for (index, &value) in values.iter().enumerate() {
            base.set_actual(index, value)?;
        }
        let mut node = Self {
            base,
            num_pixels,
            pulsing,
            t: 0.0,
            color: ColorSample::BLACK,
        };
        node.color = node.current_color();
        Ok(node)
    }

    fn wheel(&self) -> ColorWheel {
        ColorWheel::new(
            self.base.param_actual(PARAM_CYCLE_TIME),
            self.base.param_actual(PARAM_OFFSET),
        )
    }

    fn current_color(&self) -> ColorSample {
        if self.pulsing {
            PulsingColorWheel {
                wheel: self.wheel(),
                cycle_time_dim: self.base.param_actual(PARAM_CYCLE_TIME_DIM),
            }
            .color(self.t)
        } else {
            self.wheel().color(self.t)
        }
    }
}

impl EffectNode for ColorWheelNode {
    fn num_input_channels(&self) -> usize {
        0
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

    fn update(&mut self, dt: f32) {
        self.t += dt;
        self.color = self.current_color();
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        if let Some(out) = io.pixel_output(0) {
            debug_assert_eq!(out.len(), self.num_pixels);
            out.fill(self.color);
        }
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
        self.t = 0.0;
        self.color = self.current_color();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::tick;

    #[test]
    fn test_wheel_node_starts_red() {
        let mut node = ColorWheelNode::new(4, 30.0, 0.0).unwrap();
        let out = tick(&mut node, 0.0, &[], 4);
        assert!(out.iter().all(|c| *c == ColorSample::new(255.0, 0.0, 0.0)));
    }

    #[test]
    fn test_wheel_node_advances_with_time() {
        let mut node = ColorWheelNode::new(2, 30.0, 0.0).unwrap();
        let out = tick(&mut node, 10.0, &[], 2);
        // A third of the way round: green
        assert!(out[0].g > 254.0 && out[0].r < 1.0);

        node.reset();
        let out = tick(&mut node, 0.0, &[], 2);
        assert_eq!(out[0], ColorSample::new(255.0, 0.0, 0.0));
    }

    #[test]
    fn test_pulsing_node_unclamped() {
        let mut node = ColorWheelNode::pulsing(2, 30.0, 0.0, 10.0).unwrap();
        assert_eq!(node.info().param_count(), 3);
        let out = tick(&mut node, 7.5, &[], 2);
        assert!(out[0].r < 0.0 || out[0].g < 0.0 || out[0].b < 0.0);
    }

    #[test]
    fn test_wheel_rejects_bad_cycle_time() {
        assert!(ColorWheelNode::new(2, 0.0, 0.0).is_err());
    }
}
