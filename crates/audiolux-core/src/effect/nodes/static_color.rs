//! Static color source

use crate::color::{ColorGenerator, StaticColor};
use crate::effect::{EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind};
use crate::error::{ConfigResult, StreamResult};
use crate::types::{ColorSample, MAX_CHANNEL_VALUE};

const PARAM_R: usize = 0;
const PARAM_G: usize = 1;
const PARAM_B: usize = 2;

/// Fills the strip with one constant color
///
/// Parameters:
/// - r, g, b: Channel values (0-255)
pub struct StaticColorNode {
    base: NodeBase,
    num_pixels: usize,
    color: StaticColor,
}

impl StaticColorNode {
    pub fn new(num_pixels: usize, color: ColorSample) -> ConfigResult<Self> {
        let channel = |name: &str| {
            ParamInfo::new(name, 1.0)
                .with_range(0.0, MAX_CHANNEL_VALUE)
        };
        let info = NodeInfo::new("Static Color", "Color")
            .with_param(channel("r"))
            .with_param(channel("g"))
            .with_param(channel("b"));

        let mut base = NodeBase::new(info);
        base.set_actual(PARAM_R, color.r)?;
        base.set_actual(PARAM_G, color.g)?;
        base.set_actual(PARAM_B, color.b)?;

        Ok(Self {
            base,
            num_pixels,
            color: StaticColor { color },
        })
    }

    fn param_color(&self) -> ColorSample {
        ColorSample::new(
            self.base.param_actual(PARAM_R),
            self.base.param_actual(PARAM_G),
            self.base.param_actual(PARAM_B),
        )
    }
}

impl EffectNode for StaticColorNode {
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

    fn update(&mut self, _dt: f32) {
        self.color.color = self.param_color();
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let color = self.color.color_at(0.0, 0);
        if let Some(out) = io.pixel_output(0) {
            debug_assert_eq!(out.len(), self.num_pixels);
            out.fill(color);
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
        self.color.color = self.param_color();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::tick;

    #[test]
    fn test_static_color_fills_strip() {
        let mut node = StaticColorNode::new(5, ColorSample::new(10.0, 20.0, 30.0)).unwrap();
        let out = tick(&mut node, 0.1, &[], 5);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|c| *c == ColorSample::new(10.0, 20.0, 30.0)));
    }

    #[test]
    fn test_static_color_modulation() {
        let mut node = StaticColorNode::new(3, ColorSample::new(0.0, 0.0, 0.0)).unwrap();
        node.set_param(PARAM_G, 1.0);
        let out = tick(&mut node, 0.1, &[], 3);
        assert_eq!(out[0], ColorSample::new(0.0, 255.0, 0.0));
    }

    #[test]
    fn test_static_color_rejects_out_of_range() {
        assert!(StaticColorNode::new(3, ColorSample::new(300.0, 0.0, 0.0)).is_err());
    }
}
