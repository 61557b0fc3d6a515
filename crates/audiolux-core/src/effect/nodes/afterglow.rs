//! Afterglow - pixels fade out instead of switching off

use crate::effect::{
    write_pixels, EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind, Staged,
};
use crate::error::{ConfigResult, StreamResult};
use crate::types::PixelBuffer;

const PARAM_GLOW_TIME: usize = 0;

#[derive(Debug, Clone, PartialEq)]
struct GlowState {
    pixels: PixelBuffer,
    last_t: f32,
}

/// Holds the brightest recent value of each pixel and lets it decay
/// linearly over `glow_time`
///
/// Parameters:
/// - glow_time: Seconds for a full-brightness pixel to fade to black
pub struct AfterglowNode {
    base: NodeBase,
    num_pixels: usize,
    t: f32,
    state: Staged<GlowState>,
}

impl AfterglowNode {
    pub fn new(num_pixels: usize, glow_time: f32) -> ConfigResult<Self> {
        let info = NodeInfo::new("Afterglow", "Temporal").with_param(
            ParamInfo::new("glow_time", 0.1)
                .with_range(0.01, 30.0)
                .with_unit("s"),
        );
        let mut base = NodeBase::new(info);
        base.set_actual(PARAM_GLOW_TIME, glow_time)?;

        Ok(Self {
            base,
            num_pixels,
            t: 0.0,
            state: Staged::new(Self::initial_state(num_pixels)),
        })
    }

    fn initial_state(num_pixels: usize) -> GlowState {
        GlowState {
            pixels: PixelBuffer::zeros(num_pixels),
            last_t: 0.0,
        }
    }

    fn glow_time(&self) -> f32 {
        self.base.param_actual(PARAM_GLOW_TIME)
    }
}

impl EffectNode for AfterglowNode {
    fn num_input_channels(&self) -> usize {
        1
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
        self.state.commit();
        self.t += dt;
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let glow_time = self.glow_time();
        let t = self.t;
        let state = self.state.begin();

        let dt = t - state.last_t;
        state.last_t = t;
        if dt > 0.0 {
            state.pixels.scale((1.0 - dt / glow_time).max(0.0));
            state.pixels.clamp();
        }
        if let Some(input) = io.pixel_input(0) {
            state.pixels.max_assign(input);
        }
        state.pixels.clamp();

        write_pixels(io, 0, &state.pixels);
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
        self.state.reset(Self::initial_state(self.num_pixels));
    }
}
