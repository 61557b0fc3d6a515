//! Shift - scroll the accumulated frame one pixel per tick

use crate::effect::{
    write_pixels, EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind, Staged,
};
use crate::error::{ConfigResult, StreamResult};
use crate::types::{ColorSample, PixelBuffer};

const PARAM_DIM_TIME: usize = 0;

#[derive(Debug, Clone, PartialEq)]
struct ShiftState {
    pixels: PixelBuffer,
    last_t: f32,
}

/// Moves everything one pixel away from the origin per tick, fading as it
/// goes, and adds the incoming frame on top
///
/// Parameters:
/// - dim_time: Seconds to fade to black (0 = no fading)
pub struct ShiftNode {
    base: NodeBase,
    num_pixels: usize,
    t: f32,
    state: Staged<ShiftState>,
}

impl ShiftNode {
    pub fn new(num_pixels: usize, dim_time: f32) -> ConfigResult<Self> {
        let info = NodeInfo::new("Shift", "Spatial").with_param(
            ParamInfo::new("dim_time", 0.033)
                .with_range(0.0, 30.0)
                .with_unit("s"),
        );
        let mut base = NodeBase::new(info);
        base.set_actual(PARAM_DIM_TIME, dim_time)?;

        Ok(Self {
            base,
            num_pixels,
            t: 0.0,
            state: Staged::new(Self::initial_state(num_pixels)),
        })
    }

    fn initial_state(num_pixels: usize) -> ShiftState {
        ShiftState {
            pixels: PixelBuffer::zeros(num_pixels),
            last_t: 0.0,
        }
    }

    fn dim_time(&self) -> f32 {
        self.base.param_actual(PARAM_DIM_TIME)
    }
}

impl EffectNode for ShiftNode {
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
        let (t, dim_time) = (self.t, self.dim_time());
        let state = self.state.begin();

        let pixels = state.pixels.as_mut_slice();
        let n = pixels.len();
        if n > 0 {
            pixels.copy_within(..n - 1, 1);
            pixels[0] = ColorSample::BLACK;
        }

        let dt = t - state.last_t;
        state.last_t = t;
        if dim_time > 0.0 {
            state.pixels.scale((1.0 - dt / dim_time).max(0.0));
        }
        if let Some(input) = io.pixel_input(0) {
            state.pixels.add_assign(input);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::{pixels, run, tick};

    fn impulse(n: usize, value: f32) -> PixelBuffer {
        let mut buffer = PixelBuffer::zeros(n);
        buffer[0] = ColorSample::new(value, value, value);
        buffer
    }

    #[test]
    fn test_shift_scrolls_away_from_origin() {
        let mut node = ShiftNode::new(4, 0.0).unwrap();
        tick(&mut node, 0.1, &[pixels(impulse(4, 100.0))], 4);
        let out = tick(&mut node, 0.1, &[None], 4);
        assert_eq!(out[0], ColorSample::BLACK);
        assert_eq!(out[1], ColorSample::new(100.0, 100.0, 100.0));

        let out = tick(&mut node, 0.1, &[None], 4);
        assert_eq!(out[2].r, 100.0);

        // Falls off the far end
        tick(&mut node, 0.1, &[None], 4);
        let out = tick(&mut node, 0.1, &[None], 4);
        assert_eq!(out, PixelBuffer::zeros(4));
    }

    #[test]
    fn test_shift_dims_and_clamps() {
        let mut node = ShiftNode::new(3, 1.0).unwrap();
        tick(&mut node, 0.5, &[pixels(impulse(3, 200.0))], 3);
        let out = tick(&mut node, 0.5, &[pixels(impulse(3, 400.0))], 3);
        assert!((out[1].r - 100.0).abs() < 1e-3);
        assert_eq!(out[0].r, 255.0);
    }

    #[test]
    fn test_long_tick_never_inverts_history() {
        let mut node = ShiftNode::new(3, 0.1).unwrap();
        tick(&mut node, 0.05, &[pixels(PixelBuffer::filled(3, ColorSample::new(200.0, 200.0, 200.0)))], 3);

        // dt well past dim_time: history is gone, input shows through untouched
        let input = PixelBuffer::filled(3, ColorSample::new(100.0, 100.0, 100.0));
        let out = tick(&mut node, 0.5, &[pixels(input.clone())], 3);
        assert_eq!(out, input);
    }

    #[test]
    fn test_process_is_idempotent() {
        let mut node = ShiftNode::new(5, 2.0).unwrap();
        tick(&mut node, 0.1, &[pixels(impulse(5, 50.0))], 5);
        node.update(0.1);
        let inputs = [pixels(impulse(5, 10.0))];
        assert_eq!(run(&mut node, &inputs, 5), run(&mut node, &inputs, 5));
    }
}
