//! Mirror - reflect the lower half of the strip onto the upper half

use crate::effect::{EffectNode, NodeBase, NodeInfo, NodeIo, ParamValue, SignalKind};
use crate::error::StreamResult;
use crate::types::ColorSample;

/// `out[n-1-i] = in[i]` for `i < n/2`; the lower half passes through
///
/// For an odd pixel count the middle pixel is kept. Applying the mirror to
/// its own output changes nothing.
pub struct MirrorNode {
    base: NodeBase,
}

impl MirrorNode {
    pub fn new() -> Self {
        Self {
            base: NodeBase::new(NodeInfo::new("Mirror", "Spatial")),
        }
    }
}

impl Default for MirrorNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror `src` into `dst` (same length)
pub fn mirror_into(src: &[ColorSample], dst: &mut [ColorSample]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    for i in 0..n / 2 {
        dst[n - 1 - i] = src[i];
    }
}

impl EffectNode for MirrorNode {
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

    fn update(&mut self, _dt: f32) {}

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let input = io.pixel_input(0);
        if let Some(out) = io.pixel_output(0) {
            match input {
                Some(input) => {
                    mirror_into(input.as_slice(), out.as_mut_slice());
                    out.clamp();
                }
                None => out.fill_black(),
            }
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

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::{pixels, tick};
    use crate::types::PixelBuffer;

    fn ramp(n: usize) -> PixelBuffer {
        PixelBuffer::from_vec((0..n).map(|i| ColorSample::new(i as f32 * 10.0, 0.0, 0.0)).collect())
    }

    fn reds(buffer: &PixelBuffer) -> Vec<f32> {
        buffer.iter().map(|c| c.r).collect()
    }

    #[test]
    fn test_mirror_even() {
        let mut node = MirrorNode::new();
        let out = tick(&mut node, 0.1, &[pixels(ramp(6))], 6);
        assert_eq!(reds(&out), vec![0.0, 10.0, 20.0, 20.0, 10.0, 0.0]);
    }

    #[test]
    fn test_mirror_odd_keeps_middle() {
        let mut node = MirrorNode::new();
        let out = tick(&mut node, 0.1, &[pixels(ramp(5))], 5);
        assert_eq!(reds(&out), vec![0.0, 10.0, 20.0, 10.0, 0.0]);
    }

    #[test]
    fn test_mirror_idempotent() {
        for n in [1, 2, 7, 8] {
            let mut node = MirrorNode::new();
            let once = tick(&mut node, 0.1, &[pixels(ramp(n))], n);
            let twice = tick(&mut node, 0.1, &[pixels(once.clone())], n);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_mirror_absent_input() {
        let mut node = MirrorNode::new();
        let out = tick(&mut node, 0.1, &[None], 3);
        assert_eq!(out, PixelBuffer::zeros(3));
    }
}
