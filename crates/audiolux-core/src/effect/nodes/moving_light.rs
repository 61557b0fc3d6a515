//! Moving light - band-passed audio energy injected at the origin and
//! scrolled along the strip

use crate::dsp::filter::FilterState;
use crate::dsp::level::rms;
use crate::dsp::smoothing::GaussianKernel;
use crate::effect::{
    write_pixels, EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind, Staged,
};
use crate::error::{ConfigResult, StreamResult};
use crate::types::{ColorSample, PixelBuffer};

const PARAM_SPEED: usize = 0;
const PARAM_DIM_TIME: usize = 1;
const PARAM_LOWCUT: usize = 2;
const PARAM_HIGHCUT: usize = 3;

/// Input port carrying audio
pub const INPUT_AUDIO: usize = 0;
/// Input port carrying the injected color
pub const INPUT_COLOR: usize = 1;

/// Band-pass order (the designed filter has twice as many poles)
const FILTER_ORDER: usize = 3;

/// Smoothing width in pixels
const SMOOTHING_SIGMA: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct LightState {
    pixels: PixelBuffer,
    filter: FilterState,
    last_t: f32,
    last_move_t: f32,
}

/// Injects `color * (2 * rms)^2` at pixel 0 every tick and scrolls the
/// strip away from the origin at `speed` pixels per second
///
/// Parameters:
/// - speed: Scroll speed in pixels per second (0 = stationary)
/// - dim_time: Seconds for a pixel to fade to black
/// - lowcut_hz, highcut_hz: Band of the audio that drives the light
///
/// Moving is a one-shot action per tick: once at least one whole pixel of
/// travel has accumulated the strip shifts by that many pixels and the
/// move timer restarts.
pub struct MovingLightNode {
    base: NodeBase,
    num_pixels: usize,
    sample_rate: f32,
    t: f32,
    band: (f32, f32),
    state: Staged<LightState>,
    kernel: GaussianKernel,
    filtered: Vec<f32>,
}

impl MovingLightNode {
    pub fn new(
        num_pixels: usize,
        sample_rate: f32,
        speed: f32,
        dim_time: f32,
        lowcut_hz: f32,
        highcut_hz: f32,
    ) -> ConfigResult<Self> {
        let info = NodeInfo::new("Moving Light", "Audio")
            .with_param(
                ParamInfo::new("speed", 0.05)
                    .with_range(0.0, 200.0)
                    .with_unit("px/s"),
            )
            .with_param(
                ParamInfo::new("dim_time", 0.33)
                    .with_range(0.01, 60.0)
                    .with_unit("s"),
            )
            .with_param(
                ParamInfo::new("lowcut_hz", 0.02)
                    .with_range(1.0, 2000.0)
                    .with_unit("Hz"),
            )
            .with_param(
                ParamInfo::new("highcut_hz", 0.015)
                    .with_range(10.0, 20000.0)
                    .with_unit("Hz"),
            );
        let mut base = NodeBase::new(info);
        base.set_actual(PARAM_SPEED, speed)?;
        base.set_actual(PARAM_DIM_TIME, dim_time)?;
        base.set_actual(PARAM_LOWCUT, lowcut_hz)?;
        base.set_actual(PARAM_HIGHCUT, highcut_hz)?;

        let filter = FilterState::butter_bandpass(FILTER_ORDER, lowcut_hz, highcut_hz, sample_rate)?;

        Ok(Self {
            base,
            num_pixels,
            sample_rate,
            t: 0.0,
            band: (lowcut_hz, highcut_hz),
            state: Staged::new(Self::initial_state(num_pixels, filter)),
            kernel: GaussianKernel::new(SMOOTHING_SIGMA),
            filtered: Vec::new(),
        })
    }

    fn initial_state(num_pixels: usize, filter: FilterState) -> LightState {
        LightState {
            pixels: PixelBuffer::zeros(num_pixels),
            filter,
            last_t: 0.0,
            last_move_t: 0.0,
        }
    }

    fn speed(&self) -> f32 {
        self.base.param_actual(PARAM_SPEED)
    }

    fn dim_time(&self) -> f32 {
        self.base.param_actual(PARAM_DIM_TIME)
    }

    /// Redesign the band-pass if its edges were modulated
    ///
    /// An invalid band keeps the previous filter. The delay line restarts
    /// from rest with the new coefficients.
    fn refresh_filter(&mut self) {
        let band = (
            self.base.param_actual(PARAM_LOWCUT),
            self.base.param_actual(PARAM_HIGHCUT),
        );
        if band == self.band {
            return;
        }
        self.band = band;
        match FilterState::butter_bandpass(FILTER_ORDER, band.0, band.1, self.sample_rate) {
            Ok(filter) => self.state.committed_mut().filter = filter,
            Err(e) => log::warn!("Moving light: keeping previous band-pass: {}", e),
        }
    }
}

/// Scroll `pixels` by `shift` away from pixel 0, filling the vacated
/// pixels with the new edge pixel
fn shift_away(pixels: &mut [ColorSample], shift: usize) {
    let n = pixels.len();
    if n < 2 || shift == 0 {
        return;
    }
    let shift = shift.min(n - 1);
    pixels.copy_within(..n - shift, shift);
    let edge = pixels[shift];
    pixels[..shift].fill(edge);
}

impl EffectNode for MovingLightNode {
    fn num_input_channels(&self) -> usize {
        2
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn input_kind(&self, port: usize) -> SignalKind {
        match port {
            INPUT_AUDIO => SignalKind::audio(self.sample_rate),
            _ => SignalKind::Pixels,
        }
    }

    fn output_kind(&self, _port: usize) -> SignalKind {
        SignalKind::Pixels
    }

    fn update(&mut self, dt: f32) {
        self.state.commit();
        self.refresh_filter();
        self.t += dt;
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let (t, speed, dim_time) = (self.t, self.speed(), self.dim_time());
        let state = self.state.begin();

        match io.audio_input(INPUT_AUDIO) {
            Some(frame) => {
                state.filter.process_block(frame.as_slice(), &mut self.filtered);
            }
            None => self.filtered.clear(),
        }

        let n = state.pixels.len();
        let elapsed = t - state.last_move_t;
        if elapsed * speed >= 1.0 && n > 0 {
            let shift = ((elapsed * speed).floor() as usize).min(n - 1);
            shift_away(state.pixels.as_mut_slice(), shift);
            let edge = (2 * shift).min(n);
            self.kernel.smooth(&mut state.pixels.as_mut_slice()[..edge]);
            state.last_move_t = t;
        }

        let dt = t - state.last_t;
        state.last_t = t;
        state.pixels.scale((1.0 - dt / dim_time).max(0.0));
        self.kernel.smooth(state.pixels.as_mut_slice());
        self.kernel.smooth(state.pixels.as_mut_slice());

        if n > 0 {
            let level = (2.0 * rms(&self.filtered)).powi(2);
            let color = io
                .pixel_input(INPUT_COLOR)
                .and_then(|c| c.as_slice().first().copied())
                .unwrap_or(ColorSample::WHITE);
            state.pixels[0] = color * level;
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
        let mut filter = self.state.committed().filter.clone();
        filter.reset();
        self.state.reset(Self::initial_state(self.num_pixels, filter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::testing::{audio, pixels, run, tick};

    const FS: f32 = 12000.0;

    fn bass_tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 120.0 * i as f32 / FS).sin())
            .collect()
    }

    #[test]
    fn test_shift_away() {
        let mut px: Vec<ColorSample> = (0..5).map(|i| ColorSample::new(i as f32, 0.0, 0.0)).collect();
        shift_away(&mut px, 2);
        let reds: Vec<f32> = px.iter().map(|c| c.r).collect();
        assert_eq!(reds, vec![0.0, 0.0, 0.0, 1.0, 2.0]);

        shift_away(&mut px, 10);
        let reds: Vec<f32> = px.iter().map(|c| c.r).collect();
        assert_eq!(reds, vec![0.0; 5]);
    }

    #[test]
    fn test_loud_bass_lights_origin() {
        let mut node = MovingLightNode::new(30, FS, 10.0, 20.0, 50.0, 300.0).unwrap();
        let red = PixelBuffer::filled(30, ColorSample::new(255.0, 0.0, 0.0));
        let mut out = PixelBuffer::zeros(30);
        for _ in 0..20 {
            out = tick(&mut node, 1.0 / 60.0, &[audio(bass_tone(200, 0.8), FS), pixels(red.clone())], 30);
        }
        assert!(out[0].r > 100.0);
        assert_eq!(out[0].g, 0.0);
        // Light has travelled away from the origin
        assert!(out[3].r > 0.0);
    }

    #[test]
    fn test_silence_decays_monotonically() {
        let mut node = MovingLightNode::new(16, FS, 0.0, 0.1, 50.0, 300.0).unwrap();
        {
            let lit = &mut node.state.committed_mut().pixels;
            for i in 0..16 {
                lit[i] = ColorSample::new(255.0 - i as f32 * 10.0, (i * 15) as f32, 128.0);
            }
        }

        let mut last_peak = f32::MAX;
        let mut last_total = f32::MAX;
        for _ in 0..50 {
            let out = tick(&mut node, 0.02, &[audio(vec![0.0; 200], FS), None], 16);
            let total: f32 = out.as_flat().iter().sum();
            assert!(out.peak() <= last_peak + 1e-3);
            assert!(total <= last_total + 1e-3);
            last_peak = out.peak();
            last_total = total;
        }
        assert!(last_peak < 1.0);
    }

    #[test]
    fn test_process_is_idempotent() {
        let mut node = MovingLightNode::new(10, FS, 50.0, 1.0, 50.0, 300.0).unwrap();
        let inputs = [audio(bass_tone(200, 0.5), FS), None];
        tick(&mut node, 0.05, &inputs, 10);

        node.update(0.05);
        let first = run(&mut node, &inputs, 10);
        let second = run(&mut node, &inputs, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_band_modulation_rebuilds_filter() {
        let mut node = MovingLightNode::new(4, FS, 0.0, 1.0, 50.0, 300.0).unwrap();
        // 1000 Hz highcut: normalized (1000 - 10) / 19990
        node.set_param(PARAM_HIGHCUT, 990.0 / 19990.0);
        node.update(0.01);
        assert!((node.band.1 - 1000.0).abs() < 0.1);
        assert_eq!(
            node.state.committed().filter.kind(),
            crate::dsp::FilterKind::Bandpass { low: 50.0, high: node.band.1 }
        );
    }

    #[test]
    fn test_rejects_band_above_nyquist() {
        assert!(MovingLightNode::new(4, 400.0, 1.0, 1.0, 50.0, 300.0).is_err());
    }
}
