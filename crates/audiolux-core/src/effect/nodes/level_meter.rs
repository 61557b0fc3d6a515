//! VU meter nodes - bar length follows the audio level in dB

use crate::dsp::level::{db_to_index, peak, rms, to_db};
use crate::effect::{EffectNode, NodeBase, NodeInfo, NodeIo, ParamInfo, ParamValue, SignalKind};
use crate::error::{ConfigResult, StreamResult};
use crate::types::ColorSample;

const PARAM_DB_RANGE: usize = 0;

/// Input port carrying audio
pub const INPUT_AUDIO: usize = 0;
/// Input port carrying the bar color
pub const INPUT_COLOR: usize = 1;

/// How a block of audio is reduced to one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterMode {
    /// Largest absolute sample
    Peak,
    /// Root mean square
    Rms,
}

/// Lights pixels `[0, index)` with the color input, where `index` maps the
/// block level in dB onto the strip
///
/// Parameters:
/// - db_range: dB span from an empty to a full bar
///
/// An absent audio input reads as silence; an absent color input as white.
pub struct LevelMeterNode {
    base: NodeBase,
    mode: MeterMode,
    num_pixels: usize,
    index: usize,
}

impl LevelMeterNode {
    pub fn new(num_pixels: usize, mode: MeterMode, db_range: f32) -> ConfigResult<Self> {
        let name = match mode {
            MeterMode::Peak => "VU Meter (Peak)",
            MeterMode::Rms => "VU Meter (RMS)",
        };
        let info = NodeInfo::new(name, "Audio").with_param(
            ParamInfo::new("db_range", 0.5)
                .with_range(1.0, 120.0)
                .with_unit("dB"),
        );
        let mut base = NodeBase::new(info);
        base.set_actual(PARAM_DB_RANGE, db_range)?;

        Ok(Self {
            base,
            mode,
            num_pixels,
            index: 0,
        })
    }

    pub fn mode(&self) -> MeterMode {
        self.mode
    }

    /// Bar length computed by the last `process`
    pub fn index(&self) -> usize {
        self.index
    }

    fn db_range(&self) -> f32 {
        self.base.param_actual(PARAM_DB_RANGE)
    }

    /// Bar length for one block of audio
    pub fn level_index(&self, samples: &[f32]) -> usize {
        let level = match self.mode {
            MeterMode::Peak => peak(samples),
            MeterMode::Rms => rms(samples),
        };
        db_to_index(to_db(level), self.db_range(), self.num_pixels)
    }
}

impl EffectNode for LevelMeterNode {
    fn num_input_channels(&self) -> usize {
        2
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn input_kind(&self, port: usize) -> SignalKind {
        match port {
            INPUT_AUDIO => SignalKind::ANY_AUDIO,
            _ => SignalKind::Pixels,
        }
    }

    fn output_kind(&self, _port: usize) -> SignalKind {
        SignalKind::Pixels
    }

    fn update(&mut self, _dt: f32) {}

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        let samples = io.audio_input(INPUT_AUDIO).map(|f| f.as_slice()).unwrap_or(&[]);
        let index = self.level_index(samples);
        self.index = index;

        let color = io.pixel_input(INPUT_COLOR);
        if let Some(out) = io.pixel_output(0) {
            out.fill_black();
            for (i, dst) in out.iter_mut().enumerate().take(index) {
                let src = color
                    .and_then(|c| c.as_slice().get(i).copied())
                    .unwrap_or(ColorSample::WHITE);
                *dst = src.clamped();
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

    fn reset(&mut self) {
        self.index = 0;
    }
}
