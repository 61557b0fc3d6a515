//! Scene description - the nodes, wiring and output of one graph
//!
//! Scenes are plain data. Parameter values are given in their natural
//! units (seconds, Hz, dB, 0-255); [`crate::graph::build_graph`] turns a
//! scene into a runnable graph.
//!
//! ```yaml
//! num_pixels: 300
//! sample_rate: 48000.0
//! nodes:
//!   - id: audio
//!     kind: audio_input
//!   - id: wheel
//!     kind: color_wheel
//!     cycle_time: 30.0
//!   - id: meter
//!     kind: vu_rms
//!     db_range: 60.0
//! connections:
//!   - { from: { node: audio }, to: { node: meter, port: 0 } }
//!   - { from: { node: wheel }, to: { node: meter, port: 1 } }
//! output: { node: meter }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::graph::{Connection, PortRef};
use crate::types::{DEFAULT_SAMPLE_RATE, MAX_CHANNEL_VALUE};

/// A complete graph description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Length of every pixel buffer in the graph
    pub num_pixels: usize,
    /// Rate of the audio delivered by the sources
    pub sample_rate: f32,
    /// Initial global brightness (0.0-1.0)
    pub brightness: f32,
    pub nodes: Vec<NodeConfig>,
    pub connections: Vec<Connection>,
    /// Pixel output port that becomes the graph's frame
    pub output: PortRef,
}

impl Default for GraphConfig {
    /// Color wheel through an RMS meter into an afterglow
    fn default() -> Self {
        let connect = |from: &str, to: &str, port: usize| Connection {
            from: PortRef::new(from, 0),
            to: PortRef::new(to, port),
        };
        Self {
            num_pixels: 300,
            sample_rate: DEFAULT_SAMPLE_RATE,
            brightness: 1.0,
            nodes: vec![
                NodeConfig::new("audio", NodeKind::AudioInput(AudioInputConfig::default())),
                NodeConfig::new("wheel", NodeKind::ColorWheel(ColorWheelConfig::default())),
                NodeConfig::new("meter", NodeKind::VuRms(LevelMeterConfig::default())),
                NodeConfig::new("glow", NodeKind::Afterglow(AfterglowConfig::default())),
            ],
            connections: vec![
                connect("audio", "meter", 0),
                connect("wheel", "meter", 1),
                connect("meter", "glow", 0),
            ],
            output: PortRef::new("glow", 0),
        }
    }
}

impl GraphConfig {
    /// Check the scene-wide values; per-node values are checked when the
    /// nodes are built
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_pixels == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "num_pixels".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "sample_rate".to_string(),
                reason: format!("{} is not a positive rate", self.sample_rate),
            });
        }
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(ConfigError::InvalidParameter {
                name: "brightness".to_string(),
                reason: format!("{} is outside [0, 1]", self.brightness),
            });
        }
        Ok(())
    }

    /// Ids of the nodes that need an audio source
    pub fn audio_inputs(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::AudioInput(_)))
            .map(|n| n.id.as_str())
    }
}

/// One node of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl NodeConfig {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self { id: id.into(), kind }
    }
}

/// Node type and its construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    AudioInput(AudioInputConfig),
    StaticColor(StaticColorConfig),
    ColorWheel(ColorWheelConfig),
    PulsingColorWheel(PulsingColorWheelConfig),
    VuPeak(LevelMeterConfig),
    VuRms(LevelMeterConfig),
    Afterglow(AfterglowConfig),
    MovingLight(MovingLightConfig),
    Shift(ShiftConfig),
    Mirror,
    InterpolateRgb,
    InterpolateHsv,
    Spectrum(SpectrumConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioInputConfig {
    /// Decimate and window the stream before publishing it
    pub preprocess: bool,
    /// Highest frequency of interest when preprocessing
    pub fmax: f32,
    /// Hops per analysis frame when preprocessing
    pub n_overlaps: usize,
}

impl Default for AudioInputConfig {
    fn default() -> Self {
        Self {
            preprocess: false,
            fmax: 6000.0,
            n_overlaps: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticColorConfig {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for StaticColorConfig {
    fn default() -> Self {
        Self {
            r: MAX_CHANNEL_VALUE,
            g: MAX_CHANNEL_VALUE,
            b: MAX_CHANNEL_VALUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorWheelConfig {
    /// Seconds per full hue revolution
    pub cycle_time: f32,
    /// Seconds added to the clock
    pub offset: f32,
}

impl Default for ColorWheelConfig {
    fn default() -> Self {
        Self {
            cycle_time: 30.0,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulsingColorWheelConfig {
    pub cycle_time: f32,
    pub offset: f32,
    /// Seconds per brightness pulse
    pub cycle_time_dim: f32,
}

impl Default for PulsingColorWheelConfig {
    fn default() -> Self {
        Self {
            cycle_time: 30.0,
            offset: 0.0,
            cycle_time_dim: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMeterConfig {
    /// Decibels spanned by the full strip
    pub db_range: f32,
}

impl Default for LevelMeterConfig {
    fn default() -> Self {
        Self { db_range: 60.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterglowConfig {
    /// Seconds for a released pixel to fade out
    pub glow_time: f32,
}

impl Default for AfterglowConfig {
    fn default() -> Self {
        Self { glow_time: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingLightConfig {
    /// Pixels per second
    pub speed: f32,
    /// Seconds to fade to black
    pub dim_time: f32,
    pub lowcut_hz: f32,
    pub highcut_hz: f32,
}

impl Default for MovingLightConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            dim_time: 20.0,
            lowcut_hz: 50.0,
            highcut_hz: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Seconds to fade to black (0 = no fading)
    pub dim_time: f32,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self { dim_time: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Upper edge of the melody band
    pub fmax: f32,
    /// Frames delivered per second, sizes the normalization history
    pub chunk_rate: usize,
    /// Paint both spectra from the ends towards the middle
    pub mirror_middle: bool,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fmax: 6000.0,
            chunk_rate: 60,
            mirror_middle: true,
        }
    }
}
