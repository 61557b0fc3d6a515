//! Effect nodes - the node contract, wiring types and parameter mapping
//!
//! Every node in a graph implements [`EffectNode`]:
//! - Color sources (static color, hue wheels)
//! - Audio-driven nodes (level meters, spectrum, moving light)
//! - Pixel transforms (afterglow, shift, mirror, interpolation)
//! - The audio input that pulls chunks from a stream
//!
//! Nodes never own their wired buffers. The graph hands each `process`
//! call a [`NodeIo`] view onto the channels the node was bound to.

pub mod nodes;

use crate::error::{ConfigError, ConfigResult, StreamResult};
use crate::types::{AudioFrame, PixelBuffer};

/// Index of a channel in the graph's channel table
pub type ChannelId = usize;

/// Tolerance when comparing sample rates of connected audio ports
const RATE_TOLERANCE: f32 = 1e-3;

/// Kind of signal carried by a port
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalKind {
    /// Mono audio; `None` accepts (or produces) any rate
    Audio { sample_rate: Option<f32> },
    /// A pixel buffer of the graph's pixel count
    Pixels,
}

impl SignalKind {
    pub const ANY_AUDIO: SignalKind = SignalKind::Audio { sample_rate: None };

    pub fn audio(sample_rate: f32) -> Self {
        SignalKind::Audio {
            sample_rate: Some(sample_rate),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, SignalKind::Audio { .. })
    }

    pub fn sample_rate(&self) -> Option<f32> {
        match self {
            SignalKind::Audio { sample_rate } => *sample_rate,
            SignalKind::Pixels => None,
        }
    }

    /// True if a port of this kind can read from `upstream`
    pub fn accepts(&self, upstream: &SignalKind) -> bool {
        match (self, upstream) {
            (SignalKind::Pixels, SignalKind::Pixels) => true,
            (SignalKind::Audio { sample_rate: Some(a) }, SignalKind::Audio { sample_rate: Some(b) }) => {
                (a - b).abs() <= RATE_TOLERANCE
            }
            (SignalKind::Audio { .. }, SignalKind::Audio { .. }) => true,
            _ => false,
        }
    }
}

/// Contents of a channel
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Audio(AudioFrame),
    Pixels(PixelBuffer),
}

impl Default for Signal {
    fn default() -> Self {
        Signal::Pixels(PixelBuffer::default())
    }
}

impl Signal {
    /// Allocate an empty channel for a port of the given kind
    pub fn for_kind(kind: SignalKind, num_pixels: usize) -> Self {
        match kind {
            SignalKind::Audio { sample_rate } => {
                Signal::Audio(AudioFrame::new(Vec::new(), sample_rate.unwrap_or(0.0)))
            }
            SignalKind::Pixels => Signal::Pixels(PixelBuffer::zeros(num_pixels)),
        }
    }

    pub fn as_audio(&self) -> Option<&AudioFrame> {
        match self {
            Signal::Audio(frame) => Some(frame),
            Signal::Pixels(_) => None,
        }
    }

    pub fn as_pixels(&self) -> Option<&PixelBuffer> {
        match self {
            Signal::Pixels(buffer) => Some(buffer),
            Signal::Audio(_) => None,
        }
    }

    pub fn as_audio_mut(&mut self) -> Option<&mut AudioFrame> {
        match self {
            Signal::Audio(frame) => Some(frame),
            Signal::Pixels(_) => None,
        }
    }

    pub fn as_pixels_mut(&mut self) -> Option<&mut PixelBuffer> {
        match self {
            Signal::Pixels(buffer) => Some(buffer),
            Signal::Audio(_) => None,
        }
    }
}

/// A node's view of its wired channels for one `process` call
///
/// Inputs are read-only views into the graph's channel table; outputs are
/// the node's own channels, temporarily lent out by the graph.
pub struct NodeIo<'a> {
    channels: &'a [Signal],
    inputs: &'a [Option<ChannelId>],
    outputs: &'a mut [Signal],
}

impl<'a> NodeIo<'a> {
    pub fn new(channels: &'a [Signal], inputs: &'a [Option<ChannelId>], outputs: &'a mut [Signal]) -> Self {
        Self {
            channels,
            inputs,
            outputs,
        }
    }

    /// Signal on input `port`, or `None` if the port is unconnected
    ///
    /// The returned view borrows the channel table, not `self`, so it can
    /// be held while writing outputs.
    pub fn input(&self, port: usize) -> Option<&'a Signal> {
        let id = (*self.inputs.get(port)?)?;
        self.channels.get(id)
    }

    pub fn audio_input(&self, port: usize) -> Option<&'a AudioFrame> {
        self.input(port).and_then(Signal::as_audio)
    }

    pub fn pixel_input(&self, port: usize) -> Option<&'a PixelBuffer> {
        self.input(port).and_then(Signal::as_pixels)
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn audio_output(&mut self, port: usize) -> Option<&mut AudioFrame> {
        self.outputs.get_mut(port).and_then(Signal::as_audio_mut)
    }

    pub fn pixel_output(&mut self, port: usize) -> Option<&mut PixelBuffer> {
        self.outputs.get_mut(port).and_then(Signal::as_pixels_mut)
    }
}

/// Information about a node parameter
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// Parameter name, used as the key for runtime modulation
    pub name: String,
    /// Default value (0.0-1.0)
    pub default: f32,
    /// Actual value at normalized 0.0
    pub min: f32,
    /// Actual value at normalized 1.0
    pub max: f32,
    /// Unit label (e.g., "s", "dB", "Hz")
    pub unit: String,
}

impl Default for ParamInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            default: 0.5,
            min: 0.0,
            max: 1.0,
            unit: String::new(),
        }
    }
}

impl ParamInfo {
    /// Create a new parameter info with name and default value
    pub fn new(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            default,
            ..Default::default()
        }
    }

    /// Set the value range
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the unit label
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Normalized position of an actual value, if it lies in range
    pub fn normalize(&self, actual: f32) -> Option<f32> {
        let (lo, hi) = (self.min.min(self.max), self.min.max(self.max));
        if !actual.is_finite() || actual < lo || actual > hi {
            return None;
        }
        if self.max == self.min {
            return Some(0.0);
        }
        Some((actual - self.min) / (self.max - self.min))
    }
}

/// Current parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamValue {
    /// Normalized value (0.0-1.0)
    pub normalized: f32,
    /// Actual value after range mapping
    pub actual: f32,
}

impl Default for ParamValue {
    fn default() -> Self {
        Self {
            normalized: 0.5,
            actual: 0.5,
        }
    }
}

impl ParamValue {
    pub fn new(normalized: f32, actual: f32) -> Self {
        Self { normalized, actual }
    }

    /// Create from normalized value with the given param info
    pub fn from_normalized(normalized: f32, info: &ParamInfo) -> Self {
        let normalized = if normalized.is_finite() {
            normalized.clamp(0.0, 1.0)
        } else {
            info.default
        };
        let actual = info.min + normalized * (info.max - info.min);
        Self { normalized, actual }
    }
}

/// Information about a node
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Node name for display
    pub name: String,
    /// Node category (e.g., "Color", "Audio", "Temporal", "Spatial")
    pub category: String,
    /// Parameter descriptions
    pub params: Vec<ParamInfo>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to this node
    pub fn with_param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Index of the parameter called `name`
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

/// The contract between the graph and every node
///
/// A tick calls `update(dt)` exactly once on every node, then `process` on
/// every node in topological order. `update` advances time and commits the
/// previous tick's state; it never touches outputs. `process` reads inputs
/// and writes outputs; calling it again without an intervening `update`
/// must produce identical outputs and leave identical state.
///
/// All parameters are normalized (0.0-1.0) at this surface and mapped onto
/// each parameter's range.
pub trait EffectNode: Send {
    /// Number of input ports (fixed for the node's lifetime)
    fn num_input_channels(&self) -> usize;

    /// Number of output ports (fixed for the node's lifetime)
    fn num_output_channels(&self) -> usize;

    /// Signal kind expected on input `port`
    fn input_kind(&self, port: usize) -> SignalKind;

    /// Signal kind produced on output `port`
    fn output_kind(&self, port: usize) -> SignalKind;

    /// Advance time by `dt` seconds
    fn update(&mut self, dt: f32);

    /// Read inputs and write outputs
    ///
    /// Absent inputs take a neutral value. Only a source node pulling from
    /// an audio stream can fail.
    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()>;

    /// Get information about this node (name, category, parameters)
    fn info(&self) -> &NodeInfo;

    /// Get the current parameter values
    fn params(&self) -> &[ParamValue];

    /// Set a parameter by index (normalized value 0.0-1.0)
    fn set_param(&mut self, index: usize, value: f32);

    /// Return to the state right after construction
    fn reset(&mut self);
}

/// Base implementation helper for nodes
///
/// Holds the node info and the current parameter values.
#[derive(Debug, Clone)]
pub struct NodeBase {
    info: NodeInfo,
    params: Vec<ParamValue>,
}

impl NodeBase {
    pub fn new(info: NodeInfo) -> Self {
        let params: Vec<ParamValue> = info
            .params
            .iter()
            .map(|p| ParamValue::from_normalized(p.default, p))
            .collect();
        Self { info, params }
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn params(&self) -> &[ParamValue] {
        &self.params
    }

    /// Set a parameter value (normalized); out-of-range indices are ignored
    pub fn set_param(&mut self, index: usize, value: f32) {
        if index < self.params.len() {
            self.params[index] = ParamValue::from_normalized(value, &self.info.params[index]);
        }
    }

    /// Set a parameter from an actual (unnormalized) value
    ///
    /// Used when building from a scene, where values are given in their
    /// natural units.
    pub fn set_actual(&mut self, index: usize, actual: f32) -> ConfigResult<()> {
        let info = self.info.params.get(index).ok_or_else(|| ConfigError::InvalidParameter {
            name: format!("#{}", index),
            reason: format!("{} has no such parameter", self.info.name),
        })?;
        let normalized = info.normalize(actual).ok_or_else(|| ConfigError::InvalidParameter {
            name: info.name.clone(),
            reason: format!("{} is outside [{}, {}]", actual, info.min, info.max),
        })?;
        self.params[index] = ParamValue::new(normalized, actual);
        Ok(())
    }

    /// Get a parameter's actual (denormalized) value
    pub fn param_actual(&self, index: usize) -> f32 {
        self.params.get(index).map(|p| p.actual).unwrap_or(0.0)
    }

    /// Get a parameter's normalized value
    pub fn param_normalized(&self, index: usize) -> f32 {
        self.params.get(index).map(|p| p.normalized).unwrap_or(0.0)
    }
}

/// Double-buffered node state
///
/// `committed` is what the last finished tick left behind. Every `process`
/// call rebuilds `pending` from it, and `update` promotes `pending` to
/// `committed`. This keeps `process` idempotent within a tick.
#[derive(Debug, Clone)]
pub struct Staged<T: Clone> {
    committed: T,
    pending: T,
    dirty: bool,
}

impl<T: Clone> Staged<T> {
    pub fn new(initial: T) -> Self {
        Self {
            pending: initial.clone(),
            committed: initial,
            dirty: false,
        }
    }

    /// Promote the state computed by the last `process`, if any
    pub fn commit(&mut self) {
        if self.dirty {
            std::mem::swap(&mut self.committed, &mut self.pending);
            self.dirty = false;
        }
    }

    /// Start a `process` call: a fresh copy of the committed state
    pub fn begin(&mut self) -> &mut T {
        self.pending.clone_from(&self.committed);
        self.dirty = true;
        &mut self.pending
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn committed_mut(&mut self) -> &mut T {
        &mut self.committed
    }

    /// Most recent state: pending if `process` ran this tick
    pub fn current(&self) -> &T {
        if self.dirty {
            &self.pending
        } else {
            &self.committed
        }
    }

    pub fn reset(&mut self, initial: T) {
        self.pending = initial.clone();
        self.committed = initial;
        self.dirty = false;
    }
}

/// Write `src` into a pixel output port, keeping the channel's length
pub(crate) fn write_pixels(io: &mut NodeIo<'_>, port: usize, src: &PixelBuffer) {
    if let Some(out) = io.pixel_output(port) {
        if out.len() == src.len() {
            out.copy_from(src);
        } else {
            out.clone_from(src);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for driving a single node without a graph

    use super::*;

    /// Run one `process` call with the given inputs; returns the outputs
    pub fn run(node: &mut dyn EffectNode, inputs: &[Option<Signal>], num_pixels: usize) -> Vec<Signal> {
        let mut channels = Vec::new();
        let mut ids = Vec::new();
        for input in inputs {
            match input {
                Some(signal) => {
                    ids.push(Some(channels.len()));
                    channels.push(signal.clone());
                }
                None => ids.push(None),
            }
        }
        let mut outputs: Vec<Signal> = (0..node.num_output_channels())
            .map(|port| Signal::for_kind(node.output_kind(port), num_pixels))
            .collect();
        let mut io = NodeIo::new(&channels, &ids, &mut outputs);
        node.process(&mut io).expect("process failed");
        outputs
    }

    /// Run one tick (`update` then `process`) and return output 0 as pixels
    pub fn tick(node: &mut dyn EffectNode, dt: f32, inputs: &[Option<Signal>], num_pixels: usize) -> PixelBuffer {
        node.update(dt);
        match run(node, inputs, num_pixels).swap_remove(0) {
            Signal::Pixels(buffer) => buffer,
            Signal::Audio(_) => panic!("expected a pixel output"),
        }
    }

    pub fn pixels(buffer: PixelBuffer) -> Option<Signal> {
        Some(Signal::Pixels(buffer))
    }

    pub fn audio(samples: Vec<f32>, sample_rate: f32) -> Option<Signal> {
        Some(Signal::Audio(AudioFrame::new(samples, sample_rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_mapping() {
        let info = ParamInfo::new("glow_time", 0.5).with_range(0.0, 100.0);

        let value = ParamValue::from_normalized(0.5, &info);
        assert_eq!(value.normalized, 0.5);
        assert_eq!(value.actual, 50.0);

        let value = ParamValue::from_normalized(1.7, &info);
        assert_eq!(value.actual, 100.0);

        assert_eq!(info.normalize(25.0), Some(0.25));
        assert_eq!(info.normalize(125.0), None);
    }

    #[test]
    fn test_node_base() {
        let info = NodeInfo::new("Test", "Test")
            .with_param(ParamInfo::new("a", 0.5).with_range(0.0, 100.0))
            .with_param(ParamInfo::new("b", 0.0).with_range(-1.0, 1.0));

        let mut base = NodeBase::new(info);
        assert_eq!(base.param_actual(0), 50.0);
        assert_eq!(base.param_actual(1), -1.0);
        assert_eq!(base.info().param_index("b"), Some(1));
        assert_eq!(base.info().param_index("c"), None);

        base.set_param(1, 0.5);
        assert_eq!(base.param_actual(1), 0.0);

        base.set_actual(0, 10.0).unwrap();
        assert_eq!(base.param_normalized(0), 0.1);
        assert!(matches!(
            base.set_actual(0, 200.0),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_signal_kind_accepts() {
        assert!(SignalKind::ANY_AUDIO.accepts(&SignalKind::audio(12000.0)));
        assert!(SignalKind::audio(12000.0).accepts(&SignalKind::audio(12000.0)));
        assert!(!SignalKind::audio(12000.0).accepts(&SignalKind::audio(48000.0)));
        assert!(!SignalKind::Pixels.accepts(&SignalKind::ANY_AUDIO));
        assert!(!SignalKind::ANY_AUDIO.accepts(&SignalKind::Pixels));
    }

    #[test]
    fn test_staged_commit() {
        let mut state = Staged::new(0);
        *state.begin() += 1;
        *state.begin() += 1;
        // Re-running process starts from the committed value again
        assert_eq!(*state.current(), 1);
        assert_eq!(*state.committed(), 0);

        state.commit();
        assert_eq!(*state.committed(), 1);
        // Commit without a process in between keeps the state
        state.commit();
        assert_eq!(*state.committed(), 1);
    }

    #[test]
    fn test_node_io_views() {
        let channels = vec![Signal::Pixels(PixelBuffer::zeros(3))];
        let inputs = [None, Some(0)];
        let mut outputs = vec![Signal::Audio(AudioFrame::default())];
        let mut io = NodeIo::new(&channels, &inputs, &mut outputs);

        assert!(io.input(0).is_none());
        assert!(io.input(5).is_none());
        assert_eq!(io.pixel_input(1).map(|p| p.len()), Some(3));
        assert!(io.audio_input(1).is_none());
        assert!(io.pixel_output(0).is_none());
        assert!(io.audio_output(0).is_some());
    }
}
