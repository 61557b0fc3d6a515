//! Effect graph - wiring, scheduling and the driver loop
//!
//! A [`Graph`] owns its nodes in topological order plus one channel per
//! node output. A tick is two passes:
//!
//! 1. `update(dt)` on every node (time advance, state commit)
//! 2. `process` on every node, upstream first
//!
//! Each node's output channels are lent to it for the duration of its
//! `process` call, so a node never aliases the channels it reads.

pub mod builder;
pub mod command;
pub mod driver;

pub use builder::{build_graph, Connection, GraphBuilder, PortRef};
pub use command::{control_channel, ControlCommand, ControlSender, ParamMap, CONTROL_QUEUE_CAPACITY};
pub use driver::{Driver, DriverStats, StopHandle, StopReason};

use std::sync::Arc;

use crate::effect::{ChannelId, EffectNode, NodeIo, Signal, SignalKind};
use crate::error::{ConfigError, ConfigResult, ParameterError, StreamResult};
use crate::types::PixelBuffer;

/// A node plus the channels it is bound to
pub struct NodeSlot {
    id: String,
    node: Box<dyn EffectNode>,
    inputs: Vec<Option<ChannelId>>,
    outputs: Vec<ChannelId>,
}

impl NodeSlot {
    /// Bind a node to its channels
    ///
    /// The channel counts must match the node's declared arity.
    pub fn bind(
        id: impl Into<String>,
        node: Box<dyn EffectNode>,
        inputs: Vec<Option<ChannelId>>,
        outputs: Vec<ChannelId>,
    ) -> ConfigResult<Self> {
        let id = id.into();
        if inputs.len() != node.num_input_channels() {
            return Err(ConfigError::ArityMismatch {
                node: id,
                direction: "input",
                expected: node.num_input_channels(),
                actual: inputs.len(),
            });
        }
        if outputs.len() != node.num_output_channels() {
            return Err(ConfigError::ArityMismatch {
                node: id,
                direction: "output",
                expected: node.num_output_channels(),
                actual: outputs.len(),
            });
        }
        Ok(Self {
            id,
            node,
            inputs,
            outputs,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> &dyn EffectNode {
        self.node.as_ref()
    }

    pub fn inputs(&self) -> &[Option<ChannelId>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ChannelId] {
        &self.outputs
    }
}

/// A built, runnable effect graph
pub struct Graph {
    num_pixels: usize,
    slots: Vec<NodeSlot>,
    channels: Vec<Signal>,
    channel_kinds: Vec<SignalKind>,
    /// Output channels of the node being processed
    lent: Vec<Signal>,
    output: ChannelId,
    brightness: f32,
    frame: PixelBuffer,
    params: Arc<ParamMap>,
    commands: rtrb::Consumer<ControlCommand>,
    sender: Option<ControlSender>,
}

impl Graph {
    /// Assemble a graph from slots already in topological order
    pub(crate) fn from_slots(
        num_pixels: usize,
        slots: Vec<NodeSlot>,
        channel_kinds: Vec<SignalKind>,
        output: ChannelId,
        brightness: f32,
    ) -> Self {
        let channels = channel_kinds
            .iter()
            .map(|kind| Signal::for_kind(*kind, num_pixels))
            .collect();

        let mut params = ParamMap::default();
        for (index, slot) in slots.iter().enumerate() {
            let names = slot.node.info().params.iter().map(|p| p.name.clone()).collect();
            params.insert(slot.id.clone(), index, names);
        }
        let params = Arc::new(params);
        let (producer, consumer) = control_channel();

        Self {
            num_pixels,
            slots,
            channels,
            channel_kinds,
            lent: Vec::new(),
            output,
            brightness: brightness.clamp(0.0, 1.0),
            frame: PixelBuffer::zeros(num_pixels),
            sender: Some(ControlSender::new(producer, Arc::clone(&params))),
            params,
            commands: consumer,
        }
    }

    /// Advance the graph by `dt` seconds and return the output frame
    ///
    /// Blocks while an audio input waits for its next chunk. A stream error
    /// is terminal for the graph.
    pub fn tick(&mut self, dt: f32) -> StreamResult<&PixelBuffer> {
        self.drain_commands();

        for slot in &mut self.slots {
            slot.node.update(dt);
        }

        for slot in &mut self.slots {
            self.lent.clear();
            for &id in &slot.outputs {
                self.lent.push(std::mem::take(&mut self.channels[id]));
            }
            let result = {
                let mut io = NodeIo::new(&self.channels, &slot.inputs, &mut self.lent);
                slot.node.process(&mut io)
            };
            for (&id, signal) in slot.outputs.iter().zip(self.lent.drain(..)) {
                self.channels[id] = signal;
            }
            result?;
        }

        match self.channels[self.output].as_pixels() {
            Some(pixels) if pixels.len() == self.frame.len() => self.frame.copy_from(pixels),
            _ => self.frame.fill_black(),
        }
        self.frame.scale(self.brightness);
        self.frame.clamp();
        Ok(&self.frame)
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                ControlCommand::SetParameter { node, param, value } => {
                    if let Some(slot) = self.slots.get_mut(node) {
                        slot.node.set_param(param, value);
                    }
                }
                ControlCommand::SetBrightness(value) => self.set_brightness(value),
            }
        }
    }

    /// Set a node parameter by name (normalized 0.0-1.0)
    pub fn set_parameter(&mut self, node: &str, param: &str, value: f32) -> Result<(), ParameterError> {
        let (slot, index) = self.params.resolve(node, param)?;
        log::debug!("Graph: {}.{} = {}", node, param, value);
        self.slots[slot].node.set_param(index, value);
        Ok(())
    }

    /// Set the global output brightness (0.0-1.0)
    pub fn set_brightness(&mut self, value: f32) {
        if value.is_finite() {
            self.brightness = value.clamp(0.0, 1.0);
        } else {
            log::warn!("Graph: ignoring non-finite brightness {}", value);
        }
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Take the control queue's sending half (available once)
    pub fn control_sender(&mut self) -> Option<ControlSender> {
        self.sender.take()
    }

    /// Return every node and channel to its post-build state
    pub fn reset(&mut self) {
        log::info!("Graph: reset ({} nodes)", self.slots.len());
        for slot in &mut self.slots {
            slot.node.reset();
        }
        for (channel, kind) in self.channels.iter_mut().zip(&self.channel_kinds) {
            *channel = Signal::for_kind(*kind, self.num_pixels);
        }
        self.frame.fill_black();
    }

    pub fn num_pixels(&self) -> usize {
        self.num_pixels
    }

    /// Most recent output frame
    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    pub fn param_map(&self) -> &ParamMap {
        &self.params
    }

    /// Node ids in processing order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.id.as_str())
    }

    pub fn slot(&self, id: &str) -> Option<&NodeSlot> {
        self.slots.iter().find(|s| s.id == id)
    }
}
