//! Lock-free control queue for parameter modulation
//!
//! A control thread (MIDI, UI, network) sends commands through a
//! [`ControlSender`]; the graph drains the queue at the start of each tick,
//! so a parameter never changes between `update` and `process`.
//!
//! Names are resolved on the sending side against the graph's
//! [`ParamMap`], so the tick only ever sees plain indices.
//!
//! ```ignore
//! let mut control = graph.control_sender().unwrap();
//! std::thread::spawn(move || {
//!     control.set_parameter("glow", "glow_time", 0.8).ok();
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ParameterError;

/// Commands sent from a control thread to the graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Set a node parameter (normalized 0.0-1.0)
    SetParameter { node: usize, param: usize, value: f32 },
    /// Set the global output brightness (0.0-1.0)
    SetBrightness(f32),
}

/// Capacity of the control queue
///
/// A controller sweep sends at most a few dozen commands per tick; commands
/// beyond this are dropped and reported to the sender.
pub const CONTROL_QUEUE_CAPACITY: usize = 256;

/// Create a new control channel (producer/consumer pair)
pub fn control_channel() -> (rtrb::Producer<ControlCommand>, rtrb::Consumer<ControlCommand>) {
    rtrb::RingBuffer::new(CONTROL_QUEUE_CAPACITY)
}

#[derive(Debug, Clone)]
struct NodeParams {
    slot: usize,
    params: Vec<String>,
}

/// Names of every node and parameter in a graph, mapped to indices
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    nodes: HashMap<String, NodeParams>,
}

impl ParamMap {
    pub(crate) fn insert(&mut self, node: impl Into<String>, slot: usize, params: Vec<String>) {
        self.nodes.insert(node.into(), NodeParams { slot, params });
    }

    /// Slot and parameter index for a node id and parameter name
    pub fn resolve(&self, node: &str, param: &str) -> Result<(usize, usize), ParameterError> {
        let entry = self
            .nodes
            .get(node)
            .ok_or_else(|| ParameterError::UnknownNode(node.to_string()))?;
        let index = entry
            .params
            .iter()
            .position(|p| p == param)
            .ok_or_else(|| ParameterError::UnknownParameter {
                node: node.to_string(),
                param: param.to_string(),
            })?;
        Ok((entry.slot, index))
    }

    /// Parameter names of a node, in index order
    pub fn params(&self, node: &str) -> Option<&[String]> {
        self.nodes.get(node).map(|n| n.params.as_slice())
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Sending half of a graph's control queue
///
/// There is exactly one per graph; move it to the thread that owns the
/// control surface.
pub struct ControlSender {
    producer: rtrb::Producer<ControlCommand>,
    params: Arc<ParamMap>,
}

impl ControlSender {
    pub(crate) fn new(producer: rtrb::Producer<ControlCommand>, params: Arc<ParamMap>) -> Self {
        Self { producer, params }
    }

    /// Queue a parameter change (normalized 0.0-1.0)
    pub fn set_parameter(&mut self, node: &str, param: &str, value: f32) -> Result<(), ParameterError> {
        let (slot, index) = self.params.resolve(node, param)?;
        self.push(
            ControlCommand::SetParameter {
                node: slot,
                param: index,
                value,
            },
            node,
        )
    }

    /// Queue a brightness change (0.0-1.0)
    pub fn set_brightness(&mut self, value: f32) -> Result<(), ParameterError> {
        self.push(ControlCommand::SetBrightness(value), "brightness")
    }

    /// Parameter names this sender can address
    pub fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn push(&mut self, command: ControlCommand, target: &str) -> Result<(), ParameterError> {
        self.producer.push(command).map_err(|_| {
            log::warn!("Control queue full, dropping command for '{}'", target);
            ParameterError::QueueFull(target.to_string())
        })
    }
}
