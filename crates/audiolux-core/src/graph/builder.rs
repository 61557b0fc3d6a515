//! Graph construction and build-time wiring checks
//!
//! Everything that can be wrong with a graph is caught here: unknown or
//! duplicate ids, out-of-range ports, doubly-driven inputs, signal kind and
//! sample-rate mismatches, cycles and a missing output. A built graph never
//! raises a configuration error.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::{Graph, NodeSlot};
use crate::capture::AudioStream;
use crate::config::scene::{GraphConfig, NodeConfig, NodeKind};
use crate::effect::nodes::{
    AfterglowNode, AudioInputNode, ColorWheelNode, InterpolateNode, InterpolationSpace, LevelMeterNode,
    MeterMode, MirrorNode, MovingLightNode, ShiftNode, SpectrumNode, StaticColorNode,
};
use crate::effect::{EffectNode, SignalKind};
use crate::error::{ConfigError, ConfigResult};
use crate::types::ColorSample;

/// A node port, addressed by node id and port index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: String,
    #[serde(default)]
    pub port: usize,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: usize) -> Self {
        Self {
            node: node.into(),
            port,
        }
    }
}

impl From<(&str, usize)> for PortRef {
    fn from((node, port): (&str, usize)) -> Self {
        Self::new(node, port)
    }
}

/// A directed edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}

/// Programmatic graph construction
///
/// ```ignore
/// let graph = GraphBuilder::new(300)
///     .node("wheel", Box::new(ColorWheelNode::new(300, 30.0, 0.0)?))
///     .node("glow", Box::new(AfterglowNode::new(300, 1.0)?))
///     .connect(("wheel", 0), ("glow", 0))
///     .output(("glow", 0))
///     .build()?;
/// ```
pub struct GraphBuilder {
    num_pixels: usize,
    nodes: Vec<(String, Box<dyn EffectNode>)>,
    connections: Vec<Connection>,
    output: Option<PortRef>,
    brightness: f32,
}

impl GraphBuilder {
    pub fn new(num_pixels: usize) -> Self {
        Self {
            num_pixels,
            nodes: Vec::new(),
            connections: Vec::new(),
            output: None,
            brightness: 1.0,
        }
    }

    /// Add a node under a unique id
    pub fn node(mut self, id: impl Into<String>, node: Box<dyn EffectNode>) -> Self {
        self.nodes.push((id.into(), node));
        self
    }

    /// Connect an output port to an input port
    pub fn connect(mut self, from: impl Into<PortRef>, to: impl Into<PortRef>) -> Self {
        self.connections.push(Connection {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Select the pixel output port that becomes the graph's frame
    pub fn output(mut self, port: impl Into<PortRef>) -> Self {
        self.output = Some(port.into());
        self
    }

    /// Initial global brightness (0.0-1.0)
    pub fn brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }

    /// Check the wiring and produce a runnable graph
    pub fn build(self) -> ConfigResult<Graph> {
        let GraphBuilder {
            num_pixels,
            nodes,
            connections,
            output,
            brightness,
        } = self;

        let ids: Vec<&str> = nodes.iter().map(|(id, _)| id.as_str()).collect();
        let index = index_ids(&ids)?;

        // Per node, per input port: the (node, output port) feeding it
        let mut wiring: Vec<Vec<Option<(usize, usize)>>> = nodes
            .iter()
            .map(|(_, node)| vec![None; node.num_input_channels()])
            .collect();
        let mut edges = Vec::with_capacity(connections.len());

        for connection in &connections {
            let from = lookup(&index, &connection.from.node)?;
            let to = lookup(&index, &connection.to.node)?;
            let (from_id, from_node) = &nodes[from];
            let (to_id, to_node) = &nodes[to];

            if connection.from.port >= from_node.num_output_channels() {
                return Err(ConfigError::PortOutOfRange {
                    node: from_id.clone(),
                    direction: "output",
                    port: connection.from.port,
                });
            }
            if connection.to.port >= to_node.num_input_channels() {
                return Err(ConfigError::PortOutOfRange {
                    node: to_id.clone(),
                    direction: "input",
                    port: connection.to.port,
                });
            }
            check_kinds(
                from_id,
                from_node.output_kind(connection.from.port),
                to_id,
                to_node.input_kind(connection.to.port),
            )?;

            let port = &mut wiring[to][connection.to.port];
            if port.is_some() {
                return Err(ConfigError::MultipleWriters {
                    node: to_id.clone(),
                    port: connection.to.port,
                });
            }
            *port = Some((from, connection.from.port));
            edges.push((from, to));
            log::debug!(
                "Graph: {}:{} -> {}:{}",
                from_id,
                connection.from.port,
                to_id,
                connection.to.port
            );
        }

        let order = topo_order(&ids, &edges)?;
        let (output_node, output_port) = resolve_output(output.as_ref(), &index, &nodes)?;

        // One channel per output port, numbered node by node
        let mut first_channel = Vec::with_capacity(nodes.len());
        let mut kinds = Vec::new();
        for (_, node) in &nodes {
            first_channel.push(kinds.len());
            kinds.extend((0..node.num_output_channels()).map(|port| node.output_kind(port)));
        }

        let num_nodes = nodes.len();
        let mut pending: Vec<Option<(String, Box<dyn EffectNode>)>> = nodes.into_iter().map(Some).collect();
        let mut slots = Vec::with_capacity(num_nodes);
        for i in order {
            let Some((id, node)) = pending[i].take() else {
                continue;
            };
            let inputs = wiring[i]
                .iter()
                .map(|source| source.map(|(from, port)| first_channel[from] + port))
                .collect();
            let outputs = (0..node.num_output_channels())
                .map(|port| first_channel[i] + port)
                .collect();
            slots.push(NodeSlot::bind(id, node, inputs, outputs)?);
        }

        log::info!(
            "Graph built: {} nodes, {} channels, {} pixels",
            slots.len(),
            kinds.len(),
            num_pixels
        );
        Ok(Graph::from_slots(
            num_pixels,
            slots,
            kinds,
            first_channel[output_node] + output_port,
            brightness,
        ))
    }
}

fn index_ids(ids: &[&str]) -> ConfigResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if index.insert(id.to_string(), i).is_some() {
            return Err(ConfigError::DuplicateNode(id.to_string()));
        }
    }
    Ok(index)
}

fn lookup(index: &HashMap<String, usize>, id: &str) -> ConfigResult<usize> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| ConfigError::UnknownNode(id.to_string()))
}

fn check_kinds(from_id: &str, from: SignalKind, to_id: &str, to: SignalKind) -> ConfigResult<()> {
    if to.accepts(&from) {
        return Ok(());
    }
    Err(match (to.sample_rate(), from.sample_rate()) {
        (Some(expected), Some(actual)) => ConfigError::SampleRateMismatch {
            node: to_id.to_string(),
            expected,
            actual,
        },
        _ => ConfigError::SignalMismatch {
            from: from_id.to_string(),
            to: to_id.to_string(),
            detail: format!("{:?} input cannot read {:?} output", to, from),
        },
    })
}

fn resolve_output(
    output: Option<&PortRef>,
    index: &HashMap<String, usize>,
    nodes: &[(String, Box<dyn EffectNode>)],
) -> ConfigResult<(usize, usize)> {
    let output = output.ok_or_else(|| ConfigError::MissingOutput("no output port configured".to_string()))?;
    let node = index
        .get(&output.node)
        .copied()
        .ok_or_else(|| ConfigError::MissingOutput(format!("unknown node '{}'", output.node)))?;
    let (_, effect) = &nodes[node];
    if output.port >= effect.num_output_channels() || effect.output_kind(output.port) != SignalKind::Pixels {
        return Err(ConfigError::MissingOutput(format!(
            "'{}' port {} is not a pixel output",
            output.node, output.port
        )));
    }
    Ok((node, output.port))
}

/// Kahn's algorithm; ties keep insertion order
fn topo_order(ids: &[&str], edges: &[(usize, usize)]) -> ConfigResult<Vec<usize>> {
    let n = ids.len();
    let mut in_degree = vec![0usize; n];
    let mut downstream = vec![Vec::new(); n];
    for &(from, to) in edges {
        in_degree[to] += 1;
        downstream[from].push(to);
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &next in &downstream[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n).find(|&i| in_degree[i] > 0).unwrap_or(0);
        return Err(ConfigError::Cycle(ids[stuck].to_string()));
    }
    Ok(order)
}

/// Build a graph from a scene, taking each audio input's stream from
/// `sources` by node id
///
/// Nodes are constructed upstream first, so an audio consumer picks up the
/// rate of whatever feeds its audio port (the decimated rate behind a
/// preprocessing input, the capture rate otherwise).
pub fn build_graph(config: &GraphConfig, mut sources: HashMap<String, AudioStream>) -> ConfigResult<Graph> {
    config.validate()?;

    let ids: Vec<&str> = config.nodes.iter().map(|n| n.id.as_str()).collect();
    let index = index_ids(&ids)?;
    let mut edges = Vec::with_capacity(config.connections.len());
    for connection in &config.connections {
        edges.push((lookup(&index, &connection.from.node)?, lookup(&index, &connection.to.node)?));
    }

    let mut built: Vec<Option<Box<dyn EffectNode>>> = config.nodes.iter().map(|_| None).collect();
    for i in topo_order(&ids, &edges)? {
        let node_config = &config.nodes[i];
        let audio_rate = config
            .connections
            .iter()
            .find(|c| c.to.node == node_config.id && c.to.port == 0)
            .and_then(|c| {
                let upstream = built[index[&c.from.node]].as_ref()?;
                upstream.output_kind(c.from.port).sample_rate()
            })
            .unwrap_or(config.sample_rate);
        built[i] = Some(instantiate(node_config, config, audio_rate, &mut sources)?);
    }

    for id in sources.keys() {
        log::warn!("Graph: audio source '{}' has no matching input node", id);
    }

    let mut builder = GraphBuilder::new(config.num_pixels).brightness(config.brightness);
    for (node_config, node) in config.nodes.iter().zip(built) {
        if let Some(node) = node {
            builder = builder.node(node_config.id.clone(), node);
        }
    }
    for connection in &config.connections {
        builder = builder.connect(connection.from.clone(), connection.to.clone());
    }
    builder.output(config.output.clone()).build()
}

fn instantiate(
    node: &NodeConfig,
    config: &GraphConfig,
    audio_rate: f32,
    sources: &mut HashMap<String, AudioStream>,
) -> ConfigResult<Box<dyn EffectNode>> {
    let n = config.num_pixels;
    log::debug!("Graph: creating {} ({:?})", node.id, node.kind);
    Ok(match &node.kind {
        NodeKind::AudioInput(p) => {
            let stream = sources
                .remove(&node.id)
                .ok_or_else(|| ConfigError::MissingAudioSource(node.id.clone()))?;
            if p.preprocess {
                Box::new(AudioInputNode::preprocessed(
                    stream,
                    config.sample_rate,
                    p.fmax,
                    p.n_overlaps,
                )?)
            } else {
                Box::new(AudioInputNode::new(stream, config.sample_rate))
            }
        }
        NodeKind::StaticColor(p) => Box::new(StaticColorNode::new(n, ColorSample::new(p.r, p.g, p.b))?),
        NodeKind::ColorWheel(p) => Box::new(ColorWheelNode::new(n, p.cycle_time, p.offset)?),
        NodeKind::PulsingColorWheel(p) => Box::new(ColorWheelNode::pulsing(
            n,
            p.cycle_time,
            p.offset,
            p.cycle_time_dim,
        )?),
        NodeKind::VuPeak(p) => Box::new(LevelMeterNode::new(n, MeterMode::Peak, p.db_range)?),
        NodeKind::VuRms(p) => Box::new(LevelMeterNode::new(n, MeterMode::Rms, p.db_range)?),
        NodeKind::Afterglow(p) => Box::new(AfterglowNode::new(n, p.glow_time)?),
        NodeKind::MovingLight(p) => Box::new(MovingLightNode::new(
            n,
            audio_rate,
            p.speed,
            p.dim_time,
            p.lowcut_hz,
            p.highcut_hz,
        )?),
        NodeKind::Shift(p) => Box::new(ShiftNode::new(n, p.dim_time)?),
        NodeKind::Mirror => Box::new(MirrorNode::new()),
        NodeKind::InterpolateRgb => Box::new(InterpolateNode::new(n, InterpolationSpace::Rgb)),
        NodeKind::InterpolateHsv => Box::new(InterpolateNode::new(n, InterpolationSpace::Hsv)),
        NodeKind::Spectrum(p) => Box::new(SpectrumNode::new(
            n,
            audio_rate,
            p.fmax,
            p.chunk_rate,
            p.mirror_middle,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemorySource;
    use crate::config::scene::{AudioInputConfig, ColorWheelConfig, LevelMeterConfig, MovingLightConfig};
    use crate::types::{AudioFrame, PixelBuffer};

    fn color(n: usize) -> Box<dyn EffectNode> {
        Box::new(StaticColorNode::new(n, ColorSample::WHITE).unwrap())
    }

    fn shift(n: usize) -> Box<dyn EffectNode> {
        Box::new(ShiftNode::new(n, 0.0).unwrap())
    }

    fn silence(chunks: usize, len: usize, rate: f32) -> AudioStream {
        Box::new(MemorySource::new((0..chunks).map(|_| AudioFrame::silence(len, rate)).collect()))
    }

    #[test]
    fn test_duplicate_node() {
        let result = GraphBuilder::new(2)
            .node("a", color(2))
            .node("a", color(2))
            .output(("a", 0))
            .build();
        assert_eq!(result.err(), Some(ConfigError::DuplicateNode("a".into())));
    }

    #[test]
    fn test_unknown_node_and_port() {
        let result = GraphBuilder::new(2)
            .node("a", color(2))
            .connect(("a", 0), ("b", 0))
            .output(("a", 0))
            .build();
        assert_eq!(result.err(), Some(ConfigError::UnknownNode("b".into())));

        let result = GraphBuilder::new(2)
            .node("a", color(2))
            .node("s", shift(2))
            .connect(("a", 0), ("s", 1))
            .output(("s", 0))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::PortOutOfRange { direction: "input", port: 1, .. })
        ));
    }

    #[test]
    fn test_multiple_writers() {
        let result = GraphBuilder::new(2)
            .node("a", color(2))
            .node("b", color(2))
            .node("s", shift(2))
            .connect(("a", 0), ("s", 0))
            .connect(("b", 0), ("s", 0))
            .output(("s", 0))
            .build();
        assert_eq!(
            result.err(),
            Some(ConfigError::MultipleWriters {
                node: "s".into(),
                port: 0
            })
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let result = GraphBuilder::new(2)
            .node("a", shift(2))
            .node("b", shift(2))
            .connect(("a", 0), ("b", 0))
            .connect(("b", 0), ("a", 0))
            .output(("b", 0))
            .build();
        assert_eq!(result.err(), Some(ConfigError::Cycle("a".into())));
    }

    #[test]
    fn test_signal_kind_mismatch() {
        let result = GraphBuilder::new(2)
            .node("a", color(2))
            .node("vu", Box::new(LevelMeterNode::new(2, MeterMode::Rms, 60.0).unwrap()))
            .connect(("a", 0), ("vu", 0))
            .output(("vu", 0))
            .build();
        assert!(matches!(result, Err(ConfigError::SignalMismatch { .. })));
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let result = GraphBuilder::new(4)
            .node("in", Box::new(AudioInputNode::new(silence(1, 64, 44100.0), 44100.0)))
            .node(
                "light",
                Box::new(MovingLightNode::new(4, 48000.0, 10.0, 20.0, 50.0, 300.0).unwrap()),
            )
            .connect(("in", 0), ("light", 0))
            .output(("light", 0))
            .build();
        assert_eq!(
            result.err(),
            Some(ConfigError::SampleRateMismatch {
                node: "light".into(),
                expected: 48000.0,
                actual: 44100.0
            })
        );
    }

    #[test]
    fn test_missing_output() {
        let result = GraphBuilder::new(2).node("a", color(2)).build();
        assert!(matches!(result, Err(ConfigError::MissingOutput(_))));

        let result = GraphBuilder::new(2)
            .node("in", Box::new(AudioInputNode::new(silence(1, 8, 1000.0), 1000.0)))
            .output(("in", 0))
            .build();
        assert!(matches!(result, Err(ConfigError::MissingOutput(_))));
    }

    #[test]
    fn test_build_default_scene() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = GraphConfig::default();
        let mut sources = HashMap::new();
        sources.insert("audio".to_string(), silence(4, 800, config.sample_rate));

        let mut graph = build_graph(&config, sources).unwrap();
        for _ in 0..4 {
            let frame = graph.tick(1.0 / 60.0).unwrap();
            assert_eq!(frame, &PixelBuffer::zeros(config.num_pixels));
        }
        assert!(graph.tick(1.0 / 60.0).is_err());
    }

    #[test]
    fn test_missing_audio_source() {
        let config = GraphConfig::default();
        assert_eq!(
            build_graph(&config, HashMap::new()).err(),
            Some(ConfigError::MissingAudioSource("audio".into()))
        );
    }

    #[test]
    fn test_rate_inferred_from_preprocessed_input() {
        let mut config = GraphConfig::default();
        config.nodes = vec![
            NodeConfig::new(
                "audio",
                NodeKind::AudioInput(AudioInputConfig {
                    preprocess: true,
                    ..Default::default()
                }),
            ),
            NodeConfig::new("white", NodeKind::StaticColor(Default::default())),
            NodeConfig::new("light", NodeKind::MovingLight(MovingLightConfig::default())),
            NodeConfig::new("vu", NodeKind::VuPeak(LevelMeterConfig::default())),
        ];
        config.connections = vec![
            Connection {
                from: PortRef::new("audio", 0),
                to: PortRef::new("light", 0),
            },
            Connection {
                from: PortRef::new("white", 0),
                to: PortRef::new("light", 1),
            },
        ];
        config.output = PortRef::new("light", 0);

        let mut sources = HashMap::new();
        sources.insert("audio".to_string(), silence(2, 800, config.sample_rate));
        let graph = build_graph(&config, sources).unwrap();
        let light = graph.slot("light").unwrap().node();
        assert_eq!(light.input_kind(0), SignalKind::audio(12000.0));
    }

    #[test]
    fn test_color_source_fills_whole_strip() {
        let config = GraphConfig {
            num_pixels: 16,
            nodes: vec![NodeConfig::new("wheel", NodeKind::ColorWheel(ColorWheelConfig::default()))],
            connections: Vec::new(),
            output: PortRef::new("wheel", 0),
            ..Default::default()
        };
        let mut graph = build_graph(&config, HashMap::new()).unwrap();
        let frame = graph.tick(0.0).unwrap();
        assert_eq!(frame, &PixelBuffer::filled(16, ColorSample::new(255.0, 0.0, 0.0)));
    }
}
