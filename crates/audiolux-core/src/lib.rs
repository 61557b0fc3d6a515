//! Audiolux Core - audio-reactive effect graphs for addressable LED strips
//!
//! Audio flows from a source through an optional preprocessor into a graph
//! of effect nodes; the graph's output is one [`PixelBuffer`] per tick.

pub mod capture;
pub mod color;
pub mod config;
pub mod dsp;
pub mod effect;
pub mod error;
pub mod graph;
pub mod types;

pub use error::{ConfigError, ParameterError, StreamError};
pub use graph::{build_graph, Driver, Graph, GraphBuilder};
pub use types::*;
