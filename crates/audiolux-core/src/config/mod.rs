//! Scene configuration
//!
//! - Generic YAML config loading/saving
//! - The scene description a graph is built from
//!
//! ```ignore
//! use audiolux_core::config::{load_config, GraphConfig};
//!
//! let scene: GraphConfig = load_config(&scene_path);
//! let graph = audiolux_core::graph::build_graph(&scene, sources)?;
//! ```

mod io;
pub mod scene;

pub use io::{load_config, save_config, try_load_config};
pub use scene::{GraphConfig, NodeConfig, NodeKind};
