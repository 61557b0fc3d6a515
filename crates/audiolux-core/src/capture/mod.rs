//! Audio sources feeding the graph
//!
//! Every source is a blocking pull stream of mono [`AudioFrame`]s:
//!
//! - Live capture through CPAL, shared between graphs via snapshots
//! - WAV files (hound), chunked
//! - In-memory chunk lists

pub mod error;
mod memory;
mod snapshot;
mod wav;

#[cfg(feature = "cpal-capture")]
mod cpal_input;

pub use error::{CaptureError, CaptureResult};
pub use memory::MemorySource;
pub use snapshot::{snapshot_channel, SnapshotReader, SnapshotWriter};
pub use wav::WavSource;

#[cfg(feature = "cpal-capture")]
pub use cpal_input::{list_input_devices, start_capture, CaptureHandle};

use crate::error::StreamResult;
use crate::types::AudioFrame;

/// A boxed audio source, as consumed by the graph's audio input nodes
///
/// `None` marks the end of the stream; an `Err` is terminal.
pub type AudioStream = Box<dyn Iterator<Item = StreamResult<AudioFrame>> + Send>;
