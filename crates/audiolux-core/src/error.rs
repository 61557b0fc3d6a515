//! Error types shared by the DSP front-end and the effect graph

use thiserror::Error;

/// Errors raised while building or configuring a graph
///
/// These are only produced at build time (or when a parameter change
/// requires rebuilding a filter); a running graph never yields them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A node was wired with the wrong number of channels
    #[error("Node '{node}' expects {expected} {direction} channel(s), got {actual}")]
    ArityMismatch {
        node: String,
        direction: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A connection or output refers to a node that does not exist
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Two nodes share the same id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// A connection refers to a port the node doesn't have
    #[error("Node '{node}' has no {direction} port {port}")]
    PortOutOfRange {
        node: String,
        direction: &'static str,
        port: usize,
    },

    /// An input port is fed by more than one connection
    #[error("Input port {port} of node '{node}' has more than one writer")]
    MultipleWriters { node: String, port: usize },

    /// Connected ports carry different kinds of signal
    #[error("Signal mismatch on '{from}' -> '{to}': {detail}")]
    SignalMismatch {
        from: String,
        to: String,
        detail: String,
    },

    /// A filter was wired to audio at a different sample rate
    #[error("Sample rate mismatch at '{node}': expected {expected}Hz, got {actual}Hz")]
    SampleRateMismatch {
        node: String,
        expected: f32,
        actual: f32,
    },

    /// Frequency band is empty, negative, non-finite or above Nyquist
    #[error("Invalid frequency band [{lo}, {hi}] Hz: {reason}")]
    InvalidBand { lo: f32, hi: f32, reason: String },

    /// A configured parameter is out of its valid domain
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The connections contain a cycle through this node
    #[error("Graph contains a cycle through node '{0}'")]
    Cycle(String),

    /// An audio input node has no source to pull from
    #[error("No audio source provided for node '{0}'")]
    MissingAudioSource(String),

    /// The graph output does not name a pixel-producing port
    #[error("Graph has no valid output: {0}")]
    MissingOutput(String),
}

/// Result type for graph construction
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Terminal conditions of an audio stream
///
/// Any of these ends the driver loop; they are not retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The source has no more audio
    #[error("Audio stream ended")]
    Ended,

    /// The capture backend reported a failure
    #[error("Audio capture failed: {0}")]
    Capture(String),

    /// A chunk arrived at a different rate than the stream was configured for
    #[error("Sample rate changed mid-stream: expected {expected}Hz, got {actual}Hz")]
    RateMismatch { expected: f32, actual: f32 },
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors from runtime parameter modulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Node '{node}' has no parameter '{param}'")]
    UnknownParameter { node: String, param: String },

    /// The control queue is full; the command was dropped
    #[error("Control queue full, dropped command for '{0}'")]
    QueueFull(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::ArityMismatch {
            node: "meter".into(),
            direction: "input",
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Node 'meter' expects 2 input channel(s), got 3");

        let err = ParameterError::UnknownParameter {
            node: "glow".into(),
            param: "speed".into(),
        };
        assert_eq!(err.to_string(), "Node 'glow' has no parameter 'speed'");
    }
}
