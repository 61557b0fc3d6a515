//! Audio capture error types

use thiserror::Error;

/// Errors that can occur while opening an audio source
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No capture device available
    #[error("No audio input devices found")]
    NoDevices,

    /// Failed to get default input device
    #[error("Failed to get default input device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio input device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build capture stream
    #[error("Failed to build capture stream: {0}")]
    StreamBuildError(String),

    /// Failed to start capture stream
    #[error("Failed to start capture stream: {0}")]
    StreamPlayError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Chunks must hold at least one sample
    #[error("Invalid chunk length: {0}")]
    InvalidChunkLength(usize),

    /// Failed to open or decode a WAV file
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;
