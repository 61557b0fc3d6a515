//! CPAL input capture
//!
//! Opens an input device, downmixes every hardware block to mono and
//! publishes it as a snapshot. Graphs read the snapshots through
//! [`SnapshotReader`]s.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

use super::error::{CaptureError, CaptureResult};
use super::snapshot::{snapshot_channel, SnapshotReader, SnapshotWriter};

/// Keeps the capture stream alive. Drop this to stop capture; readers
/// then see the end of their stream.
pub struct CaptureHandle {
    _stream: Stream,
    device_name: String,
    sample_rate: f32,
    channels: u16,
}

impl CaptureHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Hardware channel count before downmixing
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        log::info!("Capture stopped: {}", self.device_name);
    }
}

/// Names of the input devices on the default host
pub fn list_input_devices() -> CaptureResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::ConfigError(e.to_string()))?;
    let names: Vec<String> = devices.filter_map(|d| d.name().ok()).collect();
    if names.is_empty() {
        return Err(CaptureError::NoDevices);
    }
    Ok(names)
}

/// Start capturing from the named device, or the default input device
///
/// Returns the handle owning the stream and a first reader; clone the
/// reader for every additional graph.
pub fn start_capture(device_name: Option<&str>) -> CaptureResult<(CaptureHandle, SnapshotReader)> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::NoDefaultDevice(format!("{:?}", host.id())))?,
    };
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using capture device: {}", name);

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::ConfigError(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let sample_rate = config.sample_rate.0 as f32;
    log::info!(
        "Capture config: {} channels, {}Hz, {:?}",
        config.channels,
        config.sample_rate.0,
        sample_format
    );

    let (writer, reader) = snapshot_channel(sample_rate);
    let stream = match sample_format {
        SampleFormat::F32 => build_input_stream::<f32>(&device, &config, writer)?,
        SampleFormat::I16 => build_input_stream::<i16>(&device, &config, writer)?,
        SampleFormat::U16 => build_input_stream::<u16>(&device, &config, writer)?,
        SampleFormat::I32 => build_input_stream::<i32>(&device, &config, writer)?,
        other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
    };
    stream
        .play()
        .map_err(|e| CaptureError::StreamPlayError(e.to_string()))?;
    log::info!("Capture stream started");

    let handle = CaptureHandle {
        _stream: stream,
        device_name: name,
        sample_rate,
        channels: config.channels,
    };
    Ok((handle, reader))
}

fn build_input_stream<T>(device: &cpal::Device, config: &StreamConfig, writer: SnapshotWriter) -> CaptureResult<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let writer = Arc::new(writer);
    let error_writer = Arc::clone(&writer);
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| {
                    frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / channels as f32
                }));
                writer.publish(&mono);
            },
            move |err| {
                log::error!("Capture stream error: {}", err);
                error_writer.fail(err.to_string());
            },
            None,
        )
        .map_err(|e| CaptureError::StreamBuildError(e.to_string()))
}
