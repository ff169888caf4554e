//! Microphone capture producing WAV-encoded recordings

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arpeggio_core::{ArpError, Capture, CaptureSession};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, StreamConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::wav_codec::encode_wav;

#[derive(Debug, Error)]
pub enum AudioInputError {
    #[error("No audio input devices found")]
    NoDevices,
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Failed to get input config: {0}")]
    ConfigError(String),
    #[error("Failed to build input stream: {0}")]
    StreamError(String),
    #[error("Nothing was captured")]
    Empty,
}

impl From<AudioInputError> for ArpError {
    fn from(err: AudioInputError) -> Self {
        ArpError::Capture(err.to_string())
    }
}

/// Handle to stop a running input stream
pub struct InputStreamHandle {
    stop_flag: Arc<AtomicBool>,
    _stream: cpal::Stream,
}

impl InputStreamHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

impl Drop for InputStreamHandle {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

pub struct AudioInputService;

impl AudioInputService {
    /// Get device by ID (or default if "default")
    fn get_device(device_id: &str) -> Result<Device, AudioInputError> {
        let host = cpal::default_host();

        if device_id == "default" {
            return host
                .default_input_device()
                .ok_or(AudioInputError::NoDevices);
        }

        for device in host
            .input_devices()
            .map_err(|e| AudioInputError::ConfigError(e.to_string()))?
        {
            if let Ok(name) = device.name() {
                if name == device_id {
                    return Ok(device);
                }
            }
        }

        Err(AudioInputError::DeviceNotFound(device_id.to_string()))
    }

    /// Start streaming audio input to a channel
    /// Returns (handle, sample_rate, channels)
    pub fn start_stream(
        device_id: &str,
        chunk_tx: Sender<Vec<f32>>,
    ) -> Result<(InputStreamHandle, u32, u16), AudioInputError> {
        let device = Self::get_device(device_id)?;
        let config = device
            .default_input_config()
            .map_err(|e| AudioInputError::ConfigError(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "Starting audio input stream"
        );

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let stream_config: StreamConfig = config.clone().into();

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, chunk_tx, stop_clone),
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, chunk_tx, stop_clone),
            SampleFormat::I32 => Self::build_stream::<i32>(&device, &stream_config, chunk_tx, stop_clone),
            format => return Err(AudioInputError::ConfigError(format!("Unsupported format: {:?}", format))),
        }?;

        stream.play().map_err(|e| AudioInputError::StreamError(e.to_string()))?;

        Ok((InputStreamHandle { stop_flag, _stream: stream }, sample_rate, channels))
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        tx: Sender<Vec<f32>>,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, AudioInputError>
    where
        T: cpal::Sample + cpal::SizedSample + Send + 'static,
        f32: cpal::FromSample<T>,
    {
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if stop_flag.load(Ordering::SeqCst) {
                        return;
                    }
                    let samples: Vec<f32> = data.iter().map(|s| f32::from_sample_(*s)).collect();
                    let _ = tx.send(samples);
                },
                |err| error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| AudioInputError::StreamError(e.to_string()))
    }
}

/// Records from a cpal input device
#[derive(Debug, Clone)]
pub struct MicrophoneCapture {
    device_id: String,
}

impl Default for MicrophoneCapture {
    fn default() -> Self {
        Self::new("default")
    }
}

impl MicrophoneCapture {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self { device_id: device_id.into() }
    }
}

impl Capture for MicrophoneCapture {
    fn start(&mut self) -> arpeggio_core::Result<Box<dyn CaptureSession>> {
        let (chunk_tx, chunk_rx) = unbounded();
        let (handle, sample_rate, channels) = AudioInputService::start_stream(&self.device_id, chunk_tx)?;
        Ok(Box::new(MicrophoneSession { handle, chunk_rx, sample_rate, channels }))
    }
}

/// A live microphone recording; chunks buffer in a channel until stop
pub struct MicrophoneSession {
    handle: InputStreamHandle,
    chunk_rx: Receiver<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

/// Concatenate buffered chunks, in arrival order
fn drain_chunks(rx: &Receiver<Vec<f32>>) -> Vec<f32> {
    rx.try_iter().flatten().collect()
}

impl CaptureSession for MicrophoneSession {
    fn stop(self: Box<Self>) -> arpeggio_core::Result<Vec<u8>> {
        let MicrophoneSession { handle, chunk_rx, sample_rate, channels } = *self;
        handle.stop();
        drop(handle);

        let samples = drain_chunks(&chunk_rx);
        if samples.is_empty() {
            warn!("Recording stopped with no captured audio");
            return Err(AudioInputError::Empty.into());
        }

        info!(
            frames = samples.len() / channels.max(1) as usize,
            sample_rate,
            channels,
            "Recording finalized"
        );
        encode_wav(&samples, channels, sample_rate)
    }
}
