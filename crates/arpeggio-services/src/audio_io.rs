//! Audio output: a lazily opened device stream that plays scheduled one-shots

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arpeggio_core::{ArpError, AudioOutput, DecodedBuffer, SourceBuffer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::mixer::{start_frame_for, Voice, VoiceBudget, VoiceMixer, MAX_VOICES};

#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("No audio output devices found")]
    NoDevices,
    #[error("Failed to get default output config: {0}")]
    ConfigError(String),
    #[error("Failed to build output stream: {0}")]
    StreamError(String),
    #[error("Playback failed: {0}")]
    PlaybackError(String),
}

impl From<AudioOutputError> for ArpError {
    fn from(err: AudioOutputError) -> Self {
        ArpError::Output(err.to_string())
    }
}

pub struct AudioOutputService;

impl AudioOutputService {
    /// Get default output device info
    pub fn get_default_device_info() -> Result<(String, u32, u16), AudioOutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevices)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioOutputError::ConfigError(e.to_string()))?;

        let name = device.name().unwrap_or_default();
        Ok((name, config.sample_rate().0, config.channels()))
    }
}

/// Resample mono samples between rates
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioOutputError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        samples.len(),
        1,
    ).map_err(|e| AudioOutputError::PlaybackError(format!("Resample init error: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).ceil() as usize;

    let input = vec![samples.to_vec()];
    let mut output: Vec<f32> = resampler
        .process(&input, None)
        .map_err(|e| AudioOutputError::PlaybackError(format!("Resample error: {}", e)))?
        .into_iter()
        .flatten()
        .collect();

    // Flush the filter tail so the end of the sound is not cut off
    while output.len() < delay + expected {
        let tail: Vec<f32> = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioOutputError::PlaybackError(format!("Resample error: {}", e)))?
            .into_iter()
            .flatten()
            .collect();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

/// Mono copy of a source buffer at a target rate, reused across notes of the same buffer
#[derive(Debug, Default)]
pub(crate) struct PreparedSample {
    cached: Option<(Arc<DecodedBuffer>, u32, Arc<Vec<f32>>)>,
}

impl PreparedSample {
    pub(crate) fn get(&mut self, buffer: &SourceBuffer, rate: u32) -> Result<Arc<Vec<f32>>, AudioOutputError> {
        if let Some((audio, cached_rate, data)) = &self.cached {
            if Arc::ptr_eq(audio, buffer.audio()) && *cached_rate == rate {
                return Ok(data.clone());
            }
        }

        let audio = buffer.audio();
        let data = Arc::new(resample(&audio.to_mono(), audio.sample_rate, rate)?);
        debug!(
            source = %buffer.kind(),
            from_rate = audio.sample_rate,
            to_rate = rate,
            frames = data.len(),
            "Prepared sample for playback"
        );
        self.cached = Some((audio.clone(), rate, data.clone()));
        Ok(data)
    }
}

/// Real-time audio output stream for engine playback
pub struct RealtimeOutputStream {
    stop_flag: Arc<AtomicBool>,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl RealtimeOutputStream {
    /// Start a real-time output stream that pulls samples from a callback
    pub fn start<F>(sample_callback: F) -> Result<Self, AudioOutputError>
    where
        F: FnMut(&mut [f32], u32, u16) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevices)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioOutputError::ConfigError(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let config: StreamConfig = supported_config.into();
        let callback = Arc::new(Mutex::new(sample_callback));

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stop_clone.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    let Ok(mut cb) = callback.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    cb(data, sample_rate, channels);
                },
                move |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        stream.play().map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "Started realtime output stream"
        );

        Ok(Self { stop_flag, sample_rate, _stream: stream })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

}

impl Drop for RealtimeOutputStream {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

struct RunningOutput {
    stream: RealtimeOutputStream,
    voice_tx: Sender<Voice>,
    budget: VoiceBudget,
    frames: Arc<AtomicU64>,
}

/// Default-device output. The stream opens on the first `resume`; its clock
/// counts frames rendered since then.
#[derive(Default)]
pub struct DeviceOutput {
    running: Option<RunningOutput>,
    prepared: PreparedSample,
}

impl DeviceOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn open() -> Result<RunningOutput, AudioOutputError> {
        let (voice_tx, voice_rx) = bounded::<Voice>(MAX_VOICES);
        let frames = Arc::new(AtomicU64::new(0));
        let frames_clone = frames.clone();
        let budget = VoiceBudget::new();
        let retired = budget.clone();
        let mut mixer = VoiceMixer::default();

        let stream = RealtimeOutputStream::start(move |data, _sample_rate, channels| {
            while let Ok(voice) = voice_rx.try_recv() {
                if !mixer.add(voice) {
                    error!("Voice table full, dropping note");
                    retired.release(1);
                }
            }
            let before = mixer.voice_count();
            mixer.render(data, channels as usize);
            retired.release(before - mixer.voice_count());
            frames_clone.store(mixer.frame(), Ordering::Release);
        })?;

        Ok(RunningOutput { stream, voice_tx, budget, frames })
    }
}

impl AudioOutput for DeviceOutput {
    fn now(&self) -> f64 {
        match &self.running {
            Some(running) => {
                running.frames.load(Ordering::Acquire) as f64 / running.stream.sample_rate() as f64
            }
            None => 0.0,
        }
    }

    fn schedule_one_shot(&mut self, buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> arpeggio_core::Result<()> {
        let Some(running) = &self.running else {
            return Err(AudioOutputError::PlaybackError("output not started".into()).into());
        };

        let rate = running.stream.sample_rate();
        let start_frame = start_frame_for(start_time, pitch_ratio, rate, running.frames.load(Ordering::Acquire))?;
        let data = self.prepared.get(buffer, rate)?;

        running.budget.try_reserve()?;
        running
            .voice_tx
            .try_send(Voice::new(data, start_frame, pitch_ratio))
            .map_err(|e| {
                running.budget.release(1);
                match e {
                    TrySendError::Full(_) => AudioOutputError::PlaybackError("too many pending notes".into()),
                    TrySendError::Disconnected(_) => AudioOutputError::PlaybackError("output stream closed".into()),
                }
            })?;
        Ok(())
    }

    fn resume(&mut self) -> arpeggio_core::Result<()> {
        if self.running.is_none() {
            self.running = Some(Self::open()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpeggio_core::SourceKind;

    #[test]
    fn test_resample_same_rate_is_copy() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 48000, 48000).unwrap(), samples);
        assert!(resample(&[], 44100, 48000).unwrap().is_empty());
    }

    #[test]
    fn test_resample_keeps_timing_and_length() {
        let mut samples = vec![0.0f32; 800];
        samples[400] = 1.0;
        let out = resample(&samples, 8000, 16000).unwrap();
        assert_eq!(out.len(), 1600);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak.abs_diff(800) <= 1, "peak at {peak}");

        // The end of a sustained sound survives
        let tone = resample(&[0.5; 800], 8000, 16000).unwrap();
        assert!((tone[800] - 0.5).abs() < 0.01, "{}", tone[800]);
        assert!(tone[1590] > 0.2, "{}", tone[1590]);
    }

    #[test]
    fn test_prepared_sample_cached_per_buffer() {
        let mut prepared = PreparedSample::default();
        let a = SourceBuffer::new(SourceKind::Uploaded, 1, DecodedBuffer::new(8000, vec![vec![0.5; 32]]));
        let b = SourceBuffer::new(SourceKind::Uploaded, 2, DecodedBuffer::new(8000, vec![vec![0.5; 32]]));

        let first = prepared.get(&a, 8000).unwrap();
        let again = prepared.get(&a, 8000).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let other = prepared.get(&b, 8000).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.len(), 32);
    }

    #[test]
    fn test_schedule_before_resume_fails() {
        let mut output = DeviceOutput::new();
        let buffer = SourceBuffer::new(SourceKind::Default, 1, DecodedBuffer::new(8000, vec![vec![0.0; 4]]));
        assert_eq!(output.now(), 0.0);
        assert!(matches!(
            output.schedule_one_shot(&buffer, 1.0, 0.0),
            Err(ArpError::Output(_))
        ));
    }
}
