//! One-shot voice mixing shared by device and offline output

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arpeggio_core::{ArpError, Result};

/// Voices reserved up front so the audio thread does not allocate
pub const MAX_VOICES: usize = 256;

/// Furthest ahead of the output clock a note may be scheduled
pub const MAX_SCHEDULE_AHEAD_SECS: f64 = 600.0;

/// Frame a note scheduled at `start_time` begins on, for an output whose
/// clock is at `current_frame`. Times in the past start immediately.
pub fn start_frame_for(start_time: f64, pitch_ratio: f64, sample_rate: u32, current_frame: u64) -> Result<u64> {
    if !pitch_ratio.is_finite() || pitch_ratio <= 0.0 {
        return Err(ArpError::Output(format!("invalid pitch ratio {pitch_ratio}")));
    }
    if !start_time.is_finite() {
        return Err(ArpError::Output(format!("invalid start time {start_time}")));
    }
    let rate = sample_rate as f64;
    let now = current_frame as f64 / rate;
    if start_time - now > MAX_SCHEDULE_AHEAD_SECS {
        return Err(ArpError::Output(format!(
            "start time {start_time:.3}s is more than {MAX_SCHEDULE_AHEAD_SECS}s ahead of the output clock"
        )));
    }
    Ok((start_time.max(0.0) * rate).round() as u64)
}

/// Voice slots shared between a scheduling thread and the thread that mixes.
/// A slot is reserved before a voice is sent and released once it retires.
#[derive(Debug, Clone, Default)]
pub struct VoiceBudget {
    outstanding: Arc<AtomicUsize>,
}

impl VoiceBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slot. Fails when `MAX_VOICES` voices are queued or sounding.
    pub fn try_reserve(&self) -> Result<()> {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < MAX_VOICES).then_some(n + 1))
            .map(|_| ())
            .map_err(|_| ArpError::Output("voice table full".into()))
    }

    pub fn release(&self, count: usize) {
        if count > 0 {
            let _ = self
                .outstanding
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(count)));
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// Headroom for overlapping notes
pub const MASTER_GAIN: f32 = 0.5;

/// A single scheduled playback of a mono sample at a playback-rate ratio
#[derive(Debug, Clone)]
pub struct Voice {
    data: Arc<Vec<f32>>,
    start_frame: u64,
    position: f64,
    speed: f64,
    finished: bool,
}

impl Voice {
    pub fn new(data: Arc<Vec<f32>>, start_frame: u64, speed: f64) -> Self {
        Self {
            data,
            start_frame,
            position: 0.0,
            speed,
            finished: false,
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn tick(&mut self) -> f32 {
        if self.finished {
            return 0.0;
        }

        let pos = self.position;
        let idx = pos as usize;

        // End of sample
        if idx >= self.data.len().saturating_sub(1) {
            self.finished = true;
            return 0.0;
        }

        // Linear interpolation
        let frac = (pos - idx as f64) as f32;
        let s0 = self.data[idx];
        let s1 = self.data[idx + 1];

        self.position += self.speed;
        s0 + frac * (s1 - s0)
    }
}

/// Sums active voices frame by frame against a running frame clock
#[derive(Debug)]
pub struct VoiceMixer {
    voices: Vec<Voice>,
    frame: u64,
    gain: f32,
}

impl Default for VoiceMixer {
    fn default() -> Self {
        Self::new(MASTER_GAIN)
    }
}

impl VoiceMixer {
    pub fn new(gain: f32) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            frame: 0,
            gain,
        }
    }

    /// Queue a voice. Returns false when the voice table is full.
    pub fn add(&mut self, voice: Voice) -> bool {
        if self.voices.len() >= MAX_VOICES {
            return false;
        }
        self.voices.push(voice);
        true
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_idle(&self) -> bool {
        self.voices.is_empty()
    }

    /// Render interleaved output; every channel carries the same mono mix.
    /// Voices whose start frame has already passed begin immediately.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let mut sum = 0.0f32;
            for voice in self.voices.iter_mut() {
                if voice.start_frame <= self.frame {
                    sum += voice.tick();
                }
            }
            frame.fill((sum * self.gain).clamp(-1.0, 1.0));
            self.frame += 1;
        }
        self.voices.retain(|v| !v.finished);
    }
}
