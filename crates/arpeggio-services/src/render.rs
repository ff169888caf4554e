//! Offline rendering of scheduled one-shots into a mono mix

use arpeggio_core::{ArpError, AudioOutput, Result, SourceBuffer};
use tracing::info;

use crate::audio_io::PreparedSample;
use crate::mixer::{start_frame_for, Voice, VoiceMixer, MASTER_GAIN};

const RENDER_BLOCK: usize = 1024;

/// An output whose clock only moves when [`render`](Self::render) is called
#[derive(Debug)]
pub struct OfflineOutput {
    sample_rate: u32,
    mixer: VoiceMixer,
    prepared: PreparedSample,
}

impl OfflineOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_gain(sample_rate, MASTER_GAIN)
    }

    pub fn with_gain(sample_rate: u32, gain: f32) -> Self {
        Self {
            sample_rate,
            mixer: VoiceMixer::new(gain),
            prepared: PreparedSample::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render until every scheduled voice has finished
    pub fn render(&mut self) -> Vec<f32> {
        let mut mix = Vec::new();
        let mut block = [0.0f32; RENDER_BLOCK];
        while !self.mixer.is_idle() {
            self.mixer.render(&mut block, 1);
            mix.extend_from_slice(&block);
        }
        // Trim the silent tail of the last block
        let end = mix.iter().rposition(|s| *s != 0.0).map_or(0, |i| i + 1);
        mix.truncate(end);
        info!(frames = mix.len(), sample_rate = self.sample_rate, "Rendered offline mix");
        mix
    }
}

impl AudioOutput for OfflineOutput {
    fn now(&self) -> f64 {
        self.mixer.frame() as f64 / self.sample_rate as f64
    }

    fn schedule_one_shot(&mut self, buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> Result<()> {
        let start_frame = start_frame_for(start_time, pitch_ratio, self.sample_rate, self.mixer.frame())?;
        let data = self.prepared.get(buffer, self.sample_rate)?;
        if !self.mixer.add(Voice::new(data, start_frame, pitch_ratio)) {
            return Err(ArpError::Output("voice table full".into()));
        }
        Ok(())
    }
}
