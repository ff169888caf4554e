//! Decoded PCM audio

/// Planar PCM audio produced by an [`AudioDecoder`](crate::AudioDecoder)
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    pub sample_rate: u32,
    /// One sample vector per channel, all the same length
    pub channels: Vec<Vec<f32>>,
}

impl DecodedBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self { sample_rate, channels }
    }

    /// Build from interleaved samples
    pub fn from_interleaved(samples: &[f32], channel_count: u16, sample_rate: u32) -> Self {
        let count = channel_count.max(1) as usize;
        let mut channels = vec![Vec::with_capacity(samples.len() / count); count];
        for frame in samples.chunks_exact(count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self { sample_rate, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn len_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len_frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len_frames() as f64 / self.sample_rate as f64
    }

    /// Mix all channels down to mono by averaging
    pub fn to_mono(&self) -> Vec<f32> {
        let count = self.channel_count();
        if count <= 1 {
            return self.channels.first().cloned().unwrap_or_default();
        }
        (0..self.len_frames())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() / count as f32)
            .collect()
    }
}
