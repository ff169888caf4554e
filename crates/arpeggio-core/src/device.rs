//! Seams to the outside world: decoding, output, capture and fetch

use crate::buffer::DecodedBuffer;
use crate::error::Result;
use crate::source::SourceBuffer;

/// Turns encoded audio bytes into PCM
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer>;
}

/// Something that can play a buffer at a playback-rate ratio at a given clock time
pub trait AudioOutput {
    /// Current output clock in seconds
    fn now(&self) -> f64;

    /// Schedule a one-shot playback of `buffer` at `pitch_ratio`, starting at `start_time` seconds
    fn schedule_one_shot(&mut self, buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> Result<()>;

    /// Create or wake the output context. Called before the clock is sampled.
    fn resume(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Starts live microphone recordings
pub trait Capture {
    fn start(&mut self) -> Result<Box<dyn CaptureSession>>;
}

/// A running recording
pub trait CaptureSession {
    /// Stop recording, flush what was captured and return it encoded
    fn stop(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Retrieves raw bytes for a resource identifier
pub trait Fetch: Send + Sync {
    fn fetch(&self, resource: &str) -> Result<Vec<u8>>;
}
