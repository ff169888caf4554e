//! In-memory collaborators for unit tests

use std::collections::{HashMap, VecDeque};

use arpeggio_core::{
    ArpError, AudioDecoder, AudioOutput, Capture, CaptureSession, DecodedBuffer, Fetch, Result, SourceBuffer,
};

/// "Decodes" bytes into a short constant buffer whose value is the first byte
pub(crate) struct FakeDecoder;

impl AudioDecoder for FakeDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer> {
        match bytes.first() {
            Some(&b) => Ok(DecodedBuffer::new(1000, vec![vec![b as f32; 8]])),
            None => Err(ArpError::Decode("empty input".into())),
        }
    }
}

pub(crate) struct FakeFetcher {
    resources: HashMap<String, Vec<u8>>,
}

impl FakeFetcher {
    pub fn with(resource: &str, bytes: Vec<u8>) -> Self {
        Self { resources: HashMap::from([(resource.to_string(), bytes)]) }
    }
}

impl Fetch for FakeFetcher {
    fn fetch(&self, resource: &str) -> Result<Vec<u8>> {
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| ArpError::Fetch(format!("{resource}: not found")))
    }
}

/// Hands out recordings from a queue; `None` entries simulate a denied microphone
pub(crate) struct FakeCapture {
    takes: VecDeque<Option<Vec<u8>>>,
}

impl FakeCapture {
    pub fn with_takes(takes: Vec<Option<Vec<u8>>>) -> Self {
        Self { takes: takes.into() }
    }
}

impl Capture for FakeCapture {
    fn start(&mut self) -> Result<Box<dyn CaptureSession>> {
        match self.takes.pop_front().flatten() {
            Some(bytes) => Ok(Box::new(FakeTake(bytes))),
            None => Err(ArpError::Capture("permission denied".into())),
        }
    }
}

struct FakeTake(Vec<u8>);

impl CaptureSession for FakeTake {
    fn stop(self: Box<Self>) -> Result<Vec<u8>> {
        Ok(self.0)
    }
}

/// Records (source value, pitch ratio, start time) for every scheduled one-shot
#[derive(Default)]
pub(crate) struct RecordingOutput {
    pub calls: Vec<(f32, f64, f64)>,
}

impl AudioOutput for RecordingOutput {
    fn now(&self) -> f64 {
        0.0
    }

    fn schedule_one_shot(&mut self, buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> Result<()> {
        let marker = buffer.audio().channels[0][0];
        self.calls.push((marker, pitch_ratio, start_time));
        Ok(())
    }
}
