//! In-memory collaborators for unit tests

use std::cell::Cell;

use crate::buffer::DecodedBuffer;
use crate::device::AudioOutput;
use crate::error::{ArpError, Result};
use crate::source::{SourceBuffer, SourceKind};

pub(crate) fn test_buffer() -> SourceBuffer {
    SourceBuffer::new(SourceKind::Default, 1, DecodedBuffer::new(44100, vec![vec![0.0; 16]]))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OutputCall {
    pub pitch_ratio: f64,
    pub start_time: f64,
}

/// Records every scheduled one-shot
pub(crate) struct RecordingOutput {
    clock: Cell<f64>,
    step: f64,
    pub calls: Vec<OutputCall>,
    pub resumes: usize,
}

impl RecordingOutput {
    pub fn at(now: f64) -> Self {
        Self { clock: Cell::new(now), step: 0.0, calls: Vec::new(), resumes: 0 }
    }

    /// Clock moves forward by `step` every time it is read
    pub fn advancing(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl AudioOutput for RecordingOutput {
    fn now(&self) -> f64 {
        let now = self.clock.get();
        self.clock.set(now + self.step);
        now
    }

    fn schedule_one_shot(&mut self, _buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> Result<()> {
        self.calls.push(OutputCall { pitch_ratio, start_time });
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.resumes += 1;
        Ok(())
    }
}

/// Rejects the calls at the given positions, records the rest
pub(crate) struct FlakyOutput {
    fail_at: Vec<usize>,
    attempts: usize,
    pub inner: RecordingOutput,
}

impl FlakyOutput {
    pub fn failing_at(fail_at: &[usize]) -> Self {
        Self { fail_at: fail_at.to_vec(), attempts: 0, inner: RecordingOutput::at(0.0) }
    }
}

impl AudioOutput for FlakyOutput {
    fn now(&self) -> f64 {
        self.inner.now()
    }

    fn schedule_one_shot(&mut self, buffer: &SourceBuffer, pitch_ratio: f64, start_time: f64) -> Result<()> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at.contains(&attempt) {
            return Err(ArpError::Output("device busy".into()));
        }
        self.inner.schedule_one_shot(buffer, pitch_ratio, start_time)
    }
}
