//! Arpeggio settings and the lookup → build → schedule pipeline

use serde::{Deserialize, Serialize};

use crate::chord::{self, ChordType};
use crate::device::AudioOutput;
use crate::error::{ArpError, Result};
use crate::scheduler::{self, ScheduleReport};
use crate::sequence::{self, PatternType, MAX_OCTAVES};
use crate::source::SourceBuffer;

/// Everything needed to turn a sound into an arpeggio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggioRequest {
    pub chord: ChordType,
    pub octaves: i32,
    pub pattern: PatternType,
    pub tempo_bpm: f64,
}

impl Default for ArpeggioRequest {
    fn default() -> Self {
        Self {
            chord: ChordType::Major,
            octaves: 1,
            pattern: PatternType::Up,
            tempo_bpm: 120.0,
        }
    }
}

impl ArpeggioRequest {
    pub fn new(chord: ChordType, octaves: i32, pattern: PatternType, tempo_bpm: f64) -> Self {
        Self { chord, octaves, pattern, tempo_bpm }
    }

    /// Check every setting before anything is built or scheduled
    pub fn validate(&self) -> Result<()> {
        if self.octaves > MAX_OCTAVES {
            return Err(ArpError::InvalidConfiguration(format!(
                "octave count must be at most {MAX_OCTAVES}, got {}",
                self.octaves
            )));
        }
        scheduler::note_duration_secs(self.tempo_bpm)?;
        Ok(())
    }

    /// Semitone offsets this request plays, in order
    pub fn notes(&self) -> Vec<i32> {
        sequence::build(chord::lookup(self.chord), self.octaves, self.pattern)
    }
}

/// Build the request's note sequence and schedule it on `output` using `buffer`
pub fn play_arpeggio(
    request: &ArpeggioRequest,
    buffer: &SourceBuffer,
    output: &mut dyn AudioOutput,
) -> Result<ScheduleReport> {
    request.validate()?;
    let notes = request.notes();
    scheduler::schedule(&notes, request.tempo_bpm, buffer, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingOutput, test_buffer};

    #[test]
    fn test_play_minor_updown() {
        let request = ArpeggioRequest::new(ChordType::Minor, 1, PatternType::UpDown, 60.0);
        let mut output = RecordingOutput::at(0.0);
        let report = play_arpeggio(&request, &test_buffer(), &mut output).unwrap();

        let semis: Vec<i32> = report.scheduled.iter().map(|e| e.semitone_offset).collect();
        assert_eq!(semis, vec![0, 3, 7, 3, 0]);
        let starts: Vec<f64> = output.calls.iter().map(|c| c.start_time).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_octaves_schedules_nothing() {
        let request = ArpeggioRequest { octaves: 0, ..Default::default() };
        let mut output = RecordingOutput::at(0.0);
        let report = play_arpeggio(&request, &test_buffer(), &mut output).unwrap();
        assert!(report.is_empty());
        assert!(output.calls.is_empty());
    }

    #[test]
    fn test_bad_tempo_is_all_or_nothing() {
        let request = ArpeggioRequest { tempo_bpm: 0.0, octaves: 3, ..Default::default() };
        let mut output = RecordingOutput::at(0.0);
        let err = play_arpeggio(&request, &test_buffer(), &mut output).unwrap_err();
        assert!(matches!(err, ArpError::InvalidConfiguration(_)));
        assert!(output.calls.is_empty());
    }

    #[test]
    fn test_too_many_octaves_rejected() {
        let request = ArpeggioRequest { octaves: 1_000_000_000, ..Default::default() };
        let mut output = RecordingOutput::at(0.0);
        let err = play_arpeggio(&request, &test_buffer(), &mut output).unwrap_err();
        assert!(matches!(err, ArpError::InvalidConfiguration(_)));
        assert!(output.calls.is_empty());
        assert_eq!(output.resumes, 0);

        let widest = ArpeggioRequest { octaves: MAX_OCTAVES, ..Default::default() };
        assert!(widest.validate().is_ok());
        assert_eq!(widest.notes().len(), 24);
    }

    #[test]
    fn test_request_notes_default() {
        assert_eq!(ArpeggioRequest::default().notes(), vec![0, 4, 7]);
    }
}
