//! Playback scheduling: semitone offsets to timed, pitched one-shots

use tracing::{debug, error, info};

use crate::device::AudioOutput;
use crate::error::{ArpError, Result};
use crate::sequence::SEMITONES_PER_OCTAVE;
use crate::source::SourceBuffer;

/// One note of a scheduled arpeggio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub semitone_offset: i32,
    /// Seconds after the arpeggio's reference start time
    pub scheduled_offset_secs: f64,
}

impl NoteEvent {
    pub fn pitch_ratio(&self) -> f64 {
        pitch_ratio(self.semitone_offset)
    }
}

/// Equal-tempered playback-rate ratio for a semitone offset
pub fn pitch_ratio(semitones: i32) -> f64 {
    // Whole octaves go through powi so octave ratios come out exact
    let octaves = semitones.div_euclid(SEMITONES_PER_OCTAVE);
    let rest = semitones.rem_euclid(SEMITONES_PER_OCTAVE);
    2f64.powi(octaves) * (rest as f64 / SEMITONES_PER_OCTAVE as f64).exp2()
}

/// Slowest tempo accepted; six seconds per note
pub const MIN_TEMPO_BPM: f64 = 10.0;

/// Seconds per beat, rejecting tempos that cannot produce valid start times
pub fn note_duration_secs(tempo_bpm: f64) -> Result<f64> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(ArpError::InvalidConfiguration(format!(
            "tempo must be a positive number of beats per minute, got {tempo_bpm}"
        )));
    }
    if tempo_bpm < MIN_TEMPO_BPM {
        return Err(ArpError::InvalidConfiguration(format!(
            "tempo must be at least {MIN_TEMPO_BPM} bpm, got {tempo_bpm}"
        )));
    }
    Ok(60.0 / tempo_bpm)
}

/// Lay notes out one beat apart starting at offset zero
pub fn note_events(notes: &[i32], tempo_bpm: f64) -> Result<Vec<NoteEvent>> {
    let duration = note_duration_secs(tempo_bpm)?;
    Ok(notes
        .iter()
        .enumerate()
        .map(|(k, &semitone_offset)| NoteEvent {
            semitone_offset,
            scheduled_offset_secs: duration * k as f64,
        })
        .collect())
}

/// Result of scheduling a sequence against an output
#[derive(Debug, Default)]
pub struct ScheduleReport {
    /// Reference clock time every note offset is relative to
    pub start_time: f64,
    /// Notes the output accepted
    pub scheduled: Vec<NoteEvent>,
    /// Notes the output rejected, with their index in the sequence
    pub failed: Vec<(usize, ArpError)>,
}

impl ScheduleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total notes attempted
    pub fn len(&self) -> usize {
        self.scheduled.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schedule every note of `notes` against `output`.
///
/// The tempo is validated before anything is issued. The output clock is
/// sampled once, so spacing between notes is exact. A note the output
/// rejects is reported and skipped; the rest are still issued.
pub fn schedule(
    notes: &[i32],
    tempo_bpm: f64,
    buffer: &SourceBuffer,
    output: &mut dyn AudioOutput,
) -> Result<ScheduleReport> {
    let events = note_events(notes, tempo_bpm)?;
    if events.is_empty() {
        debug!("Empty note sequence, nothing to schedule");
        return Ok(ScheduleReport::default());
    }

    output.resume()?;
    let start_time = output.now();

    let mut report = ScheduleReport {
        start_time,
        scheduled: Vec::with_capacity(events.len()),
        failed: Vec::new(),
    };

    for (k, event) in events.into_iter().enumerate() {
        let at = start_time + event.scheduled_offset_secs;
        match output.schedule_one_shot(buffer, event.pitch_ratio(), at) {
            Ok(()) => report.scheduled.push(event),
            Err(err) => {
                error!(index = k, semitones = event.semitone_offset, start_time = at, "Failed to schedule note: {}", err);
                report.failed.push((k, err));
            }
        }
    }

    info!(
        notes = report.len(),
        failed = report.failed.len(),
        tempo_bpm,
        source = %buffer.kind(),
        "Scheduled arpeggio"
    );

    Ok(report)
}
