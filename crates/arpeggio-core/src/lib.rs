//! arpeggio-core: Chord tables, note sequencing, playback scheduling and source selection

pub mod arpeggio;
mod buffer;
pub mod chord;
mod device;
mod error;
pub mod scheduler;
pub mod sequence;
pub mod source;
#[cfg(test)]
mod testing;

pub use arpeggio::{play_arpeggio, ArpeggioRequest};
pub use buffer::DecodedBuffer;
pub use chord::{lookup, lookup_name, ChordType, IntervalSet};
pub use device::{AudioDecoder, AudioOutput, Capture, CaptureSession, Fetch};
pub use error::{ArpError, Result};
pub use scheduler::{
    note_duration_secs, note_events, pitch_ratio, schedule, NoteEvent, ScheduleReport, MIN_TEMPO_BPM,
};
pub use sequence::{build, PatternType, MAX_OCTAVES, SEMITONES_PER_OCTAVE};
pub use source::{
    LoadOutcome, LoadTicket, Resolution, SlotStatus, SourceBuffer, SourceIntent, SourceKind,
    SourceResolver,
};
