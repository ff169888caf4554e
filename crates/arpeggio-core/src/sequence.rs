//! Arpeggio note sequence builder

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chord::IntervalSet;

pub const SEMITONES_PER_OCTAVE: i32 = 12;

/// Largest octave span an arpeggio may cover
pub const MAX_OCTAVES: i32 = 8;

/// Traversal order of the built sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PatternType {
    #[default]
    Up,
    Down,
    UpDown,
}

impl PatternType {
    pub const ALL: [PatternType; 3] = [Self::Up, Self::Down, Self::UpDown];

    /// Parse a pattern name. Anything unrecognized plays as `Up`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "down" => Self::Down,
            "updown" => Self::UpDown,
            _ => Self::Up,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::UpDown => "updown",
        }
    }
}

impl From<&str> for PatternType {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for PatternType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the semitone offsets of an arpeggio.
///
/// Each octave `o` in `0..octaves` contributes every interval shifted by
/// `12 * o`. The octave count is clamped to `0..=MAX_OCTAVES`, so a negative
/// count gives an empty sequence.
///
/// # Example
/// ```
/// use arpeggio_core::{build, ChordType, PatternType};
/// let notes = build(ChordType::Major.intervals(), 1, PatternType::UpDown);
/// assert_eq!(notes, vec![0, 4, 7, 4, 0]);
/// ```
pub fn build(intervals: IntervalSet, octaves: i32, pattern: PatternType) -> Vec<i32> {
    let octaves = octaves.clamp(0, MAX_OCTAVES);

    let mut sequence = Vec::with_capacity(octaves as usize * intervals.len());
    for oct in 0..octaves {
        let oct_offset = oct * SEMITONES_PER_OCTAVE;
        sequence.extend(intervals.iter().map(|i| i + oct_offset));
    }

    match pattern {
        PatternType::Up => {}
        PatternType::Down => sequence.reverse(),
        PatternType::UpDown => {
            // Peak is shared by both halves, so the descent starts one below it
            let descent: Vec<i32> = sequence.iter().rev().skip(1).copied().collect();
            sequence.extend(descent);
        }
    }

    sequence
}
