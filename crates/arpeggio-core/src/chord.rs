//! Chord shapes and their semitone interval table

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Chord quality selectable for an arpeggio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChordType {
    #[default]
    Major,
    Minor,
    Diminished,
    Augmented,
}

impl ChordType {
    pub const ALL: [ChordType; 4] = [Self::Major, Self::Minor, Self::Diminished, Self::Augmented];

    /// Parse a chord name. Unknown names resolve to `Major` with a warning.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "major" => Self::Major,
            "minor" => Self::Minor,
            "diminished" => Self::Diminished,
            "augmented" => Self::Augmented,
            other => {
                warn!(chord = other, "Unknown chord type, defaulting to major");
                Self::Major
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Diminished => "diminished",
            Self::Augmented => "augmented",
        }
    }

    /// Semitone intervals for one octave of this chord shape
    pub fn intervals(&self) -> IntervalSet {
        match self {
            Self::Major => IntervalSet::new(&[0, 4, 7]),
            Self::Minor => IntervalSet::new(&[0, 3, 7]),
            Self::Diminished => IntervalSet::new(&[0, 3, 6]),
            Self::Augmented => IntervalSet::new(&[0, 4, 8]),
        }
    }
}

impl From<&str> for ChordType {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for ChordType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for ChordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ascending semitone offsets above the root, first element always 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSet(&'static [i32]);

impl IntervalSet {
    pub(crate) const fn new(intervals: &'static [i32]) -> Self {
        Self(intervals)
    }

    pub fn as_slice(&self) -> &'static [i32] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }
}

/// Look up the interval set for a chord type
pub fn lookup(chord: ChordType) -> IntervalSet {
    chord.intervals()
}

/// Look up the interval set for a chord name; unknown names give the major set
pub fn lookup_name(name: &str) -> IntervalSet {
    ChordType::from_name(name).intervals()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chord_starts_at_root() {
        for chord in ChordType::ALL {
            let set = lookup(chord);
            assert!(!set.is_empty(), "{chord} is empty");
            assert_eq!(set.as_slice()[0], 0);
            assert!(set.as_slice().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_interval_table() {
        assert_eq!(lookup(ChordType::Major).as_slice(), &[0, 4, 7]);
        assert_eq!(lookup(ChordType::Minor).as_slice(), &[0, 3, 7]);
        assert_eq!(lookup(ChordType::Diminished).as_slice(), &[0, 3, 6]);
        assert_eq!(lookup(ChordType::Augmented).as_slice(), &[0, 4, 8]);
    }

    #[test]
    fn test_unknown_name_falls_back_to_major() {
        assert_eq!(lookup_name("sus4"), lookup(ChordType::Major));
        assert_eq!(lookup_name(""), lookup(ChordType::Major));
        assert_eq!(ChordType::from_name(" Minor "), ChordType::Minor);
    }
}
