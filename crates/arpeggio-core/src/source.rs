//! Source selection: which decoded buffer an arpeggio plays
//!
//! Three slots (uploaded, recorded, default) each hold at most one ready
//! buffer. Loads are tagged with a per-slot generation; only the most
//! recently issued load for a slot may install its result.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::DecodedBuffer;
use crate::error::{ArpError, Result};

/// Where a buffer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Uploaded,
    Recorded,
    Default,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uploaded => "uploaded",
            Self::Recorded => "recorded",
            Self::Default => "default",
        })
    }
}

/// The user's most recent source choice. Says nothing about readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceIntent {
    #[default]
    None,
    Upload,
    Record,
}

impl fmt::Display for SourceIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Upload => "upload",
            Self::Record => "record",
        })
    }
}

/// Shared handle to a decoded sound. Never mutated; a new decode makes a new handle.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    kind: SourceKind,
    generation: u64,
    audio: Arc<DecodedBuffer>,
}

impl SourceBuffer {
    pub fn new(kind: SourceKind, generation: u64, audio: DecodedBuffer) -> Self {
        Self { kind, generation, audio: Arc::new(audio) }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn audio(&self) -> &Arc<DecodedBuffer> {
        &self.audio
    }

    /// True when both handles point at the same decoded audio
    pub fn same_audio(&self, other: &SourceBuffer) -> bool {
        Arc::ptr_eq(&self.audio, &other.audio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Absent,
    Pending,
    Ready,
}

/// Identifies one in-flight load for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub kind: SourceKind,
    pub generation: u64,
}

/// What happened when a load result was handed back
#[derive(Debug)]
pub enum LoadOutcome {
    Installed(SourceBuffer),
    Failed(ArpError),
    /// A newer load for the same slot was issued; the result was dropped
    Stale,
}

/// Buffer picked for playback
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The buffer matching the user's intent (or the default when there is none)
    Selected(SourceBuffer),
    /// The default sound, standing in for a source that is not ready
    Fallback { buffer: SourceBuffer, requested: SourceIntent },
}

impl Resolution {
    pub fn buffer(&self) -> &SourceBuffer {
        match self {
            Self::Selected(buffer) | Self::Fallback { buffer, .. } => buffer,
        }
    }

    pub fn into_buffer(self) -> SourceBuffer {
        match self {
            Self::Selected(buffer) | Self::Fallback { buffer, .. } => buffer,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Debug, Default)]
struct Slot {
    ready: Option<SourceBuffer>,
    pending: Option<u64>,
    issued: u64,
}

impl Slot {
    fn status(&self) -> SlotStatus {
        match (&self.ready, self.pending) {
            (Some(_), _) => SlotStatus::Ready,
            (None, Some(_)) => SlotStatus::Pending,
            (None, None) => SlotStatus::Absent,
        }
    }

    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.pending = Some(self.issued);
        self.issued
    }
}

/// Tracks source intent and slot readiness, and picks the buffer to play
#[derive(Debug, Default)]
pub struct SourceResolver {
    intent: SourceIntent,
    uploaded: Slot,
    recorded: Slot,
    default: Slot,
}

impl SourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: SourceKind) -> &Slot {
        match kind {
            SourceKind::Uploaded => &self.uploaded,
            SourceKind::Recorded => &self.recorded,
            SourceKind::Default => &self.default,
        }
    }

    fn slot_mut(&mut self, kind: SourceKind) -> &mut Slot {
        match kind {
            SourceKind::Uploaded => &mut self.uploaded,
            SourceKind::Recorded => &mut self.recorded,
            SourceKind::Default => &mut self.default,
        }
    }

    pub fn intent(&self) -> SourceIntent {
        self.intent
    }

    /// Record a source-mode choice. Does not ready any buffer.
    pub fn select_intent(&mut self, intent: SourceIntent) {
        self.intent = intent;
    }

    pub fn status(&self, kind: SourceKind) -> SlotStatus {
        self.slot(kind).status()
    }

    /// True while a load for `kind` is in flight, even if an older buffer is still ready
    pub fn is_loading(&self, kind: SourceKind) -> bool {
        self.slot(kind).pending.is_some()
    }

    pub fn buffer(&self, kind: SourceKind) -> Option<&SourceBuffer> {
        self.slot(kind).ready.as_ref()
    }

    /// Start a load for `kind`, superseding any load already in flight.
    ///
    /// The default slot loads at most once: returns `None` when it is
    /// already ready or pending.
    pub fn begin_load(&mut self, kind: SourceKind) -> Option<LoadTicket> {
        let slot = self.slot_mut(kind);
        if kind == SourceKind::Default && slot.status() != SlotStatus::Absent {
            return None;
        }
        let generation = slot.issue();
        debug!(%kind, generation, "Load started");
        Some(LoadTicket { kind, generation })
    }

    /// Hand back the result of a load started with [`begin_load`](Self::begin_load).
    ///
    /// A success replaces the slot's buffer in one step and, for uploads and
    /// recordings, moves the intent to that source. A failure empties the slot.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<DecodedBuffer>) -> LoadOutcome {
        let slot = self.slot_mut(ticket.kind);
        if slot.pending != Some(ticket.generation) {
            debug!(kind = %ticket.kind, generation = ticket.generation, "Discarding stale load");
            return LoadOutcome::Stale;
        }
        slot.pending = None;

        match result {
            Ok(audio) => {
                let buffer = SourceBuffer::new(ticket.kind, ticket.generation, audio);
                slot.ready = Some(buffer.clone());
                match ticket.kind {
                    SourceKind::Uploaded => self.intent = SourceIntent::Upload,
                    SourceKind::Recorded => self.intent = SourceIntent::Record,
                    SourceKind::Default => {}
                }
                LoadOutcome::Installed(buffer)
            }
            Err(err) => {
                slot.ready = None;
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Empty a slot and invalidate any load in flight for it
    pub fn clear(&mut self, kind: SourceKind) {
        let slot = self.slot_mut(kind);
        slot.ready = None;
        slot.pending = None;
        slot.issued += 1;
    }

    /// Pick the buffer to play right now.
    ///
    /// Upload and record intents prefer their own slot and fall back to the
    /// default sound; with no intent only the default is used.
    pub fn resolve(&self) -> Result<Resolution> {
        let preferred = match self.intent {
            SourceIntent::Upload => self.uploaded.ready.as_ref(),
            SourceIntent::Record => self.recorded.ready.as_ref(),
            SourceIntent::None => None,
        };
        if let Some(buffer) = preferred {
            return Ok(Resolution::Selected(buffer.clone()));
        }

        let Some(default) = self.default.ready.as_ref() else {
            return Err(ArpError::NoSourceAvailable(self.intent));
        };

        if self.intent == SourceIntent::None {
            return Ok(Resolution::Selected(default.clone()));
        }

        warn!(intent = %self.intent, "Requested source not ready, using default sound");
        Ok(Resolution::Fallback { buffer: default.clone(), requested: self.intent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(marker: f32) -> DecodedBuffer {
        DecodedBuffer::new(44100, vec![vec![marker; 4]])
    }

    fn load(resolver: &mut SourceResolver, kind: SourceKind, marker: f32) -> SourceBuffer {
        let ticket = resolver.begin_load(kind).expect("ticket");
        match resolver.complete_load(ticket, Ok(audio(marker))) {
            LoadOutcome::Installed(buffer) => buffer,
            other => panic!("expected install, got {other:?}"),
        }
    }

    fn marker(resolution: &Resolution) -> f32 {
        resolution.buffer().audio().channels[0][0]
    }

    #[test]
    fn test_upload_preferred_over_default() {
        let mut r = SourceResolver::new();
        load(&mut r, SourceKind::Default, 0.0);
        load(&mut r, SourceKind::Uploaded, 1.0);
        assert_eq!(r.intent(), SourceIntent::Upload);

        let res = r.resolve().unwrap();
        assert!(!res.is_fallback());
        assert_eq!(res.buffer().kind(), SourceKind::Uploaded);
    }

    #[test]
    fn test_upload_missing_falls_back_to_default() {
        let mut r = SourceResolver::new();
        load(&mut r, SourceKind::Default, 0.0);
        r.select_intent(SourceIntent::Upload);

        let res = r.resolve().unwrap();
        assert!(res.is_fallback());
        assert_eq!(res.buffer().kind(), SourceKind::Default);
        assert!(matches!(res, Resolution::Fallback { requested: SourceIntent::Upload, .. }));
    }

    #[test]
    fn test_no_default_no_source() {
        let r = SourceResolver::new();
        assert!(matches!(r.resolve(), Err(ArpError::NoSourceAvailable(SourceIntent::None))));
    }

    #[test]
    fn test_resolution_exhaustive() {
        let intents = [SourceIntent::None, SourceIntent::Upload, SourceIntent::Record];
        for intent in intents {
            for mask in 0..8u8 {
                let (up, rec, def) = (mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
                let mut r = SourceResolver::new();
                if up {
                    load(&mut r, SourceKind::Uploaded, 1.0);
                }
                if rec {
                    load(&mut r, SourceKind::Recorded, 2.0);
                }
                if def {
                    load(&mut r, SourceKind::Default, 3.0);
                }
                r.select_intent(intent);

                let expected = match intent {
                    SourceIntent::Upload if up => Some((1.0, false)),
                    SourceIntent::Record if rec => Some((2.0, false)),
                    SourceIntent::None if def => Some((3.0, false)),
                    SourceIntent::None => None,
                    _ if def => Some((3.0, true)),
                    _ => None,
                };

                match (r.resolve(), expected) {
                    (Ok(res), Some((m, fallback))) => {
                        assert_eq!(marker(&res), m, "intent {intent} mask {mask}");
                        assert_eq!(res.is_fallback(), fallback, "intent {intent} mask {mask}");
                    }
                    (Err(ArpError::NoSourceAvailable(i)), None) => assert_eq!(i, intent),
                    (got, want) => panic!("intent {intent} mask {mask}: got {got:?}, want {want:?}"),
                }
            }
        }
    }

    #[test]
    fn test_stale_completion_discarded() {
        let mut r = SourceResolver::new();
        let first = r.begin_load(SourceKind::Uploaded).unwrap();
        let second = r.begin_load(SourceKind::Uploaded).unwrap();
        assert_eq!(r.status(SourceKind::Uploaded), SlotStatus::Pending);

        assert!(matches!(r.complete_load(second, Ok(audio(2.0))), LoadOutcome::Installed(_)));
        assert!(matches!(r.complete_load(first, Ok(audio(1.0))), LoadOutcome::Stale));

        let res = r.resolve().unwrap();
        assert_eq!(marker(&res), 2.0);
    }

    #[test]
    fn test_older_completion_after_newer_issue_is_stale() {
        let mut r = SourceResolver::new();
        let first = r.begin_load(SourceKind::Recorded).unwrap();
        let second = r.begin_load(SourceKind::Recorded).unwrap();
        assert!(matches!(r.complete_load(first, Ok(audio(1.0))), LoadOutcome::Stale));
        assert_eq!(r.status(SourceKind::Recorded), SlotStatus::Pending);
        assert!(matches!(r.complete_load(second, Ok(audio(2.0))), LoadOutcome::Installed(_)));
        assert_eq!(r.status(SourceKind::Recorded), SlotStatus::Ready);
    }

    #[test]
    fn test_failed_load_empties_slot() {
        let mut r = SourceResolver::new();
        load(&mut r, SourceKind::Default, 0.0);
        load(&mut r, SourceKind::Uploaded, 1.0);

        let ticket = r.begin_load(SourceKind::Uploaded).unwrap();
        // Previous upload stays usable while the replacement decodes
        assert_eq!(marker(&r.resolve().unwrap()), 1.0);

        let outcome = r.complete_load(ticket, Err(ArpError::Decode("bad header".into())));
        assert!(matches!(outcome, LoadOutcome::Failed(ArpError::Decode(_))));
        assert_eq!(r.status(SourceKind::Uploaded), SlotStatus::Absent);

        let res = r.resolve().unwrap();
        assert!(res.is_fallback());
    }

    #[test]
    fn test_default_loads_once() {
        let mut r = SourceResolver::new();
        let ticket = r.begin_load(SourceKind::Default).unwrap();
        assert!(r.begin_load(SourceKind::Default).is_none());
        r.complete_load(ticket, Ok(audio(0.0)));
        assert!(r.begin_load(SourceKind::Default).is_none());
        assert_eq!(r.intent(), SourceIntent::None);
    }

    #[test]
    fn test_default_retry_after_failure() {
        let mut r = SourceResolver::new();
        let ticket = r.begin_load(SourceKind::Default).unwrap();
        r.complete_load(ticket, Err(ArpError::Fetch("offline".into())));
        assert_eq!(r.status(SourceKind::Default), SlotStatus::Absent);
        assert!(r.begin_load(SourceKind::Default).is_some());
    }

    #[test]
    fn test_clear_invalidates_in_flight() {
        let mut r = SourceResolver::new();
        let ticket = r.begin_load(SourceKind::Uploaded).unwrap();
        r.clear(SourceKind::Uploaded);
        assert!(matches!(r.complete_load(ticket, Ok(audio(1.0))), LoadOutcome::Stale));
        assert_eq!(r.status(SourceKind::Uploaded), SlotStatus::Absent);
    }

    #[test]
    fn test_new_decode_is_new_handle() {
        let mut r = SourceResolver::new();
        let a = load(&mut r, SourceKind::Uploaded, 1.0);
        let b = load(&mut r, SourceKind::Uploaded, 1.0);
        assert!(!a.same_audio(&b));
        assert!(b.generation() > a.generation());
        assert_eq!(a.audio().channels[0][0], 1.0);
    }
}
