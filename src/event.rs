//! event.rs
//!
//! Domain events decoded from a Standard MIDI File. Only the messages the
//! timeline cares about are kept, each reduced to plain integers. Events stay
//! on their tick rather than a clock time: a tick survives a tempo change
//! unchanged.

/// MIDI ticks. Signed so pre-roll offsets can be expressed below zero.
pub type Tick = i64;

/// Where an event came from: its track and its position within that track.
///
/// Two events are "the same event" exactly when their ids match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub track: usize,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Velocity is always 1..=127; velocity 0 is decoded as `NoteOff`.
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
    ProgramChange { program: u8 },
    /// Microseconds per quarter note, always positive.
    TempoChange { us_per_qn: u32 },
    /// Raw 14-bit value, 8192 is centered.
    PitchBend { value: u16 },
    ControlChange { controller: u8, value: u8 },
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEvent {
    pub id: EventId,
    pub tick: Tick,
    /// `None` for meta events (tempo, text).
    pub channel: Option<u8>,
    pub payload: Payload,
}

impl RawEvent {
    pub fn is_note_on(&self) -> bool {
        matches!(self.payload, Payload::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self.payload, Payload::NoteOff { .. })
    }

    /// Pitch of a note-on or note-off.
    pub fn pitch(&self) -> Option<u8> {
        match self.payload {
            Payload::NoteOn { pitch, .. } | Payload::NoteOff { pitch } => Some(pitch),
            _ => None,
        }
    }

    pub fn program(&self) -> Option<u8> {
        match self.payload {
            Payload::ProgramChange { program } => Some(program),
            _ => None,
        }
    }

    pub fn tempo(&self) -> Option<u32> {
        match self.payload {
            Payload::TempoChange { us_per_qn } => Some(us_per_qn),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built events for unit tests that don't need a real file.

    use super::*;

    pub fn ev(index: usize, tick: Tick, channel: u8, payload: Payload) -> RawEvent {
        RawEvent { id: EventId { track: 0, index }, tick, channel: Some(channel), payload }
    }

    pub fn on(index: usize, tick: Tick, pitch: u8) -> RawEvent {
        ev(index, tick, 0, Payload::NoteOn { pitch, velocity: 100 })
    }

    pub fn off(index: usize, tick: Tick, pitch: u8) -> RawEvent {
        ev(index, tick, 0, Payload::NoteOff { pitch })
    }

    pub fn program(index: usize, tick: Tick, program: u8) -> RawEvent {
        ev(index, tick, 0, Payload::ProgramChange { program })
    }

    pub fn tempo(track: usize, index: usize, tick: Tick, us_per_qn: u32) -> RawEvent {
        RawEvent {
            id: EventId { track, index },
            tick,
            channel: None,
            payload: Payload::TempoChange { us_per_qn },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn accessors_match_payload() {
        let n = on(0, 0, 60);
        assert!(n.is_note_on());
        assert!(!n.is_note_off());
        assert_eq!(n.pitch(), Some(60));
        assert_eq!(n.program(), None);

        let p = program(1, 0, 24);
        assert_eq!(p.program(), Some(24));
        assert_eq!(p.pitch(), None);

        assert_eq!(tempo(0, 0, 0, 500_000).tempo(), Some(500_000));
    }
}
