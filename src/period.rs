//! period.rs
//!
//! Note periods: the "blocks" of a piano roll, made by pairing each note-on
//! with a later note-off of the same pitch.
//!
//! Pairing rule: note-ons claim note-offs in order. The earliest unmatched
//! note-on of a pitch takes the first note-off of that pitch that follows it,
//! and a claimed note-off is gone for everyone else. With overlapping repeats
//! `On(60)@0, On(60)@10, Off(60)@20, Off(60)@30` this gives `0..20` and
//! `10..30`, never `0..30`. A note-on that finds no note-off is dropped.
//!
//! The pairing keeps one FIFO queue of open note-ons per pitch, which yields
//! exactly the same pairs as scanning forward from every note-on.

use std::collections::VecDeque;

use log::debug;

use crate::event::{EventId, Payload, RawEvent, Tick};
use crate::time::EventClock;

#[derive(Clone, Debug, PartialEq)]
pub struct NotePeriod {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: Tick,
    pub end_tick: Tick,
    pub start_time: f64,
    pub end_time: f64,
    /// The note-on that started this period.
    pub on: EventId,
    /// The note-off that ended it.
    pub off: EventId,
}

impl NotePeriod {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Sounding at `time`: start inclusive, end exclusive.
    pub fn is_playing_at(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }

    /// Same pitch over the same ticks.
    pub fn same_notes(&self, other: &NotePeriod) -> bool {
        self.start_tick == other.start_tick
            && self.end_tick == other.end_tick
            && self.pitch == other.pitch
    }
}

/// Pair the note events of one segment (in tick order) into periods,
/// ordered by their note-on. Non-note events are skipped.
pub fn note_periods<'a>(
    events: impl IntoIterator<Item = &'a RawEvent>,
    clock: &impl EventClock,
) -> Vec<NotePeriod> {
    // Per pitch: stream position, note-on and velocity of each open note.
    let mut open: Vec<VecDeque<(usize, &RawEvent, u8)>> = vec![VecDeque::new(); 128];
    let mut paired: Vec<(usize, NotePeriod)> = Vec::new();

    for (order, ev) in events.into_iter().enumerate() {
        match ev.payload {
            Payload::NoteOn { pitch, velocity } => {
                if let Some(queue) = open.get_mut(usize::from(pitch)) {
                    queue.push_back((order, ev, velocity));
                }
            }
            Payload::NoteOff { pitch } => {
                let claimed = open.get_mut(usize::from(pitch)).and_then(VecDeque::pop_front);
                if let Some((on_order, on, velocity)) = claimed {
                    paired.push((on_order, period(on, ev, pitch, velocity, clock)));
                }
            }
            _ => {}
        }
    }

    let unterminated: usize = open.iter().map(VecDeque::len).sum();
    if unterminated > 0 {
        debug!("dropped {unterminated} note-ons without a matching note-off");
    }

    paired.sort_by_key(|&(order, _)| order);
    let mut periods: Vec<NotePeriod> = paired.into_iter().map(|(_, p)| p).collect();
    periods.dedup_by(|later, earlier| later.same_notes(earlier));
    periods
}

fn period(
    on: &RawEvent,
    off: &RawEvent,
    pitch: u8,
    velocity: u8,
    clock: &impl EventClock,
) -> NotePeriod {
    NotePeriod {
        pitch,
        velocity,
        start_tick: on.tick,
        end_tick: off.tick,
        start_time: clock.event_seconds(on),
        end_time: clock.event_seconds(off),
        on: on.id,
        off: off.id,
    }
}

/// Highest number of notes held at once. A note-off with nothing held is
/// ignored.
pub fn max_polyphony<'a>(events: impl IntoIterator<Item = &'a RawEvent>) -> usize {
    let mut current = 0usize;
    let mut max = 0usize;
    for ev in events {
        if ev.is_note_on() {
            current += 1;
        } else if ev.is_note_off() {
            current = current.saturating_sub(1);
        }
        max = max.max(current);
    }
    max
}

/// Note events whose pitch is one of `pitches`.
pub fn by_note<'a>(
    events: impl IntoIterator<Item = &'a RawEvent>,
    pitches: &[u8],
) -> Vec<&'a RawEvent> {
    events
        .into_iter()
        .filter(|ev| ev.pitch().is_some_and(|p| pitches.contains(&p)))
        .collect()
}

/// Periods whose pitch falls in `pitch_class` (0 = C .. 11 = B).
pub fn periods_modulus(periods: &[NotePeriod], pitch_class: u8) -> Vec<&NotePeriod> {
    periods.iter().filter(|p| p.pitch % 12 == pitch_class).collect()
}

/// Note-ons only: attacks without a duration, as percussion uses them.
pub fn strikes<'a>(events: impl IntoIterator<Item = &'a RawEvent>) -> Vec<&'a RawEvent> {
    events.into_iter().filter(|ev| ev.is_note_on()).collect()
}
