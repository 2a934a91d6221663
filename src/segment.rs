//! segment.rs
//!
//! Splits one melodic channel into instrument segments at its program changes.
//!
//! A channel that switches from piano to strings halfway through is two
//! logical instruments. Each surviving program change opens a segment that
//! runs until the next one; the first segment also takes every event before
//! it, the last one everything after. Segments partition the channel: every
//! event lands in exactly one of them, in its original order.
//!
//! Program changes are cleaned up before splitting:
//!  - none at all means program 0 from tick 0
//!  - several on one tick collapse to the first of them
//!  - a change to the program already playing is ignored

use crate::event::{RawEvent, Tick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramMark {
    pub tick: Tick,
    pub program: u8,
}

/// One logical instrument: a program and the channel events it plays.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentSegment<'a> {
    pub program: u8,
    /// Tick of the program change that opened this segment.
    pub start_tick: Tick,
    pub events: Vec<&'a RawEvent>,
}

/// Decides what a program number becomes. Returning `None` is allowed and
/// drops the segment (and its timing data) from the result.
pub trait InstrumentPolicy<'a> {
    type Instrument;

    fn build(&mut self, channel: u8, segment: InstrumentSegment<'a>) -> Option<Self::Instrument>;

    fn percussion(&mut self, events: Vec<&'a RawEvent>) -> Option<Self::Instrument>;
}

/// Program changes of a tick-sorted channel, deduplicated.
pub fn program_marks<'a>(events: impl IntoIterator<Item = &'a RawEvent>) -> Vec<ProgramMark> {
    let mut marks: Vec<ProgramMark> = events
        .into_iter()
        .filter_map(|ev| ev.program().map(|program| ProgramMark { tick: ev.tick, program }))
        .collect();
    marks.sort_by_key(|m| m.tick);

    if marks.is_empty() {
        return vec![ProgramMark { tick: 0, program: 0 }];
    }
    dedup_marks(marks)
}

/// Keep a mark only if it differs in both tick and program from the last mark
/// kept. Of several changes on one tick the first stands; a change to the
/// program already playing extends the current segment.
pub fn dedup_marks(marks: Vec<ProgramMark>) -> Vec<ProgramMark> {
    let mut out: Vec<ProgramMark> = Vec::with_capacity(marks.len());
    for mark in marks {
        let repeats = out
            .last()
            .is_some_and(|last| last.tick == mark.tick || last.program == mark.program);
        if !repeats {
            out.push(mark);
        }
    }
    out
}

/// Split a tick-sorted channel into segments, moving its events.
pub fn segment(events: Vec<&RawEvent>) -> Vec<InstrumentSegment<'_>> {
    let marks = program_marks(events.iter().copied());

    let mut segments: Vec<InstrumentSegment<'_>> = marks
        .iter()
        .map(|m| InstrumentSegment { program: m.program, start_tick: m.tick, events: Vec::new() })
        .collect();

    // Boundaries between segments: every mark but the first.
    let bounds: Vec<Tick> = marks.iter().skip(1).map(|m| m.tick).collect();
    for ev in events {
        let i = bounds.partition_point(|&b| b <= ev.tick);
        segments[i].events.push(ev);
    }
    segments
}
