//! collector.rs
//!
//! Forward-only cursors for consumers that walk the timeline frame by frame.
//!
//! The event lists themselves never change; a collector only keeps an index
//! of what has already been handed out. Time is expected to move forward.
//! Asking about an earlier time is harmless: nothing already returned is
//! returned again.

use crate::event::RawEvent;
use crate::period::NotePeriod;
use crate::time::EventClock;

/// Hands out events as the playhead passes them.
#[derive(Debug)]
pub struct EventCollector<'a> {
    /// Sorted by time, ties in input order.
    events: Vec<(f64, &'a RawEvent)>,
    cursor: usize,
}

impl<'a> EventCollector<'a> {
    pub fn new(events: impl IntoIterator<Item = &'a RawEvent>, clock: &impl EventClock) -> Self {
        let mut events: Vec<(f64, &'a RawEvent)> =
            events.into_iter().map(|ev| (clock.event_seconds(ev), ev)).collect();
        events.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { events, cursor: 0 }
    }

    /// Events at or before `time` that haven't been returned yet.
    pub fn advance(&mut self, time: f64) -> impl Iterator<Item = &'a RawEvent> + '_ {
        let start = self.cursor;
        self.cursor += self.events[start..].partition_point(|&(t, _)| t <= time);
        self.events[start..self.cursor].iter().map(|&(_, ev)| ev)
    }

    /// Like [`Self::advance`] but only the latest of the passed events.
    pub fn advance_one(&mut self, time: f64) -> Option<&'a RawEvent> {
        self.advance(time).last()
    }

    /// Next event not yet passed, with its time.
    pub fn peek(&self) -> Option<(f64, &'a RawEvent)> {
        self.events.get(self.cursor).copied()
    }

    /// Most recently passed event.
    pub fn prev(&self) -> Option<(f64, &'a RawEvent)> {
        self.cursor.checked_sub(1).and_then(|i| self.events.get(i)).copied()
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.events.len()
    }
}

/// Tracks which note periods are sounding as the playhead moves.
#[derive(Debug)]
pub struct NotePeriodCollector<'a> {
    periods: Vec<&'a NotePeriod>,
    cursor: usize,
    current: Vec<&'a NotePeriod>,
    time: f64,
}

impl<'a> NotePeriodCollector<'a> {
    pub fn new(periods: &'a [NotePeriod]) -> Self {
        let mut periods: Vec<&'a NotePeriod> = periods.iter().collect();
        periods.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Self { periods, cursor: 0, current: Vec::new(), time: f64::NEG_INFINITY }
    }

    /// Periods sounding at `time`. An earlier `time` than the last call is
    /// treated as the last call's time.
    pub fn advance(&mut self, time: f64) -> &[&'a NotePeriod] {
        self.time = self.time.max(time);
        let now = self.time;

        while let Some(&p) = self.periods.get(self.cursor) {
            if p.start_time > now {
                break;
            }
            self.current.push(p);
            self.cursor += 1;
        }
        self.current.retain(|p| now < p.end_time);
        &self.current
    }

    pub fn current(&self) -> &[&'a NotePeriod] {
        &self.current
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.periods.len() && self.current.is_empty()
    }
}
