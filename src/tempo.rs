//! tempo.rs
//!
//! The tempo map: every tempo change in the file, from every track, merged
//! into one list ordered by tick with at most one entry per tick.
//!
//! Two changes on the same tick keep the one encountered *later* (track order
//! first, then position within the track). An empty map, or one whose first
//! change comes after tick 0, gets the MIDI default of 500 000 µs per quarter
//! (120 BPM) at tick 0, so the map always covers the whole timeline.

use log::info;

use crate::event::{RawEvent, Tick};

/// 120 BPM, the tempo a MIDI file has until it says otherwise.
pub const DEFAULT_US_PER_QN: u32 = 500_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempoEntry {
    pub tick: Tick,
    pub us_per_qn: u32,
}

impl TempoEntry {
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / f64::from(self.us_per_qn)
    }

    /// Seconds covered by `ticks` at this tempo.
    pub fn seconds_for(&self, ticks: f64, division: u16) -> f64 {
        (ticks / f64::from(division)) * (60.0 / self.bpm())
    }
}

/// Invariant: non-empty, ticks strictly increasing, first entry at tick ≤ 0.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoMap {
    entries: Vec<TempoEntry>,
}

impl TempoMap {
    /// Collect tempo changes from all tracks.
    pub fn build(tracks: &[Vec<RawEvent>]) -> Self {
        let changes = tracks
            .iter()
            .flatten()
            .filter_map(|ev| ev.tempo().map(|us_per_qn| TempoEntry { tick: ev.tick, us_per_qn }));
        Self::from_changes(changes)
    }

    /// Build from changes given in stream order.
    pub fn from_changes(changes: impl IntoIterator<Item = TempoEntry>) -> Self {
        let mut sorted: Vec<TempoEntry> = changes.into_iter().collect();
        // Stable: same-tick entries stay in stream order.
        sorted.sort_by_key(|e| e.tick);

        let mut entries: Vec<TempoEntry> = Vec::with_capacity(sorted.len() + 1);
        for entry in sorted {
            match entries.last_mut() {
                Some(last) if last.tick == entry.tick => *last = entry,
                _ => entries.push(entry),
            }
        }

        if entries.first().is_none_or(|first| first.tick > 0) {
            if entries.is_empty() {
                info!("no tempo events, using {DEFAULT_US_PER_QN} µs per quarter note");
            }
            entries.insert(0, TempoEntry { tick: 0, us_per_qn: DEFAULT_US_PER_QN });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[TempoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true: a map holds at least the default tempo.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> &TempoEntry {
        &self.entries[0]
    }

    /// Last entry strictly before `tick`, or the first entry.
    pub fn tempo_before(&self, tick: Tick) -> &TempoEntry {
        let n = self.entries.partition_point(|e| e.tick < tick);
        &self.entries[n.saturating_sub(1)]
    }

    /// Last entry at or before `tick`, or the first entry.
    pub fn tempo_at(&self, tick: Tick) -> &TempoEntry {
        let n = self.entries.partition_point(|e| e.tick <= tick);
        &self.entries[n.saturating_sub(1)]
    }
}
