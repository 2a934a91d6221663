//! time.rs
//!
//! Tick ↔ seconds conversion under a piecewise-constant tempo.
//!
//! Between two tempo entries time runs linearly, so the wall-clock time of a
//! tick is the sum of every complete tempo span before it plus the partial
//! span of the tempo in effect. The span sums are computed once, in map
//! order, so a lookup is a binary search and the result is bit-for-bit what
//! walking the map would give.
//!
//! Negative ticks (pre-roll) are extrapolated with the first tempo only.

use std::sync::Arc;

use crate::event::{RawEvent, Tick};
use crate::tempo::{TempoEntry, TempoMap};

/// Converts between ticks and seconds for one file.
///
/// Holds the tempo map behind an `Arc`: a transport that shares the same map
/// stays in step with every time this converter produces.
#[derive(Clone, Debug)]
pub struct TimeConverter {
    tempo_map: Arc<TempoMap>,
    division: u16,
    /// Seconds at each entry's tick.
    starts: Vec<f64>,
}

impl TimeConverter {
    pub fn new(tempo_map: Arc<TempoMap>, division: u16) -> Self {
        let entries = tempo_map.entries();
        let first = tempo_map.first();

        let mut starts = Vec::with_capacity(entries.len());
        let mut seconds = first.seconds_for(first.tick as f64, division);
        starts.push(seconds);
        for pair in entries.windows(2) {
            seconds += pair[0].seconds_for((pair[1].tick - pair[0].tick) as f64, division);
            starts.push(seconds);
        }

        Self { tempo_map, division, starts }
    }

    pub fn tempo_map(&self) -> &Arc<TempoMap> {
        &self.tempo_map
    }

    pub fn division(&self) -> u16 {
        self.division
    }

    pub fn tick_to_seconds(&self, tick: Tick) -> f64 {
        let first = self.tempo_map.first();
        if tick < 0 {
            return first.seconds_for(tick as f64, self.division);
        }

        let n = self.tempo_map.entries().partition_point(|e| e.tick <= tick);
        if n == 0 {
            return first.seconds_for(tick as f64, self.division);
        }
        let entry = &self.tempo_map.entries()[n - 1];
        self.starts[n - 1] + entry.seconds_for((tick - entry.tick) as f64, self.division)
    }

    /// Fractional tick at `seconds`. Inverse of [`Self::tick_to_seconds`] up to
    /// floating point rounding.
    pub fn seconds_to_tick(&self, seconds: f64) -> f64 {
        if seconds < 0.0 {
            let first = self.tempo_map.first();
            return seconds / first.seconds_for(1.0, self.division);
        }
        let i = self.entry_index_at(seconds);
        let entry = &self.tempo_map.entries()[i];
        entry.tick as f64 + (seconds - self.starts[i]) / entry.seconds_for(1.0, self.division)
    }

    /// Seconds at which tempo entry `entry` takes effect.
    pub fn entry_start(&self, entry: usize) -> Option<f64> {
        self.starts.get(entry).copied()
    }

    pub fn tempo_at_tick(&self, tick: Tick) -> &TempoEntry {
        self.tempo_map.tempo_at(tick)
    }

    /// Tempo in effect at `seconds`; the first tempo before the timeline
    /// starts, the last one after the final change.
    pub fn tempo_at_time(&self, seconds: f64) -> &TempoEntry {
        &self.tempo_map.entries()[self.entry_index_at(seconds)]
    }

    /// BPM in effect when playback starts.
    pub fn first_tempo_bpm(&self) -> f64 {
        self.tempo_map.tempo_at(0).bpm()
    }

    fn entry_index_at(&self, seconds: f64) -> usize {
        self.starts.partition_point(|s| *s <= seconds).saturating_sub(1)
    }
}

/// Places events on the wall clock.
pub trait EventClock {
    fn event_seconds(&self, ev: &RawEvent) -> f64;
}

impl EventClock for TimeConverter {
    fn event_seconds(&self, ev: &RawEvent) -> f64 {
        self.tick_to_seconds(ev.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::DEFAULT_US_PER_QN;

    fn converter(division: u16, entries: &[(Tick, u32)]) -> TimeConverter {
        let map = TempoMap::from_changes(
            entries.iter().map(|&(tick, us_per_qn)| TempoEntry { tick, us_per_qn }),
        );
        TimeConverter::new(Arc::new(map), division)
    }

    #[test]
    fn constant_tempo_is_closed_form() {
        let tc = converter(480, &[(0, DEFAULT_US_PER_QN)]);
        assert_eq!(tc.tick_to_seconds(0), 0.0);
        assert_eq!(tc.tick_to_seconds(480), 0.5);
        assert_eq!(tc.tick_to_seconds(1920), 2.0);
        assert_eq!(tc.first_tempo_bpm(), 120.0);
    }

    #[test]
    fn integrates_across_tempo_changes() {
        // 120 BPM for two beats, then 240 BPM.
        let tc = converter(480, &[(0, 500_000), (960, 250_000)]);
        assert_eq!(tc.tick_to_seconds(960), 1.0);
        assert_eq!(tc.tick_to_seconds(1440), 1.25);
        assert_eq!(tc.tick_to_seconds(480), 0.5);
        assert_eq!(tc.entry_start(1), Some(1.0));
        assert_eq!(tc.entry_start(2), None);
    }

    #[test]
    fn monotonic_and_continuous() {
        let tc = converter(96, &[(0, 700_000), (100, 200_000), (250, 1_500_000), (251, 300_000)]);
        let mut last = f64::NEG_INFINITY;
        for tick in -20..400 {
            let s = tc.tick_to_seconds(tick);
            assert!(s >= last, "tick {tick} went backwards");
            last = s;
        }
        // No jump at a change: the step into tick 100 is one tick at the old tempo.
        let step = tc.tick_to_seconds(100) - tc.tick_to_seconds(99);
        assert!((step - 0.7 / 96.0).abs() < 1e-12);
    }

    #[test]
    fn negative_ticks_use_first_tempo_only() {
        let tc = converter(480, &[(0, 1_000_000), (10, 100_000)]);
        assert_eq!(tc.tick_to_seconds(-480), -1.0);
        assert_eq!(tc.tick_to_seconds(-240), -0.5);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let tc = converter(480, &[(0, 512_345), (777, 333_333), (5000, 901_234)]);
        for tick in [0, 1, 776, 777, 4999, 123_456] {
            assert_eq!(tc.tick_to_seconds(tick).to_bits(), tc.tick_to_seconds(tick).to_bits());
        }
    }

    #[test]
    fn seconds_to_tick_inverts() {
        let tc = converter(480, &[(0, 500_000), (960, 250_000)]);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
        assert!(close(tc.seconds_to_tick(0.5), 480.0));
        assert!(close(tc.seconds_to_tick(1.25), 1440.0));
        assert!(close(tc.seconds_to_tick(-0.5), -480.0));
        for tick in [0, 17, 959, 960, 961, 10_000] {
            assert!(close(tc.seconds_to_tick(tc.tick_to_seconds(tick)), tick as f64));
        }
    }

    #[test]
    fn tempo_by_time_follows_the_map() {
        let tc = converter(480, &[(0, 500_000), (960, 250_000)]);
        assert_eq!(tc.tempo_at_time(-3.0).us_per_qn, 500_000);
        assert_eq!(tc.tempo_at_time(0.99).us_per_qn, 500_000);
        assert_eq!(tc.tempo_at_time(1.0).us_per_qn, 250_000);
        assert_eq!(tc.tempo_at_time(500.0).us_per_qn, 250_000);
        assert_eq!(tc.tempo_at_tick(959).us_per_qn, 500_000);
    }
}
