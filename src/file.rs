//! file.rs
//!
//! `MidiFile` is the one context value the rest of a program holds on to.
//! It owns the decoded tracks, the tempo map and the converter built from it,
//! and answers every timeline question through them. Construction is
//! all-or-nothing: either the whole file decodes or you get an error.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::error::{MidiError, Result};
use crate::event::{EventId, RawEvent, Tick};
use crate::parser::{self, ParsedFile};
use crate::period::{self, NotePeriod};
use crate::router::{CHANNEL_COUNT, Channels, PERCUSSION_CHANNEL};
use crate::segment::{self, InstrumentPolicy, InstrumentSegment};
use crate::tempo::{TempoEntry, TempoMap};
use crate::time::{EventClock, TimeConverter};

#[derive(Debug)]
pub struct MidiFile {
    name: String,
    division: u16,
    tracks: Vec<Vec<RawEvent>>,
    tempo_map: Arc<TempoMap>,
    clock: TimeConverter,
    /// Seconds of every event, parallel to `tracks`.
    times: Vec<Vec<f64>>,
    /// Each channel's events, routed once at load.
    routes: [Vec<EventId>; CHANNEL_COUNT],
    length: f64,
}

impl MidiFile {
    /// Read and decode a file from disk.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("opening {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(name, &bytes).with_context(|| format!("reading {:?}", path))
    }

    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let ParsedFile { division, tracks } = parser::parse(bytes)?;

        let tempo_map = Arc::new(TempoMap::build(&tracks));
        let clock = TimeConverter::new(Arc::clone(&tempo_map), division);

        let times: Vec<Vec<f64>> = tracks
            .iter()
            .map(|track| track.iter().map(|ev| clock.tick_to_seconds(ev.tick)).collect())
            .collect();
        let last_tick = tracks.iter().flatten().map(|ev| ev.tick).max().unwrap_or(0);
        let length = clock.tick_to_seconds(last_tick);
        let routes = Channels::route(&tracks).into_ids();

        let name = name.into();
        info!(
            "{name}: {} tracks, division {division}, {} tempo entries, {length:.2}s",
            tracks.len(),
            tempo_map.len()
        );

        Ok(Self { name, division, tracks, tempo_map, clock, times, routes, length })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticks per quarter note.
    pub fn division(&self) -> u16 {
        self.division
    }

    pub fn tracks(&self) -> &[Vec<RawEvent>] {
        &self.tracks
    }

    /// Shared with any transport that must stay in step with these times.
    pub fn tempo_map(&self) -> &Arc<TempoMap> {
        &self.tempo_map
    }

    pub fn clock(&self) -> &TimeConverter {
        &self.clock
    }

    /// Seconds from the start to the last event.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn tick_to_seconds(&self, tick: Tick) -> f64 {
        self.clock.tick_to_seconds(tick)
    }

    pub fn seconds_to_tick(&self, seconds: f64) -> f64 {
        self.clock.seconds_to_tick(seconds)
    }

    pub fn first_tempo_bpm(&self) -> f64 {
        self.clock.first_tempo_bpm()
    }

    pub fn tempo_at_tick(&self, tick: Tick) -> &TempoEntry {
        self.tempo_map.tempo_at(tick)
    }

    pub fn tempo_before(&self, tick: Tick) -> &TempoEntry {
        self.tempo_map.tempo_before(tick)
    }

    pub fn tempo_at_time(&self, seconds: f64) -> &TempoEntry {
        self.clock.tempo_at_time(seconds)
    }

    /// Events of `channel` in tick order; empty if it plays no note.
    fn routed(&self, channel: u8) -> Vec<&RawEvent> {
        self.routes
            .get(usize::from(channel))
            .map(|ids| ids.iter().map(|id| &self.tracks[id.track][id.index]).collect())
            .unwrap_or_default()
    }

    /// Instrument segments of a melodic channel, in order. Empty for a
    /// channel that plays nothing and for the percussion channel, which is
    /// never segmented (see [`Self::percussion_events`]).
    pub fn instrument_segments(&self, channel: u8) -> Result<Vec<InstrumentSegment<'_>>> {
        if usize::from(channel) >= CHANNEL_COUNT {
            return Err(MidiError::InvalidChannel(channel));
        }
        if channel == PERCUSSION_CHANNEL {
            return Ok(Vec::new());
        }
        let events = self.routed(channel);
        if events.is_empty() {
            return Ok(Vec::new());
        }
        Ok(segment::segment(events))
    }

    /// Every channel 9 event, tick-ordered.
    pub fn percussion_events(&self) -> Vec<&RawEvent> {
        self.routed(PERCUSSION_CHANNEL)
    }

    pub fn note_periods<'a>(
        &self,
        events: impl IntoIterator<Item = &'a RawEvent>,
    ) -> Vec<NotePeriod> {
        period::note_periods(events, self)
    }

    /// Times of the note-ons among `events`.
    pub fn strike_times<'a>(&self, events: impl IntoIterator<Item = &'a RawEvent>) -> Vec<f64> {
        period::strikes(events).into_iter().map(|ev| self.event_seconds(ev)).collect()
    }

    /// Hand every segment of every melodic channel, then the percussion
    /// channel, to `policy`. Instruments the policy declines are left out.
    pub fn build_instruments<'a, P>(&'a self, policy: &mut P) -> Vec<P::Instrument>
    where
        P: InstrumentPolicy<'a>,
    {
        let mut instruments = Vec::new();

        for ch in 0..CHANNEL_COUNT as u8 {
            let events = self.routed(ch);
            if events.is_empty() {
                continue;
            }
            if ch == PERCUSSION_CHANNEL {
                instruments.extend(policy.percussion(events));
                continue;
            }
            for seg in segment::segment(events) {
                instruments.extend(policy.build(ch, seg));
            }
        }
        instruments
    }
}

impl EventClock for MidiFile {
    /// Looks up the time computed at load; events from elsewhere are
    /// converted on the spot.
    fn event_seconds(&self, ev: &RawEvent) -> f64 {
        let own = self
            .tracks
            .get(ev.id.track)
            .and_then(|t| t.get(ev.id.index))
            .is_some_and(|e| e.tick == ev.tick);
        if own {
            self.times[ev.id.track][ev.id.index]
        } else {
            self.clock.tick_to_seconds(ev.tick)
        }
    }
}
