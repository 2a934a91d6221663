//! router.rs
//!
//! Splits the file's channel events into sixteen per-channel queues.
//!
//! Events from every track are concatenated in track order and each queue is
//! then stably sorted by tick, so same-tick events keep their file order.
//! Channel 9 is General MIDI percussion: it is handed on as one flat list and
//! never split into instruments. A channel that never plays a note is dropped.

use crate::event::{EventId, RawEvent};

pub const CHANNEL_COUNT: usize = 16;
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Per-channel queues borrowing from the parsed tracks.
#[derive(Debug, Default)]
pub struct Channels<'a> {
    bins: [Vec<&'a RawEvent>; CHANNEL_COUNT],
}

impl<'a> Channels<'a> {
    pub fn route(tracks: &'a [Vec<RawEvent>]) -> Self {
        let mut bins: [Vec<&'a RawEvent>; CHANNEL_COUNT] = Default::default();

        for ev in tracks.iter().flatten() {
            if let Some(ch) = ev.channel.filter(|&c| usize::from(c) < CHANNEL_COUNT) {
                bins[usize::from(ch)].push(ev);
            }
        }
        for bin in &mut bins {
            bin.sort_by_key(|e| e.tick);
            if !bin.iter().any(|e| e.is_note_on()) {
                bin.clear();
            }
        }

        Self { bins }
    }

    /// Events for `channel`, empty if it plays nothing. Includes channel 9.
    pub fn events(&self, channel: u8) -> &[&'a RawEvent] {
        self.bins.get(usize::from(channel)).map_or(&[], |b| b.as_slice())
    }

    /// Take the queue for `channel`, leaving it empty.
    pub fn take(&mut self, channel: u8) -> Vec<&'a RawEvent> {
        self.bins
            .get_mut(usize::from(channel))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Ids of every queue's events, in queue order, for holding on to the
    /// routing without the borrow.
    pub fn into_ids(self) -> [Vec<EventId>; CHANNEL_COUNT] {
        self.bins.map(|bin| bin.into_iter().map(|ev| ev.id).collect())
    }

    pub fn percussion(&self) -> &[&'a RawEvent] {
        self.events(PERCUSSION_CHANNEL)
    }

    /// Melodic channels that play at least one note, ascending.
    pub fn melodic(&self) -> impl Iterator<Item = u8> + '_ {
        (0..CHANNEL_COUNT as u8)
            .filter(|&ch| ch != PERCUSSION_CHANNEL && !self.bins[usize::from(ch)].is_empty())
    }
}
