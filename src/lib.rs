//! MIDI timeline engine.
//!
//! Reads a Standard MIDI File once and answers timing questions about it:
//!  - tick ↔ seconds under every tempo change in the file ([`TimeConverter`])
//!  - which program each channel plays when ([`InstrumentSegment`])
//!  - how long each note sounds ([`NotePeriod`])
//!  - whether an instrument should be visible at a given moment
//!    ([`visibility::is_visible`])
//!
//! Start from [`MidiFile`]. Rendering and audio are someone else's job: this
//! crate only hands out times, segments and flags.

pub mod collector;
pub mod error;
pub mod event;
pub mod file;
pub mod parser;
pub mod period;
pub mod router;
pub mod segment;
pub mod tempo;
pub mod time;
pub mod visibility;

pub use collector::{EventCollector, NotePeriodCollector};
pub use error::MidiError;
pub use event::{EventId, Payload, RawEvent, Tick};
pub use file::MidiFile;
pub use period::NotePeriod;
pub use router::{CHANNEL_COUNT, PERCUSSION_CHANNEL};
pub use segment::{InstrumentPolicy, InstrumentSegment};
pub use tempo::{TempoEntry, TempoMap};
pub use time::{EventClock, TimeConverter};
pub use visibility::Schedule;
