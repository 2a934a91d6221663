//! parser.rs
//!
//! Decodes a Standard MIDI File into per-track lists of [`RawEvent`]s.
//!
//! `midly` reads the header and the events themselves (variable-length
//! deltas, running status). This module turns them into our own event type:
//!  - delta ticks are prefix-summed into absolute ticks, per track
//!  - NoteOn with velocity 0 becomes NoteOff (the running-status convention)
//!  - messages we have no use for (aftertouch, sysex, most meta) are dropped
//!
//! Tracks are *not* merged here. Intra-track order is preserved exactly and
//! every event remembers its `(track, index)` so later stages can sort across
//! tracks without losing identity.
//!
//! Track chunks are split here and each track's events are decoded by `midly` in
//! its strict mode, so a corrupt event is an error rather than a silent end
//! of track. The one exception is a track chunk that runs past the end of the
//! file: it ends at its first undecodable event and keeps everything decoded
//! before the cut. A bad header is fatal.

use log::{debug, warn};
use midly::{EventIter, MetaMessage, MidiMessage, Timing, TrackEventKind};

use crate::error::{MidiError, Result};
use crate::event::{EventId, Payload, RawEvent, Tick};

/// Division assumed for SMPTE-timed files, which have no ticks-per-quarter.
pub const SMPTE_FALLBACK_DIVISION: u16 = 480;

/// Chunk id plus big-endian length.
const CHUNK_HEADER_LEN: usize = 8;

/// Container contents before any timeline work.
#[derive(Debug)]
pub struct ParsedFile {
    /// Ticks per quarter note, always positive.
    pub division: u16,
    pub tracks: Vec<Vec<RawEvent>>,
}

pub fn parse(bytes: &[u8]) -> Result<ParsedFile> {
    let (header, tracks) = midly::parse(bytes).map_err(|e| MidiError::Malformed(e.to_string()))?;

    let division = match header.timing {
        Timing::Metrical(t) => t.as_int(),
        Timing::Timecode(fps, subframes) => {
            warn!(
                "SMPTE timing ({fps:?}, {subframes} subframes) is not supported, assuming {SMPTE_FALLBACK_DIVISION} ticks per quarter"
            );
            SMPTE_FALLBACK_DIVISION
        }
    };
    if division == 0 {
        return Err(MidiError::Malformed("division is zero".into()));
    }

    let tracks = track_chunks(tracks.unread())
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| decode_track(i, chunk))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedFile { division, tracks })
}

/// Body of one `MTrk` chunk.
#[derive(Clone, Copy, Debug)]
struct TrackChunk<'a> {
    data: &'a [u8],
    /// The declared length ran past the end of the file.
    cut_off: bool,
}

/// Track chunks following the header, in file order. Unknown chunk ids are
/// skipped.
fn track_chunks(mut raw: &[u8]) -> Vec<TrackChunk<'_>> {
    let mut chunks = Vec::new();
    while raw.len() >= CHUNK_HEADER_LEN {
        let (head, rest) = raw.split_at(CHUNK_HEADER_LEN);
        let len = read_u32_be(&head[4..]) as usize;
        let cut_off = len > rest.len();
        let (data, rest) = rest.split_at(len.min(rest.len()));
        if &head[..4] == b"MTrk" {
            chunks.push(TrackChunk { data, cut_off });
        }
        raw = rest;
    }
    if !raw.is_empty() {
        debug!("ignoring {} trailing bytes", raw.len());
    }
    chunks
}

fn read_u32_be(b: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&b[..4]);
    u32::from_be_bytes(buf)
}

fn decode_track(track: usize, chunk: TrackChunk<'_>) -> Result<Vec<RawEvent>> {
    let mut out = Vec::new();
    let mut tick: Tick = 0;
    let mut dropped = 0usize;

    for ev in EventIter::new(chunk.data) {
        let ev = match ev {
            Ok(ev) => ev,
            Err(e) if chunk.cut_off => {
                warn!("track {track}: file ends mid-track, keeping {} events ({e})", out.len());
                break;
            }
            Err(e) => return Err(MidiError::Malformed(format!("track {track}: {e}"))),
        };
        tick += Tick::from(ev.delta.as_int());

        match decode_kind(&ev.kind) {
            Some((channel, payload)) => {
                let id = EventId { track, index: out.len() };
                out.push(RawEvent { id, tick, channel, payload });
            }
            None if matches!(ev.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)) => {}
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("track {track}: dropped {dropped} unsupported messages");
    }
    Ok(out)
}

fn decode_kind(kind: &TrackEventKind<'_>) -> Option<(Option<u8>, Payload)> {
    match *kind {
        TrackEventKind::Midi { channel, message } => {
            let payload = match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
                    Payload::NoteOff { pitch: key.as_int() }
                }
                MidiMessage::NoteOn { key, vel } => {
                    Payload::NoteOn { pitch: key.as_int(), velocity: vel.as_int() }
                }
                MidiMessage::NoteOff { key, .. } => Payload::NoteOff { pitch: key.as_int() },
                MidiMessage::ProgramChange { program } => {
                    Payload::ProgramChange { program: program.as_int() }
                }
                MidiMessage::Controller { controller, value } => Payload::ControlChange {
                    controller: controller.as_int(),
                    value: value.as_int(),
                },
                MidiMessage::PitchBend { bend } => Payload::PitchBend { value: bend.0.as_int() },
                MidiMessage::Aftertouch { .. } | MidiMessage::ChannelAftertouch { .. } => {
                    return None;
                }
            };
            Some((Some(channel.as_int()), payload))
        }
        TrackEventKind::Meta(MetaMessage::Tempo(t)) => {
            let us_per_qn = t.as_int();
            if us_per_qn == 0 {
                warn!("ignoring tempo change of 0 µs per quarter note");
                return None;
            }
            Some((None, Payload::TempoChange { us_per_qn }))
        }
        TrackEventKind::Meta(MetaMessage::Text(bytes))
        | TrackEventKind::Meta(MetaMessage::Lyric(bytes)) => {
            Some((None, Payload::Text(String::from_utf8_lossy(bytes).into_owned())))
        }
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::smf_fixtures::*;
    use super::*;
    use midly::MetaMessage;
    use midly::num::{u7, u14};

    #[test]
    fn prefix_sums_deltas_per_track() {
        let bytes = smf_bytes(
            96,
            vec![
                vec![tempo(0, 400_000), tempo(192, 600_000)],
                vec![note_on(10, 0, 60, 90), note_off(50, 0, 60), note_on(50, 0, 62, 90)],
            ],
        );
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.division, 96);
        assert_eq!(parsed.tracks.len(), 2);

        let ticks: Vec<Tick> = parsed.tracks[1].iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![10, 50, 50]);
        assert_eq!(parsed.tracks[0][1].tick, 192);
        assert_eq!(parsed.tracks[0][1].payload, Payload::TempoChange { us_per_qn: 600_000 });
        assert_eq!(parsed.tracks[0][1].channel, None);
    }

    #[test]
    fn ids_follow_track_and_position() {
        let bytes = smf_bytes(
            96,
            vec![vec![tempo(0, 500_000)], vec![note_on(0, 3, 60, 90), note_off(10, 3, 60)]],
        );
        let parsed = parse(&bytes).unwrap();
        let ev = &parsed.tracks[1][1];
        assert_eq!(ev.id, EventId { track: 1, index: 1 });
        assert_eq!(ev.channel, Some(3));
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let bytes = smf_bytes(480, vec![vec![note_on(0, 0, 64, 100), note_on(240, 0, 64, 0)]]);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.tracks[0][0].payload, Payload::NoteOn { pitch: 64, velocity: 100 });
        assert_eq!(parsed.tracks[0][1].payload, Payload::NoteOff { pitch: 64 });
    }

    #[test]
    fn keeps_supported_messages_and_drops_the_rest() {
        let bytes = smf_bytes(
            480,
            vec![vec![
                program(0, 1, 40),
                midi(0, 1, MidiMessage::Controller { controller: u7::from(7), value: u7::from(100) }),
                midi(0, 1, MidiMessage::ChannelAftertouch { vel: u7::from(20) }),
                midi(5, 1, MidiMessage::PitchBend { bend: midly::PitchBend(u14::from(8192)) }),
                (6, TrackEventKind::Meta(MetaMessage::Text(b"verse"))),
                (7, TrackEventKind::Meta(MetaMessage::TrackName(b"lead"))),
                (8, TrackEventKind::Meta(MetaMessage::Lyric(b"la"))),
            ]],
        );
        let parsed = parse(&bytes).unwrap();
        let payloads: Vec<&Payload> = parsed.tracks[0].iter().map(|e| &e.payload).collect();
        assert_eq!(
            payloads,
            vec![
                &Payload::ProgramChange { program: 40 },
                &Payload::ControlChange { controller: 7, value: 100 },
                &Payload::PitchBend { value: 8192 },
                &Payload::Text("verse".into()),
                &Payload::Text("la".into()),
            ]
        );
    }

    #[test]
    fn zero_tempo_is_dropped() {
        let bytes = smf_bytes(480, vec![vec![tempo(0, 0), tempo(10, 500_000)]]);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.tracks[0].len(), 1);
        assert_eq!(parsed.tracks[0][0].tick, 10);
    }

    #[test]
    fn corrupt_header_is_fatal() {
        assert!(matches!(parse(b"not a midi file"), Err(MidiError::Malformed(_))));
        assert!(matches!(parse(&[]), Err(MidiError::Malformed(_))));
    }

    #[test]
    fn corrupt_status_byte_is_fatal() {
        let mut bytes = smf_bytes(
            480,
            vec![vec![
                note_on(0, 0, 60, 90),
                note_off(480, 0, 60),
                note_on(960, 0, 62, 90),
                note_off(1440, 0, 62),
            ]],
        );
        // The first note-off's status byte becomes an undefined system message.
        let at = bytes.windows(2).position(|w| w == [0x80, 60]).unwrap();
        bytes[at] = 0xF4;
        assert!(matches!(parse(&bytes), Err(MidiError::Malformed(_))));
    }

    #[test]
    fn corrupt_track_after_a_good_one_is_fatal() {
        let mut bytes = smf_bytes(
            96,
            vec![vec![tempo(0, 500_000)], vec![note_on(0, 1, 64, 90), note_off(96, 1, 64)]],
        );
        let at = bytes.windows(2).position(|w| w == [0x81, 64]).unwrap();
        bytes[at] = 0xF4;
        let err = parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("track 1"));
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let bytes = smf_bytes(96, vec![vec![note_on(0, 0, 60, 90), note_off(96, 0, 60)]]);
        // Header chunk is 14 bytes; slot an unknown chunk in before the track.
        let extra = [b'X', b'F', b'I', b'H', 0, 0, 0, 3, 1, 2, 3];
        let bytes = [&bytes[..14], &extra[..], &bytes[14..]].concat();
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.tracks[0].len(), 2);
    }

    #[test]
    fn truncated_track_keeps_decoded_events() {
        let mut bytes = smf_bytes(
            480,
            vec![vec![note_on(0, 0, 60, 90), note_off(480, 0, 60), note_on(960, 0, 62, 90)]],
        );
        // Cut into the end-of-track meta event.
        bytes.truncate(bytes.len() - 2);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert!(parsed.tracks[0].len() >= 2);
        assert_eq!(parsed.tracks[0][1].payload, Payload::NoteOff { pitch: 60 });
    }
}
