//! error.rs
//!
//! Only structural problems are errors. Per-event anomalies (unknown message
//! kinds, notes that never end, files without a tempo) are resolved where they
//! happen and logged, so one bad note never costs the whole file.

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    /// The container could not be decoded: bad or missing header, an
    /// undecodable track chunk, or a zero division.
    #[error("malformed MIDI file: {0}")]
    Malformed(String),
    /// A channel index outside 0..16 was asked for.
    #[error("no such MIDI channel: {0}")]
    InvalidChannel(u8),
}

pub type Result<T> = std::result::Result<T, MidiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = MidiError::Malformed("missing MThd".into());
        assert_eq!(err.to_string(), "malformed MIDI file: missing MThd");
        assert_eq!(MidiError::InvalidChannel(16).to_string(), "no such MIDI channel: 16");
    }
}
