use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

use midi_timeline::visibility::{Schedule, is_visible};
use midi_timeline::{CHANNEL_COUNT, MidiFile, PERCUSSION_CHANNEL};

/// Print the timeline a MIDI file decodes to.
#[derive(Parser, Debug)]
struct Opt {
    /// Path to a Standard MIDI File (format 0 or 1)
    file: PathBuf,
    /// Only report this channel (0-15)
    #[arg(long)]
    channel: Option<u8>,
    /// Also report which instruments are visible at this time, in seconds
    #[arg(long)]
    at: Option<f64>,
}

/// Format seconds as MM:SS for the report.
fn format_duration(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    if let Some(ch) = opt.channel {
        if usize::from(ch) >= CHANNEL_COUNT {
            bail!("channel must be 0-{}, got {ch}", CHANNEL_COUNT - 1);
        }
    }

    let file = MidiFile::open(&opt.file)?;

    println!("File: {}", file.name());
    println!("Division: {} ticks per quarter", file.division());
    println!("Length: {}", format_duration(file.length()));
    println!("Initial tempo: {:.1} BPM", file.first_tempo_bpm());

    println!("\nTempo map:");
    for (i, entry) in file.tempo_map().entries().iter().enumerate() {
        let start = file.clock().entry_start(i).unwrap_or_default();
        println!(
            "  tick {:>8}  {:>8} µs/qn  {:>7.2} BPM  at {:.3}s",
            entry.tick,
            entry.us_per_qn,
            entry.bpm(),
            start
        );
    }

    let wanted = |ch: u8| opt.channel.is_none_or(|c| c == ch);

    println!("\nInstruments:");
    for ch in (0..CHANNEL_COUNT as u8).filter(|&ch| wanted(ch) && ch != PERCUSSION_CHANNEL) {
        for seg in file.instrument_segments(ch)? {
            let periods = file.note_periods(seg.events.iter().copied());
            print!(
                "  ch {ch:>2}  program {:>3}  from tick {:>8}  {:>6} events  {:>5} notes",
                seg.program,
                seg.start_tick,
                seg.events.len(),
                periods.len()
            );
            if let Some(t) = opt.at {
                let shown = is_visible(t, Schedule::Periods(&periods));
                print!("  {}", if shown { "visible" } else { "hidden" });
            }
            println!();
        }
    }

    if wanted(PERCUSSION_CHANNEL) {
        let drums = file.percussion_events();
        if !drums.is_empty() {
            let strikes = file.strike_times(drums.iter().copied());
            print!("  ch  9  percussion  {:>6} events  {:>5} strikes", drums.len(), strikes.len());
            if let Some(t) = opt.at {
                let shown = is_visible(t, Schedule::Strikes(&strikes));
                print!("  {}", if shown { "visible" } else { "hidden" });
            }
            println!();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(61.9), "01:01");
        assert_eq!(format_duration(-2.0), "00:00");
    }

    #[test]
    fn parses_options() {
        let opt = Opt::try_parse_from(["midi-timeline", "song.mid", "--channel", "3", "--at", "12.5"])
            .unwrap();
        assert_eq!(opt.file, PathBuf::from("song.mid"));
        assert_eq!(opt.channel, Some(3));
        assert_eq!(opt.at, Some(12.5));
    }
}
