//! visibility.rs
//!
//! Whether an instrument should be on stage at a given time. An instrument
//! fades in shortly before it plays and lingers for a while after.
//!
//! Both rules are pure: the answer depends only on the query time and the
//! schedule, so callers can ask every frame, in any order.

use crate::period::NotePeriod;

/// Seconds an instrument appears before a note starts.
pub const PRE_ROLL: f64 = 1.0;
/// Seconds an instrument stays after a note ends.
pub const POST_ROLL: f64 = 4.0;

/// What an instrument plays: sustained notes or bare attacks.
#[derive(Clone, Copy, Debug)]
pub enum Schedule<'a> {
    Periods(&'a [NotePeriod]),
    /// Strike times in seconds.
    Strikes(&'a [f64]),
}

pub fn is_visible(time: f64, schedule: Schedule<'_>) -> bool {
    match schedule {
        Schedule::Periods(periods) => visible_by_periods(time, periods),
        Schedule::Strikes(strikes) => visible_by_strikes(time, strikes),
    }
}

/// Visible while a period plays, within [`PRE_ROLL`] of any period start
/// (either side), or up to [`POST_ROLL`] after any period end.
pub fn visible_by_periods(time: f64, periods: &[NotePeriod]) -> bool {
    periods.iter().any(|p| {
        p.is_playing_at(time)
            || (time - p.start_time).abs() < PRE_ROLL
            || ((time - p.end_time).abs() < POST_ROLL && time > p.end_time)
    })
}

/// Visible from [`PRE_ROLL`] before a strike until [`POST_ROLL`] after it,
/// both ends exclusive.
pub fn visible_by_strikes(time: f64, strikes: &[f64]) -> bool {
    strikes.iter().any(|&s| {
        let since = time - s;
        -PRE_ROLL < since && since < POST_ROLL
    })
}
