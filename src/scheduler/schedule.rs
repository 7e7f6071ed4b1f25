//! Next-send time calculation.
//!
//! All timestamps are Unix seconds in UTC. Randomness is injected so callers
//! and tests control it.

use crate::store::Frequency;
use rand::Rng;

pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 24 * HOUR;
pub const HALF_DAY: i64 = DAY / 2;
pub const THREE_DAYS: i64 = 3 * DAY;

/// Morning window for twice-daily reminders, as seconds after midnight.
pub const MORNING_START: i64 = 9 * HOUR;
pub const MORNING_END: i64 = 12 * HOUR;

/// Evening window for twice-daily reminders, as seconds after midnight.
pub const EVENING_START: i64 = 18 * HOUR;
pub const EVENING_END: i64 = 21 * HOUR;

/// Midnight (UTC) of the day containing `ts`.
#[must_use]
pub fn start_of_day(ts: i64) -> i64 {
    ts - ts.rem_euclid(DAY)
}

/// Whether `ts` falls inside either twice-daily window.
#[must_use]
pub fn in_twice_daily_window(ts: i64) -> bool {
    let offset = ts.rem_euclid(DAY);
    (MORNING_START..MORNING_END).contains(&offset)
        || (EVENING_START..EVENING_END).contains(&offset)
}

/// First send time after a user picks `frequency` at `now`.
///
/// Returns `None` for [`Frequency::None`]. A twice-daily pick lands in
/// today's morning window, which may already be in the past; the user is
/// then due on the next scheduler tick.
pub fn initial_next_send<R: Rng + ?Sized>(
    frequency: Frequency,
    now: i64,
    rng: &mut R,
) -> Option<i64> {
    match frequency {
        Frequency::None => None,
        Frequency::Daily => Some(now + rng.gen_range(1..=DAY)),
        Frequency::Every3Days => Some(now + rng.gen_range(1..=THREE_DAYS)),
        Frequency::TwiceDaily => {
            Some(start_of_day(now) + rng.gen_range(MORNING_START..MORNING_END))
        }
    }
}

/// Send time following a delivery made at `now`.
///
/// Daily reminders land one day later give or take half a day; every-3-days
/// reminders land three days later give or take a day. Twice-daily reminders
/// go to the next window: this evening if it is still morning, otherwise
/// tomorrow morning.
pub fn recurring_next_send<R: Rng + ?Sized>(
    frequency: Frequency,
    now: i64,
    rng: &mut R,
) -> Option<i64> {
    match frequency {
        Frequency::None => None,
        Frequency::Daily => Some(now + DAY + rng.gen_range(-HALF_DAY..HALF_DAY)),
        Frequency::Every3Days => Some(now + THREE_DAYS + rng.gen_range(-DAY..DAY)),
        Frequency::TwiceDaily => {
            let today = start_of_day(now);
            let offset = now - today;
            // Once the evening window has opened, any evening slot may already
            // be behind us, so go straight to tomorrow morning.
            if offset < EVENING_START {
                Some(today + rng.gen_range(EVENING_START..EVENING_END))
            } else {
                Some(today + DAY + rng.gen_range(MORNING_START..MORNING_END))
            }
        }
    }
}
