//! Time source and the daily admission window.
//!
//! "Today" is the calendar day containing the moment of the query, in the
//! server-local time zone. Admission capacity resets at every day boundary;
//! no separate counter is persisted.

use crate::types::Timestamp;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};

/// Time source injected into the engine
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Bounds of the local calendar day containing `now`:
/// `[midnight, next midnight)` as unix-millisecond timestamps.
pub fn day_bounds(now: Timestamp) -> (Timestamp, Timestamp) {
    let local: DateTime<Local> = match Local.timestamp_millis_opt(now.as_millis() as i64) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t,
        LocalResult::None => Local::now(),
    };

    let date = local.date_naive();
    let start = local_midnight(date);
    let end = local_midnight(date + Duration::days(1));

    (
        Timestamp::from_millis(start.timestamp_millis().max(0) as u64),
        Timestamp::from_millis(end.timestamp_millis().max(0) as u64),
    )
}

fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t,
        // On a backward DST shift midnight occurs twice; take the first
        LocalResult::Ambiguous(earliest, _) => earliest,
        // A forward DST shift can swallow midnight entirely; the day then
        // starts when local clocks resume
        LocalResult::None => Local
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(Local::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_falls_inside_its_own_window() {
        let now = SystemClock.now();
        let (start, end) = day_bounds(now);
        assert!(start <= now);
        assert!(now < end);
    }

    #[test]
    fn test_window_is_roughly_one_day() {
        let (start, end) = day_bounds(Timestamp::now());
        let span = end.as_millis() - start.as_millis();
        // 23h..25h tolerates DST transition days
        assert!(span >= 23 * 3600 * 1000);
        assert!(span <= 25 * 3600 * 1000);
    }

    #[test]
    fn test_consecutive_windows_tile() {
        let now = Timestamp::now();
        let (_, end) = day_bounds(now);
        let (next_start, _) = day_bounds(end);
        assert_eq!(next_start, end);
    }

    #[test]
    fn test_window_is_stable_within_a_day() {
        let now = Timestamp::now();
        let (start, end) = day_bounds(now);
        // A moment later the same day maps to the same window
        let later = Timestamp::from_millis(now.as_millis() + 1);
        if later < end {
            assert_eq!(day_bounds(later), (start, end));
        }
    }
}
