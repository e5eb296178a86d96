//! Update window computation.
//!
//! Activity older than the window start is considered already seen and
//! is not reported again. The window boundaries are the two daily sweep
//! anchors, 10:00 and 22:00 local time:
//!
//! - between 10:00 and 22:00 the window opens at 22:00 of the previous day
//! - between 22:00 and midnight it opens at 10:00 of the same day
//! - between midnight and 10:00 it opens at 10:00 of the previous day

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveTime, Timelike};

pub fn window_start(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let (day_shift, hour) = match now.hour() {
        10..=21 => (-1, 22),
        22..=23 => (0, 10),
        _ => (-1, 10),
    };

    let date = now.date_naive() + Duration::days(day_shift);
    let naive = date.and_time(NaiveTime::MIN) + Duration::hours(hour);

    // A fixed offset maps every naive datetime to exactly one instant
    match naive.and_local_timezone(*now.offset()) {
        LocalResult::Single(dt) => dt,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> DateTime<FixedOffset> {
        format!("{}T{}+03:00", date, time).parse().unwrap()
    }

    #[test]
    fn test_daytime_window_opens_previous_evening() {
        assert_eq!(
            window_start(at("2026-03-05", "10:00:00")),
            at("2026-03-04", "22:00:00")
        );
        assert_eq!(
            window_start(at("2026-03-05", "15:30:00")),
            at("2026-03-04", "22:00:00")
        );
        assert_eq!(
            window_start(at("2026-03-05", "21:59:59")),
            at("2026-03-04", "22:00:00")
        );
    }

    #[test]
    fn test_evening_window_opens_same_morning() {
        assert_eq!(
            window_start(at("2026-03-05", "22:00:00")),
            at("2026-03-05", "10:00:00")
        );
        assert_eq!(
            window_start(at("2026-03-05", "23:59:59")),
            at("2026-03-05", "10:00:00")
        );
    }

    #[test]
    fn test_night_window_opens_previous_morning() {
        assert_eq!(
            window_start(at("2026-03-05", "00:00:00")),
            at("2026-03-04", "10:00:00")
        );
        assert_eq!(
            window_start(at("2026-03-05", "09:59:59")),
            at("2026-03-04", "10:00:00")
        );
    }

    #[test]
    fn test_crosses_month_boundary() {
        assert_eq!(
            window_start(at("2026-03-01", "12:00:00")),
            at("2026-02-28", "22:00:00")
        );
    }
}
