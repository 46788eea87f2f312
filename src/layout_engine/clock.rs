use chrono::Timelike;

/// Seconds between clock ticks once the first boundary has passed.
pub const TICK_INTERVAL_SECS: i64 = 60;

/// Zero-padded 24-hour `HH:MM`.
pub fn format_clock<T: Timelike>(time: &T) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// The first whole minute strictly after `now` (seconds since the epoch).
pub fn next_minute_boundary(now: i64) -> i64 {
    now - now.rem_euclid(TICK_INTERVAL_SECS) + TICK_INTERVAL_SECS
}
