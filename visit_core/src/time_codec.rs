//! `HH:MM` time strings.
//!
//! Times cross the presentation boundary as 24-hour `HH:MM` strings. This
//! module normalizes values coming back from time pickers, formats partial
//! input while the user types, and shifts times by whole minutes for
//! repetitions scheduled at a fixed interval.

use chrono::{NaiveTime, Timelike};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Truncate an `HH:MM:SS` (or longer) value to its `HH:MM` prefix.
///
/// Empty input stays empty.
pub fn normalize(raw: &str) -> String {
    raw.chars().take(5).collect()
}

/// Format digits as the user types them.
///
/// Non-digits are stripped and at most four digits are kept. Up to two digits
/// are returned as-is; three or four are split as `HH:MM`.
pub fn format_while_typing(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    if digits.len() <= 2 {
        digits
    } else {
        format!("{}:{}", &digits[..2], &digits[2..])
    }
}

/// Check whether `time` is a well-formed 24-hour `HH:MM` string.
pub fn is_valid(time: &str) -> bool {
    parse_minutes(time).is_some()
}

/// Shift `time` by `delta` minutes, wrapping around midnight.
///
/// Returns an empty string when `time` is not a valid `HH:MM` value.
pub fn add_minutes(time: &str, delta: i64) -> String {
    match parse_minutes(time) {
        Some(start) => format_minutes(start + delta.rem_euclid(MINUTES_PER_DAY)),
        None => String::new(),
    }
}

/// Minutes since midnight for a valid `HH:MM` string.
fn parse_minutes(time: &str) -> Option<i64> {
    if time.chars().count() != 5 {
        return None;
    }

    let parsed = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
    Some(i64::from(parsed.hour() * 60 + parsed.minute()))
}

fn format_minutes(total: i64) -> String {
    let wrapped = total.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}
