// src/core/timefmt.rs

//! Layout tables for time instants and durations.
//!
//! Each parser walks an ordered list of accepted layouts and returns the first
//! success. Bare times (no date) land on `0000-01-01`, bare dates at midnight,
//! and layouts without an offset are read as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // ISO-8601 duration, e.g. `PT1H30M`, `P2DT4H`, `PT0.5S`.
    static ref ISO_DURATION_RE: Regex = Regex::new(
        r"^([-+])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,9}))?S)?)?$"
    )
    .unwrap();
    // Clock-style duration, e.g. `01:30`, `1:30:15.250`.
    static ref CLOCK_DURATION_RE: Regex =
        Regex::new(r"^([-+])?(\d+):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?$").unwrap();
}

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M %:z",
];

const NAIVE_DATE_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y"];

const TIME_LAYOUTS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M%p", "%I:%M:%S%p"];

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Parses a time instant against the known layouts.
pub fn parse_time(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t);
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(text) {
        return Some(t);
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(t) = DateTime::parse_from_str(text, layout) {
            return Some(t);
        }
    }
    for layout in NAIVE_DATE_TIME_LAYOUTS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(t.and_utc().fixed_offset());
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(text, layout) {
            return Some(d.and_time(NaiveTime::MIN).and_utc().fixed_offset());
        }
    }
    for layout in TIME_LAYOUTS {
        if let Ok(t) = NaiveTime::parse_from_str(text, layout) {
            let day = NaiveDate::from_ymd_opt(0, 1, 1)?;
            return Some(day.and_time(t).and_utc().fixed_offset());
        }
    }
    None
}

/// Parses a duration: unit form (`1h30m`, `-1.5s`, `250ms`), ISO-8601
/// (`PT1H30M`), clock form (`01:30:00`) or bare integer seconds.
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(secs) = text.parse::<i64>() {
        return TimeDelta::try_seconds(secs);
    }
    parse_unit_duration(text)
        .or_else(|| parse_iso_duration(text))
        .or_else(|| parse_clock_duration(text))
}

fn unit_nanos(unit: &str) -> Option<i128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        "d" => 86_400 * NANOS_PER_SEC,
        _ => return None,
    })
}

/// Nanoseconds for `whole.frac` of a unit worth `unit` nanoseconds.
fn scaled(whole: &str, frac: &str, unit: i128) -> Option<i128> {
    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut total = whole.checked_mul(unit)?;
    if !frac.is_empty() {
        let digits = u32::try_from(frac.len()).ok()?;
        let scale = 10_i128.checked_pow(digits)?;
        let frac: i128 = frac.parse().ok()?;
        total = total.checked_add(frac.checked_mul(unit)? / scale)?;
    }
    Some(total)
}

fn from_nanos(negative: bool, nanos: i128) -> Option<TimeDelta> {
    let nanos = if negative { -nanos } else { nanos };
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).ok()?;
    let sub = u32::try_from(nanos.rem_euclid(NANOS_PER_SEC)).ok()?;
    TimeDelta::new(secs, sub)
}

fn parse_unit_duration(text: &str) -> Option<TimeDelta> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if body == "0" {
        return Some(TimeDelta::zero());
    }
    let mut total: i128 = 0;
    let mut chars = body.chars().peekable();
    let mut saw_component = false;
    while chars.peek().is_some() {
        let mut whole = String::new();
        let mut frac = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            whole.push(c);
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                frac.push(c);
                chars.next();
            }
        }
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_alphabetic()) {
            unit.push(c);
            chars.next();
        }
        total = total.checked_add(scaled(&whole, &frac, unit_nanos(&unit)?)?)?;
        saw_component = true;
    }
    if !saw_component {
        return None;
    }
    from_nanos(negative, total)
}

fn capture_or_empty<'t>(caps: &regex::Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn parse_iso_duration(text: &str) -> Option<TimeDelta> {
    let caps = ISO_DURATION_RE.captures(text)?;
    if text.ends_with('T') || text.trim_start_matches(['-', '+']) == "P" {
        return None;
    }
    let negative = capture_or_empty(&caps, 1) == "-";
    let parts = [
        (capture_or_empty(&caps, 2), 7 * 86_400 * NANOS_PER_SEC),
        (capture_or_empty(&caps, 3), 86_400 * NANOS_PER_SEC),
        (capture_or_empty(&caps, 4), 3_600 * NANOS_PER_SEC),
        (capture_or_empty(&caps, 5), 60 * NANOS_PER_SEC),
    ];
    let mut total: i128 = 0;
    for (digits, unit) in parts {
        total = total.checked_add(scaled(digits, "", unit)?)?;
    }
    total = total.checked_add(scaled(
        capture_or_empty(&caps, 6),
        capture_or_empty(&caps, 7),
        NANOS_PER_SEC,
    )?)?;
    from_nanos(negative, total)
}

fn parse_clock_duration(text: &str) -> Option<TimeDelta> {
    let caps = CLOCK_DURATION_RE.captures(text)?;
    let negative = capture_or_empty(&caps, 1) == "-";
    let total = scaled(capture_or_empty(&caps, 2), "", 3_600 * NANOS_PER_SEC)?
        .checked_add(scaled(capture_or_empty(&caps, 3), "", 60 * NANOS_PER_SEC)?)?
        .checked_add(scaled(
            capture_or_empty(&caps, 4),
            capture_or_empty(&caps, 5),
            NANOS_PER_SEC,
        )?)?;
    from_nanos(negative, total)
}

/// Renders a duration in unit form, e.g. `1h30m0s`, `1.5s`, `250ms`.
pub fn format_duration(d: TimeDelta) -> String {
    let nanos = i128::from(d.num_seconds()) * NANOS_PER_SEC + i128::from(d.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();
    let per_sec = NANOS_PER_SEC.unsigned_abs();

    if abs < per_sec {
        return if abs % 1_000_000 == 0 {
            format!("{sign}{}ms", abs / 1_000_000)
        } else if abs % 1_000 == 0 {
            format!("{sign}{}us", abs / 1_000)
        } else {
            format!("{sign}{abs}ns")
        };
    }

    let total_secs = abs / per_sec;
    let frac = abs % per_sec;
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::from(sign);
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds.to_string());
    if frac > 0 {
        let digits = format!("{frac:09}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out.push('s');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_time_layouts() {
        let t = parse_time("2024-03-05T10:20:30+02:00").unwrap();
        assert_eq!(t.hour(), 10);
        assert_eq!(t.offset().local_minus_utc(), 7200);

        let t = parse_time("2024-03-05 10:20:30").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2024, 3, 5));

        let t = parse_time("2024-03-05").unwrap();
        assert_eq!(t.hour(), 0);

        let t = parse_time("15:04:05").unwrap();
        assert_eq!((t.year(), t.hour(), t.minute()), (0, 15, 4));

        assert!(parse_time("not a date").is_none());
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("1h30m"), TimeDelta::try_minutes(90));
        assert_eq!(parse_duration("1.5s"), TimeDelta::try_milliseconds(1500));
        assert_eq!(parse_duration("-250ms"), TimeDelta::try_milliseconds(-250));
        assert_eq!(parse_duration("PT1H30M"), TimeDelta::try_minutes(90));
        assert_eq!(parse_duration("P1D"), TimeDelta::try_days(1));
        assert_eq!(parse_duration("01:30:00"), TimeDelta::try_minutes(90));
        assert_eq!(parse_duration("45"), TimeDelta::try_seconds(45));
        assert_eq!(parse_duration("0"), Some(TimeDelta::zero()));
        assert!(parse_duration("1x").is_none());
        assert!(parse_duration("PT").is_none());
    }

    #[test]
    fn test_format_duration_round_trips() {
        for text in ["1h30m0s", "1.5s", "250ms", "-2m5s", "0s", "3us", "7ns"] {
            let d = parse_duration(text).unwrap();
            assert_eq!(format_duration(d), text);
        }
    }
}
