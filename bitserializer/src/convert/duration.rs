//! ISO-8601 duration conversions (spec §4.7) and the `safe_duration_cast`
//! helper backing [`crate::convert::timestamp`]'s overflow checks.
//!
//! Grammar produced/consumed here: `[-+]?P[nW|nD][T nH nM nS[.fraction]]`.
//! Years and months are rejected outright (a duration has no calendar, so
//! "a month" is not a fixed quantity — same stance the original library
//! takes by only ever emitting day/week-and-finer components). An entirely
//! empty duration formats as `"PT0S"`, matching how the original prints a
//! zero `std::chrono::duration`.

use crate::error::{Error, Result};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 604_800;

/// Converts a duration expressed as `value` whole units of `from_nanos`
/// nanoseconds each into whole units of `to_nanos` nanoseconds, checking for
/// overflow at every step (spec §4.7's "SafeDurationCast": never silently
/// truncate or wrap past a target precision).
pub fn safe_duration_cast(value: i64, from_nanos: i64, to_nanos: i64) -> Result<i64> {
    let total_nanos = value.checked_mul(from_nanos).ok_or_else(|| Error::Overflow {
        path: String::new(),
        message: format!("{value} units of {from_nanos}ns overflows i64 nanoseconds"),
    })?;
    Ok(total_nanos / to_nanos)
}

/// Parses an ISO-8601 duration string into a `chrono::Duration`.
pub fn parse_iso8601_duration(text: &str) -> Result<chrono::Duration> {
    let err = |message: String| Error::Parsing { path: String::new(), location: crate::error::ParseLocation::UNKNOWN, message };

    let mut rest = text;
    let negative = match rest.strip_prefix('-') {
        Some(tail) => {
            rest = tail;
            true
        }
        None => {
            rest = rest.strip_prefix('+').unwrap_or(rest);
            false
        }
    };

    let rest = rest.strip_prefix('P').ok_or_else(|| err("ISO-8601 duration must start with 'P'".to_string()))?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total_seconds: i64 = 0;
    let mut nanos: i64 = 0;

    let mut consume_date = date_part;
    while !consume_date.is_empty() {
        let (amount, unit, tail) = take_component(consume_date).map_err(&err)?;
        consume_date = tail;
        total_seconds = total_seconds
            .checked_add(match unit {
                'W' => amount.checked_mul(SECONDS_PER_WEEK),
                'D' => amount.checked_mul(SECONDS_PER_DAY),
                'Y' | 'M' => return Err(err("calendar years/months are not supported in a duration".to_string())),
                other => return Err(err(format!("unexpected duration component '{other}'"))),
            }
            .ok_or_else(|| err("duration component overflows".to_string()))?)
            .ok_or_else(|| err("duration overflows".to_string()))?;
    }

    if let Some(time_part) = time_part {
        let mut consume_time = time_part;
        while !consume_time.is_empty() {
            let (amount, unit, tail, fraction) = take_time_component(consume_time).map_err(&err)?;
            consume_time = tail;
            let seconds = match unit {
                'H' => amount.checked_mul(SECONDS_PER_HOUR),
                'M' => amount.checked_mul(SECONDS_PER_MINUTE),
                'S' => Some(amount),
                other => return Err(err(format!("unexpected duration component '{other}'"))),
            }
            .ok_or_else(|| err("duration component overflows".to_string()))?;
            total_seconds = total_seconds.checked_add(seconds).ok_or_else(|| err("duration overflows".to_string()))?;
            if unit == 'S' {
                nanos = fraction;
            } else if fraction != 0 {
                return Err(err("only the seconds component may carry a fraction".to_string()));
            }
        }
    }

    let magnitude = chrono::Duration::seconds(total_seconds) + chrono::Duration::nanoseconds(nanos);
    Ok(if negative { -magnitude } else { magnitude })
}

fn take_component(text: &str) -> core::result::Result<(i64, char, &str), String> {
    let unit_pos = text.find(|c: char| c.is_ascii_alphabetic()).ok_or_else(|| "duration component is missing its unit".to_string())?;
    let (digits, tail) = text.split_at(unit_pos);
    let mut chars = tail.chars();
    let unit = chars.next().unwrap();
    let amount: i64 = digits.parse().map_err(|_| format!("{digits:?} is not a valid duration component"))?;
    Ok((amount, unit, chars.as_str()))
}

fn take_time_component(text: &str) -> core::result::Result<(i64, char, &str, i64), String> {
    let unit_pos = text
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| "duration component is missing its unit".to_string())?;
    let (number, tail) = text.split_at(unit_pos);
    let mut chars = tail.chars();
    let unit = chars.next().unwrap();
    let rest = chars.as_str();

    let (whole, fraction_text) = match number.split_once(['.', ',']) {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };
    let amount: i64 = whole.parse().map_err(|_| format!("{whole:?} is not a valid duration component"))?;
    let nanos = match fraction_text {
        Some(fraction) if unit == 'S' => {
            let mut digits: String = fraction.chars().take(9).collect();
            while digits.len() < 9 {
                digits.push('0');
            }
            digits.parse::<i64>().map_err(|_| format!("{fraction:?} is not a valid fractional-seconds component"))?
        }
        Some(_) => return Err("only the seconds component may carry a fraction".to_string()),
        None => 0,
    };
    Ok((amount, unit, rest, nanos))
}

/// Formats a `chrono::Duration` as an ISO-8601 duration string, using only
/// the day/hour/minute/second components (no weeks, to keep formatting
/// unambiguous) and a minimal fractional-seconds tail.
pub fn format_iso8601_duration(duration: &chrono::Duration) -> String {
    if *duration == chrono::Duration::zero() {
        return "PT0S".to_string();
    }

    let negative = *duration < chrono::Duration::zero();
    let magnitude = if negative { -*duration } else { *duration };

    let total_seconds = magnitude.num_seconds();
    let nanos = (magnitude - chrono::Duration::seconds(total_seconds)).num_nanoseconds().unwrap_or(0);

    let days = total_seconds / SECONDS_PER_DAY;
    let remainder = total_seconds % SECONDS_PER_DAY;
    let hours = remainder / SECONDS_PER_HOUR;
    let minutes = (remainder % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = remainder % SECONDS_PER_MINUTE;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days != 0 {
        out.push_str(&days.to_string());
        out.push('D');
    }
    if hours != 0 || minutes != 0 || seconds != 0 || nanos != 0 {
        out.push('T');
        if hours != 0 {
            out.push_str(&hours.to_string());
            out.push('H');
        }
        if minutes != 0 {
            out.push_str(&minutes.to_string());
            out.push('M');
        }
        if seconds != 0 || nanos != 0 || (days == 0 && hours == 0 && minutes == 0) {
            out.push_str(&seconds.to_string());
            if nanos != 0 {
                let fraction = format!("{nanos:09}");
                out.push('.');
                out.push_str(fraction.trim_end_matches('0'));
            }
            out.push('S');
        }
    }
    out
}

#[allow(dead_code)]
const _NANOS_PER_SECOND_USED: i64 = NANOS_PER_SECOND;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_combined_duration() {
        let d = parse_iso8601_duration("P1DT2H3M4.5S").unwrap();
        assert_eq!(d, chrono::Duration::days(1) + chrono::Duration::hours(2) + chrono::Duration::minutes(3) + chrono::Duration::milliseconds(4_500));
    }

    #[test]
    fn parses_a_negative_duration() {
        let d = parse_iso8601_duration("-PT30S").unwrap();
        assert_eq!(d, chrono::Duration::seconds(-30));
    }

    #[test]
    fn rejects_calendar_components() {
        assert!(parse_iso8601_duration("P1Y").is_err());
        assert!(parse_iso8601_duration("P1M").is_err());
    }

    #[test]
    fn formats_zero_duration_as_pt0s() {
        assert_eq!(format_iso8601_duration(&chrono::Duration::zero()), "PT0S");
    }

    #[test]
    fn formats_and_reparses_round_trip() {
        let d = chrono::Duration::days(2) + chrono::Duration::hours(5) + chrono::Duration::milliseconds(250);
        let text = format_iso8601_duration(&d);
        assert_eq!(parse_iso8601_duration(&text).unwrap(), d);
    }

    #[test]
    fn safe_duration_cast_converts_between_units() {
        assert_eq!(safe_duration_cast(2, SECONDS_PER_MINUTE * NANOS_PER_SECOND, NANOS_PER_SECOND).unwrap(), 120);
    }

    #[test]
    fn safe_duration_cast_reports_overflow() {
        assert!(safe_duration_cast(i64::MAX, 2, 1).is_err());
    }
}
