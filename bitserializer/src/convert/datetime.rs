//! ISO-8601 date-time conversions (spec §4.7).
//!
//! Grammar: `[-+]?YYYY...-MM-DDThh:mm:ss[.fraction]Z` — a signed year of at
//! least four digits (the original allows wider-than-4-digit years; we
//! follow suit rather than hard-coding `YYYY`), a literal `T` separator, a
//! fractional-seconds part of zero to nine digits introduced by either `.`
//! or `,`, and a mandatory trailing `Z` (no other UTC offset form is
//! accepted — a missing `Z` is a syntax error, matching the original's
//! "UTC-only" stance).
//!
//! Implemented with manual parsing rather than `chrono::format`'s strptime
//! surface: `chrono`'s format strings can't express "a year with more than
//! four digits", which this grammar explicitly allows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Error, ParseLocation, Result};

fn parse_err(message: impl Into<String>) -> Error {
    Error::Parsing { path: String::new(), location: ParseLocation::UNKNOWN, message: message.into() }
}

/// Parses an ISO-8601 UTC date-time string.
pub fn parse_iso8601_datetime(text: &str) -> Result<DateTime<Utc>> {
    let (date_part, time_part) = text.split_once('T').ok_or_else(|| parse_err("expected 'T' separating date and time"))?;
    let time_part = time_part.strip_suffix('Z').ok_or_else(|| parse_err("expected a trailing 'Z' (UTC designator)"))?;

    let (sign, digits) = match date_part.strip_prefix('-') {
        Some(tail) => (-1i32, tail),
        None => (1i32, date_part.strip_prefix('+').unwrap_or(date_part)),
    };
    let mut fields = digits.split('-');
    let year_text = fields.next().ok_or_else(|| parse_err("missing year"))?;
    let month_text = fields.next().ok_or_else(|| parse_err("missing month"))?;
    let day_text = fields.next().ok_or_else(|| parse_err("missing day"))?;
    if fields.next().is_some() {
        return Err(parse_err("too many '-'-separated date components"));
    }
    if year_text.len() < 4 {
        return Err(parse_err("year must have at least 4 digits"));
    }
    let year: i32 = year_text.parse().map_err(|_| parse_err("year is not numeric"))?;
    let year = sign * year;
    let month: u32 = month_text.parse().map_err(|_| parse_err("month is not numeric"))?;
    let day: u32 = day_text.parse().map_err(|_| parse_err("day is not numeric"))?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| parse_err(format!("{year:04}-{month:02}-{day:02} is not a valid calendar date")))?;

    let mut time_fields = time_part.splitn(3, ':');
    let hour_text = time_fields.next().ok_or_else(|| parse_err("missing hour"))?;
    let minute_text = time_fields.next().ok_or_else(|| parse_err("missing minute"))?;
    let second_text = time_fields.next().ok_or_else(|| parse_err("missing second"))?;

    let hour: u32 = hour_text.parse().map_err(|_| parse_err("hour is not numeric"))?;
    let minute: u32 = minute_text.parse().map_err(|_| parse_err("minute is not numeric"))?;
    let (second_text, fraction_text) = match second_text.split_once(['.', ',']) {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (second_text, None),
    };
    let second: u32 = second_text.parse().map_err(|_| parse_err("second is not numeric"))?;
    let nanos: u32 = match fraction_text {
        Some(fraction) => {
            if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(parse_err("fractional seconds must be 1 to 9 digits"));
            }
            let mut digits = fraction.to_string();
            while digits.len() < 9 {
                digits.push('0');
            }
            digits.parse().map_err(|_| parse_err("fractional seconds is not numeric"))?
        }
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).ok_or_else(|| parse_err(format!("{hour:02}:{minute:02}:{second:02} is not a valid time of day")))?;

    Ok(DateTime::<Utc>::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc))
}

/// Formats a `DateTime<Utc>` as an ISO-8601 string with a trailing `Z`,
/// trimming the fractional-seconds part to its significant digits (and
/// omitting it entirely when the value is exactly on a second boundary).
pub fn format_iso8601_datetime(value: &DateTime<Utc>) -> String {
    let nanos = value.timestamp_subsec_nanos();
    if nanos == 0 {
        value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        let fraction = format!("{nanos:09}");
        let fraction = fraction.trim_end_matches('0');
        format!("{}.{}Z", value.format("%Y-%m-%dT%H:%M:%S"), fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_a_datetime_without_fraction() {
        let dt = parse_iso8601_datetime("2024-03-15T12:30:45Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 45).unwrap());
    }

    #[test]
    fn parses_a_datetime_with_comma_fraction() {
        let dt = parse_iso8601_datetime("2024-03-15T12:30:45,250Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn rejects_missing_utc_designator() {
        assert!(parse_iso8601_datetime("2024-03-15T12:30:45").is_err());
    }

    #[test]
    fn rejects_short_year() {
        assert!(parse_iso8601_datetime("202-03-15T12:30:45Z").is_err());
    }

    #[test]
    fn formats_and_reparses_round_trip() {
        let dt = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap() + chrono::Duration::nanoseconds(120_000_000);
        let text = format_iso8601_datetime(&dt);
        assert_eq!(parse_iso8601_datetime(&text).unwrap(), dt);
    }

    #[test]
    fn formats_whole_second_without_fraction() {
        let dt = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_iso8601_datetime(&dt), "2030-01-02T03:04:05Z");
    }
}
