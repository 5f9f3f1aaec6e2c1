//! Binary timestamp representation (spec §4.7): the fixed-layout
//! seconds+nanoseconds pair a binary backend (MessagePack and similar) uses
//! to store a point in time without going through an ISO-8601 string.
//!
//! Grounded on the original library's `CBinTimestamp` and its `To()`
//! conversion overloads (`bin_timestamp.h`); realized here as inherent
//! methods converting to/from `chrono::DateTime<Utc>` and `chrono::Duration`
//! rather than the original's class-template `To()` pair, since Rust has no
//! direct equivalent of overloading on an arbitrary `chrono::duration<Rep,
//! Period>` instantiation.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

/// Seconds and nanoseconds since the Unix epoch, the wire shape a binary
/// archive stores a timestamp in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinTimestamp {
    /// Whole seconds since the Unix epoch (may be negative, before 1970).
    pub seconds: i64,
    /// Nanoseconds fraction. Same sign as `seconds`; magnitude `< 1_000_000_000`.
    pub nanos: i32,
}

impl BinTimestamp {
    /// Builds a timestamp directly from its wire components.
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Converts a calendar point in time to its binary representation.
    pub fn from_datetime(value: &DateTime<Utc>) -> Self {
        Self { seconds: value.timestamp(), nanos: value.timestamp_subsec_nanos() as i32 }
    }

    /// Converts this binary timestamp back to a calendar point in time.
    ///
    /// Fails with [`Error::Overflow`] if `seconds`/`nanos` do not form a
    /// representable `DateTime<Utc>` (mirrors the original's
    /// `std::out_of_range` on overflow).
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.seconds, self.nanos.unsigned_abs()).ok_or_else(|| Error::Overflow {
            path: String::new(),
            message: format!("{}.{:09} seconds since epoch is out of range for a calendar timestamp", self.seconds, self.nanos),
        })
    }

    /// Converts a `chrono::Duration` to its binary representation.
    ///
    /// Mirrors the original's precision-dependent branch: whole seconds go
    /// in `seconds`, the sub-second remainder in `nanos`.
    pub fn from_duration(value: &Duration) -> Result<Self> {
        let seconds = value.num_seconds();
        let remainder = *value - Duration::seconds(seconds);
        let nanos = remainder
            .num_nanoseconds()
            .ok_or_else(|| Error::Overflow { path: String::new(), message: "duration is too large to split into seconds and nanoseconds".to_string() })?;
        Ok(Self { seconds, nanos: nanos as i32 })
    }

    /// Converts this binary timestamp back to a `chrono::Duration`.
    pub fn to_duration(&self) -> Result<Duration> {
        Duration::seconds(self.seconds)
            .checked_add(&Duration::nanoseconds(self.nanos as i64))
            .ok_or_else(|| Error::Overflow {
                path: String::new(),
                message: format!("{}.{:09} seconds does not fit in a duration", self.seconds, self.nanos),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_a_calendar_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 45).unwrap() + Duration::nanoseconds(123_000_000);
        let bin = BinTimestamp::from_datetime(&dt);
        assert_eq!(bin, BinTimestamp::new(dt.timestamp(), 123_000_000));
        assert_eq!(bin.to_datetime().unwrap(), dt);
    }

    #[test]
    fn round_trips_a_duration_with_fractional_seconds() {
        let d = Duration::seconds(5) + Duration::milliseconds(250);
        let bin = BinTimestamp::from_duration(&d).unwrap();
        assert_eq!(bin, BinTimestamp::new(5, 250_000_000));
        assert_eq!(bin.to_duration().unwrap(), d);
    }

    #[test]
    fn round_trips_a_negative_duration() {
        let d = Duration::seconds(-5) - Duration::milliseconds(250);
        let bin = BinTimestamp::from_duration(&d).unwrap();
        assert_eq!(bin.to_duration().unwrap(), d);
    }

    #[test]
    fn rejects_timestamp_out_of_datetime_range() {
        let bin = BinTimestamp::new(i64::MAX, 0);
        assert!(bin.to_datetime().is_err());
    }
}
