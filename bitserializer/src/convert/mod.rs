//! The Conversion Layer (spec §4.4): numeric widening/narrowing, UTF
//! transcoding, ISO-8601 date/duration conversion, and the binary-archive
//! timestamp shape, each consumed by [`crate::dispatch`] and
//! [`crate::containers`] rather than exposing archive-facing types of its
//! own.

pub mod datetime;
pub mod duration;
pub mod numeric;
pub mod timestamp;
pub mod utf;

pub use numeric::Number;
pub use timestamp::BinTimestamp;
