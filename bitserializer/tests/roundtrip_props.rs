//! Property tests for the quantified invariants the component design holds
//! the dispatch engine and conversion layer to: every primitive round-trips
//! through a single `Site` call, numeric widening/narrowing never silently
//! corrupts a value, containers preserve their elements, and the ISO-8601 and
//! binary-timestamp conversions are inverses of each other wherever they are
//! both defined.
//!
//! Driven against [`bitserializer::test_backend::TestBackend`] rather than a
//! concrete wire format crate — these properties are about the dispatch/
//! conversion layer itself, not any one backend's encoding, the same
//! separation the unit tests inside `dispatch.rs`/`containers.rs` already
//! draw.

#![cfg(feature = "test-backend")]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use proptest::prelude::*;

use bitserializer::context::SerializationContext;
use bitserializer::convert::{BinTimestamp, Number};
use bitserializer::dispatch::{BitDeserialize, BitSerialize, RootLoadSite, RootSaveSite};
use bitserializer::options::SerializationOptions;
use bitserializer::scope::ScalarNumberConv;
use bitserializer::test_backend::{new_node, RootLoad, RootSave, TestBackend, TestValue};

fn fresh_context() -> Rc<RefCell<SerializationContext>> {
    Rc::new(RefCell::new(SerializationContext::new()))
}

fn round_trip<T>(value: &T) -> T
where
    T: BitSerialize + BitDeserialize + Default,
{
    let node = new_node(TestValue::Null);
    let mut save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
    value.bit_save::<TestBackend, _>(RootSaveSite(&mut save)).unwrap();

    let mut load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
    let mut out = T::default();
    out.bit_load::<TestBackend, _>(RootLoadSite(&mut load)).unwrap();
    out
}

proptest! {
    #[test]
    fn primitive_scalars_round_trip(value in any::<i64>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn unsigned_scalars_round_trip(value in any::<u64>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn float_scalars_round_trip(value in any::<f64>().prop_filter("exclude NaN, which is never equal to itself", |v| !v.is_nan())) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn bool_scalars_round_trip(value in any::<bool>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn strings_round_trip(value in ".*") {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn vec_of_i32_round_trips(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        prop_assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn vec_deque_round_trips(values in proptest::collection::vec_deque(any::<i32>(), 0..32)) {
        prop_assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn hash_set_round_trips(values in proptest::collection::hash_set(any::<i32>(), 0..32)) {
        let result: HashSet<i32> = round_trip(&values);
        prop_assert_eq!(result, values);
    }

    #[test]
    fn btree_set_round_trips(values in proptest::collection::btree_set(any::<i32>(), 0..32)) {
        prop_assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn hash_map_round_trips(values in proptest::collection::hash_map(".*", any::<i32>(), 0..16)) {
        let result: HashMap<String, i32> = round_trip(&values);
        prop_assert_eq!(result, values);
    }

    #[test]
    fn btree_map_round_trips(values in proptest::collection::btree_map(".*", any::<i32>(), 0..16)) {
        prop_assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn option_some_round_trips(value in any::<i32>()) {
        let original = Some(value);
        prop_assert_eq!(round_trip(&original), original);
    }

    /// Widening an integer to [`Number`] and narrowing back to the same
    /// concrete type never changes the value (spec §4.4: widen/narrow is a
    /// no-op for a type narrowing to itself).
    #[test]
    fn numeric_widen_then_narrow_to_same_type_is_identity(value in any::<i32>()) {
        let widened = value.to_number();
        prop_assert_eq!(i32::try_from_number(widened), Some(value));
    }

    #[test]
    fn numeric_widening_i32_to_i64_round_trips(value in any::<i32>()) {
        let widened = value.to_number();
        let narrowed: Option<i64> = i64::try_from_number(widened);
        prop_assert_eq!(narrowed, Some(value as i64));
    }

    /// Narrowing a `Number` that came from a value out of the target
    /// integer's range must report failure rather than wrapping/truncating
    /// (spec §4.4's "narrowing never silently truncates").
    #[test]
    fn numeric_out_of_range_narrowing_never_wraps(value in (i32::MAX as i64 + 1)..=i64::MAX) {
        let widened = Number::Int(value);
        prop_assert_eq!(i32::try_from_number(widened), None);
    }

    #[test]
    fn bool_number_conversion_is_zero_or_one(value in any::<bool>()) {
        let widened = value.to_number();
        prop_assert_eq!(widened, Number::Bool(value));
        prop_assert_eq!(u8::try_from_number(widened), Some(if value { 1 } else { 0 }));
    }

    /// ISO-8601 date-time formatting/parsing are inverses of each other for
    /// every whole-second instant representable since `chrono`'s epoch
    /// bounds (spec §4.7).
    #[test]
    fn iso8601_datetime_format_parse_round_trips(seconds in -60_000_000_000i64..60_000_000_000i64) {
        use bitserializer::convert::datetime::{format_iso8601_datetime, parse_iso8601_datetime};
        let original = chrono::DateTime::from_timestamp(seconds, 0).unwrap();
        let text = format_iso8601_datetime(&original);
        let parsed = parse_iso8601_datetime(&text).unwrap();
        prop_assert_eq!(parsed, original);
    }

    /// ISO-8601 duration formatting/parsing are inverses of each other for
    /// any whole-second magnitude (spec §4.7).
    #[test]
    fn iso8601_duration_format_parse_round_trips(seconds in -600_000_000i64..600_000_000i64) {
        use bitserializer::convert::duration::{format_iso8601_duration, parse_iso8601_duration};
        let original = chrono::Duration::seconds(seconds);
        let text = format_iso8601_duration(&original);
        let parsed = parse_iso8601_duration(&text).unwrap();
        prop_assert_eq!(parsed, original);
    }

    /// A binary timestamp round-trips through a calendar `DateTime<Utc>`
    /// whenever the seconds value is in `chrono`'s representable range
    /// (spec §4.7's `BinTimestamp`/`time_point` conversion laws).
    #[test]
    fn bin_timestamp_datetime_round_trips(seconds in -60_000_000_000i64..60_000_000_000i64, nanos in 0u32..1_000_000_000u32) {
        let original = BinTimestamp::new(seconds, nanos as i32);
        let datetime = original.to_datetime().unwrap();
        let back = BinTimestamp::from_datetime(&datetime);
        prop_assert_eq!(back, original);
    }
}
