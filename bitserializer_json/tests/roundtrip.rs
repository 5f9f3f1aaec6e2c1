//! End-to-end scenarios exercising the JSON backend against the object
//! model an application would actually write, using the derive macros
//! rather than hand-rolled `BitSerialize` impls.

use bitserializer::error::Error;
use bitserializer::facade::{load_object, save_object};
use bitserializer::options::SerializationOptions;
use bitserializer::validate::Required;
use bitserializer::{BitDeserialize, BitSerialize, BitSerializeEnum};

use bitserializer_json::Json;

#[test]
fn json_primitive_round_trip() {
    let value: u8 = 255;
    let bytes = save_object::<Json, _>(&value, SerializationOptions::new()).unwrap();
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "255");

    let mut loaded: u8 = 0;
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, 255);
}

#[derive(Debug, Default, PartialEq, BitSerialize, BitDeserialize)]
struct Point {
    x: i32,
    y: i32,
    email: Option<String>,
}

#[test]
fn json_object_missing_optional_field_loads_without_error() {
    let bytes = br#"{"x":10,"y":20}"#.to_vec();
    let mut point = Point { x: 0, y: 0, email: Some("keep-me@example.com".to_string()) };
    // No `Required` validator on `email` — an absent key must resolve to
    // `None` rather than raising `FailedValidation` or any other error.
    assert!(load_object::<Json, _>(&mut point, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(point.x, 10);
    assert_eq!(point.y, 20);
    assert_eq!(point.email, None);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BitSerializeEnum)]
enum Rank {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

#[test]
fn json_enum_round_trips_through_registered_token() {
    let bytes = save_object::<Json, _>(&Rank::Three, SerializationOptions::new()).unwrap();
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "\"Three\"");

    let mut loaded = Rank::One;
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, Rank::Three);
}

#[derive(Debug, Default, BitDeserialize)]
struct Person {
    #[bitserializer(rename = "Name", validate(Required))]
    name: String,
    #[bitserializer(rename = "Age", validate(Required))]
    age: i32,
}

#[test]
fn validation_accumulates_and_reports_only_the_missing_field() {
    let bytes = br#"{"Name":"A"}"#.to_vec();
    let mut person = Person::default();
    let err = load_object::<Json, _>(&mut person, &bytes, SerializationOptions::new()).unwrap_err();
    match err {
        Error::FailedValidation(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, "/Age");
            assert_eq!(failures[0].messages, vec!["This field is required".to_string()]);
        }
        other => panic!("expected FailedValidation, got {other:?}"),
    }
}

#[test]
fn absent_optional_field_saves_as_a_real_json_null() {
    let point = Point { x: 1, y: 2, email: None };

    let bytes = save_object::<Json, _>(&point, SerializationOptions::new()).unwrap();
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), r#"{"x":1,"y":2,"email":null}"#);

    let mut loaded = Point { x: 0, y: 0, email: Some("keep-me@example.com".to_string()) };
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, point);
}

#[derive(Debug, Default, PartialEq, BitSerialize, BitDeserialize)]
struct Nested {
    tags: Vec<String>,
    counts: std::collections::BTreeMap<String, i32>,
}

#[test]
fn nested_containers_round_trip_through_json() {
    let mut counts = std::collections::BTreeMap::new();
    counts.insert("a".to_string(), 1);
    counts.insert("b".to_string(), 2);
    let original = Nested { tags: vec!["x".to_string(), "y".to_string()], counts };

    let bytes = save_object::<Json, _>(&original, SerializationOptions::new()).unwrap();
    let mut loaded = Nested::default();
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, original);
}

#[derive(Debug, Default, PartialEq, BitSerialize, BitDeserialize)]
struct Animal {
    name: String,
    legs: i32,
}

#[derive(Debug, Default, PartialEq, BitSerialize, BitDeserialize)]
struct Dog {
    #[bitserializer(flatten)]
    base: Animal,
    breed: String,
}

#[test]
fn flattened_base_fields_share_the_enclosing_object_scope() {
    let dog = Dog { base: Animal { name: "Rex".to_string(), legs: 4 }, breed: "Labrador".to_string() };

    let bytes = save_object::<Json, _>(&dog, SerializationOptions::new()).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    // `base` opens no scope of its own: its fields sit alongside `breed`
    // at the top level, not nested under a `"base"` key.
    assert!(text.contains("\"name\":\"Rex\""));
    assert!(text.contains("\"legs\":4"));
    assert!(text.contains("\"breed\":\"Labrador\""));
    assert!(!text.contains("\"base\""));

    let mut loaded = Dog::default();
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, dog);
}

#[derive(Debug, Default, PartialEq, BitSerialize, BitDeserialize)]
struct Signup {
    #[bitserializer(refine(bitserializer::refine::TrimWhitespace, bitserializer::refine::ToLowerCase))]
    email: String,
}

#[test]
fn save_direction_refiners_run_against_a_scratch_copy_before_write() {
    let signup = Signup { email: "  Ada@Example.COM  ".to_string() };

    let bytes = save_object::<Json, _>(&signup, SerializationOptions::new()).unwrap();
    // The refiners must not mutate the live field...
    assert_eq!(signup.email, "  Ada@Example.COM  ");
    // ...but the emitted JSON must already be trimmed and lower-cased.
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), r#"{"email":"ada@example.com"}"#);

    let mut loaded = Signup::default();
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded.email, "ada@example.com");
}

#[test]
fn chrono_datetime_round_trips_through_an_iso_string_and_coarser_precision() {
    let at_nanos = chrono::DateTime::<chrono::Utc>::from_timestamp(0, 2_494_354_999).unwrap();

    let bytes = save_object::<Json, _>(&at_nanos, SerializationOptions::new()).unwrap();
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "\"1970-01-01T00:00:02.494354999Z\"");

    let mut loaded = chrono::DateTime::<chrono::Utc>::default();
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, at_nanos);
    // A coarser-precision target (milliseconds since epoch) rounds to 2494ms.
    assert_eq!(loaded.timestamp_millis(), 2494);
}

#[test]
fn chrono_duration_round_trips_through_an_iso_string() {
    let d = chrono::Duration::days(1) + chrono::Duration::hours(2) + chrono::Duration::milliseconds(500);

    let bytes = save_object::<Json, _>(&d, SerializationOptions::new()).unwrap();
    let mut loaded = chrono::Duration::zero();
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, d);
}

#[derive(Debug, PartialEq, BitSerialize, BitDeserialize)]
struct ScheduledEvent {
    name: String,
    starts_at: chrono::DateTime<chrono::Utc>,
    duration: chrono::Duration,
    created: bitserializer::containers::CTimeRef,
}

#[test]
fn chrono_fields_round_trip_inside_a_derived_struct() {
    let event = ScheduledEvent {
        name: "launch".to_string(),
        starts_at: chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        duration: chrono::Duration::minutes(90),
        created: bitserializer::containers::CTimeRef(1_700_000_000),
    };

    let bytes = save_object::<Json, _>(&event, SerializationOptions::new()).unwrap();
    let mut loaded = ScheduledEvent {
        name: String::new(),
        starts_at: chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap(),
        duration: chrono::Duration::zero(),
        created: bitserializer::containers::CTimeRef(0),
    };
    assert!(load_object::<Json, _>(&mut loaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(loaded, event);
}
