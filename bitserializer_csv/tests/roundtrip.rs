//! End-to-end scenario exercising the CSV backend: a table of records
//! loaded into a `Vec` of a user aggregate, and back out again.

use bitserializer::facade::{load_object, save_object};
use bitserializer::options::SerializationOptions;
use bitserializer::{BitDeserialize, BitSerialize};

use bitserializer_csv::Csv;

#[derive(Debug, Default, Clone, PartialEq, BitSerialize, BitDeserialize)]
struct Contact {
    #[bitserializer(rename = "Id")]
    id: u64,
    #[bitserializer(rename = "Name")]
    name: String,
    #[bitserializer(rename = "Email")]
    email: String,
}

#[test]
fn csv_round_trip_of_a_list_of_records() {
    let csv_text = "Id,Name,Email\n1,John Doe,john@example.com\n2,Alice,alice@example.com\n";

    let mut contacts: Vec<Contact> = Vec::new();
    assert!(load_object::<Csv, _>(&mut contacts, csv_text.as_bytes(), SerializationOptions::new()).unwrap());

    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0], Contact { id: 1, name: "John Doe".to_string(), email: "john@example.com".to_string() });
    assert_eq!(contacts[1], Contact { id: 2, name: "Alice".to_string(), email: "alice@example.com".to_string() });

    let bytes = save_object::<Csv, _>(&contacts, SerializationOptions::new()).unwrap();

    let mut reloaded: Vec<Contact> = Vec::new();
    assert!(load_object::<Csv, _>(&mut reloaded, &bytes, SerializationOptions::new()).unwrap());
    assert_eq!(reloaded, contacts);
}

#[test]
fn csv_single_row_table_loads_one_record() {
    let csv_text = "Id,Name,Email\n1,John Doe,john@example.com\n";
    let mut contacts: Vec<Contact> = Vec::new();
    assert!(load_object::<Csv, _>(&mut contacts, csv_text.as_bytes(), SerializationOptions::new()).unwrap());
    assert_eq!(contacts.len(), 1);
}

#[test]
fn csv_header_only_table_loads_as_empty() {
    let csv_text = "Id,Name,Email\n";
    let mut contacts: Vec<Contact> = vec![Contact { id: 9, name: "stale".to_string(), email: "stale@example.com".to_string() }];
    assert!(load_object::<Csv, _>(&mut contacts, csv_text.as_bytes(), SerializationOptions::new()).unwrap());
    assert!(contacts.is_empty());
}
