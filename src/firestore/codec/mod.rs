//! Structural codec between typed records and the Firestore value tree.
//!
//! The encoder/decoder pair is a hand-written `serde` backend over
//! [`FirestoreValue`](crate::firestore::value::FirestoreValue): the derive
//! macro supplies the schema description and the codec walks it without any
//! runtime reflection.

mod decoder;
mod encoder;

pub use decoder::{decode_document, decode_value};
pub use encoder::{encode_document, encode_value};

/// Marker field name for the document id.
///
/// A struct field renamed to this marker (`#[serde(rename = "DocId")]`) is
/// never stored as a document field; on decode it is populated from the id of
/// the enclosing document.
pub const DOC_ID: &str = "DocId";

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::firestore::value::{Blob, FirestoreValue, ValueKind};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: u8,
        height: (i64, i64),
        favorite_color: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        friends: Option<Vec<Person>>,
    }

    fn vikram() -> Person {
        Person {
            name: "Vikram".into(),
            age: 19,
            height: (5, 11),
            favorite_color: Color::Blue,
            friends: None,
        }
    }

    fn ethan() -> Person {
        Person {
            name: "Ethan".into(),
            age: 23,
            height: (5, 10),
            favorite_color: Color::Red,
            friends: Some(vec![vikram()]),
        }
    }

    #[test]
    fn encodes_records_to_primitive_maps() {
        let map = encode_document(&ethan()).unwrap();
        assert_eq!(map.get("name"), Some(&FirestoreValue::from_string("Ethan")));
        assert_eq!(map.get("age"), Some(&FirestoreValue::from_integer(23)));
        assert_eq!(
            map.get("height"),
            Some(&FirestoreValue::from_array(vec![
                FirestoreValue::from_integer(5),
                FirestoreValue::from_integer(10),
            ]))
        );
        // Enum constants encode as their ordinal index.
        assert_eq!(
            map.get("favorite_color"),
            Some(&FirestoreValue::from_integer(0))
        );
        match map.get("friends").unwrap().kind() {
            ValueKind::Array(friends) => assert_eq!(friends.len(), 1),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn round_trips_nested_records() {
        let map = encode_document(&ethan()).unwrap();
        let decoded: Person = decode_document("ethan", &map).unwrap();
        assert_eq!(decoded, ethan());
    }

    #[test]
    fn none_fields_are_omitted_and_restored() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Sparse {
            present: String,
            missing: Option<String>,
        }

        let map = encode_document(&Sparse {
            present: "x".into(),
            missing: None,
        })
        .unwrap();
        assert!(!map.contains_key("missing"));

        let decoded: Sparse = decode_document("", &map).unwrap();
        assert_eq!(decoded.missing, None);
    }

    #[test]
    fn missing_mandatory_field_is_a_hard_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            required: i64,
        }

        let map = BTreeMap::new();
        let err = decode_document::<Strict>("", &map).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn kind_mismatch_is_a_hard_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            count: i64,
        }

        let mut map = BTreeMap::new();
        map.insert("count".to_string(), FirestoreValue::from_string("three"));
        let err = decode_document::<Strict>("", &map).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn doc_id_marker_is_skipped_and_injected() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Tagged {
            #[serde(rename = "DocId")]
            id: String,
            name: String,
        }

        let map = encode_document(&Tagged {
            id: "ignored".into(),
            name: "Rex".into(),
        })
        .unwrap();
        assert!(!map.contains_key(DOC_ID));

        let decoded: Tagged = decode_document("rex", &map).unwrap();
        assert_eq!(decoded.id, "rex");
        assert_eq!(decoded.name, "Rex");
    }

    #[test]
    fn data_carrying_variants_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum Shape {
            Point,
            Circle { radius: f64 },
            Segment(i64, i64),
            Label(String),
        }

        // Unit variants persist as ordinals, payload variants as
        // single-entry maps keyed by the variant name.
        let encoded = encode_value(&Shape::Circle { radius: 2.5 }).unwrap();
        match encoded.kind() {
            ValueKind::Map(map) => assert!(map.contains_key("Circle")),
            other => panic!("expected map, got {other:?}"),
        }

        for shape in [
            Shape::Point,
            Shape::Circle { radius: 2.5 },
            Shape::Segment(1, 4),
            Shape::Label("edge".into()),
        ] {
            let encoded = encode_value(&shape).unwrap();
            let decoded: Shape = decode_value(&encoded).unwrap();
            assert_eq!(decoded, shape);
        }
    }

    #[test]
    fn blobs_and_numeric_widths_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Mixed {
            blob: Blob,
            byte: u8,
            short: i16,
            int: i32,
            long: i64,
            float: f32,
            double: f64,
            letter: char,
        }

        let original = Mixed {
            blob: Blob::new(vec![1, 127, 123, 34, 6, 4, 12]),
            byte: 13,
            short: 13,
            int: 13,
            long: 13,
            float: 4.0,
            double: 4.0,
            letter: 'q',
        };

        let map = encode_document(&original).unwrap();
        assert!(matches!(map.get("blob").unwrap().kind(), ValueKind::Blob(_)));
        assert_eq!(map.get("byte"), Some(&FirestoreValue::from_integer(13)));
        assert_eq!(map.get("float"), Some(&FirestoreValue::from_double(4.0)));
        assert_eq!(map.get("letter"), Some(&FirestoreValue::from_string("q")));

        let decoded: Mixed = decode_document("", &map).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn non_string_map_keys_stringify() {
        let mut scores = BTreeMap::new();
        scores.insert(3_u32, "bronze".to_string());
        scores.insert(14_u32, "gold".to_string());

        let encoded = encode_value(&scores).unwrap();
        match encoded.kind() {
            ValueKind::Map(map) => {
                assert!(map.contains_key("3"));
                assert!(map.contains_key("14"));
            }
            other => panic!("expected map, got {other:?}"),
        }

        let decoded: BTreeMap<u32, String> = decode_value(&encoded).unwrap();
        assert_eq!(decoded, scores);
    }
}
