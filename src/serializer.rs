//! Schema-driven conversion between typed values and records.
//!
//! serde does the value conversion; the type's [`Schema`](crate::Schema)
//! decides which fields make it into a record and rejects stored records
//! that do not fit the declared shape.

use serde_json::Value;

use crate::document::Document;
use crate::error::{DeserializationError, MapperError};
use crate::record::Record;

/// Serialize `value` into a record holding exactly its declared fields.
pub fn serialize<D: Document>(value: &D) -> Result<Record, MapperError> {
    let value = serde_json::to_value(value).map_err(|e| MapperError::Serialization {
        collection: D::COLLECTION,
        message: e.to_string(),
    })?;
    D::schema().project(value)
}

/// Build a `D` from a stored record.
///
/// Undeclared stored fields are ignored. Missing required fields and type
/// mismatches fail before serde sees the record.
pub fn deserialize<D: Document>(record: &Record) -> Result<D, DeserializationError> {
    let declared = D::schema().validate(record)?;
    serde_json::from_value(Value::Object(declared)).map_err(|e| DeserializationError::Serde {
        collection: D::COLLECTION,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldSpec, FieldType};
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bio: Option<String>,
        tags: Vec<String>,
        #[serde(skip)]
        session: Option<u64>,
    }

    impl Document for Profile {
        const COLLECTION: &'static str = "profiles";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::required("name", FieldType::String),
            FieldSpec::required("age", FieldType::Integer),
            FieldSpec::optional("bio", FieldType::String),
            FieldSpec::required("tags", FieldType::Array),
        ];
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn serialize_excludes_undeclared_state() {
        let profile = Profile {
            name: "Drake".into(),
            age: 23,
            bio: None,
            tags: vec!["a".into()],
            session: Some(7),
        };
        let record = serialize(&profile).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({ "name": "Drake", "age": 23, "tags": ["a"] })
        );
    }

    #[test]
    fn deserialize_fills_skipped_fields_with_defaults() {
        let profile: Profile =
            deserialize(&record(json!({ "name": "Drake", "age": 23, "tags": [] }))).unwrap();
        assert_eq!(profile.session, None);
        assert_eq!(profile.bio, None);
    }

    #[test]
    fn deserialize_rejects_out_of_range_values() {
        let stored = record(json!({ "name": "Drake", "age": -1, "tags": [] }));
        let err = deserialize::<Profile>(&stored).unwrap_err();
        assert!(matches!(err, DeserializationError::Serde { collection: "profiles", .. }));
    }

    #[test]
    fn deserialize_rejects_wrong_type() {
        let err = deserialize::<Profile>(&record(json!({ "name": 5, "age": 1, "tags": [] })))
            .unwrap_err();
        assert!(matches!(
            err,
            DeserializationError::TypeMismatch { field: "name", .. }
        ));
    }

    proptest! {
        #[test]
        fn record_round_trips(
            name in ".{0,12}",
            age in any::<u32>(),
            bio in proptest::option::of(".{0,12}"),
            tags in proptest::collection::vec("[a-z]{1,6}", 0..4),
        ) {
            let mut stored = Record::new();
            stored.insert("name".into(), json!(name));
            stored.insert("age".into(), json!(age));
            if let Some(bio) = bio {
                stored.insert("bio".into(), json!(bio));
            }
            stored.insert("tags".into(), json!(tags));

            let profile: Profile = deserialize(&stored).unwrap();
            prop_assert_eq!(serialize(&profile).unwrap(), stored);
        }
    }
}
