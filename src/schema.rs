//! Schema - the ordered list of persisted fields of a document type.

use serde_json::Value;

use crate::error::{DeserializationError, MapperError};
use crate::record::{value_kind, Record};

/// Stored type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    /// Any number, integers included.
    Number,
    Boolean,
    Array,
    Map,
    Any,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Map => value.is_object(),
            FieldType::Any => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Map => "map",
            FieldType::Any => "any",
        }
    }
}

/// One persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// Ordered field declarations for one document type.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    collection: &'static str,
    fields: &'static [FieldSpec],
}

impl Schema {
    pub const fn new(collection: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { collection, fields }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }

    /// Build the record for a serialized value, keeping declared fields only.
    ///
    /// Optional fields that are missing or null are left out.
    pub fn project(&self, value: Value) -> Result<Record, MapperError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(MapperError::Serialization {
                    collection: self.collection,
                    message: format!("expected a map, got {}", value_kind(&other)),
                })
            }
        };

        let mut record = Record::new();
        for spec in self.fields {
            match object.remove(spec.name) {
                None | Some(Value::Null) if !spec.required => {}
                None | Some(Value::Null) => {
                    return Err(MapperError::Serialization {
                        collection: self.collection,
                        message: format!("required field `{}` has no value", spec.name),
                    })
                }
                Some(value) if !spec.ty.matches(&value) => {
                    return Err(MapperError::Serialization {
                        collection: self.collection,
                        message: format!(
                            "field `{}` serialized as {}, declared {}",
                            spec.name,
                            value_kind(&value),
                            spec.ty.name()
                        ),
                    })
                }
                Some(value) => {
                    record.insert(spec.name.to_string(), value);
                }
            }
        }
        Ok(record)
    }

    /// Check a stored record against the declarations and return its declared subset.
    ///
    /// Stored fields the schema does not declare are dropped.
    pub fn validate(&self, record: &Record) -> Result<Record, DeserializationError> {
        let mut out = Record::new();
        for spec in self.fields {
            match record.get(spec.name) {
                None | Some(Value::Null) if !spec.required => {}
                None | Some(Value::Null) => {
                    return Err(DeserializationError::MissingField {
                        collection: self.collection,
                        field: spec.name,
                    })
                }
                Some(value) if !spec.ty.matches(value) => {
                    return Err(DeserializationError::TypeMismatch {
                        collection: self.collection,
                        field: spec.name,
                        expected: spec.ty.name(),
                        found: value_kind(value),
                    })
                }
                Some(value) => {
                    out.insert(spec.name.to_string(), value.clone());
                }
            }
        }
        Ok(out)
    }
}
