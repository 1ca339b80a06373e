//! Record - the plain field-to-value mapping a document store reads and writes.

use serde_json::Value;

/// A stored document's fields.
pub type Record = serde_json::Map<String, Value>;

/// Short name of a value's JSON type, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Overlay `patch` onto `base`, replacing each top-level field `patch` names.
pub(crate) fn merge_into(base: &mut Record, patch: Record) {
    for (key, value) in patch {
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_replaces_named_fields_only() {
        let mut base = record(json!({ "name": "Jacob", "age": 35 }));
        merge_into(&mut base, record(json!({ "age": 36 })));
        assert_eq!(Value::Object(base), json!({ "name": "Jacob", "age": 36 }));
    }

    #[test]
    fn kinds() {
        assert_eq!(value_kind(&json!(1)), "integer");
        assert_eq!(value_kind(&json!(1.5)), "number");
        assert_eq!(value_kind(&json!("x")), "string");
        assert_eq!(value_kind(&json!({})), "map");
    }
}
