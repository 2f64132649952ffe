//! Preloaded related records.
//!
//! # Invariants
//! - A record carries every column of its table as selected by `r.*`,
//!   except credential columns.
//! - Nested preloads hang off the record they were loaded for, keyed by
//!   relation name.

use super::entity::ID_COLUMN;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// Credential columns never copied into a record.
const HIDDEN_COLUMNS: &[&str] = &["password", "remember_token"];

/// Preloaded records keyed by relation name.
pub type Preloaded = BTreeMap<String, Vec<Record>>;

/// One related row loaded through a preload path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub table: String,
    pub id: i64,
    pub fields: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub related: Preloaded,
}

impl Record {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Stores one column value; `id` also sets [`Record::id`].
    pub fn set(&mut self, column: &str, value: Value) {
        if HIDDEN_COLUMNS.contains(&column) {
            return;
        }
        if column == ID_COLUMN {
            if let Value::Integer(id) = value {
                self.id = id;
            }
        }
        self.fields.insert(column.to_string(), to_json(value));
    }

    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.fields.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(JsonValue::as_str)
    }

    /// Records preloaded under `relation`, or an empty slice.
    pub fn related(&self, relation: &str) -> &[Record] {
        self.related.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Ids of `records`, in load order.
pub fn record_ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(number) => JsonValue::Number(number.into()),
        Value::Real(number) => Number::from_f64(number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(text) => JsonValue::String(text),
        Value::Blob(bytes) => JsonValue::Array(
            bytes
                .into_iter()
                .map(|byte| JsonValue::Number(byte.into()))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{record_ids, Record};
    use rusqlite::types::Value;

    #[test]
    fn set_tracks_the_id_column() {
        let mut record = Record::new("departments");
        record.set("id", Value::Integer(7));
        record.set("name", Value::Text("Engineering".to_string()));
        record.set("deleted_at", Value::Null);
        record.set("password", Value::Text("$argon2id$hash".to_string()));

        assert_eq!(record.id, 7);
        assert_eq!(record.text("name"), Some("Engineering"));
        assert!(record.get("deleted_at").is_some_and(|value| value.is_null()));
        assert!(record.get("password").is_none());
        assert!(record.related("divisions").is_empty());
        assert_eq!(record_ids(&[record]), vec![7]);
    }
}
