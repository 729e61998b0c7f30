use std::collections::BTreeMap;

use crate::codec::value::Value;
use crate::error::{CResult, Error};
use crate::schema::Schema;

/// A self-describing mapping from column name to value -- the wire
/// representation of one row. Encoded/decoded via `serde_json`, the same way
/// `codec::json_codec::JsonCodec` encodes arbitrary `Serialize` values,
/// mapping failures to `Error::Internal`/`Error::Parse`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record(pub BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(BTreeMap::new())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Builds the wire record from an ordered row, skipping non-required
    /// columns whose value is null (spec §4.5: "build a mapping
    /// column-name → value for non-null (and required) columns"). A null
    /// value for a required column (non-nullable, no default) is a write
    /// error, not silently dropped.
    pub fn encode_row(schema: &Schema, row: &[Value]) -> CResult<String> {
        if row.len() != schema.columns.len() {
            return Err(Error::BadRowFormat);
        }
        let mut record = Record::new();
        for (col, value) in schema.columns.iter().zip(row) {
            if value.is_null() {
                if col.is_required() {
                    return Err(Error::NullConstraint);
                }
                continue;
            }
            record.set(col.name.clone(), value.clone());
        }
        record.to_json()
    }

    /// Decodes a wire record against a schema, producing the ordered row.
    /// Missing columns resolve to the column's default (or `Value::Null`
    /// if none); this is also reused directly for read-time decode errors,
    /// which callers are expected to swallow-and-skip per spec §7.
    pub fn decode_row(schema: &Schema, bytes: &[u8]) -> CResult<Vec<Value>> {
        let record = Record::from_json_bytes(bytes)?;
        let mut row = Vec::with_capacity(schema.columns.len());
        for col in &schema.columns {
            let value = match record.get(&col.name) {
                Some(v) => v.clone(),
                None => col.default.clone().unwrap_or(Value::Null),
            };
            row.push(value);
        }
        Ok(row)
    }

    pub fn to_json(&self) -> CResult<String> {
        serde_json::to_string(&self.0).map_err(|err| Error::Internal(err.to_string()))
    }

    pub fn from_json_bytes(bytes: &[u8]) -> CResult<Self> {
        let map: BTreeMap<String, Value> =
            serde_json::from_slice(bytes).map_err(|err| Error::Parse(err.to_string()))?;
        Ok(Record(map))
    }
}
