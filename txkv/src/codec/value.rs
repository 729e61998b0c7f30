use serde_derive::{Deserialize, Serialize};

/// A single cell value, tagged by the schema's `ColumnType`. Mirrors the
/// type set in `schema::ColumnType` one-to-one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    Null,
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    /// Unix timestamp, microsecond resolution.
    Timestamp(i64),
    /// Days since the Unix epoch.
    Date(i32),
    Text(String),
    Boolean(bool),
    Json(serde_json::Value),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The name of this value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int8(_) => "int8",
            Value::Uint8(_) => "uint8",
            Value::Int16(_) => "int16",
            Value::Uint16(_) => "uint16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Json(_) => "json",
            Value::Blob(_) => "blob",
        }
    }

    /// The value's canonical textual form, used for display and as the
    /// fallback key representation for types the sortable encoder does not
    /// specialize.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int8(v) => v.to_string(),
            Value::Uint8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Uint16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Timestamp(v) => v.to_string(),
            Value::Date(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::Boolean(v) => v.to_string(),
            Value::Json(v) => v.to_string(),
            Value::Blob(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }
}
