use serde_derive::{Deserialize, Serialize};

use crate::codec::value::Value;
use crate::error::{CResult, Error};

/// A column's semantic SQL type. Ordering mirrors
/// `original_source/modern/schema/schema.go`'s `Type` enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Null,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Timestamp,
    Date,
    Text,
    Boolean,
    Json,
    Blob,
}

impl ColumnType {
    /// Whether this type's default, sortable encoding in `codec::keycode`
    /// preserves the SQL ordering of values of this type (spec Property 7).
    pub fn is_orderable(&self) -> bool {
        !matches!(self, ColumnType::Null | ColumnType::Json)
    }
}

/// A single column in a table schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub col_type: ColumnType,
    pub default: Option<Value>,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Column { name: name.into(), col_type, default: None, nullable: true }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Whether a value is required at encode time: non-nullable and without
    /// a default.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

/// An ordered list of columns, with exactly one column designated the
/// primary key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
    pub primary_key: usize,
}

impl Schema {
    /// Builds a schema, validating that `primary_key` names exactly one
    /// column. Multi-column primary keys are rejected rather than falling
    /// back to the legacy comma-joined textual encoding.
    pub fn new(columns: Vec<Column>, primary_key: usize) -> CResult<Self> {
        if columns.is_empty() || primary_key >= columns.len() {
            return Err(Error::BadRowFormat);
        }
        Ok(Schema { columns, primary_key })
    }

    pub fn primary_key_column(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
