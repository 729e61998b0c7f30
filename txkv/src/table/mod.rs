//! SQL-like multi-row table operations layered on a single-table
//! transaction handle. Grounded in
//! `original_source/tablestore/tablestore.go`'s `SimpleTable` and
//! `lookup.go`'s `GetSubsetTable`/`lookupTable`.

pub mod catalog;

use crate::codec::record::Record;
use crate::codec::value::Value;
use crate::error::{CResult, Error};
use crate::filter::{self, LookupHint, TableRowFilter};
use crate::codec::keycode;
use crate::schema::Schema;
use crate::storage::engine::Engine;
use crate::txn::manager::Transaction;

/// How `SimpleTable::insert` should reconcile a row against any existing
/// value under the same primary key. Mirrors the `InsertValue` dispatch
/// in `tablestore.go`'s `Insert`: `Insert`/`Replace` validate null
/// constraints and write the row outright (`Insert` additionally rejects
/// an existing key), `Update` merges non-null cells into whatever is
/// already there, and `Delete` writes a tombstone without touching the
/// row at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertMode {
    Insert,
    Update,
    Replace,
    Delete,
}

/// A table bound to one open transaction, exposing row-level operations
/// on top of the transaction's raw byte-key/value surface.
pub struct SimpleTable<'a, E: Engine> {
    txn: &'a mut Transaction<E>,
    name: String,
    schema: Schema,
}

impl<'a, E: Engine> SimpleTable<'a, E> {
    pub fn new(txn: &'a mut Transaction<E>, name: impl Into<String>, schema: Schema) -> Self {
        SimpleTable { txn, name: name.into(), schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn primary_key_bytes(&self, row: &[Value]) -> CResult<Vec<u8>> {
        if row.len() != self.schema.columns.len() {
            return Err(Error::BadRowFormat);
        }
        keycode::encode_pk(&row[self.schema.primary_key])
    }

    /// Reads one row by primary-key value.
    pub fn get(&mut self, primary_key: &Value) -> CResult<Option<Vec<Value>>> {
        let key = keycode::encode_pk(primary_key)?;
        match self.txn.get(&self.name, &key)? {
            Some(bytes) => Ok(Some(Record::decode_row(&self.schema, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Applies `row` under `mode` (spec §4.5).
    pub fn insert(&mut self, mode: InsertMode, row: &[Value]) -> CResult<()> {
        let key = self.primary_key_bytes(row)?;

        if mode == InsertMode::Delete {
            return self.txn.delete(&self.name, &key);
        }

        if mode == InsertMode::Update {
            return self.merge_write(&key, row);
        }

        // Insert and Replace: the row must stand on its own -- encode_row
        // enforces the null/default constraint over every column.
        let json = Record::encode_row(&self.schema, row)?;

        if mode == InsertMode::Insert && self.txn.get(&self.name, &key)?.is_some() {
            return Err(Error::DuplicateKey);
        }

        self.txn.set(&self.name, &key, json.into_bytes())
    }

    /// Merges the non-null cells of `row` into whatever `Record` is
    /// already stored under `key` (or a fresh one if there's nothing
    /// there yet), then re-encodes. A null cell in `row` means "leave
    /// this column unchanged", not "clear it".
    fn merge_write(&mut self, key: &[u8], row: &[Value]) -> CResult<()> {
        let mut record = match self.txn.get(&self.name, key)? {
            Some(bytes) => Record::from_json_bytes(&bytes)?,
            None => Record::new(),
        };
        for (col, value) in self.schema.columns.iter().zip(row) {
            if !value.is_null() {
                record.set(col.name.clone(), value.clone());
            }
        }
        let json = record.to_json()?;
        self.txn.set(&self.name, key, json.into_bytes())
    }

    /// Scans every row in primary-key order, decoding each and silently
    /// skipping rows that fail to decode against the current schema
    /// (spec §7: read-time decode failures are swallowed, not surfaced).
    pub fn scan_all(&mut self) -> CResult<Vec<Vec<Value>>> {
        let mut out = Vec::new();
        for (_key, value) in self.txn.scan(&self.name)? {
            if let Ok(row) = Record::decode_row(&self.schema, &value) {
                out.push(row);
            }
        }
        Ok(out)
    }

    /// Builds the most specific lookup hint this table can offer for
    /// `filter`, and returns only the rows that match it -- a full scan
    /// with post-filtering applied if no primary-key predicate is
    /// usable. Mirrors `GetSubsetTable` generating its own hint when
    /// none is supplied and then delegating to `lookupTable`.
    pub fn partition_rows(&mut self, filter: &TableRowFilter) -> CResult<Vec<Vec<Value>>> {
        match filter::generate_lookup_hint(self.schema.primary_key, filter) {
            LookupHint::KeyExtractor { predicate_index } => {
                self.lookup_by_keys(filter, predicate_index)
            }
            LookupHint::RangeHint { seek, until } => self.scan_range(filter, seek, until),
            LookupHint::Unoptimized => self.scan_and_post_filter(filter),
        }
    }

    fn lookup_by_keys(&mut self, filter: &TableRowFilter, predicate_index: usize) -> CResult<Vec<Vec<Value>>> {
        let predicate = &filter.column(self.schema.primary_key)[predicate_index];
        let mut out = Vec::new();
        for arg in &predicate.args {
            let Some(pk) = arg.get_value() else { continue };
            if let Some(row) = self.get(pk)? {
                if filter::post_filter_row(self.schema.columns.len(), filter, &row)? {
                    out.push(row);
                }
            }
        }
        Ok(out)
    }

    fn scan_range(
        &mut self,
        filter: &TableRowFilter,
        seek: Option<(filter::FilterOp, Value)>,
        until: Vec<(filter::FilterOp, Value)>,
    ) -> CResult<Vec<Vec<Value>>> {
        let pk = self.schema.primary_key;
        let mut out = Vec::new();
        for row in self.scan_all()? {
            if let Some((op, bound)) = &seek {
                let ord = filter::compare_values(&row[pk], bound)?;
                let ok = match op {
                    filter::FilterOp::Gt => ord == std::cmp::Ordering::Greater,
                    filter::FilterOp::Ge => ord != std::cmp::Ordering::Less,
                    _ => true,
                };
                if !ok {
                    continue;
                }
            }
            let mut within_until = true;
            for (op, bound) in &until {
                let ord = filter::compare_values(&row[pk], bound)?;
                let ok = match op {
                    filter::FilterOp::Lt => ord == std::cmp::Ordering::Less,
                    filter::FilterOp::Le => ord != std::cmp::Ordering::Greater,
                    _ => true,
                };
                if !ok {
                    within_until = false;
                    break;
                }
            }
            if !within_until {
                continue;
            }
            if filter::post_filter_row(self.schema.columns.len(), filter, &row)? {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn scan_and_post_filter(&mut self, filter: &TableRowFilter) -> CResult<Vec<Vec<Value>>> {
        let columns = self.schema.columns.len();
        let mut out = Vec::new();
        for row in self.scan_all()? {
            if filter::post_filter_row(columns, filter, &row)? {
                out.push(row);
            }
        }
        Ok(out)
    }
}
