//! Table catalog persistence, grounded in
//! `original_source/tablestore/tablestore.go`'s `TableMetadata.StoreInto`
//! and `LoadDatabase`. Catalog entries live in an ordinary table named
//! `catalog-tables`, keyed by table name -- there is no separate
//! metadata store, matching the original's choice to keep the catalog in
//! the same key space it describes.

use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};
use crate::schema::Schema;
use crate::storage::engine::Engine;
use crate::txn::manager::Transaction;

/// Name of the well-known table holding one entry per user table.
pub const CATALOG_TABLE: &str = "catalog-tables";

/// The only format this engine understands. Kept as an explicit field
/// (rather than assumed) so `load_database` can reject catalog entries
/// written by a future, incompatible format the way the original does.
pub const FORMAT_SIMPLE: &str = "simple";

/// One catalog entry: a table's name, schema, and storage format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub schema: Schema,
    pub format: String,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        TableMetadata { name: name.into(), schema, format: FORMAT_SIMPLE.to_string() }
    }

    /// Writes this entry into the open catalog transaction. The caller
    /// must have opened `txn` over `CATALOG_TABLE`.
    pub fn store_into<E: Engine>(&self, txn: &mut Transaction<E>) -> CResult<()> {
        let json = serde_json::to_vec(self)?;
        txn.set(CATALOG_TABLE, self.name.as_bytes(), json)
    }
}

/// Loads every table's metadata from the catalog, validating each entry
/// the way `LoadDatabase` does: a schema without exactly one primary-key
/// column, or an unrecognized format, fails the whole load rather than
/// silently skipping the bad entry.
pub fn load_database<E: Engine>(txn: &mut Transaction<E>) -> CResult<Vec<TableMetadata>> {
    let mut out = Vec::new();
    for (_key, value) in txn.scan(CATALOG_TABLE)? {
        let meta: TableMetadata = serde_json::from_slice(&value)?;
        if meta.schema.columns.is_empty() || meta.schema.primary_key >= meta.schema.columns.len() {
            return Err(Error::BadRowFormat);
        }
        if meta.format != FORMAT_SIMPLE {
            return Err(Error::BadRowFormat);
        }
        out.push(meta);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{Column, ColumnType};
    use crate::storage::memory::Memory;
    use crate::txn::manager::Manager;
    use crate::txn::flags::{ReadIso, WriteIso};

    fn schema() -> Schema {
        Schema::new(vec![Column::new("id", ColumnType::Text).not_null()], 0).unwrap()
    }

    #[test]
    fn stores_and_reloads_table_metadata() {
        let manager = Manager::new(Memory::new());
        let mut txn = manager.begin(&[CATALOG_TABLE], ReadIso::Any, WriteIso::Instant).unwrap();
        TableMetadata::new("users", schema()).store_into(&mut txn).unwrap();
        TableMetadata::new("orders", schema()).store_into(&mut txn).unwrap();

        let mut reload = manager.begin(&[CATALOG_TABLE], ReadIso::Any, WriteIso::Instant).unwrap();
        let loaded = load_database(&mut reload).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().any(|m| m.name == "users"));
        assert!(loaded.iter().any(|m| m.name == "orders"));
    }

    #[test]
    fn rejects_unknown_format() {
        let manager = Manager::new(Memory::new());
        let mut txn = manager.begin(&[CATALOG_TABLE], ReadIso::Any, WriteIso::Instant).unwrap();
        let mut bad = TableMetadata::new("bad", schema());
        bad.format = "exotic".to_string();
        bad.store_into(&mut txn).unwrap();

        let mut reload = manager.begin(&[CATALOG_TABLE], ReadIso::Any, WriteIso::Instant).unwrap();
        assert!(matches!(load_database(&mut reload), Err(Error::BadRowFormat)));
    }
}
