//! Nested-loop join driver. Spec §9's open question -- how much of the
//! inner scan should a join driver see -- is resolved here the way
//! `lookup.go`'s `GetSubsetTable` is consumed by its one caller: a small
//! iterator trait (seek/next/key/value/release) rather than handing out
//! the full `SimpleTable` or a storage-backend-specific iterator.

use crate::codec::keycode;
use crate::codec::value::Value;
use crate::error::CResult;
use crate::filter::TableRowFilter;
use crate::storage::engine::Engine;
use crate::table::SimpleTable;

/// The inner side of a nested-loop join. `seek` (re)positions the scan
/// before the current outer row's candidates are walked, `next` advances
/// one row at a time, `key`/`value` read the current position, and
/// `release` lets an implementation drop buffered state between outer
/// rows rather than waiting for the whole join to finish.
pub trait RowScan {
    fn seek(&mut self) -> CResult<()>;
    fn next(&mut self) -> CResult<bool>;
    fn key(&self) -> &[u8];
    fn value(&self) -> &[Value];
    fn release(&mut self);
}

/// A `RowScan` over rows already produced by `SimpleTable::partition_rows`
/// -- the lookup hint has already narrowed the candidates down, so this
/// just walks the materialized result.
pub struct MaterializedScan {
    rows: Vec<Vec<Value>>,
    keys: Vec<Vec<u8>>,
    position: Option<usize>,
}

impl MaterializedScan {
    fn new(rows: Vec<Vec<Value>>, primary_key: usize) -> CResult<Self> {
        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            keys.push(keycode::encode_pk(&row[primary_key])?);
        }
        Ok(MaterializedScan { rows, keys, position: None })
    }
}

impl RowScan for MaterializedScan {
    fn seek(&mut self) -> CResult<()> {
        self.position = None;
        Ok(())
    }

    fn next(&mut self) -> CResult<bool> {
        let next = match self.position {
            None => 0,
            Some(i) => i + 1,
        };
        if next >= self.rows.len() {
            return Ok(false);
        }
        self.position = Some(next);
        Ok(true)
    }

    fn key(&self) -> &[u8] {
        &self.keys[self.position.expect("next() must be called before key()")]
    }

    fn value(&self) -> &[Value] {
        &self.rows[self.position.expect("next() must be called before value()")]
    }

    fn release(&mut self) {
        self.position = None;
    }
}

/// Drives a correlated nested-loop join: for each outer row, `correlate`
/// binds the inner side's predicate arguments to that row's values, and
/// the inner table is re-partitioned against the resulting filter --
/// matching `lookupTable`'s per-outer-row `GetSubsetTable` call rather
/// than materializing the inner table once up front.
pub fn nested_loop_join<E: Engine>(
    outer_rows: &[Vec<Value>],
    inner: &mut SimpleTable<'_, E>,
    correlate: impl Fn(&[Value]) -> TableRowFilter,
) -> CResult<Vec<(Vec<Value>, Vec<Value>)>> {
    let primary_key = inner.schema().primary_key;
    let mut out = Vec::new();
    for outer in outer_rows {
        let filter = correlate(outer);
        let mut scan = MaterializedScan::new(inner.partition_rows(&filter)?, primary_key)?;
        scan.seek()?;
        while scan.next()? {
            out.push((outer.clone(), scan.value().to_vec()));
        }
        scan.release();
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filter::{FilterArg, FilterOp, TableFilter};
    use crate::schema::{Column, ColumnType, Schema};
    use crate::storage::memory::Memory;
    use crate::table::InsertMode;
    use crate::txn::flags::{ReadIso, WriteIso};
    use crate::txn::manager::Manager;

    fn users_schema() -> Schema {
        Schema::new(
            vec![Column::new("id", ColumnType::Int32).not_null(), Column::new("name", ColumnType::Text)],
            0,
        )
        .unwrap()
    }

    fn orders_schema() -> Schema {
        Schema::new(
            vec![
                Column::new("id", ColumnType::Int32).not_null(),
                Column::new("user_id", ColumnType::Int32),
            ],
            0,
        )
        .unwrap()
    }

    #[test]
    fn joins_each_outer_row_against_a_freshly_partitioned_inner_scan() {
        let manager = Manager::new(Memory::new());
        let mut txn =
            manager.begin(&["users", "orders"], ReadIso::Any, WriteIso::Instant).unwrap();

        let outer_rows = {
            let mut users = SimpleTable::new(&mut txn, "users", users_schema());
            users.insert(InsertMode::Insert, &[Value::Int32(1), Value::Text("alice".into())]).unwrap();
            users.insert(InsertMode::Insert, &[Value::Int32(2), Value::Text("bob".into())]).unwrap();
            users.scan_all().unwrap()
        };

        {
            let mut orders = SimpleTable::new(&mut txn, "orders", orders_schema());
            orders.insert(InsertMode::Insert, &[Value::Int32(100), Value::Int32(1)]).unwrap();
            orders.insert(InsertMode::Insert, &[Value::Int32(101), Value::Int32(2)]).unwrap();
        }

        let mut orders = SimpleTable::new(&mut txn, "orders", orders_schema());
        let joined = nested_loop_join(&outer_rows, &mut orders, |outer| {
            let mut f = TableRowFilter::new(2);
            f.push(1, TableFilter::new(FilterOp::Eq, vec![FilterArg::literal(outer[0].clone())]));
            f
        })
        .unwrap();

        assert_eq!(joined.len(), 2);
        assert!(joined
            .iter()
            .any(|(u, o)| u[0] == Value::Int32(1) && o[0] == Value::Int32(100)));
        assert!(joined
            .iter()
            .any(|(u, o)| u[0] == Value::Int32(2) && o[0] == Value::Int32(101)));
    }
}
