//! A point-in-time read-only copy of one table's keyspace, used by the
//! `Snapshot` and `Serializable`/`Reckless` (unless `NoSnapshot`) overlay
//! strategies. The `Engine` trait here has no native `Snapshot()`
//! capability (unlike `original_source/lstore/txnutil.go`'s `Database`
//! interface), so this captures the table's prefix range eagerly into an
//! owned `BTreeMap` at transaction-begin time instead of layering on an
//! engine-specific snapshot mechanism.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::CResult;
use crate::storage::engine::Engine;

pub struct Snapshot {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Snapshot {
    /// Captures every key/value pair under `prefix` as of right now,
    /// keyed by the table-relative suffix -- `scan_prefix` yields keys with
    /// `prefix` still attached, but every caller of `get`/`scan` addresses
    /// this snapshot with the unprefixed key, same as the live-engine path
    /// in `overlay::scan_engine`.
    pub fn capture<E: Engine>(engine: &mut E, prefix: &[u8]) -> CResult<Self> {
        let mut data = BTreeMap::new();
        for item in engine.scan_prefix(prefix) {
            let (key, value) = item?;
            data.insert(key[prefix.len()..].to_vec(), value);
        }
        Ok(Snapshot { data })
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    pub fn scan(
        &self,
        range: (Bound<Vec<u8>>, Bound<Vec<u8>>),
    ) -> impl DoubleEndedIterator<Item = CResult<(Vec<u8>, Vec<u8>)>> + '_ {
        self.data.range(range).map(|(k, v)| Ok((k.clone(), v.clone())))
    }
}
