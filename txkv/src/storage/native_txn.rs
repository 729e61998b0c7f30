//! A buffered, all-or-nothing batch of engine writes, standing in for the
//! native per-table KV transactions `original_source/lstore/txnman.go`
//! opens via `leveldb.Batch`/`OpenTransaction` when `UseTransaction` is set.
//! The `Engine` trait here has no native transaction primitive, so this
//! buffers every write in memory and only touches the engine in `commit()` --
//! true atomicity falls out for free, since a crash or early return before
//! `commit()` leaves the engine untouched.

use crate::error::CResult;
use crate::storage::engine::Engine;

#[derive(Default)]
pub struct NativeTxn {
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl NativeTxn {
    pub fn new() -> Self {
        NativeTxn { ops: Vec::new() }
    }

    pub fn stage_set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push((key, Some(value)));
    }

    pub fn stage_delete(&mut self, key: Vec<u8>) {
        self.ops.push((key, None));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every staged write to `engine`, in staging order.
    pub fn commit<E: Engine>(self, engine: &mut E) -> CResult<()> {
        for (key, value) in self.ops {
            match value {
                Some(value) => engine.set(&key, value)?,
                None => engine.delete(&key)?,
            }
        }
        Ok(())
    }

    /// Discards every staged write without touching the engine.
    pub fn discard(self) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::memory::Memory;

    #[test]
    fn commit_applies_staged_writes_in_order() {
        let mut engine = Memory::new();
        let mut txn = NativeTxn::new();
        txn.stage_set(b"a".to_vec(), vec![1]);
        txn.stage_set(b"a".to_vec(), vec![2]);
        txn.stage_delete(b"b".to_vec());
        txn.commit(&mut engine).unwrap();

        assert_eq!(engine.get(b"a").unwrap(), Some(vec![2]));
        assert_eq!(engine.get(b"b").unwrap(), None);
    }

    #[test]
    fn discard_touches_nothing() {
        let mut engine = Memory::new();
        let mut txn = NativeTxn::new();
        txn.stage_set(b"a".to_vec(), vec![1]);
        txn.discard();

        assert_eq!(engine.get(b"a").unwrap(), None);
    }
}
