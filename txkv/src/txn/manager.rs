//! The multi-table transaction manager: opens transactions over a set of
//! tables under an isolation policy, and runs the two-step commit pipeline
//! for the `Serializable` strategy. Grounded in
//! `original_source/lstore/txnman.go`'s `txManager`/`txManagerSerializable`
//! and `txnutil.go`'s `udbWrapper`/`Simplistic`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CResult, Error};
use crate::storage::engine::Engine;
use crate::storage::native_txn::NativeTxn;
use crate::txn::flags::{self, Flags, Optimizations, ReadIso, Strategy, WriteIso};
use crate::txn::overlay::{
    prefixed, DirectOverlay, Overlay, ReadOnlyOverlay, RecklessOverlay, SerializableOverlay,
    SnapshotOverlay,
};

/// Owns the shared engine handle and the manager-wide commit lock. Cheap to
/// clone: every clone shares the same engine and lock.
pub struct Manager<E: Engine> {
    engine: Arc<Mutex<E>>,
    lock: Arc<RwLock<()>>,
    optimizations: Optimizations,
}

impl<E: Engine> Clone for Manager<E> {
    fn clone(&self) -> Self {
        Manager { engine: self.engine.clone(), lock: self.lock.clone(), optimizations: self.optimizations }
    }
}

impl<E: Engine> Manager<E> {
    pub fn new(engine: E) -> Self {
        Manager {
            engine: Arc::new(Mutex::new(engine)),
            lock: Arc::new(RwLock::new(())),
            optimizations: Optimizations::NONE,
        }
    }

    pub fn with_optimizations(engine: E, optimizations: Optimizations) -> Self {
        Manager {
            engine: Arc::new(Mutex::new(engine)),
            lock: Arc::new(RwLock::new(())),
            optimizations,
        }
    }

    fn table_prefix(name: &str) -> Vec<u8> {
        let mut prefix = b"t:".to_vec();
        prefix.extend_from_slice(name.as_bytes());
        prefix.push(b':');
        prefix
    }

    /// Opens a transaction over `tables` under the strategy the given
    /// isolation pair resolves to (spec §4.1).
    pub fn begin(
        &self,
        tables: &[&str],
        read: ReadIso,
        write: WriteIso,
    ) -> CResult<Transaction<E>> {
        let (strategy, flags) = flags::resolve(read, write);
        let mut overlays = HashMap::new();
        let mut names = Vec::with_capacity(tables.len());
        for name in tables {
            let prefix = Self::table_prefix(name);
            let overlay = match strategy {
                Strategy::ReadOnly => {
                    Overlay::ReadOnly(ReadOnlyOverlay::new(self.engine.clone(), prefix))
                }
                Strategy::Direct => {
                    Overlay::Direct(DirectOverlay::new(self.engine.clone(), prefix))
                }
                Strategy::Snapshot => {
                    Overlay::Snapshot(SnapshotOverlay::new(&self.engine, &prefix)?)
                }
                Strategy::Reckless => {
                    Overlay::Reckless(RecklessOverlay::new(self.engine.clone(), prefix, flags)?)
                }
                Strategy::Serializable => Overlay::Serializable(SerializableOverlay::new(
                    self.engine.clone(),
                    prefix,
                    flags,
                )?),
            };
            overlays.insert(name.to_string(), overlay);
            names.push(name.to_string());
        }
        Ok(Transaction {
            manager: self.clone(),
            strategy,
            flags,
            tables: overlays,
            table_names: names,
        })
    }

    /// Convenience matching `original_source/lstore/txnutil.go`'s
    /// `Simplistic`: opens `tables` directly under `(Any, Instant)` --
    /// immediate, unbuffered, unchecked -- for callers that have no use
    /// for isolation-policy selection at all.
    pub fn open_direct(engine: E, tables: &[&str]) -> CResult<Transaction<E>> {
        Manager::new(engine).begin(tables, ReadIso::Any, WriteIso::Instant)
    }

    fn commit_serializable(&self, txn: Transaction<E>) -> CResult<()> {
        let single_table = txn.table_names.len() <= 1;
        let concurrent = self.optimizations.has(Optimizations::CONCURRENT_COMMIT) && single_table;
        let use_txn = self.optimizations.has(Optimizations::USE_TRANSACTION);

        enum Guard<'a> {
            Read(RwLockReadGuard<'a, ()>),
            Write(RwLockWriteGuard<'a, ()>),
        }
        let _guard = if concurrent {
            Guard::Read(self.lock.read()?)
        } else {
            Guard::Write(self.lock.write()?)
        };

        let mut names = txn.table_names.clone();
        names.sort();

        // Step 1: validate every observed read against the live table,
        // unless this table's strategy opted out via NO_CHECK.
        for name in &names {
            let overlay = match txn.tables.get(name) {
                Some(Overlay::Serializable(o)) => o,
                _ => continue,
            };
            if overlay.flags().has(Flags::NO_CHECK) {
                continue;
            }
            let prefix = overlay.prefix();
            for (key, expected) in overlay.observed_reads() {
                let full = prefixed(prefix, key);
                let live = self.engine.lock()?.get(&full)?;
                if &live != expected {
                    return Err(Error::ConcurrentUpdate);
                }
            }
        }

        // Step 2: apply every pending write, either directly or staged
        // into a per-table native transaction.
        let mut native_txns = Vec::new();
        for name in &names {
            let overlay = match txn.tables.get(name) {
                Some(Overlay::Serializable(o)) => o,
                _ => continue,
            };
            let prefix = overlay.prefix();
            if use_txn {
                let mut native = NativeTxn::new();
                for (key, value) in overlay.pending_writes() {
                    let full = prefixed(prefix, key);
                    match value {
                        Some(v) => native.stage_set(full, v.clone()),
                        None => native.stage_delete(full),
                    }
                }
                native_txns.push(native);
            } else {
                let mut guard = self.engine.lock()?;
                for (key, value) in overlay.pending_writes() {
                    let full = prefixed(prefix, key);
                    match value {
                        Some(v) => guard.set(&full, v.clone())?,
                        None => guard.delete(&full)?,
                    }
                }
            }
        }

        // Step 3: commit every staged native transaction. Once validation
        // (step 1) passed, nothing here can fail on conflict grounds --
        // only engine I/O errors remain possible.
        for native in native_txns {
            native.commit(&mut *self.engine.lock()?)?;
        }

        Ok(())
    }
}

/// One multi-table transaction. Dropping it without calling `commit` is
/// equivalent to `discard`: `Reckless`/`Direct` writes are already applied
/// to the live table and cannot be rolled back, `Serializable`'s buffered
/// writes are simply never applied.
pub struct Transaction<E: Engine> {
    manager: Manager<E>,
    strategy: Strategy,
    flags: Flags,
    tables: HashMap<String, Overlay<E>>,
    table_names: Vec<String>,
}

impl<E: Engine> Transaction<E> {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    fn table_mut(&mut self, table: &str) -> CResult<&mut Overlay<E>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| Error::Internal(format!("transaction was not opened for table {table:?}")))
    }

    pub fn get(&mut self, table: &str, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.table_mut(table)?.read(key)
    }

    pub fn set(&mut self, table: &str, key: &[u8], value: Vec<u8>) -> CResult<()> {
        self.write_locked(table, key, Some(value))
    }

    pub fn delete(&mut self, table: &str, key: &[u8]) -> CResult<()> {
        self.write_locked(table, key, None)
    }

    /// `Direct` and `Reckless` writes land on the live table immediately,
    /// so spec §4.2 has them take the manager-wide RW-lock per write
    /// (`Direct` always exclusive; `Reckless` shared when `ConcurrentCommit`
    /// applies to a single-table transaction, else exclusive) -- unlike
    /// `Serializable`, which only takes the lock once, at commit.
    fn write_locked(&mut self, table: &str, key: &[u8], value: Option<Vec<u8>>) -> CResult<()> {
        match self.strategy {
            Strategy::Direct => {
                let _guard = self.manager.lock.write()?;
                self.table_mut(table)?.write(key, value)
            }
            Strategy::Reckless => {
                let single_table = self.table_names.len() <= 1;
                let concurrent =
                    self.manager.optimizations.has(Optimizations::CONCURRENT_COMMIT) && single_table;
                if concurrent {
                    let _guard = self.manager.lock.read()?;
                    self.table_mut(table)?.write(key, value)
                } else {
                    let _guard = self.manager.lock.write()?;
                    self.table_mut(table)?.write(key, value)
                }
            }
            Strategy::ReadOnly | Strategy::Snapshot | Strategy::Serializable => {
                self.table_mut(table)?.write(key, value)
            }
        }
    }

    pub fn scan(&mut self, table: &str) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.table_mut(table)?.iter()
    }

    /// Validates and applies every buffered write (`Serializable`); a
    /// no-op for the other four strategies, whose writes were already
    /// applied immediately or rejected outright at write time.
    pub fn commit(self) -> CResult<()> {
        match self.strategy {
            Strategy::Serializable => {
                let manager = self.manager.clone();
                manager.commit_serializable(self)
            }
            Strategy::ReadOnly | Strategy::Direct | Strategy::Snapshot | Strategy::Reckless => {
                Ok(())
            }
        }
    }

    /// Discards any buffered writes. For `Serializable` this simply drops
    /// `self` without applying `w`; for the other strategies there is
    /// nothing to discard.
    pub fn discard(self) -> CResult<()> {
        Ok(())
    }
}

/// A handle to one table within a transaction, matching the public surface
/// in spec §6 (`Transaction.Table(name) → TableHandle`).
pub struct TableHandle<'a, E: Engine> {
    txn: &'a mut Transaction<E>,
    name: String,
}

impl<'a, E: Engine> TableHandle<'a, E> {
    pub fn read(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.txn.get(&self.name, key)
    }

    /// A zero-length value is a delete, matching `UTable`'s own convention:
    /// there is no distinct tombstone value, so an empty write is read back
    /// as "not present" either way.
    pub fn write(&mut self, key: &[u8], value: Vec<u8>) -> CResult<()> {
        if value.is_empty() {
            self.txn.delete(&self.name, key)
        } else {
            self.txn.set(&self.name, key, value)
        }
    }

    pub fn iter(&mut self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.txn.scan(&self.name)
    }
}

impl<E: Engine> Transaction<E> {
    pub fn table_handle<'a>(&'a mut self, name: &str) -> CResult<TableHandle<'a, E>> {
        if !self.tables.contains_key(name) {
            return Err(Error::Internal(format!("transaction was not opened for table {name:?}")));
        }
        Ok(TableHandle { txn: self, name: name.to_string() })
    }
}
