//! The five overlay strategies selected by `txn::flags::resolve`. Grounded
//! in `original_source/lstore/txnman.go`'s `uTableRO` (ReadOnly), `uTableD`
//! (Direct), `uTableDs` (Snapshot), `uTableIW` (Reckless) and `uTableSR`
//! (Serializable).
//!
//! Every overlay is scoped to one logical table via a key prefix over a
//! shared `Engine` handle -- tables are partitions of one flat keyspace,
//! since `storage::engine::Engine` itself has no multi-table concept.
//! Scans materialize their base range eagerly into an owned `Vec` rather
//! than streaming through the engine's borrowed scan iterator, so that an
//! overlay doesn't need to hold a `MutexGuard` open across iteration.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::{CResult, Error};
use crate::storage::engine::Engine;
use crate::storage::snapshot::Snapshot;
use crate::txn::flags::Flags;
use crate::txn::iter::{MergedIter, Source};

pub(crate) fn prefixed(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + key.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(key);
    out
}

fn strip<'a>(prefix: &[u8], key: &'a [u8]) -> &'a [u8] {
    &key[prefix.len()..]
}

fn scan_engine<E: Engine>(engine: &Arc<Mutex<E>>, prefix: &[u8]) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut guard = engine.lock()?;
    let mut out = Vec::new();
    for item in guard.scan_prefix(prefix) {
        let (key, value) = item?;
        out.push((strip(prefix, &key).to_vec(), value));
    }
    Ok(out)
}

/// `(ReadIso::Any, WriteIso::Disabled)`: reads go straight to the live
/// table, writes are rejected outright.
pub struct ReadOnlyOverlay<E: Engine> {
    engine: Arc<Mutex<E>>,
    prefix: Vec<u8>,
}

impl<E: Engine> ReadOnlyOverlay<E> {
    pub fn new(engine: Arc<Mutex<E>>, prefix: Vec<u8>) -> Self {
        ReadOnlyOverlay { engine, prefix }
    }

    pub fn read(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.engine.lock()?.get(&prefixed(&self.prefix, key))
    }

    pub fn write(&mut self, _key: &[u8], _value: Option<Vec<u8>>) -> CResult<()> {
        Err(Error::ReadOnly)
    }

    pub fn iter(&self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        scan_engine(&self.engine, &self.prefix)
    }
}

/// `(ReadIso::Any, WriteIso::Instant)`: every read and write goes straight
/// through to the live table, unbuffered and unchecked.
pub struct DirectOverlay<E: Engine> {
    engine: Arc<Mutex<E>>,
    prefix: Vec<u8>,
}

impl<E: Engine> DirectOverlay<E> {
    pub fn new(engine: Arc<Mutex<E>>, prefix: Vec<u8>) -> Self {
        DirectOverlay { engine, prefix }
    }

    pub fn read(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.engine.lock()?.get(&prefixed(&self.prefix, key))
    }

    pub fn write(&mut self, key: &[u8], value: Option<Vec<u8>>) -> CResult<()> {
        let full = prefixed(&self.prefix, key);
        let mut guard = self.engine.lock()?;
        match value {
            Some(v) => guard.set(&full, v),
            None => guard.delete(&full),
        }
    }

    pub fn iter(&self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        scan_engine(&self.engine, &self.prefix)
    }
}

/// `(ReadIso::Snapshot, WriteIso::Disabled)`: every read is served from a
/// point-in-time capture of the table taken at `begin`; writes always fail.
pub struct SnapshotOverlay {
    snapshot: Snapshot,
}

impl SnapshotOverlay {
    pub fn new<E: Engine>(engine: &Arc<Mutex<E>>, prefix: &[u8]) -> CResult<Self> {
        let snapshot = Snapshot::capture(&mut *engine.lock()?, prefix)?;
        Ok(SnapshotOverlay { snapshot })
    }

    pub fn read(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        Ok(self.snapshot.get(key))
    }

    pub fn write(&mut self, _key: &[u8], _value: Option<Vec<u8>>) -> CResult<()> {
        Err(Error::ReadOnly)
    }

    pub fn iter(&self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.snapshot.scan((std::ops::Bound::Unbounded, std::ops::Bound::Unbounded)).collect()
    }
}

/// Immediate writes verified against this transaction's last-observed
/// value for the key (unless `NO_CHECK`), reads served from a snapshot or
/// a first-observed-value cache depending on flags. Grounded in
/// `uTableIW`'s verify-then-put.
pub struct RecklessOverlay<E: Engine> {
    engine: Arc<Mutex<E>>,
    prefix: Vec<u8>,
    flags: Flags,
    snapshot: Option<Snapshot>,
    rm: HashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<E: Engine> RecklessOverlay<E> {
    pub fn new(engine: Arc<Mutex<E>>, prefix: Vec<u8>, flags: Flags) -> CResult<Self> {
        let snapshot = if flags.has(Flags::NO_SNAPSHOT) {
            None
        } else {
            Some(Snapshot::capture(&mut *engine.lock()?, &prefix)?)
        };
        Ok(RecklessOverlay { engine, prefix, flags, snapshot, rm: HashMap::new() })
    }

    pub fn read(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.get(key));
        }
        if self.flags.has(Flags::RE_READ) {
            return self.engine.lock()?.get(&prefixed(&self.prefix, key));
        }
        if let Some(cached) = self.rm.get(key) {
            return Ok(cached.clone());
        }
        let value = self.engine.lock()?.get(&prefixed(&self.prefix, key))?;
        self.rm.insert(key.to_vec(), value.clone());
        Ok(value)
    }

    /// Writes immediately, first verifying (unless `NO_CHECK`) that the
    /// live value still matches what this transaction last observed for
    /// `key` -- absence of a prior observation is treated as an assertion
    /// that the key was not yet present.
    pub fn write(&mut self, key: &[u8], value: Option<Vec<u8>>) -> CResult<()> {
        let full = prefixed(&self.prefix, key);
        if !self.flags.has(Flags::NO_CHECK) {
            let live = self.engine.lock()?.get(&full)?;
            let expected = self.rm.get(key).cloned().unwrap_or(None);
            if live != expected {
                return Err(Error::ConcurrentUpdate);
            }
        }
        {
            let mut guard = self.engine.lock()?;
            match &value {
                Some(v) => guard.set(&full, v.clone())?,
                None => guard.delete(&full)?,
            }
        }
        self.rm.insert(key.to_vec(), value);
        Ok(())
    }

    pub fn iter(&self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot
                .scan((std::ops::Bound::Unbounded, std::ops::Bound::Unbounded))
                .collect::<CResult<Vec<_>>>();
        }
        scan_engine(&self.engine, &self.prefix)
    }
}

/// Buffered writes, validated at commit against observed reads. Grounded
/// in `uTableSR`/`uIteratorSR`: reads resolve pending writes first, then
/// the observed-read cache (unless `RE_READ`), then the base snapshot or
/// live table.
pub struct SerializableOverlay<E: Engine> {
    engine: Arc<Mutex<E>>,
    prefix: Vec<u8>,
    flags: Flags,
    snapshot: Option<Snapshot>,
    w: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    rm: HashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<E: Engine> SerializableOverlay<E> {
    pub fn new(engine: Arc<Mutex<E>>, prefix: Vec<u8>, flags: Flags) -> CResult<Self> {
        let snapshot = if flags.has(Flags::NO_SNAPSHOT) {
            None
        } else {
            Some(Snapshot::capture(&mut *engine.lock()?, &prefix)?)
        };
        Ok(SerializableOverlay { engine, prefix, flags, snapshot, w: BTreeMap::new(), rm: HashMap::new() })
    }

    fn base_read(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        match &self.snapshot {
            Some(snapshot) => Ok(snapshot.get(key)),
            None => self.engine.lock()?.get(&prefixed(&self.prefix, key)),
        }
    }

    pub fn read(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        if let Some(value) = self.w.get(key) {
            return Ok(value.clone());
        }
        if !self.flags.has(Flags::RE_READ) {
            if let Some(cached) = self.rm.get(key) {
                return Ok(cached.clone());
            }
        }
        let value = self.base_read(key)?;
        if !self.flags.has(Flags::TX_IGNORE_READ) {
            self.rm.insert(key.to_vec(), value.clone());
        }
        Ok(value)
    }

    pub fn write(&mut self, key: &[u8], value: Option<Vec<u8>>) -> CResult<()> {
        if self.flags.has(Flags::DISCARD_WRITES) {
            return Err(Error::ReadOnly);
        }
        self.w.insert(key.to_vec(), value);
        Ok(())
    }

    /// Merges pending writes over the base range, applying the same
    /// observed-read-cache bookkeeping as point reads to entries sourced
    /// from the base table.
    pub fn iter(&mut self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let base: Vec<CResult<(Vec<u8>, Vec<u8>)>> = match &self.snapshot {
            Some(snapshot) => {
                snapshot.scan((std::ops::Bound::Unbounded, std::ops::Bound::Unbounded)).collect()
            }
            None => scan_engine(&self.engine, &self.prefix)?.into_iter().map(Ok).collect(),
        };
        let pending: Vec<_> = self.w.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let mut merged = MergedIter::new(base.into_iter(), pending);
        let mut out = Vec::new();
        while let Some((key, value, source)) = merged.next()? {
            let value = if source == Source::Base {
                if !self.flags.has(Flags::RE_READ) {
                    if let Some(cached) = self.rm.get(&key) {
                        match cached {
                            Some(v) => v.clone(),
                            None => continue, // rm recorded this key as deleted since
                        }
                    } else {
                        if !self.flags.has(Flags::TX_IGNORE_READ) {
                            self.rm.insert(key.clone(), Some(value.clone()));
                        }
                        value
                    }
                } else {
                    value
                }
            } else {
                value
            };
            out.push((key, value));
        }
        Ok(out)
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn pending_writes(&self) -> &BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        &self.w
    }

    pub fn observed_reads(&self) -> &HashMap<Vec<u8>, Option<Vec<u8>>> {
        &self.rm
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn engine(&self) -> &Arc<Mutex<E>> {
        &self.engine
    }
}

/// The overlay selected for one table within one transaction.
pub enum Overlay<E: Engine> {
    ReadOnly(ReadOnlyOverlay<E>),
    Direct(DirectOverlay<E>),
    Snapshot(SnapshotOverlay),
    Reckless(RecklessOverlay<E>),
    Serializable(SerializableOverlay<E>),
}

impl<E: Engine> Overlay<E> {
    pub fn read(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        match self {
            Overlay::ReadOnly(o) => o.read(key),
            Overlay::Direct(o) => o.read(key),
            Overlay::Snapshot(o) => o.read(key),
            Overlay::Reckless(o) => o.read(key),
            Overlay::Serializable(o) => o.read(key),
        }
    }

    pub fn write(&mut self, key: &[u8], value: Option<Vec<u8>>) -> CResult<()> {
        match self {
            Overlay::ReadOnly(o) => o.write(key, value),
            Overlay::Direct(o) => o.write(key, value),
            Overlay::Snapshot(o) => o.write(key, value),
            Overlay::Reckless(o) => o.write(key, value),
            Overlay::Serializable(o) => o.write(key, value),
        }
    }

    pub fn iter(&mut self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            Overlay::ReadOnly(o) => o.iter(),
            Overlay::Direct(o) => o.iter(),
            Overlay::Snapshot(o) => o.iter(),
            Overlay::Reckless(o) => o.iter(),
            Overlay::Serializable(o) => o.iter(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::memory::Memory;

    fn engine() -> Arc<Mutex<Memory>> {
        Arc::new(Mutex::new(Memory::new()))
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut overlay = ReadOnlyOverlay::new(engine(), b"t:".to_vec());
        assert!(matches!(overlay.write(b"a", Some(vec![1])), Err(Error::ReadOnly)));
    }

    #[test]
    fn direct_writes_are_immediately_visible() {
        let e = engine();
        let mut overlay = DirectOverlay::new(e.clone(), b"t:".to_vec());
        overlay.write(b"a", Some(vec![1])).unwrap();
        assert_eq!(e.lock().unwrap().get(b"t:a").unwrap(), Some(vec![1]));
        assert_eq!(overlay.read(b"a").unwrap(), Some(vec![1]));
    }

    #[test]
    fn snapshot_is_stable_across_later_writes() {
        let e = engine();
        e.lock().unwrap().set(b"t:a", vec![1]).unwrap();
        let overlay = SnapshotOverlay::new(&e, b"t:").unwrap();
        e.lock().unwrap().set(b"t:a", vec![2]).unwrap();
        assert_eq!(overlay.read(b"a").unwrap(), Some(vec![1]));
    }

    #[test]
    fn reckless_write_detects_concurrent_update() {
        let e = engine();
        let mut overlay = RecklessOverlay::new(e.clone(), b"t:".to_vec(), Flags::NONE).unwrap();
        overlay.read(b"a").unwrap(); // observes None
        e.lock().unwrap().set(b"t:a", vec![99]).unwrap(); // concurrent writer
        let err = overlay.write(b"a", Some(vec![1])).unwrap_err();
        assert!(matches!(err, Error::ConcurrentUpdate));
    }

    #[test]
    fn reckless_no_check_skips_verification() {
        let e = engine();
        let mut overlay =
            RecklessOverlay::new(e.clone(), b"t:".to_vec(), Flags::NO_CHECK).unwrap();
        e.lock().unwrap().set(b"t:a", vec![99]).unwrap();
        overlay.write(b"a", Some(vec![1])).unwrap();
        assert_eq!(e.lock().unwrap().get(b"t:a").unwrap(), Some(vec![1]));
    }

    #[test]
    fn serializable_read_prefers_pending_write() {
        let e = engine();
        e.lock().unwrap().set(b"t:a", vec![1]).unwrap();
        let mut overlay =
            SerializableOverlay::new(e, b"t:".to_vec(), Flags::NONE).unwrap();
        overlay.write(b"a", Some(vec![2])).unwrap();
        assert_eq!(overlay.read(b"a").unwrap(), Some(vec![2]));
    }

    #[test]
    fn serializable_iter_merges_pending_over_base() {
        let e = engine();
        e.lock().unwrap().set(b"t:a", vec![1]).unwrap();
        e.lock().unwrap().set(b"t:b", vec![2]).unwrap();
        let mut overlay =
            SerializableOverlay::new(e, b"t:".to_vec(), Flags::NONE).unwrap();
        overlay.write(b"b", None).unwrap(); // delete
        overlay.write(b"c", Some(vec![3])).unwrap(); // insert
        let rows = overlay.iter().unwrap();
        assert_eq!(rows, vec![(b"a".to_vec(), vec![1]), (b"c".to_vec(), vec![3])]);
    }
}
