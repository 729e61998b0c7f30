/// Independent isolation-behavior bits, set by `Manager::begin`'s mapping
/// from `(ReadIso, WriteIso)` to a strategy (spec §4.1). Grounded in
/// `original_source/lstore/txnutil.go`'s `Flags` bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    pub const NO_SNAPSHOT: Flags = Flags(1 << 0);
    pub const DISCARD_WRITES: Flags = Flags(1 << 1);
    /// For `Serializable`: skip the commit-time observed-read validation.
    /// For `Reckless`: skip the verify-before-put check, i.e. write without
    /// first confirming the live value matches what this transaction last
    /// observed (the `WriteIso::Instant` vs. `InstantAtomic` distinction).
    pub const NO_CHECK: Flags = Flags(1 << 2);
    pub const RE_READ: Flags = Flags(1 << 3);
    pub const TX_IGNORE_READ: Flags = Flags(1 << 4);

    pub const NONE: Flags = Flags(0);

    pub fn has(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// Engine-level commit optimizations, independent of the per-transaction
/// `Flags` above. Chosen once per `Manager`, not per transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Optimizations(u8);

impl Optimizations {
    /// Allow a shared (rather than exclusive) commit lock when exactly one
    /// table is touched by the transaction.
    pub const CONCURRENT_COMMIT: Optimizations = Optimizations(1 << 0);
    /// Wrap the commit-phase apply in a native per-table KV transaction.
    pub const USE_TRANSACTION: Optimizations = Optimizations(1 << 1);

    pub const NONE: Optimizations = Optimizations(0);

    pub fn has(self, other: Optimizations) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Optimizations {
    type Output = Optimizations;
    fn bitor(self, rhs: Optimizations) -> Optimizations {
        Optimizations(self.0 | rhs.0)
    }
}

/// Read isolation requested by the caller of `Manager::begin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadIso {
    /// Reads are stable for the transaction's lifetime via an engine
    /// snapshot.
    Snapshot,
    /// Reads are stable for the transaction's lifetime via a cache of
    /// first-observed values, without a snapshot.
    Repeatable,
    /// No repeatability guarantee; every read goes to the live table.
    Any,
}

/// Write isolation requested by the caller of `Manager::begin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteIso {
    /// Buffered writes, validated against observed reads at commit.
    Checked,
    /// Buffered writes, committed without conflict checks.
    Commit,
    /// Immediate writes, verified against the current value before each
    /// put (reckless / verify-before-put).
    InstantAtomic,
    /// Immediate writes with no verification.
    Instant,
    /// No writes permitted.
    Disabled,
}

/// The overlay strategy selected for a `(ReadIso, WriteIso)` pair, per the
/// mapping table in spec §4.1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    ReadOnly,
    Direct,
    Snapshot,
    Reckless,
    Serializable,
}

/// Transliteration of `original_source/lstore/txnman.go`'s
/// `txManager.StartTx` switch: the authoritative mapping from
/// `(ReadIso, WriteIso)` to a strategy plus the flags that strategy's
/// overlays should be constructed with.
pub fn resolve(read: ReadIso, write: WriteIso) -> (Strategy, Flags) {
    let mut f = Flags::NONE;
    let strategy = match write {
        WriteIso::Checked => {
            match read {
                ReadIso::Snapshot => {}
                ReadIso::Repeatable => f |= Flags::NO_SNAPSHOT,
                ReadIso::Any => f |= Flags::NO_SNAPSHOT | Flags::RE_READ,
            }
            Strategy::Serializable
        }
        WriteIso::Commit => {
            match read {
                ReadIso::Snapshot => f |= Flags::TX_IGNORE_READ,
                ReadIso::Repeatable => f |= Flags::NO_SNAPSHOT | Flags::NO_CHECK,
                // TX_IGNORE_READ has the same effect as NO_CHECK | RE_READ.
                ReadIso::Any => f |= Flags::NO_SNAPSHOT | Flags::TX_IGNORE_READ,
            }
            Strategy::Serializable
        }
        WriteIso::InstantAtomic => {
            match read {
                ReadIso::Snapshot => {}
                ReadIso::Repeatable => f |= Flags::NO_SNAPSHOT,
                ReadIso::Any => f |= Flags::NO_SNAPSHOT | Flags::RE_READ,
            }
            Strategy::Reckless
        }
        WriteIso::Instant => match read {
            ReadIso::Snapshot => {
                f |= Flags::NO_CHECK;
                Strategy::Reckless
            }
            ReadIso::Repeatable => {
                f |= Flags::NO_SNAPSHOT | Flags::NO_CHECK;
                Strategy::Reckless
            }
            ReadIso::Any => Strategy::Direct,
        },
        WriteIso::Disabled => match read {
            ReadIso::Snapshot => Strategy::Snapshot,
            ReadIso::Repeatable => {
                f |= Flags::NO_SNAPSHOT | Flags::DISCARD_WRITES;
                Strategy::Serializable
            }
            ReadIso::Any => Strategy::ReadOnly,
        },
    };
    (strategy, f)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_the_authoritative_mapping_table() {
        assert_eq!(resolve(ReadIso::Snapshot, WriteIso::Checked).0, Strategy::Serializable);
        assert_eq!(resolve(ReadIso::Any, WriteIso::Checked).1, Flags::NO_SNAPSHOT | Flags::RE_READ);
        assert_eq!(resolve(ReadIso::Snapshot, WriteIso::InstantAtomic).0, Strategy::Reckless);
        assert_eq!(resolve(ReadIso::Any, WriteIso::Instant).0, Strategy::Direct);
        assert_eq!(resolve(ReadIso::Snapshot, WriteIso::Disabled).0, Strategy::Snapshot);
        assert_eq!(resolve(ReadIso::Any, WriteIso::Disabled).0, Strategy::ReadOnly);
        let (s, f) = resolve(ReadIso::Repeatable, WriteIso::Disabled);
        assert_eq!(s, Strategy::Serializable);
        assert!(f.has(Flags::DISCARD_WRITES));
    }

    #[test]
    fn instant_and_instant_atomic_differ_by_no_check() {
        let (s1, f1) = resolve(ReadIso::Snapshot, WriteIso::Instant);
        let (s2, f2) = resolve(ReadIso::Snapshot, WriteIso::InstantAtomic);
        assert_eq!(s1, Strategy::Reckless);
        assert_eq!(s2, Strategy::Reckless);
        assert!(f1.has(Flags::NO_CHECK));
        assert!(!f2.has(Flags::NO_CHECK));
    }
}
