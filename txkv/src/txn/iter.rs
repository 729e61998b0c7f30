//! The merged iterator: an ordered union of a base store iterator with a
//! sorted in-memory pending-write list, hiding tombstones. Grounded in
//! `original_source/lstore/txnman.go`'s `uIterator`/`uIteratorAug`, modeled
//! explicitly as the four-state machine spec §4.3 describes rather than the
//! Go source's numeric `state` field.

use crate::error::CResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Active,
    Drain,
    Done,
}

/// Which side a yielded entry came from. The overlay layer uses this to
/// decide whether to consult/populate the observed-read cache (`rm`):
/// `PendingWrite` entries never touch `rm`, `Base` entries do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    PendingWrite,
    Base,
}

/// One pending key with its write (`Some(value)`) or tombstone (`None`).
pub type Pending = (Vec<u8>, Option<Vec<u8>>);

/// Merges a base key/value iterator (assumed already sorted ascending by
/// key, as every `Engine::scan` is) with a sorted list of pending writes,
/// skipping tombstones. Keys tie-break to the pending side, which also
/// shadows (consumes without emitting twice) any base entry under the same
/// key.
pub struct MergedIter<I> {
    base: std::iter::Peekable<I>,
    pending: std::vec::IntoIter<Pending>,
    pending_head: Option<Pending>,
    state: State,
}

impl<I> MergedIter<I>
where
    I: Iterator<Item = CResult<(Vec<u8>, Vec<u8>)>>,
{
    /// `pending` must already be sorted ascending by key (the overlay keeps
    /// its pending-key list sorted lazily and sorts before handing out an
    /// iterator, mirroring `uTableSR.Iter`'s `sort.Slice` call).
    pub fn new(base: I, pending: Vec<Pending>) -> Self {
        let mut pending = pending.into_iter();
        let pending_head = pending.next();
        MergedIter { base: base.peekable(), pending, pending_head, state: State::Start }
    }

    fn take_pending(&mut self) -> Pending {
        let next = self.pending.next();
        std::mem::replace(&mut self.pending_head, next).unwrap()
    }

    /// Returns the next visible (non-tombstone) entry, or `None` at
    /// exhaustion (state `Done`).
    pub fn next(&mut self) -> CResult<Option<(Vec<u8>, Vec<u8>, Source)>> {
        loop {
            if self.state == State::Done {
                return Ok(None);
            }

            let base_key = match self.base.peek() {
                Some(Ok((k, _))) => Some(k.clone()),
                Some(Err(_)) => {
                    // Propagate the base iterator's error, consuming it.
                    let err = self.base.next().unwrap().unwrap_err();
                    return Err(err);
                }
                None => None,
            };

            let entry = match (&self.pending_head, &base_key) {
                (None, None) => {
                    self.state = State::Done;
                    return Ok(None);
                }
                (Some(_), None) => {
                    self.state = State::Drain;
                    let (k, v) = self.take_pending();
                    (k, v, Source::PendingWrite)
                }
                (None, Some(_)) => {
                    self.state = State::Active;
                    let (k, v) = self.base.next().unwrap()?;
                    (k, Some(v), Source::Base)
                }
                (Some((pk, _)), Some(bk)) => {
                    if pk <= bk {
                        self.state = State::Active;
                        if pk == bk {
                            self.base.next(); // pending shadows the base entry
                        }
                        let (k, v) = self.take_pending();
                        (k, v, Source::PendingWrite)
                    } else {
                        self.state = State::Active;
                        let (k, v) = self.base.next().unwrap()?;
                        (k, Some(v), Source::Base)
                    }
                }
            };

            match entry {
                (key, Some(value), source) => return Ok(Some((key, value, source))),
                (_, None, _) => continue, // tombstone: skip and keep looking
            }
        }
    }
}
