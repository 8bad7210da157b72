use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    sync::{Mutex, PoisonError},
};

use log::trace;

use crate::sequence::{SeqNum, SequenceSet, SequenceSetBuilder};

/// Sequence numbers slated for deletion within one operation.
///
/// Insert-only: the set never shrinks, so concurrent writers can only ever add to it. Shared
/// between match tasks behind an `Arc`.
#[derive(Debug, Default)]
pub struct DeletionSet {
    nums: Mutex<BTreeSet<SeqNum>>,
}

impl DeletionSet {
    pub fn accumulate(&self, seq: SeqNum) {
        let inserted = self.lock().insert(seq);
        if inserted {
            trace!("marked message {seq} for deletion");
        }
    }

    /// Adds `first..=last`. Used by unconditional cleanup, which needs no per-message evaluation.
    pub fn add_full_range(&self, first: u32, last: u32) {
        let (Ok(first), Ok(last)) = (SeqNum::try_from(first), SeqNum::try_from(last)) else {
            return;
        };
        self.lock().extend(first.range_inclusive(last));
    }

    #[cfg(test)]
    pub fn contains(&self, seq: SeqNum) -> bool {
        self.lock().contains(&seq)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn to_range_encoding(&self) -> RangeEncoding {
        let builder: SequenceSetBuilder = self.lock().iter().copied().collect();
        builder
            .build()
            .map_or(RangeEncoding::Empty, RangeEncoding::Ranges)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<SeqNum>> {
        // inserts cannot leave the set half-updated, so a poisoned lock is still consistent
        self.nums.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What gets handed to STORE. An empty deletion set is spelled out explicitly so nothing has to
/// issue a command that would not change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEncoding {
    Empty,
    Ranges(SequenceSet),
}

#[cfg(test)]
impl RangeEncoding {
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Ranges(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Display for RangeEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "(none)"),
            Self::Ranges(set) => set.fmt(f),
        }
    }
}
