use std::{fmt::Display, num::NonZeroU32, ops::Add};

/// Position of a message inside the currently selected folder.
///
/// Only meaningful relative to the [`MailboxHandle`](crate::store::MailboxHandle) it was fetched
/// under. An EXPUNGE renumbers every message behind a removed one.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SeqNum(NonZeroU32);

impl SeqNum {
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    pub fn range_inclusive(self, end: Self) -> SeqNumRangeInclusiveIterator {
        SeqNumRangeInclusiveIterator::new(self, end)
    }
}

impl Add<u32> for SeqNum {
    type Output = SeqNum;

    fn add(self, rhs: u32) -> Self::Output {
        SeqNum(self.0.saturating_add(rhs))
    }
}

impl Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<u32> for SeqNum {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or("sequence numbers start at 1")
    }
}

impl From<SeqNum> for u32 {
    fn from(value: SeqNum) -> Self {
        value.0.get()
    }
}

pub struct SeqNumRangeInclusiveIterator {
    next: u32,
    end: u32,
    exhausted: bool,
}

impl SeqNumRangeInclusiveIterator {
    fn new(start: SeqNum, end: SeqNum) -> Self {
        Self {
            next: start.0.get(),
            end: end.0.get(),
            exhausted: start > end,
        }
    }
}

impl Iterator for SeqNumRangeInclusiveIterator {
    type Item = SeqNum;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = NonZeroU32::new(self.next)?;
        if self.next == self.end {
            self.exhausted = true;
        } else {
            self.next += 1;
        }

        Some(SeqNum(current))
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_seq_num_rejects_zero() {
        assert_err!(SeqNum::try_from(0));
        assert_eq!(1, u32::from(assert_ok!(SeqNum::try_from(1))));
    }

    #[rstest]
    #[case(1, 1, vec![1])]
    #[case(3, 6, vec![3, 4, 5, 6])]
    #[case(5, 4, vec![])]
    fn test_range_inclusive_yields_start_to_end(
        #[case] start: u32,
        #[case] end: u32,
        #[case] expected: Vec<u32>,
    ) {
        let start = assert_ok!(SeqNum::try_from(start));
        let end = assert_ok!(SeqNum::try_from(end));

        let nums: Vec<u32> = start.range_inclusive(end).map(u32::from).collect();

        assert_eq!(expected, nums);
    }

    #[rstest]
    fn test_range_inclusive_stops_at_max() {
        let max = assert_ok!(SeqNum::try_from(u32::MAX));

        assert_eq!(1, max.range_inclusive(max).count());
    }
}
