use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result},
};
use thiserror::Error;

use crate::sequence::{SeqNum, seq_num::SeqNumRangeInclusiveIterator};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SequenceRange {
    start: SeqNum,
    end: Option<SeqNum>,
}

impl SequenceRange {
    fn single(num: SeqNum) -> Self {
        Self {
            start: num,
            end: None,
        }
    }

    fn range(start: SeqNum, end: SeqNum) -> Self {
        debug_assert!(start <= end);
        if start == end {
            Self::single(start)
        } else {
            Self {
                start,
                end: Some(end),
            }
        }
    }

    fn iter(&self) -> SeqNumRangeInclusiveIterator {
        self.start.range_inclusive(self.end())
    }

    fn end(&self) -> SeqNum {
        self.end.unwrap_or(self.start)
    }

    fn len(&self) -> usize {
        let span = u32::from(self.end()) - u32::from(self.start);
        usize::try_from(span).map_or(usize::MAX, |span| span.saturating_add(1))
    }
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(to) = self.end {
            write!(f, "{}:{}", self.start, to)
        } else {
            write!(f, "{}", self.start)
        }
    }
}

#[derive(Debug, Error, Default)]
#[error("No numbers in sequence set")]
pub struct EmptySetError {}

#[derive(Default, Debug, PartialEq, Clone)]
pub struct SequenceSetBuilder {
    nums: BTreeSet<SeqNum>,
}

impl SequenceSetBuilder {
    pub fn add(&mut self, num: SeqNum) {
        self.nums.insert(num);
    }

    pub fn build(self) -> std::result::Result<SequenceSet, EmptySetError> {
        let mut sorted_nums = self.nums.into_iter();

        let Some(first_num) = sorted_nums.next() else {
            return Err(EmptySetError {});
        };
        let mut ranges = Vec::new();
        let mut current_range = SequenceRange::single(first_num);

        for num in sorted_nums {
            if num == current_range.end() + 1 {
                current_range.end = Some(num);
            } else {
                ranges.push(current_range);
                current_range = SequenceRange::single(num);
            }
        }

        ranges.push(current_range);

        Ok(SequenceSet { ranges })
    }
}

impl FromIterator<SeqNum> for SequenceSetBuilder {
    fn from_iter<T: IntoIterator<Item = SeqNum>>(iter: T) -> Self {
        let mut builder = Self::default();
        for num in iter {
            builder.add(num);
        }
        builder
    }
}

/// Non-empty IMAP sequence set such as `3:5,12,14:15`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SequenceSet {
    ranges: Vec<SequenceRange>,
}

impl SequenceSet {
    pub fn range(start: SeqNum, end: SeqNum) -> Self {
        Self {
            ranges: vec![SequenceRange::range(start, end)],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SeqNum> {
        self.ranges.iter().flat_map(SequenceRange::iter)
    }

    /// Number of messages addressed by this set.
    pub fn len(&self) -> usize {
        self.ranges.iter().map(SequenceRange::len).sum()
    }

    #[cfg(test)]
    pub fn contains(&self, num: SeqNum) -> bool {
        self.ranges
            .iter()
            .any(|range| range.start <= num && num <= range.end())
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut ranges = self.ranges.iter();
        if let Some(first) = ranges.next() {
            write!(f, "{first}")?;
        }
        for range in ranges {
            write!(f, ",{range}")?;
        }

        Ok(())
    }
}
