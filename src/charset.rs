// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! An ordered set of disjoint, inclusive code point ranges.
//!
//! `CharSet` is the payload of a charset token and the currency of the
//! partitioning step: the tokenizer builds one per literal or bracket
//! expression, the parser interns them into the charset map, and the
//! generator partitions the interned sets into the equivalence classes
//! that become the columns of the transition table.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use itertools::Itertools;

use unicode;

/// The largest code point in the alphabet.
pub const MAX_CODE_POINT: u32 = 0x0010_FFFF;

/// An inclusive range of code points.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Range {
    start: u32,
    end: u32,
}

impl Range {
    /// Creates a new range of code points.
    ///
    /// If `end` is less than the `start` then they will be reversed.
    pub fn new(start: u32, end: u32) -> Range {
        if end < start {
            Range {
                start: end,
                end: start,
            }
        } else {
            Range { start, end }
        }
    }

    /// The start of the range. The start is included in the range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// The end of the range. The end is included in the range.
    pub fn end(&self) -> u32 {
        self.end
    }

    pub(crate) fn coalesce(self, other: Range) -> Result<Range, (Range, Range)> {
        let (anchor, comp) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };

        if comp.start <= anchor.end.saturating_add(1) {
            Ok(Range::new(anchor.start, anchor.end.max(comp.end)))
        } else {
            Err((self, other))
        }
    }
}

/// An ordered set of disjoint, non-adjacent, inclusive code point ranges.
///
/// The `negatable` flag records that the set came from a negated bracket
/// expression. It is provenance only: it does not participate in the
/// equality or ordering used to intern sets in the charset map.
#[derive(Debug, Clone, Default)]
pub struct CharSet {
    ranges: Vec<Range>,
    negatable: bool,
}

// The ranges vector is kept sorted by start, with every range satisfying
// start <= end and consecutive ranges satisfying next.start > prev.end + 1.
// Normalization happens in from_iter (sort then coalesce) and every other
// constructor and operation goes through it or preserves the invariant
// directly.
impl CharSet {
    /// Creates the empty set.
    pub fn empty() -> CharSet {
        CharSet::default()
    }

    /// Creates a set holding the single code point `c`.
    pub fn single(c: u32) -> CharSet {
        CharSet {
            ranges: vec![Range::new(c, c)],
            negatable: false,
        }
    }

    /// Creates the set holding every code point in the alphabet.
    pub fn any() -> CharSet {
        CharSet {
            ranges: vec![Range::new(0, MAX_CODE_POINT)],
            negatable: false,
        }
    }

    /// Checks whether the set holds no code points.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Checks whether the set holds the code point `c`.
    pub fn contains(&self, c: u32) -> bool {
        self.ranges
            .binary_search_by(|range| {
                if c < range.start {
                    Ordering::Greater
                } else if c > range.end {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The ranges of the set in increasing order.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// The largest code point in the set, `None` for the empty set.
    pub fn max_code_point(&self) -> Option<u32> {
        self.ranges.last().map(|range| range.end)
    }

    /// Whether the set came from a negated bracket expression.
    pub fn negatable(&self) -> bool {
        self.negatable
    }

    /// Adds the range `[start, end]` to the set.
    pub fn insert(&mut self, start: u32, end: u32) {
        let negatable = self.negatable;
        let mut merged: CharSet = self
            .ranges
            .drain(..)
            .chain(Some(Range::new(start, end)))
            .collect();
        merged.negatable = negatable;
        *self = merged;
    }

    /// Replaces the set with its complement over the whole alphabet and
    /// marks it negatable.
    pub fn negate(&mut self) {
        let mut complement = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;

        for range in &self.ranges {
            if range.start > next {
                complement.push(Range::new(next, range.start - 1));
            }
            match range.end.checked_add(1) {
                Some(n) => next = n,
                None => {
                    next = MAX_CODE_POINT + 1;
                    break;
                }
            }
        }

        if next <= MAX_CODE_POINT {
            complement.push(Range::new(next, MAX_CODE_POINT));
        }

        self.ranges = complement;
        self.negatable = true;
    }

    /// Adds every code point of `other` to the set.
    pub fn union(&mut self, other: &CharSet) {
        let negatable = self.negatable;
        let mut merged: CharSet = self
            .ranges
            .drain(..)
            .chain(other.ranges.iter().cloned())
            .collect();
        merged.negatable = negatable;
        *self = merged;
    }

    /// The set of code points held by both `self` and `other`.
    pub fn intersect(&self, other: &CharSet) -> CharSet {
        let mut out = Vec::new();
        let mut lhs = self.ranges.iter().peekable();
        let mut rhs = other.ranges.iter().peekable();

        while let (Some(&&l), Some(&&r)) = (lhs.peek(), rhs.peek()) {
            let start = l.start.max(r.start);
            let end = l.end.min(r.end);

            if start <= end {
                out.push(Range::new(start, end));
            }

            if l.end <= r.end {
                lhs.next();
            } else {
                rhs.next();
            }
        }

        CharSet {
            ranges: out,
            negatable: false,
        }
    }

    /// Removes every code point of `other` from the set.
    pub fn remove(&mut self, other: &CharSet) {
        let mut out = Vec::new();

        for &range in &self.ranges {
            let mut start = range.start;
            let mut dead = false;

            for &cut in &other.ranges {
                if cut.end < start {
                    continue;
                }
                if cut.start > range.end {
                    break;
                }
                if cut.start > start {
                    out.push(Range::new(start, cut.start - 1));
                }
                match cut.end.checked_add(1) {
                    Some(n) if n <= range.end => start = n,
                    _ => {
                        dead = true;
                        break;
                    }
                }
            }

            if !dead && start <= range.end {
                out.push(Range::new(start, range.end));
            }
        }

        self.ranges = out;
    }

    /// Extends the set with the case equivalents of every code point it
    /// holds, using the bundled fold tables.
    pub fn case_fold(&mut self) {
        let mut extra = Vec::new();

        for &range in &self.ranges {
            unicode::fold_range(range.start, range.end, &mut |start, end| {
                extra.push(Range::new(start, end));
            });
        }

        let negatable = self.negatable;
        let mut merged: CharSet = self.ranges.drain(..).chain(extra).collect();
        merged.negatable = negatable;
        *self = merged;
    }
}

impl FromIterator<Range> for CharSet {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Range>,
    {
        CharSet {
            ranges: iter
                .into_iter()
                .sorted_by_key(|range| range.start)
                .into_iter()
                .coalesce(|prev, curr| prev.coalesce(curr))
                .collect(),
            negatable: false,
        }
    }
}

impl PartialEq for CharSet {
    fn eq(&self, other: &CharSet) -> bool {
        self.ranges == other.ranges
    }
}

impl Eq for CharSet {}

impl PartialOrd for CharSet {
    fn partial_cmp(&self, other: &CharSet) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CharSet {
    fn cmp(&self, other: &CharSet) -> Ordering {
        self.ranges.cmp(&other.ranges)
    }
}

impl Hash for CharSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ranges.hash(state);
    }
}
