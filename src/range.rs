//! Near-equal partitioning of an index domain into resumable intervals.

use std::fmt;

use crate::error::{GlitchError, Result};

/// An inclusive index interval.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IntRange {
    pub lower: usize,
    pub upper: usize,
}

impl IntRange {
    pub fn new(lower: usize, upper: usize) -> IntRange {
        IntRange { lower, upper }
    }

    /// Number of indices covered; zero when inverted.
    pub fn len(self) -> usize {
        if self.upper < self.lower {
            0
        } else {
            self.upper - self.lower + 1
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn contains(self, index: usize) -> bool {
        self.lower <= index && index <= self.upper
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.lower, self.upper)
    }
}

/// Splits a domain into `count` contiguous intervals whose lengths differ
/// by at most one, and hands them out one call at a time in a stable
/// cyclic order.
#[derive(Clone, Debug)]
pub struct RangeManager {
    domain: IntRange,
    intervals: Vec<IntRange>,
    count: usize,
    cursor: usize,
}

impl RangeManager {
    /// Partitions `[0, domain_len)` into `count` intervals.
    pub fn new(domain_len: usize, count: usize) -> Result<RangeManager> {
        if domain_len == 0 {
            return Err(GlitchError::EmptyDomain);
        }
        RangeManager::over(IntRange::new(0, domain_len - 1), count)
    }

    /// Partitions an arbitrary inclusive domain into `count` intervals.
    pub fn over(domain: IntRange, count: usize) -> Result<RangeManager> {
        let intervals = build_intervals(domain, count)?;
        Ok(RangeManager {
            domain,
            intervals,
            count,
            cursor: 0,
        })
    }

    pub fn domain(&self) -> IntRange {
        self.domain
    }

    pub fn intervals(&self) -> &[IntRange] {
        &self.intervals
    }

    pub fn interval_count(&self) -> usize {
        self.count
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.intervals.len()
    }

    /// The next interval of the current cycle, advancing the cursor.
    pub fn next_interval(&mut self) -> Option<IntRange> {
        let interval = self.intervals.get(self.cursor).copied();
        if interval.is_some() {
            self.cursor += 1;
        }
        interval
    }

    /// Rewinds to the first interval, starting a new cycle.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Re-partitions the same domain into `count` intervals and rewinds.
    pub fn set_interval_count(&mut self, count: usize) -> Result<()> {
        self.intervals = build_intervals(self.domain, count)?;
        self.count = count;
        self.cursor = 0;
        Ok(())
    }

    /// Re-partitions a new domain into the same interval count and rewinds.
    pub fn set_range(&mut self, domain: IntRange) -> Result<()> {
        self.intervals = build_intervals(domain, self.count)?;
        self.domain = domain;
        self.cursor = 0;
        Ok(())
    }
}

/// Accumulated integer division spreads the remainder across the sequence
/// instead of piling it onto the last interval.
fn build_intervals(domain: IntRange, count: usize) -> Result<Vec<IntRange>> {
    let len = domain.len();
    if len == 0 {
        return Err(GlitchError::EmptyDomain);
    }
    if count == 0 || count > len {
        return Err(GlitchError::BadIntervalCount { count, domain: len });
    }
    let mut intervals = Vec::with_capacity(count);
    let mut lower = domain.lower;
    for k in 1..=count {
        let upper = domain.lower + k * len / count - 1;
        intervals.push(IntRange::new(lower, upper));
        lower = upper + 1;
    }
    Ok(intervals)
}
