//! Contiguous splitting of the trapezoidal interior `1..=n-1` into task
//! ranges.
//!
//! The endpoints `0` and `n` are never part of a range; the integrator
//! weights them separately. Each of the `num_tasks` ranges gets
//! `(n - 1) / num_tasks` indices and the last one also absorbs the
//! truncation remainder. When there are fewer interior points than tasks,
//! the leading ranges come out empty (`start > end`) and contribute nothing.

use crate::error::{Error, Result};
use core::iter::FusedIterator;
use core::ops::RangeInclusive;

/// An inclusive range of sample indices handled by a single task.
///
/// A range with `start > end` is empty. Empty ranges are legal and sum to
/// zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkRange {
    pub start: usize,
    pub end: usize,
}

impl WorkRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of indices covered by the range.
    pub const fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// The covered indices. Yields nothing for an empty range.
    pub const fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Splits the interior indices of an `n`-interval grid into `num_tasks`
/// ranges.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `n` or `num_tasks` is zero.
///
/// # Example
/// ```
/// use trapezoid::{WorkRange, partition};
///
/// let ranges: Vec<_> = partition(10, 4).unwrap().collect();
/// assert_eq!(
///     ranges,
///     [
///         WorkRange::new(1, 2),
///         WorkRange::new(3, 4),
///         WorkRange::new(5, 6),
///         WorkRange::new(7, 9),
///     ]
/// );
/// ```
pub fn partition(n: usize, num_tasks: usize) -> Result<Partition> {
    if n == 0 {
        return Err(Error::invalid_config("n must be greater than 0"));
    }
    if num_tasks == 0 {
        return Err(Error::invalid_config("num_tasks must be greater than 0"));
    }
    Ok(Partition {
        last: n - 1,
        num_tasks,
        block: (n - 1) / num_tasks,
        next: 0,
    })
}

/// Iterator over the [`WorkRange`]s produced by [`partition`].
///
/// Always yields exactly `num_tasks` ranges, in ascending index order.
#[derive(Clone, Debug)]
pub struct Partition {
    last: usize,
    num_tasks: usize,
    block: usize,
    next: usize,
}

impl Partition {
    pub const fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    /// Indices per range before the remainder is added to the last one.
    pub const fn block_size(&self) -> usize {
        self.block
    }
}

impl Iterator for Partition {
    type Item = WorkRange;

    fn next(&mut self) -> Option<WorkRange> {
        if self.next == self.num_tasks {
            return None;
        }
        let task = self.next;
        self.next += 1;

        let start = task * self.block + 1;
        let end = if self.next == self.num_tasks {
            self.last
        } else {
            (task + 1) * self.block
        };
        Some(WorkRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_tasks - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Partition {}

impl FusedIterator for Partition {}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(n: usize, num_tasks: usize) -> Vec<usize> {
        partition(n, num_tasks)
            .unwrap()
            .flat_map(|r| r.indices())
            .collect()
    }

    #[test]
    fn last_range_absorbs_remainder() {
        let ranges: Vec<_> = partition(11, 3).unwrap().collect();
        assert_eq!(
            ranges,
            [
                WorkRange::new(1, 3),
                WorkRange::new(4, 6),
                WorkRange::new(7, 10),
            ]
        );
    }

    #[test]
    fn covers_interior_exactly_once() {
        for n in 2..200 {
            for num_tasks in 1..n {
                let indices = covered(n, num_tasks);
                let expected: Vec<_> = (1..n).collect();
                assert_eq!(indices, expected, "n = {n}, num_tasks = {num_tasks}");
            }
        }
    }

    #[test]
    fn yields_exactly_num_tasks_ranges() {
        for (n, num_tasks) in [(1, 1), (2, 7), (100, 3), (1_000_000, 64)] {
            let p = partition(n, num_tasks).unwrap();
            assert_eq!(p.num_tasks(), num_tasks);
            assert_eq!(p.len(), num_tasks);
            assert_eq!(p.count(), num_tasks);
        }
    }

    #[test]
    fn more_tasks_than_interior_points() {
        let ranges: Vec<_> = partition(4, 8).unwrap().collect();
        assert_eq!(ranges.len(), 8);
        assert!(ranges[..7].iter().all(WorkRange::is_empty));
        assert_eq!(ranges[7], WorkRange::new(1, 3));
        assert_eq!(covered(4, 8), [1, 2, 3]);
    }

    #[test]
    fn single_interval_has_no_interior() {
        let ranges: Vec<_> = partition(1, 1).unwrap().collect();
        assert_eq!(ranges, [WorkRange::new(1, 0)]);
        assert!(ranges[0].is_empty());
        assert_eq!(ranges[0].len(), 0);
        assert_eq!(ranges[0].indices().count(), 0);
    }

    #[test]
    fn deterministic() {
        let a: Vec<_> = partition(12_345, 17).unwrap().collect();
        let b: Vec<_> = partition(12_345, 17).unwrap().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_zero_inputs() {
        assert!(matches!(partition(0, 4), Err(Error::InvalidConfig { .. })));
        assert!(matches!(partition(10, 0), Err(Error::InvalidConfig { .. })));
    }
}
