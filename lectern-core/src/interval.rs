//! Time intervals in milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// An interval between two points in time.
///
/// [`contains`](Interval::contains) treats the interval as half-open
/// `[start, end)`, [`encloses`](Interval::encloses) as closed `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval<T> {
    start: T,
    end: T,
}

impl<T> Interval<T>
where
    T: Copy + PartialOrd + Sub<Output = T>,
{
    /// Create an interval, swapping the bounds if they are reversed.
    pub fn new(start: T, end: T) -> Self {
        if start > end {
            Interval {
                start: end,
                end: start,
            }
        } else {
            Interval { start, end }
        }
    }

    pub fn start(&self) -> T {
        self.start
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn length(&self) -> T {
        self.end - self.start
    }

    /// `start <= value < end`
    pub fn contains(&self, value: T) -> bool {
        value >= self.start && value < self.end
    }

    /// `start <= value <= end`
    pub fn encloses(&self, value: T) -> bool {
        value >= self.start && value <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl Interval<i32> {
    /// Widen to the 64-bit millisecond domain used by audio streams.
    pub fn to_i64(&self) -> Interval<i64> {
        Interval::new(self.start as i64, self.end as i64)
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
