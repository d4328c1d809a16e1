//! Half-open ranges over text positions.
//!
//! An [`Interval`] is the primitive every selection, edit and concealment is
//! built from. It covers the character positions `beg..end`; an interval with
//! `beg == end` is empty and marks a position between two characters.
//!
//! ```text
//! "hello world"
//!  [   )           Interval::new(0, 4)  -> "hell"
//!       |          Interval::point(5)   -> ""
//! ```
//!
//! Intervals order lexicographically on `(beg, end)`, which is the order a
//! selection keeps its members in.
//!
//! # Error Handling
//!
//! Constructing an inverted interval through [`Interval::new`] is a
//! programming error and panics. Fallible construction goes through
//! [`Interval::try_new`]. Subtraction that would leave two disjoint pieces
//! fails with [`IntervalError::NonContiguous`] instead of picking a side.

use std::{
  cmp::{
    max,
    min,
  },
  fmt,
};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntervalError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntervalError {
  #[error("invalid interval: start {beg} is after end {end}")]
  Inverted { beg: usize, end: usize },
  #[error("subtracting {subtrahend} from {minuend} leaves a non-contiguous remainder")]
  NonContiguous {
    minuend:    Interval,
    subtrahend: Interval,
  },
}

/// Half open interval: `[beg, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
  beg: usize,
  end: usize,
}

impl Interval {
  /// # Panics
  ///
  /// Panics when `beg > end`.
  #[inline]
  #[track_caller]
  pub fn new(beg: usize, end: usize) -> Self {
    assert!(beg <= end, "invalid interval: start {beg} is after end {end}");
    Self { beg, end }
  }

  pub fn try_new(beg: usize, end: usize) -> Result<Self> {
    if beg > end {
      return Err(IntervalError::Inverted { beg, end });
    }
    Ok(Self { beg, end })
  }

  #[inline]
  pub const fn point(pos: usize) -> Self {
    Self { beg: pos, end: pos }
  }

  #[inline]
  pub const fn beg(&self) -> usize {
    self.beg
  }

  #[inline]
  pub const fn end(&self) -> usize {
    self.end
  }

  #[inline]
  pub const fn len(&self) -> usize {
    self.end - self.beg
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.beg == self.end
  }

  #[inline]
  pub fn contains(&self, pos: usize) -> bool {
    self.beg <= pos && pos < self.end
  }

  #[inline]
  pub fn contains_interval(&self, other: &Self) -> bool {
    self.beg <= other.beg && other.end <= self.end
  }

  /// Check if two intervals overlap. Empty intervals overlap anything that
  /// starts at the same position or strictly contains them.
  #[inline]
  pub fn overlaps(&self, other: &Self) -> bool {
    self.beg == other.beg || (self.end > other.beg && other.end > self.beg)
  }

  /// Overlapping or adjacent; the condition under which two members of a
  /// selection are merged.
  #[inline]
  pub fn touches(&self, other: &Self) -> bool {
    self.beg <= other.end && other.beg <= self.end
  }

  /// Smallest interval covering both.
  #[inline]
  #[must_use]
  pub fn hull(&self, other: &Self) -> Self {
    Self {
      beg: min(self.beg, other.beg),
      end: max(self.end, other.end),
    }
  }

  pub fn intersection(&self, other: &Self) -> Option<Self> {
    let beg = max(self.beg, other.beg);
    let end = min(self.end, other.end);
    (beg <= end).then_some(Self { beg, end })
  }

  /// Clip both ends into `[lo, hi]`.
  #[inline]
  #[must_use]
  pub fn clip(&self, lo: usize, hi: usize) -> Self {
    debug_assert!(lo <= hi);
    Self {
      beg: self.beg.clamp(lo, hi),
      end: self.end.clamp(lo, hi),
    }
  }

  /// Shift both ends by `delta` positions towards the end of the text.
  #[inline]
  #[must_use]
  pub fn shift(&self, delta: usize) -> Self {
    Self {
      beg: self.beg + delta,
      end: self.end + delta,
    }
  }

  /// The part of `self` not covered by `other`.
  ///
  /// When `other` covers `self` completely the result is the empty interval
  /// at `self.beg()`. When `other` lies strictly inside `self` the remainder
  /// is two disjoint pieces and an error is returned.
  pub fn difference(&self, other: &Self) -> Result<Self> {
    if other.is_empty() || other.end <= self.beg || self.end <= other.beg {
      return Ok(*self);
    }
    if other.beg <= self.beg && self.end <= other.end {
      return Ok(Self::point(self.beg));
    }
    if other.beg <= self.beg {
      return Ok(Self {
        beg: other.end,
        end: self.end,
      });
    }
    if self.end <= other.end {
      return Ok(Self {
        beg: self.beg,
        end: other.beg,
      });
    }
    Err(IntervalError::NonContiguous {
      minuend:    *self,
      subtrahend: *other,
    })
  }
}

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.beg, self.end)
  }
}

impl From<Interval> for std::ops::Range<usize> {
  fn from(interval: Interval) -> Self {
    interval.beg..interval.end
  }
}

impl TryFrom<std::ops::Range<usize>> for Interval {
  type Error = IntervalError;

  fn try_from(range: std::ops::Range<usize>) -> Result<Self> {
    Self::try_new(range.start, range.end)
  }
}
