//! Multi-interval selections.
//!
//! A [`Selection`] is the addressing unit of every edit: an ordered set of
//! [`Interval`]s that all edits, selectors and views work against.
//!
//! # Normal Form
//!
//! Intervals are kept normalized:
//!
//! - Sorted by position
//! - Overlapping or adjacent intervals are merged, so two members are always
//!   separated by at least one unselected character
//! - Always at least one interval
//!
//! ```ignore
//! use the_core::interval::Interval;
//! use the_lib::selection::Selection;
//!
//! let selection = Selection::new([Interval::new(6, 8), Interval::new(2, 4)])?;
//! assert_eq!(selection.to_string(), "[(2, 4), (6, 8)]");
//!
//! let gaps = selection.complement(10).unwrap();
//! assert_eq!(gaps.to_string(), "[(0, 2), (4, 6), (8, 10)]");
//! ```
//!
//! Every operation returns a new value. Operations that can remove every
//! interval (`subtract`, `complement`) return `None` instead of an empty
//! selection; callers treat that as "no result" and leave the document alone.
//!
//! # Partitioning
//!
//! [`Selection::partition`] splits `[0, len)` into alternating selected and
//! unselected spans. Edits walk the partition to rewrite the selected spans
//! and copy everything else verbatim.
//!
//! # Error Handling
//!
//! Operations return [`Result<T, SelectionError>`]:
//!
//! - **EmptySelection** - Selection must have at least one interval
//! - **IndexOutOfBounds** - Accessed interval index doesn't exist
//! - **OutOfBounds** - An interval reaches past the end of the text

use std::{
  fmt,
  ops::Index,
};

use ropey::RopeSlice;
use smallvec::{
  SmallVec,
  smallvec,
};
use the_core::interval::Interval;
use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
  #[error("selection must contain at least one interval")]
  EmptySelection,
  #[error("interval index {index} out of bounds for selection of length {len}")]
  IndexOutOfBounds { index: usize, len: usize },
  #[error("interval {interval} is out of bounds for text of length {len}")]
  OutOfBounds { interval: Interval, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
  intervals: SmallVec<[Interval; 1]>,
}

impl Selection {
  /// Create a selection from arbitrary intervals, sorting and merging them
  /// into normal form.
  pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Result<Self> {
    Self::from_unsorted(intervals.into_iter().collect()).ok_or(SelectionError::EmptySelection)
  }

  #[inline]
  pub fn single(interval: Interval) -> Self {
    Self {
      intervals: smallvec![interval],
    }
  }

  #[inline]
  pub fn point(pos: usize) -> Self {
    Self::single(Interval::point(pos))
  }

  fn from_unsorted(mut intervals: SmallVec<[Interval; 1]>) -> Option<Self> {
    if intervals.is_empty() {
      return None;
    }
    intervals.sort_unstable();

    let mut merged: SmallVec<[Interval; 1]> = SmallVec::with_capacity(intervals.len());
    for interval in intervals {
      match merged.last_mut() {
        Some(last) if last.touches(&interval) => *last = last.hull(&interval),
        _ => merged.push(interval),
      }
    }

    Some(Self { intervals: merged })
  }

  #[inline]
  pub fn intervals(&self) -> &[Interval] {
    &self.intervals
  }

  #[inline]
  pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
    self.intervals.iter()
  }

  #[inline]
  #[allow(clippy::len_without_is_empty)]
  pub fn len(&self) -> usize {
    self.intervals.len()
  }

  #[inline]
  pub fn first(&self) -> Interval {
    self.intervals[0]
  }

  #[inline]
  pub fn last(&self) -> Interval {
    self.intervals[self.intervals.len() - 1]
  }

  #[inline]
  pub fn get(&self, index: usize) -> Option<Interval> {
    self.intervals.get(index).copied()
  }

  pub fn try_get(&self, index: usize) -> Result<Interval> {
    self.get(index).ok_or(SelectionError::IndexOutOfBounds {
      index,
      len: self.len(),
    })
  }

  /// Union with `other`, coalescing overlapping and adjacent intervals.
  #[must_use]
  pub fn add(&self, other: &Selection) -> Selection {
    self.add_intervals(other.iter().copied())
  }

  #[must_use]
  pub fn add_interval(&self, interval: Interval) -> Selection {
    self.add_intervals(std::iter::once(interval))
  }

  fn add_intervals(&self, other: impl Iterator<Item = Interval>) -> Selection {
    let mut intervals = self.intervals.clone();
    intervals.extend(other);
    // Never empty: `self` contributes at least one interval.
    Self::from_unsorted(intervals).unwrap_or_else(|| self.clone())
  }

  /// Remove the ranges covered by `other`. An interval with a subtracted
  /// range strictly inside it is split in two. Empty intervals are removed
  /// when they overlap a subtracted range.
  ///
  /// Returns `None` when nothing remains.
  pub fn subtract(&self, other: &Selection) -> Option<Selection> {
    self.subtract_intervals(other.intervals())
  }

  pub fn subtract_interval(&self, interval: Interval) -> Option<Selection> {
    self.subtract_intervals(&[interval])
  }

  fn subtract_intervals(&self, subtrahends: &[Interval]) -> Option<Selection> {
    let mut pieces: SmallVec<[Interval; 1]> = self.intervals.clone();
    for sub in subtrahends {
      pieces = pieces.into_iter().flat_map(|piece| cut(piece, sub)).collect();
    }
    Self::from_unsorted(pieces)
  }

  /// The gaps between the intervals, bounded by `[0, bound]`.
  ///
  /// Zero-length gaps at the very start or end are left out unless the
  /// adjacent interval is itself empty at that boundary. Returns `None` when
  /// the selection covers everything.
  pub fn complement(&self, bound: usize) -> Option<Selection> {
    let mut gaps: SmallVec<[Interval; 1]> = SmallVec::new();
    let mut prev_end = 0;
    let mut first = true;

    for interval in self.iter().filter(|interval| interval.beg() <= bound) {
      if interval.beg() > prev_end || (first && interval.is_empty()) {
        gaps.push(Interval::new(prev_end, interval.beg()));
      }
      prev_end = interval.end().min(bound);
      first = false;
    }

    let trailing_empty = self.last().is_empty() && self.last().end() == bound;
    if prev_end < bound || first || trailing_empty {
      gaps.push(Interval::new(prev_end, bound));
    }

    Self::from_unsorted(gaps)
  }

  pub fn intersects(&self, interval: &Interval) -> bool {
    self.iter().any(|own| own.overlaps(interval))
  }

  pub fn contains_pos(&self, pos: usize) -> bool {
    self.iter().any(|interval| interval.contains(pos))
  }

  /// Clip every interval into `[lo, hi]`, merging intervals that collapse
  /// onto each other.
  #[must_use]
  pub fn bound(&self, lo: usize, hi: usize) -> Selection {
    let clipped = self.iter().map(|interval| interval.clip(lo, hi)).collect();
    Self::from_unsorted(clipped).unwrap_or_else(|| Self::point(lo))
  }

  /// Check that every interval lies within a text of `len` characters.
  pub fn validate(&self, len: usize) -> Result<()> {
    let last = self.last();
    if last.end() > len {
      return Err(SelectionError::OutOfBounds {
        interval: last,
        len,
      });
    }
    Ok(())
  }

  /// Decompose `[0, len)` into alternating `(selected, interval)` spans with
  /// no gaps. Empty selected intervals are kept, since an edit inserts at
  /// them.
  pub fn partition(&self, len: usize) -> Result<Vec<(bool, Interval)>> {
    self.validate(len)?;

    let mut spans = Vec::with_capacity(self.len() * 2 + 1);
    let mut pos = 0;
    for &interval in self.iter() {
      if interval.beg() > pos {
        spans.push((false, Interval::new(pos, interval.beg())));
      }
      spans.push((true, interval));
      pos = interval.end();
    }
    if pos < len {
      spans.push((false, Interval::new(pos, len)));
    }

    Ok(spans)
  }

  /// The selected text of every interval, in order.
  pub fn content(&self, text: RopeSlice) -> Result<Vec<Tendril>> {
    self.validate(text.len_chars())?;
    Ok(
      self
        .iter()
        .map(|interval| fragment(text, *interval))
        .collect(),
    )
  }

  /// A single interval from the start of the first to the end of the last.
  #[must_use]
  pub fn join(&self) -> Selection {
    Self::single(Interval::new(self.first().beg(), self.last().end()))
  }

  /// The empty interval at the start of every interval.
  #[must_use]
  pub fn empty_before(&self) -> Selection {
    self.map_intervals(|interval| Interval::point(interval.beg()))
  }

  /// The empty interval at the end of every interval.
  #[must_use]
  pub fn empty_after(&self) -> Selection {
    self.map_intervals(|interval| Interval::point(interval.end()))
  }

  fn map_intervals(&self, f: impl Fn(&Interval) -> Interval) -> Selection {
    let mapped = self.iter().map(f).collect();
    Self::from_unsorted(mapped).unwrap_or_else(|| self.clone())
  }
}

/// Remove `sub` from `piece`, yielding the zero, one or two remains.
fn cut(piece: Interval, sub: &Interval) -> SmallVec<[Interval; 2]> {
  if piece.is_empty() {
    return if sub.overlaps(&piece) {
      SmallVec::new()
    } else {
      smallvec![piece]
    };
  }
  if sub.is_empty() || sub.end() <= piece.beg() || piece.end() <= sub.beg() {
    return smallvec![piece];
  }

  let mut remains = SmallVec::new();
  if sub.beg() > piece.beg() {
    remains.push(Interval::new(piece.beg(), sub.beg()));
  }
  if sub.end() < piece.end() {
    remains.push(Interval::new(sub.end(), piece.end()));
  }
  remains
}

pub(crate) fn fragment(text: RopeSlice, interval: Interval) -> Tendril {
  let mut fragment = Tendril::new();
  for chunk in text.slice(interval.beg()..interval.end()).chunks() {
    fragment.push_str(chunk);
  }
  fragment
}

impl From<Interval> for Selection {
  fn from(interval: Interval) -> Self {
    Self::single(interval)
  }
}

impl Index<usize> for Selection {
  type Output = Interval;

  #[track_caller]
  fn index(&self, index: usize) -> &Interval {
    &self.intervals[index]
  }
}

impl<'a> IntoIterator for &'a Selection {
  type Item = &'a Interval;
  type IntoIter = std::slice::Iter<'a, Interval>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl fmt::Display for Selection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (index, interval) in self.iter().enumerate() {
      if index > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{interval}")?;
    }
    f.write_str("]")
  }
}
