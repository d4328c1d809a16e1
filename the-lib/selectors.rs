//! Selectors: functions from a selection to a new selection.
//!
//! Every selector has the shape `(document, selection, mode) -> Option<Selection>`.
//! `None` means the selector found nothing to change and the caller should
//! leave the document alone; it is not an error.
//!
//! There are two kinds:
//!
//! - **Global** selectors look at the selection as a whole ([`everything`],
//!   [`join`], [`complement`], [`PatternSelector::global`]).
//! - **Local** selectors map each interval on its own
//!   ([`empty_before`], [`select_around`], [`PatternSelector::local`]).
//!
//! The [`SelectMode`] decides how pattern matches combine with the current
//! selection: replace it, extend it or cut the match out of it.
//!
//! ```ignore
//! let next = Builtin::NextWord.select(&doc, doc.selection(), doc.select_mode());
//! if let Some(selection) = next {
//!   doc.set_selection(selection)?;
//! }
//! ```

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use ropey::RopeSlice;
use the_core::interval::Interval;

use crate::{
  document::{
    self,
    Document,
  },
  mode::SelectMode,
  selection::Selection,
};

pub trait Selector {
  fn select(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection>;
}

impl<F> Selector for F
where
  F: Fn(&Document, &Selection, SelectMode) -> Option<Selection>,
{
  fn select(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection> {
    self(doc, selection, mode)
  }
}

/// Run `selector` against the document's selection and mode and store the
/// result. Returns `false` when the selector found nothing, leaving the
/// document untouched.
pub fn select(doc: &mut Document, selector: &dyn Selector) -> document::Result<bool> {
  let Some(selection) = selector.select(doc, doc.selection(), doc.select_mode()) else {
    return Ok(false);
  };
  doc.set_selection(selection)?;
  Ok(true)
}

/// Select the entire text.
pub fn everything(doc: &Document, _: &Selection, _: SelectMode) -> Option<Selection> {
  Some(Selection::single(Interval::new(0, doc.text().len_chars())))
}

/// Reduce the selection to its first interval.
pub fn single_interval(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Some(Selection::single(selection.first()))
}

/// Reduce the selection to an empty interval at its start.
pub fn empty(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Some(Selection::point(selection.first().beg()))
}

pub fn join(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Some(selection.join())
}

pub fn complement(doc: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  selection.complement(doc.text().len_chars())
}

pub fn empty_before(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Some(selection.empty_before())
}

pub fn empty_after(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Some(selection.empty_after())
}

const SURROUNDING_PAIRS: [(char, char); 6] = [
  ('{', '}'),
  ('[', ']'),
  ('(', ')'),
  ('<', '>'),
  ('\'', '\''),
  ('"', '"'),
];

/// Extend every interval to the smallest surrounding bracket or quote pair,
/// delimiters included. Intervals without a surrounding pair are dropped.
///
/// Nesting is not tracked: the nearest opening character before the interval
/// and the nearest closing character after it form the pair.
pub fn select_around(doc: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  let text = doc.text().slice(..);
  let around = selection.iter().filter_map(|interval| {
    SURROUNDING_PAIRS
      .iter()
      .filter_map(|&(open, close)| {
        let beg = find_backward(text, open, interval.beg())?;
        let end = find_forward(text, close, interval.end())?;
        Some(Interval::new(beg, end + 1))
      })
      .min_by_key(Interval::len)
  });
  Selection::new(around).ok()
}

fn find_forward(text: RopeSlice, ch: char, from: usize) -> Option<usize> {
  text
    .chars_at(from)
    .position(|c| c == ch)
    .map(|index| from + index)
}

fn find_backward(text: RopeSlice, ch: char, before: usize) -> Option<usize> {
  let mut chars = text.chars_at(before);
  let mut pos = before;
  while let Some(c) = chars.prev() {
    pos -= 1;
    if c == ch {
      return Some(pos);
    }
  }
  None
}

/// A selector driven by a regular expression.
///
/// A global pattern selector first selects every match touching the
/// selection; when that changes nothing it steps to the next match after the
/// selection (or before it, when reversed). A local pattern selector does
/// the same per interval and yields nothing unless every interval changes.
#[derive(Debug, Clone)]
pub struct PatternSelector {
  regex:       Regex,
  reverse:     bool,
  group:       usize,
  only_within: bool,
  local:       bool,
}

impl PatternSelector {
  pub fn global(pattern: &str) -> Result<Self, regex::Error> {
    Ok(Self::from_regex(Regex::new(pattern)?, false))
  }

  pub fn local(pattern: &str) -> Result<Self, regex::Error> {
    Ok(Self::from_regex(Regex::new(pattern)?, true))
  }

  fn from_regex(regex: Regex, local: bool) -> Self {
    Self {
      regex,
      reverse: false,
      group: 0,
      only_within: false,
      local,
    }
  }

  /// Search backwards from the selection.
  #[must_use]
  pub fn reversed(mut self) -> Self {
    self.reverse = true;
    self
  }

  /// Select capture group `group` instead of the whole match.
  #[must_use]
  pub fn group(mut self, group: usize) -> Self {
    self.group = group;
    self
  }

  /// Only accept matches inside the interval being changed.
  #[must_use]
  pub fn only_within(mut self) -> Self {
    self.only_within = true;
    self
  }

  /// Every match in `text`, in search order.
  pub fn find(&self, text: RopeSlice) -> Vec<Interval> {
    let haystack: Cow<str> = text.into();
    let mut matches: Vec<Interval> = self
      .regex
      .captures_iter(&haystack)
      .filter_map(|captures| captures.get(self.group))
      .map(|m| Interval::new(text.byte_to_char(m.start()), text.byte_to_char(m.end())))
      .collect();
    if self.reverse {
      matches.reverse();
    }
    matches
  }

  fn ahead(&self, interval: &Interval, anchor: &Interval) -> bool {
    if self.reverse {
      interval.beg() < anchor.end()
    } else {
      interval.end() > anchor.beg()
    }
  }

  fn select_global(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection> {
    let matches = self.find(doc.text().slice(..));

    let touching = matches.iter().copied().filter(|m| selection.intersects(m));
    if let Ok(touching) = Selection::new(touching) {
      let candidate = match mode {
        SelectMode::Normal => Some(touching),
        SelectMode::Extend => Some(selection.add(&touching)),
        SelectMode::Reduce => selection.subtract(&touching),
      };
      if let Some(candidate) = candidate.filter(|candidate| candidate != selection) {
        return Some(candidate);
      }
    }

    let anchor = if self.reverse {
      selection.last()
    } else {
      selection.first()
    };
    matches
      .into_iter()
      .filter(|m| self.ahead(m, &anchor))
      .filter_map(|m| match mode {
        SelectMode::Normal => Some(Selection::single(m)),
        SelectMode::Extend => Some(selection.add_interval(m)),
        SelectMode::Reduce => selection.subtract_interval(m),
      })
      .find(|candidate| candidate != selection)
  }

  fn select_local(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection> {
    let matches = self.find(doc.text().slice(..));

    let mut result = Vec::with_capacity(selection.len());
    for interval in selection {
      let mut new_interval = None;
      for m in &matches {
        if self.only_within && !interval.contains_interval(m) {
          continue;
        }
        if !self.ahead(m, interval) {
          continue;
        }

        new_interval = match mode {
          SelectMode::Normal => Some(*m),
          SelectMode::Extend => Some(interval.hull(m)),
          SelectMode::Reduce => {
            let cut = if self.reverse {
              Interval::new(m.beg(), m.end().max(interval.end()))
            } else {
              Interval::new(m.beg().min(interval.beg()), m.end())
            };
            interval.difference(&cut).ok()
          },
        };
        if new_interval.is_some_and(|new| new != *interval) {
          break;
        }
      }

      match new_interval {
        Some(new) if new != *interval => result.push(new),
        _ => return None,
      }
    }

    Selection::new(result).ok()
  }
}

impl Selector for PatternSelector {
  fn select(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection> {
    if self.local {
      self.select_local(doc, selection, mode)
    } else {
      self.select_global(doc, selection, mode)
    }
  }
}

/// Select every match of `pattern` touching the selection, or else the next
/// match after it.
pub fn select_pattern(
  pattern: &str,
  doc: &Document,
  selection: &Selection,
  mode: SelectMode,
) -> Result<Option<Selection>, regex::Error> {
  Ok(PatternSelector::global(pattern)?.select(doc, selection, mode))
}

/// Move every interval to the next match of `pattern`.
pub fn select_local_pattern(
  pattern: &str,
  doc: &Document,
  selection: &Selection,
  mode: SelectMode,
) -> Result<Option<Selection>, regex::Error> {
  Ok(PatternSelector::local(pattern)?.select(doc, selection, mode))
}

macro_rules! pattern {
  ($name:ident, $pattern:expr) => {
    static $name: Lazy<Regex> =
      Lazy::new(|| Regex::new($pattern).expect(concat!(stringify!($name), " regex should compile")));
  };
}

pattern!(CHAR, r"(?s).");
pattern!(WORD, r"\b\w+\b");
pattern!(LINE, r"\s*([^\n]*)");
pattern!(FULL_LINE, r"[^\n]*\n?");
pattern!(PARAGRAPH, r"(?s)((?:[^\n][\n]?)+)");
pattern!(WHITESPACE, r"\s");
pattern!(INDENT, r"(?m)^([ \t]*)");

/// The selectors every editor binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
  Everything,
  SingleInterval,
  Empty,
  Join,
  Complement,
  EmptyBefore,
  EmptyAfter,
  Around,
  NextChar,
  PreviousChar,
  NextWord,
  PreviousWord,
  NextLine,
  PreviousLine,
  NextFullLine,
  PreviousFullLine,
  NextParagraph,
  PreviousParagraph,
  NextWhiteSpace,
  PreviousWhiteSpace,
  /// The indentation of the line of every interval.
  Indent,
}

impl Builtin {
  fn pattern(self) -> Option<PatternSelector> {
    let (regex, reverse, group): (&Regex, bool, usize) = match self {
      Self::NextChar => (&CHAR, false, 0),
      Self::PreviousChar => (&CHAR, true, 0),
      Self::NextWord => (&WORD, false, 0),
      Self::PreviousWord => (&WORD, true, 0),
      Self::NextLine => (&LINE, false, 1),
      Self::PreviousLine => (&LINE, true, 1),
      Self::NextFullLine => (&FULL_LINE, false, 0),
      Self::PreviousFullLine => (&FULL_LINE, true, 0),
      Self::NextParagraph => (&PARAGRAPH, false, 0),
      Self::PreviousParagraph => (&PARAGRAPH, true, 0),
      Self::NextWhiteSpace => (&WHITESPACE, false, 0),
      Self::PreviousWhiteSpace => (&WHITESPACE, true, 0),
      Self::Indent => (&INDENT, true, 1),
      _ => return None,
    };
    let selector = PatternSelector::from_regex(regex.clone(), true).group(group);
    Some(if reverse { selector.reversed() } else { selector })
  }
}

impl Selector for Builtin {
  fn select(&self, doc: &Document, selection: &Selection, mode: SelectMode) -> Option<Selection> {
    if let Some(pattern) = self.pattern() {
      return pattern.select(doc, selection, mode);
    }
    match self {
      Self::Everything => everything(doc, selection, mode),
      Self::SingleInterval => single_interval(doc, selection, mode),
      Self::Empty => empty(doc, selection, mode),
      Self::Join => join(doc, selection, mode),
      Self::Complement => complement(doc, selection, mode),
      Self::EmptyBefore => empty_before(doc, selection, mode),
      Self::EmptyAfter => empty_after(doc, selection, mode),
      Self::Around => select_around(doc, selection, mode),
      _ => None,
    }
  }
}

#[cfg(test)]
mod test {
  use std::num::NonZeroUsize;

  use ropey::Rope;

  use super::*;
  use crate::document::DocumentId;

  fn doc(text: &str) -> Document {
    let id = DocumentId::new(NonZeroUsize::new(1).unwrap());
    Document::new(id, Rope::from(text))
  }

  fn sel(intervals: &[(usize, usize)]) -> Selection {
    Selection::new(intervals.iter().map(|&(beg, end)| Interval::new(beg, end))).unwrap()
  }

  fn run(selector: impl Selector, doc: &Document, selection: &Selection) -> Option<Selection> {
    selector.select(doc, selection, SelectMode::Normal)
  }

  #[test]
  fn test_whole_selection_selectors() {
    let doc = doc("0123456789");
    let selection = sel(&[(2, 4), (6, 8)]);

    assert_eq!(run(everything, &doc, &selection), Some(sel(&[(0, 10)])));
    assert_eq!(run(single_interval, &doc, &selection), Some(sel(&[(2, 4)])));
    assert_eq!(run(empty, &doc, &selection), Some(sel(&[(2, 2)])));
    assert_eq!(run(Builtin::Join, &doc, &selection), Some(sel(&[(2, 8)])));
    assert_eq!(
      run(complement, &doc, &selection),
      Some(sel(&[(0, 2), (4, 6), (8, 10)]))
    );
    assert_eq!(run(Builtin::Complement, &doc, &sel(&[(0, 10)])), None);
    assert_eq!(
      run(Builtin::EmptyAfter, &doc, &selection),
      Some(sel(&[(4, 4), (8, 8)]))
    );
  }

  #[test]
  fn test_select_around() {
    let doc = doc("f(a, [b], \"c\")");
    assert_eq!(run(select_around, &doc, &sel(&[(6, 7)])), Some(sel(&[(5, 8)])));
    assert_eq!(run(select_around, &doc, &sel(&[(2, 3)])), Some(sel(&[(1, 14)])));
    assert_eq!(run(select_around, &doc, &sel(&[(11, 12)])), Some(sel(&[(10, 13)])));
    assert_eq!(run(select_around, &doc, &sel(&[(0, 1)])), None);
  }

  #[test]
  fn test_next_and_previous_word() {
    let doc = doc("one two three");
    let selection = sel(&[(0, 3)]);

    assert_eq!(run(Builtin::NextWord, &doc, &selection), Some(sel(&[(4, 7)])));
    let back = sel(&[(8, 13)]);
    assert_eq!(run(Builtin::PreviousWord, &doc, &back), Some(sel(&[(4, 7)])));
    assert_eq!(run(Builtin::NextWord, &doc, &back), None);
  }

  #[test]
  fn test_next_word_from_cursor_selects_word_under_it() {
    let doc = doc("one two");
    assert_eq!(
      run(Builtin::NextWord, &doc, &sel(&[(1, 1)])),
      Some(sel(&[(0, 3)]))
    );
  }

  #[test]
  fn test_local_pattern_moves_every_interval() {
    let doc = doc("ab cd ef gh");
    let selection = sel(&[(0, 2), (6, 8)]);
    assert_eq!(
      run(Builtin::NextWord, &doc, &selection),
      Some(sel(&[(3, 5), (9, 11)]))
    );
  }

  #[test]
  fn test_local_pattern_extend_and_reduce() {
    let doc = doc("one two three");
    let selection = sel(&[(0, 3)]);

    let extended = Builtin::NextWord.select(&doc, &selection, SelectMode::Extend);
    assert_eq!(extended, Some(sel(&[(0, 7)])));

    let reduced = Builtin::PreviousChar.select(&doc, &sel(&[(0, 7)]), SelectMode::Reduce);
    assert_eq!(reduced, Some(sel(&[(0, 6)])));
  }

  #[test]
  fn test_full_line_and_indent() {
    let doc = doc("fn main() {\n    body\n}\n");
    let selection = sel(&[(16, 16)]);

    assert_eq!(
      run(Builtin::NextFullLine, &doc, &selection),
      Some(sel(&[(12, 21)]))
    );
    assert_eq!(run(Builtin::Indent, &doc, &selection), Some(sel(&[(12, 16)])));
  }

  #[test]
  fn test_paragraph() {
    let doc = doc("a\nb\n\nc\n");
    assert_eq!(
      run(Builtin::NextParagraph, &doc, &sel(&[(0, 0)])),
      Some(sel(&[(0, 4)]))
    );
  }

  #[test]
  fn test_global_pattern_selects_touching_matches() {
    let doc = doc("foo bar foo baz foo");
    let selector = PatternSelector::global("foo").unwrap();

    let touching = selector.select(&doc, &sel(&[(0, 10)]), SelectMode::Normal);
    assert_eq!(touching, Some(sel(&[(0, 3), (8, 11)])));

    let next = selector.select(&doc, &sel(&[(0, 3)]), SelectMode::Normal);
    assert_eq!(next, Some(sel(&[(8, 11)])));

    let extended = selector.select(&doc, &sel(&[(4, 7)]), SelectMode::Extend);
    assert_eq!(extended, Some(sel(&[(4, 7), (8, 11)])));
  }

  #[test]
  fn test_global_pattern_reduce() {
    let doc = doc("foo bar foo");
    let reduced = select_pattern("foo", &doc, &sel(&[(0, 11)]), SelectMode::Reduce).unwrap();
    assert_eq!(reduced, Some(sel(&[(3, 8)])));
  }

  #[test]
  fn test_only_within() {
    let doc = doc("ab cd");
    let selector = PatternSelector::local(r"\w").unwrap().only_within();
    assert_eq!(
      selector.select(&doc, &sel(&[(3, 5)]), SelectMode::Normal),
      Some(sel(&[(3, 4)]))
    );
    assert_eq!(selector.select(&doc, &sel(&[(2, 3)]), SelectMode::Normal), None);
  }

  #[test]
  fn test_select_updates_document_only_on_result() {
    let mut doc = doc("one two");
    doc.set_selection(sel(&[(0, 3)])).unwrap();

    assert!(select(&mut doc, &Builtin::NextWord).unwrap());
    assert_eq!(doc.selection(), &sel(&[(4, 7)]));

    assert!(!select(&mut doc, &Builtin::NextWord).unwrap());
    assert_eq!(doc.selection(), &sel(&[(4, 7)]));
  }

  #[test]
  fn test_invalid_pattern() {
    let doc = doc("abc");
    assert!(select_local_pattern("(", &doc, &sel(&[(0, 0)]), SelectMode::Normal).is_err());
  }

  #[test]
  fn test_closure_is_a_selector() {
    let doc = doc("abc");
    let last_char = |doc: &Document, _: &Selection, _: SelectMode| {
      let len = doc.text().len_chars();
      Some(Selection::single(Interval::new(len - 1, len)))
    };
    assert_eq!(run(last_char, &doc, &sel(&[(0, 0)])), Some(sel(&[(2, 3)])));
  }
}
