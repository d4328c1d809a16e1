//! Incremental changes built from keystrokes.
//!
//! Both builders keep per-interval state, turn it into an [`Operation`] after
//! every keystroke and preview it on the document: the previous preview is
//! undone and the new one applied, neither recorded in the history. Finishing
//! undoes the last preview and applies it once more through
//! [`Document::apply`], so the whole change is a single history entry.
//!
//! - [`ChangeInPlace`] replaces the selected text with what is typed.
//! - [`ChangeAround`] types around every interval, mirroring bracket pairs on
//!   the closing side.

use ropey::RopeSlice;
use the_core::interval::Interval;

use crate::{
  Tendril,
  document::{
    Document,
    Result,
  },
  operation::Operation,
  selection::Selection,
};

/// A keystroke fed to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
  /// Typed text. `'\n'` and `'\t'` honour `auto-indent` and `expand-tab`.
  Char(char),
  Backspace,
  Delete,
}

const BRACKETS: [(char, char); 4] = [('{', '}'), ('[', ']'), ('(', ')'), ('<', '>')];

/// Leading whitespace of the line containing `pos`.
fn line_indent(text: RopeSlice, pos: usize) -> Tendril {
  let line = text.line(text.char_to_line(pos.min(text.len_chars())));
  let mut indent = Tendril::new();
  for ch in line.chars().take_while(|ch| matches!(ch, ' ' | '\t')) {
    indent.push(ch);
  }
  indent
}

/// Replace the selected text with typed text.
///
/// Backspace removes the last typed character, or once nothing typed is
/// left, grows the interval one position to the left. Delete grows the
/// interval one position to the right.
#[derive(Debug)]
pub struct ChangeInPlace {
  intervals: Vec<Interval>,
  content:   Vec<Tendril>,
  preview:   Operation,
}

impl ChangeInPlace {
  /// Start changing the document's selection. The selected text disappears
  /// from the preview right away.
  pub fn start(doc: &mut Document) -> Result<Self> {
    let intervals: Vec<Interval> = doc.selection().iter().copied().collect();
    let content = vec![Tendril::new(); intervals.len()];
    let preview = Self::operation(doc, &intervals, &content)?;
    doc.preview(&preview)?;
    Ok(Self {
      intervals,
      content,
      preview,
    })
  }

  pub fn preview(&self) -> &Operation {
    &self.preview
  }

  pub fn insert(&mut self, doc: &mut Document, input: Input) -> Result<()> {
    let indents = newline_indents(doc, &self.preview, input)
      .into_iter()
      .map(|(_, after)| after)
      .collect::<Vec<_>>();
    let indent_unit = doc.config().indent_unit();

    self.preview.undo(doc)?;
    let len = doc.text().len_chars();

    for (index, (interval, content)) in self
      .intervals
      .iter_mut()
      .zip(self.content.iter_mut())
      .enumerate()
    {
      match input {
        Input::Backspace => {
          if content.pop().is_none() {
            *interval = Interval::new(interval.beg().saturating_sub(1), interval.end());
          }
        },
        Input::Delete => {
          *interval = Interval::new(interval.beg(), (interval.end() + 1).min(len));
        },
        Input::Char('\n') if !indents.is_empty() => {
          content.push('\n');
          content.push_str(&indents[index]);
        },
        Input::Char('\t') => content.push_str(&indent_unit),
        Input::Char(ch) => content.push(ch),
      }
    }

    self.merge_touching();
    self.refresh(doc)
  }

  /// Record the change as one history entry.
  pub fn finish(self, doc: &mut Document) -> Result<()> {
    self.preview.undo(doc)?;
    if self.preview.is_identity() {
      tracing::trace!(document = ?doc.id(), "dropping unchanged edit");
      return Ok(());
    }
    doc.apply(self.preview)
  }

  /// Undo the preview, leaving the document as it was before [`Self::start`].
  pub fn cancel(self, doc: &mut Document) -> Result<()> {
    self.preview.undo(doc)?;
    Ok(())
  }

  fn operation(doc: &Document, intervals: &[Interval], content: &[Tendril]) -> Result<Operation> {
    let selection = Selection::new(intervals.iter().copied())?;
    Ok(Operation::new(doc, content.to_vec(), Some(selection))?)
  }

  fn refresh(&mut self, doc: &mut Document) -> Result<()> {
    let preview = Self::operation(doc, &self.intervals, &self.content)?;
    doc.preview(&preview)?;
    self.preview = preview;
    Ok(())
  }

  /// Intervals grown into their neighbour become one interval.
  fn merge_touching(&mut self) {
    let mut index = 1;
    while index < self.intervals.len() {
      let prev = self.intervals[index - 1];
      if prev.touches(&self.intervals[index]) {
        let next = self.intervals.remove(index);
        self.intervals[index - 1] = prev.hull(&next);
        let content = self.content.remove(index);
        self.content[index - 1].push_str(&content);
      } else {
        index += 1;
      }
    }
  }
}

/// Type around every interval.
///
/// Text typed before an interval is mirrored: it appears reversed, with
/// closing brackets turned into opening ones, so typing `(` wraps the
/// interval as `(...)`. Backspace removes the last typed character on both
/// sides, or once nothing typed is left, trims one more character from
/// both ends of the interval's content. Delete always trims.
#[derive(Debug)]
pub struct ChangeAround {
  before:    Vec<Tendril>,
  after:     Vec<Tendril>,
  deletions: Vec<usize>,
  preview:   Operation,
}

impl ChangeAround {
  pub fn start(doc: &mut Document) -> Result<Self> {
    let len = doc.selection().len();
    let mut change = Self {
      before:    vec![Tendril::new(); len],
      after:     vec![Tendril::new(); len],
      deletions: vec![0; len],
      preview:   Operation::new(doc, Vec::new(), None)?,
    };
    change.refresh(doc)?;
    Ok(change)
  }

  pub fn preview(&self) -> &Operation {
    &self.preview
  }

  pub fn insert(&mut self, doc: &mut Document, input: Input) -> Result<()> {
    let indents = newline_indents(doc, &self.preview, input);
    let indent_unit = doc.config().indent_unit();

    self.preview.undo(doc)?;

    for index in 0..self.before.len() {
      let (before, after) = (&mut self.before[index], &mut self.after[index]);
      match input {
        Input::Backspace if before.is_empty() && after.is_empty() => {
          self.deletions[index] += 1;
        },
        Input::Backspace => {
          before.pop();
          after.pop();
        },
        Input::Delete => self.deletions[index] += 1,
        Input::Char('\n') if !indents.is_empty() => {
          let (indent_before, indent_after) = &indents[index];
          before.push_str(indent_before);
          before.push('\n');
          after.push('\n');
          after.push_str(indent_after);
        },
        Input::Char('\t') => {
          before.push_str(&indent_unit);
          after.push_str(&indent_unit);
        },
        Input::Char(ch) => {
          before.push(ch);
          after.push(ch);
        },
      }
    }

    self.refresh(doc)
  }

  /// The change as an operation on the document's current selection. State
  /// is reused cyclically when the selection has more intervals than the
  /// change was started with.
  pub fn operation(&self, doc: &Document) -> Result<Operation> {
    let old_content = doc.selection().content(doc.text().slice(..))?;
    let states = self.before.len();

    let new_content = old_content
      .iter()
      .enumerate()
      .map(|(index, old)| {
        let state = index % states;
        let mut new = Tendril::new();
        for ch in self.before[state].chars().rev() {
          new.push(opening(ch));
        }
        let trim = self.deletions[state];
        let kept = old.chars().count().saturating_sub(2 * trim);
        for ch in old.chars().skip(trim).take(kept) {
          new.push(ch);
        }
        for ch in self.after[state].chars() {
          new.push(closing(ch));
        }
        new
      })
      .collect();

    Ok(Operation::new(doc, new_content, None)?)
  }

  /// Apply the same change again around the current selection and record
  /// it.
  pub fn repeat(&self, doc: &mut Document) -> Result<()> {
    let operation = self.operation(doc)?;
    doc.apply(operation)
  }

  pub fn finish(self, doc: &mut Document) -> Result<()> {
    self.preview.undo(doc)?;
    if self.preview.is_identity() {
      tracing::trace!(document = ?doc.id(), "dropping unchanged edit");
      return Ok(());
    }
    doc.apply(self.preview)
  }

  pub fn cancel(self, doc: &mut Document) -> Result<()> {
    self.preview.undo(doc)?;
    Ok(())
  }

  fn refresh(&mut self, doc: &mut Document) -> Result<()> {
    let preview = self.operation(doc)?;
    doc.preview(&preview)?;
    self.preview = preview;
    Ok(())
  }
}

fn opening(ch: char) -> char {
  BRACKETS
    .iter()
    .find(|&&(_, close)| close == ch)
    .map_or(ch, |&(open, _)| open)
}

fn closing(ch: char) -> char {
  BRACKETS
    .iter()
    .find(|&&(open, _)| open == ch)
    .map_or(ch, |&(_, close)| close)
}

/// Indentation at the start and end of every previewed interval, when
/// `input` is a newline to be auto-indented.
fn newline_indents(doc: &Document, preview: &Operation, input: Input) -> Vec<(Tendril, Tendril)> {
  if input != Input::Char('\n') || !doc.config().auto_indent {
    return Vec::new();
  }
  let text = doc.text().slice(..);
  preview
    .new_selection()
    .iter()
    .map(|interval| {
      (
        line_indent(text, interval.beg()),
        line_indent(text, interval.end()),
      )
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use quickcheck::quickcheck;
  use ropey::Rope;

  use super::*;
  use crate::{
    config::DocumentConfig,
    document::DocumentId,
  };

  fn doc(text: &str) -> Document {
    let id = DocumentId::new(NonZeroUsize::new(1).unwrap());
    Document::new(id, Rope::from(text))
  }

  fn sel(intervals: &[(usize, usize)]) -> Selection {
    Selection::new(intervals.iter().map(|&(beg, end)| Interval::new(beg, end))).unwrap()
  }

  fn type_str(change: &mut ChangeInPlace, doc: &mut Document, text: &str) {
    for ch in text.chars() {
      change.insert(doc, Input::Char(ch)).unwrap();
    }
  }

  #[test]
  fn change_in_place_replaces_selection() {
    let mut doc = doc("hello world");
    doc.set_selection(sel(&[(0, 5)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), " world");

    type_str(&mut change, &mut doc, "Hi");
    assert_eq!(doc.text().to_string(), "Hi world");
    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "H world");
    assert!(doc.history().is_empty());

    change.finish(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "H world");
    assert_eq!(doc.history().len(), 2);

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "hello world");
  }

  #[test]
  fn backspace_and_delete_grow_intervals() {
    let mut doc = doc("abcdef");
    doc.set_selection(sel(&[(3, 3)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "abdef");
    change.insert(&mut doc, Input::Delete).unwrap();
    assert_eq!(doc.text().to_string(), "abef");
    assert_eq!(change.preview().old_selection(), &sel(&[(2, 4)]));
  }

  #[test]
  fn delete_stops_at_end_of_text() {
    let mut doc = doc("ab");
    doc.set_selection(sel(&[(2, 2)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Delete).unwrap();
    assert_eq!(doc.text().to_string(), "ab");
    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "a");
  }

  #[test]
  fn backspace_merges_neighbouring_cursors() {
    let mut doc = doc("abcd");
    doc.set_selection(sel(&[(1, 1), (2, 2)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "cd");
    assert_eq!(change.preview().old_selection(), &sel(&[(0, 2)]));

    type_str(&mut change, &mut doc, "x");
    assert_eq!(doc.text().to_string(), "xcd");
  }

  #[test]
  fn newline_copies_indentation() {
    let mut doc = doc("    foo");
    doc.set_selection(sel(&[(7, 7)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    type_str(&mut change, &mut doc, "\nx\n");
    assert_eq!(doc.text().to_string(), "    foo\n    x\n    ");
  }

  #[test]
  fn newline_and_tab_follow_config() {
    let config = DocumentConfig {
      tab_width:   2,
      expand_tab:  true,
      auto_indent: false,
    };
    let mut doc = doc("  a").with_config(config);
    doc.set_selection(sel(&[(3, 3)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    type_str(&mut change, &mut doc, "\n\tb");
    assert_eq!(doc.text().to_string(), "  a\n  b");
  }

  #[test]
  fn cancel_restores_document() {
    let mut doc = doc("abc");
    doc.set_selection(sel(&[(0, 3)])).unwrap();

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    type_str(&mut change, &mut doc, "xyz");
    change.cancel(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "abc");
    assert_eq!(doc.selection(), &sel(&[(0, 3)]));
    assert!(doc.history().is_empty());
  }

  #[test]
  fn unchanged_edit_is_not_recorded() {
    let mut doc = doc("abc");
    let change = ChangeInPlace::start(&mut doc).unwrap();
    change.finish(&mut doc).unwrap();
    assert!(doc.history().is_empty());
  }

  #[test]
  fn change_around_mirrors_brackets() {
    let mut doc = doc("a b");
    doc.set_selection(sel(&[(0, 1), (2, 3)])).unwrap();

    let mut change = ChangeAround::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Char('(')).unwrap();
    change.insert(&mut doc, Input::Char('[')).unwrap();
    assert_eq!(doc.text().to_string(), "[(a)] [(b)]");

    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "(a) (b)");

    change.finish(&mut doc).unwrap();
    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "a b");
  }

  #[test]
  fn change_around_quotes_are_symmetric() {
    let mut doc = doc("word");
    doc.set_selection(sel(&[(0, 4)])).unwrap();

    let mut change = ChangeAround::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Char('"')).unwrap();
    assert_eq!(doc.text().to_string(), "\"word\"");
  }

  #[test]
  fn change_around_trims_both_sides() {
    let mut doc = doc("(x) (y)");
    doc.set_selection(sel(&[(0, 3), (4, 7)])).unwrap();

    let mut change = ChangeAround::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Backspace).unwrap();
    assert_eq!(doc.text().to_string(), "x y");

    change.insert(&mut doc, Input::Delete).unwrap();
    assert_eq!(doc.text().to_string(), " ");
  }

  #[test]
  fn change_around_repeats_cyclically() {
    let mut doc = doc("a b c");
    doc.set_selection(sel(&[(0, 1)])).unwrap();

    let mut change = ChangeAround::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Char('*')).unwrap();
    assert_eq!(doc.text().to_string(), "*a* b c");

    doc.set_selection(sel(&[(4, 5), (6, 7)])).unwrap();
    change.repeat(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "*a* *b* *c*");
  }

  quickcheck! {
    fn typing_then_undo_restores(text: String, typed: Vec<char>) -> bool {
      let typed: String = typed
        .into_iter()
        .filter(|ch| !matches!(ch, '\n' | '\t' | '\r'))
        .collect();
      let mut doc = doc(&text);
      let end = doc.text().len_chars();
      doc.set_selection(Selection::point(end)).unwrap();

      let mut change = ChangeInPlace::start(&mut doc).unwrap();
      type_str(&mut change, &mut doc, &typed);
      let typed_ok = doc.text().to_string() == format!("{text}{typed}");
      change.finish(&mut doc).unwrap();

      let undone = typed.is_empty() || doc.undo().unwrap();
      typed_ok && undone && doc.text().to_string() == text
    }
  }
}
