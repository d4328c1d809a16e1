//! Reversible edits keyed to a selection.
//!
//! An [`Operation`] replaces the content of every interval of a selection and
//! remembers enough to reverse itself: the selection it was built against,
//! the content it replaced, the content it inserts and the selection the
//! inserted content ends up under.
//!
//! # Layout
//!
//! The new selection is derived purely from the old selection and the
//! lengths of the new content. The inserted strings are laid out end to end
//! starting at the first old interval, and the unselected gaps between old
//! intervals are reproduced exactly:
//!
//! ```text
//! text:   "ab[cd]ef[gh]ij"      old selection [(2, 4), (6, 8)]
//! insert: ["X", "YYY"]
//! result: "ab[X]ef[YYY]ij"      new selection [(2, 3), (5, 8)]
//! ```
//!
//! When fewer strings than intervals are given, the strings are reused
//! cyclically (index modulo length). A single string therefore repeats the
//! same edit at every cursor.
//!
//! # Applying
//!
//! ```ignore
//! let op = Operation::new(&doc, vec!["HI".into()], None)?;
//! op.apply(&mut doc)?;
//! op.undo(&mut doc)?;
//! ```
//!
//! Both directions rebuild the text by walking
//! [`Selection::partition`](crate::selection::Selection::partition), copying
//! unselected spans verbatim. The new text is fully built before the
//! document is touched; text and selection are then swapped in together.
//!
//! # Error Handling
//!
//! - **Selection** - The selection does not fit the text
//! - **ContentMismatch** - Old content does not line up with the selection

use ropey::{
  Rope,
  RopeBuilder,
};
use smallvec::SmallVec;
use the_core::interval::Interval;
use thiserror::Error;

use crate::{
  Tendril,
  document::Document,
  selection::{
    Selection,
    SelectionError,
  },
};

pub type Result<T> = std::result::Result<T, OperationError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationError {
  #[error(transparent)]
  Selection(#[from] SelectionError),
  #[error("{content} content strings for a selection of {intervals} intervals")]
  ContentMismatch { content: usize, intervals: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
  old_selection: Selection,
  old_content:   Vec<Tendril>,
  new_content:   Vec<Tendril>,
  new_selection: Selection,
}

impl Operation {
  /// Build an operation replacing the content of `selection` (default: the
  /// document's current selection) with `new_content`.
  ///
  /// An empty `new_content` keeps the selected content as it is.
  pub fn new(
    doc: &Document,
    new_content: Vec<Tendril>,
    selection: Option<Selection>,
  ) -> Result<Self> {
    let old_selection = selection.unwrap_or_else(|| doc.selection().clone());
    let old_content = old_selection.content(doc.text().slice(..))?;
    Self::from_parts(old_selection, old_content, new_content)
  }

  /// Build an operation from already captured content.
  pub fn from_parts(
    old_selection: Selection,
    old_content: Vec<Tendril>,
    new_content: Vec<Tendril>,
  ) -> Result<Self> {
    if old_content.len() != old_selection.len() {
      return Err(OperationError::ContentMismatch {
        content:   old_content.len(),
        intervals: old_selection.len(),
      });
    }
    let new_content = if new_content.is_empty() {
      old_content.clone()
    } else {
      new_content
    };
    let new_selection = layout(&old_selection, &new_content)?;

    Ok(Self {
      old_selection,
      old_content,
      new_content,
      new_selection,
    })
  }

  #[inline]
  pub fn old_selection(&self) -> &Selection {
    &self.old_selection
  }

  #[inline]
  pub fn new_selection(&self) -> &Selection {
    &self.new_selection
  }

  #[inline]
  pub fn old_content(&self) -> &[Tendril] {
    &self.old_content
  }

  #[inline]
  pub fn new_content(&self) -> &[Tendril] {
    &self.new_content
  }

  /// Whether applying the operation would leave the text unchanged.
  pub fn is_identity(&self) -> bool {
    self
      .old_content
      .iter()
      .enumerate()
      .all(|(index, old)| *old == self.new_content[index % self.new_content.len()])
  }

  /// The text after applying the operation to `text`, and the selection
  /// covering the inserted content.
  pub fn forward(&self, text: &Rope) -> Result<(Rope, Selection)> {
    let text = rewrite(text, &self.old_selection, &self.new_content)?;
    Ok((text, self.new_selection.clone()))
  }

  /// The text before the operation, given the text after it.
  pub fn backward(&self, text: &Rope) -> Result<(Rope, Selection)> {
    let text = rewrite(text, &self.new_selection, &self.old_content)?;
    Ok((text, self.old_selection.clone()))
  }

  /// Apply to `doc` without recording history. On error the document is
  /// untouched.
  pub fn apply(&self, doc: &mut Document) -> Result<()> {
    let (text, selection) = self.forward(doc.text())?;
    tracing::trace!(
      document = ?doc.id(),
      intervals = self.old_selection.len(),
      selection = %selection,
      "apply operation"
    );
    doc.replace_state(text, selection);
    Ok(())
  }

  /// Reverse a previously applied operation on `doc`.
  pub fn undo(&self, doc: &mut Document) -> Result<()> {
    let (text, selection) = self.backward(doc.text())?;
    tracing::trace!(
      document = ?doc.id(),
      intervals = self.new_selection.len(),
      selection = %selection,
      "undo operation"
    );
    doc.replace_state(text, selection);
    Ok(())
  }
}

/// Lay `content` out over `selection`, keeping the gaps between intervals.
fn layout(selection: &Selection, content: &[Tendril]) -> Result<Selection> {
  let mut intervals: SmallVec<[Interval; 1]> = SmallVec::with_capacity(selection.len());
  let mut pos = selection.first().beg();
  let mut prev_end = None;

  for (index, interval) in selection.iter().enumerate() {
    if let Some(prev_end) = prev_end {
      pos += interval.beg() - prev_end;
    }
    let len = content[index % content.len()].chars().count();
    intervals.push(Interval::new(pos, pos + len));
    pos += len;
    prev_end = Some(interval.end());
  }

  Ok(Selection::new(intervals)?)
}

fn rewrite(text: &Rope, selection: &Selection, content: &[Tendril]) -> Result<Rope> {
  let spans = selection.partition(text.len_chars())?;

  let mut builder = RopeBuilder::new();
  let mut index = 0;
  for (selected, span) in spans {
    if selected {
      builder.append(&content[index % content.len()]);
      index += 1;
    } else {
      for chunk in text.slice(span.beg()..span.end()).chunks() {
        builder.append(chunk);
      }
    }
  }

  Ok(builder.finish())
}

#[cfg(test)]
mod test {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::{
    document::DocumentId,
    event::DocumentEventKind,
    mode::SelectMode,
  };

  fn doc(text: &str) -> Document {
    let id = DocumentId::new(NonZeroUsize::new(1).unwrap());
    Document::new(id, Rope::from(text))
  }

  fn sel(intervals: &[(usize, usize)]) -> Selection {
    Selection::new(intervals.iter().map(|&(beg, end)| Interval::new(beg, end))).unwrap()
  }

  #[test]
  fn test_replace_single_interval() {
    let mut doc = doc("hello\nworld\n");
    doc.set_selection(sel(&[(0, 5)])).unwrap();

    let op = Operation::new(&doc, vec!["HI".into()], None).unwrap();
    op.apply(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "HI\nworld\n");
    assert_eq!(doc.selection(), &sel(&[(0, 2)]));
  }

  #[test]
  fn test_layout_preserves_gaps() {
    let mut doc = doc("abcdefghij");
    let selection = sel(&[(2, 4), (6, 8)]);

    let op = Operation::new(&doc, vec!["X".into(), "YYY".into()], Some(selection)).unwrap();
    assert_eq!(op.new_selection(), &sel(&[(2, 3), (5, 8)]));

    op.apply(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "abXefYYYij");
  }

  #[test]
  fn test_content_reused_modulo() {
    let mut doc = doc("a b c d");
    let selection = sel(&[(0, 1), (2, 3), (4, 5), (6, 7)]);

    let op = Operation::new(&doc, vec!["1".into(), "22".into()], Some(selection)).unwrap();
    op.apply(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "1 22 1 22");
    assert_eq!(doc.selection(), &sel(&[(0, 1), (2, 4), (5, 6), (7, 9)]));
  }

  #[test]
  fn test_insert_at_empty_intervals() {
    let mut doc = doc("abc");
    let selection = sel(&[(0, 0), (3, 3)]);

    let op = Operation::new(&doc, vec!["<".into(), ">".into()], Some(selection)).unwrap();
    op.apply(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "<abc>");
    assert_eq!(doc.selection(), &sel(&[(0, 1), (4, 5)]));
  }

  #[test]
  fn test_delete_leaves_empty_intervals() {
    let mut doc = doc("abcdef");
    let selection = sel(&[(0, 2), (4, 6)]);

    let op = Operation::new(&doc, vec!["".into()], Some(selection)).unwrap();
    op.apply(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "cd");
    assert_eq!(doc.selection(), &sel(&[(0, 0), (2, 2)]));
  }

  #[test]
  fn test_undo_restores_state() {
    let mut doc = doc("hello world");
    let selection = sel(&[(0, 5), (6, 11)]);
    doc.set_selection(selection.clone()).unwrap();

    let op = Operation::new(&doc, vec!["bye".into()], None).unwrap();
    op.apply(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "bye bye");

    op.undo(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "hello world");
    assert_eq!(doc.selection(), &selection);
  }

  #[test]
  fn test_out_of_bounds_selection_is_rejected() {
    let doc = doc("abc");
    let err = Operation::new(&doc, vec!["x".into()], Some(sel(&[(1, 9)]))).unwrap_err();
    assert!(matches!(
      err,
      OperationError::Selection(SelectionError::OutOfBounds { .. })
    ));
  }

  #[test]
  fn test_failed_apply_leaves_document_untouched() {
    let mut doc = doc("abcdef");
    let op = Operation::new(&doc, vec!["x".into()], Some(sel(&[(4, 6)]))).unwrap();

    let mut short = self::doc("ab");
    let version = short.version();
    assert!(op.apply(&mut short).is_err());
    assert_eq!(short.text().to_string(), "ab");
    assert_eq!(short.version(), version);
    assert!(!short.flags().modified);

    op.apply(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "abcdx");
  }

  #[test]
  fn test_from_parts_checks_arity() {
    let err = Operation::from_parts(sel(&[(0, 1), (3, 4)]), vec!["a".into()], vec![]).unwrap_err();
    assert_eq!(err, OperationError::ContentMismatch {
      content:   1,
      intervals: 2,
    });
  }

  #[test]
  fn test_apply_side_effects() {
    let mut doc = doc("abc");
    doc.set_select_mode(SelectMode::Extend);
    let op = Operation::new(&doc, vec!["x".into()], Some(sel(&[(1, 2)]))).unwrap();
    op.apply(&mut doc).unwrap();

    assert!(doc.flags().modified);
    assert_eq!(doc.select_mode(), SelectMode::Normal);
    assert_eq!(doc.version(), 1);

    let kinds: Vec<_> = doc.drain_events().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![
      DocumentEventKind::TextChanged { version: 1 },
      DocumentEventKind::SavedStateChanged { saved: false },
    ]);
  }

  fn arbitrary_case(text: String, raw: Vec<(u8, u8)>) -> Option<(Document, Selection)> {
    let doc = doc(&text);
    let len = doc.text().len_chars();
    let selection = Selection::new(raw.into_iter().map(|(a, b)| {
      let (a, b) = (a as usize % (len + 1), b as usize % (len + 1));
      Interval::new(a.min(b), a.max(b))
    }))
    .ok()?;
    Some((doc, selection))
  }

  quickcheck::quickcheck! {
    fn test_same_content_is_identity(text: String, raw: Vec<(u8, u8)>) -> bool {
      let Some((mut doc, selection)) = arbitrary_case(text, raw) else {
        return true;
      };
      let before = doc.text().clone();
      let content = selection.content(doc.text().slice(..)).unwrap();
      let op = Operation::new(&doc, content, Some(selection.clone())).unwrap();
      op.apply(&mut doc).unwrap();
      op.is_identity() && *doc.text() == before && *doc.selection() == selection
    }

    fn test_apply_then_undo_restores(text: String, raw: Vec<(u8, u8)>, content: Vec<String>) -> bool {
      let Some((mut doc, selection)) = arbitrary_case(text, raw) else {
        return true;
      };
      doc.set_selection(selection.clone()).unwrap();
      let before = doc.text().clone();
      let content = content.into_iter().map(Tendril::from).collect();
      let op = Operation::new(&doc, content, None).unwrap();
      op.apply(&mut doc).unwrap();
      op.undo(&mut doc).unwrap();
      *doc.text() == before && *doc.selection() == selection
    }
  }
}
