//! Chaining selectors and edits into one undoable command.
//!
//! A [`Composer`] runs a queue of [`Step`]s against a document inside one
//! history sequence, so the whole composition undoes as a single revision.
//!
//! A [`Step::Suspend`] hands control back to the caller, typically so an
//! interactive change (see [`crate::change`]) can collect input. The caller
//! calls [`Composer::resume`] once it is done and the remaining steps run.
//!
//! ```ignore
//! let (mut composer, progress) = Composer::start(change_before(), &mut doc)?;
//! if let Progress::Suspended(_) = progress {
//!   let mut change = ChangeInPlace::start(&mut doc)?;
//!   change.insert(&mut doc, Input::Char('x'))?;
//!   change.finish(&mut doc)?;
//! }
//! composer.resume(&mut doc)?;
//! ```

use std::{
  collections::VecDeque,
  fmt,
};

use the_core::interval::Interval;

use crate::{
  Tendril,
  document::{
    Document,
    Result,
  },
  mode::SelectMode,
  operation::{
    self,
    Operation,
  },
  selection::Selection,
  selectors::{
    self,
    Builtin,
    Selector,
  },
};

pub type EditFn = dyn Fn(&Document) -> operation::Result<Option<Operation>>;

pub enum Step {
  /// Replace the selection with the selector's result, if any.
  Select(Box<dyn Selector>),
  /// Apply and record the built operation, if any.
  Edit(Box<EditFn>),
  /// Return control to the caller until [`Composer::resume`].
  Suspend(&'static str),
}

impl Step {
  pub fn select(selector: impl Selector + 'static) -> Self {
    Self::Select(Box::new(selector))
  }

  pub fn edit(
    edit: impl Fn(&Document) -> operation::Result<Option<Operation>> + 'static,
  ) -> Self {
    Self::Edit(Box::new(edit))
  }

  /// Insert `text` before every interval.
  pub fn insert(text: &'static str) -> Self {
    Self::edit(move |doc| {
      let content = doc
        .selection()
        .content(doc.text().slice(..))?
        .into_iter()
        .map(|old| {
          let mut new = Tendril::from(text);
          new.push_str(&old);
          new
        })
        .collect();
      Operation::new(doc, content, None).map(Some)
    })
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Select(_) => f.write_str("Select"),
      Self::Edit(_) => f.write_str("Edit"),
      Self::Suspend(label) => f.debug_tuple("Suspend").field(label).finish(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
  /// Waiting at the [`Step::Suspend`] with this label.
  Suspended(&'static str),
  Finished,
}

#[derive(Debug)]
pub struct Composer {
  todo: VecDeque<Step>,
  open: bool,
}

impl Composer {
  /// Open a history sequence and run steps until the first suspension or the
  /// end of the queue.
  pub fn start(
    steps: impl IntoIterator<Item = Step>,
    doc: &mut Document,
  ) -> Result<(Self, Progress)> {
    doc.start_sequence();
    let mut composer = Self {
      todo: steps.into_iter().collect(),
      open: true,
    };
    let progress = composer.resume(doc)?;
    Ok((composer, progress))
  }

  pub fn is_finished(&self) -> bool {
    !self.open
  }

  /// Continue after a suspension.
  ///
  /// A failing step closes the sequence, keeping the edits made so far, and
  /// drops the remaining steps.
  pub fn resume(&mut self, doc: &mut Document) -> Result<Progress> {
    if !self.open {
      return Ok(Progress::Finished);
    }

    while let Some(step) = self.todo.pop_front() {
      match Self::run(step, doc) {
        Ok(Some(label)) => {
          tracing::trace!(label, pending = self.todo.len(), "composition suspended");
          return Ok(Progress::Suspended(label));
        },
        Ok(None) => {},
        Err(err) => {
          tracing::debug!(error = %err, "composition step failed");
          self.close(doc)?;
          return Err(err);
        },
      }
    }

    self.close(doc)?;
    Ok(Progress::Finished)
  }

  /// Drop the remaining steps. Edits already made stay recorded as one
  /// revision.
  pub fn cancel(mut self, doc: &mut Document) -> Result<()> {
    self.todo.clear();
    self.close(doc)
  }

  fn run(step: Step, doc: &mut Document) -> Result<Option<&'static str>> {
    match step {
      Step::Select(selector) => {
        selectors::select(doc, selector.as_ref())?;
      },
      Step::Edit(edit) => {
        if let Some(operation) = edit(doc)? {
          doc.apply(operation)?;
        }
      },
      Step::Suspend(label) => return Ok(Some(label)),
    }
    Ok(None)
  }

  fn close(&mut self, doc: &mut Document) -> Result<()> {
    if self.open {
      self.open = false;
      doc.end_sequence()?;
    }
    Ok(())
  }
}

/// Collapse to the start of every interval, then wait for a change.
pub fn change_before() -> Vec<Step> {
  vec![
    Step::select(Builtin::EmptyBefore),
    Step::Suspend("change-in-place"),
  ]
}

/// Collapse to the end of every interval, then wait for a change.
pub fn change_after() -> Vec<Step> {
  vec![
    Step::select(Builtin::EmptyAfter),
    Step::Suspend("change-in-place"),
  ]
}

/// Open an indented line below every selected line, then wait for a change.
pub fn open_line_after() -> Vec<Step> {
  vec![
    Step::edit(|doc| open_line(doc, true)),
    Step::select(Builtin::EmptyAfter),
    Step::Suspend("change-in-place"),
  ]
}

/// Open an indented line above every selected line, then wait for a change.
pub fn open_line_before() -> Vec<Step> {
  vec![
    Step::edit(|doc| open_line(doc, false)),
    Step::select(before_line_break),
    Step::Suspend("change-in-place"),
  ]
}

/// Delete the selected text, then wait for a change in its place.
pub fn cut_change() -> Vec<Step> {
  let mut steps = vec![Step::edit(|doc| {
    Operation::new(doc, vec![Tendril::new()], None).map(Some)
  })];
  steps.extend(change_before());
  steps
}

/// Insert a line break plus the line's indentation at the end (or start) of
/// every line holding an interval. Lines holding several intervals open once.
fn open_line(doc: &Document, after: bool) -> operation::Result<Option<Operation>> {
  let text = doc.text();
  let mut lines: Vec<usize> = doc
    .selection()
    .iter()
    .map(|interval| {
      if !after {
        text.char_to_line(interval.beg())
      } else if interval.is_empty() {
        text.char_to_line(interval.end())
      } else {
        text.char_to_line(interval.end() - 1)
      }
    })
    .collect();
  lines.dedup();

  let mut positions = Vec::with_capacity(lines.len());
  let mut content = Vec::with_capacity(lines.len());
  for line in lines {
    let slice = text.line(line);
    let start = text.line_to_char(line);
    let indent: Tendril = slice.chars().take_while(|c| matches!(c, ' ' | '\t')).collect();

    if after {
      let len = slice.len_chars();
      let newline = usize::from(len > 0 && slice.char(len - 1) == '\n');
      let mut new = Tendril::from("\n");
      new.push_str(&indent);
      positions.push(Interval::point(start + len - newline));
      content.push(new);
    } else {
      let mut new = indent;
      new.push('\n');
      positions.push(Interval::point(start));
      content.push(new);
    }
  }

  let selection = Selection::new(positions)?;
  Operation::new(doc, content, Some(selection)).map(Some)
}

/// Collapse every interval to just before its last character.
fn before_line_break(_: &Document, selection: &Selection, _: SelectMode) -> Option<Selection> {
  Selection::new(
    selection
      .iter()
      .map(|interval| Interval::point(interval.end().saturating_sub(1).max(interval.beg()))),
  )
  .ok()
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use ropey::Rope;

  use super::*;
  use crate::{
    change::{
      ChangeInPlace,
      Input,
    },
    document::DocumentId,
  };

  fn doc(text: &str) -> Document {
    let id = DocumentId::new(NonZeroUsize::new(1).unwrap());
    Document::new(id, Rope::from(text))
  }

  fn sel(intervals: &[(usize, usize)]) -> Selection {
    Selection::new(intervals.iter().map(|&(beg, end)| Interval::new(beg, end))).unwrap()
  }

  #[test]
  fn composition_undoes_as_one_revision() {
    let mut doc = doc("one two");
    doc.set_selection(sel(&[(0, 3)])).unwrap();

    let steps = vec![
      Step::insert("<"),
      Step::select(Builtin::EmptyAfter),
      Step::insert(">"),
    ];
    let (composer, progress) = Composer::start(steps, &mut doc).unwrap();

    assert_eq!(progress, Progress::Finished);
    assert!(composer.is_finished());
    assert_eq!(doc.text().to_string(), "<one> two");
    assert_eq!(doc.history().len(), 2);

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "one two");
  }

  #[test]
  fn suspend_and_resume_around_a_change() {
    let mut doc = doc("ab cd");
    doc.set_selection(sel(&[(0, 2), (3, 5)])).unwrap();

    let (mut composer, progress) = Composer::start(change_after(), &mut doc).unwrap();
    assert_eq!(progress, Progress::Suspended("change-in-place"));
    assert!(doc.history().is_recording());

    let mut change = ChangeInPlace::start(&mut doc).unwrap();
    change.insert(&mut doc, Input::Char('!')).unwrap();
    change.finish(&mut doc).unwrap();

    assert_eq!(composer.resume(&mut doc).unwrap(), Progress::Finished);
    assert!(!doc.history().is_recording());
    assert_eq!(doc.text().to_string(), "ab! cd!");

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "ab cd");
  }

  #[test]
  fn selector_without_result_is_skipped() {
    let mut doc = doc("word");
    doc.set_selection(sel(&[(0, 4)])).unwrap();

    let steps = vec![Step::select(Builtin::NextWord), Step::insert("-")];
    Composer::start(steps, &mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "-word");
  }

  #[test]
  fn failing_step_closes_the_sequence() {
    let mut doc = doc("abc");
    let steps = vec![
      Step::insert("x"),
      Step::edit(|doc| {
        let outside = sel(&[(0, doc.text().len_chars() + 1)]);
        Operation::new(doc, vec!["y".into()], Some(outside)).map(Some)
      }),
      Step::insert("z"),
    ];

    assert!(Composer::start(steps, &mut doc).is_err());
    assert!(!doc.history().is_recording());
    assert_eq!(doc.text().to_string(), "xabc");
  }

  #[test]
  fn cancel_keeps_finished_edits() {
    let mut doc = doc("abc");
    let steps = vec![Step::insert("x"), Step::Suspend("wait"), Step::insert("y")];

    let (composer, _) = Composer::start(steps, &mut doc).unwrap();
    composer.cancel(&mut doc).unwrap();

    assert_eq!(doc.text().to_string(), "xabc");
    assert!(!doc.history().is_recording());
    assert_eq!(doc.history().len(), 2);
  }

  fn type_char(doc: &mut Document, ch: char) {
    let mut change = ChangeInPlace::start(doc).unwrap();
    change.insert(doc, Input::Char(ch)).unwrap();
    change.finish(doc).unwrap();
  }

  #[test]
  fn open_line_after_keeps_indent() {
    let mut doc = doc("fn main() {\n    body\n}\n");
    // Both cursors sit on the same line, which opens once.
    doc.set_selection(sel(&[(14, 14), (18, 18)])).unwrap();

    let (mut composer, progress) = Composer::start(open_line_after(), &mut doc).unwrap();
    assert_eq!(progress, Progress::Suspended("change-in-place"));
    assert_eq!(doc.text().to_string(), "fn main() {\n    body\n    \n}\n");
    assert_eq!(doc.selection(), &Selection::point(25));

    type_char(&mut doc, 'x');
    assert_eq!(composer.resume(&mut doc).unwrap(), Progress::Finished);
    assert_eq!(doc.text().to_string(), "fn main() {\n    body\n    x\n}\n");

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "fn main() {\n    body\n}\n");
  }

  #[test]
  fn open_line_after_selected_full_line() {
    let mut doc = doc("\tone\ntwo");
    doc.set_selection(sel(&[(0, 5)])).unwrap();

    Composer::start(open_line_after(), &mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "\tone\n\t\ntwo");
    assert_eq!(doc.selection(), &Selection::point(6));
  }

  #[test]
  fn open_line_before_keeps_indent() {
    let mut doc = doc("fn main() {\n    body\n}\n");
    doc.set_selection(sel(&[(18, 18)])).unwrap();

    let (mut composer, _) = Composer::start(open_line_before(), &mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "fn main() {\n    \n    body\n}\n");
    assert_eq!(doc.selection(), &Selection::point(16));

    type_char(&mut doc, 'x');
    composer.resume(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "fn main() {\n    x\n    body\n}\n");
  }

  #[test]
  fn open_line_before_first_line() {
    let mut doc = doc("ab\ncd");
    doc.set_selection(sel(&[(1, 1), (4, 4)])).unwrap();

    Composer::start(open_line_before(), &mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "\nab\n\ncd");
    assert_eq!(doc.selection(), &sel(&[(0, 0), (4, 4)]));
  }

  #[test]
  fn cut_change_replaces_selection() {
    let mut doc = doc("one two three");
    doc.set_selection(sel(&[(0, 4), (8, 13)])).unwrap();

    let (mut composer, progress) = Composer::start(cut_change(), &mut doc).unwrap();
    assert_eq!(progress, Progress::Suspended("change-in-place"));
    assert_eq!(doc.text().to_string(), "two ");

    type_char(&mut doc, '_');
    composer.resume(&mut doc).unwrap();
    assert_eq!(doc.text().to_string(), "_two _");

    assert!(doc.undo().unwrap());
    assert_eq!(doc.text().to_string(), "one two three");
  }
}
