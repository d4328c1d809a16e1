//! Document state and edit API.
//!
//! A [`Document`] owns everything an edit touches: the text buffer, the
//! selection, the selection mode, the undo history, the concealment registry
//! and the highlighting consumed by views. It is passed by reference into
//! every operation; there is no ambient state.
//!
//! # Design
//!
//! - Text and selection change together through [`Operation`]s, never one
//!   without the other.
//! - Every change bumps the version and queues a [`DocumentEvent`] for the
//!   UI and save layers.
//! - History navigation replays operations on a copy of the text and swaps
//!   the result in only once every step succeeded.
//!
//! # Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//!
//! use ropey::Rope;
//! use the_lib::{
//!   document::{
//!     Document,
//!     DocumentId,
//!   },
//!   operation::Operation,
//! };
//!
//! let id = DocumentId::new(NonZeroUsize::new(1).unwrap());
//! let mut doc = Document::new(id, Rope::from("hello"));
//!
//! let op = Operation::new(&doc, vec!["hi".into()], None).unwrap();
//! doc.apply(op).unwrap();
//! doc.undo().unwrap();
//! ```

use std::{
  collections::HashMap,
  num::NonZeroUsize,
};

use ropey::Rope;
use serde::{
  Deserialize,
  Serialize,
};
use the_core::interval::Interval;
use thiserror::Error;

use crate::{
  Tendril,
  conceal::Conceal,
  config::DocumentConfig,
  event::{
    DocumentEvent,
    DocumentEventKind,
    EventQueue,
  },
  history::{
    History,
    HistoryError,
    HistoryJump,
    JumpStep,
  },
  mode::SelectMode,
  operation::{
    Operation,
    OperationError,
  },
  selection::{
    Selection,
    SelectionError,
  },
};

/// Sparse map from original text position to a highlighting annotation.
pub type Highlighting = HashMap<usize, Tendril>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(NonZeroUsize);

impl DocumentId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for DocumentId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFlags {
  /// Changed since the last save or reload.
  pub modified: bool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
  #[error(transparent)]
  Operation(#[from] OperationError),
  #[error(transparent)]
  Selection(#[from] SelectionError),
  #[error(transparent)]
  History(#[from] HistoryError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug)]
pub struct Document {
  id:           DocumentId,
  text:         Rope,
  selection:    Selection,
  select_mode:  SelectMode,
  flags:        DocumentFlags,
  version:      u64,
  history:      History,
  conceal:      Conceal,
  highlighting: Highlighting,
  config:       DocumentConfig,
  events:       EventQueue,
}

impl Document {
  pub fn new(id: DocumentId, text: Rope) -> Self {
    Self {
      id,
      text,
      selection: Selection::point(0),
      select_mode: SelectMode::Normal,
      flags: DocumentFlags::default(),
      version: 0,
      history: History::default(),
      conceal: Conceal::default(),
      highlighting: Highlighting::new(),
      config: DocumentConfig::default(),
      events: EventQueue::default(),
    }
  }

  #[must_use]
  pub fn with_config(mut self, config: DocumentConfig) -> Self {
    self.config = config;
    self
  }

  pub fn id(&self) -> DocumentId {
    self.id
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  /// Replace the selection. It must fit the current text.
  pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
    selection.validate(self.text.len_chars())?;
    self.selection = selection;
    Ok(())
  }

  pub fn select_mode(&self) -> SelectMode {
    self.select_mode
  }

  pub fn set_select_mode(&mut self, mode: SelectMode) {
    self.select_mode = mode;
  }

  pub fn flags(&self) -> DocumentFlags {
    self.flags
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn conceal(&self) -> &Conceal {
    &self.conceal
  }

  pub fn conceal_mut(&mut self) -> &mut Conceal {
    &mut self.conceal
  }

  pub fn highlighting(&self) -> &Highlighting {
    &self.highlighting
  }

  pub fn set_highlighting(&mut self, highlighting: Highlighting) {
    self.highlighting = highlighting;
  }

  pub fn config(&self) -> &DocumentConfig {
    &self.config
  }

  pub fn set_config(&mut self, config: DocumentConfig) {
    self.config = config;
  }

  pub fn drain_events(&mut self) -> impl Iterator<Item = DocumentEvent> + '_ {
    self.events.drain()
  }

  pub fn events(&self) -> &EventQueue {
    &self.events
  }

  /// Events newer than `seq` without draining them. See
  /// [`EventQueue::events_since`].
  pub fn events_since(&self, seq: u64) -> Option<Vec<DocumentEvent>> {
    self.events.events_since(seq)
  }

  /// Swap in a new text and selection as one step.
  pub(crate) fn replace_state(&mut self, text: Rope, selection: Selection) {
    debug_assert!(selection.validate(text.len_chars()).is_ok());
    self.text = text;
    self.selection = selection;
    if self.select_mode.is_submode() {
      tracing::trace!(mode = ?self.select_mode, "edit leaves select submode");
      self.select_mode = SelectMode::Normal;
    }
    self.version = self.version.saturating_add(1);
    self.events.push(self.id, DocumentEventKind::TextChanged {
      version: self.version,
    });

    if !self.flags.modified {
      self.flags.modified = true;
      self
        .events
        .push(self.id, DocumentEventKind::SavedStateChanged { saved: false });
    }
  }

  /// Apply an operation and record it in the history.
  pub fn apply(&mut self, operation: Operation) -> Result<()> {
    operation.apply(self)?;
    self.history.add(operation);
    Ok(())
  }

  /// Apply an operation without recording it. Reverse it with
  /// [`Operation::undo`].
  pub fn preview(&mut self, operation: &Operation) -> Result<()> {
    operation.apply(self)?;
    Ok(())
  }

  pub fn start_sequence(&mut self) {
    self.history.start_sequence();
  }

  pub fn end_sequence(&mut self) -> Result<()> {
    self.history.end_sequence()?;
    Ok(())
  }

  pub fn undo(&mut self) -> Result<bool> {
    let Some(jump) = self.history.undo()? else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  /// Redo into the most recent branch.
  pub fn redo(&mut self) -> Result<bool> {
    let Some(jump) = self.history.redo(None)? else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  /// Redo into the branch at `child_index`.
  pub fn redo_branch(&mut self, child_index: usize) -> Result<bool> {
    let Some(jump) = self.history.redo(Some(child_index))? else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  /// Undo and forget the current revision.
  pub fn hard_undo(&mut self) -> Result<bool> {
    let Some(jump) = self.history.hard_undo()? else {
      return Ok(false);
    };
    self.apply_history_jump(&jump)?;
    Ok(true)
  }

  /// Move to the sibling revision at `index`, clamped to the existing
  /// siblings. Returns `false` at the root, which has no siblings.
  pub fn switch_branch(&mut self, index: usize) -> Result<bool> {
    if self.history.at_root() {
      return Ok(false);
    }
    self.undo()?;
    let index = index.min(self.history.child_count().saturating_sub(1));
    self.redo_branch(index)
  }

  fn apply_history_jump(&mut self, jump: &HistoryJump) -> Result<()> {
    let mut text = self.text.clone();
    let mut selection = self.selection.clone();
    for step in &jump.steps {
      (text, selection) = match step {
        JumpStep::Undo(operation) => operation.backward(&text)?,
        JumpStep::Redo(operation) => operation.forward(&text)?,
      };
    }

    self.history.apply_jump(jump)?;
    if !jump.is_empty() {
      self.replace_state(text, selection);
    }
    Ok(())
  }

  /// Replace the whole text, as after reading the file again. The change is
  /// recorded as one undoable operation; the previous selection is kept,
  /// clipped to the new text, and the document counts as saved.
  pub fn reload_text(&mut self, text: &str) -> Result<()> {
    let previous = self.selection.clone();
    let everything = Selection::single(Interval::new(0, self.text.len_chars()));
    let operation = Operation::new(self, vec![text.into()], Some(everything))?;
    self.apply(operation)?;

    self.selection = previous.bound(0, self.text.len_chars());
    self.mark_saved();
    tracing::debug!(document = ?self.id, version = self.version, "reloaded text");
    Ok(())
  }

  pub fn mark_saved(&mut self) {
    if self.flags.modified {
      self.flags.modified = false;
      self
        .events
        .push(self.id, DocumentEventKind::SavedStateChanged { saved: true });
    }
  }
}
