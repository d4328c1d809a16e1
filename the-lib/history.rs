//! Branching undo history.
//!
//! The history is a tree of revisions. The root is the state the document
//! was created in; every other revision has a parent and holds the
//! [`Operation`]s that lead from the parent to itself. Children are kept in
//! creation order, so undoing and then making a new edit opens a new branch
//! instead of discarding the old one.
//!
//! ```text
//!        root
//!        /  \
//!       1    3      <- redo(None) from root goes to 3, redo(Some(0)) to 1
//!       |
//!       2
//! ```
//!
//! # Sequences
//!
//! Between [`History::start_sequence`] and [`History::end_sequence`] all
//! added operations are gathered into a single revision, so a composed
//! command undoes in one step. Sequences nest; only the outermost
//! `end_sequence` commits, and an empty sequence commits nothing. Undo and
//! redo are refused while a sequence is open.
//!
//! # Jumps
//!
//! Navigation does not touch the history directly. [`History::undo`] and
//! [`History::redo`] return a [`HistoryJump`] describing the operations to
//! replay; the caller applies them to the document and only then calls
//! [`History::apply_jump`]. A failure while replaying leaves the history
//! where it was.

use thiserror::Error;

use crate::operation::Operation;

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur during history operations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryError {
  #[error("cannot {action} while a sequence of operations is being recorded")]
  SequenceOpen { action: &'static str },
  #[error("cannot end sequence: no sequence is open")]
  NoSequence,
  #[error("branch index {index} is out of bounds ({len} branches)")]
  BranchOutOfBounds { index: usize, len: usize },
  #[error("revision index {index} is out of bounds (max: {max})")]
  RevisionOutOfBounds { index: usize, max: usize },
}

/// One operation to replay as part of a [`HistoryJump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpStep {
  Undo(Operation),
  Redo(Operation),
}

/// A pending move through the history that has not been applied yet.
#[derive(Debug, Clone)]
pub struct HistoryJump {
  /// Operations to replay, in order.
  pub steps:   Vec<JumpStep>,
  /// Revision the history moves to once the steps are replayed.
  pub target:  usize,
  /// Revision removed from the tree by a hard undo.
  pub discard: Option<usize>,
}

impl HistoryJump {
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.steps.len()
  }
}

#[derive(Debug, Clone)]
struct Revision {
  parent:     usize,
  children:   Vec<usize>,
  operations: Vec<Operation>,
}

#[derive(Debug, Default)]
struct Sequence {
  depth:      usize,
  operations: Vec<Operation>,
}

#[derive(Debug)]
pub struct History {
  revisions: Vec<Revision>,
  current:   usize,
  sequence:  Option<Sequence>,
}

impl Default for History {
  fn default() -> Self {
    Self {
      revisions: vec![Revision {
        parent:     0,
        children:   Vec::new(),
        operations: Vec::new(),
      }],
      current:   0,
      sequence:  None,
    }
  }
}

impl History {
  /// Record an operation that has already been applied to the document.
  pub fn add(&mut self, operation: Operation) {
    if let Some(sequence) = self.sequence.as_mut() {
      sequence.operations.push(operation);
      return;
    }
    self.commit(vec![operation]);
  }

  fn commit(&mut self, operations: Vec<Operation>) {
    let index = self.revisions.len();
    self.revisions.push(Revision {
      parent: self.current,
      children: Vec::new(),
      operations,
    });
    self.revisions[self.current].children.push(index);
    tracing::debug!(
      revision = index,
      parent = self.current,
      "commit revision"
    );
    self.current = index;
  }

  pub fn start_sequence(&mut self) {
    self.sequence.get_or_insert_with(Sequence::default).depth += 1;
  }

  pub fn end_sequence(&mut self) -> Result<()> {
    let Some(sequence) = self.sequence.as_mut() else {
      tracing::warn!("end_sequence without an open sequence");
      return Err(HistoryError::NoSequence);
    };

    sequence.depth -= 1;
    if sequence.depth > 0 {
      return Ok(());
    }

    if let Some(sequence) = self.sequence.take() {
      if !sequence.operations.is_empty() {
        self.commit(sequence.operations);
      }
    }
    Ok(())
  }

  #[inline]
  pub fn is_recording(&self) -> bool {
    self.sequence.is_some()
  }

  #[inline]
  pub fn current_revision(&self) -> usize {
    self.current
  }

  #[inline]
  pub const fn at_root(&self) -> bool {
    self.current == 0
  }

  /// Number of revisions, including the root and detached ones.
  #[inline]
  pub fn len(&self) -> usize {
    self.revisions.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.revisions.len() <= 1
  }

  /// Position of the current revision among its siblings.
  pub fn current_child_index(&self) -> usize {
    if self.at_root() {
      return 0;
    }
    let parent = &self.revisions[self.revisions[self.current].parent];
    parent
      .children
      .iter()
      .position(|&child| child == self.current)
      .unwrap_or(0)
  }

  /// Number of revisions sharing the current revision's parent.
  pub fn sibling_count(&self) -> usize {
    if self.at_root() {
      return 1;
    }
    self.revisions[self.revisions[self.current].parent]
      .children
      .len()
  }

  /// Number of branches leading out of the current revision.
  pub fn child_count(&self) -> usize {
    self.revisions[self.current].children.len()
  }

  fn ensure_idle(&self, action: &'static str) -> Result<()> {
    if self.sequence.is_some() {
      tracing::warn!(action, "history navigation during an open sequence");
      return Err(HistoryError::SequenceOpen { action });
    }
    Ok(())
  }

  fn validate_revision(&self, revision: usize) -> Result<()> {
    if revision >= self.revisions.len() {
      return Err(HistoryError::RevisionOutOfBounds {
        index: revision,
        max:   self.revisions.len().saturating_sub(1),
      });
    }
    Ok(())
  }

  fn undo_jump(&self, discard: bool) -> Option<HistoryJump> {
    if self.at_root() {
      return None;
    }
    let revision = &self.revisions[self.current];
    Some(HistoryJump {
      steps:   revision
        .operations
        .iter()
        .rev()
        .cloned()
        .map(JumpStep::Undo)
        .collect(),
      target:  revision.parent,
      discard: discard.then_some(self.current),
    })
  }

  /// Undo the current revision, moving to its parent. `None` at the root.
  pub fn undo(&self) -> Result<Option<HistoryJump>> {
    self.ensure_idle("undo")?;
    Ok(self.undo_jump(false))
  }

  /// Like [`History::undo`], but the undone revision is removed from the
  /// tree and cannot be redone. Used to retract previews.
  pub fn hard_undo(&self) -> Result<Option<HistoryJump>> {
    self.ensure_idle("hard undo")?;
    Ok(self.undo_jump(true))
  }

  /// Redo into the child at `child_index`, or the most recent child when
  /// `None`. `None` is returned when the current revision has no children.
  pub fn redo(&self, child_index: Option<usize>) -> Result<Option<HistoryJump>> {
    self.ensure_idle("redo")?;

    let children = &self.revisions[self.current].children;
    if children.is_empty() {
      return Ok(None);
    }
    let index = child_index.unwrap_or(children.len() - 1);
    let Some(&target) = children.get(index) else {
      return Err(HistoryError::BranchOutOfBounds {
        index,
        len: children.len(),
      });
    };

    Ok(Some(HistoryJump {
      steps: self.revisions[target]
        .operations
        .iter()
        .cloned()
        .map(JumpStep::Redo)
        .collect(),
      target,
      discard: None,
    }))
  }

  /// Move the history to the target of a jump whose steps were applied.
  pub fn apply_jump(&mut self, jump: &HistoryJump) -> Result<()> {
    self.validate_revision(jump.target)?;

    if let Some(discard) = jump.discard {
      self.validate_revision(discard)?;
      let parent = self.revisions[discard].parent;
      self.revisions[parent].children.retain(|&child| child != discard);
      if discard + 1 == self.revisions.len() && self.revisions[discard].children.is_empty() {
        self.revisions.pop();
      }
    }

    tracing::debug!(from = self.current, to = jump.target, "history jump");
    self.current = jump.target;
    Ok(())
  }
}
