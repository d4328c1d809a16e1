//! Notifications a [`Document`](crate::document::Document) emits when its
//! text or saved state changes.
//!
//! Every event carries a sequence number. A listener that keeps the last
//! number it saw can poll [`EventQueue::events_since`] instead of draining
//! the queue, and learns when it fell too far behind.

use std::collections::VecDeque;

use serde::{
  Deserialize,
  Serialize,
};

use crate::document::DocumentId;

pub const DEFAULT_EVENT_LIMIT: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentEventKind {
  /// Text and selection were replaced; `version` is the new document version.
  TextChanged { version: u64 },
  /// The document went from saved to unsaved or back.
  SavedStateChanged { saved: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
  pub seq:      u64,
  pub document: DocumentId,
  #[serde(flatten)]
  pub kind:     DocumentEventKind,
}

/// Bounded queue of notifications a document emits for the UI and save
/// layers. The oldest events are dropped once `limit` is exceeded.
#[derive(Debug, Clone)]
pub struct EventQueue {
  events:   VecDeque<DocumentEvent>,
  next_seq: u64,
  limit:    usize,
}

impl Default for EventQueue {
  fn default() -> Self {
    Self::with_limit(DEFAULT_EVENT_LIMIT)
  }
}

impl EventQueue {
  pub fn with_limit(limit: usize) -> Self {
    Self {
      events:   VecDeque::new(),
      next_seq: 1,
      limit:    limit.max(1),
    }
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn latest_seq(&self) -> u64 {
    self.next_seq.saturating_sub(1)
  }

  pub fn oldest_seq(&self) -> u64 {
    self
      .events
      .front()
      .map(|event| event.seq)
      .unwrap_or(self.next_seq)
  }

  /// Events newer than `seq`. Returns `None` when some of them were already
  /// dropped or drained, so the caller has to resynchronise.
  pub fn events_since(&self, seq: u64) -> Option<Vec<DocumentEvent>> {
    if seq >= self.latest_seq() {
      return Some(Vec::new());
    }
    if seq.saturating_add(1) < self.oldest_seq() {
      return None;
    }
    Some(
      self
        .events
        .iter()
        .filter(|event| event.seq > seq)
        .cloned()
        .collect(),
    )
  }

  pub fn push(&mut self, document: DocumentId, kind: DocumentEventKind) {
    let event = DocumentEvent {
      seq: self.next_seq,
      document,
      kind,
    };
    self.next_seq = self.next_seq.saturating_add(1);
    self.events.push_back(event);
    while self.events.len() > self.limit {
      self.events.pop_front();
    }
  }

  pub fn drain(&mut self) -> impl Iterator<Item = DocumentEvent> + '_ {
    self.events.drain(..)
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;

  fn id() -> DocumentId {
    DocumentId::new(NonZeroUsize::new(7).unwrap())
  }

  #[test]
  fn events_are_sequenced_and_bounded() {
    let mut queue = EventQueue::with_limit(2);
    for version in 1..=3 {
      queue.push(id(), DocumentEventKind::TextChanged { version });
    }

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.oldest_seq(), 2);
    assert_eq!(queue.latest_seq(), 3);
    assert_eq!(queue.events_since(2).map(|events| events.len()), Some(1));

    let drained: Vec<_> = queue.drain().collect();
    assert_eq!(drained[1].kind, DocumentEventKind::TextChanged { version: 3 });
    assert!(queue.is_empty());
    assert_eq!(queue.oldest_seq(), 4);
  }

  #[test]
  fn events_since_reports_gaps() {
    let mut queue = EventQueue::with_limit(2);
    assert_eq!(queue.events_since(0), Some(vec![]));

    for version in 1..=3 {
      queue.push(id(), DocumentEventKind::TextChanged { version });
    }
    // Event 1 was dropped by the limit.
    assert_eq!(queue.events_since(0), None);
    let seqs: Vec<_> = queue
      .events_since(1)
      .unwrap()
      .into_iter()
      .map(|event| event.seq)
      .collect();
    assert_eq!(seqs, vec![2, 3]);
    assert_eq!(queue.events_since(3), Some(vec![]));

    queue.drain().for_each(drop);
    assert_eq!(queue.events_since(2), None);
    assert_eq!(queue.events_since(3), Some(vec![]));
  }

  #[test]
  fn event_serializes_flat() {
    let event = DocumentEvent {
      seq:      1,
      document: id(),
      kind:     DocumentEventKind::SavedStateChanged { saved: true },
    };
    let value = toml::Value::try_from(&event).unwrap();
    let table = value.as_table().unwrap();
    assert_eq!(table["kind"].as_str(), Some("saved_state_changed"));
    assert_eq!(table["saved"].as_bool(), Some(true));
    assert_eq!(table["document"].as_integer(), Some(7));
  }
}
