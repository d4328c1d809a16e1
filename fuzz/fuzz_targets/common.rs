use std::num::NonZeroUsize;

use ropey::Rope;
use the_core::interval::Interval;
use the_lib::{
  Tendril,
  document::{
    Document,
    DocumentId,
  },
  mode::SelectMode,
  operation::Operation,
  selection::Selection,
  selectors::{
    self,
    Builtin,
  },
  text_view::TextView,
};

const MAX_INITIAL_BYTES: usize = 4 * 1024;
const MAX_COMMANDS: usize = 128;
const MAX_INSERT_BYTES: usize = 64;
const MAX_INTERVALS: usize = 16;

const SELECTORS: &[Builtin] = &[
  Builtin::Everything,
  Builtin::SingleInterval,
  Builtin::Empty,
  Builtin::Join,
  Builtin::Complement,
  Builtin::EmptyBefore,
  Builtin::EmptyAfter,
  Builtin::Around,
  Builtin::NextChar,
  Builtin::PreviousChar,
  Builtin::NextWord,
  Builtin::PreviousWord,
  Builtin::NextLine,
  Builtin::PreviousLine,
  Builtin::NextFullLine,
  Builtin::PreviousFullLine,
  Builtin::NextParagraph,
  Builtin::PreviousParagraph,
  Builtin::NextWhiteSpace,
  Builtin::PreviousWhiteSpace,
  Builtin::Indent,
];

const MODES: [SelectMode; 3] = [SelectMode::Normal, SelectMode::Extend, SelectMode::Reduce];

#[derive(Debug, Clone)]
pub enum Command {
  /// Intervals as `(gap, len)` pairs laid out from the start of the text.
  Select(Vec<(u16, u16)>),
  Selector { index: u8, mode: u8 },
  Replace(Vec<Vec<u8>>),
  Undo,
  Redo,
  HardUndo,
  View { width: u8, height: u8, offset: u16 },
}

pub fn session_from_bytes(data: &[u8]) -> (Document, Vec<Command>) {
  let mut cursor = ByteCursor::new(data);
  let initial_len = cursor.next_usize(MAX_INITIAL_BYTES);
  let initial = lossy_text(cursor.next_bytes(initial_len));

  let count = cursor.next_usize(MAX_COMMANDS);
  let commands = (0..count).map(|_| decode_command(&mut cursor)).collect();

  let id = DocumentId::new(NonZeroUsize::MIN);
  (Document::new(id, Rope::from_str(&initial)), commands)
}

/// Run `command`, checking that edits undo and redo exactly.
pub fn run(doc: &mut Document, command: &Command) {
  match command {
    Command::Select(pairs) => {
      let len = doc.text().len_chars();
      let mut pos = 0;
      let mut intervals = Vec::with_capacity(pairs.len());
      for &(gap, span) in pairs {
        let beg = (pos + gap as usize).min(len);
        let end = (beg + span as usize).min(len);
        intervals.push(Interval::new(beg, end));
        pos = end;
      }
      if let Ok(selection) = Selection::new(intervals) {
        doc.set_selection(selection).expect("clamped selection fits the text");
      }
    },
    Command::Selector { index, mode } => {
      let selector = SELECTORS[*index as usize % SELECTORS.len()];
      doc.set_select_mode(MODES[*mode as usize % MODES.len()]);
      selectors::select(doc, &selector).expect("selector result fits the text");
    },
    Command::Replace(content) => {
      let before = (doc.text().clone(), doc.selection().clone());
      let content: Vec<Tendril> = content.iter().map(|bytes| lossy_text(bytes).into()).collect();
      let op = Operation::new(doc, content, None).expect("document selection fits the text");
      doc.apply(op.clone()).expect("operation applies to its own document");
      let after = (doc.text().clone(), doc.selection().clone());

      assert!(doc.undo().expect("undo outside a sequence"));
      assert_eq!(doc.text(), &before.0);
      assert_eq!(doc.selection(), &before.1);

      assert!(doc.redo().expect("redo outside a sequence"));
      assert_eq!(doc.text(), &after.0);
      assert_eq!(doc.selection(), &after.1);
      assert_eq!(doc.selection(), op.new_selection());
    },
    Command::Undo => {
      doc.undo().expect("undo outside a sequence");
    },
    Command::Redo => {
      doc.redo().expect("redo outside a sequence");
    },
    Command::HardUndo => {
      doc.hard_undo().expect("hard undo outside a sequence");
    },
    Command::View {
      width,
      height,
      offset,
    } => {
      let len = doc.text().len_chars();
      let width = *width as usize % 120 + 1;
      let height = *height as usize % 60 + 1;
      let offset = (*offset as usize).min(len);
      let view = TextView::for_screen(doc, width, height, offset).expect("valid view arguments");
      check_view(doc, &view, height);
    },
  }

  doc
    .selection()
    .validate(doc.text().len_chars())
    .expect("selection always fits the text");
}

pub fn check_view(doc: &Document, view: &TextView, height: usize) {
  let lines = view.text_as_lines();
  assert!(lines.len() <= height);
  if doc.conceal().is_empty() && view.orig_range().end() < doc.text().len_chars() {
    assert_eq!(lines.len(), height);
  }

  let range = view.orig_range();
  let mut last = 0;
  for pos in range.beg()..=range.end() {
    let vpos = view.orig_to_view(pos).expect("covered position maps into the view");
    assert!(vpos >= last);
    assert!(vpos <= view.view_len());
    last = vpos;
  }
  let mut last = range.beg();
  for vpos in 0..=view.view_len() {
    let pos = view.view_to_orig(vpos).expect("view position maps back");
    assert!(pos >= last);
    assert!(pos <= range.end());
    last = pos;
  }
  assert_eq!(view.highlighting().len(), view.view_len());
}

fn decode_command(cursor: &mut ByteCursor) -> Command {
  match cursor.next_u8() % 8 {
    0 => {
      let count = cursor.next_usize(MAX_INTERVALS).max(1);
      Command::Select(
        (0..count)
          .map(|_| (cursor.next_u16() % 256, cursor.next_u16() % 64))
          .collect(),
      )
    },
    1 | 2 => Command::Selector {
      index: cursor.next_u8(),
      mode:  cursor.next_u8(),
    },
    3 => {
      let count = cursor.next_usize(4);
      Command::Replace(
        (0..count)
          .map(|_| {
            let len = cursor.next_usize(MAX_INSERT_BYTES);
            cursor.next_bytes(len).to_vec()
          })
          .collect(),
      )
    },
    4 => Command::Undo,
    5 => Command::Redo,
    6 => Command::HardUndo,
    _ => Command::View {
      width:  cursor.next_u8(),
      height: cursor.next_u8(),
      offset: cursor.next_u16(),
    },
  }
}

pub fn lossy_text(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

pub struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  pub fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  pub fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  pub fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  pub fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = end;
    &self.data[start..end]
  }
}
