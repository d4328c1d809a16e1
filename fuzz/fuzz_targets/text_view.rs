#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use the_core::interval::Interval;
use the_lib::{
  conceal::{
    PatternConceal,
    Substitution,
  },
  text_view::TextView,
};

use crate::common::{
  ByteCursor,
  check_view,
  lossy_text,
  session_from_bytes,
};

const MAX_SUBSTITUTIONS: usize = 32;

fuzz_target!(|data: &[u8]| {
  let (mut doc, _) = session_from_bytes(data);
  let len = doc.text().len_chars();
  let mut cursor = ByteCursor::new(data);

  let count = cursor.next_usize(MAX_SUBSTITUTIONS);
  for _ in 0..count {
    let beg = (cursor.next_u16() as usize).min(len);
    let end = (beg + cursor.next_u8() as usize % 16).min(len);
    let replacement_len = cursor.next_usize(8);
    let replacement = lossy_text(cursor.next_bytes(replacement_len));
    // Overlapping substitutions are rejected; that is fine here.
    let _ = doc
      .conceal_mut()
      .insert_global(Substitution::new(Interval::new(beg, end), replacement));
  }
  if cursor.next_u8() % 2 == 0
    && let Ok(tabs) = PatternConceal::new(r"\t", "»   ")
  {
    doc.conceal_mut().register_local(Box::new(tabs));
  }

  let width = cursor.next_u8() as usize % 120 + 1;
  let height = cursor.next_u8() as usize % 60 + 1;
  let offset = (cursor.next_u16() as usize).min(len);
  if let Ok(view) = TextView::for_screen(&doc, width, height, offset) {
    check_view(&doc, &view, height);
  }
  if let Ok(view) = TextView::for_entire_text(&doc, width) {
    assert_eq!(view.orig_range(), Interval::new(0, len));
  }
});
