//! Projection of a document onto a bounded viewport.
//!
//! A [`TextView`] holds the text a UI draws for one screen: the document's
//! text from some offset on, with concealment substitutions applied, wrapped
//! at a fixed width and cut to exactly the rows that fit. Alongside the text
//! it carries the selection and highlighting translated into view
//! coordinates, and two position maps between the coordinate spaces.
//!
//! # Coordinates
//!
//! Original positions index the document text; view positions index the
//! rendered text. A concealed span of `olength` original characters rendered
//! as a replacement of `vlength` characters maps all of its original
//! positions to the view position where the replacement starts, and all
//! view positions of the replacement back to the start of the span:
//!
//! ```text
//! original: s a y :   h e l l o   t h e r e
//!           0 1 2 3 4 5 6 7 8 9 ...
//! view:     s a y :   … _ t h e r e          (5..10 concealed as "…")
//!
//! orig_to_view: 0 1 2 3 4 5 5 5 5 5 6 7 ...
//! view_to_orig: 0 1 2 3 4 5 10 11 ...
//! ```
//!
//! Both maps carry one trailing sentinel so the exclusive end of an interval
//! maps like any other position.
//!
//! # Sampling
//!
//! Replacements may be shorter or longer than what they conceal, so the
//! amount of original text needed to fill a screen is not known up front.
//! [`TextView::for_screen`] renders a sample of original text starting at one
//! character, doubles it until the rendered text holds more rows than fit
//! (or the text runs out), and then snaps text and maps down to exactly
//! `height` rows. The sample never grows past the rest of the text, so the
//! loop runs at most `log2(len)` times whatever the substitutions look like.
//!
//! Building a view borrows the document for the whole construction, so the
//! text, selection, concealment and highlighting it reads are one snapshot.

use std::iter;

use the_core::{
  interval::Interval,
  wrap::{
    end_of_wrapped_line,
    move_n_wrapped_lines_down,
    wrap_text,
    wrapped_lines,
  },
};
use thiserror::Error;

use crate::{
  Tendril,
  document::Document,
  selection::Selection,
};

pub type Result<T> = std::result::Result<T, TextViewError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TextViewError {
  #[error("view width must be positive")]
  InvalidWidth,
  #[error("view height must be positive")]
  InvalidHeight,
  #[error("offset {offset} is outside text of length {len}")]
  InvalidOffset { offset: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextView {
  width:        usize,
  height:       Option<usize>,
  offset:       usize,
  text:         String,
  view_len:     usize,
  selection:    Option<Selection>,
  highlighting: Vec<Tendril>,
  /// Indexed by original position minus `offset`.
  orig_to_view: Vec<usize>,
  /// Indexed by view position; holds absolute original positions.
  view_to_orig: Vec<usize>,
}

/// Rendered original text with its position maps, before snapping.
struct Sample {
  text:         String,
  view_len:     usize,
  orig_to_view: Vec<usize>,
  view_to_orig: Vec<usize>,
  /// Original position the rendering stopped at. A substitution crossing the
  /// end of the sample is rendered whole, so this may lie past it.
  orig_end:     usize,
  concealed:    bool,
}

impl Sample {
  fn empty(offset: usize) -> Self {
    Self {
      text:         String::new(),
      view_len:     0,
      orig_to_view: vec![0],
      view_to_orig: vec![offset],
      orig_end:     offset,
      concealed:    false,
    }
  }

  /// Render original text `[beg, beg + len)`.
  fn build(doc: &Document, beg: usize, len: usize) -> Self {
    let text = doc.text().slice(..);
    let end = (beg + len).min(text.len_chars());
    let substitutions = doc.conceal().substitutions(text, Interval::new(beg, end));

    let mut rendered = String::new();
    let mut orig_to_view = Vec::with_capacity(end - beg + 1);
    let mut view_to_orig = Vec::with_capacity(end - beg + 1);
    let mut concealed = false;

    let mut opos = beg;
    let mut vpos = 0;
    let mut substitutions = substitutions.into_iter().peekable();
    while opos < end {
      if let Some(sub) = substitutions.next_if(|sub| sub.interval.beg() <= opos) {
        let olength = sub.interval.end().saturating_sub(opos);
        let vlength = sub.replacement.chars().count();
        orig_to_view.extend(iter::repeat_n(vpos, olength));
        view_to_orig.extend(iter::repeat_n(opos, vlength));
        rendered.push_str(&sub.replacement);
        concealed = true;
        vpos += vlength;
        opos += olength;
        continue;
      }

      let next = substitutions
        .peek()
        .map_or(end, |sub| sub.interval.beg().min(end));
      orig_to_view.extend(vpos..vpos + (next - opos));
      view_to_orig.extend(opos..next);
      for chunk in text.slice(opos..next).chunks() {
        rendered.push_str(chunk);
      }
      vpos += next - opos;
      opos = next;
    }

    orig_to_view.push(vpos);
    view_to_orig.push(opos);
    Self {
      text: rendered,
      view_len: vpos,
      orig_to_view,
      view_to_orig,
      orig_end: opos,
      concealed,
    }
  }

  /// Cut the rendering down to its first `view_len` characters.
  fn snap(&mut self, offset: usize, view_len: usize) {
    if view_len >= self.view_len {
      return;
    }

    if let Some((byte, _)) = self.text.char_indices().nth(view_len) {
      self.text.truncate(byte);
    }

    let covered = self.orig_to_view.len() - 1;
    let kept = self.orig_to_view[..covered].partition_point(|&vpos| vpos < view_len);
    self.orig_to_view.truncate(kept);
    self.orig_to_view.push(view_len);
    self.view_to_orig.truncate(view_len);
    self.view_to_orig.push(offset + kept);
    self.view_len = view_len;
    self.orig_end = offset + kept;
  }
}

/// Number of rows of `text` and whether the last one ends in a line break.
fn rows(text: &str, width: usize) -> (usize, bool) {
  wrapped_lines(text, width).fold((0, false), |(count, _), row| (count + 1, row.line_break))
}

impl TextView {
  /// A view of exactly `height` rows of `width` columns starting at original
  /// position `offset`. Fewer rows are produced only when the text runs out.
  pub fn for_screen(doc: &Document, width: usize, height: usize, offset: usize) -> Result<Self> {
    if width == 0 {
      return Err(TextViewError::InvalidWidth);
    }
    if height == 0 {
      return Err(TextViewError::InvalidHeight);
    }
    let len = doc.text().len_chars();
    if offset > len {
      return Err(TextViewError::InvalidOffset { offset, len });
    }

    let remaining = len - offset;
    let mut sample = if remaining == 0 {
      Sample::empty(offset)
    } else {
      let mut sample_len = 1;
      loop {
        let sample = Sample::build(doc, offset, sample_len);
        let (count, line_break) = rows(&sample.text, width);
        tracing::trace!(
          offset,
          sample_len,
          rows = count,
          view_len = sample.view_len,
          "text view sample"
        );
        let full = count > height || (count == height && line_break);
        if full || sample.orig_end >= len || sample_len >= remaining {
          break sample;
        }
        sample_len = (sample_len * 2).min(remaining);
      }
    };

    let required = if sample.text.is_empty() {
      0
    } else {
      let last_row = move_n_wrapped_lines_down(&sample.text, width, 0, height - 1);
      end_of_wrapped_line(&sample.text, width, last_row) + 1
    };

    debug_assert!(sample.concealed || required >= sample.view_len / 2);
    if required < sample.view_len / 2 {
      tracing::debug!(
        required,
        view_len = sample.view_len,
        "text view sample discarded more than half"
      );
    }
    sample.snap(offset, required);

    Ok(Self::from_sample(doc, width, Some(height), offset, sample))
  }

  /// A view of the whole text wrapped at `width`, without a height bound.
  pub fn for_entire_text(doc: &Document, width: usize) -> Result<Self> {
    if width == 0 {
      return Err(TextViewError::InvalidWidth);
    }
    let len = doc.text().len_chars();
    let sample = if len == 0 {
      Sample::empty(0)
    } else {
      Sample::build(doc, 0, len)
    };
    Ok(Self::from_sample(doc, width, None, 0, sample))
  }

  fn from_sample(
    doc: &Document,
    width: usize,
    height: Option<usize>,
    offset: usize,
    sample: Sample,
  ) -> Self {
    let mut view = Self {
      width,
      height,
      offset,
      text: sample.text,
      view_len: sample.view_len,
      selection: None,
      highlighting: Vec::new(),
      orig_to_view: sample.orig_to_view,
      view_to_orig: sample.view_to_orig,
    };
    view.refresh_selection(doc);
    view.refresh_highlighting(doc);
    view
  }

  /// Re-project the document's selection without rebuilding the text.
  pub fn refresh_selection(&mut self, doc: &Document) {
    self.selection = self.project_selection(doc.selection());
  }

  /// Re-project the document's highlighting without rebuilding the text.
  pub fn refresh_highlighting(&mut self, doc: &Document) {
    let highlighting = doc.highlighting();
    self.highlighting = self.view_to_orig[..self.view_len]
      .iter()
      .map(|opos| highlighting.get(opos).cloned().unwrap_or_default())
      .collect();
  }

  /// The visible parts of `selection` in view coordinates. `None` when no
  /// interval is visible.
  pub fn project_selection(&self, selection: &Selection) -> Option<Selection> {
    let range = self.orig_range();
    let (obeg, oend) = (range.beg(), range.end());

    let visible = selection.iter().filter(|interval| {
      (interval.beg() < oend && obeg < interval.end())
        || (interval.is_empty() && (interval.beg() == obeg || interval.beg() == oend))
    });
    let projected = visible.map(|interval| {
      let clamped = interval.clip(obeg, oend);
      Interval::new(
        self.orig_to_view[clamped.beg() - obeg],
        self.orig_to_view[clamped.end() - obeg],
      )
    });
    Selection::new(projected).ok()
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> Option<usize> {
    self.height
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  /// Length of the rendered text in characters.
  pub fn view_len(&self) -> usize {
    self.view_len
  }

  pub fn selection(&self) -> Option<&Selection> {
    self.selection.as_ref()
  }

  /// One annotation per view position.
  pub fn highlighting(&self) -> &[Tendril] {
    &self.highlighting
  }

  /// The original text covered by the view.
  pub fn orig_range(&self) -> Interval {
    Interval::new(self.offset, self.offset + self.orig_to_view.len() - 1)
  }

  /// View position of original position `pos`, including the end of the
  /// covered range.
  pub fn orig_to_view(&self, pos: usize) -> Option<usize> {
    self
      .orig_to_view
      .get(pos.checked_sub(self.offset)?)
      .copied()
  }

  /// Original position of view position `vpos`, including the end of the
  /// rendered text.
  pub fn view_to_orig(&self, vpos: usize) -> Option<usize> {
    self.view_to_orig.get(vpos).copied()
  }

  /// The rendered text split into rows of at most `width` characters.
  pub fn text_as_lines(&self) -> Vec<String> {
    wrap_text(&self.text, self.width)
  }
}
