//! Hard wrapping of text into fixed-width screen rows.
//!
//! A line is the text between two `\n` characters. Every line occupies at
//! least one row; a line longer than `width` characters continues on as many
//! further rows as it needs. The `\n` terminating a line belongs to the last
//! row of that line, so a line of exactly `width` characters followed by a
//! line break still takes a single row.
//!
//! ```text
//! width = 4, text = "abcdef\n\nxy"
//!
//! row 0: "abcd"      0..4
//! row 1: "ef\n"      4..7
//! row 2: "\n"        7..8
//! row 3: "xy"        8..10
//! ```
//!
//! All positions are character indices into the given string.

/// One screen row of wrapped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedLine {
  /// First character of the row.
  pub start:      usize,
  /// End of the visible characters, excluding a trailing line break.
  pub end:        usize,
  /// Whether a `\n` at `end` terminates this row.
  pub line_break: bool,
}

impl WrappedLine {
  #[inline]
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  /// End of the row including its line break.
  #[inline]
  pub fn span_end(&self) -> usize {
    self.end + usize::from(self.line_break)
  }
}

/// Iterator over the rows of `text` wrapped at `width`.
#[derive(Debug, Clone)]
pub struct WrappedLines<'a> {
  chars: std::iter::Peekable<std::str::Chars<'a>>,
  width: usize,
  pos:   usize,
}

impl Iterator for WrappedLines<'_> {
  type Item = WrappedLine;

  fn next(&mut self) -> Option<WrappedLine> {
    self.chars.peek()?;

    let start = self.pos;
    let mut col = 0;
    while let Some(&ch) = self.chars.peek() {
      if ch == '\n' {
        self.chars.next();
        let end = self.pos;
        self.pos += 1;
        return Some(WrappedLine {
          start,
          end,
          line_break: true,
        });
      }
      if col == self.width {
        break;
      }
      self.chars.next();
      self.pos += 1;
      col += 1;
    }

    Some(WrappedLine {
      start,
      end: self.pos,
      line_break: false,
    })
  }
}

/// # Panics
///
/// Panics when `width` is zero.
pub fn wrapped_lines(text: &str, width: usize) -> WrappedLines<'_> {
  assert!(width > 0, "wrap width must be positive");
  WrappedLines {
    chars: text.chars().peekable(),
    width,
    pos: 0,
  }
}

pub fn count_wrapped_lines(text: &str, width: usize) -> usize {
  wrapped_lines(text, width).count()
}

/// The row containing `pos`. A position at the very end of the text belongs
/// to the last row. Returns `None` for empty text.
pub fn wrapped_line_at(text: &str, width: usize, pos: usize) -> Option<(usize, WrappedLine)> {
  let mut last = None;
  for (index, line) in wrapped_lines(text, width).enumerate() {
    if pos < line.span_end() {
      return Some((index, line));
    }
    last = Some((index, line));
  }
  last
}

/// Start of the row `n` rows below the one containing `pos`, clamped to the
/// last row of the text.
pub fn move_n_wrapped_lines_down(text: &str, width: usize, pos: usize, n: usize) -> usize {
  let Some((row, _)) = wrapped_line_at(text, width, pos) else {
    return 0;
  };
  wrapped_lines(text, width)
    .skip(row)
    .take(n + 1)
    .last()
    .map_or(0, |line| line.start)
}

/// Position of the last character of the row containing `pos`. For a row
/// terminated by a line break this is the `\n` itself.
pub fn end_of_wrapped_line(text: &str, width: usize, pos: usize) -> usize {
  wrapped_line_at(text, width, pos).map_or(0, |(_, line)| line.span_end().saturating_sub(1))
}

/// Split `text` into its rows, dropping line breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let chars: Vec<char> = text.chars().collect();
  wrapped_lines(text, width)
    .map(|line| chars[line.start..line.end].iter().collect())
    .collect()
}
