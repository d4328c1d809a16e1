//! Selection addressing modes.
//!
//! The [`SelectMode`] decides how a selector combines the intervals it finds
//! with the current selection:
//!
//! ```ignore
//! use the_lib::mode::SelectMode;
//!
//! // Replace the selection with the match.
//! SelectMode::Normal;
//! // Add the match to the selection.
//! SelectMode::Extend;
//! // Remove the match from the selection.
//! SelectMode::Reduce;
//! ```
//!
//! Extend and Reduce are transient: applying an edit resets the document back
//! to [`SelectMode::Normal`].

use serde::{
  Deserialize,
  Serialize,
};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectMode {
  #[default]
  Normal,
  Extend,
  Reduce,
}

impl SelectMode {
  /// Whether the mode is a transient submode that an edit leaves.
  #[inline]
  pub fn is_submode(self) -> bool {
    !matches!(self, Self::Normal)
  }
}
