//! Per-document editing configuration.
//!
//! Configuration is read from TOML. A global source (the user's settings) is
//! merged with an optional local source (a project's settings); keys present
//! in the local source win.
//!
//! ```toml
//! tab-width = 2
//! expand-tab = true
//! auto-indent = true
//! ```

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;
use toml::Value;

use crate::Tendril;

/// Depth up to which nested tables of the global and local sources are
/// merged key by key.
const MERGE_DEPTH: usize = 3;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to parse config: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error("tab-width must be at least 1")]
  InvalidTabWidth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DocumentConfig {
  /// Width of a tab stop, and the number of spaces inserted for a tab when
  /// `expand-tab` is set.
  pub tab_width:   usize,
  pub expand_tab:  bool,
  /// Copy the indentation of the current line when inserting a newline.
  pub auto_indent: bool,
}

impl Default for DocumentConfig {
  fn default() -> Self {
    Self {
      tab_width:   4,
      expand_tab:  false,
      auto_indent: true,
    }
  }
}

impl DocumentConfig {
  /// Load from a global and a local TOML source. A missing source falls back
  /// to the defaults.
  pub fn load(global: Option<&str>, local: Option<&str>) -> Result<Self, ConfigError> {
    let global = global.map(parse_table).transpose()?;
    let local = local.map(parse_table).transpose()?;

    let config: Self = match (global, local) {
      (None, None) => Self::default(),
      (Some(value), None) | (None, Some(value)) => value.try_into()?,
      (Some(global), Some(local)) => merge_toml_values(global, local, MERGE_DEPTH).try_into()?,
    };

    if config.tab_width == 0 {
      tracing::warn!("rejecting config with zero tab-width");
      return Err(ConfigError::InvalidTabWidth);
    }
    Ok(config)
  }

  /// The text a tab key inserts.
  pub fn indent_unit(&self) -> Tendril {
    if self.expand_tab {
      " ".repeat(self.tab_width).into()
    } else {
      "\t".into()
    }
  }
}

fn parse_table(source: &str) -> Result<Value, ConfigError> {
  Ok(Value::Table(toml::from_str(source)?))
}

/// Merge `right` into `left`. Tables are merged key by key up to
/// `merge_depth` levels deep; below that, and for every other kind of value,
/// `right` replaces `left`.
pub fn merge_toml_values(left: Value, right: Value, merge_depth: usize) -> Value {
  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) if merge_depth > 0 => {
      for (name, rvalue) in right_map {
        let merged = match left_map.remove(&name) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
          None => rvalue,
        };
        left_map.insert(name, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}
