//! Concealment: rendering spans of the original text as different strings.
//!
//! A [`Substitution`] replaces an original interval with a replacement that
//! may be shorter, longer or empty. The underlying text is never altered;
//! substitutions only affect what a [`TextView`](crate::text_view::TextView)
//! shows.
//!
//! Substitutions come from two places:
//!
//! - **Global** substitutions are registered once and kept sorted by
//!   interval. Lookups binary search the slice relevant to a range.
//! - **Local** substitutions are produced on demand by [`LocalConceal`]
//!   providers for just the range being viewed.
//!
//! ```ignore
//! let mut conceal = Conceal::default();
//! conceal.insert_global(Substitution::new(Interval::new(5, 10), "…"))?;
//! conceal.register_local(Box::new(PatternConceal::new(r"\t", "→")?));
//! let subs = conceal.substitutions(text.slice(..), Interval::new(0, 40));
//! ```

use std::{
  borrow::Cow,
  fmt,
};

use regex::Regex;
use ropey::RopeSlice;
use the_core::interval::Interval;
use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, ConcealError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConcealError {
  #[error("substitution at {interval} overlaps existing substitution at {existing}")]
  Overlap {
    interval: Interval,
    existing: Interval,
  },
  #[error("invalid conceal pattern: {0}")]
  Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Substitution {
  pub interval:    Interval,
  pub replacement: Tendril,
}

impl Substitution {
  pub fn new(interval: Interval, replacement: impl Into<Tendril>) -> Self {
    Self {
      interval,
      replacement: replacement.into(),
    }
  }
}

/// Produces substitutions for a range of the text on demand.
pub trait LocalConceal: fmt::Debug + Send + Sync {
  /// Substitutions starting inside `range`, sorted or not.
  fn substitutions(&self, text: RopeSlice<'_>, range: Interval) -> Vec<Substitution>;
}

/// Conceals every match of a regular expression.
#[derive(Debug, Clone)]
pub struct PatternConceal {
  regex:       Regex,
  replacement: Tendril,
}

impl PatternConceal {
  pub fn new(pattern: &str, replacement: impl Into<Tendril>) -> Result<Self> {
    Ok(Self {
      regex:       Regex::new(pattern)?,
      replacement: replacement.into(),
    })
  }
}

impl LocalConceal for PatternConceal {
  fn substitutions(&self, text: RopeSlice<'_>, range: Interval) -> Vec<Substitution> {
    let slice = text.slice(range.beg()..range.end());
    let haystack: Cow<str> = slice.into();
    self
      .regex
      .find_iter(&haystack)
      .filter(|m| !m.is_empty())
      .map(|m| {
        let beg = range.beg() + slice.byte_to_char(m.start());
        let end = range.beg() + slice.byte_to_char(m.end());
        Substitution::new(Interval::new(beg, end), self.replacement.clone())
      })
      .collect()
  }
}

/// Tie-break order for substitutions starting at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
  Global,
  Local,
}

#[derive(Debug, Default)]
pub struct Conceal {
  global: Vec<Substitution>,
  local:  Vec<Box<dyn LocalConceal>>,
}

impl Conceal {
  pub fn global(&self) -> &[Substitution] {
    &self.global
  }

  pub fn is_empty(&self) -> bool {
    self.global.is_empty() && self.local.is_empty()
  }

  /// Register a persistent substitution. Overlapping an existing one is an
  /// error and leaves the registry unchanged.
  pub fn insert_global(&mut self, substitution: Substitution) -> Result<()> {
    let index = self
      .global
      .partition_point(|existing| existing.interval < substitution.interval);

    let neighbours = index.checked_sub(1).into_iter().chain([index]);
    for neighbour in neighbours {
      if let Some(existing) = self.global.get(neighbour)
        && (existing.interval.overlaps(&substitution.interval)
          || substitution.interval.overlaps(&existing.interval))
      {
        tracing::warn!(
          interval = %substitution.interval,
          existing = %existing.interval,
          "rejecting overlapping substitution"
        );
        return Err(ConcealError::Overlap {
          interval: substitution.interval,
          existing: existing.interval,
        });
      }
    }

    self.global.insert(index, substitution);
    Ok(())
  }

  /// Remove every global substitution overlapping `range`. Returns the
  /// number removed.
  pub fn remove_global(&mut self, range: Interval) -> usize {
    let before = self.global.len();
    self.global.retain(|existing| {
      !(existing.interval.overlaps(&range) || range.overlaps(&existing.interval))
    });
    before - self.global.len()
  }

  pub fn clear_global(&mut self) {
    self.global.clear();
  }

  pub fn register_local(&mut self, provider: Box<dyn LocalConceal>) {
    self.local.push(provider);
  }

  pub fn clear_local(&mut self) {
    self.local.clear();
  }

  /// All substitutions starting inside `range`, sorted and non-overlapping,
  /// with ends clipped to the text.
  ///
  /// Where two substitutions overlap, the one starting first wins and the
  /// other is dropped. On equal starts a global substitution beats a local
  /// one. An empty substitution never blocks a non-empty one at the same
  /// position; both are kept and the empty one renders first.
  pub fn substitutions(&self, text: RopeSlice<'_>, range: Interval) -> Vec<Substitution> {
    let len = text.len_chars();
    let range = range.clip(0, len);

    let lo = self
      .global
      .partition_point(|sub| sub.interval.beg() < range.beg());
    let hi = self
      .global
      .partition_point(|sub| sub.interval.beg() < range.end());

    let local = self
      .local
      .iter()
      .flat_map(|provider| provider.substitutions(text, range))
      .filter(|sub| range.beg() <= sub.interval.beg() && sub.interval.beg() < range.end())
      .map(|sub| (Source::Local, sub));
    let mut merged: Vec<(Source, Substitution)> = self.global[lo..hi]
      .iter()
      .cloned()
      .map(|sub| (Source::Global, sub))
      .chain(local)
      .collect();
    // Stable, so equal keys keep provider order.
    merged.sort_by_key(|(source, sub)| (sub.interval.beg(), !sub.interval.is_empty(), *source));

    let mut result: Vec<Substitution> = Vec::with_capacity(merged.len());
    for (_, mut sub) in merged {
      if let Some(prev) = result.last()
        && (sub.interval.beg() < prev.interval.end()
          || (sub.interval.beg() == prev.interval.beg()
            && !(prev.interval.is_empty() && !sub.interval.is_empty())))
      {
        tracing::warn!(
          interval = %sub.interval,
          kept = %prev.interval,
          "dropping overlapping substitution"
        );
        continue;
      }
      sub.interval = sub.interval.clip(0, len);
      result.push(sub);
    }
    result
  }
}
