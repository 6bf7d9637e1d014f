//! Per-logger-name threshold overrides

use super::level::{LevelSet, Threshold};
use std::collections::HashMap;

/// Mapping from logger name to the minimum severity that overrides a
/// sink's default threshold for that logger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTable {
    entries: HashMap<String, Threshold>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `name:level` entries.
    ///
    /// Each entry is split on its first colon. Entries without a colon are
    /// dropped. Unknown levels degrade to `AllowError` and are passed to
    /// `on_unknown`.
    pub fn parse<I, S>(entries: I, mut on_unknown: impl FnMut(&str)) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for entry in entries {
            if let Some((name, level)) = entry.as_ref().split_once(':') {
                let threshold = LevelSet::resolve(&level.to_lowercase(), &mut on_unknown);
                table.entries.insert(name.to_string(), threshold);
            }
        }
        table
    }

    /// Split a configured list on commas and whitespace, dropping empty items.
    pub fn split_list(list: &str) -> Vec<&str> {
        list.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, threshold: Threshold) {
        self.entries.insert(name.into(), threshold);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Threshold> {
        self.entries.get(name).copied()
    }

    /// Copy in every entry of `other` whose name is not present yet.
    ///
    /// Used both to let per-mode filters fall back to the global ones and to
    /// accumulate the dispatcher-wide table, where the first value seen for a
    /// name is kept.
    pub fn merge_missing(&mut self, other: &FilterTable) {
        for (name, threshold) in &other.entries {
            self.entries.entry(name.clone()).or_insert(*threshold);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Threshold)> {
        self.entries.iter().map(|(name, threshold)| (name.as_str(), *threshold))
    }
}

impl<S: Into<String>> FromIterator<(S, Threshold)> for FilterTable {
    fn from_iter<I: IntoIterator<Item = (S, Threshold)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(name, t)| (name.into(), t)).collect(),
        }
    }
}
