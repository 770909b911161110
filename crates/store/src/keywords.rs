use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canned replies keyed by trigger substring.
///
/// When several triggers occur in the same text the longest one wins;
/// triggers of equal length are ordered lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    entries: BTreeMap<String, String>,
}

impl KeywordTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced reply, if any.
    pub fn insert(&mut self, trigger: impl Into<String>, reply: impl Into<String>) -> Option<String> {
        self.entries.insert(trigger.into(), reply.into())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, trigger: &str) -> Option<&str> {
        self.entries.get(trigger).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn find(&self, text: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .filter(|(trigger, _)| !trigger.is_empty() && text.contains(trigger.as_str()))
            .max_by(|(a, _), (b, _)| {
                a.chars()
                    .count()
                    .cmp(&b.chars().count())
                    .then_with(|| b.cmp(a))
            })
            .map(|(trigger, reply)| (trigger.as_str(), reply.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_substring_anywhere() {
        let mut table = KeywordTable::new();
        table.insert("hello", "hi there");
        assert_eq!(table.find("well hello!"), Some(("hello", "hi there")));
        assert_eq!(table.find("goodbye"), None);
    }

    #[test]
    fn longest_trigger_wins() {
        let mut table = KeywordTable::new();
        table.insert("おは", "short");
        table.insert("おはよう", "long");
        assert_eq!(table.find("おはようございます").map(|(_, r)| r), Some("long"));
    }

    #[test]
    fn equal_length_ties_break_lexicographically() {
        let mut table = KeywordTable::new();
        table.insert("bb", "second");
        table.insert("aa", "first");
        assert_eq!(table.find("bb aa").map(|(_, r)| r), Some("first"));
    }

    #[test]
    fn empty_trigger_never_matches() {
        let mut table = KeywordTable::new();
        table.insert("", "everything");
        assert_eq!(table.find("anything"), None);
    }

    #[test]
    fn last_write_wins() {
        let mut table = KeywordTable::new();
        table.insert("k", "v1");
        assert_eq!(table.insert("k", "v2").as_deref(), Some("v1"));
        assert_eq!(table.get("k"), Some("v2"));
        assert_eq!(table.len(), 1);
    }
}
