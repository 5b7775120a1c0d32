//! Ordered key/value log entries for persistence.
//!
//! A [`LogEntry`] is the only thing the engine exchanges with a persistence
//! layer. Keys starting with `:` are reserved for the chain; module-specific
//! keys must not use that prefix.

use std::fmt;
use std::str::FromStr;

/// Ordered list of `(key, value)` string pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pairs: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates an empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair.
    pub fn add(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Pair at position `index`.
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        self.pairs
            .get(index)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First value stored under `key`.
    pub fn find(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value under `key`, parsed.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.find(key).and_then(|v| v.parse().ok())
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LogEntry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Renders as space-separated `key "value"` pairs.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k} {v:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let mut entry = LogEntry::new();
        entry.add(":kind", "gain");
        entry.add("gain", -6.0);
        entry.add(":active", true);
        assert_eq!(entry.len(), 3);
        assert_eq!(entry.get(0), Some((":kind", "gain")));
        assert_eq!(entry.get(2), Some((":active", "true")));
        assert_eq!(entry.get(3), None);
    }

    #[test]
    fn test_find_and_parse() {
        let entry: LogEntry = [("a", "1"), ("b", "x"), ("a", "2")].into_iter().collect();
        assert_eq!(entry.find("a"), Some("1"));
        assert_eq!(entry.parse::<u32>("a"), Some(1));
        assert_eq!(entry.parse::<u32>("b"), None);
        assert_eq!(entry.parse::<u32>("missing"), None);
    }

    #[test]
    fn test_display() {
        let entry: LogEntry = [(":kind", "meter"), ("label", "L R")].into_iter().collect();
        assert_eq!(entry.to_string(), ":kind \"meter\" label \"L R\"");
    }
}
