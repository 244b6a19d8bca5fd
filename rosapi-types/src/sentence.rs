//! Sentence structures

use std::collections::HashMap;
use std::fmt;

/// A `key=value` attribute carried by a sentence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    pub key: String,
    pub value: String,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A parsed protocol sentence
///
/// `word` is the first word of the sentence (`!re`, `!done`, `!trap`,
/// `!fatal` or a command path). Attributes keep their wire order in
/// `list`; `map` is derived from it and keeps the last value written for
/// a duplicated key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    /// Verb (first word)
    pub word: String,

    /// Correlation tag from a `.tag=` word
    pub tag: Option<String>,

    /// Attributes in wire order
    pub list: Vec<Pair>,

    /// Attributes by key
    pub map: HashMap<String, String>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sentence with the given verb and no attributes
    pub fn with_word(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    /// Append an attribute, replacing any earlier value in the map
    pub fn push(&mut self, pair: Pair) {
        self.map.insert(pair.key.clone(), pair.value.clone());
        self.list.push(pair);
    }

    /// Look up an attribute value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty() && self.tag.is_none() && self.list.is_empty()
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{} [", self.word, self.tag.as_deref().unwrap_or(""))?;
        for (i, pair) in self.list.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", pair)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_keeps_order_and_last_value() {
        let mut sentence = Sentence::with_word("!re");
        sentence.push(Pair::new("name", "ether1"));
        sentence.push(Pair::new("mtu", "1500"));
        sentence.push(Pair::new("name", "ether2"));

        assert_eq!(sentence.list.len(), 3);
        assert_eq!(sentence.list[0], Pair::new("name", "ether1"));
        assert_eq!(sentence.get("name"), Some("ether2"));
        assert_eq!(sentence.get("mtu"), Some("1500"));
        assert_eq!(sentence.get("missing"), None);
    }

    #[test]
    fn test_display() {
        let mut sentence = Sentence::with_word("!re");
        sentence.tag = Some("r1".into());
        sentence.push(Pair::new("name", "value"));
        sentence.push(Pair::new("flag", ""));

        assert_eq!(sentence.to_string(), "!re @r1 [name=value flag=]");
    }

    #[test]
    fn test_is_empty() {
        assert!(Sentence::new().is_empty());
        assert!(!Sentence::with_word("!done").is_empty());
    }
}
