//! Aggregated command reply

use std::fmt;

use crate::sentence::Sentence;

/// Outcome of one successfully completed command
///
/// `re` holds every `!re` sentence in arrival order, `done` the
/// terminating `!done` sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub re: Vec<Sentence>,
    pub done: Sentence,
}

impl Reply {
    pub fn new(re: Vec<Sentence>, done: Sentence) -> Self {
        Self { re, done }
    }

    /// Attribute maps of the `!re` sentences, the common shape of `print` output
    pub fn rows(&self) -> impl Iterator<Item = &std::collections::HashMap<String, String>> + '_ {
        self.re.iter().map(|sentence| &sentence.map)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sentence in &self.re {
            writeln!(f, "{}", sentence)?;
        }
        write!(f, "{}", self.done)
    }
}
