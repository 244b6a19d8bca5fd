//! Command words and reply verbs

use std::fmt;

use rosapi_types::Sentence;

use crate::{
    constants::{ATTRIBUTE_PREFIX, QUERY_PREFIX, verbs},
    error::{Error, Result},
};

/// Kind of a reply sentence, taken from its first word
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `!re`: one partial result
    Re,

    /// `!done`: end of reply
    Done,

    /// `!trap`: command failed
    Trap,

    /// `!fatal`: connection is closing
    Fatal,

    /// Sentence without any word
    Empty,

    /// Anything else
    Unknown,
}

impl Verb {
    /// Classify a sentence by its first word
    pub fn of(sentence: &Sentence) -> Self {
        Self::from(sentence.word.as_str())
    }

    /// Get wire name
    pub fn name(self) -> &'static str {
        match self {
            Self::Re => verbs::RE,
            Self::Done => verbs::DONE,
            Self::Trap => verbs::TRAP,
            Self::Fatal => verbs::FATAL,
            Self::Empty => "",
            Self::Unknown => "?",
        }
    }
}

impl From<&str> for Verb {
    fn from(word: &str) -> Self {
        match word {
            verbs::RE => Self::Re,
            verbs::DONE => Self::Done,
            verbs::TRAP => Self::Trap,
            verbs::FATAL => Self::Fatal,
            "" => Self::Empty,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outgoing command: a path followed by attribute, query and API words
///
/// # Examples
///
/// ```
/// use rosapi_core::Command;
///
/// let command = Command::new("/ip/address/add")
///     .attribute("address", "192.168.88.2/24")
///     .attribute("interface", "ether2");
///
/// assert_eq!(
///     command.words(),
///     ["/ip/address/add", "=address=192.168.88.2/24", "=interface=ether2"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    /// Start a command with its path, e.g. `/interface/print`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            words: vec![path.into()],
        }
    }

    /// Build a command from raw words, rejecting empty ones
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = Self {
            words: words.into_iter().map(Into::into).collect(),
        };
        command.validate()?;
        Ok(command)
    }

    /// Append a raw word
    pub fn word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    /// Append an `=key=value` attribute word
    pub fn attribute(self, key: &str, value: &str) -> Self {
        self.word(format!("{}{}={}", ATTRIBUTE_PREFIX, key, value))
    }

    /// Append a `?query` word
    pub fn query(self, query: &str) -> Self {
        self.word(format!("{}{}", QUERY_PREFIX, query))
    }

    /// Restrict returned properties with `=.proplist=`
    pub fn proplist(self, properties: &[&str]) -> Self {
        self.attribute(".proplist", &properties.join(","))
    }

    /// Check that the command has words and none of them is blank
    pub fn validate(&self) -> Result<()> {
        if self.words.is_empty() || self.words.iter().any(|w| w.trim().is_empty()) {
            return Err(Error::EmptyWord);
        }
        Ok(())
    }

    /// Command path (first word)
    pub fn path(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words.join(" "))
    }
}

impl IntoIterator for Command {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_conversion() {
        assert_eq!(Verb::from("!re"), Verb::Re);
        assert_eq!(Verb::from("!done"), Verb::Done);
        assert_eq!(Verb::from("!trap"), Verb::Trap);
        assert_eq!(Verb::from("!fatal"), Verb::Fatal);
        assert_eq!(Verb::from(""), Verb::Empty);
        assert_eq!(Verb::from("/login"), Verb::Unknown);
        assert_eq!(Verb::Done.to_string(), "!done");
    }

    #[test]
    fn test_builder_words() {
        let command = Command::new("/interface/print")
            .query("type=ether")
            .proplist(&["name", "mtu"]);

        assert_eq!(command.path(), Some("/interface/print"));
        assert_eq!(
            command.words(),
            ["/interface/print", "?type=ether", "=.proplist=name,mtu"]
        );
        assert_eq!(command.to_string(), "/interface/print ?type=ether =.proplist=name,mtu");
    }

    #[test]
    fn test_empty_word_rejected() {
        assert!(matches!(
            Command::from_words(["/ip/address/add", ""]),
            Err(Error::EmptyWord)
        ));
        assert!(matches!(
            Command::from_words(["/ip/address/add", "   "]),
            Err(Error::EmptyWord)
        ));
        assert!(matches!(
            Command::from_words(Vec::<String>::new()),
            Err(Error::EmptyWord)
        ));
        assert!(matches!(Command::new(" ").validate(), Err(Error::EmptyWord)));
    }

    #[test]
    fn test_from_words_accepts_valid() {
        let command = Command::from_words(["/system/resource/print"]).unwrap();
        assert_eq!(command.into_words(), vec!["/system/resource/print".to_string()]);
    }
}
