//! Sentence encoding and parsing
//!
//! A sentence is a sequence of length-prefixed words closed by an empty
//! word:
//!
//! ```text
//! ┌──────────┬──────────────┬─────────────────┬─────┬──────────┐
//! │   verb   │ .tag=<tag>   │ =<key>=<value>  │ ... │  (empty) │
//! │ !re, ... │  (optional)  │ =<key>          │     │  0x00    │
//! └──────────┴──────────────┴─────────────────┴─────┴──────────┘
//! ```
//!
//! Word payloads are treated as UTF-8; invalid sequences are replaced
//! rather than rejected.

use bytes::{BufMut, BytesMut};
use rosapi_types::{Pair, Sentence};
use tracing::trace;

use crate::{
    constants::{ATTRIBUTE_PREFIX, TAG_PREFIX, keys, verbs},
    error::{Error, Result},
    length,
};

/// Append one framed word to `dst`
pub fn encode_word(word: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(word.len()).map_err(|_| Error::WordTooLong(word.len()))?;

    dst.reserve(length::encoded_len(len) + word.len());
    length::encode(len, dst);
    dst.put_slice(word);

    Ok(())
}

/// Append a whole sentence, including its terminating empty word, to `dst`
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use rosapi_core::sentence;
///
/// let mut buf = BytesMut::new();
/// sentence::encode_sentence(["/system/identity/print"], &mut buf).unwrap();
/// assert_eq!(buf[0], 22);
/// assert_eq!(buf[buf.len() - 1], 0);
/// ```
pub fn encode_sentence<I, W>(words: I, dst: &mut BytesMut) -> Result<()>
where
    I: IntoIterator<Item = W>,
    W: AsRef<[u8]>,
{
    for word in words {
        encode_word(word.as_ref(), dst)?;
    }
    encode_word(&[], dst)
}

/// Word that correlates a sentence with `tag`
pub fn tag_word(tag: &str) -> String {
    format!("{}{}", TAG_PREFIX, tag)
}

/// Fold one non-empty word into `sentence`
///
/// The first word becomes the verb. Later words must be a tag word or an
/// attribute word. Bare words after a `!fatal` verb carry the reason and
/// are stored under the `message` key.
pub fn parse_word(sentence: &mut Sentence, word: &[u8]) -> Result<()> {
    let word = String::from_utf8_lossy(word);

    if sentence.word.is_empty() {
        sentence.word = word.into_owned();
        return Ok(());
    }

    if let Some(tag) = word.strip_prefix(TAG_PREFIX) {
        sentence.tag = Some(tag.to_string());
        return Ok(());
    }

    if let Some(attribute) = word.strip_prefix(ATTRIBUTE_PREFIX) {
        let pair = match attribute.split_once('=') {
            Some((key, value)) => Pair::new(key, value),
            None => Pair::new(attribute, ""),
        };
        sentence.push(pair);
        return Ok(());
    }

    if sentence.word == verbs::FATAL {
        sentence.push(Pair::new(keys::MESSAGE, word.into_owned()));
        return Ok(());
    }

    Err(Error::InvalidWord(word.into_owned()))
}

/// Parse words up to the first empty word
///
/// Words after the terminator are ignored. A sequence without a
/// terminator yields the sentence built so far.
pub fn parse_words<I, W>(words: I) -> Result<Sentence>
where
    I: IntoIterator<Item = W>,
    W: AsRef<[u8]>,
{
    let mut sentence = Sentence::new();
    for word in words {
        let word = word.as_ref();
        if word.is_empty() {
            break;
        }
        parse_word(&mut sentence, word)?;
    }

    trace!(sentence = %sentence, "Parsed sentence");

    Ok(sentence)
}
