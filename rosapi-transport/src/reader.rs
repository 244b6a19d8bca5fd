//! Sentence reader

use std::time::Duration;

use rosapi_core::constants::DEFAULT_MAX_WORD_LEN;
use rosapi_core::{length, sentence};
use rosapi_types::Sentence;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::time::timeout;
use tracing::trace;

use crate::error::{Error, Result};

/// Reads sentences from a device stream
///
/// Every read after the first byte of a sentence must complete within
/// the configured timeout. Whether the first byte is bounded too is
/// chosen per call, so an idle connection can wait indefinitely for
/// the next sentence. A zero timeout disables deadlines.
///
/// Words longer than the maximum word length are rejected before any
/// buffer is allocated for them.
pub struct SentenceReader<R> {
    inner: BufReader<R>,
    timeout: Duration,
    max_word_len: usize,
}

impl<R: AsyncRead + Unpin> SentenceReader<R> {
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self {
            inner: BufReader::new(reader),
            timeout,
            max_word_len: DEFAULT_MAX_WORD_LEN,
        }
    }

    /// Set the longest word accepted from the device
    pub fn with_max_word_len(mut self, max_word_len: usize) -> Self {
        self.max_word_len = max_word_len;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_word_len(&self) -> usize {
        self.max_word_len
    }

    /// Read one sentence
    ///
    /// With `apply_deadline` set, waiting for the first byte is bounded
    /// by the timeout as well.
    pub async fn read_sentence(&mut self, apply_deadline: bool) -> Result<Sentence> {
        let mut sentence = Sentence::new();
        let mut deadline = apply_deadline;

        loop {
            let word = self.read_word(deadline).await?;
            deadline = true;

            if word.is_empty() {
                trace!(sentence = %sentence, "Read sentence");
                return Ok(sentence);
            }

            sentence::parse_word(&mut sentence, &word)?;
        }
    }

    async fn read_word(&mut self, deadline: bool) -> Result<Vec<u8>> {
        let mut first = [0u8; 1];
        self.read_exact(&mut first, deadline).await?;

        let extra = length::continuation_len(first[0])?;
        let mut rest = [0u8; length::MAX_PREFIX_LEN - 1];
        self.read_exact(&mut rest[..extra], true).await?;

        let len = length::decode(first[0], &rest[..extra])? as usize;
        if len > self.max_word_len {
            return Err(rosapi_core::Error::WordTooLong(len).into());
        }

        let mut word = vec![0u8; len];
        self.read_exact(&mut word, true).await?;

        Ok(word)
    }

    async fn read_exact(&mut self, buf: &mut [u8], deadline: bool) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        let read = self.inner.read_exact(buf);
        let result = if deadline && !self.timeout.is_zero() {
            timeout(self.timeout, read)
                .await
                .map_err(|_| Error::ReadTimeout)?
        } else {
            read.await
        };

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;
    use rosapi_types::Pair;
    use tokio::io::AsyncWriteExt;

    fn reader(raw: Vec<u8>) -> SentenceReader<std::io::Cursor<Vec<u8>>> {
        SentenceReader::new(std::io::Cursor::new(raw), Duration::from_secs(1))
    }

    fn encoded(words: &[&str]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        sentence::encode_sentence(words, &mut buf).unwrap();
        buf.to_vec()
    }

    #[tokio::test]
    async fn test_read_sentence() {
        let mut reader = reader(encoded(&["!re", ".tag=r1", "=name=value"]));

        let sentence = reader.read_sentence(true).await.unwrap();
        assert_eq!(sentence.word, "!re");
        assert_eq!(sentence.tag.as_deref(), Some("r1"));
        assert_eq!(sentence.list, vec![Pair::new("name", "value")]);
    }

    #[tokio::test]
    async fn test_read_consecutive_sentences() {
        let mut raw = encoded(&["!re", "=a=1"]);
        raw.extend(encoded(&["!done"]));
        let mut reader = reader(raw);

        assert_eq!(reader.read_sentence(false).await.unwrap().word, "!re");
        assert_eq!(reader.read_sentence(false).await.unwrap().word, "!done");
        assert!(matches!(
            reader.read_sentence(false).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_long_word() {
        let value = "x".repeat(0x5000);
        let word = format!("=comment={}", value);
        let mut reader = reader(encoded(&["!re", word.as_str()]));

        let sentence = reader.read_sentence(true).await.unwrap();
        assert_eq!(sentence.get("comment"), Some(value.as_str()));
    }

    #[tokio::test]
    async fn test_read_invalid_word() {
        let mut reader = reader(encoded(&["!re", "garbage"]));

        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::Protocol(rosapi_core::Error::InvalidWord(_)))
        ));
    }

    #[tokio::test]
    async fn test_read_reserved_prefix() {
        let mut reader = reader(vec![0xF8, 0x00]);

        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::Protocol(rosapi_core::Error::InvalidLengthPrefix(0xF8)))
        ));
    }

    #[tokio::test]
    async fn test_oversized_word_rejected() {
        // Largest length class, claiming a 4 GiB word
        let mut huge = reader(vec![0xF0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            huge.read_sentence(true).await,
            Err(Error::Protocol(rosapi_core::Error::WordTooLong(0xFFFF_FFFF)))
        ));

        let mut limited = reader(encoded(&["!re", "=name=ether1"])).with_max_word_len(8);
        assert_eq!(limited.max_word_len(), 8);
        assert!(matches!(
            limited.read_sentence(true).await,
            Err(Error::Protocol(rosapi_core::Error::WordTooLong(12)))
        ));
    }

    #[tokio::test]
    async fn test_truncated_sentence() {
        let mut raw = encoded(&["!re", "=name=value"]);
        raw.truncate(raw.len() - 3);
        let mut reader = reader(raw);

        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_sentence_deadline() {
        let (mut device, client) = tokio::io::duplex(1024);
        let mut reader = SentenceReader::new(client, Duration::from_secs(5));

        // Verb only, the rest of the sentence never arrives
        device.write_all(&[3, b'!', b'r', b'e']).await.unwrap();

        assert!(matches!(
            reader.read_sentence(false).await,
            Err(Error::ReadTimeout)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_deadline() {
        let (_device, client) = tokio::io::duplex(1024);
        let mut reader = SentenceReader::new(client, Duration::from_secs(5));

        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::ReadTimeout)
        ));
    }
}
