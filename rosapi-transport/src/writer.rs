//! Sentence writer

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use rosapi_core::sentence;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Writes sentences to a device stream
///
/// A sentence is written through a [`SentenceGuard`] which holds the
/// writer exclusively, so words of concurrent sentences never interleave
/// on the wire.
pub struct SentenceWriter<W> {
    inner: Mutex<Option<W>>,
    closed: AtomicBool,
    timeout: Duration,
}

impl<W: AsyncWrite + Unpin> SentenceWriter<W> {
    pub fn new(writer: W, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if [`SentenceWriter::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Acquire exclusive access for one sentence
    ///
    /// Fails with `ConnectionClosed` once the writer is closed.
    pub async fn begin_sentence(&self) -> Result<SentenceGuard<'_, W>> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let mut stream = self.inner.lock().await;
        if self.is_closed() {
            // Closed while queued for the lock
            stream.take();
        }
        if stream.is_none() {
            return Err(Error::ConnectionClosed);
        }

        Ok(SentenceGuard {
            writer: self,
            stream: Some(stream),
            buf: BytesMut::new(),
            words: 0,
            error: None,
        })
    }

    /// Write a whole sentence
    pub async fn write_sentence<I, S>(&self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut guard = self.begin_sentence().await?;
        for word in words {
            guard.write_word(word.as_ref()).await;
        }
        guard.end_sentence().await
    }

    /// Shut down and release the stream
    ///
    /// Does not wait behind a sentence in progress. That sentence
    /// finishes or fails on its own deadline and its guard releases the
    /// stream. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);

        let Ok(mut stream) = self.inner.try_lock() else {
            debug!("Sentence in progress, stream is released after it");
            return Ok(());
        };
        match stream.take() {
            Some(mut stream) => with_deadline(self.timeout, stream.shutdown()).await,
            None => Ok(()),
        }
    }
}

/// Exclusive handle for writing one sentence
///
/// Words are framed into a local buffer and reach the stream in
/// `end_sentence`, so dropping the guard early discards the whole
/// sentence. The first error is kept; later words are skipped and the
/// error is returned by `end_sentence`.
pub struct SentenceGuard<'a, W> {
    writer: &'a SentenceWriter<W>,
    stream: Option<MutexGuard<'a, Option<W>>>,
    buf: BytesMut,
    words: usize,
    error: Option<Error>,
}

impl<W: AsyncWrite + Unpin> SentenceGuard<'_, W> {
    /// Write one word
    pub async fn write_word(&mut self, word: &str) {
        if self.error.is_some() {
            return;
        }

        if let Err(e) = sentence::encode_word(word.as_bytes(), &mut self.buf) {
            self.error = Some(e.into());
            return;
        }
        self.words += 1;

        // Keep large sentences from piling up in memory
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.push().await;
        }
    }

    /// Write the terminating empty word and flush
    ///
    /// Returns the first error that occurred while writing the sentence.
    pub async fn end_sentence(mut self) -> Result<()> {
        if self.error.is_none() {
            if let Err(e) = sentence::encode_word(&[], &mut self.buf) {
                self.error = Some(e.into());
            }
        }
        self.push().await;

        if self.error.is_none() {
            if let Err(e) = self.flush().await {
                self.error = Some(e);
            }
        }

        // Writer was closed while this sentence held it
        if self.writer.is_closed() {
            let timeout = self.writer.timeout;
            if let Some(mut stream) = self.stream.as_mut().and_then(|s| s.take()) {
                let _ = with_deadline(timeout, stream.shutdown()).await;
            }
        }

        match self.error.take() {
            Some(e) => Err(e),
            None => {
                trace!(words = self.words, "Wrote sentence");
                Ok(())
            }
        }
    }

    fn stream(&mut self) -> Result<&mut W> {
        self.stream
            .as_mut()
            .and_then(|s| s.as_mut())
            .ok_or(Error::ConnectionClosed)
    }

    async fn push(&mut self) {
        if self.error.is_some() || self.buf.is_empty() {
            return;
        }

        let timeout = self.writer.timeout;
        let result = match self.stream.as_mut().and_then(|s| s.as_mut()) {
            Some(stream) => with_deadline(timeout, stream.write_all(&self.buf)).await,
            None => Err(Error::ConnectionClosed),
        };
        self.buf.clear();
        if let Err(e) = result {
            self.error = Some(e);
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let timeout = self.writer.timeout;
        let stream = self.stream()?;
        with_deadline(timeout, stream.flush()).await
    }
}

impl<W> Drop for SentenceGuard<'_, W> {
    fn drop(&mut self) {
        // Release before checking, so a close that found the lock held
        // is always seen here
        self.stream.take();
        if self.writer.closed.load(Ordering::SeqCst) {
            if let Ok(mut stream) = self.writer.inner.try_lock() {
                stream.take();
            }
        }
    }
}

const FLUSH_THRESHOLD: usize = 64 * 1024;

async fn with_deadline<F, T>(limit: Duration, io: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    if limit.is_zero() {
        return io.await.map_err(Error::Io);
    }

    timeout(limit, io)
        .await
        .map_err(|_| Error::WriteTimeout)?
        .map_err(Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SentenceReader;
    use pretty_assertions::assert_eq;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// Stream whose writes always fail
    struct BrokenWriter {
        attempts: usize,
    }

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.attempts += 1;
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken")))
        }

        fn poll_flush(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.attempts += 1;
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_sentence_bytes() {
        let writer = SentenceWriter::new(Vec::new(), Duration::from_secs(1));
        writer.write_sentence(["/login", "=name=admin"]).await.unwrap();

        let written = writer.inner.lock().await.clone().unwrap();
        let mut expected = vec![6u8];
        expected.extend_from_slice(b"/login");
        expected.push(11);
        expected.extend_from_slice(b"=name=admin");
        expected.push(0);

        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn test_round_trip_through_reader() {
        let (client, device) = tokio::io::duplex(4096);
        let writer = SentenceWriter::new(client, Duration::from_secs(1));
        let mut reader = SentenceReader::new(device, Duration::from_secs(1));

        let mut guard = writer.begin_sentence().await.unwrap();
        guard.write_word("/interface/print").await;
        guard.write_word(".tag=r7").await;
        guard.write_word("=.proplist=name").await;
        guard.end_sentence().await.unwrap();

        let sentence = reader.read_sentence(true).await.unwrap();
        assert_eq!(sentence.word, "/interface/print");
        assert_eq!(sentence.tag.as_deref(), Some("r7"));
        assert_eq!(sentence.get(".proplist"), Some("name"));
    }

    #[tokio::test]
    async fn test_first_error_is_sticky() {
        let writer = SentenceWriter::new(BrokenWriter { attempts: 0 }, Duration::from_secs(1));

        let mut guard = writer.begin_sentence().await.unwrap();
        guard.write_word("/system/identity/print").await;
        guard.write_word("=name=x").await;
        let result = guard.end_sentence().await;

        match result {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected I/O error, got {:?}", other),
        }
        // One failed write, no flush attempt after it
        assert_eq!(writer.inner.lock().await.as_ref().unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_writes_nothing() {
        let writer = SentenceWriter::new(Vec::new(), Duration::from_secs(1));

        {
            let mut guard = writer.begin_sentence().await.unwrap();
            guard.write_word("/interface/print").await;
        }
        writer.write_sentence(["/quit"]).await.unwrap();

        let written = writer.inner.lock().await.clone().unwrap();
        assert_eq!(written, vec![5, b'/', b'q', b'u', b'i', b't', 0]);
    }

    #[tokio::test]
    async fn test_concurrent_sentences_do_not_interleave() {
        let (client, device) = tokio::io::duplex(64 * 1024);
        let writer = Arc::new(SentenceWriter::new(client, Duration::from_secs(1)));
        let mut reader = SentenceReader::new(device, Duration::from_secs(1));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let writer = writer.clone();
                tokio::spawn(async move {
                    let mut guard = writer.begin_sentence().await.unwrap();
                    guard.write_word("/ping").await;
                    tokio::task::yield_now().await;
                    guard.write_word(&format!("=id={}", i)).await;
                    guard.write_word(&format!("=check={}", i)).await;
                    guard.end_sentence().await.unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        for _ in 0..8 {
            let sentence = reader.read_sentence(true).await.unwrap();
            assert_eq!(sentence.word, "/ping");
            assert_eq!(sentence.get("id"), sentence.get("check"));
        }
    }

    /// Stream whose writes never complete
    struct StuckWriter;

    impl AsyncWrite for StuckWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_close_shuts_down_stream() {
        let (client, device) = tokio::io::duplex(4096);
        let writer = SentenceWriter::new(client, Duration::from_secs(1));
        let mut reader = SentenceReader::new(device, Duration::from_secs(1));

        writer.close().await.unwrap();
        writer.close().await.unwrap();

        assert!(writer.is_closed());
        assert!(writer.inner.lock().await.is_none());
        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::ConnectionClosed)
        ));
        assert!(matches!(
            writer.write_sentence(["/quit"]).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_close_does_not_wait_for_stuck_write() {
        let writer = Arc::new(SentenceWriter::new(StuckWriter, Duration::ZERO));

        let stuck = tokio::spawn({
            let writer = writer.clone();
            async move { writer.write_sentence(["/system/reboot"]).await }
        });
        // Let the write take the stream
        tokio::task::yield_now().await;

        writer.close().await.unwrap();
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_sentence(["/quit"]).await,
            Err(Error::ConnectionClosed)
        ));

        // The stuck sentence still holds the stream; giving up on it releases it
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert!(writer.inner.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_sentence_finishing_after_close_releases_stream() {
        let (client, device) = tokio::io::duplex(4096);
        let writer = SentenceWriter::new(client, Duration::from_secs(1));
        let mut reader = SentenceReader::new(device, Duration::from_secs(1));

        let mut guard = writer.begin_sentence().await.unwrap();
        guard.write_word("/system/identity/print").await;
        writer.close().await.unwrap();
        guard.end_sentence().await.unwrap();

        assert!(writer.inner.lock().await.is_none());
        let sentence = reader.read_sentence(true).await.unwrap();
        assert_eq!(sentence.word, "/system/identity/print");
        assert!(matches!(
            reader.read_sentence(true).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
