//! In-memory device for client tests

use std::time::Duration;

use rosapi_core::sentence;
use rosapi_transport::{SentenceReader, SentenceWriter};
use rosapi_types::Sentence;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

use crate::client::Client;
use crate::config::ClientConfig;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Device end of an in-memory connection
///
/// Reads and writes without deadlines; timing is up to the test.
pub(crate) struct FakeDevice {
    reader: SentenceReader<ReadHalf<DuplexStream>>,
    writer: SentenceWriter<WriteHalf<DuplexStream>>,
}

impl FakeDevice {
    /// Next sentence the client sent
    pub(crate) async fn recv(&mut self) -> Sentence {
        self.reader
            .read_sentence(true)
            .await
            .expect("client sentence")
    }

    /// Next sentence, or the error that ended the client's side
    pub(crate) async fn try_recv(&mut self) -> rosapi_transport::Result<Sentence> {
        self.reader.read_sentence(true).await
    }

    pub(crate) async fn send(&self, words: &[&str]) {
        self.writer.write_sentence(words).await.expect("device write");
    }

    pub(crate) async fn send_tagged(&self, tag: &str, words: &[&str]) {
        let tag = sentence::tag_word(tag);
        self.writer
            .write_sentence(words.iter().copied().chain([tag.as_str()]))
            .await
            .expect("device write");
    }
}

/// Client stream and the device end of the same pipe
pub(crate) fn pipe() -> (DuplexStream, FakeDevice) {
    let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
    let (read, write) = tokio::io::split(remote);

    let device = FakeDevice {
        reader: SentenceReader::new(read, Duration::ZERO),
        writer: SentenceWriter::new(write, Duration::ZERO),
    };
    (local, device)
}

/// Client wired to a fake device, not logged in
pub(crate) fn connect(config: ClientConfig) -> (Client, FakeDevice) {
    let (local, device) = pipe();
    (Client::with_config(local, config), device)
}
