//! Streaming command replies

use rosapi_types::Sentence;

use crate::client::Client;
use crate::dispatch::ListenStream;
use crate::error::Result;

/// Rows of a running listen command
///
/// Created by [`Client::listen`]. Each `!re` the device sends is yielded
/// by [`ListenReply::recv`]; the stream ends when the device finishes
/// the command, when it is cancelled or when the connection goes away.
///
/// Up to [`ClientConfig::listen_queue`](crate::ClientConfig::listen_queue)
/// rows are buffered. The background reader never waits for a listener,
/// so a listen that falls further behind is ended with
/// [`Error::ListenOverflow`](crate::Error::ListenOverflow) while other
/// commands carry on. The device keeps streaming until the listen is
/// cancelled.
#[derive(Debug)]
pub struct ListenReply {
    client: Client,
    tag: String,
    items: ListenStream,
}

impl ListenReply {
    pub(crate) fn new(client: Client, tag: String, items: ListenStream) -> Self {
        Self { client, tag, items }
    }

    /// Tag the device uses for this command
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Wait for the next row
    ///
    /// Returns `None` once the stream has ended. A trap, an overflow or
    /// a lost connection is yielded as one final error after the rows
    /// received before it.
    pub async fn recv(&mut self) -> Option<Result<Sentence>> {
        self.items.recv().await
    }

    /// Ask the device to stop the command
    ///
    /// Rows already queued can still be received; [`ListenReply::recv`]
    /// returns `None` after the device confirms. Does not need `recv` to
    /// be polled meanwhile.
    pub async fn cancel(&self) -> Result<()> {
        let tag = format!("=tag={}", self.tag);
        self.client.run(&["/cancel", tag.as_str()]).await?;
        Ok(())
    }
}
