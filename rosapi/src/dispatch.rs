//! Tag-multiplexed command dispatch
//!
//! In async mode every command carries a tag. A single background task
//! owns the read side of the connection, reads sentences in wire order
//! and hands each one to the pending command registered under its tag.
//!
//! Routing never waits for a consumer. Command events go through
//! unbounded channels. Listen rows go through a bounded queue; a listen
//! whose queue is full is ended with [`Error::ListenOverflow`] so one
//! slow listener cannot hold up replies for other tags.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rosapi_core::{ListenProgress, Progress, ReplyCollector, Session, Verb, reply};
use rosapi_transport::{BoxedStream, SentenceReader};
use rosapi_types::{Reply, Sentence};
use tokio::io::ReadHalf;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedMutexGuard, mpsc, oneshot, watch};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Notification for a waiting async command
#[derive(Debug)]
pub(crate) enum Event {
    /// A sentence for the command arrived
    Progress,

    /// The reply is complete
    Finished(Result<Reply>),
}

enum Pending {
    Command {
        collector: ReplyCollector,
        events: mpsc::UnboundedSender<Event>,
    },
    Listen {
        items: mpsc::Sender<Sentence>,
        outcome: oneshot::Sender<Result<()>>,
    },
}

enum Table {
    /// Async mode not enabled yet
    Idle,

    /// Background loop running
    Open(HashMap<String, Pending>),

    /// Background loop gone, no more registrations
    Ended,
}

/// What happens to an entry after it saw a sentence
enum Step {
    Keep,
    Remove,
    EndListen(Result<()>),
}

/// Receiving side of a listen command
///
/// Rows arrive through a bounded queue. How the stream ended is kept
/// apart from the rows, so it is reported even when the queue was full.
#[derive(Debug)]
pub(crate) struct ListenStream {
    items: mpsc::Receiver<Sentence>,
    outcome: Option<oneshot::Receiver<Result<()>>>,
}

impl ListenStream {
    /// Next row, then the error that ended the stream if any, then `None`
    pub(crate) async fn recv(&mut self) -> Option<Result<Sentence>> {
        if let Some(item) = self.items.recv().await {
            return Some(Ok(item));
        }

        match self.outcome.take()?.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(Err(e)),
            // Entry dropped without an outcome
            Err(_) => Some(Err(Error::AsyncLoopEnded)),
        }
    }
}

/// Pending command table, keyed by tag
pub(crate) struct Dispatcher {
    table: Mutex<Table>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(Table::Idle),
        }
    }

    /// Accept registrations; no-op once the table was opened before
    pub(crate) fn open(&self) {
        let mut table = self.table.lock();
        if matches!(*table, Table::Idle) {
            *table = Table::Open(HashMap::new());
        }
    }

    /// Check if async mode was ever enabled
    pub(crate) fn is_multiplexed(&self) -> bool {
        !matches!(*self.table.lock(), Table::Idle)
    }

    /// Number of commands waiting for their reply
    pub(crate) fn pending(&self) -> usize {
        match &*self.table.lock() {
            Table::Open(map) => map.len(),
            _ => 0,
        }
    }

    pub(crate) fn register_command(&self, tag: &str) -> Result<mpsc::UnboundedReceiver<Event>> {
        let (events, rx) = mpsc::unbounded_channel();
        self.insert(
            tag,
            Pending::Command {
                collector: ReplyCollector::new(),
                events,
            },
        )?;
        Ok(rx)
    }

    pub(crate) fn register_listen(&self, tag: &str, capacity: usize) -> Result<ListenStream> {
        let (items, items_rx) = mpsc::channel(capacity.max(1));
        let (outcome, outcome_rx) = oneshot::channel();
        self.insert(tag, Pending::Listen { items, outcome })?;

        Ok(ListenStream {
            items: items_rx,
            outcome: Some(outcome_rx),
        })
    }

    fn insert(&self, tag: &str, pending: Pending) -> Result<()> {
        match &mut *self.table.lock() {
            Table::Open(map) => {
                debug!(tag = tag, "Registered command");
                map.insert(tag.to_string(), pending);
                Ok(())
            }
            _ => Err(Error::AsyncLoopEnded),
        }
    }

    pub(crate) fn remove(&self, tag: &str) {
        if let Table::Open(map) = &mut *self.table.lock() {
            map.remove(tag);
        }
    }

    /// Deliver one sentence to the command owning its tag
    ///
    /// Fails only when the sentence ends the whole connection.
    pub(crate) fn route(&self, sentence: Sentence) -> Result<()> {
        if Verb::of(&sentence) == Verb::Fatal {
            return Err(rosapi_core::Error::Fatal { sentence }.into());
        }

        let Some(tag) = sentence.tag.clone() else {
            warn!(sentence = %sentence, "Dropping untagged sentence");
            return Ok(());
        };

        let mut table = self.table.lock();
        let Table::Open(map) = &mut *table else {
            return Err(Error::AsyncLoopEnded);
        };

        let Some(pending) = map.get_mut(&tag) else {
            debug!(tag = %tag, "Dropping sentence for unknown tag");
            return Ok(());
        };

        let step = match pending {
            Pending::Command { collector, events } => match collector.process(sentence) {
                Progress::Pending => {
                    let _ = events.send(Event::Progress);
                    Step::Keep
                }
                Progress::Finished(result) => {
                    let _ = events.send(Event::Finished(result.map_err(Error::from)));
                    Step::Remove
                }
            },
            Pending::Listen { items, .. } => match reply::listen_progress(sentence) {
                ListenProgress::Ignored => Step::Keep,
                ListenProgress::Item(sentence) => match items.try_send(sentence) {
                    Ok(()) => Step::Keep,
                    Err(TrySendError::Full(_)) => {
                        warn!(tag = %tag, "Listen queue full, ending listen");
                        Step::EndListen(Err(Error::ListenOverflow {
                            capacity: items.max_capacity(),
                        }))
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(tag = %tag, "Listener gone");
                        Step::Remove
                    }
                },
                ListenProgress::Finished(result) => {
                    Step::EndListen(result.map(|_| ()).map_err(Error::from))
                }
            },
        };

        match step {
            Step::Keep => {}
            Step::Remove => {
                map.remove(&tag);
                trace!(tag = %tag, "Command finished");
            }
            Step::EndListen(result) => {
                if let Some(Pending::Listen { outcome, .. }) = map.remove(&tag) {
                    let _ = outcome.send(result);
                }
                trace!(tag = %tag, "Listen finished");
            }
        }

        Ok(())
    }

    /// Stop accepting registrations and fail every pending command
    pub(crate) fn end(&self, reason: impl Fn() -> Error) {
        let drained = {
            let mut table = self.table.lock();
            match std::mem::replace(&mut *table, Table::Ended) {
                Table::Open(map) => map,
                Table::Idle => {
                    *table = Table::Idle;
                    return;
                }
                Table::Ended => return,
            }
        };

        debug!(pending = drained.len(), "Failing pending commands");

        for (_, pending) in drained {
            match pending {
                Pending::Command { events, .. } => {
                    let _ = events.send(Event::Finished(Err(reason())));
                }
                Pending::Listen { outcome, .. } => {
                    let _ = outcome.send(Err(reason()));
                }
            }
        }
    }
}

/// Resolve once the client signals shutdown or is dropped
pub(crate) async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

/// Read half of a client connection
pub(crate) type StreamReader = SentenceReader<ReadHalf<BoxedStream>>;

/// Read half of a client connection; `None` once the client closed it
pub(crate) type ReaderSlot = Option<StreamReader>;

/// Background reader for async mode
///
/// Runs until the client closes, the stream fails or the device sends
/// `!fatal`. On exit every pending command fails and no new ones can
/// register.
pub(crate) async fn run_loop(
    dispatcher: Arc<Dispatcher>,
    mut slot: OwnedMutexGuard<ReaderSlot>,
    session: Session,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let Some(reader) = &mut *slot else {
        dispatcher.end(|| Error::AsyncLoopEnded);
        return Ok(());
    };

    debug!("Async loop started");

    let result = loop {
        let read = tokio::select! {
            _ = closed(&mut shutdown) => break Ok(()),
            read = reader.read_sentence(false) => read,
        };

        let sentence = match read {
            Ok(sentence) => sentence,
            Err(e) => break Err(Error::from(e)),
        };

        if let Err(e) = dispatcher.route(sentence) {
            break Err(e);
        }
    };

    match result {
        Ok(()) => {
            debug!("Async loop stopped");
            dispatcher.end(|| Error::AsyncLoopEnded);
            Ok(())
        }
        Err(err) => {
            if err.is_fatal() {
                warn!(error = %err, "Device closed the connection");
                session.close();
            } else {
                warn!(error = %err, "Async loop failed");
            }

            let cause = Arc::new(err);
            dispatcher.end(|| Error::ConnectionLost(cause.clone()));
            Err(Error::ConnectionLost(cause))
        }
    }
}
