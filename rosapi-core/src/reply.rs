//! Reply aggregation
//!
//! Folds the sentences addressed to one command into a [`Reply`] or an
//! error. The collector moves through these states:
//!
//! ```text
//!            !re                   !re
//!          ┌─────┐               ┌─────┐
//!          ▼     │     !trap     ▼     │
//!      Collecting ───────────► Trapped ─┘
//!          │                     │
//!    !done │                     │ !done
//!          ▼                     ▼
//!        Done (Ok)          Done (Err Device)
//!
//!   !fatal or unknown verb from any state: Done (Err)
//! ```

use rosapi_types::{Reply, Sentence};
use tracing::trace;

use crate::{
    command::Verb,
    constants::{categories, keys},
    error::{Error, Result},
};

/// Collector state
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CollectorState {
    /// Accepting `!re` sentences
    Collecting,

    /// A trap was seen; waiting for `!done`
    Trapped,

    /// Terminal sentence seen
    Done,
}

/// Result of feeding one sentence
#[derive(Debug)]
pub enum Progress {
    /// More sentences are expected
    Pending,

    /// Reply is complete
    Finished(Result<Reply>),
}

/// Accumulates the reply of a single command
#[derive(Debug)]
pub struct ReplyCollector {
    re: Vec<Sentence>,
    trap: Option<Sentence>,
    state: CollectorState,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self {
            re: Vec::new(),
            trap: None,
            state: CollectorState::Collecting,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Feed the next sentence addressed to this command
    ///
    /// Sentences fed after the collector finished are ignored.
    pub fn process(&mut self, sentence: Sentence) -> Progress {
        if self.state == CollectorState::Done {
            return Progress::Pending;
        }

        let verb = Verb::of(&sentence);
        trace!(verb = %verb, state = ?self.state, "Collecting reply sentence");

        match verb {
            Verb::Re => {
                self.re.push(sentence);
                Progress::Pending
            }
            Verb::Done => {
                self.state = CollectorState::Done;
                let re = std::mem::take(&mut self.re);
                match self.trap.take() {
                    Some(trap) => Progress::Finished(Err(Error::Device { sentence: trap })),
                    None => Progress::Finished(Ok(Reply::new(re, sentence))),
                }
            }
            Verb::Trap => {
                // A later trap replaces an earlier one
                self.trap = Some(sentence);
                self.state = CollectorState::Trapped;
                Progress::Pending
            }
            Verb::Fatal => {
                self.state = CollectorState::Done;
                Progress::Finished(Err(Error::Fatal { sentence }))
            }
            Verb::Empty => Progress::Pending,
            Verb::Unknown => {
                self.state = CollectorState::Done;
                Progress::Finished(Err(Error::UnknownReply { sentence }))
            }
        }
    }
}

impl Default for ReplyCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding one sentence to a listen command
#[derive(Debug)]
pub enum ListenProgress {
    /// Sentence carries nothing for the listener
    Ignored,

    /// One streamed `!re` sentence
    Item(Sentence),

    /// Stream ended; `Ok` carries the terminating sentence
    Finished(Result<Sentence>),
}

/// Classify a sentence addressed to a listen command
///
/// Listen commands stream `!re` sentences until cancelled. A trap in the
/// interrupted category is what a cancelled listen ends with, so it
/// finishes the stream cleanly.
pub fn listen_progress(sentence: Sentence) -> ListenProgress {
    match Verb::of(&sentence) {
        Verb::Re => ListenProgress::Item(sentence),
        Verb::Done => ListenProgress::Finished(Ok(sentence)),
        Verb::Trap if sentence.get(keys::CATEGORY) == Some(categories::INTERRUPTED) => {
            ListenProgress::Finished(Ok(sentence))
        }
        Verb::Trap => ListenProgress::Finished(Err(Error::Device { sentence })),
        Verb::Fatal => ListenProgress::Finished(Err(Error::Fatal { sentence })),
        Verb::Empty => ListenProgress::Ignored,
        Verb::Unknown => ListenProgress::Finished(Err(Error::UnknownReply { sentence })),
    }
}
