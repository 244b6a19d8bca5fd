//! API client
//!
//! [`Client`] owns one connection to a device and runs commands on it,
//! either one at a time (synchronous mode) or many at once, correlated by
//! tag (async mode).

use std::sync::Arc;

use rosapi_core::constants::{COMMAND_TAG_PREFIX, LISTEN_TAG_PREFIX, keys};
use rosapi_core::{Command, Progress, ReplyCollector, Session, auth, sentence};
use rosapi_transport::{AsyncStream, BoxedStream, Connector, SentenceReader, SentenceWriter, TcpTransport};
use rosapi_types::Reply;
use tokio::io::WriteHalf;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::dispatch::{self, Dispatcher, Event, ReaderSlot};
use crate::error::{Error, Result};
use crate::listen::ListenReply;

/// RouterOS API client
///
/// Cloning is cheap; clones share the connection, so commands can be
/// issued from several tasks once async mode is enabled.
///
/// In synchronous mode the caller must not run commands concurrently:
/// replies are read inline and carry no tag to tell them apart.
///
/// # Examples
///
/// ```no_run
/// use rosapi::Client;
///
/// #[tokio::main]
/// async fn main() -> rosapi::Result<()> {
///     let client = Client::dial("192.168.88.1", 8728, "admin", "").await?;
///
///     let reply = client.run(&["/system/resource/print"]).await?;
///     for row in reply.rows() {
///         println!("uptime: {:?}", row.get("uptime"));
///     }
///
///     client.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    reader: Arc<Mutex<ReaderSlot>>,
    writer: SentenceWriter<WriteHalf<BoxedStream>>,
    dispatcher: Arc<Dispatcher>,
    session: Session,
    shutdown: watch::Sender<bool>,
    config: ClientConfig,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Stops the async loop, which holds no reference back to us
        self.shutdown.send_replace(true);
    }
}

impl Client {
    /// Create a client over an established stream with default options
    ///
    /// No login is performed; call [`Client::login`] next.
    pub fn new<S: AsyncStream + 'static>(stream: S) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    /// Create a client over an established stream
    pub fn with_config<S: AsyncStream + 'static>(stream: S, config: ClientConfig) -> Self {
        let stream: BoxedStream = Box::new(stream);
        let (read, write) = tokio::io::split(stream);
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                reader: Arc::new(Mutex::new(Some(
                    SentenceReader::new(read, config.timeout).with_max_word_len(config.max_word_len),
                ))),
                writer: SentenceWriter::new(write, config.timeout),
                dispatcher: Arc::new(Dispatcher::new()),
                session: Session::new(),
                shutdown,
                config,
            }),
        }
    }

    /// Connect over TCP and log in with default options
    pub async fn dial(
        addr: impl Into<String>,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let config = ClientConfig::default();
        let transport = TcpTransport::new(addr, port).with_connect_timeout(config.timeout);
        Self::dial_with(&transport, username, password, config).await
    }

    /// Connect through `connector` and log in
    ///
    /// The connection is closed again if login fails.
    pub async fn dial_with<C: Connector + ?Sized>(
        connector: &C,
        username: &str,
        password: &str,
        config: ClientConfig,
    ) -> Result<Self> {
        info!("Connecting to {}...", connector.remote_addr());

        let stream = connector.connect().await?;
        let async_mode = config.async_mode;
        let client = Self::with_config(stream, config);

        if let Err(e) = client.login(username, password).await {
            warn!(error = %e, "Login to {} failed", connector.remote_addr());
            client.close().await;
            return Err(e);
        }

        if async_mode {
            client.enable_async();
        }

        info!("Connected to {}", connector.remote_addr());
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Check if async mode is enabled
    pub fn is_async(&self) -> bool {
        self.inner.session.is_async()
    }

    /// Check if closed
    pub fn is_closed(&self) -> bool {
        self.inner.session.is_closed()
    }

    /// Number of async commands still waiting for their reply
    pub fn pending(&self) -> usize {
        self.inner.dispatcher.pending()
    }

    /// Log in as `username`
    ///
    /// Handles both the one-step cleartext login and the legacy
    /// challenge-response login. [`Client::dial`] calls this already.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let name = format!("=name={}", username);
        let secret = format!("=password={}", password);
        let reply = self.run(&["/login", name.as_str(), secret.as_str()]).await?;

        let Some(challenge) = reply.done.get(keys::RET) else {
            info!(user = username, "Logged in");
            return Ok(());
        };

        debug!("Answering legacy login challenge");
        let response = format!("=response={}", auth::challenge_response(password, challenge)?);
        self.run(&["/login", name.as_str(), response.as_str()]).await?;

        info!(user = username, "Logged in (challenge-response)");
        Ok(())
    }

    /// Switch to async mode
    ///
    /// The switch is permanent. The first call spawns the background
    /// reader and returns its handle; the handle resolves when the loop
    /// ends, with an error unless the client was closed. Later calls,
    /// and calls on a closed client, return `None`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn enable_async(&self) -> Option<JoinHandle<Result<()>>> {
        match self.inner.session.enable_async() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                debug!(error = %e, "Async mode not enabled");
                return None;
            }
        }

        self.inner.dispatcher.open();
        debug!("Async mode enabled");

        let reader = self.inner.reader.clone();
        let dispatcher = self.inner.dispatcher.clone();
        let session = self.inner.session.clone();
        let shutdown = self.inner.shutdown.subscribe();

        Some(tokio::spawn(async move {
            let reader = reader.lock_owned().await;
            dispatch::run_loop(dispatcher, reader, session, shutdown).await
        }))
    }

    /// Run a command given as raw words
    ///
    /// Fails with an empty-word error before anything is sent if any
    /// word is empty or blank.
    pub async fn run<S: AsRef<str> + Sync>(&self, words: &[S]) -> Result<Reply> {
        let command = Command::from_words(words.iter().map(|w| w.as_ref().to_string()))?;
        self.run_command(command).await
    }

    /// Run a command given as owned words
    pub async fn run_args(&self, words: Vec<String>) -> Result<Reply> {
        self.run_command(Command::from_words(words)?).await
    }

    /// Run a command and wait for its reply
    ///
    /// A `!trap` reply is returned as a device error; the connection
    /// stays usable.
    pub async fn run_command(&self, command: Command) -> Result<Reply> {
        command.validate()?;

        if self.is_closed() {
            return Err(Error::Closed);
        }
        if self.inner.dispatcher.is_multiplexed() {
            return self.run_async(command).await;
        }
        self.run_sync(command).await
    }

    /// Start a streaming command given as raw words
    ///
    /// See [`Client::listen_command`].
    pub async fn listen<S: AsRef<str> + Sync>(&self, words: &[S]) -> Result<ListenReply> {
        let command = Command::from_words(words.iter().map(|w| w.as_ref().to_string()))?;
        self.listen_command(command).await
    }

    /// Start a streaming command such as `/interface/listen`
    ///
    /// Switches the client to async mode if needed. Rows arrive through
    /// the returned [`ListenReply`] until the device ends the stream or
    /// it is cancelled.
    pub async fn listen_command(&self, command: Command) -> Result<ListenReply> {
        command.validate()?;

        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.enable_async();

        let tag = self.inner.session.next_tag_with(LISTEN_TAG_PREFIX);
        let items = self
            .inner
            .dispatcher
            .register_listen(&tag, self.inner.config.listen_queue)?;

        debug!(tag = %tag, command = %command, "Starting listen");

        if let Err(e) = self.write_tagged(&command, &tag).await {
            self.inner.dispatcher.remove(&tag);
            return Err(e);
        }

        Ok(ListenReply::new(self.clone(), tag, items))
    }

    /// Close the connection
    ///
    /// Idempotent. Pending async commands fail, later ones are rejected
    /// and both halves of the stream are released. Does not wait for a
    /// sentence that is still being written.
    pub async fn close(&self) {
        if self.inner.session.close() {
            info!("Closing connection");
        }

        self.inner.shutdown.send_replace(true);
        self.inner.dispatcher.end(|| Error::AsyncLoopEnded);

        // Readers stop on the shutdown signal, so the slot frees up promptly
        self.inner.reader.lock().await.take();

        if let Err(e) = self.inner.writer.close().await {
            debug!(error = %e, "Error shutting down stream");
        }
    }

    async fn run_sync(&self, command: Command) -> Result<Reply> {
        trace!(command = %command, "Running command");

        self.inner.writer.write_sentence(command.words()).await?;

        let result = {
            let mut slot = self.inner.reader.lock().await;
            let Some(reader) = &mut *slot else {
                return Err(Error::Closed);
            };
            let mut shutdown = self.inner.shutdown.subscribe();
            let mut collector = ReplyCollector::new();

            loop {
                let read = tokio::select! {
                    _ = dispatch::closed(&mut shutdown) => break Err(Error::Closed),
                    read = reader.read_sentence(true) => read,
                };

                let sentence = match read {
                    Ok(sentence) => sentence,
                    Err(e) => break Err(Error::from(e)),
                };

                if let Progress::Finished(result) = collector.process(sentence) {
                    break result.map_err(Error::from);
                }
            }
        };

        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, "Device closed the connection");
                self.close().await;
            }
        }

        result
    }

    async fn run_async(&self, command: Command) -> Result<Reply> {
        let tag = self.inner.session.next_tag_with(COMMAND_TAG_PREFIX);
        let mut events = self.inner.dispatcher.register_command(&tag)?;

        trace!(tag = %tag, command = %command, "Running async command");

        if let Err(e) = self.write_tagged(&command, &tag).await {
            self.inner.dispatcher.remove(&tag);
            return Err(e);
        }

        self.wait_reply(&mut events).await
    }

    /// Write `command` with a tag word appended
    async fn write_tagged(&self, command: &Command, tag: &str) -> Result<()> {
        let mut guard = self.inner.writer.begin_sentence().await?;
        for word in command.words() {
            guard.write_word(word).await;
        }
        guard.write_word(&sentence::tag_word(tag)).await;
        guard.end_sentence().await?;
        Ok(())
    }

    /// Wait for an async reply; the timeout restarts with every sentence
    async fn wait_reply(&self, events: &mut mpsc::UnboundedReceiver<Event>) -> Result<Reply> {
        let limit = self.inner.config.timeout;

        loop {
            let event = if limit.is_zero() {
                events.recv().await
            } else {
                match tokio::time::timeout(limit, events.recv()).await {
                    Ok(event) => event,
                    Err(_) => return Err(Error::AsyncTimeout { timeout: limit }),
                }
            };

            match event {
                Some(Event::Progress) => continue,
                Some(Event::Finished(result)) => return result,
                None => return Err(Error::AsyncLoopEnded),
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.inner.session.state())
            .field("pending", &self.pending())
            .field("config", &self.inner.config)
            .finish()
    }
}
