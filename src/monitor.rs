// src/monitor.rs
//! Connection lifecycle: serializes start/stop against asynchronous closes

use crate::{
    error::{GpsError, Result},
    gps::{data::FixState, decoder::NmeaDecoder},
    lifecycle::{
        close_channel, CloseOutcome, CloseResolver, CloseToken, ConnectionState, SharedState,
    },
    source::ByteSource,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Pause after a read error so a dead port does not spin the reader.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Where and how fast to open the byte source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub port: String,
    pub baud_rate: u32,
}

/// Puts the state back to `Closed` if an open does not run to completion,
/// including when the `start` future is dropped mid-open.
struct OpeningGuard {
    state: SharedState,
    armed: bool,
}

impl OpeningGuard {
    fn new(state: SharedState) -> Self {
        state.set(ConnectionState::Opening);
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OpeningGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.set(ConnectionState::Closed);
        }
    }
}

#[derive(Default)]
struct Control {
    /// Token of the most recent closing phase; kept while it is pending or
    /// if it ended badly.
    pending_close: Option<CloseToken>,
    shutdown: Option<oneshot::Sender<CloseResolver>>,
    reader: Option<JoinHandle<()>>,
}

/// Owns the byte source connection and feeds its sentences to the decoder.
///
/// `start` and `stop` are serialized. At most one open is ever in flight,
/// and a start issued while a close is pending waits for that close to
/// finish before touching the byte source.
pub struct GpsMonitor<S: ByteSource> {
    source: Arc<S>,
    settings: ConnectionSettings,
    decoder: Arc<NmeaDecoder>,
    state: SharedState,
    control: Mutex<Control>,
}

impl<S: ByteSource> GpsMonitor<S> {
    pub fn new(source: S, settings: ConnectionSettings, decoder: Arc<NmeaDecoder>) -> Self {
        Self {
            source: Arc::new(source),
            settings,
            decoder,
            state: SharedState::new(ConnectionState::Closed),
            control: Mutex::new(Control::default()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn decoder(&self) -> &Arc<NmeaDecoder> {
        &self.decoder
    }

    /// Get a copy of the current fix state
    pub fn snapshot(&self) -> FixState {
        self.decoder.snapshot()
    }

    /// Open the byte source and start dispatching sentences.
    ///
    /// Fails with `AlreadyRunning` when opening or open. If the previous
    /// stop has not finished closing, waits for it; a close that failed or
    /// was cancelled is reported here instead of reopening.
    pub async fn start(&self) -> Result<()> {
        let mut control = self.control.lock().await;

        match self.state() {
            ConnectionState::Opening | ConnectionState::Open => {
                return Err(GpsError::AlreadyRunning);
            }
            ConnectionState::Closed | ConnectionState::Closing => {}
        }

        if let Some(token) = control.pending_close.clone() {
            if !token.is_resolved() {
                info!("waiting for previous close to finish before reopening");
            }
            match token.wait().await {
                CloseOutcome::Released => control.pending_close = None,
                CloseOutcome::Failed(msg) => return Err(GpsError::CloseFailed(msg)),
                CloseOutcome::Cancelled => return Err(GpsError::UnsafeToReopen),
            }
        }
        // The reader of the previous session resolved its token and is exiting.
        if let Some(reader) = control.reader.take() {
            join_reader(reader).await;
        }

        let opening = OpeningGuard::new(self.state.clone());
        let port = match self
            .source
            .open(&self.settings.port, self.settings.baud_rate)
            .await
        {
            Ok(port) => port,
            Err(e) => {
                warn!(port = %self.settings.port, error = %e, "failed to open GPS source");
                return Err(e);
            }
        };

        self.state.set(ConnectionState::Open);
        self.decoder.activate();
        info!(port = %self.settings.port, baud_rate = self.settings.baud_rate, "GPS source open");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        control.shutdown = Some(shutdown_tx);
        control.reader = Some(tokio::spawn(read_sentences(
            Arc::clone(&self.source),
            port,
            Arc::clone(&self.decoder),
            shutdown_rx,
        )));
        opening.disarm();

        Ok(())
    }

    /// Stop dispatching and begin closing the byte source.
    ///
    /// Returns immediately; the close finishes on the reader task. Returns
    /// `false` (a no-op) unless the connection is open.
    pub async fn stop(&self) -> bool {
        let mut control = self.control.lock().await;

        let state = self.state();
        if state != ConnectionState::Open {
            info!(%state, "stop ignored, connection is not open");
            return false;
        }

        self.decoder.deactivate();
        self.state.set(ConnectionState::Closing);

        let (resolver, token) = close_channel(self.state.clone());
        control.pending_close = Some(token);

        match control.shutdown.take() {
            Some(shutdown) => {
                if let Err(resolver) = shutdown.send(resolver) {
                    let reason = match control.reader.take() {
                        Some(reader) => join_reader(reader).await,
                        None => None,
                    };
                    let reason =
                        reason.unwrap_or_else(|| "reader task exited unexpectedly".to_string());
                    resolver.resolve(CloseOutcome::Failed(reason));
                }
            }
            None => resolver.resolve(CloseOutcome::Failed("no reader task to close".to_string())),
        }

        info!(port = %self.settings.port, "closing GPS source");
        true
    }

    /// Wait for the most recent close to finish. `None` if there is none.
    pub async fn wait_closed(&self) -> Option<CloseOutcome> {
        let token = self.control.lock().await.pending_close.clone()?;
        Some(token.wait().await)
    }
}

/// Wait for a reader task to finish. Returns a failure reason if it panicked.
async fn join_reader(reader: JoinHandle<()>) -> Option<String> {
    match reader.await {
        Err(e) if e.is_panic() => {
            warn!("GPS reader task panicked");
            Some("reader task panicked".to_string())
        }
        _ => None,
    }
}

/// Reader task: dispatches lines until asked to close, then closes the port
/// and resolves the close token.
async fn read_sentences<S: ByteSource>(
    source: Arc<S>,
    mut port: S::Port,
    decoder: Arc<NmeaDecoder>,
    mut shutdown: oneshot::Receiver<CloseResolver>,
) {
    let resolver = loop {
        tokio::select! {
            biased;

            resolver = &mut shutdown => break resolver.ok(),

            read = source.read_line(&mut port) => match read {
                Ok(Some(line)) => {
                    decoder.handle_sentence(&line);
                }
                Ok(None) => {
                    decoder.handle_transport_error(&"end of stream");
                    break (&mut shutdown).await.ok();
                }
                Err(e) => {
                    decoder.handle_transport_error(&e);
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
            },
        }
    };

    // Close on its own task so a panicking close is caught and reported.
    let closing = tokio::spawn(async move { source.close(port).await });
    let outcome = match closing.await {
        Ok(Ok(())) => CloseOutcome::Released,
        Ok(Err(e)) => {
            warn!(error = %e, "GPS source failed to close");
            CloseOutcome::Failed(e.to_string())
        }
        Err(e) if e.is_panic() => {
            warn!("GPS source panicked while closing");
            CloseOutcome::Failed("panic while closing the port".to_string())
        }
        Err(_) => CloseOutcome::Cancelled,
    };

    // Without a resolver the monitor was dropped and nobody is waiting.
    if let Some(resolver) = resolver {
        resolver.resolve(outcome);
    }
}
