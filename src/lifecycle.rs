// src/lifecycle.rs
//! Connection state and the one-shot close-completion token

use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Opening => "opening",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Connection state shared between the monitor and its reader task.
#[derive(Debug, Clone)]
pub struct SharedState(Arc<Mutex<ConnectionState>>);

impl SharedState {
    pub fn new(state: ConnectionState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub fn get(&self) -> ConnectionState {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, state: ConnectionState) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }
}

/// How a closing phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The byte source released the port.
    Released,
    /// Closing reported an error or panicked.
    Failed(String),
    /// The closing task went away without reporting.
    Cancelled,
}

/// Create the resolver/token pair for one closing phase.
pub fn close_channel(state: SharedState) -> (CloseResolver, CloseToken) {
    let (tx, rx) = watch::channel(None);
    (
        CloseResolver {
            tx: Some(tx),
            state,
        },
        CloseToken { rx },
    )
}

/// Read side of the close signal. Cheap to clone; every clone sees the
/// same single outcome.
#[derive(Debug, Clone)]
pub struct CloseToken {
    rx: watch::Receiver<Option<CloseOutcome>>,
}

impl CloseToken {
    /// The outcome, if the close has already finished.
    pub fn outcome(&self) -> Option<CloseOutcome> {
        self.rx.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the close finishes.
    pub async fn wait(&self) -> CloseOutcome {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(CloseOutcome::Cancelled)
    }
}

/// Write side of the close signal, owned by whoever performs the close.
///
/// Resolves exactly once: explicitly through [`CloseResolver::resolve`], or
/// on drop. Dropping during a panic resolves as `Failed`, any other drop
/// as `Cancelled`. Resolution moves the shared state to `Closed` before
/// waiters are woken.
#[derive(Debug)]
pub struct CloseResolver {
    tx: Option<watch::Sender<Option<CloseOutcome>>>,
    state: SharedState,
}

impl CloseResolver {
    pub fn resolve(mut self, outcome: CloseOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: CloseOutcome) {
        if let Some(tx) = self.tx.take() {
            self.state.set(ConnectionState::Closed);
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for CloseResolver {
    fn drop(&mut self) {
        let outcome = if std::thread::panicking() {
            CloseOutcome::Failed("panic while closing the port".to_string())
        } else {
            CloseOutcome::Cancelled
        };
        self.finish(outcome);
    }
}
