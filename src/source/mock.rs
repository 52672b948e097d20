// src/source/mock.rs
//! Scripted byte source for lifecycle tests

use super::ByteSource;
use crate::error::{GpsError, Result};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::{mpsc, oneshot};

type Read = std::result::Result<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseBehavior {
    Release,
    Fail,
    Panic,
}

#[derive(Debug)]
struct Shared {
    reads: tokio::sync::Mutex<mpsc::UnboundedReceiver<Read>>,
    in_use: AtomicBool,
    fail_open: AtomicBool,
    panic_on_read: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
    open_gate: Mutex<Option<oneshot::Receiver<()>>>,
    close_gate: Mutex<Option<oneshot::Receiver<()>>>,
    close_behavior: Mutex<CloseBehavior>,
}

/// A byte source whose reads and closes are driven by a [`MockController`].
///
/// Opening while a previous port is still held fails, which is how tests
/// detect a double open.
#[derive(Debug, Clone)]
pub(crate) struct MockByteSource {
    shared: Arc<Shared>,
}

#[derive(Debug, Clone)]
pub(crate) struct MockController {
    shared: Arc<Shared>,
    reads: mpsc::UnboundedSender<Read>,
}

impl MockByteSource {
    pub(crate) fn new() -> (Self, MockController) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            reads: tokio::sync::Mutex::new(rx),
            in_use: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            panic_on_read: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            open_gate: Mutex::new(None),
            close_gate: Mutex::new(None),
            close_behavior: Mutex::new(CloseBehavior::Release),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockController { shared, reads: tx },
        )
    }
}

impl MockController {
    pub(crate) fn send_line(&self, line: &str) {
        let _ = self.reads.send(Ok(line.to_string()));
    }

    pub(crate) fn send_error(&self, message: &str) {
        let _ = self.reads.send(Err(message.to_string()));
    }

    /// Make the next open wait until the returned sender fires.
    pub(crate) fn hold_open(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.shared.open_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Panic inside the next read once a line arrives.
    pub(crate) fn panic_next_read(&self) {
        self.shared.panic_on_read.store(true, Ordering::SeqCst);
    }

    /// Make the next close wait until the returned sender fires.
    pub(crate) fn hold_close(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.shared.close_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn set_close_behavior(&self, behavior: CloseBehavior) {
        *self.shared.close_behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn in_use(&self) -> bool {
        self.shared.in_use.load(Ordering::SeqCst)
    }
}

impl ByteSource for MockByteSource {
    type Port = ();

    async fn open(&self, port: &str, _baud_rate: u32) -> Result<()> {
        let gate = self.shared.open_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(GpsError::Connection(format!("{} refused to open", port)));
        }
        if self.shared.in_use.swap(true, Ordering::SeqCst) {
            return Err(GpsError::Connection(format!("{} opened twice", port)));
        }
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_line(&self, _port: &mut ()) -> Result<Option<String>> {
        let mut reads = self.shared.reads.lock().await;
        let read = reads.recv().await;
        if self.shared.panic_on_read.swap(false, Ordering::SeqCst) {
            panic!("serial driver fault");
        }
        match read {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(message)) => Err(GpsError::Io(std::io::Error::other(message))),
            None => Ok(None),
        }
    }

    async fn close(&self, _port: ()) -> Result<()> {
        let gate = self.shared.close_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.shared.close_behavior.lock().unwrap();
        match behavior {
            CloseBehavior::Release => {
                self.shared.in_use.store(false, Ordering::SeqCst);
                Ok(())
            }
            CloseBehavior::Fail => Err(GpsError::Other("device busy".to_string())),
            CloseBehavior::Panic => panic!("close notification handler failed"),
        }
    }
}
