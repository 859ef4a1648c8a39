//! The control-message transport (§4.5.2): broadcast (one-to-many by name),
//! point-to-point (a single channel endpoint), and in-process (same-process
//! event dispatch). Transports carry control messages only — task lists and
//! results move through the worker API ([`crate::coordinator`]), never
//! through here. Every transport must be closed explicitly; dropping one
//! without calling [`Transport::close`] leaves its threads' senders
//! dangling, which is a caller bug this layer does not paper over.

use crossbeam_channel as chan;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::WorkerError;

/// A control message exchanged between the coordinator and workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    /// Ask the recipient to stop at its next checkpoint.
    Cancel,
    /// Liveness probe.
    Ping,
    /// Ask the recipient to release its resources and exit.
    Shutdown,
    /// An application-defined message.
    Custom(String),
}

/// Common transport operations, implemented by each of the three flavors.
pub trait Transport: Send + Sync {
    /// Send a message to a single named recipient.
    ///
    /// # Errors
    /// [`WorkerError::TransportClosed`] after [`close`](Self::close), or if
    /// `target` is not a known recipient.
    fn send(&self, target: &str, message: ControlMessage) -> Result<(), WorkerError>;

    /// Send a message to every recipient.
    ///
    /// # Errors
    /// [`WorkerError::TransportClosed`] after [`close`](Self::close).
    fn broadcast(&self, message: ControlMessage) -> Result<(), WorkerError>;

    /// Wait up to `timeout` for the next inbound `(sender, message)` pair,
    /// or `None` on timeout.
    ///
    /// # Errors
    /// [`WorkerError::TransportClosed`] after [`close`](Self::close).
    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(String, ControlMessage)>, WorkerError>;

    /// Release the transport's channels. Idempotent.
    fn close(&mut self);
}

struct Endpoint {
    tx: chan::Sender<ControlMessage>,
}

/// One-to-many transport: a named set of outbound channels plus a single
/// shared inbound channel every recipient replies through.
pub struct BroadcastTransport {
    peers: HashMap<String, Endpoint>,
    inbox_tx: chan::Sender<(String, ControlMessage)>,
    inbox_rx: chan::Receiver<(String, ControlMessage)>,
    closed: bool,
}

impl BroadcastTransport {
    /// Build an empty broadcast transport; peers register their own
    /// outbound channel via [`register`](Self::register).
    #[must_use]
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = chan::unbounded();
        Self {
            peers: HashMap::new(),
            inbox_tx,
            inbox_rx,
            closed: false,
        }
    }

    /// Register `name` as a recipient, returning the receiving end it
    /// should poll, and a sender it uses to reply into the shared inbox.
    pub fn register(
        &mut self,
        name: impl Into<String>,
    ) -> (chan::Receiver<ControlMessage>, chan::Sender<(String, ControlMessage)>) {
        let (tx, rx) = chan::unbounded();
        self.peers.insert(name.into(), Endpoint { tx });
        (rx, self.inbox_tx.clone())
    }
}

impl Default for BroadcastTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for BroadcastTransport {
    fn send(&self, target: &str, message: ControlMessage) -> Result<(), WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        let endpoint = self.peers.get(target).ok_or_else(|| {
            WorkerError::Git(git_backend::GitError::NotFound {
                what: format!("transport peer '{target}'"),
            })
        })?;
        endpoint.tx.send(message).map_err(|_| WorkerError::TransportClosed)
    }

    fn broadcast(&self, message: ControlMessage) -> Result<(), WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        for endpoint in self.peers.values() {
            let _ = endpoint.tx.send(message.clone());
        }
        Ok(())
    }

    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(String, ControlMessage)>, WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        match self.inbox_rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(chan::RecvTimeoutError::Timeout) => Ok(None),
            Err(chan::RecvTimeoutError::Disconnected) => Err(WorkerError::TransportClosed),
        }
    }

    fn close(&mut self) {
        self.peers.clear();
        self.closed = true;
    }
}

/// One-to-one transport: a single channel pair between the coordinator and
/// one worker.
pub struct PointToPointTransport {
    tx: chan::Sender<ControlMessage>,
    rx: chan::Receiver<(String, ControlMessage)>,
    peer_name: String,
    closed: bool,
}

impl PointToPointTransport {
    /// Build a point-to-point pair; returns this end plus the receiver and
    /// sender the other end should use.
    #[must_use]
    pub fn pair(
        peer_name: impl Into<String>,
    ) -> (Self, chan::Receiver<ControlMessage>, chan::Sender<(String, ControlMessage)>) {
        let (out_tx, out_rx) = chan::unbounded();
        let (in_tx, in_rx) = chan::unbounded();
        let name = peer_name.into();
        (
            Self {
                tx: out_tx,
                rx: in_rx,
                peer_name: name,
                closed: false,
            },
            out_rx,
            in_tx,
        )
    }
}

impl Transport for PointToPointTransport {
    fn send(&self, target: &str, message: ControlMessage) -> Result<(), WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        if target != self.peer_name {
            return Err(WorkerError::Git(git_backend::GitError::NotFound {
                what: format!("transport peer '{target}'"),
            }));
        }
        self.tx.send(message).map_err(|_| WorkerError::TransportClosed)
    }

    fn broadcast(&self, message: ControlMessage) -> Result<(), WorkerError> {
        self.send(&self.peer_name.clone(), message)
    }

    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(String, ControlMessage)>, WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(chan::RecvTimeoutError::Timeout) => Ok(None),
            Err(chan::RecvTimeoutError::Disconnected) => Err(WorkerError::TransportClosed),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Same-process transport: dispatches messages synchronously within the
/// current process without any thread hop, for callers that just want the
/// `Transport` contract without real concurrency (e.g. tests, or a
/// single-worker pool).
pub struct InProcessTransport {
    queue: chan::Sender<(String, ControlMessage)>,
    drain: chan::Receiver<(String, ControlMessage)>,
    closed: bool,
}

impl InProcessTransport {
    /// Build an in-process transport; `send`/`broadcast` push directly onto
    /// the same queue `recv_timeout` drains.
    #[must_use]
    pub fn new() -> Self {
        let (queue, drain) = chan::unbounded();
        Self {
            queue,
            drain,
            closed: false,
        }
    }
}

impl Default for InProcessTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InProcessTransport {
    fn send(&self, target: &str, message: ControlMessage) -> Result<(), WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        self.queue
            .send((target.to_owned(), message))
            .map_err(|_| WorkerError::TransportClosed)
    }

    fn broadcast(&self, message: ControlMessage) -> Result<(), WorkerError> {
        self.send("*", message)
    }

    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(String, ControlMessage)>, WorkerError> {
        if self.closed {
            return Err(WorkerError::TransportClosed);
        }
        match self.drain.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(chan::RecvTimeoutError::Timeout) => Ok(None),
            Err(chan::RecvTimeoutError::Disconnected) => Err(WorkerError::TransportClosed),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
