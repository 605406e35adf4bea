//! Streaming sink plumbing
//!
//! Each connection owns one bounded channel. The registry keeps the write
//! half ([`EventSink`]); the transport layer drives the read half
//! ([`ClientStream`]) and writes every received block onto the HTTP
//! response. Completion travels in-band as a [`SinkMessage::Closed`] frame,
//! so a superseded or evicted client observes an orderly end of stream,
//! never an abrupt error.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::error::SinkError;

/// Why a stream was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Normal completion (disconnect request or transport teardown)
    Completed,
    /// A newer connection registered under the same client id
    Superseded,
    /// Evicted by the liveness monitor
    Stale,
    /// The hub is shutting down
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Completed => write!(f, "completed"),
            CloseReason::Superseded => write!(f, "superseded"),
            CloseReason::Stale => write!(f, "stale"),
            CloseReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A message travelling down a client stream
#[derive(Debug, Clone)]
pub enum SinkMessage {
    /// An encoded wire event, ready to write to the response body
    Event(Bytes),
    /// End of stream; no further events will arrive
    Closed(CloseReason),
}

/// Write half of a connection's stream
///
/// Clone freely; all clones feed the same client. Writes never block: a
/// full queue is reported as backpressure and treated as a dead peer.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SinkMessage>,
}

impl EventSink {
    /// Create a connected sink/stream pair with the given queue depth
    pub(crate) fn channel(capacity: usize) -> (EventSink, ClientStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSink { tx }, ClientStream { rx, done: false })
    }

    /// Push an encoded event to the client
    pub fn send(&self, frame: Bytes) -> Result<(), SinkError> {
        self.tx
            .try_send(SinkMessage::Event(frame))
            .map_err(|err| match err {
                TrySendError::Full(_) => SinkError::Backpressure,
                TrySendError::Closed(_) => SinkError::Closed,
            })
    }

    /// Signal end of stream
    ///
    /// Best-effort: if the queue is full or the stream is gone the client
    /// will observe completion through channel teardown instead.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.tx.try_send(SinkMessage::Closed(reason));
    }

    /// Whether the read half has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Read half of a connection's stream, held by the transport layer
#[derive(Debug)]
pub struct ClientStream {
    rx: mpsc::Receiver<SinkMessage>,
    done: bool,
}

impl ClientStream {
    /// Receive the next message
    ///
    /// Always yields exactly one `Closed` message before returning `None`;
    /// a dropped sink reads as `Closed(Completed)`.
    pub async fn recv(&mut self) -> Option<SinkMessage> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(SinkMessage::Closed(reason)) => {
                self.done = true;
                Some(SinkMessage::Closed(reason))
            }
            Some(message) => Some(message),
            None => {
                self.done = true;
                Some(SinkMessage::Closed(CloseReason::Completed))
            }
        }
    }

    /// Receive the next encoded event, or `None` once the stream is closed
    pub async fn next_event(&mut self) -> Option<Bytes> {
        match self.recv().await {
            Some(SinkMessage::Event(frame)) => Some(frame),
            Some(SinkMessage::Closed(_)) | None => None,
        }
    }
}
