//! Connection state machine and lifecycle notifications.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::BusError;

/// Lifecycle state of a bus connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    /// Apply a lifecycle event and return the resulting state.
    ///
    /// Events that are not valid for the current state leave it unchanged;
    /// `Closed` is terminal.
    #[must_use]
    pub const fn apply(self, event: &BusEvent) -> Self {
        match (self, event) {
            (Self::Closed, _) => Self::Closed,
            (Self::Disconnected, BusEvent::Connecting) => Self::Connecting,
            (Self::Connecting, BusEvent::Connected) => Self::Connected,
            (Self::Connected, BusEvent::Disconnected { .. }) => Self::Reconnecting,
            (Self::Reconnecting, BusEvent::Connected | BusEvent::Reconnected) => Self::Connected,
            (
                Self::Connecting | Self::Connected | Self::Reconnecting,
                BusEvent::ConnectionLost,
            )
            | (_, BusEvent::Closed) => Self::Closed,
            (state, _) => state,
        }
    }

    /// Numeric code exported as the `bus_connection_state` gauge.
    pub const fn code(self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Reconnecting => 3,
            Self::Closed => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event reported by a bus connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Initial connect started.
    Connecting,
    /// Handshake with the server succeeded.
    Connected,
    /// Transport dropped; the client will retry.
    Disconnected { reason: String },
    /// A retry succeeded after a disconnect.
    Reconnected,
    /// Reconnect attempts exhausted; the connection is unusable.
    ConnectionLost,
    /// Closed on request.
    Closed,
    /// Any other server or client error that does not change state.
    Error(String),
}

impl BusEvent {
    /// Short label used for metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Reconnected => "reconnected",
            Self::ConnectionLost => "connection_lost",
            Self::Closed => "closed",
            Self::Error(_) => "error",
        }
    }
}

/// Receives connection lifecycle events.
///
/// Observers run inline on the connection's event path and must not block.
pub trait BusObserver: Send + Sync {
    fn on_event(&self, event: &BusEvent, state: ConnectionState);
}

/// Tracks connection state and fans lifecycle events out to observers.
///
/// Shared by every bus implementation so that state transitions, the
/// exhausted/closed distinction and pending-request cancellation behave the
/// same regardless of transport.
pub struct ConnectionMonitor {
    state: watch::Sender<ConnectionState>,
    observers: Vec<Arc<dyn BusObserver>>,
    lost: AtomicBool,
}

impl ConnectionMonitor {
    pub fn new(observers: Vec<Arc<dyn BusObserver>>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            observers,
            lost: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Record an event, update state and notify observers.
    pub fn notify(&self, event: BusEvent) {
        if event == BusEvent::ConnectionLost && self.state() != ConnectionState::Closed {
            self.lost.store(true, Ordering::SeqCst);
        }

        let changed = self.state.send_if_modified(|state| {
            let next = state.apply(&event);
            let changed = next != *state;
            *state = next;
            changed
        });

        // Initial connect is reported both by the connect call and by the
        // client's event stream.
        if !changed
            && matches!(
                event,
                BusEvent::Connecting | BusEvent::Connected | BusEvent::Reconnected | BusEvent::Closed
            )
        {
            return;
        }

        let state = self.state();
        for observer in &self.observers {
            observer.on_event(&event, state);
        }
    }

    /// Error to report for a connection that cannot carry traffic.
    pub fn unusable_error(&self) -> BusError {
        if self.lost.load(Ordering::SeqCst) {
            BusError::ConnectionLost
        } else {
            BusError::NotConnected
        }
    }

    /// Fail fast when the connection cannot carry traffic.
    ///
    /// `Reconnecting` is accepted: the transport buffers outgoing messages
    /// until the retry succeeds or the attempts run out.
    pub fn ensure_usable(&self) -> Result<(), BusError> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Reconnecting => Ok(()),
            ConnectionState::Closed | ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(self.unusable_error())
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Run a request future bounded by `timeout`, aborting early if the
    /// connection closes while it is pending.
    pub async fn bounded<T, F>(&self, subject: &str, timeout: Duration, request: F) -> Result<T, BusError>
    where
        F: Future<Output = Result<T, BusError>>,
    {
        self.ensure_usable()?;
        let closed = wait_closed(self.subscribe());

        tokio::select! {
            result = tokio::time::timeout(timeout, request) => match result {
                Ok(reply) => reply,
                Err(_) => Err(BusError::Timeout {
                    subject: subject.to_owned(),
                    timeout,
                }),
            },
            () = closed => Err(self.unusable_error()),
        }
    }
}

/// Resolves once the watched connection reaches `Closed`.
async fn wait_closed(mut rx: watch::Receiver<ConnectionState>) {
    let reached = rx.wait_for(|state| *state == ConnectionState::Closed).await.is_ok();
    if !reached {
        std::future::pending::<()>().await;
    }
}
