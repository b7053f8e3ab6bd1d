//! Message Bus Connection
//!
//! A single logical connection to the automation bus. Reconnection is hidden
//! behind the [`BusClient`] trait; lifecycle changes are reported to
//! [`BusObserver`]s.

pub mod memory;
pub mod nats;
mod state;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::MemoryBus;
pub use nats::{NatsBus, NatsSettings};
pub use state::{BusEvent, BusObserver, ConnectionMonitor, ConnectionState};

/// Errors surfaced by bus operations.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// Initial connection could not be established.
    #[error("failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Connection is not open (never connected or closed on request).
    #[error("bus is not connected")]
    NotConnected,

    /// Reconnect attempts exhausted.
    #[error("bus connection lost")]
    ConnectionLost,

    /// No reply within the deadline.
    #[error("request to '{subject}' timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Connection to a request/reply capable message bus.
///
/// Implementations are safe for concurrent use: every request carries its own
/// correlation and deadline.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Fire-and-forget publish.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;

    /// Send a correlated request and wait at most `timeout` for the reply.
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> Result<Bytes, BusError>;

    /// Close the connection. Calling it again has no effect.
    async fn close(&self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}
